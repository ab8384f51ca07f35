pub mod actors;
pub mod flows;
pub mod processors;
