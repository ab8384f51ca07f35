pub mod detection;
pub mod media;
pub mod response;
