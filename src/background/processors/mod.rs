pub mod assembler;
pub mod ingest;
pub mod invoker;
pub mod parser;
pub mod script;
pub mod setup;
pub mod workspace;
