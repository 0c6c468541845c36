pub mod error;
pub mod file_system;
pub mod logger;
pub mod monitor;
pub mod parser;
pub mod printer;
