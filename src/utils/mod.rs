pub mod label;
pub mod logger;
