pub mod config;
pub mod report;
pub mod segment;
pub mod types;
