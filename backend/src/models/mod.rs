pub mod config;
pub mod error;
pub mod image_log;
