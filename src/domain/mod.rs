// Domain module - Request/response model, configuration and errors
pub mod config;
pub mod error;
pub mod message;
