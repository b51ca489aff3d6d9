use crate::domain::{config::Endpoint, error::ClientResult};
use async_trait::async_trait;
use std::fmt;

/// Transport type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    Tcp,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportType::Tcp => write!(f, "tcp"),
        }
    }
}

/// One connection carrying framed text messages
///
/// Deadlines are enforced by the caller; implementations may block for as
/// long as the underlying I/O does.
#[async_trait]
pub trait Transport: Send {
    /// Get the transport type
    fn transport_type(&self) -> TransportType;

    /// Open the connection to the endpoint
    async fn connect(&mut self, endpoint: &Endpoint) -> ClientResult<()>;

    /// Send one complete message
    async fn send(&mut self, payload: &str) -> ClientResult<()>;

    /// Wait for one complete message
    async fn receive(&mut self) -> ClientResult<String>;

    /// Release the connection; safe to call when not connected
    async fn close(&mut self);
}
