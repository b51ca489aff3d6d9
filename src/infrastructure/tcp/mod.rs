// TCP module - Framed TCP transport
pub mod client;
pub mod frame;

pub use client::TcpTransport;
