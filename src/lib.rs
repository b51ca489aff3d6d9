//! JSON Database Client Library
//!
//! Command-line client for a networked JSON key-value database: typed
//! argument parsing, a single framed request/response cycle over TCP, and
//! result reporting with distinct exit codes.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::exchange::{CyclePhase, Exchange, RequestCycle};
pub use crate::core::transport::Transport;
pub use domain::config::{ClientSettings, Configuration, Endpoint, OutputFormat, RequestSource};
pub use domain::error::{ClientError, ClientResult, ParseError, ProtocolError, TransportError};
pub use domain::message::{Command, Key, Request, Response};
pub use infrastructure::tcp::TcpTransport;
