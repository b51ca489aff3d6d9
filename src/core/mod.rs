// Core module - Request/response cycle and the transport seam
pub mod exchange;
pub mod transport;

pub use exchange::{CyclePhase, Exchange, RequestCycle};
pub use transport::{Transport, TransportType};
