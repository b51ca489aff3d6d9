use thiserror::Error;

/// Argument parsing failures, raised before any I/O happens
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognized option '{0}'")]
    UnrecognizedOption(String),

    #[error("missing required option '--{0}'")]
    MissingRequiredOption(String),

    #[error("invalid value '{value}' for option '--{option}': {reason}")]
    InvalidOptionValue {
        option: String,
        value: String,
        reason: String,
    },

    /// `--help` was requested; carries the rendered help text
    #[error("help requested")]
    HelpRequested(String),

    /// `--version` was requested; carries the rendered version line
    #[error("version requested")]
    VersionRequested(String),

    #[error("{0}")]
    Usage(String),
}

impl ParseError {
    /// Help and version output are not failures
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::HelpRequested(_) | Self::VersionRequested(_))
    }
}

/// Failures while reaching the endpoint
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection to {endpoint} failed: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("no response from {endpoint} within {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("I/O error while talking to {endpoint}: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures after bytes were exchanged
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("server returned {status}{}", remote_detail(.code, .reason))]
    RemoteError {
        status: String,
        reason: Option<String>,
        code: Option<i64>,
    },

    #[error("request is {0} bytes, frames are limited to 65535 bytes")]
    PayloadTooLarge(usize),
}

fn remote_detail(code: &Option<i64>, reason: &Option<String>) -> String {
    let mut detail = String::new();
    if let Some(code) = code {
        detail.push_str(&format!(" ({})", code));
    }
    if let Some(reason) = reason {
        detail.push_str(&format!(": {}", reason));
    }
    detail
}

/// Client unified error type
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Argument error: {0}")]
    Parse(#[from] ParseError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Request cycle already finished")]
    CycleFinished,

    #[error("Output error: {0}")]
    Output(String),
}

impl ClientError {
    /// Short name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(ParseError::UnrecognizedOption(_)) => "UnrecognizedOption",
            Self::Parse(ParseError::MissingRequiredOption(_)) => "MissingRequiredOption",
            Self::Parse(ParseError::InvalidOptionValue { .. }) => "InvalidOptionValue",
            Self::Parse(_) => "Usage",
            Self::Transport(TransportError::ConnectionFailed { .. }) => "ConnectionFailed",
            Self::Transport(TransportError::Timeout { .. }) => "Timeout",
            Self::Transport(TransportError::Io { .. }) => "TransportIo",
            Self::Protocol(ProtocolError::MalformedResponse(_)) => "MalformedResponse",
            Self::Protocol(ProtocolError::RemoteError { .. }) => "RemoteError",
            Self::Protocol(ProtocolError::PayloadTooLarge(_)) => "PayloadTooLarge",
            Self::InvalidRequest { .. } => "InvalidRequest",
            Self::Config { .. } => "Config",
            Self::CycleFinished => "CycleFinished",
            Self::Output(_) => "Output",
        }
    }

    /// Process exit status for this error, sysexits style
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Parse(_) => exitcode::USAGE,
            Self::InvalidRequest { .. } => exitcode::NOINPUT,
            Self::Transport(TransportError::ConnectionFailed { .. }) => exitcode::UNAVAILABLE,
            Self::Transport(TransportError::Timeout { .. }) => exitcode::TEMPFAIL,
            Self::Transport(TransportError::Io { .. }) => exitcode::IOERR,
            Self::Protocol(ProtocolError::MalformedResponse(_)) => exitcode::PROTOCOL,
            Self::Protocol(ProtocolError::RemoteError { .. }) => exitcode::REMOTE,
            Self::Protocol(ProtocolError::PayloadTooLarge(_)) => exitcode::DATAERR,
            Self::Config { .. } => exitcode::CONFIG,
            Self::CycleFinished => exitcode::SOFTWARE,
            Self::Output(_) => exitcode::IOERR,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Exit codes (BSD sysexits.h compatible where one applies)
pub mod exitcode {
    pub const OK: i32 = 0;
    /// The server answered with a non-ok status
    pub const REMOTE: i32 = 1;
    pub const USAGE: i32 = 64;
    pub const DATAERR: i32 = 65;
    pub const NOINPUT: i32 = 66;
    pub const UNAVAILABLE: i32 = 69;
    pub const SOFTWARE: i32 = 70;
    pub const IOERR: i32 = 74;
    pub const TEMPFAIL: i32 = 75;
    pub const PROTOCOL: i32 = 76;
    pub const CONFIG: i32 = 78;
}
