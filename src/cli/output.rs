use crate::core::exchange::Exchange;
use crate::domain::config::{Endpoint, OutputFormat};
use crate::domain::error::ClientError;
use crate::domain::message::Response;
use serde_json::{json, Value};
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_started(&self, endpoint: &Endpoint) -> Result<(), OutputError>;
    fn write_exchange(&self, endpoint: &Endpoint, exchange: &Exchange) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &ClientError) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for ClientError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Table row for a server reply
#[derive(Tabled)]
struct ResponseRow {
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Data")]
    data: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Time (ms)")]
    elapsed_ms: u128,
}

impl ResponseRow {
    fn new(endpoint: &Endpoint, response: &Response, exchange: &Exchange) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            status: response.status.clone(),
            data: response.data_text().unwrap_or_default(),
            reason: response.reason.clone().unwrap_or_default(),
            elapsed_ms: exchange.elapsed.as_millis(),
        }
    }
}

/// Console output writer
#[derive(Debug, Clone)]
pub struct ConsoleWriter {
    format: OutputFormat,
    quiet: bool,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Text written to stdout for a completed exchange
    pub fn render_exchange(&self, endpoint: &Endpoint, exchange: &Exchange) -> Result<String, OutputError> {
        let rendered = match self.format {
            OutputFormat::Text if self.quiet => exchange.raw_response.clone(),
            OutputFormat::Text => format!(
                "Sent: {}\nReceived: {}",
                exchange.request.as_str(),
                exchange.raw_response
            ),
            OutputFormat::Json => {
                let request: Value = serde_json::from_str(exchange.request.as_str())?;
                let output = if self.quiet {
                    serde_json::to_value(&exchange.response)?
                } else {
                    json!({
                        "endpoint": endpoint.to_string(),
                        "request": request,
                        "response": exchange.response,
                        "elapsed_ms": exchange.elapsed.as_millis() as u64,
                    })
                };
                serde_json::to_string_pretty(&output)?
            }
            OutputFormat::Table => {
                let row = ResponseRow::new(endpoint, &exchange.response, exchange);
                Table::new(vec![row]).to_string()
            }
        };
        Ok(rendered)
    }

    /// Text written to stderr for a failure
    pub fn render_error(&self, error: &ClientError) -> Result<String, OutputError> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "error": error.kind(),
                "message": error.to_string(),
                "exit_code": error.exit_code(),
            }))?),
            _ => Ok(format!("Error ({}): {}", error.kind(), error)),
        }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_started(&self, endpoint: &Endpoint) -> Result<(), OutputError> {
        if self.format == OutputFormat::Text && !self.quiet {
            println!("Client started! Connecting to {}", endpoint);
        }
        Ok(())
    }

    fn write_exchange(&self, endpoint: &Endpoint, exchange: &Exchange) -> Result<(), OutputError> {
        println!("{}", self.render_exchange(endpoint, exchange)?);
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        print!("{}", message);
        if !message.ends_with('\n') {
            println!();
        }
        Ok(())
    }

    fn write_error(&self, error: &ClientError) -> Result<(), OutputError> {
        eprintln!("{}", self.render_error(error)?);
        Ok(())
    }
}
