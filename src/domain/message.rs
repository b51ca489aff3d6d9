use crate::domain::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Address of an entry in the database
///
/// A single string names a top-level entry, an array of strings walks into
/// nested objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Single(String),
    Path(Vec<String>),
}

impl Key {
    /// Interpret a CLI key argument
    ///
    /// Text that parses as a JSON array of strings becomes a key path,
    /// anything else is taken literally.
    pub fn from_arg(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') {
            if let Ok(path) = serde_json::from_str::<Vec<String>>(trimmed) {
                if !path.is_empty() {
                    return Key::Path(path);
                }
            }
        }
        Key::Single(raw.to_string())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Single(key) => write!(f, "{}", key),
            Key::Path(path) => write!(f, "{}", path.join(".")),
        }
    }
}

/// Database command understood by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Command {
    Get { key: Key },
    Set { key: Key, value: Value },
    Delete { key: Key },
    Exit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::Delete { .. } => "delete",
            Command::Exit => "exit",
        }
    }
}

/// Request ready for transmission
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    body: String,
}

impl Request {
    /// Build a request from a typed command
    pub fn from_command(command: &Command) -> Result<Self, serde_json::Error> {
        Ok(Self {
            body: serde_json::to_string(command)?,
        })
    }

    /// Build a request from the contents of a request file
    ///
    /// The text must hold a JSON object and is sent verbatim, minus
    /// surrounding whitespace.
    pub fn from_json_object(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Map<String, Value>>(text)?;
        Ok(Self {
            body: text.trim().to_string(),
        })
    }

    /// Build a request from a `--payload` argument
    ///
    /// JSON text goes out as given; anything else is sent as a JSON string.
    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        if serde_json::from_str::<Value>(payload).is_ok() {
            return Ok(Self {
                body: payload.trim().to_string(),
            });
        }
        Ok(Self {
            body: serde_json::to_string(payload)?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    /// Encoded size in bytes
    pub(crate) fn len(&self) -> usize {
        self.body.len()
    }
}

/// Server reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(alias = "response")]
    pub status: String,
    #[serde(default, alias = "value", skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, alias = "message", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

impl Response {
    /// Decode reply text, rejecting anything that is not a complete response object
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedResponse(e.to_string()))
    }

    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }

    /// Turn a non-ok status into an error
    pub fn into_result(self) -> Result<Self, ProtocolError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(ProtocolError::RemoteError {
                status: self.status,
                reason: self.reason,
                code: self.code,
            })
        }
    }

    /// Payload rendered for humans: strings bare, everything else as JSON
    pub fn data_text(&self) -> Option<String> {
        self.data.as_ref().map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}
