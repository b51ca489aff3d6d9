use crate::cli::schema::{OptionSchema, OptionSpec, ParsedOptions};
use crate::domain::config::{ClientSettings, Configuration, Endpoint, OutputFormat, RequestSource};
use crate::domain::error::ParseError;
use crate::domain::message::{Command, Key};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Request types accepted by `--type`
pub const REQUEST_TYPES: &[&str] = &["get", "set", "delete", "exit"];

/// Command line schema for the client
pub fn client_schema() -> OptionSchema {
    OptionSchema::new("jsondb-client")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Send one request to a JSON database server and print the reply")
        .option(
            OptionSpec::choice("type", REQUEST_TYPES)
                .short('t')
                .help("Type of the request"),
        )
        .option(
            OptionSpec::text("key")
                .short('k')
                .help("Key to access; a JSON array of strings addresses a nested entry"),
        )
        .option(OptionSpec::text("value").short('v').help("Value to set"))
        .option(
            OptionSpec::text("in")
                .short('i')
                .help("Request file, relative to the data directory"),
        )
        .option(
            OptionSpec::text("payload")
                .short('p')
                .help("Raw JSON request to send as-is"),
        )
        .option(
            OptionSpec::text("endpoint")
                .short('e')
                .help("Server address as HOST:PORT (default from settings, 127.0.0.1:22222)"),
        )
        .option(OptionSpec::number("timeout").help("Request deadline in milliseconds (default 5000)"))
        .option(
            OptionSpec::choice("output", OutputFormat::NAMES)
                .short('o')
                .help("Output format")
                .default_value("text"),
        )
        .option(OptionSpec::text("data-dir").help("Directory holding request files (default ./data)"))
        .option(OptionSpec::text("config").short('c').help("Settings file path"))
        .option(OptionSpec::flag("verbose").help("Enable verbose logging"))
        .option(OptionSpec::flag("quiet").short('q').help("Only print the server reply"))
}

/// Output format named on the command line, read from raw tokens
///
/// Used when the tokens as a whole failed to parse, so the error can still
/// be reported in the requested format.
pub fn requested_output(tokens: &[String]) -> OutputFormat {
    let mut requested = None;
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        let value = match token.as_str() {
            "-o" | "--output" => iter.next().map(String::as_str),
            other => other
                .strip_prefix("--output=")
                .or_else(|| other.strip_prefix("-o").filter(|v| !v.is_empty())),
        };
        if let Some(format) = value.and_then(|v| v.parse::<OutputFormat>().ok()) {
            requested = Some(format);
        }
    }
    requested.unwrap_or_default()
}

/// Validate parsed options against the settings and freeze them
pub fn build_configuration(
    options: &ParsedOptions,
    settings: &ClientSettings,
) -> Result<Configuration, ParseError> {
    let endpoint = match options.text("endpoint") {
        Some(raw) => raw.parse::<Endpoint>().map_err(|reason| ParseError::InvalidOptionValue {
            option: "endpoint".to_string(),
            value: raw.to_string(),
            reason,
        })?,
        None => settings.connection.endpoint(),
    };

    let timeout_ms = options.number("timeout").unwrap_or(settings.connection.timeout_ms);
    if timeout_ms == 0 {
        return Err(ParseError::InvalidOptionValue {
            option: "timeout".to_string(),
            value: "0".to_string(),
            reason: "timeout must be greater than zero".to_string(),
        });
    }

    let output = match options.choice("output") {
        Some(name) => name.parse::<OutputFormat>().map_err(|reason| ParseError::InvalidOptionValue {
            option: "output".to_string(),
            value: name.to_string(),
            reason,
        })?,
        None => OutputFormat::default(),
    };

    let data_dir = options
        .text("data-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| settings.global.data_dir.clone());

    let source = request_source(options, &data_dir)?;

    Ok(Configuration {
        endpoint,
        source,
        timeout: Duration::from_millis(timeout_ms),
        output,
        data_dir,
        verbose: options.flag("verbose"),
        quiet: options.flag("quiet"),
    })
}

/// `--in` wins over `--payload`, which wins over `--type`
fn request_source(options: &ParsedOptions, data_dir: &std::path::Path) -> Result<RequestSource, ParseError> {
    if let Some(file) = options.text("in") {
        let path = PathBuf::from(file);
        let path = if path.is_absolute() { path } else { data_dir.join(path) };
        return Ok(RequestSource::File(path));
    }

    if let Some(payload) = options.text("payload") {
        return Ok(RequestSource::Raw(payload.to_string()));
    }

    let kind = options
        .choice("type")
        .ok_or_else(|| ParseError::MissingRequiredOption("type".to_string()))?;
    Ok(RequestSource::Command(build_command(kind, options)?))
}

fn build_command(kind: &str, options: &ParsedOptions) -> Result<Command, ParseError> {
    let key = || {
        options
            .text("key")
            .map(Key::from_arg)
            .ok_or_else(|| ParseError::MissingRequiredOption("key".to_string()))
    };

    match kind {
        "get" => Ok(Command::Get { key: key()? }),
        "delete" => Ok(Command::Delete { key: key()? }),
        "set" => {
            let key = key()?;
            let value = options
                .text("value")
                .ok_or_else(|| ParseError::MissingRequiredOption("value".to_string()))?;
            Ok(Command::Set {
                key,
                value: Value::String(value.to_string()),
            })
        }
        "exit" => Ok(Command::Exit),
        other => Err(ParseError::InvalidOptionValue {
            option: "type".to_string(),
            value: other.to_string(),
            reason: format!("expected one of: {}", REQUEST_TYPES.join(", ")),
        }),
    }
}
