use crate::cli::args::{build_configuration, client_schema, requested_output};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::cli::schema::ParsedOptions;
use crate::core::exchange::RequestCycle;
use crate::domain::config::{ClientSettings, OutputFormat};
use crate::domain::error::{exitcode, ClientError, ClientResult, ParseError};
use crate::infrastructure::config::SettingsManager;
use crate::infrastructure::logging::{effective_level, init_logging};
use crate::infrastructure::tcp::TcpTransport;
use std::path::{Path, PathBuf};

/// Run one invocation from raw argument tokens and return the exit code
pub async fn run<I, T>(tokens: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
    let schema = client_schema();
    let options = match schema.parse(tokens.iter().cloned()) {
        Ok(options) => options,
        Err(ParseError::HelpRequested(text)) | Err(ParseError::VersionRequested(text)) => {
            let writer = ConsoleWriter::new(OutputFormat::Text, false);
            return match writer.write_message(&text) {
                Ok(()) => exitcode::OK,
                Err(_) => exitcode::IOERR,
            };
        }
        // Options did not parse, so honour `--output` from the raw tokens
        Err(e) => return report(&ConsoleWriter::new(requested_output(&tokens), false), e.into()),
    };

    let writer = ConsoleWriter::new(
        options
            .choice("output")
            .and_then(|name| name.parse().ok())
            .unwrap_or_default(),
        options.flag("quiet"),
    );

    match execute_command(&options, &writer).await {
        Ok(()) => exitcode::OK,
        Err(e) => report(&writer, e),
    }
}

fn report(writer: &ConsoleWriter, error: ClientError) -> i32 {
    if let Err(e) = writer.write_error(&error) {
        eprintln!("Error: {} ({})", error, e);
    }
    error.exit_code()
}

/// Execute the request described by parsed options
pub async fn execute_command(options: &ParsedOptions, writer: &ConsoleWriter) -> ClientResult<()> {
    let (settings, settings_path) = load_settings(options.text("config").map(Path::new))?;

    let level = effective_level(
        &settings.global.log_level,
        options.flag("verbose"),
        options.flag("quiet"),
    );
    if let Err(e) = init_logging(level) {
        // Already initialized, e.g. when embedded in tests
        tracing::debug!("{}", e);
    }
    match &settings_path {
        Some(path) => tracing::debug!("Loaded settings from {}", path.display()),
        None => tracing::debug!("No settings file found, using defaults"),
    }

    let config = build_configuration(options, &settings)?;
    tracing::debug!(?config, "configuration ready");

    let announcer = writer.clone();
    let mut cycle = RequestCycle::new(TcpTransport::new(), config.endpoint.clone(), config.timeout)
        .on_connected(move |endpoint| {
            if let Err(e) = announcer.write_started(endpoint) {
                tracing::warn!("Failed to write output: {}", e);
            }
        });
    let exchange = cycle.execute(&config.source).await?;

    writer.write_exchange(&config.endpoint, &exchange)?;
    Ok(())
}

/// Load settings and report which file they came from
fn load_settings(explicit: Option<&Path>) -> ClientResult<(ClientSettings, Option<PathBuf>)> {
    let manager = SettingsManager::new();
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => manager.settings_path().map(Path::to_path_buf),
    };
    let settings = match &path {
        Some(path) => manager.load_settings_from_path(path)?,
        None => ClientSettings::default(),
    };
    Ok((settings, path))
}
