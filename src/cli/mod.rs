// CLI module - Command line interface
pub mod args;
pub mod commands;
pub mod output;
pub mod schema;

pub use args::{build_configuration, client_schema, requested_output};
pub use commands::{execute_command, run};
pub use output::{ConsoleWriter, OutputWriter};
pub use schema::{OptionKind, OptionSchema, OptionSpec, OptionValue, ParsedOptions};
