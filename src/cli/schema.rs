//! Declarative option schema and the parser driven by it.
//!
//! The schema is a plain value handed to the parser; `clap`'s builder API
//! does tokenization, unknown-option detection and help rendering, while
//! required-option checks and value coercion happen here so every failure
//! names the offending option.

use crate::domain::error::ParseError;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Arg, ArgAction};
use std::collections::BTreeMap;

/// Value type accepted by an option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind {
    Text,
    Number,
    Flag,
    Choice(&'static [&'static str]),
}

/// One recognized option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: &'static str,
    pub short: Option<char>,
    pub help: &'static str,
    pub kind: OptionKind,
    pub required: bool,
    pub default: Option<&'static str>,
}

impl OptionSpec {
    fn new(name: &'static str, kind: OptionKind) -> Self {
        Self {
            name,
            short: None,
            help: "",
            kind,
            required: false,
            default: None,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, OptionKind::Text)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, OptionKind::Number)
    }

    pub fn flag(name: &'static str) -> Self {
        Self::new(name, OptionKind::Flag)
    }

    pub fn choice(name: &'static str, choices: &'static [&'static str]) -> Self {
        Self::new(name, OptionKind::Choice(choices))
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn help(mut self, help: &'static str) -> Self {
        self.help = help;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    /// Coerce a raw token into this option's type
    pub fn coerce(&self, raw: &str) -> Result<OptionValue, ParseError> {
        let invalid = |reason: String| ParseError::InvalidOptionValue {
            option: self.name.to_string(),
            value: raw.to_string(),
            reason,
        };

        match &self.kind {
            OptionKind::Text => Ok(OptionValue::Text(raw.to_string())),
            OptionKind::Number => raw
                .parse::<u64>()
                .map(OptionValue::Number)
                .map_err(|_| invalid("expected a non-negative integer".to_string())),
            OptionKind::Flag => match raw {
                "true" => Ok(OptionValue::Flag(true)),
                "false" => Ok(OptionValue::Flag(false)),
                _ => Err(invalid("expected true or false".to_string())),
            },
            OptionKind::Choice(choices) => {
                if choices.contains(&raw) {
                    Ok(OptionValue::Choice(raw.to_string()))
                } else {
                    Err(invalid(format!("expected one of: {}", choices.join(", "))))
                }
            }
        }
    }

    fn help_text(&self) -> String {
        let mut help = self.help.to_string();
        if let OptionKind::Choice(choices) = &self.kind {
            help.push_str(&format!(" [possible values: {}]", choices.join(", ")));
        }
        if let Some(default) = self.default {
            help.push_str(&format!(" [default: {}]", default));
        }
        if self.required {
            help.push_str(" [required]");
        }
        help.trim_start().to_string()
    }

    fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.name).long(self.name).help(self.help_text());
        if let Some(short) = self.short {
            arg = arg.short(short);
        }
        match self.kind {
            OptionKind::Flag => arg.action(ArgAction::SetTrue),
            _ => arg
                .action(ArgAction::Set)
                .num_args(1)
                .allow_hyphen_values(true)
                .value_name(self.name.to_uppercase()),
        }
    }
}

/// Typed option value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Text(String),
    Number(u64),
    Flag(bool),
    Choice(String),
}

/// Result of a successful parse, keyed by option name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOptions {
    values: BTreeMap<String, OptionValue>,
}

impl ParsedOptions {
    pub fn insert(&mut self, name: &str, value: OptionValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(OptionValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<u64> {
        match self.values.get(name) {
            Some(OptionValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(OptionValue::Flag(true)))
    }

    pub fn choice(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(OptionValue::Choice(s)) => Some(s),
            _ => None,
        }
    }

    /// Render back into command line tokens
    pub fn to_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        for (name, value) in &self.values {
            match value {
                OptionValue::Flag(false) => {}
                OptionValue::Flag(true) => tokens.push(format!("--{}", name)),
                OptionValue::Text(s) | OptionValue::Choice(s) => {
                    tokens.push(format!("--{}", name));
                    tokens.push(s.clone());
                }
                OptionValue::Number(n) => {
                    tokens.push(format!("--{}", name));
                    tokens.push(n.to_string());
                }
            }
        }
        tokens
    }
}

/// Set of options a program accepts
#[derive(Debug, Clone)]
pub struct OptionSchema {
    program: &'static str,
    about: &'static str,
    version: Option<&'static str>,
    options: Vec<OptionSpec>,
}

impl OptionSchema {
    pub fn new(program: &'static str) -> Self {
        Self {
            program,
            about: "",
            version: None,
            options: Vec::new(),
        }
    }

    pub fn about(mut self, about: &'static str) -> Self {
        self.about = about;
        self
    }

    pub fn version(mut self, version: &'static str) -> Self {
        self.version = Some(version);
        self
    }

    pub fn option(mut self, spec: OptionSpec) -> Self {
        self.options.push(spec);
        self
    }

    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    pub fn find(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|spec| spec.name == name)
    }

    fn command(&self) -> clap::Command {
        let mut command = clap::Command::new(self.program)
            .about(self.about)
            .no_binary_name(true);
        if let Some(version) = self.version {
            command = command.version(version);
        }
        self.options
            .iter()
            .fold(command, |command, spec| command.arg(spec.to_arg()))
    }

    /// Help text for this schema
    pub fn usage(&self) -> String {
        self.command().render_help().to_string()
    }

    /// Parse argument tokens (program name excluded)
    pub fn parse<I, T>(&self, tokens: I) -> Result<ParsedOptions, ParseError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let matches = self
            .command()
            .try_get_matches_from(tokens)
            .map_err(map_clap_error)?;

        let mut parsed = ParsedOptions::default();
        for spec in &self.options {
            if spec.kind == OptionKind::Flag {
                parsed.insert(spec.name, OptionValue::Flag(matches.get_flag(spec.name)));
                continue;
            }

            let raw = matches
                .get_one::<String>(spec.name)
                .map(String::as_str)
                .or(spec.default);
            match raw {
                Some(raw) => parsed.insert(spec.name, spec.coerce(raw)?),
                None if spec.required => {
                    return Err(ParseError::MissingRequiredOption(spec.name.to_string()))
                }
                None => {}
            }
        }
        Ok(parsed)
    }
}

fn context_arg(err: &clap::Error) -> Option<String> {
    match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// `--name <NAME>` as rendered by clap, reduced to `name`
fn option_name(rendered: &str) -> String {
    rendered
        .split_whitespace()
        .next()
        .unwrap_or(rendered)
        .trim_start_matches('-')
        .to_string()
}

fn map_clap_error(err: clap::Error) -> ParseError {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            ParseError::HelpRequested(err.render().to_string())
        }
        ErrorKind::DisplayVersion => ParseError::VersionRequested(err.render().to_string()),
        ErrorKind::UnknownArgument => match context_arg(&err) {
            Some(token) => ParseError::UnrecognizedOption(token),
            None => ParseError::Usage(err.render().to_string()),
        },
        ErrorKind::InvalidValue => match context_arg(&err) {
            Some(arg) => ParseError::InvalidOptionValue {
                option: option_name(&arg),
                value: match err.get(ContextKind::InvalidValue) {
                    Some(ContextValue::String(s)) => s.clone(),
                    _ => String::new(),
                },
                reason: "a value is required".to_string(),
            },
            None => ParseError::Usage(err.render().to_string()),
        },
        _ => ParseError::Usage(err.render().to_string()),
    }
}
