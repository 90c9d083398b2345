//! Command-line overrides derived from the declared parameters.
//!
//! Every parameter becomes an optional `--<name>` flag typed after its
//! [`ParamKind`], defaulting to the parameter's current value.

use std::ffi::OsString;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use toml::Value;

use super::kind::{parse_bool, ParamKind};
use super::parameter::Parameter;
use super::source::{ConfigSource, RawMap};
use super::ConfigError;

/// Builds the argument schema for `parameters`.
///
/// A parameter named `help` replaces clap's built-in help flag.
pub fn build_command(parameters: &[Parameter]) -> Command {
    let shadows_help = parameters.iter().any(|p| p.name() == "help");
    parameters.iter().fold(
        Command::new(env!("CARGO_PKG_NAME")).disable_help_flag(shadows_help),
        |command, param| command.arg(param_arg(param)),
    )
}

fn param_arg(param: &Parameter) -> Arg {
    let mut arg = Arg::new(param.name().to_string())
        .long(param.name().to_string())
        .action(ArgAction::Set)
        .value_name(param.kind().as_str().to_uppercase());

    if !param.description().is_empty() {
        arg = arg.help(param.description().to_string());
    }

    arg = match param.kind() {
        ParamKind::String => arg.value_parser(value_parser!(String)),
        ParamKind::Int => arg
            .value_parser(value_parser!(i64))
            .allow_negative_numbers(true),
        ParamKind::Float => arg
            .value_parser(value_parser!(f64))
            .allow_negative_numbers(true),
        ParamKind::Bool => arg
            .value_parser(parse_bool_flag)
            .num_args(0..=1)
            .default_missing_value("true"),
    };

    match param.value() {
        Some(value) => arg.default_value(value.to_string()),
        None => arg,
    }
}

fn parse_bool_flag(s: &str) -> Result<bool, String> {
    parse_bool(s).ok_or_else(|| format!("expected one of true, yes, false, no; got '{s}'"))
}

/// Parses `args` (without the program name) against the derived schema.
pub fn parse_args<I, T>(parameters: &[Parameter], args: I) -> Result<CliSource, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_command(parameters)
        .no_binary_name(true)
        .try_get_matches_from(args)?;
    Ok(CliSource::from_matches(parameters, &matches))
}

/// Parses the process arguments against the derived schema.
pub fn parse_env_args(parameters: &[Parameter]) -> Result<CliSource, ConfigError> {
    let matches = build_command(parameters).try_get_matches()?;
    Ok(CliSource::from_matches(parameters, &matches))
}

/// Values parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliSource {
    values: RawMap,
}

impl CliSource {
    pub fn new(values: RawMap) -> Self {
        Self { values }
    }

    fn from_matches(parameters: &[Parameter], matches: &ArgMatches) -> Self {
        let mut values = RawMap::new();
        for param in parameters {
            let id = param.name();
            let value = match param.kind() {
                ParamKind::String => matches.get_one::<String>(id).cloned().map(Value::String),
                ParamKind::Int => matches.get_one::<i64>(id).copied().map(Value::Integer),
                ParamKind::Float => matches.get_one::<f64>(id).copied().map(Value::Float),
                ParamKind::Bool => matches.get_one::<bool>(id).copied().map(Value::Boolean),
            };
            if let Some(value) = value {
                values.insert(id.to_string(), value);
            }
        }
        Self { values }
    }
}

impl ConfigSource for CliSource {
    fn load(&self) -> Result<RawMap, ConfigError> {
        Ok(self.values.clone())
    }

    fn describe(&self) -> String {
        "cli".to_string()
    }
}
