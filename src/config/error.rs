use std::path::PathBuf;
use thiserror::Error;

use super::kind::ParamKind;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid type '{kind}' for parameter '{name}'; supported types are string, int, float, bool")]
    InvalidType { name: String, kind: String },

    #[error("{name} must be {expected:#}, got {observed}")]
    TypeCoercion {
        name: String,
        expected: ParamKind,
        observed: &'static str,
    },

    #[error("configuration key '{0}' not found")]
    UnknownKey(String),

    #[error("configuration key '{0}' has no value")]
    MissingValue(String),

    #[error("parameter '{0}' is declared more than once")]
    DuplicateParameter(String),

    #[error("parameter name must not be empty")]
    EmptyName,

    #[error("invalid parameter name '{0}'; names must not start with '-' or contain whitespace or '='")]
    InvalidName(String),

    #[error("invalid command line: {0}")]
    Cli(#[from] clap::Error),

    #[error("failed to load env file '{path}': {source}")]
    DotEnv {
        path: PathBuf,
        source: dotenvy::Error,
    },

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),
}

impl ConfigError {
    /// Returns `true` for errors caused by referencing an undeclared parameter.
    pub fn is_unknown_key(&self) -> bool {
        matches!(self, Self::UnknownKey(_))
    }
}
