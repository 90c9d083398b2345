//! Typed parameters, override sources and the manager that layers them.

mod cli;
mod env;
mod error;
mod file;
mod format;
mod kind;
mod manager;
mod parameter;
mod source;
mod value;

pub use cli::CliSource;
pub use env::{DotEnv, EnvSource};
pub use error::ConfigError;
pub use file::FileSource;
pub use format::Format;
pub use kind::ParamKind;
pub use manager::{load_basic_config, ConfigManager, ConfigManagerBuilder, ParameterSet};
pub use parameter::{Parameter, ParameterDef};
pub use source::{ConfigSource, DictSource, RawMap, UnknownKeys};
pub use value::ParamValue;
