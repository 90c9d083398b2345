pub mod config;
pub mod context;
mod error;

pub use config::{
    CliSource, ConfigError, ConfigManager, ConfigSource, DictSource, DotEnv, EnvSource,
    FileSource, ParamKind, ParamValue, Parameter, UnknownKeys,
};
pub use context::AppContext;
pub use error::Error;
