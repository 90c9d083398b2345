use std::path::PathBuf;

use toml::Value;
use tracing::debug;

use super::source::{ConfigSource, RawMap, UnknownKeys};
use super::ConfigError;

/// Where [`EnvSource`] looks for a `.env` file before reading the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DotEnv {
    /// `.env` in the current directory or one of its parents.
    #[default]
    Discover,
    /// A specific file. Missing files are skipped.
    Path(PathBuf),
    /// Don't touch the process environment.
    Disabled,
}

/// Exposes the process environment as override candidates.
///
/// Every value is a string; parameters coerce it to their declared type.
/// Variables loaded from a `.env` file are added to the process environment
/// but never replace variables that are already set.
///
/// Unknown keys are ignored by default since the environment always carries
/// variables unrelated to the application. Use [`with_prefix`](Self::with_prefix)
/// to narrow the variables and [`strict`](Self::strict) to reject leftovers.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: Option<String>,
    dotenv: DotEnv,
    unknown_keys: UnknownKeys,
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvSource {
    pub fn new() -> Self {
        Self {
            prefix: None,
            dotenv: DotEnv::default(),
            unknown_keys: UnknownKeys::Ignore,
        }
    }

    /// Only reads `PREFIX<name>` variables and strips the prefix.
    ///
    /// With `with_prefix("MYAPP_")`, `MYAPP_PORT` overrides `port`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_dotenv(mut self, dotenv: DotEnv) -> Self {
        self.dotenv = dotenv;
        self
    }

    /// Fails the load when a variable names an undeclared parameter.
    pub fn strict(mut self) -> Self {
        self.unknown_keys = UnknownKeys::Reject;
        self
    }

    fn load_dotenv(&self) -> Result<(), ConfigError> {
        let result = match &self.dotenv {
            DotEnv::Disabled => return Ok(()),
            DotEnv::Discover => dotenvy::dotenv().map_err(|e| (PathBuf::from(".env"), e)),
            DotEnv::Path(path) => dotenvy::from_path(path)
                .map(|()| path.clone())
                .map_err(|e| (path.clone(), e)),
        };

        match result {
            Ok(path) => {
                debug!(path = %path.display(), "loaded env file");
                Ok(())
            }
            Err((path, e)) if e.not_found() => {
                debug!(path = %path.display(), "no env file");
                Ok(())
            }
            Err((path, source)) => Err(ConfigError::DotEnv { path, source }),
        }
    }
}

impl ConfigSource for EnvSource {
    fn load(&self) -> Result<RawMap, ConfigError> {
        self.load_dotenv()?;

        let mut map = RawMap::new();
        for (key, value) in std::env::vars_os() {
            let (Some(key), Some(value)) = (key.to_str(), value.to_str()) else {
                continue;
            };

            let name = match &self.prefix {
                Some(prefix) => match key.strip_prefix(prefix.as_str()) {
                    Some(rest) if !rest.is_empty() => rest,
                    _ => continue,
                },
                None => key,
            };

            map.insert(name.to_string(), Value::String(value.to_string()));
        }

        Ok(map)
    }

    fn unknown_keys(&self) -> Option<UnknownKeys> {
        Some(self.unknown_keys)
    }

    fn describe(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("env {prefix}*"),
            None => "env".to_string(),
        }
    }
}
