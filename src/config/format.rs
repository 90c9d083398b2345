//! Declarative document formats understood by the baseline loader and file source.

use std::path::Path;

use serde::de::DeserializeOwned;

use super::ConfigError;

/// Document format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
}

impl Format {
    /// `.yml` and `.yaml` are YAML; everything else is read as TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => {
                Self::Yaml
            }
            _ => Self::Toml,
        }
    }

    /// Parses `contents`. Returns `Ok(None)` for an empty or null document.
    pub fn parse<T: DeserializeOwned>(
        self,
        path: &Path,
        contents: &str,
    ) -> Result<Option<T>, ConfigError> {
        let parse_error = |message: String| ConfigError::ParseError {
            path: path.to_path_buf(),
            message,
        };

        if contents.trim().is_empty() {
            return Ok(None);
        }

        match self {
            Self::Yaml => {
                serde_yaml::from_str::<Option<T>>(contents).map_err(|e| parse_error(e.to_string()))
            }
            Self::Toml => toml::from_str(contents)
                .map(Some)
                .map_err(|e| parse_error(e.to_string())),
        }
    }
}

/// Reads the file at `path` into a string.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
