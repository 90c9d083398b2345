//! File-based configuration source.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use toml::Value;

use super::format::{read_optional, Format};
use super::source::{ConfigSource, RawMap};
use super::ConfigError;

/// A configuration source that loads a flat mapping from a TOML or YAML file.
///
/// A missing file, an empty document or a null document all yield an empty
/// mapping. Null values inside the document are dropped.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<RawMap, ConfigError> {
        let Some(contents) = read_optional(&self.path)? else {
            return Ok(RawMap::new());
        };

        let document: Option<BTreeMap<String, Option<Value>>> =
            Format::from_path(&self.path).parse(&self.path, &contents)?;

        Ok(document
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .collect())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
