//! The source capability and the in-memory source.

use toml::{Table, Value};

use super::ConfigError;

/// Flat key to raw value mapping produced by every source.
pub type RawMap = Table;

/// What to do when a source supplies a key that no parameter declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownKeys {
    /// Fail the whole load with [`ConfigError::UnknownKey`].
    #[default]
    Reject,
    /// Skip the key.
    Ignore,
}

/// A provider of override values.
///
/// Implementations return an empty map when there is no backing data; errors
/// are reserved for data that exists but cannot be read.
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    fn load(&self) -> Result<RawMap, ConfigError>;

    /// Per-source unknown-key policy. `None` defers to the manager's policy.
    fn unknown_keys(&self) -> Option<UnknownKeys> {
        None
    }

    /// Short label used in log events.
    fn describe(&self) -> String {
        format!("{self:?}")
    }
}

/// Returns a fixed, caller-supplied mapping verbatim.
#[derive(Debug, Clone, Default)]
pub struct DictSource {
    data: RawMap,
}

impl DictSource {
    pub fn new(data: RawMap) -> Self {
        Self { data }
    }

    /// Adds one entry, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for DictSource
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigSource for DictSource {
    fn load(&self) -> Result<RawMap, ConfigError> {
        Ok(self.data.clone())
    }

    fn describe(&self) -> String {
        "dict".to_string()
    }
}
