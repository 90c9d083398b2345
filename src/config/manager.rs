//! The configuration manager: baseline parameters plus ordered override sources.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use toml::{Table, Value};
use tracing::{debug, trace};

use super::cli;
use super::format::{read_optional, Format};
use super::parameter::{Parameter, ParameterDef};
use super::source::{ConfigSource, UnknownKeys};
use super::value::ParamValue;
use super::ConfigError;

/// Loads the parameter declarations from a baseline definition file.
///
/// YAML files hold a top-level sequence of records; TOML files hold them as
/// `[[parameter]]` tables. Unlike override files, a missing baseline is an error.
pub fn load_basic_config(path: impl AsRef<Path>) -> Result<Vec<Parameter>, ConfigError> {
    let path = path.as_ref();
    let contents =
        read_optional(path)?.ok_or_else(|| ConfigError::FileNotFound(path.to_path_buf()))?;

    let defs = match Format::from_path(path) {
        Format::Yaml => Format::Yaml.parse::<Vec<ParameterDef>>(path, &contents)?,
        Format::Toml => Format::Toml
            .parse::<TomlBaseline>(path, &contents)?
            .map(|doc| doc.parameter),
    };

    let parameters = defs
        .unwrap_or_default()
        .into_iter()
        .map(Parameter::from_def)
        .collect::<Result<Vec<_>, _>>()?;

    debug!(path = %path.display(), count = parameters.len(), "loaded baseline parameters");
    Ok(parameters)
}

#[derive(Deserialize)]
struct TomlBaseline {
    #[serde(default)]
    parameter: Vec<ParameterDef>,
}

/// The active parameters, in declaration order, indexed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    entries: Vec<Parameter>,
    index: HashMap<String, usize>,
}

impl ParameterSet {
    /// Builds a set, failing on a name declared twice.
    pub fn new(parameters: Vec<Parameter>) -> Result<Self, ConfigError> {
        let mut set = Self::default();
        for param in parameters {
            if set.index.contains_key(param.name()) {
                return Err(ConfigError::DuplicateParameter(param.name().to_string()));
            }
            set.index.insert(param.name().to_string(), set.entries.len());
            set.entries.push(param);
        }
        Ok(set)
    }

    pub fn get(&self, key: &str) -> Result<&Parameter, ConfigError> {
        let key = key.to_lowercase();
        match self.index.get(&key) {
            Some(&slot) => Ok(&self.entries[slot]),
            None => Err(ConfigError::UnknownKey(key)),
        }
    }

    /// Replaces the parameter named `key` with a copy carrying `raw`.
    ///
    /// The replacement is built before the slot is touched, so a coercion
    /// failure leaves the current parameter in place.
    pub fn set(&mut self, key: &str, raw: Value) -> Result<(), ConfigError> {
        let key = key.to_lowercase();
        let slot = *self
            .index
            .get(&key)
            .ok_or_else(|| ConfigError::UnknownKey(key.clone()))?;
        self.entries[slot] = self.entries[slot].with_value(raw)?;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static SHARED: OnceCell<ConfigManager> = OnceCell::new();

/// Holds the baseline parameters and the ordered list of override sources.
///
/// Sources are applied in registration order on every [`load`](Self::load), so
/// the last registered source wins for a given key. Overrides can only update
/// declared parameters; what happens to other keys is decided by the source's
/// [`UnknownKeys`] policy, falling back to the manager's.
///
/// The manager is `Send + Sync`. Construct it once at startup and hand out
/// references; [`ConfigManager::shared`] exists for code that needs a
/// process-wide instance instead.
///
/// ## Example
///
/// ```no_run
/// use dragon_config::{ConfigManager, DictSource, EnvSource};
///
/// let manager = ConfigManager::builder("config/basic.yml")
///     .with_source(DictSource::default().with("port", 9000))
///     .with_source(EnvSource::new().with_prefix("MYAPP_"))
///     .build()?;
///
/// let port: u16 = manager.get_as("port")?;
/// # Ok::<(), dragon_config::ConfigError>(())
/// ```
#[derive(Debug)]
pub struct ConfigManager {
    basic_config_path: PathBuf,
    unknown_keys: UnknownKeys,
    parameters: RwLock<ParameterSet>,
    sources: Mutex<Vec<Box<dyn ConfigSource>>>,
}

impl ConfigManager {
    /// Creates a manager builder for the baseline file at `path`.
    pub fn builder(path: impl AsRef<Path>) -> ConfigManagerBuilder {
        ConfigManagerBuilder {
            basic_config_path: path.as_ref().to_path_buf(),
            unknown_keys: UnknownKeys::default(),
            sources: Vec::new(),
        }
    }

    /// Creates a manager with no sources, loading the baseline immediately.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::builder(path).build()
    }

    /// Returns the process-wide manager, creating it on first use.
    ///
    /// This is global mutable state: the first successful call decides the
    /// baseline path and every later call gets that same instance, whatever
    /// `path` it passes. Concurrent first calls are serialized so exactly one
    /// instance is created. A failed initialization leaves the slot empty.
    pub fn shared(path: impl AsRef<Path>) -> Result<&'static ConfigManager, ConfigError> {
        SHARED.get_or_try_init(|| Self::new(path))
    }

    /// Returns the process-wide manager if [`shared`](Self::shared) already created it.
    pub fn try_shared() -> Option<&'static ConfigManager> {
        SHARED.get()
    }

    pub fn basic_config_path(&self) -> &Path {
        &self.basic_config_path
    }

    /// Appends a source. Takes effect on the next [`load`](Self::load).
    pub fn add_source(&self, source: impl ConfigSource + 'static) {
        self.add_boxed_source(Box::new(source));
    }

    fn add_boxed_source(&self, source: Box<dyn ConfigSource>) {
        debug!(source = %source.describe(), "registered config source");
        self.sources.lock().push(source);
    }

    pub fn source_count(&self) -> usize {
        self.sources.lock().len()
    }

    /// Rebuilds the parameters from the baseline, then applies every source.
    ///
    /// Previous overrides are discarded. The new parameter set is published in
    /// one step, so on error the previous set stays active and readers never
    /// observe a partially applied load.
    pub fn load(&self) -> Result<(), ConfigError> {
        let mut fresh = ParameterSet::new(load_basic_config(&self.basic_config_path)?)?;

        for source in self.sources.lock().iter() {
            let data = source.load()?;
            let policy = source.unknown_keys().unwrap_or(self.unknown_keys);
            debug!(source = %source.describe(), keys = data.len(), "applying config source");

            for (key, value) in data {
                match fresh.set(&key, value) {
                    Ok(()) => trace!(key = %key, "applied override"),
                    Err(ConfigError::UnknownKey(key)) if policy == UnknownKeys::Ignore => {
                        debug!(key = %key, source = %source.describe(), "skipping undeclared key");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        *self.parameters.write() = fresh;
        Ok(())
    }

    /// Returns the current value of `key` (case-insensitive).
    ///
    /// `Ok(None)` means the parameter is declared but has neither a default
    /// nor an override.
    pub fn get(&self, key: &str) -> Result<Option<ParamValue>, ConfigError> {
        Ok(self.parameters.read().get(key)?.value().cloned())
    }

    /// Returns the value of `key` deserialized into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        self.get(key)?
            .ok_or_else(|| ConfigError::MissingValue(key.to_lowercase()))?
            .deserialize()
    }

    /// Overrides `key` with `value`, re-coercing it to the declared type.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), ConfigError> {
        self.parameters.write().set(key, value.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.parameters.read().get(key).is_ok()
    }

    /// Returns a copy of the parameter named `key`.
    pub fn parameter(&self, key: &str) -> Result<Parameter, ConfigError> {
        self.parameters.read().get(key).cloned()
    }

    /// Returns a snapshot of all parameters in declaration order.
    pub fn parameters(&self) -> Vec<Parameter> {
        self.parameters.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.parameters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.read().is_empty()
    }

    /// Deserializes every parameter that has a value into `T`, keyed by name.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let table: Table = self
            .parameters
            .read()
            .iter()
            .filter_map(|p| Some((p.name().to_string(), Value::from(p.value()?.clone()))))
            .collect();
        Value::Table(table)
            .try_into()
            .map_err(ConfigError::DeserializeError)
    }

    /// Returns the command-line schema derived from the current parameters.
    pub fn cli_command(&self) -> clap::Command {
        cli::build_command(&self.parameters())
    }

    /// Parses `args` (without the program name) against the derived schema
    /// and registers the result as a source. Call [`load`](Self::load) afterwards.
    pub fn get_cli_args<I, T>(&self, args: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let source = cli::parse_args(&self.parameters(), args)?;
        self.add_source(source);
        Ok(())
    }

    /// Like [`get_cli_args`](Self::get_cli_args), reading the process arguments.
    pub fn get_cli_args_from_env(&self) -> Result<(), ConfigError> {
        let source = cli::parse_env_args(&self.parameters())?;
        self.add_source(source);
        Ok(())
    }
}

/// Builder for [`ConfigManager`].
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ConfigManagerBuilder {
    basic_config_path: PathBuf,
    unknown_keys: UnknownKeys,
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigManagerBuilder {
    /// Adds an override source. Later sources take precedence.
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Sets the policy for sources that don't declare their own.
    pub fn unknown_keys(mut self, policy: UnknownKeys) -> Self {
        self.unknown_keys = policy;
        self
    }

    /// Builds the manager and performs the first [`load`](ConfigManager::load).
    pub fn build(self) -> Result<ConfigManager, ConfigError> {
        let manager = ConfigManager {
            basic_config_path: self.basic_config_path,
            unknown_keys: self.unknown_keys,
            parameters: RwLock::new(ParameterSet::default()),
            sources: Mutex::new(Vec::new()),
        };
        for source in self.sources {
            manager.add_boxed_source(source);
        }
        manager.load()?;
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::{DotEnv, EnvSource};
    use crate::config::file::FileSource;
    use crate::config::kind::ParamKind;
    use crate::config::source::DictSource;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::{Builder, NamedTempFile};

    const BASIC_YAML: &str = r#"
- name: sample_value
  description: A sample value
  type: string
  default: "Hello, World!"
- name: Port
  type: int
  default: "8080"
- name: ratio
  type: float
- name: debug
  type: bool
  default: false
"#;

    fn basic_config() -> NamedTempFile {
        let mut file = Builder::new().suffix(".yml").tempfile().unwrap();
        write!(file, "{BASIC_YAML}").unwrap();
        file
    }

    fn string(v: &str) -> Option<ParamValue> {
        Some(ParamValue::String(v.to_string()))
    }

    #[test]
    fn test_baseline_values() {
        let file = basic_config();
        let manager = ConfigManager::new(file.path()).unwrap();

        assert_eq!(manager.basic_config_path(), file.path());
        assert_eq!(manager.len(), 4);
        assert_eq!(manager.get("sample_value").unwrap(), string("Hello, World!"));
        assert_eq!(manager.get("port").unwrap(), Some(ParamValue::Int(8080)));
        assert_eq!(manager.get("ratio").unwrap(), None);
    }

    #[test]
    fn test_toml_baseline() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[parameter]]
            name = "sample_value"
            default = "Hello, World!"

            [[parameter]]
            name = "workers"
            type = "INT"
            default = 4
            "#
        )
        .unwrap();

        let manager = ConfigManager::new(file.path()).unwrap();
        assert_eq!(manager.get("sample_value").unwrap(), string("Hello, World!"));
        assert_eq!(manager.parameter("workers").unwrap().kind(), ParamKind::Int);
    }

    #[test]
    fn test_empty_baseline() {
        let file = Builder::new().suffix(".yaml").tempfile().unwrap();
        let manager = ConfigManager::new(file.path()).unwrap();
        assert!(manager.is_empty());
    }

    #[test]
    fn test_missing_baseline() {
        let result = ConfigManager::new("/nonexistent/path/basic.yml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_baseline_errors_propagate() {
        let mut file = Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "- name: port\n  type: int\n  default: eighty").unwrap();
        let result = ConfigManager::new(file.path());
        assert!(matches!(result, Err(ConfigError::TypeCoercion { .. })));
    }

    #[test]
    fn test_duplicate_declaration() {
        let mut file = Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "- name: port\n- name: PORT").unwrap();
        let result = ConfigManager::new(file.path());
        assert!(matches!(result, Err(ConfigError::DuplicateParameter(ref n)) if n == "port"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let file = basic_config();
        let manager = ConfigManager::new(file.path()).unwrap();

        let expected = manager.get("sample_value").unwrap();
        assert_eq!(manager.get("Sample_Value").unwrap(), expected);
        assert_eq!(manager.get("SAMPLE_VALUE").unwrap(), expected);
    }

    #[test]
    fn test_unknown_key() {
        let file = basic_config();
        let manager = ConfigManager::new(file.path()).unwrap();

        let err = manager.get("non_existent_key").unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration key 'non_existent_key' not found"
        );
        assert!(manager.set("non_existent_key", 1).unwrap_err().is_unknown_key());
        assert!(!manager.contains("non_existent_key"));
    }

    #[test]
    fn test_set_recoerces() {
        let file = basic_config();
        let manager = ConfigManager::new(file.path()).unwrap();

        manager.set("PORT", "9090").unwrap();
        assert_eq!(manager.get("port").unwrap(), Some(ParamValue::Int(9090)));
        assert_eq!(manager.len(), 4);

        let err = manager.set("port", "ninety").unwrap_err();
        assert!(matches!(err, ConfigError::TypeCoercion { .. }));
        assert_eq!(manager.get("port").unwrap(), Some(ParamValue::Int(9090)));
    }

    #[test]
    fn test_dict_source_override() {
        let file = basic_config();
        let manager = ConfigManager::new(file.path()).unwrap();
        manager.add_source(DictSource::default().with("sample_value", "test_value"));
        assert_eq!(manager.source_count(), 1);

        // Not applied until the next load.
        assert_eq!(manager.get("sample_value").unwrap(), string("Hello, World!"));

        manager.load().unwrap();
        assert_eq!(manager.get("sample_value").unwrap(), string("test_value"));
    }

    #[test]
    fn test_last_source_wins() {
        let file = basic_config();
        let manager = ConfigManager::builder(file.path())
            .with_source(DictSource::default().with("port", 1000).with("ratio", "0.5"))
            .with_source(DictSource::default().with("PORT", "2000"))
            .build()
            .unwrap();

        assert_eq!(manager.get("port").unwrap(), Some(ParamValue::Int(2000)));
        assert_eq!(manager.get("ratio").unwrap(), Some(ParamValue::Float(0.5)));
    }

    #[test]
    fn test_load_discards_direct_sets() {
        let file = basic_config();
        let manager = ConfigManager::new(file.path()).unwrap();

        manager.set("debug", "yes").unwrap();
        assert_eq!(manager.get("debug").unwrap(), Some(ParamValue::Bool(true)));

        manager.load().unwrap();
        manager.load().unwrap();
        assert_eq!(manager.get("debug").unwrap(), Some(ParamValue::Bool(false)));
    }

    #[test]
    fn test_unknown_source_key_rejected_by_default() {
        let file = basic_config();
        let result = ConfigManager::builder(file.path())
            .with_source(DictSource::default().with("undeclared", 1))
            .build();

        assert!(matches!(result, Err(ConfigError::UnknownKey(ref k)) if k == "undeclared"));
    }

    #[test]
    fn test_unknown_source_key_ignored_by_policy() {
        let file = basic_config();
        let manager = ConfigManager::builder(file.path())
            .unknown_keys(UnknownKeys::Ignore)
            .with_source(DictSource::default().with("undeclared", 1).with("port", 1))
            .build()
            .unwrap();

        assert_eq!(manager.get("port").unwrap(), Some(ParamValue::Int(1)));
        assert!(!manager.contains("undeclared"));
    }

    #[test]
    fn test_failed_load_keeps_previous_parameters() {
        let file = basic_config();
        let manager = ConfigManager::new(file.path()).unwrap();
        manager.set("port", 1234).unwrap();

        manager.add_source(DictSource::default().with("port", "not a number"));
        assert!(manager.load().is_err());
        assert_eq!(manager.get("port").unwrap(), Some(ParamValue::Int(1234)));
    }

    #[test]
    fn test_env_source_override() {
        std::env::set_var("DRAGON_MGR_TEST_PORT", "7070");
        let file = basic_config();
        let manager = ConfigManager::builder(file.path())
            .with_source(
                EnvSource::new()
                    .with_prefix("DRAGON_MGR_TEST_")
                    .with_dotenv(DotEnv::Disabled),
            )
            .build()
            .unwrap();

        assert_eq!(manager.get("port").unwrap(), Some(ParamValue::Int(7070)));
    }

    #[test]
    fn test_unprefixed_env_ignores_unrelated_variables() {
        std::env::set_var("DRAGON_MGR_UNRELATED", "x");
        let mut file = Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "- name: dragon_mgr_only\n  default: kept").unwrap();

        let manager = ConfigManager::builder(file.path())
            .with_source(EnvSource::new().with_dotenv(DotEnv::Disabled))
            .build()
            .unwrap();

        assert_eq!(manager.get("dragon_mgr_only").unwrap(), string("kept"));
    }

    #[test]
    fn test_file_source_override() {
        let file = basic_config();
        let mut overrides = NamedTempFile::new().unwrap();
        writeln!(overrides, "sample_value = \"from file\"").unwrap();

        let manager = ConfigManager::builder(file.path())
            .with_source(FileSource::new(overrides.path()))
            .with_source(FileSource::new("/nonexistent/overrides.toml"))
            .build()
            .unwrap();

        assert_eq!(manager.get("sample_value").unwrap(), string("from file"));
    }

    #[test]
    fn test_cli_args_registered_as_source() {
        let file = basic_config();
        let manager = ConfigManager::builder(file.path())
            .with_source(DictSource::default().with("port", 1))
            .build()
            .unwrap();

        manager
            .get_cli_args(["--ratio", "2.5", "--debug"])
            .unwrap();
        assert_eq!(manager.source_count(), 2);
        assert_eq!(manager.get("ratio").unwrap(), None);

        manager.load().unwrap();
        assert_eq!(manager.get("ratio").unwrap(), Some(ParamValue::Float(2.5)));
        assert_eq!(manager.get("debug").unwrap(), Some(ParamValue::Bool(true)));
        assert_eq!(manager.get("port").unwrap(), Some(ParamValue::Int(1)));
    }

    #[test]
    fn test_cli_args_rejects_unknown_flag() {
        let file = basic_config();
        let manager = ConfigManager::new(file.path()).unwrap();

        let result = manager.get_cli_args(["--nope"]);
        assert!(matches!(result, Err(ConfigError::Cli(_))));
        assert_eq!(manager.source_count(), 0);
    }

    #[test]
    fn test_typed_access() {
        #[derive(Debug, serde::Deserialize)]
        struct App {
            sample_value: String,
            port: u16,
            debug: bool,
            ratio: Option<f64>,
        }

        let file = basic_config();
        let manager = ConfigManager::new(file.path()).unwrap();

        let port: u16 = manager.get_as("port").unwrap();
        assert_eq!(port, 8080);
        assert!(matches!(
            manager.get_as::<f64>("ratio"),
            Err(ConfigError::MissingValue(_))
        ));

        let app: App = manager.extract().unwrap();
        assert_eq!(app.sample_value, "Hello, World!");
        assert_eq!(app.port, 8080);
        assert!(!app.debug);
        assert_eq!(app.ratio, None);
    }

    #[test]
    fn test_concurrent_sets_keep_one_parameter_per_name() {
        let file = basic_config();
        let manager = Arc::new(ConfigManager::new(file.path()).unwrap());

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    for n in 0..200 {
                        manager.set("port", i * 1000 + n).unwrap();
                    }
                })
            })
            .collect();

        for _ in 0..200 {
            let params = manager.parameters();
            assert_eq!(params.len(), 4);
            assert_eq!(params.iter().filter(|p| p.name() == "port").count(), 1);
            assert!(manager.get("port").unwrap().is_some());
        }

        for writer in writers {
            writer.join().unwrap();
        }
    }

    #[test]
    fn test_shared_instance_ignores_later_paths() {
        let file = basic_config();
        let first = ConfigManager::shared(file.path()).unwrap();
        let second = ConfigManager::shared("/some/other/path.yml").unwrap();

        assert!(std::ptr::eq(first, second));
        assert_eq!(second.basic_config_path(), file.path());
        assert!(ConfigManager::try_shared().is_some());
    }
}
