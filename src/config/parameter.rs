//! Typed configuration parameters.

use serde::Deserialize;
use toml::Value;

use super::kind::ParamKind;
use super::value::ParamValue;
use super::ConfigError;

/// One record of a baseline definition file.
///
/// ```toml
/// [[parameter]]
/// name = "port"
/// type = "int"
/// default = 8080
/// description = "Port to listen on"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Initial raw value; takes the place of `default` when present.
    #[serde(default)]
    pub value: Option<Value>,
}

/// A named, typed configuration entry.
///
/// Parameters are immutable: the value is coerced once at construction and an
/// override produces a new parameter through [`Parameter::with_value`].
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    description: String,
    kind: ParamKind,
    default: Option<Value>,
    value: Option<ParamValue>,
}

impl Parameter {
    /// Builds a parameter, coercing `raw` (or `default` when `raw` is `None`).
    ///
    /// The name is normalized to lowercase. When neither a raw value nor a
    /// default is supplied the parameter has no value.
    pub fn new(
        name: impl AsRef<str>,
        description: impl Into<String>,
        kind: ParamKind,
        default: Option<Value>,
        raw: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let name = name.as_ref().to_lowercase();
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if name.starts_with('-') || name.contains(|c: char| c.is_whitespace() || c == '=') {
            return Err(ConfigError::InvalidName(name));
        }

        let value = match raw.as_ref().or(default.as_ref()) {
            Some(raw) => Some(kind.coerce(&name, raw)?),
            None => None,
        };

        Ok(Self {
            name,
            description: description.into(),
            kind,
            default,
            value,
        })
    }

    /// Builds a parameter from a baseline record. A missing `type` means `string`.
    pub fn from_def(def: ParameterDef) -> Result<Self, ConfigError> {
        let kind = match def.kind.as_deref() {
            Some(tag) => ParamKind::parse_for(&def.name.to_lowercase(), tag)?,
            None => ParamKind::default(),
        };
        Self::new(
            &def.name,
            def.description.unwrap_or_default(),
            kind,
            def.default,
            def.value,
        )
    }

    /// Returns a new parameter with `raw` as its value, re-running coercion.
    ///
    /// `self` is left untouched, including when coercion fails.
    pub fn with_value(&self, raw: impl Into<Value>) -> Result<Self, ConfigError> {
        Self::new(
            &self.name,
            self.description.clone(),
            self.kind,
            self.default.clone(),
            Some(raw.into()),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn value(&self) -> Option<&ParamValue> {
        self.value.as_ref()
    }
}
