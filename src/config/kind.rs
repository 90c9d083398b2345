//! Declared parameter types and the coercion rules attached to each.

use std::fmt;
use std::str::FromStr;

use toml::Value;

use super::value::ParamValue;
use super::ConfigError;

/// The closed set of types a parameter can declare.
///
/// Each variant owns its coercion rule, see [`ParamKind::coerce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamKind {
    #[default]
    String,
    Int,
    Float,
    Bool,
}

impl ParamKind {
    pub const ALL: [ParamKind; 4] = [Self::String, Self::Int, Self::Float, Self::Bool];

    /// The type tag as written in baseline definitions.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        }
    }

    /// Parses a type tag (case-insensitive) on behalf of parameter `name`.
    pub fn parse_for(name: &str, tag: &str) -> Result<Self, ConfigError> {
        tag.parse().map_err(|_| ConfigError::InvalidType {
            name: name.to_string(),
            kind: tag.to_string(),
        })
    }

    /// Coerces a raw value into this kind.
    ///
    /// Values that already have the native type pass through unchanged, so
    /// coercing a coerced value is a no-op. `name` only feeds the error message.
    pub fn coerce(self, name: &str, raw: &Value) -> Result<ParamValue, ConfigError> {
        let coerced = match (self, raw) {
            (Self::String, Value::String(s)) => Some(ParamValue::String(s.clone())),
            (Self::String, Value::Integer(i)) => Some(ParamValue::String(i.to_string())),
            (Self::String, Value::Float(f)) => Some(ParamValue::String(format_float(*f))),
            (Self::String, Value::Boolean(b)) => Some(ParamValue::String(b.to_string())),
            (Self::String, Value::Datetime(dt)) => Some(ParamValue::String(dt.to_string())),

            (Self::Int, Value::Integer(i)) => Some(ParamValue::Int(*i)),
            (Self::Int, Value::String(s)) => s.trim().parse().ok().map(ParamValue::Int),

            (Self::Float, Value::Float(f)) => Some(ParamValue::Float(*f)),
            (Self::Float, Value::Integer(i)) => Some(ParamValue::Float(*i as f64)),
            (Self::Float, Value::String(s)) => s.trim().parse().ok().map(ParamValue::Float),

            (Self::Bool, Value::Boolean(b)) => Some(ParamValue::Bool(*b)),
            (Self::Bool, Value::String(s)) => parse_bool(s).map(ParamValue::Bool),

            _ => None,
        };

        coerced.ok_or_else(|| ConfigError::TypeCoercion {
            name: name.to_string(),
            expected: self,
            observed: raw.type_str(),
        })
    }
}

/// Accepts `true`/`yes`/`false`/`no`, case-insensitively. Nothing else,
/// surrounding whitespace included.
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") || s.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}

/// Formats a float so it still reads as one: `1.0` stays `"1.0"`, not `"1"`.
pub(crate) fn format_float(f: f64) -> String {
    let s = f.to_string();
    if f.is_finite() && !s.contains(['.', 'e', 'E']) {
        format!("{s}.0")
    } else {
        s
    }
}

impl FromStr for ParamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| s.to_string())
    }
}

/// `{}` prints the type tag; `{:#}` prints the noun used in error messages.
impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.pad(match self {
                Self::String => "a string",
                Self::Int => "an integer",
                Self::Float => "a float",
                Self::Bool => "a boolean",
            })
        } else {
            f.pad(self.as_str())
        }
    }
}
