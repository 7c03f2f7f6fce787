//! Parameter values and table cells.

use std::collections::BTreeMap;
use std::fmt;

/// A literal value bound to a measure parameter or stored in a table cell.
///
/// The [`Display`](fmt::Display) form is canonical and is accepted back by
/// the measure expression parser.
///
/// # Examples
///
/// ```
/// use ir_eval::Value;
///
/// assert_eq!(Value::from(10).to_string(), "10");
/// assert_eq!(Value::from(0.5).to_string(), "0.5");
/// assert_eq!(Value::from(1.0).to_string(), "1.0");
/// assert_eq!(Value::from("exp-log2").to_string(), "\"exp-log2\"");
/// assert_eq!(Value::from(true).to_string(), "true");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// Integer literal
    Int(i64),
    /// Floating-point literal
    Float(f64),
    /// Boolean literal
    Bool(bool),
    /// String literal
    Str(String),
    /// Integer-to-integer mapping (custom relevance gains)
    Map(BTreeMap<i64, i64>),
}

/// The declared type of a measure parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// [`Value::Int`]
    Int,
    /// [`Value::Float`]
    Float,
    /// [`Value::Bool`]
    Bool,
    /// [`Value::Str`]
    Str,
    /// [`Value::Map`]
    Map,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Map => "map",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Returns the type of this value.
    #[must_use]
    pub const fn param_type(&self) -> ParamType {
        match self {
            Self::Int(_) => ParamType::Int,
            Self::Float(_) => ParamType::Float,
            Self::Bool(_) => ParamType::Bool,
            Self::Str(_) => ParamType::Str,
            Self::Map(_) => ParamType::Map,
        }
    }

    /// Returns the integer, if this is an `Int`.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a float view of numeric values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string, if this is a `Str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the mapping, if this is a `Map`.
    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<i64, i64>> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Converts an integer into a float when `target` is [`ParamType::Float`].
    ///
    /// Used by the parser so that `IPrec@1` binds `recall=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn coerce_to(self, target: ParamType) -> Self {
        match (self, target) {
            (Self::Int(v), ParamType::Float) => Self::Float(v as f64),
            (other, _) => other,
        }
    }

    /// Renders the value as plain text, without string quotes.
    ///
    /// Used for table cells and TREC output.
    #[must_use]
    pub fn to_plain_string(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            // Debug keeps the decimal point on whole floats ("1.0")
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"")
            }
            Self::Map(m) => {
                let entries = m
                    .iter()
                    .filter(|(k, v)| k != v)
                    .map(|(k, v)| format!("{k}:{v}"))
                    .collect::<Vec<_>>();
                write!(f, "{{{}}}", entries.join(","))
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<BTreeMap<i64, i64>> for Value {
    fn from(v: BTreeMap<i64, i64>) -> Self {
        Self::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_keep_decimal_point() {
        assert_eq!(Value::Float(0.0).to_string(), "0.0");
        assert_eq!(Value::Float(2.4).to_string(), "2.4");
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(Value::from("a\"b").to_string(), "\"a\\\"b\"");
    }

    #[test]
    fn maps_drop_identity_entries() {
        let gains: BTreeMap<i64, i64> = [(0, 0), (1, 1), (2, 3), (3, 7)].into_iter().collect();
        assert_eq!(Value::Map(gains).to_string(), "{2:3,3:7}");
    }

    #[test]
    fn coerce_int_to_float() {
        assert_eq!(Value::Int(1).coerce_to(ParamType::Float), Value::Float(1.0));
        assert_eq!(Value::Int(1).coerce_to(ParamType::Int), Value::Int(1));
        assert_eq!(Value::from("x").coerce_to(ParamType::Float), Value::from("x"));
    }

    #[test]
    fn numeric_views() {
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
        assert_eq!(Value::Float(3.5).as_int(), None);
        assert_eq!(Value::from("x").to_plain_string(), "x");
    }
}
