#![forbid(unsafe_code)]

//! Property values.
//!
//! [`Value`] is the dynamic value stored in a plain property or produced by a
//! computed one. [`Value::Empty`] is the absent value: it is what a plain
//! property reads as before its first write, and it renders as an empty
//! string.
//!
//! [`BoundValue`] is the argument of a property accessor. `Absent` asks for a
//! read, `Supplied` is a write, whatever the supplied value is. A write of
//! `Empty`, `false` or `0` is still a write.

use std::fmt;

/// A property value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value.
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Numeric reading of the value.
    ///
    /// `Empty` and blank text coerce to `0.0`, booleans to `1.0`/`0.0`, and
    /// text that does not parse as a number to `NaN`.
    #[must_use]
    pub fn as_number(&self) -> f64 {
        match self {
            Self::Empty => 0.0,
            Self::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Number(n) => *n,
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
        }
    }

    /// Truthiness: `Empty`, `false`, `0`, `NaN` and `""` are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Empty => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => !s.is_empty(),
        }
    }

    /// Borrow the text payload, if this is a `Text` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// JSON form used by view-model snapshots.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Empty => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            // Integral numbers render without a fractional part.
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Empty, Into::into)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Empty,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Empty, Self::Number),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::from(&other),
        }
    }
}

/// Argument to a property accessor.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BoundValue {
    /// No argument: the accessor reads.
    #[default]
    Absent,
    /// An argument was supplied: the accessor writes it.
    Supplied(Value),
}

impl BoundValue {
    #[must_use]
    pub fn supplied(value: impl Into<Value>) -> Self {
        Self::Supplied(value.into())
    }

    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Supplied(_))
    }

    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Absent => None,
            Self::Supplied(v) => Some(v),
        }
    }
}

impl From<Option<Value>> for BoundValue {
    fn from(v: Option<Value>) -> Self {
        v.map_or(Self::Absent, Self::Supplied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_renders_blank() {
        assert_eq!(Value::Empty.to_string(), "");
        assert_eq!(Value::default(), Value::Empty);
    }

    #[test]
    fn integral_numbers_drop_fraction() {
        assert_eq!(Value::from(4).to_string(), "4");
        assert_eq!(Value::from(-2.0).to_string(), "-2");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(Value::Empty.as_number(), 0.0);
        assert_eq!(Value::from(" 21 ").as_number(), 21.0);
        assert_eq!(Value::from("").as_number(), 0.0);
        assert_eq!(Value::from(true).as_number(), 1.0);
        assert!(Value::from("abc").as_number().is_nan());
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Empty.is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::from(-1).is_truthy());
    }

    #[test]
    fn json_conversion() {
        let json = serde_json::json!({"a": null, "b": 3, "c": "x", "d": [1, 2]});
        assert_eq!(Value::from(&json["a"]), Value::Empty);
        assert_eq!(Value::from(&json["b"]), Value::Number(3.0));
        assert_eq!(Value::from(&json["c"]), Value::from("x"));
        assert_eq!(Value::from(&json["d"]), Value::from("[1,2]"));

        assert_eq!(Value::from(3).to_json(), serde_json::json!(3.0));
        assert_eq!(Value::Empty.to_json(), serde_json::Value::Null);
    }

    #[test]
    fn falsy_supplied_values_are_writes() {
        assert!(BoundValue::supplied(false).is_write());
        assert!(BoundValue::supplied(0).is_write());
        assert!(BoundValue::Supplied(Value::Empty).is_write());
        assert!(!BoundValue::Absent.is_write());
        assert_eq!(BoundValue::from(None), BoundValue::Absent);
    }
}
