use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field value as stored on a record.
///
/// Everything the engine persists is one of these five shapes. Legacy rows
/// imported from CSV carry their original cell text as `Text`; typed columns
/// parse into `Number`, `Bool` or `Date` at validation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Date(_) => "date",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Loose truthiness used for legacy boolean-ish cells.
    ///
    /// Accepts `true`, `1`, `"true"`, `"1"`, `"yes"`, `"y"`, `"t"`
    /// (case-insensitive for text).
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => {
                let s = s.trim().to_ascii_lowercase();
                matches!(s.as_str(), "true" | "1" | "yes" | "y" | "t")
            }
            _ => false,
        }
    }

    /// True when the value is one of the accepted "active" sentinels:
    /// the literal text `active` or any truthy legacy form.
    pub fn is_active_sentinel(&self) -> bool {
        if let Self::Text(s) = self {
            if s.trim().eq_ignore_ascii_case("active") {
                return true;
            }
        }
        self.is_truthy()
    }

    /// Convert to a JSON value for response payloads.
    ///
    /// Whole numbers are emitted as integers so ids and codes do not pick
    /// up a trailing `.0` in JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < i64::MAX as f64 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }

    /// Convert an arbitrary JSON scalar into a field value.
    ///
    /// Arrays and objects are kept as their serialized text so nothing a
    /// caller submitted is ever dropped.
    pub fn from_json(value: &serde_json::Value) -> FieldValue {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                (a - b).abs() < f64::EPSILON
            }
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, ""),
            Self::Text(s) => write!(f, "{}", s),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Self::Bool(b) => write!(f, "{}", b),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_sentinels() {
        for raw in ["active", "ACTIVE", "1", "true", "yes", "Y", "t"] {
            assert!(
                FieldValue::Text(raw.into()).is_active_sentinel(),
                "{raw} should read as active"
            );
        }
        assert!(FieldValue::Bool(true).is_active_sentinel());
        assert!(FieldValue::Number(1.0).is_active_sentinel());
        assert!(!FieldValue::Text("inactive".into()).is_active_sentinel());
        assert!(!FieldValue::Null.is_active_sentinel());
    }

    #[test]
    fn test_whole_numbers_render_without_fraction() {
        assert_eq!(FieldValue::Number(42.0).to_string(), "42");
        assert_eq!(FieldValue::Number(42.5).to_string(), "42.5");
        assert_eq!(FieldValue::Number(7.0).to_json(), serde_json::json!(7));
    }

    #[test]
    fn test_date_round_trip_json() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 25).unwrap();
        let v = FieldValue::Date(d);
        assert_eq!(v.to_json(), serde_json::json!("2024-03-25"));
        assert_eq!(v.to_string(), "2024-03-25");
    }

    #[test]
    fn test_equality_across_types() {
        assert_eq!(FieldValue::Number(3.0), FieldValue::Number(3.0));
        assert_ne!(FieldValue::Text("3".into()), FieldValue::Number(3.0));
        assert_eq!(FieldValue::Null, FieldValue::Null);
    }
}
