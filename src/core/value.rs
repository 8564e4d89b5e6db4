use serde::{Deserialize, Serialize};
use std::fmt;

/// A single metadata cell of an asset.
///
/// Closed set of shapes a field may hold. Serialized untagged so snapshots carry
/// plain JSON scalars (`null`, `"rack-7"`, `42`, `true`, `["a", "b"]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Number(f64),
    Text(String),
    TextList(Vec<String>),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Boolean(_) => "BOOLEAN",
            Self::Number(_) => "NUMBER",
            Self::Text(_) => "TEXT",
            Self::TextList(_) => "TEXT_LIST",
        }
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

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::TextList(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True when the value would not satisfy a "required" field: null,
    /// whitespace-only text or an empty list.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::TextList(items) => items.is_empty(),
            Self::Boolean(_) | Self::Number(_) => false,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => {
                // NaN == NaN, so a cached value always equals its own clone
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                a == b
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::TextList(a), Self::TextList(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
            Self::TextList(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::TextList(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json_shapes() {
        let values: Vec<FieldValue> =
            serde_json::from_str(r#"[null, true, 4.5, "rack-7", ["a", "b"]]"#).unwrap();
        assert_eq!(values[0], FieldValue::Null);
        assert_eq!(values[1], FieldValue::Boolean(true));
        assert_eq!(values[2], FieldValue::Number(4.5));
        assert_eq!(values[3], FieldValue::from("rack-7"));
        assert_eq!(
            values[4],
            FieldValue::TextList(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_equality_is_per_variant() {
        assert_ne!(FieldValue::from("1"), FieldValue::Number(1.0));
        assert_ne!(FieldValue::Null, FieldValue::from(""));
        assert_eq!(FieldValue::Number(f64::NAN), FieldValue::Number(f64::NAN));
    }

    #[test]
    fn test_blank_values() {
        assert!(FieldValue::Null.is_blank());
        assert!(FieldValue::from("   ").is_blank());
        assert!(FieldValue::TextList(vec![]).is_blank());
        assert!(!FieldValue::Boolean(false).is_blank());
        assert!(!FieldValue::Number(0.0).is_blank());
    }
}
