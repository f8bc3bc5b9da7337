// Copyright (c) 2025 - Cowboy AI, Inc.
//! Generic entity properties

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// User-defined properties of an entity or relationship
pub type Properties = BTreeMap<String, PropertyValue>;

/// Value of a single property
///
/// Restricted to totally ordered, hashable scalars so that property values
/// can take part in query equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl PropertyValue {
    /// Text content, if this is a text value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_serialization() {
        let mut props = Properties::new();
        props.insert("owner".into(), "ops".into());
        props.insert("cores".into(), 16i64.into());
        props.insert("virtual".into(), false.into());

        let json = serde_json::to_value(&props).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"cores": 16, "owner": "ops", "virtual": false})
        );

        let back: Properties = serde_json::from_value(json).unwrap();
        assert_eq!(back, props);
    }
}
