// Copyright (c) 2025 - Cowboy AI, Inc.
//! Structured Data
//!
//! Tree-shaped values attached to entities through data entities
//! (configuration, operation parameter types, ...).
//!
//! Two representations exist:
//!
//! - [`StructuredData`] - the full tree
//! - [`ShallowStructuredData`] - one node with its own scalar value and the
//!   keys of its children, without loading the children themselves

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Full structured data tree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum StructuredData {
    #[default]
    Undefined,
    Bool(bool),
    Integral(i64),
    FloatingPoint(f64),
    Text(String),
    List(Vec<StructuredData>),
    Map(BTreeMap<String, StructuredData>),
}

/// Kind of a structured data node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredDataKind {
    Undefined,
    Bool,
    Integral,
    FloatingPoint,
    Text,
    List,
    Map,
}

impl StructuredData {
    /// Kind of this node
    pub fn kind(&self) -> StructuredDataKind {
        match self {
            Self::Undefined => StructuredDataKind::Undefined,
            Self::Bool(_) => StructuredDataKind::Bool,
            Self::Integral(_) => StructuredDataKind::Integral,
            Self::FloatingPoint(_) => StructuredDataKind::FloatingPoint,
            Self::Text(_) => StructuredDataKind::Text,
            Self::List(_) => StructuredDataKind::List,
            Self::Map(_) => StructuredDataKind::Map,
        }
    }

    /// Child by map key or list index
    pub fn child(&self, key: &str) -> Option<&StructuredData> {
        match self {
            Self::Map(map) => map.get(key),
            Self::List(list) => key.parse::<usize>().ok().and_then(|i| list.get(i)),
            _ => None,
        }
    }

    /// Follow a sequence of keys
    pub fn get(&self, keys: &[&str]) -> Option<&StructuredData> {
        keys.iter().try_fold(self, |node, key| node.child(key))
    }

    /// Shallow view of this node
    pub fn shallow(&self) -> ShallowStructuredData {
        let (scalar, keys) = match self {
            Self::List(list) => (None, (0..list.len()).map(|i| i.to_string()).collect()),
            Self::Map(map) => (None, map.keys().cloned().collect()),
            scalar => (Some(scalar.clone()), Vec::new()),
        };
        ShallowStructuredData {
            kind: self.kind(),
            scalar,
            child_keys: keys,
        }
    }
}

/// One structured data node without its children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShallowStructuredData {
    pub kind: StructuredDataKind,

    /// Value of scalar nodes; `None` for lists and maps
    pub scalar: Option<StructuredData>,

    /// Map keys, or list indices rendered as strings
    pub child_keys: Vec<String>,
}

impl From<&str> for StructuredData {
    fn from(value: &str) -> Self {
        StructuredData::Text(value.to_string())
    }
}

impl From<i64> for StructuredData {
    fn from(value: i64) -> Self {
        StructuredData::Integral(value)
    }
}

impl From<bool> for StructuredData {
    fn from(value: bool) -> Self {
        StructuredData::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StructuredData {
        let mut map = BTreeMap::new();
        map.insert("port".to_string(), 8080i64.into());
        map.insert(
            "hosts".to_string(),
            StructuredData::List(vec!["a".into(), "b".into()]),
        );
        StructuredData::Map(map)
    }

    #[test]
    fn test_navigation() {
        let data = sample();
        assert_eq!(data.get(&["port"]), Some(&StructuredData::Integral(8080)));
        assert_eq!(data.get(&["hosts", "1"]), Some(&StructuredData::from("b")));
        assert_eq!(data.get(&["hosts", "7"]), None);
    }

    #[test]
    fn test_shallow_view() {
        let shallow = sample().shallow();
        assert_eq!(shallow.kind, StructuredDataKind::Map);
        assert_eq!(shallow.scalar, None);
        assert_eq!(shallow.child_keys, vec!["hosts", "port"]);

        let leaf = StructuredData::Bool(true).shallow();
        assert_eq!(leaf.scalar, Some(StructuredData::Bool(true)));
        assert!(leaf.child_keys.is_empty());
    }
}
