// Copyright (c) 2025 - Cowboy AI, Inc.
//! Filters
//!
//! The vocabulary of query fragments. A filter is interpreted either as a
//! *path* step (moving the cursor) or as a *filter* step (narrowing it),
//! depending on the fragment that wraps it. Some filters always move the
//! cursor regardless of the wrapper:
//!
//! | Filter | Moves cursor |
//! |---|---|
//! | `Related` | as a path fragment |
//! | `SwitchElementType` | always |
//! | `Recurse` | always |
//! | everything else | never |

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::{relationships, PropertyValue};
use crate::path::{CanonicalPath, RelativePath, SegmentType};

/// Role the cursor element plays in a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRole {
    Source,
    Target,
    Any,
}

/// Relationship-following step
///
/// As a path fragment the cursor moves from each element to the other end
/// of every matching relationship. As a filter fragment only elements with
/// at least one matching relationship are kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Related {
    /// Required counterpart at the other end
    pub entity: Option<CanonicalPath>,
    pub relationship_name: Option<String>,
    pub relationship_id: Option<String>,
    pub entity_role: EntityRole,
}

impl Related {
    /// Outgoing relationships of the given name
    pub fn by(name: impl Into<String>) -> Self {
        Self {
            entity: None,
            relationship_name: Some(name.into()),
            relationship_id: None,
            entity_role: EntityRole::Source,
        }
    }

    /// Incoming relationships of the given name
    pub fn as_target_by(name: impl Into<String>) -> Self {
        Self {
            entity_role: EntityRole::Target,
            ..Self::by(name)
        }
    }

    /// Containment children
    pub fn contains() -> Self {
        Self::by(relationships::CONTAINS)
    }

    /// Containment parent
    pub fn contained_in() -> Self {
        Self::as_target_by(relationships::CONTAINS)
    }

    /// Outgoing relationships of the given name pointing at `entity`
    pub fn with(entity: CanonicalPath, name: impl Into<String>) -> Self {
        Self {
            entity: Some(entity),
            ..Self::by(name)
        }
    }

    /// Incoming relationships of the given name coming from `entity`
    pub fn as_target_with(entity: CanonicalPath, name: impl Into<String>) -> Self {
        Self {
            entity: Some(entity),
            ..Self::as_target_by(name)
        }
    }

    /// Across the relationship with the given id
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            entity: None,
            relationship_name: None,
            relationship_id: Some(id.into()),
            entity_role: EntityRole::Any,
        }
    }
}

/// End of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeEnd {
    Source,
    Target,
}

/// Switch between entity and relationship cursors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchElementType {
    /// Entity to its outgoing relationships
    OutgoingRelationships,
    /// Entity to its incoming relationships
    IncomingRelationships,
    /// Entity to all of its relationships
    BothRelationships,
    /// Relationship to its source
    SourceEntities,
    /// Relationship to its target
    TargetEntities,
}

/// One query step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Related(Related),
    Ids(BTreeSet<String>),
    Types(BTreeSet<SegmentType>),
    Names(BTreeSet<String>),
    /// Property present with one of the values; any value if the set is empty
    PropertyValues {
        name: String,
        values: BTreeSet<PropertyValue>,
    },
    CanonicalPaths(BTreeSet<CanonicalPath>),
    RelativePaths {
        origin: CanonicalPath,
        paths: BTreeSet<RelativePath>,
    },
    RelationshipNames(BTreeSet<String>),
    RelationshipIds(BTreeSet<String>),
    RelationshipProperty {
        name: String,
        values: BTreeSet<PropertyValue>,
    },
    SourceOrTargetType {
        end: EdgeEnd,
        types: BTreeSet<SegmentType>,
    },
    SwitchElementType(SwitchElementType),
    /// Repeat the chain zero or more times, keeping every element reached
    Recurse(Vec<Filter>),
    /// Delimiter between alternative filter groups
    Noop,
}

impl Filter {
    pub fn id(id: impl Into<String>) -> Self {
        Filter::Ids(BTreeSet::from([id.into()]))
    }

    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Ids(ids.into_iter().map(Into::into).collect())
    }

    pub fn of_type(segment_type: SegmentType) -> Self {
        Filter::Types(BTreeSet::from([segment_type]))
    }

    pub fn types(types: impl IntoIterator<Item = SegmentType>) -> Self {
        Filter::Types(types.into_iter().collect())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Filter::Names(BTreeSet::from([name.into()]))
    }

    pub fn property(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Filter::PropertyValues {
            name: name.into(),
            values: BTreeSet::from([value.into()]),
        }
    }

    pub fn has_property(name: impl Into<String>) -> Self {
        Filter::PropertyValues {
            name: name.into(),
            values: BTreeSet::new(),
        }
    }

    pub fn path(path: CanonicalPath) -> Self {
        Filter::CanonicalPaths(BTreeSet::from([path]))
    }

    pub fn relative(origin: CanonicalPath, path: RelativePath) -> Self {
        Filter::RelativePaths {
            origin,
            paths: BTreeSet::from([path]),
        }
    }

    pub fn relationship_name(name: impl Into<String>) -> Self {
        Filter::RelationshipNames(BTreeSet::from([name.into()]))
    }

    pub fn relationship_id(id: impl Into<String>) -> Self {
        Filter::RelationshipIds(BTreeSet::from([id.into()]))
    }

    pub fn source_type(segment_type: SegmentType) -> Self {
        Filter::SourceOrTargetType {
            end: EdgeEnd::Source,
            types: BTreeSet::from([segment_type]),
        }
    }

    pub fn target_type(segment_type: SegmentType) -> Self {
        Filter::SourceOrTargetType {
            end: EdgeEnd::Target,
            types: BTreeSet::from([segment_type]),
        }
    }

    /// The element itself and every descendant over `contains`,
    /// optionally narrowed per step
    pub fn descendants(step_filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut chain = vec![Filter::Related(Related::contains())];
        chain.extend(step_filters);
        Filter::Recurse(chain)
    }

    /// Whether the filter moves the cursor even inside a filter fragment
    pub fn always_moves(&self) -> bool {
        matches!(self, Filter::SwitchElementType(_) | Filter::Recurse(_))
    }
}

impl From<Related> for Filter {
    fn from(related: Related) -> Self {
        Filter::Related(related)
    }
}

impl From<SwitchElementType> for Filter {
    fn from(switch: SwitchElementType) -> Self {
        Filter::SwitchElementType(switch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convenience_constructors_are_structural() {
        assert_eq!(Filter::id("a"), Filter::ids(["a"]));
        assert_eq!(
            Filter::of_type(SegmentType::Resource),
            Filter::types([SegmentType::Resource, SegmentType::Resource])
        );
        assert_ne!(Related::contains(), Related::contained_in());
    }

    #[test]
    fn test_descendants_chain() {
        let filter = Filter::descendants([Filter::of_type(SegmentType::Metric)]);
        match filter {
            Filter::Recurse(chain) => {
                assert_eq!(chain.len(), 2);
                assert_eq!(chain[0], Filter::Related(Related::contains()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_serialization_shape() {
        let json = serde_json::to_value(Filter::name("web")).unwrap();
        assert_eq!(json, serde_json::json!({"names": ["web"]}));
    }
}
