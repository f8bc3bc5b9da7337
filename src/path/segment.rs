// Copyright (c) 2025 - Cowboy AI, Inc.
//! Path Segments
//!
//! A segment is one `(type-tag, id)` step of a path. The set of type tags is
//! closed: every element the inventory can address has exactly one
//! [`SegmentType`].
//!
//! # String Form
//!
//! ```text
//! {tag};{id}
//! ```
//!
//! Ids are opaque. The characters `/`, `;` and `\` are escaped with a
//! backslash so that any id survives a round-trip through the string form.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::PathError;

/// Closed set of element types addressable by a path
///
/// The declaration order is also the containment order used to sort types
/// (tenant first, leaf types last).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    /// Root of every entity path
    Tenant,
    /// Deployment environment (prod, staging, ...)
    Environment,
    /// Agent/feed reporting inventory
    Feed,
    /// Type of resources
    ResourceType,
    /// Type of metrics
    MetricType,
    /// Resource (may nest inside another resource)
    Resource,
    /// Metric
    Metric,
    /// Operation declared by a resource type
    OperationType,
    /// Structured data attached to an entity under a role
    DataEntity,
    /// Edge between two entities
    Relationship,
}

impl SegmentType {
    /// Every segment type, in containment order
    pub const ALL: [SegmentType; 10] = [
        Self::Tenant,
        Self::Environment,
        Self::Feed,
        Self::ResourceType,
        Self::MetricType,
        Self::Resource,
        Self::Metric,
        Self::OperationType,
        Self::DataEntity,
        Self::Relationship,
    ];

    /// Serialized tag used in the path grammar
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Tenant => "t",
            Self::Environment => "e",
            Self::Feed => "f",
            Self::ResourceType => "rt",
            Self::MetricType => "mt",
            Self::Resource => "r",
            Self::Metric => "m",
            Self::OperationType => "ot",
            Self::DataEntity => "d",
            Self::Relationship => "rl",
        }
    }

    /// Parse a serialized tag
    pub fn from_tag(tag: &str) -> Result<Self, PathError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.tag() == tag)
            .ok_or_else(|| PathError::UnknownSegmentType(tag.to_string()))
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Tenant => "Tenant",
            Self::Environment => "Environment",
            Self::Feed => "Feed",
            Self::ResourceType => "Resource Type",
            Self::MetricType => "Metric Type",
            Self::Resource => "Resource",
            Self::Metric => "Metric",
            Self::OperationType => "Operation Type",
            Self::DataEntity => "Data Entity",
            Self::Relationship => "Relationship",
        }
    }

    /// Whether an element of this type may directly contain `child`
    pub fn can_contain(&self, child: SegmentType) -> bool {
        use SegmentType::*;
        matches!(
            (self, child),
            (Tenant, Environment | Feed | ResourceType | MetricType)
                | (Environment, Feed | Resource | Metric)
                | (Feed, ResourceType | MetricType | Resource | Metric)
                | (ResourceType, OperationType | DataEntity)
                | (Resource, Resource | Metric | DataEntity)
                | (OperationType, DataEntity)
        )
    }

    /// Child types this type may contain
    pub fn allowed_children(&self) -> Vec<SegmentType> {
        Self::ALL
            .iter()
            .copied()
            .filter(|child| self.can_contain(*child))
            .collect()
    }

    /// Whether more than one segment of this type may appear in a path
    pub fn is_repeatable(&self) -> bool {
        matches!(self, Self::Resource)
    }

    /// Whether this type is an entity (a vertex) rather than a relationship
    pub fn is_entity(&self) -> bool {
        !matches!(self, Self::Relationship)
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// One `(type, id)` step of a path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    segment_type: SegmentType,
    id: String,
}

impl Segment {
    /// Create a segment
    pub fn new(segment_type: SegmentType, id: impl Into<String>) -> Self {
        Self {
            segment_type,
            id: id.into(),
        }
    }

    /// Segment type
    pub fn segment_type(&self) -> SegmentType {
        self.segment_type
    }

    /// Segment id (unescaped)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parse `tag;id` (the id may be escaped)
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let parts = split_unescaped(raw, ';');
        match parts.as_slice() {
            [tag, id] => {
                let segment_type = SegmentType::from_tag(tag)?;
                let id = unescape(id);
                if id.is_empty() {
                    return Err(PathError::EmptyId(segment_type));
                }
                Ok(Self::new(segment_type, id))
            }
            _ => Err(PathError::MalformedSegment(raw.to_string())),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.segment_type.tag(), escape(&self.id))
    }
}

/// Escape the path separators in an id
pub(crate) fn escape(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for ch in id.chars() {
        if matches!(ch, '\\' | '/' | ';') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Reverse of [`escape`]
pub(crate) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Split on `sep` where it is not preceded by an escaping backslash.
///
/// The returned pieces are still escaped.
pub(crate) fn split_unescaped(raw: &str, sep: char) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            current.push(ch);
            if let Some(next) = chars.next() {
                current.push(next);
            }
        } else if ch == sep {
            pieces.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    pieces.push(current);
    pieces
}
