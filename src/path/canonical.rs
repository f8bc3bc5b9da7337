// Copyright (c) 2025 - Cowboy AI, Inc.
//! Canonical Paths
//!
//! Absolute, immutable identifiers for graph elements.
//!
//! # Invariants
//!
//! - At most one segment of each type, except nested resources
//! - A relationship path is exactly one relationship segment
//! - A path is *defined* iff it carries a tenant id or a relationship id
//! - Equality and hashing are structural over all segments
//! - Ordering follows the string form
//! - `p.to_string().parse() == Ok(p)` for every defined `p`
//!
//! # Examples
//!
//! ```rust
//! use cim_inventory::path::CanonicalPath;
//!
//! let path = CanonicalPath::builder()
//!     .with_tenant_id("acme")
//!     .with_environment_id("prod")
//!     .with_resource_id("web01")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(path.to_string(), "/t;acme/e;prod/r;web01");
//! assert_eq!("/t;acme/e;prod/r;web01".parse::<CanonicalPath>().unwrap(), path);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::relative::{RelativePath, RelativeStep};
use super::segment::split_unescaped;
use super::{ParseContext, PathError, Segment, SegmentType};
use crate::model::Element;

/// Absolute path of a graph element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalPath {
    segments: Vec<Segment>,
}

impl CanonicalPath {
    /// The sentinel returned when no path can be derived
    pub fn undefined() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Start building a path
    pub fn builder() -> CanonicalPathBuilder {
        CanonicalPathBuilder::default()
    }

    /// Path of a relationship
    pub fn relationship(id: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::new(SegmentType::Relationship, id)],
        }
    }

    /// Path of a tenant
    pub fn tenant(id: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::new(SegmentType::Tenant, id)],
        }
    }

    /// Derive the path of a typed element from the parent ids it knows.
    ///
    /// Structured-data representations have no path of their own and yield
    /// [`CanonicalPath::undefined`].
    pub fn of(element: &Element) -> Self {
        let built = match element {
            Element::Tenant(tenant) => Ok(Self::tenant(&tenant.id)),
            Element::Environment(env) => Self::builder()
                .with_tenant_id(&env.tenant_id)
                .with_environment_id(&env.id)
                .build(),
            Element::Feed(feed) => feed.location.builder().with_feed_id(&feed.id).build(),
            Element::ResourceType(rt) => {
                rt.location.builder().with_resource_type_id(&rt.id).build()
            }
            Element::MetricType(mt) => mt.location.builder().with_metric_type_id(&mt.id).build(),
            Element::Resource(resource) => resource
                .location
                .builder()
                .with_resource_id(&resource.id)
                .build(),
            Element::Metric(metric) => metric.location.builder().with_metric_id(&metric.id).build(),
            Element::OperationType(ot) => ot
                .resource_type
                .modified()
                .with_operation_type_id(&ot.id)
                .build(),
            Element::DataEntity(data) => data
                .owner
                .modified()
                .with_data_role(data.role.as_str())
                .build(),
            Element::Relationship(rel) => Ok(Self::relationship(&rel.id)),
            Element::StructuredData(_) | Element::ShallowStructuredData(_) => {
                return Self::undefined()
            }
        };
        built.unwrap_or_else(|_| Self::undefined())
    }

    /// Parse the canonical string form
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        let body = raw
            .strip_prefix('/')
            .ok_or_else(|| PathError::MissingLeadingSlash(raw.to_string()))?;
        if body.is_empty() {
            return Ok(Self::undefined());
        }

        let mut builder = Self::builder();
        for piece in split_unescaped(body, '/') {
            let segment = Segment::parse(&piece)?;
            builder = builder.with_segment(segment.segment_type(), segment.id());
        }
        builder.build()
    }

    /// Parse either an absolute path or a relative one resolved against the
    /// context origin.
    pub fn parse_in(raw: &str, context: &ParseContext) -> Result<Self, PathError> {
        if raw.starts_with('/') {
            return Self::parse(raw);
        }
        let origin = context
            .origin
            .as_ref()
            .ok_or_else(|| PathError::MissingOrigin(raw.to_string()))?;
        RelativePath::parse(raw, context)?.resolve(origin)
    }

    /// A builder seeded with this path's segments (copy-on-write)
    pub fn modified(&self) -> CanonicalPathBuilder {
        CanonicalPathBuilder {
            segments: self.segments.clone(),
            error: None,
        }
    }

    /// True iff the path carries a tenant id or a relationship id
    pub fn is_defined(&self) -> bool {
        self.tenant_id().is_some() || self.relationship_id().is_some()
    }

    /// All segments, root first
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The last segment
    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Type of the addressed element
    pub fn segment_type(&self) -> Option<SegmentType> {
        self.last_segment().map(Segment::segment_type)
    }

    /// Id of the addressed element
    pub fn id(&self) -> Option<&str> {
        self.last_segment().map(Segment::id)
    }

    fn first_id_of(&self, segment_type: SegmentType) -> Option<&str> {
        self.segments
            .iter()
            .find(|s| s.segment_type() == segment_type)
            .map(Segment::id)
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.first_id_of(SegmentType::Tenant)
    }

    pub fn environment_id(&self) -> Option<&str> {
        self.first_id_of(SegmentType::Environment)
    }

    pub fn feed_id(&self) -> Option<&str> {
        self.first_id_of(SegmentType::Feed)
    }

    pub fn resource_type_id(&self) -> Option<&str> {
        self.first_id_of(SegmentType::ResourceType)
    }

    pub fn metric_type_id(&self) -> Option<&str> {
        self.first_id_of(SegmentType::MetricType)
    }

    /// Ids of all (possibly nested) resources, outermost first
    pub fn resource_ids(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter(|s| s.segment_type() == SegmentType::Resource)
            .map(Segment::id)
            .collect()
    }

    pub fn metric_id(&self) -> Option<&str> {
        self.first_id_of(SegmentType::Metric)
    }

    pub fn operation_type_id(&self) -> Option<&str> {
        self.first_id_of(SegmentType::OperationType)
    }

    pub fn data_role(&self) -> Option<&str> {
        self.first_id_of(SegmentType::DataEntity)
    }

    pub fn relationship_id(&self) -> Option<&str> {
        self.first_id_of(SegmentType::Relationship)
    }

    /// Drop the last segment. `None` at the root.
    pub fn up(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Ancestors from the immediate parent to the root
    pub fn ancestors(&self) -> impl Iterator<Item = CanonicalPath> {
        std::iter::successors(self.up(), CanonicalPath::up)
    }

    /// The tenant this path lives under
    pub fn root(&self) -> Option<Self> {
        self.tenant_id().map(Self::tenant)
    }

    /// Whether `self` is a strict prefix of `other`
    pub fn is_ancestor_of(&self, other: &CanonicalPath) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Whether `other` is a direct child of `self`
    pub fn is_parent_of(&self, other: &CanonicalPath) -> bool {
        self.is_ancestor_of(other) && other.segments.len() == self.segments.len() + 1
    }

    /// Append a segment, keeping the type-uniqueness rules
    pub fn extend(&self, segment_type: SegmentType, id: impl Into<String>) -> Result<Self, PathError> {
        self.modified().with_segment(segment_type, id).build()
    }

    /// Check the path against the containment schema
    pub fn validate(&self) -> Result<(), PathError> {
        let first = self.segments.first().ok_or(PathError::Empty)?;
        match first.segment_type() {
            SegmentType::Relationship if self.segments.len() == 1 => return Ok(()),
            SegmentType::Relationship => return Err(PathError::RelationshipNotAlone),
            SegmentType::Tenant => {}
            _ => return Err(PathError::MissingTenant(self.to_string())),
        }
        for pair in self.segments.windows(2) {
            let (parent, child) = (pair[0].segment_type(), pair[1].segment_type());
            if !parent.can_contain(child) {
                return Err(PathError::InvalidContainment { parent, child });
            }
        }
        Ok(())
    }

    /// The relative path leading from `origin` to `self`
    pub fn relative_to(&self, origin: &CanonicalPath) -> RelativePath {
        let common = self
            .segments
            .iter()
            .zip(origin.segments.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let ups = origin.segments.len() - common;
        let steps = std::iter::repeat(RelativeStep::Up)
            .take(ups)
            .chain(
                self.segments[common..]
                    .iter()
                    .cloned()
                    .map(RelativeStep::Down),
            )
            .collect();
        RelativePath::from_steps(steps)
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for CanonicalPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CanonicalPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CanonicalPath> for String {
    fn from(path: CanonicalPath) -> Self {
        path.to_string()
    }
}

impl PartialOrd for CanonicalPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CanonicalPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

/// Builder for [`CanonicalPath`]
///
/// No validation beyond type uniqueness happens here; containment is checked
/// by [`CanonicalPath::validate`] when a backend persists.
#[derive(Debug, Clone, Default)]
pub struct CanonicalPathBuilder {
    segments: Vec<Segment>,
    error: Option<PathError>,
}

impl CanonicalPathBuilder {
    /// Append a segment of any type
    pub fn with_segment(mut self, segment_type: SegmentType, id: impl Into<String>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let id = id.into();
        if id.is_empty() {
            self.error = Some(PathError::EmptyId(segment_type));
            return self;
        }
        if (segment_type == SegmentType::Relationship && !self.segments.is_empty())
            || self
                .segments
                .iter()
                .any(|s| s.segment_type() == SegmentType::Relationship)
        {
            self.error = Some(PathError::RelationshipNotAlone);
            return self;
        }
        if !segment_type.is_repeatable()
            && self.segments.iter().any(|s| s.segment_type() == segment_type)
        {
            self.error = Some(PathError::DuplicateSegment(segment_type));
            return self;
        }
        self.segments.push(Segment::new(segment_type, id));
        self
    }

    pub fn with_tenant_id(self, id: impl Into<String>) -> Self {
        self.with_segment(SegmentType::Tenant, id)
    }

    pub fn with_environment_id(self, id: impl Into<String>) -> Self {
        self.with_segment(SegmentType::Environment, id)
    }

    pub fn with_feed_id(self, id: impl Into<String>) -> Self {
        self.with_segment(SegmentType::Feed, id)
    }

    pub fn with_resource_type_id(self, id: impl Into<String>) -> Self {
        self.with_segment(SegmentType::ResourceType, id)
    }

    pub fn with_metric_type_id(self, id: impl Into<String>) -> Self {
        self.with_segment(SegmentType::MetricType, id)
    }

    pub fn with_resource_id(self, id: impl Into<String>) -> Self {
        self.with_segment(SegmentType::Resource, id)
    }

    pub fn with_metric_id(self, id: impl Into<String>) -> Self {
        self.with_segment(SegmentType::Metric, id)
    }

    pub fn with_operation_type_id(self, id: impl Into<String>) -> Self {
        self.with_segment(SegmentType::OperationType, id)
    }

    pub fn with_data_role(self, role: impl Into<String>) -> Self {
        self.with_segment(SegmentType::DataEntity, role)
    }

    pub fn with_relationship_id(self, id: impl Into<String>) -> Self {
        self.with_segment(SegmentType::Relationship, id)
    }

    /// Finish the path
    pub fn build(self) -> Result<CanonicalPath, PathError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(CanonicalPath {
            segments: self.segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn metric_path() -> CanonicalPath {
        CanonicalPath::builder()
            .with_tenant_id("acme")
            .with_environment_id("prod")
            .with_resource_id("web01")
            .with_resource_id("eth0")
            .with_metric_id("rx-bytes")
            .build()
            .unwrap()
    }

    #[test]
    fn test_string_form() {
        assert_eq!(
            metric_path().to_string(),
            "/t;acme/e;prod/r;web01/r;eth0/m;rx-bytes"
        );
        assert_eq!(CanonicalPath::relationship("42").to_string(), "/rl;42");
    }

    #[test]
    fn test_parse_round_trip() {
        let path = metric_path();
        assert_eq!(path.to_string().parse::<CanonicalPath>().unwrap(), path);

        let rel = CanonicalPath::relationship("a;b");
        assert_eq!(rel.to_string().parse::<CanonicalPath>().unwrap(), rel);
    }

    #[test]
    fn test_accessors() {
        let path = metric_path();
        assert_eq!(path.tenant_id(), Some("acme"));
        assert_eq!(path.environment_id(), Some("prod"));
        assert_eq!(path.resource_ids(), vec!["web01", "eth0"]);
        assert_eq!(path.metric_id(), Some("rx-bytes"));
        assert_eq!(path.segment_type(), Some(SegmentType::Metric));
        assert_eq!(path.feed_id(), None);
    }

    #[test]
    fn test_defined() {
        assert!(metric_path().is_defined());
        assert!(CanonicalPath::relationship("x").is_defined());
        assert!(!CanonicalPath::undefined().is_defined());

        let no_tenant = CanonicalPath::builder().with_environment_id("e").build().unwrap();
        assert!(!no_tenant.is_defined());
    }

    #[test]
    fn test_uniqueness_rules() {
        let duplicate = CanonicalPath::builder()
            .with_tenant_id("a")
            .with_tenant_id("b")
            .build();
        assert_eq!(duplicate, Err(PathError::DuplicateSegment(SegmentType::Tenant)));

        let rel = CanonicalPath::builder()
            .with_tenant_id("a")
            .with_relationship_id("r")
            .build();
        assert_eq!(rel, Err(PathError::RelationshipNotAlone));
    }

    #[test]
    fn test_up_and_ancestors() {
        let path = metric_path();
        let parent = path.up().unwrap();
        assert_eq!(parent.to_string(), "/t;acme/e;prod/r;web01/r;eth0");
        assert!(parent.is_parent_of(&path));

        let ancestors: Vec<String> = path.ancestors().map(|p| p.to_string()).collect();
        assert_eq!(
            ancestors,
            vec![
                "/t;acme/e;prod/r;web01/r;eth0",
                "/t;acme/e;prod/r;web01",
                "/t;acme/e;prod",
                "/t;acme",
            ]
        );
        assert!(CanonicalPath::tenant("acme").up().is_none());
    }

    #[test]
    fn test_validate_containment() {
        assert!(metric_path().validate().is_ok());

        let bad = CanonicalPath::builder()
            .with_tenant_id("a")
            .with_metric_id("m")
            .build()
            .unwrap();
        assert_eq!(
            bad.validate(),
            Err(PathError::InvalidContainment {
                parent: SegmentType::Tenant,
                child: SegmentType::Metric,
            })
        );
    }

    #[test]
    fn test_relative_to() {
        let web = CanonicalPath::parse("/t;acme/e;prod/r;web01").unwrap();
        let db = CanonicalPath::parse("/t;acme/e;prod/r;db01/m;load").unwrap();
        let relative = db.relative_to(&web);
        assert_eq!(relative.to_string(), "../r;db01/m;load");
        assert_eq!(relative.resolve(&web).unwrap(), db);
    }

    #[test]
    fn test_ordering_follows_string_form() {
        let a = CanonicalPath::parse("/t;a/e;x").unwrap();
        let b = CanonicalPath::parse("/t;b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_serde_as_string() {
        let path = metric_path();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/t;acme/e;prod/r;web01/r;eth0/m;rx-bytes\"");
        let back: CanonicalPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
