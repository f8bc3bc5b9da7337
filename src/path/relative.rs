// Copyright (c) 2025 - Cowboy AI, Inc.
//! Relative Paths
//!
//! A relative path is a sequence of steps interpreted against a canonical
//! origin: `..` climbs to the parent, a segment descends into a child.
//!
//! Bare ids (`eth0` rather than `r;eth0`) are accepted when parsing, but
//! only with an explicit [`ParseContext`]. The type of a bare id comes from
//! the context's target-type hint (for the terminal segment) or from the
//! single child type the current position allows. Anything else is
//! ambiguous and rejected.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::segment::{split_unescaped, unescape};
use super::{CanonicalPath, ParseContext, PathError, Segment, SegmentType};

/// One step of a relative path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelativeStep {
    /// Go to the parent
    Up,
    /// Descend into a child
    Down(Segment),
}

impl fmt::Display for RelativeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelativeStep::Up => write!(f, ".."),
            RelativeStep::Down(segment) => write!(f, "{}", segment),
        }
    }
}

/// Path interpreted against some canonical origin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath {
    steps: Vec<RelativeStep>,
}

impl RelativePath {
    /// The path that resolves to its origin
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a relative path
    pub fn builder() -> RelativePathBuilder {
        RelativePathBuilder::default()
    }

    pub(crate) fn from_steps(steps: Vec<RelativeStep>) -> Self {
        Self { steps }
    }

    /// Parse with an explicit context for untyped segments
    pub fn parse(raw: &str, context: &ParseContext) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        if raw == "." {
            return Ok(Self::empty());
        }

        let pieces = split_unescaped(raw, '/');
        let last = pieces.len() - 1;
        let mut position: Option<Vec<SegmentType>> = context
            .origin
            .as_ref()
            .map(|origin| origin.segments().iter().map(Segment::segment_type).collect());
        let mut steps = Vec::with_capacity(pieces.len());

        for (index, piece) in pieces.iter().enumerate() {
            if piece == ".." {
                if let Some(types) = position.as_mut() {
                    if types.pop().is_none() {
                        return Err(PathError::AboveRoot(raw.to_string()));
                    }
                }
                steps.push(RelativeStep::Up);
                continue;
            }

            let segment = if split_unescaped(piece, ';').len() > 1 {
                Segment::parse(piece)?
            } else {
                let id = unescape(piece);
                if id.is_empty() {
                    return Err(PathError::MalformedSegment(raw.to_string()));
                }
                let hint = if index == last { context.target_type } else { None };
                let segment_type = infer_type(position.as_deref(), hint)
                    .ok_or_else(|| PathError::AmbiguousSegment(id.clone()))?;
                Segment::new(segment_type, id)
            };

            if let Some(types) = position.as_mut() {
                types.push(segment.segment_type());
            }
            steps.push(RelativeStep::Down(segment));
        }

        Ok(Self { steps })
    }

    /// Resolve against `origin` into a canonical path
    pub fn resolve(&self, origin: &CanonicalPath) -> Result<CanonicalPath, PathError> {
        let mut segments = origin.segments().to_vec();
        for step in &self.steps {
            match step {
                RelativeStep::Up => {
                    if segments.pop().is_none() {
                        return Err(PathError::AboveRoot(origin.to_string()));
                    }
                }
                RelativeStep::Down(segment) => segments.push(segment.clone()),
            }
        }
        if segments.is_empty() {
            return Err(PathError::AboveRoot(origin.to_string()));
        }
        segments
            .iter()
            .fold(CanonicalPath::builder(), |builder, segment| {
                builder.with_segment(segment.segment_type(), segment.id())
            })
            .build()
    }

    /// Compose with a path relative to the end of this one
    pub fn join(&self, other: &RelativePath) -> RelativePath {
        let mut steps = self.steps.clone();
        for step in &other.steps {
            match (step, steps.last()) {
                (RelativeStep::Up, Some(RelativeStep::Down(_))) => {
                    steps.pop();
                }
                _ => steps.push(step.clone()),
            }
        }
        RelativePath { steps }
    }

    /// Append one segment
    pub fn extend(&self, segment: Segment) -> RelativePath {
        let mut steps = self.steps.clone();
        steps.push(RelativeStep::Down(segment));
        RelativePath { steps }
    }

    /// A builder seeded with this path's steps (copy-on-write)
    pub fn modified(&self) -> RelativePathBuilder {
        RelativePathBuilder {
            steps: self.steps.clone(),
        }
    }

    pub fn steps(&self) -> &[RelativeStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Type of the terminal segment, if the path ends by descending
    pub fn target_type(&self) -> Option<SegmentType> {
        match self.steps.last() {
            Some(RelativeStep::Down(segment)) => Some(segment.segment_type()),
            _ => None,
        }
    }
}

fn infer_type(position: Option<&[SegmentType]>, hint: Option<SegmentType>) -> Option<SegmentType> {
    if hint.is_some() {
        return hint;
    }
    let current = position?.last()?;
    match current.allowed_children().as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, ".");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

impl FromStr for RelativePath {
    type Err = PathError;

    /// Parse a fully-typed relative path
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, &ParseContext::default())
    }
}

impl TryFrom<String> for RelativePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.to_string()
    }
}

impl PartialOrd for RelativePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RelativePath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

/// Builder for [`RelativePath`]
#[derive(Debug, Clone, Default)]
pub struct RelativePathBuilder {
    steps: Vec<RelativeStep>,
}

impl RelativePathBuilder {
    /// Climb to the parent
    pub fn up(mut self) -> Self {
        self.steps.push(RelativeStep::Up);
        self
    }

    /// Descend into a child
    pub fn with_segment(mut self, segment_type: SegmentType, id: impl Into<String>) -> Self {
        self.steps.push(RelativeStep::Down(Segment::new(segment_type, id)));
        self
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

    pub fn build(self) -> RelativePath {
        RelativePath { steps: self.steps }
    }
}
