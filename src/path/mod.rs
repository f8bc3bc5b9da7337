// Copyright (c) 2025 - Cowboy AI, Inc.
//! Path Addressing Model
//!
//! Every element of the inventory graph is addressed by a structured,
//! typed, hierarchical identifier.
//!
//! # Canonical Paths
//!
//! ```text
//! /t;acme/e;prod/r;web01/r;eth0/m;rx-bytes     entity
//! /rl;0192f0c4-...                             relationship
//! ```
//!
//! A canonical path is absolute. It starts at a tenant, or is a single
//! relationship segment.
//!
//! # Relative Paths
//!
//! ```text
//! ../r;eth1          sibling of the origin
//! r;eth0/m;rx        descendant of the origin
//! eth0               bare id, typed from the parse context
//! ```
//!
//! Relative paths are interpreted against an explicit origin supplied by the
//! caller in a [`ParseContext`]. There is no ambient state involved.

pub mod canonical;
pub mod relative;
pub mod segment;

pub use canonical::{CanonicalPath, CanonicalPathBuilder};
pub use relative::{RelativePath, RelativePathBuilder, RelativeStep};
pub use segment::{Segment, SegmentType};

use thiserror::Error;

/// Path parse and build errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Path is empty")]
    Empty,

    #[error("Canonical path must start with '/': {0}")]
    MissingLeadingSlash(String),

    #[error("Unknown segment type tag: {0}")]
    UnknownSegmentType(String),

    #[error("Malformed segment: {0}")]
    MalformedSegment(String),

    #[error("Empty id for segment of type {0}")]
    EmptyId(SegmentType),

    #[error("Segment type {0} may appear only once in a path")]
    DuplicateSegment(SegmentType),

    #[error("A relationship path consists of exactly one relationship segment")]
    RelationshipNotAlone,

    #[error("{parent} cannot contain {child}")]
    InvalidContainment {
        parent: SegmentType,
        child: SegmentType,
    },

    #[error("Path must start with a tenant: {0}")]
    MissingTenant(String),

    #[error("Relative path climbs above the root of {0}")]
    AboveRoot(String),

    #[error("Cannot determine the type of untyped segment '{0}'")]
    AmbiguousSegment(String),

    #[error("Relative path '{0}' needs an origin to resolve against")]
    MissingOrigin(String),
}

/// Explicit context for parsing partially-typed paths
///
/// Carries the origin a relative path is interpreted against and the
/// expected type of the terminal segment, used to type bare ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseContext {
    /// Path relative paths are resolved against
    pub origin: Option<CanonicalPath>,

    /// Expected type of the last segment
    pub target_type: Option<SegmentType>,
}

impl ParseContext {
    /// Context with an origin only
    pub fn with_origin(origin: CanonicalPath) -> Self {
        Self {
            origin: Some(origin),
            target_type: None,
        }
    }

    /// Set the expected terminal type
    pub fn expecting(mut self, target_type: SegmentType) -> Self {
        self.target_type = Some(target_type);
        self
    }
}
