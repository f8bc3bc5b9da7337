// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Inventory Paths
//!
//! Canonical paths must survive a round-trip through their string form for
//! any ids, including ids containing the separator characters, and two
//! paths are equal exactly when their segment lists are.

use cim_inventory::path::{CanonicalPath, ParseContext, RelativePath, SegmentType};
use proptest::prelude::*;
use test_case::test_case;

// ============================================================================
// Strategies
// ============================================================================

/// Ids drawn from a small alphabet that includes every escaped character
fn id() -> impl Strategy<Value = String> {
    "[a-z0-9;/\\\\._-]{1,10}"
}

/// Entity paths `/t/e?/r*/m?`
fn entity_path() -> impl Strategy<Value = CanonicalPath> {
    (
        id(),
        proptest::option::of(id()),
        proptest::collection::vec(id(), 0..4),
        proptest::option::of(id()),
    )
        .prop_map(|(tenant, environment, resources, metric)| {
            let mut builder = CanonicalPath::builder().with_tenant_id(tenant);
            if let Some(environment) = environment {
                builder = builder.with_environment_id(environment);
                for resource in resources {
                    builder = builder.with_resource_id(resource);
                }
                if let Some(metric) = metric {
                    builder = builder.with_metric_id(metric);
                }
            }
            builder.build().expect("generated path is well formed")
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// parse(to_string(p)) == p
    #[test]
    fn prop_string_form_round_trips(path in entity_path()) {
        let parsed = CanonicalPath::parse(&path.to_string()).unwrap();
        prop_assert_eq!(parsed, path);
    }

    /// Relationship paths round-trip too
    #[test]
    fn prop_relationship_round_trips(rel_id in id()) {
        let path = CanonicalPath::relationship(rel_id.clone());
        let parsed = CanonicalPath::parse(&path.to_string()).unwrap();
        prop_assert_eq!(parsed.relationship_id(), Some(rel_id.as_str()));
    }

    /// Equality and string equality agree
    #[test]
    fn prop_equality_matches_string_form(a in entity_path(), b in entity_path()) {
        prop_assert_eq!(a == b, a.to_string() == b.to_string());
    }

    /// Resolving `p.relative_to(o)` against `o` gives back `p`
    #[test]
    fn prop_relative_to_resolves_back(a in entity_path(), b in entity_path()) {
        let relative = a.relative_to(&b);
        prop_assert_eq!(relative.resolve(&b).unwrap(), a);
    }

    /// Every generated path satisfies the containment schema and its parent
    /// is one segment shorter
    #[test]
    fn prop_parent_is_prefix(path in entity_path()) {
        prop_assert!(path.validate().is_ok());
        if let Some(parent) = path.up() {
            prop_assert_eq!(parent.depth() + 1, path.depth());
            prop_assert!(parent.is_parent_of(&path));
        }
    }
}

// ============================================================================
// Parse tables
// ============================================================================

#[test_case("/t;acme" ; "tenant")]
#[test_case("/t;acme/e;prod/r;web01/r;eth0/m;rx" ; "nested resources")]
#[test_case("/t;acme/f;agent/rt;host" ; "feed resource type")]
#[test_case("/t;acme/rt;host/ot;start/d;returnType" ; "operation data")]
#[test_case("/rl;0192f0c4" ; "relationship")]
#[test_case("/t;a\\/b/e;x\\;y" ; "escaped ids")]
fn test_valid_paths_parse(raw: &str) {
    let path = CanonicalPath::parse(raw).unwrap();
    assert_eq!(path.to_string(), raw);
}

#[test_case("" ; "empty")]
#[test_case("t;acme" ; "no leading slash")]
#[test_case("/x;acme" ; "unknown tag")]
#[test_case("/t;a/t;b" ; "duplicate tenant")]
#[test_case("/t;a/rl;x" ; "relationship not alone")]
#[test_case("/t;a/e;" ; "empty id")]
fn test_invalid_paths_rejected(raw: &str) {
    assert!(CanonicalPath::parse(raw).is_err());
}

#[test_case("/e;prod" ; "no tenant")]
#[test_case("/t;a/m;rx" ; "metric under tenant")]
#[test_case("/t;a/e;prod/rt;host" ; "type under environment")]
fn test_structural_paths_fail_validation(raw: &str) {
    let path = CanonicalPath::parse(raw).unwrap();
    assert!(path.validate().is_err());
}

#[test_case("../r;db01", "/t;acme/e;prod/r;db01" ; "sibling")]
#[test_case("r;eth0/m;rx", "/t;acme/e;prod/r;web01/r;eth0/m;rx" ; "descendant")]
#[test_case("..", "/t;acme/e;prod" ; "parent")]
fn test_relative_resolution(raw: &str, expected: &str) {
    let origin = CanonicalPath::parse("/t;acme/e;prod/r;web01").unwrap();
    let relative = RelativePath::parse(raw, &ParseContext::with_origin(origin.clone())).unwrap();
    assert_eq!(relative.resolve(&origin).unwrap().to_string(), expected);
}

#[test]
fn test_bare_id_typed_by_context() {
    let context = ParseContext::with_origin(CanonicalPath::tenant("acme"))
        .expecting(SegmentType::Environment);
    let path = CanonicalPath::parse_in("prod", &context).unwrap();
    assert_eq!(path.segment_type(), Some(SegmentType::Environment));
}
