// Copyright (c) 2025 - Cowboy AI, Inc.
//! Query evaluation over a graph snapshot
//!
//! The cursor is an ordered, duplicate-free list of element paths. Each
//! fragment either moves it or narrows it:
//!
//! ```text
//! fragment              path fragment            filter fragment
//! ────────              ─────────────            ───────────────
//! Related               other ends               has such a relationship
//! SwitchElementType     entity <-> relationship  (same, always moves)
//! Recurse               transitive closure       (same, always moves)
//! anything else         narrow                   narrow
//! Noop                  split the rest into alternative groups
//! ```
//!
//! Alternative groups run from the same cursor and extend to the end of
//! the query; their results are merged in group order.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use super::state::{other_ends, GraphState};
use crate::backend::Direction;
use crate::closure::TransitiveClosure;
use crate::model::{Element, Properties, PropertyValue, Relationship};
use crate::path::CanonicalPath;
use crate::query::{
    EdgeEnd, EntityRole, Filter, Order, Query, QueryFragment, Related, SortDirection,
    SwitchElementType,
};
use crate::temporal::Discriminator;

pub(crate) struct Evaluator<'s> {
    state: &'s GraphState,
    discriminator: Discriminator,
}

impl<'s> Evaluator<'s> {
    pub fn new(state: &'s GraphState, discriminator: Discriminator) -> Self {
        Self {
            state,
            discriminator,
        }
    }

    /// Evaluate over every element existing at the discriminator
    pub fn query(&self, query: &Query) -> Vec<CanonicalPath> {
        self.run(self.state.existing(&self.discriminator), query.fragments())
    }

    /// Evaluate starting from one element
    pub fn traverse(&self, start: &CanonicalPath, query: &Query) -> Vec<CanonicalPath> {
        if self.element(start).is_none() {
            return Vec::new();
        }
        self.run(vec![start.clone()], query.fragments())
    }

    /// Sort by the given keys, canonical path breaking ties
    pub fn sort(&self, mut paths: Vec<CanonicalPath>, order: &[Order]) -> Vec<CanonicalPath> {
        paths.sort_by(|a, b| self.compare(a, b, order));
        paths
    }

    fn element(&self, path: &CanonicalPath) -> Option<&'s Element> {
        self.state.at(path, &self.discriminator)
    }

    fn run(&self, mut cursor: Vec<CanonicalPath>, fragments: &[QueryFragment]) -> Vec<CanonicalPath> {
        for (index, fragment) in fragments.iter().enumerate() {
            if matches!(fragment.filter(), Filter::Noop) {
                let groups = fragments[index + 1..].split(|f| matches!(f.filter(), Filter::Noop));
                let mut seen = HashSet::new();
                let mut merged = Vec::new();
                for group in groups {
                    for path in self.run(cursor.clone(), group) {
                        if seen.insert(path.clone()) {
                            merged.push(path);
                        }
                    }
                }
                return merged;
            }
            if cursor.is_empty() {
                break;
            }
            cursor = self.step(cursor, fragment);
        }
        cursor
    }

    fn step(&self, cursor: Vec<CanonicalPath>, fragment: &QueryFragment) -> Vec<CanonicalPath> {
        match fragment.filter() {
            Filter::Related(related) if fragment.is_path() => {
                dedup(cursor.iter().flat_map(|path| self.across(path, related)))
            }
            Filter::SwitchElementType(switch) => {
                dedup(cursor.iter().flat_map(|path| self.switch(path, *switch)))
            }
            Filter::Recurse(chain) => {
                let chain: Vec<QueryFragment> =
                    chain.iter().cloned().map(QueryFragment::Path).collect();
                dedup(cursor.iter().flat_map(|path| {
                    TransitiveClosure::new(path.clone(), |key: &CanonicalPath| {
                        self.run(vec![key.clone()], &chain)
                    })
                    .collect::<Vec<_>>()
                }))
            }
            filter => cursor
                .into_iter()
                .filter(|path| self.matches(path, filter))
                .collect(),
        }
    }

    /// Other ends of the matching relationships
    fn across(&self, path: &CanonicalPath, related: &Related) -> Vec<CanonicalPath> {
        let direction = match related.entity_role {
            EntityRole::Source => Direction::Outgoing,
            EntityRole::Target => Direction::Incoming,
            EntityRole::Any => Direction::Both,
        };
        self.state
            .relationships(path, direction, &self.discriminator)
            .into_iter()
            .filter(|(_, rel)| relationship_matches(rel, related))
            .flat_map(|(_, rel)| other_ends(rel, path, direction))
            .filter(|other| related.entity.as_ref().map_or(true, |e| e == other))
            .filter(|other| self.element(other).is_some())
            .collect()
    }

    fn switch(&self, path: &CanonicalPath, switch: SwitchElementType) -> Vec<CanonicalPath> {
        let direction = match switch {
            SwitchElementType::OutgoingRelationships => Direction::Outgoing,
            SwitchElementType::IncomingRelationships => Direction::Incoming,
            SwitchElementType::BothRelationships => Direction::Both,
            SwitchElementType::SourceEntities | SwitchElementType::TargetEntities => {
                let Some(Element::Relationship(rel)) = self.element(path) else {
                    return Vec::new();
                };
                let end = if switch == SwitchElementType::SourceEntities {
                    &rel.source
                } else {
                    &rel.target
                };
                return self
                    .element(end)
                    .map(|_| vec![end.clone()])
                    .unwrap_or_default();
            }
        };
        self.state
            .relationships(path, direction, &self.discriminator)
            .into_iter()
            .map(|(rel_path, _)| rel_path.clone())
            .collect()
    }

    fn matches(&self, path: &CanonicalPath, filter: &Filter) -> bool {
        let Some(element) = self.element(path) else {
            return false;
        };
        match filter {
            Filter::Related(related) => !self.across(path, related).is_empty(),
            Filter::Ids(ids) => element.id().map_or(false, |id| ids.contains(id)),
            Filter::Types(types) => element
                .segment_type()
                .map_or(false, |t| types.contains(&t)),
            Filter::Names(names) => element.name().map_or(false, |n| names.contains(n)),
            Filter::PropertyValues { name, values } => {
                property_matches(element.properties(), name, values)
            }
            Filter::CanonicalPaths(paths) => paths.contains(path),
            Filter::RelativePaths { origin, paths } => paths
                .iter()
                .filter_map(|relative| relative.resolve(origin).ok())
                .any(|resolved| &resolved == path),
            Filter::RelationshipNames(names) => {
                as_relationship(element).map_or(false, |rel| names.contains(&rel.name))
            }
            Filter::RelationshipIds(ids) => {
                as_relationship(element).map_or(false, |rel| ids.contains(&rel.id))
            }
            Filter::RelationshipProperty { name, values } => as_relationship(element)
                .map_or(false, |rel| property_matches(Some(&rel.properties), name, values)),
            Filter::SourceOrTargetType { end, types } => {
                as_relationship(element).map_or(false, |rel| {
                    let endpoint = match end {
                        EdgeEnd::Source => &rel.source,
                        EdgeEnd::Target => &rel.target,
                    };
                    endpoint
                        .segment_type()
                        .map_or(false, |t| types.contains(&t))
                })
            }
            Filter::SwitchElementType(_) | Filter::Recurse(_) | Filter::Noop => true,
        }
    }

    fn compare(&self, a: &CanonicalPath, b: &CanonicalPath, order: &[Order]) -> Ordering {
        let (ea, eb) = (self.element(a), self.element(b));
        for key in order {
            let ordering = match key.field.as_str() {
                Order::ID => ea.and_then(Element::id).cmp(&eb.and_then(Element::id)),
                Order::NAME => ea.and_then(Element::name).cmp(&eb.and_then(Element::name)),
                Order::PATH => a.cmp(b),
                property => property_of(ea, property).cmp(&property_of(eb, property)),
            };
            let ordering = match key.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.cmp(b)
    }
}

fn relationship_matches(rel: &Relationship, related: &Related) -> bool {
    related
        .relationship_name
        .as_ref()
        .map_or(true, |name| *name == rel.name)
        && related
            .relationship_id
            .as_ref()
            .map_or(true, |id| *id == rel.id)
}

fn as_relationship(element: &Element) -> Option<&Relationship> {
    match element {
        Element::Relationship(rel) => Some(rel),
        _ => None,
    }
}

fn property_matches(
    properties: Option<&Properties>,
    name: &str,
    values: &BTreeSet<PropertyValue>,
) -> bool {
    match properties.and_then(|p| p.get(name)) {
        Some(value) => values.is_empty() || values.contains(value),
        None => false,
    }
}

fn property_of<'e>(element: Option<&'e Element>, name: &str) -> Option<&'e PropertyValue> {
    element?.properties()?.get(name)
}

fn dedup(paths: impl IntoIterator<Item = CanonicalPath>) -> Vec<CanonicalPath> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::state::AutoEdges;
    use crate::model::{Blueprint, EntityBlueprint, ResourceBlueprint};
    use crate::path::SegmentType;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn p(raw: &str) -> CanonicalPath {
        CanonicalPath::parse(raw).unwrap()
    }

    fn graph() -> GraphState {
        let mut state = GraphState::default();
        let mut persist = |path: &str, blueprint: Blueprint| {
            state
                .persist(&p(path), &blueprint, &AutoEdges::generate(), Uuid::now_v7(), t0())
                .unwrap();
        };
        persist("/t;acme", Blueprint::Tenant(EntityBlueprint::new("acme")));
        persist("/t;acme/e;prod", Blueprint::Environment(EntityBlueprint::new("prod")));
        persist("/t;acme/rt;host", Blueprint::ResourceType(EntityBlueprint::new("host")));
        for id in ["web01", "web02"] {
            persist(
                &format!("/t;acme/e;prod/r;{}", id),
                Blueprint::Resource(ResourceBlueprint {
                    entity: EntityBlueprint::new(id).with_property("zone", "eu"),
                    resource_type: p("/t;acme/rt;host"),
                }),
            );
        }
        persist(
            "/t;acme/e;prod/r;web01/r;nic0",
            Blueprint::Resource(ResourceBlueprint {
                entity: EntityBlueprint::new("nic0"),
                resource_type: p("/t;acme/rt;host"),
            }),
        );
        state
    }

    fn eval(state: &GraphState) -> Evaluator<'_> {
        Evaluator::new(state, Discriminator::time(t0()))
    }

    #[test]
    fn test_path_fragment_descends() {
        let state = graph();
        let query = Query::path()
            .with([Filter::id("prod")])
            .with([Filter::from(Related::contains())])
            .build();
        let found = eval(&state).query(&query);
        assert_eq!(found, vec![p("/t;acme/e;prod/r;web01"), p("/t;acme/e;prod/r;web02")]);
    }

    #[test]
    fn test_filter_fragment_narrows() {
        let state = graph();
        let query = Query::filter()
            .with([Filter::of_type(SegmentType::Resource), Filter::from(Related::contains())])
            .build();
        assert_eq!(eval(&state).query(&query), vec![p("/t;acme/e;prod/r;web01")]);
    }

    #[test]
    fn test_recurse_includes_start_and_descendants() {
        let state = graph();
        let query = Query::path()
            .with([Filter::descendants([])])
            .filter()
            .with([Filter::of_type(SegmentType::Resource)])
            .build();
        let found = eval(&state).traverse(&p("/t;acme/e;prod"), &query);
        assert_eq!(found.len(), 3);
        assert!(found.contains(&p("/t;acme/e;prod/r;web01/r;nic0")));
    }

    #[test]
    fn test_alternatives_merge_groups() {
        let state = graph();
        let query = Query::filter()
            .alternatives(&[
                vec![Filter::id("web02")],
                vec![Filter::of_type(SegmentType::ResourceType)],
            ])
            .build();
        assert_eq!(
            eval(&state).query(&query),
            vec![p("/t;acme/e;prod/r;web02"), p("/t;acme/rt;host")]
        );
    }

    #[test]
    fn test_switch_to_relationships_and_back() {
        let state = graph();
        let query = Query::path()
            .with([Filter::from(SwitchElementType::OutgoingRelationships)])
            .filter()
            .with([Filter::relationship_name("defines")])
            .path()
            .with([Filter::from(SwitchElementType::TargetEntities)])
            .build();
        let found = eval(&state).traverse(&p("/t;acme/rt;host"), &query);
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_sort_by_property_then_path() {
        let state = graph();
        let query = Query::filter().with([Filter::has_property("zone")]).build();
        let evaluator = eval(&state);
        let sorted = evaluator.sort(evaluator.query(&query), &[Order::desc(Order::ID)]);
        assert_eq!(sorted, vec![p("/t;acme/e;prod/r;web02"), p("/t;acme/e;prod/r;web01")]);
    }
}
