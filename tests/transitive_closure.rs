// Copyright (c) 2025 - Cowboy AI, Inc.
//! Transitive Closure Tests
//!
//! Breadth-first order, single emission per key and termination on cycles,
//! first over plain integer graphs and then through a backend.

mod fixtures;

use cim_inventory::backend::Direction;
use cim_inventory::closure::transitive_closure;
use cim_inventory::model::{relationships, Properties};
use fixtures::{host, TestInventory};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

fn graph(edges: &[(u32, u32)]) -> HashMap<u32, Vec<u32>> {
    let mut adjacency: HashMap<u32, Vec<u32>> = HashMap::new();
    for (from, to) in edges {
        adjacency.entry(*from).or_default().push(*to);
    }
    adjacency
}

#[test]
fn test_tree_is_enumerated_breadth_first() {
    // 1 → 2 → 3 → 5
    //     └─→ 4 → 6 → 7
    let adjacency = graph(&[(1, 2), (2, 3), (2, 4), (3, 5), (4, 6), (6, 7)]);
    let order: Vec<u32> =
        transitive_closure(1, |n| adjacency.get(n).cloned().unwrap_or_default()).collect();
    assert_eq!(order, vec![1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn test_cycle_terminates() {
    let adjacency = graph(&[(1, 2), (2, 3), (3, 1)]);
    let order: Vec<u32> =
        transitive_closure(1, |n| adjacency.get(n).cloned().unwrap_or_default()).collect();
    assert_eq!(order, vec![1, 2, 3]);
}

#[test]
fn test_unreachable_cycle_is_not_touched() {
    let adjacency = graph(&[(1, 2), (8, 9), (9, 8)]);
    let mut expanded = Vec::new();
    let order: Vec<u32> = transitive_closure(1, |n| {
        expanded.push(*n);
        adjacency.get(n).cloned().unwrap_or_default()
    })
    .collect();
    assert_eq!(order, vec![1, 2]);
    assert_eq!(expanded, vec![1, 2]);
}

#[test]
fn test_closure_is_lazy() {
    let mut expansions = 0;
    let first: Vec<u32> = transitive_closure(0u32, |n| {
        expansions += 1;
        vec![n + 1, n + 2]
    })
    .take(3)
    .collect();
    assert_eq!(first, vec![0, 1, 2]);
    assert!(expansions <= 3);
}

#[tokio::test]
async fn test_reachable_over_custom_relationships_with_cycle() {
    let fixture = TestInventory::seeded().await;
    let resources = fixture.resources();
    for id in ["a", "b", "c", "d"] {
        resources.create(host(id)).await.unwrap();
    }
    fixture.tick();

    let path = |id: &str| resources.path_of(id).unwrap();
    resources
        .relate_to("a", &path("b"), "feeds", Properties::new())
        .await
        .unwrap();
    resources
        .relate_to("b", &path("c"), "feeds", Properties::new())
        .await
        .unwrap();
    resources
        .relate_to("c", &path("a"), "feeds", Properties::new())
        .await
        .unwrap();
    resources
        .relate_to("a", &path("d"), "monitors", Properties::new())
        .await
        .unwrap();
    fixture.tick();

    let reached: Vec<String> = fixture
        .inventory
        .reachable(&path("a"), Direction::Outgoing, &["feeds"])
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.path().to_string())
        .collect();
    assert_eq!(
        reached,
        vec![
            "/t;acme/e;prod/r;a",
            "/t;acme/e;prod/r;b",
            "/t;acme/e;prod/r;c",
        ]
    );

    let upward: Vec<String> = fixture
        .inventory
        .reachable(&path("c"), Direction::Incoming, &[relationships::CONTAINS])
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.path().to_string())
        .collect();
    assert_eq!(upward, vec!["/t;acme/e;prod/r;c", "/t;acme/e;prod", "/t;acme"]);
}
