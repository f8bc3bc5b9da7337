// Copyright (c) 2025 - Cowboy AI, Inc.
//! Transitive Closure
//!
//! Lazily enumerates everything reachable from a start key through a
//! neighbor function, breadth first, each key exactly once.
//!
//! ```text
//! 1 → 2 → 3 → 5          closure(1) = [1, 2, 3, 4, 5, 6, 7]
//!     └─→ 4 → 6 → 7
//!
//! 1 → 2 → 3 ─┐           closure(1) = [1, 2, 3]
//! ↑──────────┘
//! ```
//!
//! The visited set is consulted before a key is enqueued, so cycles
//! terminate. Keys unreachable from the start are never touched, including
//! cycles among them.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Breadth-first closure iterator
///
/// # Type Parameters
///
/// - `K`: key type (element handle, id, ...)
/// - `F`: neighbor expansion, called once per emitted key
pub struct TransitiveClosure<K, F> {
    visited: HashSet<K>,
    frontier: VecDeque<K>,
    neighbors: F,
}

impl<K, F, I> TransitiveClosure<K, F>
where
    K: Eq + Hash + Clone,
    F: FnMut(&K) -> I,
    I: IntoIterator<Item = K>,
{
    /// Start a closure computation at `start`
    ///
    /// # Arguments
    ///
    /// * `start` - First key emitted
    /// * `neighbors` - Keys adjacent to a given key; may repeat keys or
    ///   form cycles
    pub fn new(start: K, neighbors: F) -> Self {
        let mut visited = HashSet::new();
        visited.insert(start.clone());
        let mut frontier = VecDeque::new();
        frontier.push_back(start);
        Self {
            visited,
            frontier,
            neighbors,
        }
    }
}

impl<K, F, I> Iterator for TransitiveClosure<K, F>
where
    K: Eq + Hash + Clone,
    F: FnMut(&K) -> I,
    I: IntoIterator<Item = K>,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let current = self.frontier.pop_front()?;
        for neighbor in (self.neighbors)(&current) {
            if self.visited.insert(neighbor.clone()) {
                self.frontier.push_back(neighbor);
            }
        }
        Some(current)
    }
}

/// Convenience constructor
pub fn transitive_closure<K, F, I>(start: K, neighbors: F) -> TransitiveClosure<K, F>
where
    K: Eq + Hash + Clone,
    F: FnMut(&K) -> I,
    I: IntoIterator<Item = K>,
{
    TransitiveClosure::new(start, neighbors)
}
