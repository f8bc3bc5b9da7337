// Copyright (c) 2025 - Cowboy AI, Inc.
//! EntityHistory - State Changes Over Time
//!
//! An `EntityHistory<E>` is an initial snapshot followed by a time-ordered
//! list of state changes. Any past state of the element can be recovered
//! from it.
//!
//! # Ordering
//!
//! Changes are kept sorted by:
//!
//! 1. occurrence instant
//! 2. action (`Created < Updated < IdentityHashChanged < Deleted`)
//! 3. canonical path string
//!
//! # Mathematical Model
//!
//! ```text
//! EntityHistory<E> ≅ (Option<E>, [(Instant, Action, E)])
//!
//! state_at(t) = entity of the last change at or before t
//!             | initial, if no change precedes t
//! ```
//!
//! # Same-Millisecond Ties
//!
//! When the changes falling in the discriminator's own millisecond include
//! a delete, the discriminator decides:
//!
//! - `prefer_existence = true`: the last non-delete change in that
//!   millisecond wins, so an element created and deleted within it is
//!   visible
//! - `prefer_existence = false`: the delete wins and the element is
//!   excluded
//!
//! # Examples
//!
//! ```rust,ignore
//! let mut history = EntityHistory::new(None);
//! history.push(EntityStateChange::new(Action::Created, resource.clone(), path.clone(), t0));
//! history.push(EntityStateChange::new(Action::Deleted, resource, path, t0));
//!
//! assert!(history.state_at(&Discriminator::time(t0)).is_some());
//! assert!(history
//!     .state_at(&Discriminator::time(t0).exclude_deleted_in_millisecond())
//!     .is_none());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::Discriminator;
use crate::model::Action;
use crate::path::CanonicalPath;

/// One change of an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStateChange<E> {
    pub action: Action,
    /// State of the element after the change (before it, for deletes)
    pub entity: E,
    pub path: CanonicalPath,
    pub occurred_at: DateTime<Utc>,
}

impl<E> EntityStateChange<E> {
    pub fn new(action: Action, entity: E, path: CanonicalPath, occurred_at: DateTime<Utc>) -> Self {
        Self {
            action,
            entity,
            path,
            occurred_at,
        }
    }

    fn millis(&self) -> i64 {
        self.occurred_at.timestamp_millis()
    }

    /// Compare by (instant, action, path string)
    pub fn order(&self, other: &Self) -> Ordering {
        self.occurred_at
            .cmp(&other.occurred_at)
            .then(self.action.cmp(&other.action))
            .then_with(|| self.path.to_string().cmp(&other.path.to_string()))
    }
}

/// Initial snapshot plus ordered changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityHistory<E> {
    initial: Option<E>,
    changes: Vec<EntityStateChange<E>>,
}

impl<E> Default for EntityHistory<E> {
    fn default() -> Self {
        Self {
            initial: None,
            changes: Vec::new(),
        }
    }
}

impl<E: Clone> EntityHistory<E> {
    /// Create a history with the given initial snapshot
    ///
    /// `None` means the element did not exist before the first change.
    pub fn new(initial: Option<E>) -> Self {
        Self {
            initial,
            changes: Vec::new(),
        }
    }

    /// Build from unordered changes
    pub fn from_changes(initial: Option<E>, mut changes: Vec<EntityStateChange<E>>) -> Self {
        changes.sort_by(|a, b| a.order(b));
        Self { initial, changes }
    }

    /// Insert a change at its ordered position
    ///
    /// Changes equal under the ordering keep insertion order.
    pub fn push(&mut self, change: EntityStateChange<E>) {
        let at = self
            .changes
            .partition_point(|existing| existing.order(&change) != Ordering::Greater);
        self.changes.insert(at, change);
    }

    pub fn initial(&self) -> Option<&E> {
        self.initial.as_ref()
    }

    pub fn changes(&self) -> &[EntityStateChange<E>] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// State after the most recent change
    pub fn latest(&self) -> Option<&E> {
        match self.changes.last() {
            Some(change) if change.action == Action::Deleted => None,
            Some(change) => Some(&change.entity),
            None => self.initial.as_ref(),
        }
    }

    /// Reconstruct the element's state as of the discriminator
    ///
    /// Returns `None` when the element did not exist at that instant.
    ///
    /// # Arguments
    ///
    /// * `discriminator` - Instant and same-millisecond tie-break rule
    pub fn state_at(&self, discriminator: &Discriminator) -> Option<&E> {
        let at = discriminator.millis();
        let before_end = self.changes.partition_point(|c| c.millis() < at);
        let group_end = self.changes.partition_point(|c| c.millis() <= at);
        let same_millisecond = &self.changes[before_end..group_end];

        if same_millisecond.is_empty() {
            return match self.changes[..before_end].last() {
                Some(change) if change.action == Action::Deleted => None,
                Some(change) => Some(&change.entity),
                None => self.initial.as_ref(),
            };
        }

        let has_delete = same_millisecond
            .iter()
            .any(|c| c.action == Action::Deleted);
        if !has_delete {
            return same_millisecond.last().map(|c| &c.entity);
        }
        if !discriminator.prefer_existence() {
            return None;
        }
        same_millisecond
            .iter()
            .rev()
            .find(|c| c.action.leaves_element_existing())
            .map(|c| &c.entity)
    }

    /// Restrict the history to `(from, to]`
    ///
    /// The returned history's initial snapshot is the state at `from`.
    pub fn window(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> EntityHistory<E> {
        let initial = self.state_at(&Discriminator::time(from)).cloned();
        let changes = self
            .changes
            .iter()
            .filter(|c| c.occurred_at > from && c.occurred_at <= to)
            .cloned()
            .collect();
        EntityHistory { initial, changes }
    }
}
