// Copyright (c) 2025 - Cowboy AI, Inc.
//! Change actions

use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to an element
///
/// The declaration order is the tie-break order of same-instant changes in
/// an entity history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Created,
    Updated,
    IdentityHashChanged,
    Deleted,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Created => "created",
            Action::Updated => "updated",
            Action::IdentityHashChanged => "identity_hash_changed",
            Action::Deleted => "deleted",
        }
    }

    /// Whether the element exists after this action
    pub fn leaves_element_existing(&self) -> bool {
        !matches!(self, Action::Deleted)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
