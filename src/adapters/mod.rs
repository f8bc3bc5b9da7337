// Copyright (c) 2025 - Cowboy AI, Inc.

//! Backend implementations
//!
//! This module contains concrete implementations of the [`Backend`] trait.
//! Only the in-memory reference engine ships with the crate; graph, SQL and
//! columnar engines implement the same contract out of tree.
//!
//! [`Backend`]: crate::backend::Backend

pub mod memory;

pub use memory::{ElementKey, MemoryBackend, MemoryElement};
