// Copyright (c) 2025 - Cowboy AI, Inc.
//! Inventory graph for the Composable Information Machine
//!
//! A backend-agnostic inventory (CMDB) of tenants, environments, feeds,
//! resources, metrics and their types, stored as a temporal graph:
//!
//! ```text
//! api          Inventory facade, typed repositories, unit-of-work retries
//! query        path/filter traversal language, paging
//! backend      storage contract, transactions, pre-commit record
//! adapters     in-memory reference engine
//! notification change notifications and sinks
//! path         canonical and relative addressing
//! model        typed elements, blueprints, updates, identity hashes
//! temporal     discriminators, per-element history, clocks
//! closure      lazy breadth-first transitive closure
//! ```

pub mod adapters;
pub mod api;
pub mod backend;
pub mod closure;
pub mod config;
pub mod errors;
pub mod model;
pub mod notification;
pub mod path;
pub mod query;
pub mod temporal;

// Re-export commonly used types
pub use adapters::MemoryBackend;
pub use api::{Inventory, Repository};
pub use backend::{Backend, Direction, Transaction};
pub use config::{Configuration, InventoryConfig};
pub use errors::{BackendError, BackendResult, InventoryError, InventoryResult};
pub use notification::{Notification, NotificationSink};
pub use path::{CanonicalPath, PathError, RelativePath, SegmentType};
pub use query::{Filter, Page, Pager, Query, Related};
pub use temporal::Discriminator;
