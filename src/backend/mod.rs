// Copyright (c) 2025 - Cowboy AI, Inc.
//! Backend Abstraction
//!
//! The contract every storage engine implements. Engines work with their own
//! native element representation ([`Backend::Element`]) and reflect it back
//! into the typed model on demand.
//!
//! # Architecture
//!
//! ```text
//! Inventory / Repository<K>         typed model, InventoryError
//!          │
//!          ▼
//!   Backend (this trait)            native elements, BackendError
//!          │
//!          ▼
//!   graph store / SQL / columnar / in-memory
//! ```
//!
//! # Contract
//!
//! 1. **Typed not-found**: absent paths fail with
//!    [`BackendError::ElementNotFound`], never a generic error
//! 2. **Post-filter paging**: ordering, offset and limit apply after every
//!    filter; totals count filtered results
//! 3. **Atomic commit**: a failed commit leaves no visible effect
//! 4. **Notifications after commit**: `commit` returns what the pre-commit
//!    record queued, only on success
//! 5. **Temporal reads**: every read is evaluated as of a [`Discriminator`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::BackendResult;
use crate::model::{Blueprint, Element, Properties, StructuredData, Update};
use crate::notification::Notification;
use crate::path::{CanonicalPath, SegmentType};
use crate::query::{Page, Pager, Query};
use crate::temporal::{Clock, Discriminator, EntityHistory, SystemClock};

pub mod transaction;

pub use transaction::{
    action, Attachments, BasicPreCommit, PreCommit, PreCommitAction, Transaction,
    TransactionState,
};

/// Direction of relationships relative to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// Representation requested from [`Backend::convert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvertTarget {
    /// The typed element; must match the element's segment type
    Entity(SegmentType),
    /// Full structured data of a data entity or structured data node
    StructuredData,
    /// Top node of the structured data only
    ShallowStructuredData,
}

/// Storage engine contract
#[async_trait]
pub trait Backend: Send + Sync {
    /// Native element handle
    type Element: Clone + Send + Sync + 'static;

    /// Clock the backend stamps changes with
    ///
    /// Callers reading "now" should use the same clock so their reads line
    /// up with the backend's writes.
    fn clock(&self) -> Arc<dyn Clock> {
        Arc::new(SystemClock)
    }

    /// Begin a unit of work
    ///
    /// Read-only transactions reject writes.
    async fn start_transaction(&self, mutating: bool) -> BackendResult<Transaction>;

    /// Resolve a canonical path
    ///
    /// # Errors
    ///
    /// - `ElementNotFound` if nothing lives at `path` at the discriminator's
    ///   instant
    async fn find(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        path: &CanonicalPath,
    ) -> BackendResult<Self::Element>;

    /// Evaluate a query over the whole graph
    async fn query(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        query: &Query,
        pager: &Pager,
    ) -> BackendResult<Page<Self::Element>>;

    /// Evaluate a query starting from one element
    async fn traverse(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        start: &Self::Element,
        query: &Query,
        pager: &Pager,
    ) -> BackendResult<Page<Self::Element>>;

    /// Evaluate a query, convert results to the typed model and filter them
    ///
    /// Elements the conversion rejects are dropped. Paging is applied after
    /// the filter, so the page's total size is the post-filter count.
    ///
    /// # Arguments
    ///
    /// * `conversion` - Typed element to `T`, `None` to drop
    /// * `filter` - Keeps the converted values it returns `true` for
    async fn query_with<T, C, P>(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        query: &Query,
        pager: &Pager,
        conversion: C,
        filter: P,
    ) -> BackendResult<Page<T>>
    where
        T: Send + 'static,
        C: Fn(Element) -> Option<T> + Send + Sync,
        P: Fn(&T) -> bool + Send + Sync,
    {
        let ordered = Pager {
            page_index: 0,
            page_size: None,
            order: pager.order.clone(),
        };
        let page = self.query(tx, discriminator, query, &ordered).await?;

        let mut kept = Vec::new();
        for native in page {
            let Some(segment_type) = self.extract_type(&native) else {
                continue;
            };
            let element = self
                .convert(tx, &native, ConvertTarget::Entity(segment_type))
                .await?;
            if let Some(value) = conversion(element) {
                if filter(&value) {
                    kept.push(value);
                }
            }
        }

        let total = kept.len();
        Ok(Page::new(pager.apply(kept), pager.clone(), total))
    }

    /// First result of a query, if any
    async fn query_single(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        query: &Query,
    ) -> BackendResult<Option<Self::Element>> {
        let mut page = self
            .query(tx, discriminator, query, &Pager::single())
            .await?;
        Ok(page.next())
    }

    /// Everything reachable from `start` over the named relationships
    ///
    /// Breadth first, `start` first, each element once. With no names any
    /// relationship is followed.
    async fn get_transitive_closure_over(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        start: &Self::Element,
        direction: Direction,
        relationship_names: &[&str],
    ) -> BackendResult<Box<dyn Iterator<Item = Self::Element> + Send>>;

    /// Whether `entity` has a relationship of that name in that direction
    async fn has_relationship(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        entity: &Self::Element,
        direction: Direction,
        relationship_name: &str,
    ) -> BackendResult<bool>;

    /// Whether a relationship of that name goes from `source` to `target`
    async fn has_relationship_between(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        source: &Self::Element,
        target: &Self::Element,
        relationship_name: &str,
    ) -> BackendResult<bool>;

    /// Relationships of `entity`; any name when `names` is empty
    async fn get_relationships(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        entity: &Self::Element,
        direction: Direction,
        names: &[&str],
    ) -> BackendResult<Vec<Self::Element>>;

    /// The relationship of that name from `source` to `target`
    ///
    /// # Errors
    ///
    /// - `ElementNotFound` if there is none
    /// - `InvalidArgument` if an endpoint is not an entity or the name is
    ///   empty
    async fn get_relationship(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        source: &Self::Element,
        target: &Self::Element,
        relationship_name: &str,
    ) -> BackendResult<Self::Element>;

    /// Changes of an element within `(from, to]`
    async fn history(
        &self,
        tx: &Transaction,
        element: &Self::Element,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> BackendResult<EntityHistory<Element>>;

    fn extract_id(&self, element: &Self::Element) -> String;

    /// Segment type; `None` for structured data nodes
    fn extract_type(&self, element: &Self::Element) -> Option<SegmentType>;

    fn extract_canonical_path(&self, element: &Self::Element) -> CanonicalPath;

    fn extract_identity_hash(&self, element: &Self::Element) -> Option<String>;

    /// Reflect a native element into the typed model
    async fn convert(
        &self,
        tx: &Transaction,
        element: &Self::Element,
        target: ConvertTarget,
    ) -> BackendResult<Element>;

    /// Elements that are storage detail and never surface through the API
    fn is_backend_internal(&self, element: &Self::Element) -> bool;

    /// Create a relationship
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if an endpoint is a relationship or the name is
    ///   empty
    async fn relate(
        &self,
        tx: &mut Transaction,
        source: &Self::Element,
        target: &Self::Element,
        name: &str,
        properties: Properties,
    ) -> BackendResult<Self::Element>;

    /// Create an entity at `path`
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if an entity lives at `path`
    /// - `ElementNotFound` if the parent does not exist
    /// - `InvalidArgument` if `path` violates the containment schema or does
    ///   not match the blueprint
    async fn persist(
        &self,
        tx: &mut Transaction,
        path: &CanonicalPath,
        blueprint: &Blueprint,
    ) -> BackendResult<Self::Element>;

    /// Store a structured data tree on its own
    async fn persist_structured_data(
        &self,
        tx: &mut Transaction,
        data: &StructuredData,
    ) -> BackendResult<Self::Element>;

    async fn update(
        &self,
        tx: &mut Transaction,
        element: &Self::Element,
        update: &Update,
    ) -> BackendResult<Self::Element>;

    async fn update_identity_hash(
        &self,
        tx: &mut Transaction,
        element: &Self::Element,
        hash: String,
    ) -> BackendResult<()>;

    /// Delete one element and its incident relationships
    async fn delete(&self, tx: &mut Transaction, element: &Self::Element) -> BackendResult<()>;

    async fn delete_structured_data(
        &self,
        tx: &mut Transaction,
        element: &Self::Element,
    ) -> BackendResult<()>;

    /// Run pre-commit actions and make the transaction's writes visible
    ///
    /// Returns the notifications to deliver, in queued order.
    ///
    /// # Errors
    ///
    /// - `CommitFailure` if the writes could not be applied; nothing is
    ///   visible and nothing is returned to notify
    async fn commit(&self, tx: Transaction) -> BackendResult<Vec<Notification>>;

    /// Discard the transaction's writes
    async fn rollback(&self, tx: Transaction) -> BackendResult<()>;
}
