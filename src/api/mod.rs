// Copyright (c) 2025 - Cowboy AI, Inc.
//! Inventory API
//!
//! The typed surface over a [`Backend`]: the [`Inventory`] facade runs
//! units of work in transactions and delivers their notifications, and
//! [`Repository`] exposes one entity kind under one parent.
//!
//! # Architecture
//!
//! ```text
//! Client
//!     ↓
//! Repository<B, K>        typed entities, InventoryError
//!     ↓
//! Inventory::in_transaction
//!     ├── start_transaction
//!     ├── unit of work (retried on commit failure)
//!     ├── commit
//!     └── NotificationSink::deliver_all
//!     ↓
//! Backend                 native elements, BackendError
//! ```
//!
//! # Transaction Semantics
//!
//! 1. A failing unit of work rolls the transaction back
//! 2. A `CommitFailure` restarts the whole unit of work, up to the
//!    configured number of retries, with a linear backoff
//! 3. Notifications are delivered only after a successful commit; a sink
//!    failure is logged and never undoes the commit
//!
//! # Example
//!
//! ```rust,ignore
//! use cim_inventory::adapters::MemoryBackend;
//! use cim_inventory::api::{Environments, Inventory};
//! use cim_inventory::model::EntityBlueprint;
//!
//! let inventory = Inventory::new(MemoryBackend::new());
//! inventory.tenants().create(EntityBlueprint::new("acme")).await?;
//! let environments = inventory.tenants().children::<Environments>("acme")?;
//! environments.create(EntityBlueprint::new("prod")).await?;
//! ```

pub mod kind;
pub mod repository;

pub use kind::{
    DataEntities, EntityKind, Environments, Feeds, HasChildren, HasRelationships, MetricTypes,
    Metrics, OperationTypes, ResourceTypes, Resources, Tenants,
};
pub use repository::Repository;

use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::{Backend, ConvertTarget, Direction, Transaction};
use crate::adapters::MemoryBackend;
use crate::config::{Configuration, InventoryConfig};
use crate::errors::{BackendError, BackendResult, InventoryError, InventoryResult};
use crate::model::Element;
use crate::notification::{ChannelSink, LoggingSink, Notification, NotificationSink};
use crate::path::CanonicalPath;
use crate::query::{Page, Pager, Query};
use crate::temporal::{Clock, Discriminator};

/// Entry point to an inventory stored in `B`
pub struct Inventory<B: Backend> {
    backend: Arc<B>,
    config: InventoryConfig,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl<B: Backend> Clone for Inventory<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            config: self.config.clone(),
            sink: self.sink.clone(),
            clock: self.clock.clone(),
        }
    }
}

/// "Now" for reads inside units of work
///
/// A delete in the current millisecond hides the element.
pub(crate) fn current(clock: &dyn Clock) -> Discriminator {
    Discriminator::time(clock.now()).exclude_deleted_in_millisecond()
}

impl Inventory<MemoryBackend> {
    /// Build the inventory `inventory.backend` names
    ///
    /// The backend receives the `backend.{name}` scope of `config`.
    ///
    /// # Errors
    ///
    /// - `Configuration` for unparsable values or an unknown backend
    pub fn from_configuration(config: &Configuration) -> InventoryResult<Self> {
        let settings = InventoryConfig::from_configuration(config)?;
        let scope = config.prefixed(&format!("backend.{}", settings.backend));
        let backend = match settings.backend.as_str() {
            "memory" => MemoryBackend::from_configuration(&scope)?,
            other => {
                return Err(InventoryError::Configuration(format!(
                    "unsupported backend {}",
                    other
                )))
            }
        };
        info!(backend = %settings.backend, "Inventory configured");
        Ok(Inventory::new(backend).with_config(settings))
    }
}

impl<B: Backend> Inventory<B> {
    /// Inventory with default configuration, logging notifications
    ///
    /// "Now" is read from the backend's clock.
    pub fn new(backend: B) -> Self {
        let clock = backend.clock();
        Self {
            backend: Arc::new(backend),
            config: InventoryConfig::default(),
            sink: Arc::new(LoggingSink),
            clock,
        }
    }

    pub fn with_config(mut self, config: InventoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Deliver committed notifications to `sink`
    pub fn with_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Deliver committed notifications into a channel sized by
    /// `notification_buffer`
    pub fn with_channel_sink(self) -> (Self, mpsc::Receiver<Notification>) {
        let (sink, receiver) = ChannelSink::new(self.config.notification_buffer);
        (self.with_sink(sink), receiver)
    }

    /// Read "now" from `clock`; share it with the backend for consistent
    /// timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    pub(crate) fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Discriminator for the present instant
    pub fn now(&self) -> Discriminator {
        current(self.clock.as_ref())
    }

    /// Repository of tenants
    pub fn tenants(&self) -> Repository<B, Tenants> {
        Repository::new(self.clone(), None)
    }

    /// Repository of `K` entities directly under `parent`
    pub fn under<K: EntityKind>(&self, parent: CanonicalPath) -> Repository<B, K> {
        Repository::new(self.clone(), Some(parent))
    }

    /// Run a unit of work in a transaction
    ///
    /// The unit of work may run more than once: a commit failure starts a
    /// fresh transaction and calls `work` again.
    ///
    /// # Arguments
    ///
    /// * `mutating` - Whether the unit of work writes
    /// * `work` - Receives the backend and the open transaction
    ///
    /// # Errors
    ///
    /// - Whatever `work` fails with, translated to the API error kinds
    /// - `CommitFailure` once the retries are used up
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let path = CanonicalPath::tenant("acme");
    /// let exists = inventory
    ///     .in_transaction(false, |backend, tx| {
    ///         let path = path.clone();
    ///         Box::pin(async move {
    ///             Ok(backend.find(tx, &Discriminator::now(), &path).await.is_ok())
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn in_transaction<T, F>(&self, mutating: bool, work: F) -> InventoryResult<T>
    where
        T: Send,
        F: for<'t> Fn(&'t B, &'t mut Transaction) -> BoxFuture<'t, BackendResult<T>> + Send + Sync,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let mut tx = self.backend.start_transaction(mutating).await?;
            let outcome = work(self.backend.as_ref(), &mut tx).await;

            let value = match outcome {
                Ok(value) => value,
                Err(err) => {
                    debug!(transaction = %tx.id(), error = %err, "Unit of work failed, rolling back");
                    if let Err(rollback) = self.backend.rollback(tx).await {
                        warn!(error = %rollback, "Rollback failed");
                    }
                    return Err(err.into());
                }
            };

            match self.backend.commit(tx).await {
                Ok(notifications) => {
                    self.deliver(&notifications).await;
                    return Ok(value);
                }
                Err(BackendError::CommitFailure(reason))
                    if attempt <= self.config.transaction_retries =>
                {
                    warn!(attempt, reason = %reason, "Commit failed, retrying");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn deliver(&self, notifications: &[Notification]) {
        if notifications.is_empty() {
            return;
        }
        match self.sink.deliver_all(notifications).await {
            Ok(()) => info!(count = notifications.len(), "Notifications delivered"),
            Err(err) => warn!(error = %err, "Notification delivery failed"),
        }
    }

    /// Element at `path`, of any kind
    pub async fn find(&self, path: &CanonicalPath) -> InventoryResult<Element> {
        let path = path.clone();
        let clock = self.clock();
        self.in_transaction(false, move |backend, tx| {
            let path = path.clone();
            let now = current(clock.as_ref());
            Box::pin(async move {
                let native = backend.find(tx, &now, &path).await?;
                to_element(backend, tx, &native).await
            })
        })
        .await
    }

    /// Evaluate a query over the whole inventory
    ///
    /// Backend-internal elements are never returned.
    pub async fn query(&self, query: &Query, pager: &Pager) -> InventoryResult<Page<Element>> {
        let query = query.clone();
        let pager = pager.clone();
        let clock = self.clock();
        self.in_transaction(false, move |backend, tx| {
            let (query, pager) = (query.clone(), pager.clone());
            let now = current(clock.as_ref());
            Box::pin(async move {
                backend
                    .query_with(tx, &now, &query, &pager, Some, |_: &Element| true)
                    .await
            })
        })
        .await
    }

    /// Everything reachable from `start` over the named relationships,
    /// `start` first
    pub async fn reachable(
        &self,
        start: &CanonicalPath,
        direction: Direction,
        relationship_names: &[&str],
    ) -> InventoryResult<Vec<Element>> {
        let start = start.clone();
        let names: Vec<String> = relationship_names.iter().map(|n| n.to_string()).collect();
        let clock = self.clock();
        self.in_transaction(false, move |backend, tx| {
            let (start, names) = (start.clone(), names.clone());
            let now = current(clock.as_ref());
            Box::pin(async move {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                let native = backend.find(tx, &now, &start).await?;
                let closure: Vec<B::Element> = backend
                    .get_transitive_closure_over(tx, &now, &native, direction, &names)
                    .await?
                    .collect();
                let mut elements = Vec::with_capacity(closure.len());
                for element in &closure {
                    elements.push(to_element(backend, tx, element).await?);
                }
                Ok(elements)
            })
        })
        .await
    }
}

/// Reflect a native element into the model by its own type
pub(crate) async fn to_element<B: Backend>(
    backend: &B,
    tx: &Transaction,
    native: &B::Element,
) -> BackendResult<Element> {
    let target = match backend.extract_type(native) {
        Some(segment_type) => ConvertTarget::Entity(segment_type),
        None => ConvertTarget::StructuredData,
    };
    backend.convert(tx, native, target).await
}
