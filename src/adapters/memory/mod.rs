// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory reference backend
//!
//! Implements the full [`Backend`] contract over an in-process graph.
//!
//! # Architecture
//!
//! ```text
//! start_transaction ──> working copy = committed snapshot (Arc)
//!
//! reads  ─────────────> working copy (read-your-writes)
//! writes ─────────────> apply to working copy, append to op log
//!
//! commit ─────────────> replay op log onto the latest committed state,
//!                       stamped in log order from one commit instant,
//!                       swap the Arc
//! ```
//!
//! A replay failure discards the replayed copy, so nothing the transaction
//! wrote ever becomes visible. Concurrent transactions touching disjoint
//! subtrees replay cleanly on top of each other.
//!
//! # Example
//!
//! ```rust,ignore
//! let backend = MemoryBackend::new();
//! let mut tx = backend.start_transaction(true).await?;
//! let tenant = backend
//!     .persist(&mut tx, &CanonicalPath::tenant("acme"), &Blueprint::Tenant(EntityBlueprint::new("acme")))
//!     .await?;
//! backend.commit(tx).await?;
//! ```

mod eval;
mod state;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{Backend, ConvertTarget, Direction, Transaction};
use crate::closure::TransitiveClosure;
use crate::errors::{BackendError, BackendResult, NotFoundKind};
use crate::model::{Blueprint, Element, Properties, StructuredData, Update};
use crate::notification::Notification;
use crate::path::{CanonicalPath, SegmentType};
use crate::query::{Order, Page, Pager, Query};
use crate::config::{properties, Configuration};
use crate::errors::{InventoryError, InventoryResult};
use crate::temporal::{Clock, Discriminator, EntityHistory, ManualClock, SystemClock};

use eval::Evaluator;
use state::{AutoEdges, GraphState, Op};

const PENDING: &str = "memory.pending";

/// What a native element points at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKey {
    Path(CanonicalPath),
    /// Structured data node stored on its own
    Data(Uuid),
}

/// Native element handle of the memory backend
///
/// Two handles are equal when they point at the same element, whatever
/// instant they were resolved at.
#[derive(Debug, Clone)]
pub struct MemoryElement {
    key: ElementKey,
    /// Instant the handle was resolved at; `None` means the latest state
    as_of: Option<Discriminator>,
    identity_hash: Option<String>,
}

impl MemoryElement {
    fn at_path(path: CanonicalPath, as_of: Option<Discriminator>, identity_hash: Option<String>) -> Self {
        Self {
            key: ElementKey::Path(path),
            as_of,
            identity_hash,
        }
    }

    pub fn key(&self) -> &ElementKey {
        &self.key
    }

    pub fn path(&self) -> Option<&CanonicalPath> {
        match &self.key {
            ElementKey::Path(path) => Some(path),
            ElementKey::Data(_) => None,
        }
    }

    fn entity_path(&self) -> BackendResult<&CanonicalPath> {
        self.path().ok_or_else(|| {
            BackendError::InvalidArgument("structured data is not an entity".to_string())
        })
    }
}

impl PartialEq for MemoryElement {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for MemoryElement {}

impl Hash for MemoryElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Per-transaction working copy and op log
#[derive(Debug)]
struct Pending {
    working: Arc<GraphState>,
    ops: Vec<Op>,
}

/// In-process graph backend
#[derive(Debug)]
pub struct MemoryBackend {
    committed: Mutex<Arc<GraphState>>,
    clock: Arc<dyn Clock>,
    fail_next_commit: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Empty backend on the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty backend stamping changes with `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            committed: Mutex::new(Arc::new(GraphState::default())),
            clock,
            fail_next_commit: AtomicBool::new(false),
        }
    }

    /// Backend configured from its scoped property map
    ///
    /// `clock` selects the wall clock (`system`, the default) or a manual
    /// clock fixed at an RFC 3339 instant.
    pub fn from_configuration(config: &Configuration) -> InventoryResult<Self> {
        let clock: Arc<dyn Clock> = match config.get(&properties::MEMORY_CLOCK) {
            None => Arc::new(SystemClock),
            Some(raw) if raw.trim() == "system" => Arc::new(SystemClock),
            Some(raw) => {
                let start = DateTime::parse_from_rfc3339(raw.trim()).map_err(|e| {
                    InventoryError::Configuration(format!(
                        "{}={}: {}",
                        properties::MEMORY_CLOCK.name,
                        raw,
                        e
                    ))
                })?;
                Arc::new(ManualClock::new(start.with_timezone(&Utc)))
            }
        };
        debug!(clock = ?clock, "Memory backend configured");
        Ok(Self::with_clock(clock))
    }

    /// Make the next commit fail with `CommitFailure`
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of commits that changed the graph
    pub async fn version(&self) -> u64 {
        self.committed.lock().await.version
    }

    fn snapshot(tx: &Transaction) -> BackendResult<Arc<GraphState>> {
        tx.ensure_open()?;
        tx.attachments()
            .get::<Pending>(PENDING)
            .map(|pending| pending.working.clone())
            .ok_or_else(foreign_transaction)
    }

    fn write(&self, tx: &mut Transaction, op: Op) -> BackendResult<()> {
        tx.ensure_open()?;
        tx.ensure_mutating()?;
        let at = self.clock.now();
        let pending = tx
            .attachments_mut()
            .get_mut::<Pending>(PENDING)
            .ok_or_else(foreign_transaction)?;
        Arc::make_mut(&mut pending.working).apply(&op, at)?;
        pending.ops.push(op);
        Ok(())
    }

    fn handle(
        state: &GraphState,
        path: &CanonicalPath,
        as_of: Option<Discriminator>,
    ) -> MemoryElement {
        let identity_hash = state.record(path).and_then(|r| r.identity_hash.clone());
        MemoryElement::at_path(path.clone(), as_of, identity_hash)
    }

    fn page(
        state: &GraphState,
        discriminator: &Discriminator,
        paths: Vec<CanonicalPath>,
        pager: &Pager,
    ) -> Page<MemoryElement> {
        let evaluator = Evaluator::new(state, *discriminator);
        let order = if pager.order.is_empty() {
            vec![Order::unspecified()]
        } else {
            pager.order.clone()
        };
        let sorted = evaluator.sort(paths, &order);
        let total = sorted.len();
        let items = pager
            .apply(sorted)
            .iter()
            .map(|path| Self::handle(state, path, Some(*discriminator)))
            .collect();
        Page::new(items, pager.clone(), total)
    }

    fn relationship_handles(
        state: &GraphState,
        discriminator: &Discriminator,
        entity: &CanonicalPath,
        direction: Direction,
        names: &[&str],
    ) -> Vec<MemoryElement> {
        state
            .relationships(entity, direction, discriminator)
            .into_iter()
            .filter(|(_, rel)| names.is_empty() || names.contains(&rel.name.as_str()))
            .map(|(rel_path, _)| Self::handle(state, rel_path, Some(*discriminator)))
            .collect()
    }
}

fn foreign_transaction() -> BackendError {
    BackendError::InvalidArgument("transaction was not started by this backend".to_string())
}

fn require_name(name: &str) -> BackendResult<()> {
    if name.is_empty() {
        return Err(BackendError::InvalidArgument(
            "relationship name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn require_entity(element: &MemoryElement) -> BackendResult<&CanonicalPath> {
    let path = element.entity_path()?;
    if path.segment_type() == Some(SegmentType::Relationship) {
        return Err(BackendError::InvalidArgument(format!(
            "{} is a relationship, not an entity",
            path
        )));
    }
    Ok(path)
}

fn not_found(path: &CanonicalPath) -> BackendError {
    match path.relationship_id() {
        Some(id) => BackendError::relationship_not_found(id),
        None => BackendError::entity_not_found(path),
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    type Element = MemoryElement;

    fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    async fn start_transaction(&self, mutating: bool) -> BackendResult<Transaction> {
        let snapshot = self.committed.lock().await.clone();
        let mut tx = Transaction::new(mutating);
        tx.attachments_mut().insert(
            PENDING,
            Pending {
                working: snapshot,
                ops: Vec::new(),
            },
        );
        debug!(transaction = %tx.id(), mutating, "Transaction started");
        Ok(tx)
    }

    async fn find(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        path: &CanonicalPath,
    ) -> BackendResult<MemoryElement> {
        let state = Self::snapshot(tx)?;
        match state.at(path, discriminator) {
            Some(_) => Ok(Self::handle(&state, path, Some(*discriminator))),
            None => Err(not_found(path)),
        }
    }

    async fn query(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        query: &Query,
        pager: &Pager,
    ) -> BackendResult<Page<MemoryElement>> {
        let state = Self::snapshot(tx)?;
        let found = Evaluator::new(&state, *discriminator).query(query);
        Ok(Self::page(&state, discriminator, found, pager))
    }

    async fn traverse(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        start: &MemoryElement,
        query: &Query,
        pager: &Pager,
    ) -> BackendResult<Page<MemoryElement>> {
        let state = Self::snapshot(tx)?;
        let start = start.entity_path()?;
        let found = Evaluator::new(&state, *discriminator).traverse(start, query);
        Ok(Self::page(&state, discriminator, found, pager))
    }

    async fn get_transitive_closure_over(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        start: &MemoryElement,
        direction: Direction,
        relationship_names: &[&str],
    ) -> BackendResult<Box<dyn Iterator<Item = MemoryElement> + Send>> {
        let state = Self::snapshot(tx)?;
        let start = require_entity(start)?.clone();
        let names: Vec<String> = relationship_names.iter().map(|n| n.to_string()).collect();
        let discriminator = *discriminator;
        let expansion_state = state.clone();

        let closure = TransitiveClosure::new(start, move |path: &CanonicalPath| {
            expansion_state.neighbors(path, direction, &names, &discriminator)
        })
        .map(move |path| Self::handle(&state, &path, Some(discriminator)));
        Ok(Box::new(closure))
    }

    async fn has_relationship(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        entity: &MemoryElement,
        direction: Direction,
        relationship_name: &str,
    ) -> BackendResult<bool> {
        require_name(relationship_name)?;
        let state = Self::snapshot(tx)?;
        let entity = require_entity(entity)?;
        Ok(state
            .relationships(entity, direction, discriminator)
            .iter()
            .any(|(_, rel)| rel.name == relationship_name))
    }

    async fn has_relationship_between(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        source: &MemoryElement,
        target: &MemoryElement,
        relationship_name: &str,
    ) -> BackendResult<bool> {
        match self
            .get_relationship(tx, discriminator, source, target, relationship_name)
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn get_relationships(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        entity: &MemoryElement,
        direction: Direction,
        names: &[&str],
    ) -> BackendResult<Vec<MemoryElement>> {
        let state = Self::snapshot(tx)?;
        let entity = require_entity(entity)?;
        Ok(Self::relationship_handles(
            &state,
            discriminator,
            entity,
            direction,
            names,
        ))
    }

    async fn get_relationship(
        &self,
        tx: &Transaction,
        discriminator: &Discriminator,
        source: &MemoryElement,
        target: &MemoryElement,
        relationship_name: &str,
    ) -> BackendResult<MemoryElement> {
        require_name(relationship_name)?;
        let state = Self::snapshot(tx)?;
        let source = require_entity(source)?;
        let target = require_entity(target)?;
        state
            .relationships(source, Direction::Outgoing, discriminator)
            .into_iter()
            .find(|(_, rel)| rel.name == relationship_name && &rel.target == target)
            .map(|(rel_path, _)| Self::handle(&state, rel_path, Some(*discriminator)))
            .ok_or_else(|| {
                BackendError::relationship_not_found(format!(
                    "{} -[{}]-> {}",
                    source, relationship_name, target
                ))
            })
    }

    async fn history(
        &self,
        tx: &Transaction,
        element: &MemoryElement,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> BackendResult<EntityHistory<Element>> {
        let state = Self::snapshot(tx)?;
        let path = element.entity_path()?;
        state
            .record(path)
            .map(|record| record.history.window(from, to))
            .ok_or_else(|| not_found(path))
    }

    fn extract_id(&self, element: &MemoryElement) -> String {
        match &element.key {
            ElementKey::Path(path) => path.id().unwrap_or_default().to_string(),
            ElementKey::Data(key) => key.to_string(),
        }
    }

    fn extract_type(&self, element: &MemoryElement) -> Option<SegmentType> {
        element.path().and_then(CanonicalPath::segment_type)
    }

    fn extract_canonical_path(&self, element: &MemoryElement) -> CanonicalPath {
        element.path().cloned().unwrap_or_else(CanonicalPath::undefined)
    }

    fn extract_identity_hash(&self, element: &MemoryElement) -> Option<String> {
        element.identity_hash.clone()
    }

    async fn convert(
        &self,
        tx: &Transaction,
        element: &MemoryElement,
        target: ConvertTarget,
    ) -> BackendResult<Element> {
        let state = Self::snapshot(tx)?;
        let data = match &element.key {
            ElementKey::Data(key) => state.data(key).cloned().ok_or_else(|| {
                BackendError::ElementNotFound {
                    kind: NotFoundKind::Entity,
                    description: format!("structured data {}", key),
                }
            })?,
            ElementKey::Path(path) => {
                let stored = state
                    .element(path, element.as_of.as_ref())
                    .ok_or_else(|| not_found(path))?;
                match (target, stored) {
                    (ConvertTarget::Entity(expected), stored) => {
                        return if stored.segment_type() == Some(expected) {
                            Ok(stored.clone())
                        } else {
                            Err(BackendError::InvalidArgument(format!(
                                "{} is not a {}",
                                path,
                                expected.display_name()
                            )))
                        };
                    }
                    (_, Element::DataEntity(entity)) => match element.as_of {
                        Some(_) => entity.value.clone(),
                        None => state
                            .record(path)
                            .and_then(|r| r.data_key)
                            .and_then(|key| state.data(&key).cloned())
                            .unwrap_or_else(|| entity.value.clone()),
                    },
                    (_, _) => {
                        return Err(BackendError::InvalidArgument(format!(
                            "{} holds no structured data",
                            path
                        )))
                    }
                }
            }
        };

        match target {
            ConvertTarget::StructuredData => Ok(Element::StructuredData(data)),
            ConvertTarget::ShallowStructuredData => Ok(Element::ShallowStructuredData(data.shallow())),
            ConvertTarget::Entity(expected) => Err(BackendError::InvalidArgument(format!(
                "structured data is not a {}",
                expected.display_name()
            ))),
        }
    }

    fn is_backend_internal(&self, element: &MemoryElement) -> bool {
        matches!(element.key, ElementKey::Data(_))
    }

    async fn relate(
        &self,
        tx: &mut Transaction,
        source: &MemoryElement,
        target: &MemoryElement,
        name: &str,
        properties: Properties,
    ) -> BackendResult<MemoryElement> {
        require_name(name)?;
        let source = require_entity(source)?.clone();
        let target = require_entity(target)?.clone();
        let id = Uuid::now_v7().to_string();
        let path = CanonicalPath::relationship(&id);
        self.write(
            tx,
            Op::Relate {
                id,
                source: source.clone(),
                target: target.clone(),
                name: name.to_string(),
                properties,
            },
        )?;
        debug!(%source, %target, name, relationship = %path, "Relationship created");
        Ok(MemoryElement::at_path(path, None, None))
    }

    async fn persist(
        &self,
        tx: &mut Transaction,
        path: &CanonicalPath,
        blueprint: &Blueprint,
    ) -> BackendResult<MemoryElement> {
        self.write(
            tx,
            Op::Persist {
                path: path.clone(),
                blueprint: blueprint.clone(),
                edges: AutoEdges::generate(),
                data_key: Uuid::now_v7(),
            },
        )?;
        debug!(%path, "Entity persisted");
        let state = Self::snapshot(tx)?;
        Ok(Self::handle(&state, path, None))
    }

    async fn persist_structured_data(
        &self,
        tx: &mut Transaction,
        data: &StructuredData,
    ) -> BackendResult<MemoryElement> {
        let key = Uuid::now_v7();
        self.write(
            tx,
            Op::PersistData {
                key,
                data: data.clone(),
            },
        )?;
        Ok(MemoryElement {
            key: ElementKey::Data(key),
            as_of: None,
            identity_hash: None,
        })
    }

    async fn update(
        &self,
        tx: &mut Transaction,
        element: &MemoryElement,
        update: &Update,
    ) -> BackendResult<MemoryElement> {
        let path = element.entity_path()?.clone();
        self.write(
            tx,
            Op::Update {
                path: path.clone(),
                update: update.clone(),
                data_key: Uuid::now_v7(),
            },
        )?;
        debug!(%path, "Element updated");
        let state = Self::snapshot(tx)?;
        Ok(Self::handle(&state, &path, None))
    }

    async fn update_identity_hash(
        &self,
        tx: &mut Transaction,
        element: &MemoryElement,
        hash: String,
    ) -> BackendResult<()> {
        let path = require_entity(element)?.clone();
        self.write(tx, Op::UpdateIdentityHash { path, hash })
    }

    async fn delete(&self, tx: &mut Transaction, element: &MemoryElement) -> BackendResult<()> {
        let path = element.entity_path()?.clone();
        self.write(tx, Op::Delete { path: path.clone() })?;
        debug!(%path, "Element deleted");
        Ok(())
    }

    async fn delete_structured_data(
        &self,
        tx: &mut Transaction,
        element: &MemoryElement,
    ) -> BackendResult<()> {
        match element.key {
            ElementKey::Data(key) => self.write(tx, Op::DeleteData { key }),
            ElementKey::Path(ref path) => Err(BackendError::InvalidArgument(format!(
                "{} is not a structured data node",
                path
            ))),
        }
    }

    async fn commit(&self, mut tx: Transaction) -> BackendResult<Vec<Notification>> {
        tx.ensure_open()?;
        let notifications = match tx.run_pre_commit().await {
            Ok(notifications) => notifications,
            Err(err) => {
                warn!(transaction = %tx.id(), error = %err, "Pre-commit action failed");
                tx.mark_rolled_back();
                return Err(BackendError::CommitFailure(err.to_string()));
            }
        };
        let ops = tx
            .attachments_mut()
            .remove::<Pending>(PENDING)
            .map(|pending| pending.ops)
            .ok_or_else(foreign_transaction)?;

        let mut committed = self.committed.lock().await;
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            warn!(transaction = %tx.id(), "Injected commit failure");
            tx.mark_rolled_back();
            return Err(BackendError::CommitFailure(
                "injected commit failure".to_string(),
            ));
        }

        if !ops.is_empty() {
            let at = self.clock.now();
            let mut next = GraphState::clone(&committed);
            for op in &ops {
                if let Err(err) = next.apply(op, at) {
                    warn!(transaction = %tx.id(), error = %err, "Commit replay failed");
                    tx.mark_rolled_back();
                    return Err(BackendError::CommitFailure(err.to_string()));
                }
            }
            next.version += 1;
            *committed = Arc::new(next);
        }

        tx.mark_committed();
        info!(
            transaction = %tx.id(),
            writes = ops.len(),
            notifications = notifications.len(),
            "Transaction committed"
        );
        Ok(notifications)
    }

    async fn rollback(&self, mut tx: Transaction) -> BackendResult<()> {
        tx.ensure_open()?;
        tx.mark_rolled_back();
        debug!(transaction = %tx.id(), "Transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DataEntityBlueprint, DataRole, EntityBlueprint, EntityUpdate, ResourceBlueprint,
    };
    use crate::temporal::ManualClock;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn p(raw: &str) -> CanonicalPath {
        CanonicalPath::parse(raw).unwrap()
    }

    async fn seeded() -> (MemoryBackend, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(t0()));
        let backend = MemoryBackend::with_clock(clock.clone());
        let mut tx = backend.start_transaction(true).await.unwrap();
        backend
            .persist(&mut tx, &p("/t;acme"), &Blueprint::Tenant(EntityBlueprint::new("acme")))
            .await
            .unwrap();
        backend
            .persist(&mut tx, &p("/t;acme/rt;host"), &Blueprint::ResourceType(EntityBlueprint::new("host")))
            .await
            .unwrap();
        backend.commit(tx).await.unwrap();
        clock.advance(Duration::seconds(1));
        (backend, clock)
    }

    #[tokio::test]
    async fn test_read_your_writes_before_commit() {
        let (backend, clock) = seeded().await;
        let mut tx = backend.start_transaction(true).await.unwrap();
        backend
            .persist(&mut tx, &p("/t;acme/e;prod"), &Blueprint::Environment(EntityBlueprint::new("prod")))
            .await
            .unwrap();

        let now = Discriminator::time(clock.now());
        assert!(backend.find(&tx, &now, &p("/t;acme/e;prod")).await.is_ok());

        let other = backend.start_transaction(false).await.unwrap();
        let err = backend.find(&other, &now, &p("/t;acme/e;prod")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_then_recreate_in_one_transaction() {
        let (backend, clock) = seeded().await;
        let mut tx = backend.start_transaction(true).await.unwrap();
        let now = Discriminator::time(clock.now());
        let tenant = backend.find(&tx, &now, &p("/t;acme")).await.unwrap();
        backend.delete(&mut tx, &tenant).await.unwrap();
        backend
            .persist(
                &mut tx,
                &p("/t;acme"),
                &Blueprint::Tenant(EntityBlueprint::new("acme").with_name("Acme again")),
            )
            .await
            .unwrap();
        backend.commit(tx).await.unwrap();
        clock.advance(Duration::seconds(1));

        let tx = backend.start_transaction(false).await.unwrap();
        let later = Discriminator::time(clock.now());
        let tenant = backend.find(&tx, &later, &p("/t;acme")).await.unwrap();
        let converted = backend
            .convert(&tx, &tenant, ConvertTarget::Entity(SegmentType::Tenant))
            .await
            .unwrap();
        assert_eq!(converted.name(), Some("Acme again"));
    }

    #[tokio::test]
    async fn test_identity_hash_then_update_in_one_transaction() {
        let (backend, clock) = seeded().await;
        let mut tx = backend.start_transaction(true).await.unwrap();
        let now = Discriminator::time(clock.now());
        let host = backend.find(&tx, &now, &p("/t;acme/rt;host")).await.unwrap();
        backend
            .update_identity_hash(&mut tx, &host, "feedface".to_string())
            .await
            .unwrap();
        backend
            .update(
                &mut tx,
                &host,
                &Update::Entity(EntityUpdate {
                    name: Some("Renamed".to_string()),
                    properties: None,
                }),
            )
            .await
            .unwrap();
        backend.commit(tx).await.unwrap();
        clock.advance(Duration::seconds(1));

        let tx = backend.start_transaction(false).await.unwrap();
        let later = Discriminator::time(clock.now());
        let host = backend.find(&tx, &later, &p("/t;acme/rt;host")).await.unwrap();
        let converted = backend
            .convert(&tx, &host, ConvertTarget::Entity(SegmentType::ResourceType))
            .await
            .unwrap();
        assert_eq!(converted.name(), Some("Renamed"));
    }

    #[tokio::test]
    async fn test_read_only_transaction_rejects_writes() {
        let (backend, _) = seeded().await;
        let mut tx = backend.start_transaction(false).await.unwrap();
        let result = backend
            .persist(&mut tx, &p("/t;other"), &Blueprint::Tenant(EntityBlueprint::new("other")))
            .await;
        assert!(matches!(result, Err(BackendError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_conflicting_commit_fails_without_effect() {
        let (backend, clock) = seeded().await;
        let mut first = backend.start_transaction(true).await.unwrap();
        let mut second = backend.start_transaction(true).await.unwrap();
        for tx in [&mut first, &mut second] {
            backend
                .persist(tx, &p("/t;acme/e;prod"), &Blueprint::Environment(EntityBlueprint::new("prod")))
                .await
                .unwrap();
        }
        backend
            .persist(&mut second, &p("/t;acme/e;dev"), &Blueprint::Environment(EntityBlueprint::new("dev")))
            .await
            .unwrap();

        backend.commit(first).await.unwrap();
        let err = backend.commit(second).await.unwrap_err();
        assert!(matches!(err, BackendError::CommitFailure(_)));

        let tx = backend.start_transaction(false).await.unwrap();
        let now = Discriminator::time(clock.now());
        assert!(backend.find(&tx, &now, &p("/t;acme/e;dev")).await.is_err());
    }

    #[tokio::test]
    async fn test_defines_edge_and_closure() {
        let (backend, clock) = seeded().await;
        let mut tx = backend.start_transaction(true).await.unwrap();
        backend
            .persist(&mut tx, &p("/t;acme/e;prod"), &Blueprint::Environment(EntityBlueprint::new("prod")))
            .await
            .unwrap();
        backend
            .persist(
                &mut tx,
                &p("/t;acme/e;prod/r;web01"),
                &Blueprint::Resource(ResourceBlueprint {
                    entity: EntityBlueprint::new("web01"),
                    resource_type: p("/t;acme/rt;host"),
                }),
            )
            .await
            .unwrap();
        backend.commit(tx).await.unwrap();

        let tx = backend.start_transaction(false).await.unwrap();
        let now = Discriminator::time(clock.now());
        let host = backend.find(&tx, &now, &p("/t;acme/rt;host")).await.unwrap();
        let web = backend.find(&tx, &now, &p("/t;acme/e;prod/r;web01")).await.unwrap();
        assert!(backend
            .has_relationship_between(&tx, &now, &host, &web, "defines")
            .await
            .unwrap());

        let tenant = backend.find(&tx, &now, &p("/t;acme")).await.unwrap();
        let reached: Vec<CanonicalPath> = backend
            .get_transitive_closure_over(&tx, &now, &tenant, Direction::Outgoing, &["contains"])
            .await
            .unwrap()
            .map(|e| backend.extract_canonical_path(&e))
            .collect();
        assert_eq!(
            reached,
            vec![
                p("/t;acme"),
                p("/t;acme/e;prod"),
                p("/t;acme/rt;host"),
                p("/t;acme/e;prod/r;web01"),
            ]
        );
    }

    #[tokio::test]
    async fn test_structured_data_conversions() {
        let (backend, _) = seeded().await;
        let mut tx = backend.start_transaction(true).await.unwrap();
        let value = StructuredData::Map(
            [("port".to_string(), StructuredData::Integral(8080))]
                .into_iter()
                .collect(),
        );
        let data = backend
            .persist(
                &mut tx,
                &p("/t;acme/rt;host/d;configurationSchema"),
                &Blueprint::DataEntity(DataEntityBlueprint {
                    role: DataRole::ConfigurationSchema,
                    value: value.clone(),
                    properties: Properties::new(),
                }),
            )
            .await
            .unwrap();

        let full = backend
            .convert(&tx, &data, ConvertTarget::StructuredData)
            .await
            .unwrap();
        assert_eq!(full, Element::StructuredData(value.clone()));

        let shallow = backend
            .convert(&tx, &data, ConvertTarget::ShallowStructuredData)
            .await
            .unwrap();
        assert_eq!(shallow, Element::ShallowStructuredData(value.shallow()));

        let node = backend.persist_structured_data(&mut tx, &value).await.unwrap();
        assert!(backend.is_backend_internal(&node));
        assert_eq!(backend.extract_type(&node), None);
        backend.delete_structured_data(&mut tx, &node).await.unwrap();
        assert!(backend
            .convert(&tx, &node, ConvertTarget::StructuredData)
            .await
            .is_err());

        let wrong = backend
            .convert(&tx, &data, ConvertTarget::Entity(SegmentType::Resource))
            .await;
        assert!(matches!(wrong, Err(BackendError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_closed_transaction_is_rejected() {
        let (backend, _) = seeded().await;
        let tx = backend.start_transaction(false).await.unwrap();
        backend.rollback(tx).await.unwrap();

        let tx = Transaction::new(false);
        let result = backend
            .find(&tx, &Discriminator::now(), &p("/t;acme"))
            .await;
        assert!(matches!(result, Err(BackendError::InvalidArgument(_))));
    }
}
