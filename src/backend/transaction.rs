// Copyright (c) 2025 - Cowboy AI, Inc.
//! Transactions and Pre-commit
//!
//! A [`Transaction`] is one unit of work against a backend. It owns exactly
//! one [`PreCommit`] record that accumulates:
//!
//! - notifications to fire once the commit succeeds
//! - deferred actions to run while the transaction is still open
//!
//! ```text
//! start_transaction ─→ reads / writes ─→ commit ─┬─ run actions (in order)
//!                                                ├─ drain notifications
//!                                                ├─ physical commit
//!                                                └─ Ok(notifications)
//!                                     └→ rollback ── reset, nothing fires
//! ```
//!
//! A transaction is used by a single unit of work; it is not shared between
//! tasks.

use futures::future::BoxFuture;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{BackendError, BackendResult};
use crate::notification::Notification;

/// Side-effecting callback run before the physical commit
pub type PreCommitAction = Box<
    dyn for<'a> FnOnce(&'a mut Transaction) -> BoxFuture<'a, BackendResult<()>> + Send + Sync,
>;

/// Wrap a closure as a [`PreCommitAction`]
///
/// ```rust,ignore
/// tx.add_action(action(|tx| Box::pin(async move {
///     tx.attachments_mut().insert("touched", true);
///     Ok(())
/// })));
/// ```
pub fn action<F>(f: F) -> PreCommitAction
where
    F: for<'a> FnOnce(&'a mut Transaction) -> BoxFuture<'a, BackendResult<()>>
        + Send
        + Sync
        + 'static,
{
    Box::new(f)
}

/// Accumulates what a transaction does before it closes
pub trait PreCommit: Send + Sync {
    /// Queue notifications about one changed element
    fn add_notifications(&mut self, notifications: Vec<Notification>);

    /// Queue an action; actions run in registration order
    fn add_action(&mut self, action: PreCommitAction);

    /// Drain queued actions
    fn actions(&mut self) -> Vec<PreCommitAction>;

    /// Drain queued notifications in the order they will be delivered
    fn final_notifications(&mut self) -> Vec<Notification>;

    /// Forget everything queued
    fn reset(&mut self);
}

/// Keeps notifications and actions in queue order
#[derive(Default)]
pub struct BasicPreCommit {
    notifications: Vec<Notification>,
    actions: Vec<PreCommitAction>,
}

impl BasicPreCommit {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreCommit for BasicPreCommit {
    fn add_notifications(&mut self, mut notifications: Vec<Notification>) {
        self.notifications.append(&mut notifications);
    }

    fn add_action(&mut self, action: PreCommitAction) {
        self.actions.push(action);
    }

    fn actions(&mut self) -> Vec<PreCommitAction> {
        std::mem::take(&mut self.actions)
    }

    fn final_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn reset(&mut self) {
        self.notifications.clear();
        self.actions.clear();
    }
}

impl fmt::Debug for BasicPreCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicPreCommit")
            .field("notifications", &self.notifications.len())
            .field("actions", &self.actions.len())
            .finish()
    }
}

/// Transaction-scoped bookkeeping owned by the backend
#[derive(Default)]
pub struct Attachments {
    entries: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Attachments {
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Box::new(value));
    }

    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key)?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.entries.get_mut(key)?.downcast_mut()
    }

    /// Remove and return the value if it has type `T`
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        let boxed = self.entries.remove(key)?;
        match boxed.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(other) => {
                self.entries.insert(key.to_string(), other);
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Debug for Attachments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Lifecycle of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

/// One unit of work against a backend
pub struct Transaction {
    id: Uuid,
    mutating: bool,
    state: TransactionState,
    attachments: Attachments,
    pre_commit: Box<dyn PreCommit>,
}

impl Transaction {
    pub fn new(mutating: bool) -> Self {
        Self::with_pre_commit(mutating, Box::new(BasicPreCommit::new()))
    }

    pub fn with_pre_commit(mutating: bool, pre_commit: Box<dyn PreCommit>) -> Self {
        Self {
            id: Uuid::now_v7(),
            mutating,
            state: TransactionState::Open,
            attachments: Attachments::default(),
            pre_commit,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_mutating(&self) -> bool {
        self.mutating
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == TransactionState::Open
    }

    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut Attachments {
        &mut self.attachments
    }

    pub fn pre_commit_mut(&mut self) -> &mut dyn PreCommit {
        self.pre_commit.as_mut()
    }

    pub fn add_notification(&mut self, notification: Notification) {
        self.pre_commit.add_notifications(vec![notification]);
    }

    pub fn add_action(&mut self, action: PreCommitAction) {
        self.pre_commit.add_action(action);
    }

    /// Fail unless the transaction is still open
    pub fn ensure_open(&self) -> BackendResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(BackendError::TransactionClosed)
        }
    }

    /// Fail unless the transaction is open and may write
    pub fn ensure_mutating(&self) -> BackendResult<()> {
        self.ensure_open()?;
        if self.mutating {
            Ok(())
        } else {
            Err(BackendError::InvalidArgument(format!(
                "transaction {} is read-only",
                self.id
            )))
        }
    }

    /// Run queued actions, then drain the notifications to deliver
    ///
    /// Actions may queue further actions; those run too, after the ones
    /// already queued. Called by backends right before the physical commit.
    pub async fn run_pre_commit(&mut self) -> BackendResult<Vec<Notification>> {
        self.ensure_open()?;
        loop {
            let actions = self.pre_commit.actions();
            if actions.is_empty() {
                break;
            }
            debug!(transaction = %self.id, count = actions.len(), "Running pre-commit actions");
            for action in actions {
                action(self).await?;
            }
        }
        Ok(self.pre_commit.final_notifications())
    }

    /// Close after a successful physical commit
    pub fn mark_committed(&mut self) {
        self.state = TransactionState::Committed;
        self.close();
    }

    /// Close without effect
    pub fn mark_rolled_back(&mut self) {
        self.state = TransactionState::RolledBack;
        self.close();
    }

    fn close(&mut self) {
        self.pre_commit.reset();
        self.attachments.clear();
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("mutating", &self.mutating)
            .field("state", &self.state)
            .field("attachments", &self.attachments)
            .finish()
    }
}
