// Copyright (c) 2025 - Cowboy AI, Inc.
//! Notification Sinks
//!
//! Sinks receive the notifications of committed transactions. Fan-out,
//! subscription matching and transport are the sink's business; the
//! inventory only promises what is delivered and when.
//!
//! # Architecture
//!
//! ```text
//! Transaction                    Sink
//! ───────────                   ──────
//!
//! PreCommit queue               deliver()
//!      │                            │
//!      ▼                            ▼
//! ┌─────────────┐  commit ok  ┌──────────────┐
//! │  queued     │ ──────────> │  channel,    │
//! │  (ordered)  │             │  log, ...    │
//! └─────────────┘             └──────────────┘
//! ```
//!
//! A sink failure is logged by the caller and never undoes the commit.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

use super::Notification;

/// Receiver of committed change notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification
    async fn deliver(&self, notification: &Notification) -> Result<(), SinkError>;

    /// Deliver a batch in order, stopping at the first failure
    async fn deliver_all(&self, notifications: &[Notification]) -> Result<(), SinkError> {
        for notification in notifications {
            self.deliver(notification).await?;
        }
        Ok(())
    }
}

/// Errors that can occur while delivering notifications
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The receiving side is gone
    #[error("Notification channel closed")]
    Closed,

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Logs each notification at `info`
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

#[async_trait]
impl NotificationSink for LoggingSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), SinkError> {
        info!(
            subject = %notification.subject(),
            path = %notification.path,
            "Inventory change"
        );
        Ok(())
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn deliver(&self, _notification: &Notification) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps delivered notifications for inspection
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    collected: Arc<Mutex<Vec<Notification>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far
    pub async fn notifications(&self) -> Vec<Notification> {
        self.collected.lock().await.clone()
    }

    /// Take everything delivered so far, leaving the collector empty
    pub async fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.collected.lock().await)
    }
}

#[async_trait]
impl NotificationSink for CollectingSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), SinkError> {
        self.collected.lock().await.push(notification.clone());
        Ok(())
    }
}

/// Forwards into a bounded channel
///
/// Delivery waits for capacity, so a slow consumer slows committers down
/// rather than losing notifications.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<Notification>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), SinkError> {
        self.sender
            .send(notification.clone())
            .await
            .map_err(|_| SinkError::Closed)
    }
}

/// Wraps another sink and forwards only matching notifications
pub struct FilteringSink<S: NotificationSink> {
    inner: S,
    filter: Box<dyn Fn(&Notification) -> bool + Send + Sync>,
}

impl<S: NotificationSink> FilteringSink<S> {
    pub fn new<F>(inner: S, filter: F) -> Self
    where
        F: Fn(&Notification) -> bool + Send + Sync + 'static,
    {
        Self {
            inner,
            filter: Box::new(filter),
        }
    }
}

#[async_trait]
impl<S: NotificationSink> NotificationSink for FilteringSink<S> {
    async fn deliver(&self, notification: &Notification) -> Result<(), SinkError> {
        if (self.filter)(notification) {
            self.inner.deliver(notification).await
        } else {
            Ok(())
        }
    }
}
