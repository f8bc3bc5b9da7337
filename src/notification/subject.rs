// Copyright (c) 2025 - Cowboy AI, Inc.
//! Subject hierarchy for inventory change notifications
//!
//! Every notification is addressed by a dotted subject:
//!
//! ```text
//! inventory.{tenant}.{element-type}.{action}
//! ```
//!
//! This allows for:
//! - Precise subscriptions (`inventory.acme.resource.created`)
//! - Tenant-level wildcards (`inventory.acme.>`)
//! - Global subscriptions (`inventory.>`)
//!
//! Relationships carry no tenant of their own and use the tenant of their
//! source; ids are sanitized so they never introduce extra tokens.
//!
//! # Examples
//!
//! ```rust
//! use cim_inventory::model::Action;
//! use cim_inventory::notification::SubjectBuilder;
//! use cim_inventory::path::SegmentType;
//!
//! let subject = SubjectBuilder::new()
//!     .tenant("acme")
//!     .element_type(SegmentType::Resource)
//!     .action(Action::Created)
//!     .build()
//!     .unwrap();
//! assert_eq!(subject, "inventory.acme.resource.created");
//!
//! let wildcard = SubjectBuilder::new().tenant("acme").build_wildcard().unwrap();
//! assert_eq!(wildcard, "inventory.acme.>");
//! ```

use crate::model::Action;
use crate::path::SegmentType;

/// Root namespace for all inventory subjects
pub const INVENTORY_ROOT: &str = "inventory";

/// Tenant token used when a notification has no tenant
pub const GLOBAL_TENANT: &str = "_global";

/// Missing parts of a subject
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubjectError {
    #[error("Subject needs a tenant")]
    MissingTenant,
    #[error("Subject needs an element type")]
    MissingElementType,
    #[error("Subject needs an action")]
    MissingAction,
}

/// Builder for notification subjects
#[derive(Debug, Clone, Default)]
pub struct SubjectBuilder {
    tenant: Option<String>,
    element_type: Option<SegmentType>,
    action: Option<Action>,
}

impl SubjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tenant(mut self, tenant: impl AsRef<str>) -> Self {
        self.tenant = Some(sanitize(tenant.as_ref()));
        self
    }

    pub fn element_type(mut self, element_type: SegmentType) -> Self {
        self.element_type = Some(element_type);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Build the complete subject string
    pub fn build(self) -> Result<String, SubjectError> {
        let tenant = self.tenant.ok_or(SubjectError::MissingTenant)?;
        let element_type = self.element_type.ok_or(SubjectError::MissingElementType)?;
        let action = self.action.ok_or(SubjectError::MissingAction)?;
        Ok(format!(
            "{}.{}.{}.{}",
            INVENTORY_ROOT,
            tenant,
            token(element_type),
            action
        ))
    }

    /// Subscription to everything under the tenant (and element type, if
    /// set)
    pub fn build_wildcard(self) -> Result<String, SubjectError> {
        let tenant = self.tenant.ok_or(SubjectError::MissingTenant)?;
        Ok(match self.element_type {
            Some(element_type) => {
                format!("{}.{}.{}.>", INVENTORY_ROOT, tenant, token(element_type))
            }
            None => format!("{}.{}.>", INVENTORY_ROOT, tenant),
        })
    }

    /// Subscription to every inventory notification
    pub fn build_all() -> String {
        format!("{}.>", INVENTORY_ROOT)
    }
}

/// Subject token of an element type
pub fn token(element_type: SegmentType) -> &'static str {
    match element_type {
        SegmentType::Tenant => "tenant",
        SegmentType::Environment => "environment",
        SegmentType::Feed => "feed",
        SegmentType::ResourceType => "resource_type",
        SegmentType::MetricType => "metric_type",
        SegmentType::Resource => "resource",
        SegmentType::Metric => "metric",
        SegmentType::OperationType => "operation_type",
        SegmentType::DataEntity => "data_entity",
        SegmentType::Relationship => "relationship",
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '.' | '*' | '>' | ' ' => '_',
            c => c,
        })
        .collect()
}
