// Copyright (c) 2025 - Cowboy AI, Inc.
//! Change Notifications
//!
//! A [`Notification`] binds a changed element to the action that changed it.
//! Transactions queue them in their pre-commit record; they are handed to a
//! [`NotificationSink`] only after the commit succeeded, once per change, in
//! queued order.

pub mod sink;
pub mod subject;

pub use sink::{
    ChannelSink, CollectingSink, FilteringSink, LoggingSink, NotificationSink, NullSink,
    SinkError,
};
pub use subject::{SubjectBuilder, SubjectError, GLOBAL_TENANT, INVENTORY_ROOT};

use serde::{Deserialize, Serialize};

use crate::model::{Action, Element};
use crate::path::CanonicalPath;

/// One change of one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub action: Action,
    pub path: CanonicalPath,
    pub element: Element,
}

impl Notification {
    pub fn new(action: Action, element: Element) -> Self {
        Self {
            action,
            path: element.path(),
            element,
        }
    }

    /// Tenant the change belongs to
    ///
    /// Relationships belong to the tenant of their source.
    pub fn tenant_id(&self) -> Option<&str> {
        match &self.element {
            Element::Relationship(rel) => rel.source.tenant_id(),
            _ => self.path.tenant_id(),
        }
    }

    /// Dotted subject, `inventory.{tenant}.{element-type}.{action}`
    ///
    /// Structured data has no element type of its own and is published as
    /// a data entity change.
    pub fn subject(&self) -> String {
        let element_type = self
            .element
            .segment_type()
            .unwrap_or(crate::path::SegmentType::DataEntity);
        SubjectBuilder::new()
            .tenant(self.tenant_id().unwrap_or(GLOBAL_TENANT))
            .element_type(element_type)
            .action(self.action)
            .build()
            .unwrap_or_else(|_| SubjectBuilder::build_all())
    }

    /// JSON payload
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Properties, Relationship};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_relationship_subject_uses_source_tenant() {
        let rel = Element::Relationship(Relationship {
            id: "42".to_string(),
            name: "contains".to_string(),
            source: CanonicalPath::parse("/t;acme/e;prod").unwrap(),
            target: CanonicalPath::parse("/t;acme/e;prod/r;web01").unwrap(),
            properties: Properties::new(),
        });
        let notification = Notification::new(Action::Created, rel);
        assert_eq!(notification.path.to_string(), "/rl;42");
        assert_eq!(notification.subject(), "inventory.acme.relationship.created");
    }

    #[test]
    fn test_json_payload() {
        let notification = Notification::new(
            Action::Deleted,
            Element::Tenant(crate::model::Tenant {
                id: "acme".to_string(),
                name: None,
                properties: Properties::new(),
            }),
        );
        let json = notification.to_json().unwrap();
        assert_eq!(json["action"], "deleted");
        assert_eq!(json["path"], "/t;acme");
        assert_eq!(json["element"]["kind"], "tenant");
    }
}
