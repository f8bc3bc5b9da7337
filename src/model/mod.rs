// Copyright (c) 2025 - Cowboy AI, Inc.
//! Inventory Domain Model
//!
//! Typed graph elements, the inputs used to create and modify them, and the
//! actions reported when they change.

pub mod action;
pub mod blueprint;
pub mod entity;
pub mod identity;
pub mod properties;
pub mod structured_data;

pub use action::Action;
pub use blueprint::{
    Blueprint, DataEntityBlueprint, DataEntityUpdate, EntityBlueprint, EntityUpdate,
    MetricBlueprint, MetricTypeBlueprint, MetricTypeUpdate, MetricUpdate, ModelError,
    RelationshipUpdate, ResourceBlueprint, Update,
};
pub use entity::{
    relationships, DataEntity, DataRole, Element, Environment, Feed, Metric, MetricDataType,
    MetricType, MetricUnit, OperationType, Placement, Relationship, Resource, ResourceType,
    Tenant,
};
pub use identity::identity_hash;
pub use properties::{Properties, PropertyValue};
pub use structured_data::{ShallowStructuredData, StructuredData, StructuredDataKind};
