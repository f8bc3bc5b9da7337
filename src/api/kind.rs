// Copyright (c) 2025 - Cowboy AI, Inc.
//! Entity kinds
//!
//! Zero-sized tags that parameterize [`Repository`](super::Repository).
//! Each tag fixes the typed entity, its blueprint and its update, and the
//! capabilities of the kind are expressed as extra trait impls:
//!
//! ```text
//! Tenants ──HasChildren──> Environments, Feeds, ResourceTypes, MetricTypes
//! Environments ──────────> Feeds, Resources, Metrics
//! Feeds ─────────────────> ResourceTypes, MetricTypes, Resources, Metrics
//! ResourceTypes ─────────> OperationTypes, DataEntities
//! Resources ─────────────> Resources, Metrics, DataEntities
//! OperationTypes ────────> DataEntities
//! ```
//!
//! Every kind except data entities can take part in arbitrary
//! relationships ([`HasRelationships`]).

use crate::model::{
    Blueprint, DataEntity, DataEntityBlueprint, DataEntityUpdate, Element, EntityBlueprint,
    EntityUpdate, Environment, Feed, Metric, MetricBlueprint, MetricType, MetricTypeBlueprint,
    MetricTypeUpdate, MetricUpdate, OperationType, Resource, ResourceBlueprint, ResourceType,
    Tenant, Update,
};
use crate::path::SegmentType;

/// An entity kind a repository can manage
pub trait EntityKind: Send + Sync + 'static {
    /// Typed entity
    type Entity: TryFrom<Element, Error = Element> + Into<Element> + Clone + Send + Sync + 'static;

    /// Creation input
    type Blueprint: Clone + Send + Sync + 'static;

    /// Modification input
    type Update: Clone + Send + Sync + 'static;

    const SEGMENT_TYPE: SegmentType;

    fn blueprint(blueprint: Self::Blueprint) -> Blueprint;

    fn update(update: Self::Update) -> Update;
}

/// Kinds that can be related to any other entity
pub trait HasRelationships: EntityKind {}

/// Kinds whose entities contain entities of kind `C`
pub trait HasChildren<C: EntityKind>: EntityKind {}

macro_rules! entity_kind {
    ($tag:ident, $entity:ident, $blueprint:ty, $update:ty, $segment:ident, $update_variant:ident) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $tag;

        impl EntityKind for $tag {
            type Entity = $entity;
            type Blueprint = $blueprint;
            type Update = $update;

            const SEGMENT_TYPE: SegmentType = SegmentType::$segment;

            fn blueprint(blueprint: Self::Blueprint) -> Blueprint {
                Blueprint::$segment(blueprint)
            }

            fn update(update: Self::Update) -> Update {
                Update::$update_variant(update)
            }
        }
    };
}

entity_kind!(Tenants, Tenant, EntityBlueprint, EntityUpdate, Tenant, Entity);
entity_kind!(Environments, Environment, EntityBlueprint, EntityUpdate, Environment, Entity);
entity_kind!(Feeds, Feed, EntityBlueprint, EntityUpdate, Feed, Entity);
entity_kind!(ResourceTypes, ResourceType, EntityBlueprint, EntityUpdate, ResourceType, Entity);
entity_kind!(MetricTypes, MetricType, MetricTypeBlueprint, MetricTypeUpdate, MetricType, MetricType);
entity_kind!(Resources, Resource, ResourceBlueprint, EntityUpdate, Resource, Entity);
entity_kind!(Metrics, Metric, MetricBlueprint, MetricUpdate, Metric, Metric);
entity_kind!(OperationTypes, OperationType, EntityBlueprint, EntityUpdate, OperationType, Entity);
entity_kind!(DataEntities, DataEntity, DataEntityBlueprint, DataEntityUpdate, DataEntity, DataEntity);

impl HasRelationships for Tenants {}
impl HasRelationships for Environments {}
impl HasRelationships for Feeds {}
impl HasRelationships for ResourceTypes {}
impl HasRelationships for MetricTypes {}
impl HasRelationships for Resources {}
impl HasRelationships for Metrics {}
impl HasRelationships for OperationTypes {}

impl HasChildren<Environments> for Tenants {}
impl HasChildren<Feeds> for Tenants {}
impl HasChildren<ResourceTypes> for Tenants {}
impl HasChildren<MetricTypes> for Tenants {}

impl HasChildren<Feeds> for Environments {}
impl HasChildren<Resources> for Environments {}
impl HasChildren<Metrics> for Environments {}

impl HasChildren<ResourceTypes> for Feeds {}
impl HasChildren<MetricTypes> for Feeds {}
impl HasChildren<Resources> for Feeds {}
impl HasChildren<Metrics> for Feeds {}

impl HasChildren<OperationTypes> for ResourceTypes {}
impl HasChildren<DataEntities> for ResourceTypes {}

impl HasChildren<Resources> for Resources {}
impl HasChildren<Metrics> for Resources {}
impl HasChildren<DataEntities> for Resources {}

impl HasChildren<DataEntities> for OperationTypes {}
