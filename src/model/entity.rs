// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed Graph Elements
//!
//! The closed set of element kinds the inventory stores:
//!
//! ```text
//! Tenant
//!  ├── Environment
//!  │    ├── Feed ── ResourceType, MetricType, Resource, Metric
//!  │    ├── Resource ── Resource, Metric, DataEntity
//!  │    └── Metric
//!  ├── Feed
//!  ├── ResourceType ── OperationType ── DataEntity
//!  │                └─ DataEntity
//!  └── MetricType
//! Relationship (global, addressed by id alone)
//! ```
//!
//! Entities know the ids of their parents through a [`Placement`] (or, for
//! operation types and data entities, the owner's canonical path), so the
//! canonical path of any element can be derived from the element alone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::properties::Properties;
use super::structured_data::{ShallowStructuredData, StructuredData};
use crate::path::{CanonicalPath, CanonicalPathBuilder, PathError, SegmentType};

/// The parent ids of an entity living inside a tenant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_ids: Vec<String>,
}

impl Placement {
    /// Directly under a tenant
    pub fn tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            environment_id: None,
            feed_id: None,
            resource_ids: Vec::new(),
        }
    }

    /// Directly under an environment
    pub fn environment(tenant_id: impl Into<String>, environment_id: impl Into<String>) -> Self {
        Self {
            environment_id: Some(environment_id.into()),
            ..Self::tenant(tenant_id)
        }
    }

    pub fn with_feed(mut self, feed_id: impl Into<String>) -> Self {
        self.feed_id = Some(feed_id.into());
        self
    }

    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_ids.push(resource_id.into());
        self
    }

    /// Builder positioned at this placement, ready for the child segment
    pub fn builder(&self) -> CanonicalPathBuilder {
        let mut builder = CanonicalPath::builder().with_tenant_id(&self.tenant_id);
        if let Some(env) = &self.environment_id {
            builder = builder.with_environment_id(env);
        }
        if let Some(feed) = &self.feed_id {
            builder = builder.with_feed_id(feed);
        }
        for resource in &self.resource_ids {
            builder = builder.with_resource_id(resource);
        }
        builder
    }

    /// Canonical path of the parent this placement describes
    pub fn path(&self) -> Result<CanonicalPath, PathError> {
        self.builder().build()
    }

    /// Placement described by a parent path
    pub fn from_path(parent: &CanonicalPath) -> Result<Self, PathError> {
        let tenant_id = parent
            .tenant_id()
            .ok_or_else(|| PathError::MissingTenant(parent.to_string()))?;
        Ok(Self {
            tenant_id: tenant_id.to_string(),
            environment_id: parent.environment_id().map(str::to_string),
            feed_id: parent.feed_id().map(str::to_string),
            resource_ids: parent.resource_ids().into_iter().map(str::to_string).collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub tenant_id: String,
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

/// Agent that reports resources and metrics into the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub location: Placement,
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    pub location: Placement,
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricType {
    pub location: Placement,
    pub id: String,
    pub name: Option<String>,
    pub unit: MetricUnit,
    pub data_type: MetricDataType,
    /// Default collection interval in seconds
    pub collection_interval: Option<u64>,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub location: Placement,
    pub id: String,
    pub name: Option<String>,
    /// Canonical path of the defining resource type
    pub resource_type: CanonicalPath,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub location: Placement,
    pub id: String,
    pub name: Option<String>,
    /// Canonical path of the defining metric type
    pub metric_type: CanonicalPath,
    /// Overrides the metric type's interval when set
    pub collection_interval: Option<u64>,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationType {
    /// Path of the owning resource type
    pub resource_type: CanonicalPath,
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

/// Structured data attached to an entity under a fixed role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntity {
    /// Path of the owning entity
    pub owner: CanonicalPath,
    pub role: DataRole,
    pub value: StructuredData,
    #[serde(default)]
    pub properties: Properties,
}

/// Directed, named edge between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub name: String,
    pub source: CanonicalPath,
    pub target: CanonicalPath,
    #[serde(default)]
    pub properties: Properties,
}

/// Well-known relationship names
pub mod relationships {
    /// Parent to child in the containment tree
    pub const CONTAINS: &str = "contains";
    /// Type to instance
    pub const DEFINES: &str = "defines";
    /// Entity to entity it is composed of, outside containment
    pub const INCORPORATES: &str = "incorporates";
    /// Tenant or environment to resources it manages
    pub const ISPARENTOF: &str = "isParentOf";
}

/// Role of a data entity within its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataRole {
    Configuration,
    ConnectionConfiguration,
    ConfigurationSchema,
    ConnectionConfigurationSchema,
    ReturnType,
    ParameterTypes,
}

impl DataRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataRole::Configuration => "configuration",
            DataRole::ConnectionConfiguration => "connectionConfiguration",
            DataRole::ConfigurationSchema => "configurationSchema",
            DataRole::ConnectionConfigurationSchema => "connectionConfigurationSchema",
            DataRole::ReturnType => "returnType",
            DataRole::ParameterTypes => "parameterTypes",
        }
    }

    /// Whether an entity of `owner` type may carry data in this role
    pub fn allowed_for(&self, owner: SegmentType) -> bool {
        matches!(
            (owner, self),
            (
                SegmentType::Resource,
                DataRole::Configuration | DataRole::ConnectionConfiguration
            ) | (
                SegmentType::ResourceType,
                DataRole::ConfigurationSchema | DataRole::ConnectionConfigurationSchema
            ) | (
                SegmentType::OperationType,
                DataRole::ReturnType | DataRole::ParameterTypes
            )
        )
    }
}

impl fmt::Display for DataRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DataRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            DataRole::Configuration,
            DataRole::ConnectionConfiguration,
            DataRole::ConfigurationSchema,
            DataRole::ConnectionConfigurationSchema,
            DataRole::ReturnType,
            DataRole::ParameterTypes,
        ]
        .into_iter()
        .find(|role| role.as_str() == s)
        .ok_or_else(|| format!("unknown data role: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    None,
    Milliseconds,
    Seconds,
    Minutes,
    Bytes,
    Kilobytes,
    Megabytes,
    Percentage,
}

impl MetricUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricUnit::None => "none",
            MetricUnit::Milliseconds => "ms",
            MetricUnit::Seconds => "s",
            MetricUnit::Minutes => "min",
            MetricUnit::Bytes => "B",
            MetricUnit::Kilobytes => "KB",
            MetricUnit::Megabytes => "MB",
            MetricUnit::Percentage => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricDataType {
    Gauge,
    Counter,
    Availability,
    String,
}

impl MetricDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricDataType::Gauge => "gauge",
            MetricDataType::Counter => "counter",
            MetricDataType::Availability => "availability",
            MetricDataType::String => "string",
        }
    }
}

/// Any element a backend can hand out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    Tenant(Tenant),
    Environment(Environment),
    Feed(Feed),
    ResourceType(ResourceType),
    MetricType(MetricType),
    Resource(Resource),
    Metric(Metric),
    OperationType(OperationType),
    DataEntity(DataEntity),
    Relationship(Relationship),
    StructuredData(StructuredData),
    ShallowStructuredData(ShallowStructuredData),
}

impl Element {
    /// Segment type of the element; `None` for structured data
    pub fn segment_type(&self) -> Option<SegmentType> {
        Some(match self {
            Element::Tenant(_) => SegmentType::Tenant,
            Element::Environment(_) => SegmentType::Environment,
            Element::Feed(_) => SegmentType::Feed,
            Element::ResourceType(_) => SegmentType::ResourceType,
            Element::MetricType(_) => SegmentType::MetricType,
            Element::Resource(_) => SegmentType::Resource,
            Element::Metric(_) => SegmentType::Metric,
            Element::OperationType(_) => SegmentType::OperationType,
            Element::DataEntity(_) => SegmentType::DataEntity,
            Element::Relationship(_) => SegmentType::Relationship,
            Element::StructuredData(_) | Element::ShallowStructuredData(_) => return None,
        })
    }

    /// Canonical path of the element
    pub fn path(&self) -> CanonicalPath {
        CanonicalPath::of(self)
    }

    /// Id of the element. Data entities are identified by their role.
    pub fn id(&self) -> Option<&str> {
        Some(match self {
            Element::Tenant(e) => e.id.as_str(),
            Element::Environment(e) => e.id.as_str(),
            Element::Feed(e) => e.id.as_str(),
            Element::ResourceType(e) => e.id.as_str(),
            Element::MetricType(e) => e.id.as_str(),
            Element::Resource(e) => e.id.as_str(),
            Element::Metric(e) => e.id.as_str(),
            Element::OperationType(e) => e.id.as_str(),
            Element::DataEntity(e) => e.role.as_str(),
            Element::Relationship(e) => e.id.as_str(),
            Element::StructuredData(_) | Element::ShallowStructuredData(_) => return None,
        })
    }

    /// Human readable name. A relationship's name is its label.
    pub fn name(&self) -> Option<&str> {
        match self {
            Element::Tenant(e) => e.name.as_deref(),
            Element::Environment(e) => e.name.as_deref(),
            Element::Feed(e) => e.name.as_deref(),
            Element::ResourceType(e) => e.name.as_deref(),
            Element::MetricType(e) => e.name.as_deref(),
            Element::Resource(e) => e.name.as_deref(),
            Element::Metric(e) => e.name.as_deref(),
            Element::OperationType(e) => e.name.as_deref(),
            Element::Relationship(e) => Some(e.name.as_str()),
            Element::DataEntity(_) | Element::StructuredData(_) | Element::ShallowStructuredData(_) => {
                None
            }
        }
    }

    pub fn properties(&self) -> Option<&Properties> {
        match self {
            Element::Tenant(e) => Some(&e.properties),
            Element::Environment(e) => Some(&e.properties),
            Element::Feed(e) => Some(&e.properties),
            Element::ResourceType(e) => Some(&e.properties),
            Element::MetricType(e) => Some(&e.properties),
            Element::Resource(e) => Some(&e.properties),
            Element::Metric(e) => Some(&e.properties),
            Element::OperationType(e) => Some(&e.properties),
            Element::DataEntity(e) => Some(&e.properties),
            Element::Relationship(e) => Some(&e.properties),
            Element::StructuredData(_) | Element::ShallowStructuredData(_) => None,
        }
    }

    pub(crate) fn properties_mut(&mut self) -> Option<&mut Properties> {
        match self {
            Element::Tenant(e) => Some(&mut e.properties),
            Element::Environment(e) => Some(&mut e.properties),
            Element::Feed(e) => Some(&mut e.properties),
            Element::ResourceType(e) => Some(&mut e.properties),
            Element::MetricType(e) => Some(&mut e.properties),
            Element::Resource(e) => Some(&mut e.properties),
            Element::Metric(e) => Some(&mut e.properties),
            Element::OperationType(e) => Some(&mut e.properties),
            Element::DataEntity(e) => Some(&mut e.properties),
            Element::Relationship(e) => Some(&mut e.properties),
            Element::StructuredData(_) | Element::ShallowStructuredData(_) => None,
        }
    }

    pub(crate) fn name_mut(&mut self) -> Option<&mut Option<String>> {
        match self {
            Element::Tenant(e) => Some(&mut e.name),
            Element::Environment(e) => Some(&mut e.name),
            Element::Feed(e) => Some(&mut e.name),
            Element::ResourceType(e) => Some(&mut e.name),
            Element::MetricType(e) => Some(&mut e.name),
            Element::Resource(e) => Some(&mut e.name),
            Element::Metric(e) => Some(&mut e.name),
            Element::OperationType(e) => Some(&mut e.name),
            _ => None,
        }
    }

    pub fn is_relationship(&self) -> bool {
        matches!(self, Element::Relationship(_))
    }
}

macro_rules! element_variant {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Element {
                fn from(value: $variant) -> Self {
                    Element::$variant(value)
                }
            }

            impl TryFrom<Element> for $variant {
                type Error = Element;

                fn try_from(element: Element) -> Result<Self, Self::Error> {
                    match element {
                        Element::$variant(value) => Ok(value),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

element_variant!(
    Tenant,
    Environment,
    Feed,
    ResourceType,
    MetricType,
    Resource,
    Metric,
    OperationType,
    DataEntity,
    Relationship,
    StructuredData,
    ShallowStructuredData,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn nic() -> Resource {
        Resource {
            location: Placement::environment("acme", "prod").with_resource("web01"),
            id: "eth0".to_string(),
            name: Some("Ethernet".to_string()),
            resource_type: CanonicalPath::parse("/t;acme/rt;nic").unwrap(),
            properties: Properties::new(),
        }
    }

    #[test]
    fn test_path_derived_from_placement() {
        let element = Element::from(nic());
        assert_eq!(element.path().to_string(), "/t;acme/e;prod/r;web01/r;eth0");
        assert_eq!(element.segment_type(), Some(SegmentType::Resource));
        assert_eq!(element.name(), Some("Ethernet"));
    }

    #[test]
    fn test_data_entity_path_uses_role() {
        let data = Element::DataEntity(DataEntity {
            owner: Element::from(nic()).path(),
            role: DataRole::Configuration,
            value: StructuredData::Undefined,
            properties: Properties::new(),
        });
        assert_eq!(
            data.path().to_string(),
            "/t;acme/e;prod/r;web01/r;eth0/d;configuration"
        );
        assert_eq!(data.id(), Some("configuration"));
    }

    #[test]
    fn test_placement_round_trip_through_path() {
        let placement = Placement::environment("acme", "prod")
            .with_feed("agent")
            .with_resource("web01");
        let path = placement.path().unwrap();
        assert_eq!(Placement::from_path(&path).unwrap(), placement);
    }

    #[test]
    fn test_structured_data_has_no_path() {
        let element = Element::StructuredData(StructuredData::Bool(true));
        assert!(!element.path().is_defined());
        assert_eq!(element.id(), None);
    }

    #[test]
    fn test_try_from_element() {
        let element = Element::from(nic());
        assert!(Resource::try_from(element.clone()).is_ok());
        assert!(Tenant::try_from(element).is_err());
    }

    #[test]
    fn test_data_role_parsing() {
        assert_eq!("returnType".parse::<DataRole>(), Ok(DataRole::ReturnType));
        assert!("bogus".parse::<DataRole>().is_err());
        assert!(DataRole::Configuration.allowed_for(SegmentType::Resource));
        assert!(!DataRole::Configuration.allowed_for(SegmentType::OperationType));
    }
}
