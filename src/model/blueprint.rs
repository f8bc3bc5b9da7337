// Copyright (c) 2025 - Cowboy AI, Inc.
//! Blueprints and Updates
//!
//! A [`Blueprint`] is the caller's description of an entity to create. The
//! backend combines it with the canonical path the entity is persisted at
//! to produce the stored [`Element`].
//!
//! An [`Update`] carries the mutable parts of one element kind. Applying an
//! update to an element of another kind is an invalid argument.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entity::*;
use super::properties::Properties;
use super::structured_data::StructuredData;
use crate::path::{CanonicalPath, PathError, SegmentType};

/// Model-level construction errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Blueprint for {blueprint} cannot be persisted at {path}")]
    BlueprintMismatch {
        path: CanonicalPath,
        blueprint: SegmentType,
    },

    #[error("{update} update cannot be applied to {element}")]
    UpdateMismatch {
        element: CanonicalPath,
        update: &'static str,
    },

    #[error("Data role {role} is not allowed on {owner}")]
    InvalidDataRole { role: DataRole, owner: SegmentType },

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Fields shared by every entity blueprint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityBlueprint {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

impl EntityBlueprint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<super::PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTypeBlueprint {
    #[serde(flatten)]
    pub entity: EntityBlueprint,
    pub unit: MetricUnit,
    pub data_type: MetricDataType,
    pub collection_interval: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBlueprint {
    #[serde(flatten)]
    pub entity: EntityBlueprint,
    pub resource_type: CanonicalPath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricBlueprint {
    #[serde(flatten)]
    pub entity: EntityBlueprint,
    pub metric_type: CanonicalPath,
    pub collection_interval: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntityBlueprint {
    pub role: DataRole,
    pub value: StructuredData,
    #[serde(default)]
    pub properties: Properties,
}

/// Input for creating an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Blueprint {
    Tenant(EntityBlueprint),
    Environment(EntityBlueprint),
    Feed(EntityBlueprint),
    ResourceType(EntityBlueprint),
    MetricType(MetricTypeBlueprint),
    Resource(ResourceBlueprint),
    Metric(MetricBlueprint),
    OperationType(EntityBlueprint),
    DataEntity(DataEntityBlueprint),
}

impl Blueprint {
    pub fn segment_type(&self) -> SegmentType {
        match self {
            Blueprint::Tenant(_) => SegmentType::Tenant,
            Blueprint::Environment(_) => SegmentType::Environment,
            Blueprint::Feed(_) => SegmentType::Feed,
            Blueprint::ResourceType(_) => SegmentType::ResourceType,
            Blueprint::MetricType(_) => SegmentType::MetricType,
            Blueprint::Resource(_) => SegmentType::Resource,
            Blueprint::Metric(_) => SegmentType::Metric,
            Blueprint::OperationType(_) => SegmentType::OperationType,
            Blueprint::DataEntity(_) => SegmentType::DataEntity,
        }
    }

    /// Id the entity will have; the role for data entities
    pub fn id(&self) -> &str {
        match self {
            Blueprint::Tenant(b)
            | Blueprint::Environment(b)
            | Blueprint::Feed(b)
            | Blueprint::ResourceType(b)
            | Blueprint::OperationType(b) => &b.id,
            Blueprint::MetricType(b) => &b.entity.id,
            Blueprint::Resource(b) => &b.entity.id,
            Blueprint::Metric(b) => &b.entity.id,
            Blueprint::DataEntity(b) => b.role.as_str(),
        }
    }

    /// Build the element stored at `path`
    ///
    /// `path` must end in a segment of the blueprint's type carrying the
    /// blueprint's id.
    pub fn to_element(&self, path: &CanonicalPath) -> Result<Element, ModelError> {
        let mismatch = || ModelError::BlueprintMismatch {
            path: path.clone(),
            blueprint: self.segment_type(),
        };
        if path.segment_type() != Some(self.segment_type()) || path.id() != Some(self.id()) {
            return Err(mismatch());
        }
        let parent = path.up();
        let placement = || -> Result<Placement, ModelError> {
            let parent = parent.as_ref().ok_or_else(mismatch)?;
            Ok(Placement::from_path(parent)?)
        };

        let element = match self {
            Blueprint::Tenant(b) => Element::Tenant(Tenant {
                id: b.id.clone(),
                name: b.name.clone(),
                properties: b.properties.clone(),
            }),
            Blueprint::Environment(b) => Element::Environment(Environment {
                tenant_id: placement()?.tenant_id,
                id: b.id.clone(),
                name: b.name.clone(),
                properties: b.properties.clone(),
            }),
            Blueprint::Feed(b) => Element::Feed(Feed {
                location: placement()?,
                id: b.id.clone(),
                name: b.name.clone(),
                properties: b.properties.clone(),
            }),
            Blueprint::ResourceType(b) => Element::ResourceType(ResourceType {
                location: placement()?,
                id: b.id.clone(),
                name: b.name.clone(),
                properties: b.properties.clone(),
            }),
            Blueprint::MetricType(b) => Element::MetricType(MetricType {
                location: placement()?,
                id: b.entity.id.clone(),
                name: b.entity.name.clone(),
                unit: b.unit,
                data_type: b.data_type,
                collection_interval: b.collection_interval,
                properties: b.entity.properties.clone(),
            }),
            Blueprint::Resource(b) => Element::Resource(Resource {
                location: placement()?,
                id: b.entity.id.clone(),
                name: b.entity.name.clone(),
                resource_type: b.resource_type.clone(),
                properties: b.entity.properties.clone(),
            }),
            Blueprint::Metric(b) => Element::Metric(Metric {
                location: placement()?,
                id: b.entity.id.clone(),
                name: b.entity.name.clone(),
                metric_type: b.metric_type.clone(),
                collection_interval: b.collection_interval,
                properties: b.entity.properties.clone(),
            }),
            Blueprint::OperationType(b) => Element::OperationType(OperationType {
                resource_type: parent.clone().ok_or_else(mismatch)?,
                id: b.id.clone(),
                name: b.name.clone(),
                properties: b.properties.clone(),
            }),
            Blueprint::DataEntity(b) => {
                let owner = parent.clone().ok_or_else(mismatch)?;
                let owner_type = owner.segment_type().ok_or_else(mismatch)?;
                if !b.role.allowed_for(owner_type) {
                    return Err(ModelError::InvalidDataRole {
                        role: b.role,
                        owner: owner_type,
                    });
                }
                Element::DataEntity(DataEntity {
                    owner,
                    role: b.role,
                    value: b.value.clone(),
                    properties: b.properties.clone(),
                })
            }
        };
        Ok(element)
    }
}

/// Name and properties, common to all entity updates
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityUpdate {
    pub name: Option<String>,
    pub properties: Option<Properties>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricTypeUpdate {
    #[serde(flatten)]
    pub entity: EntityUpdate,
    pub unit: Option<MetricUnit>,
    pub collection_interval: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricUpdate {
    #[serde(flatten)]
    pub entity: EntityUpdate,
    pub collection_interval: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntityUpdate {
    pub value: StructuredData,
    pub properties: Option<Properties>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelationshipUpdate {
    pub properties: Option<Properties>,
}

/// Mutable parts of one element kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Update {
    /// Tenants, environments, feeds, resource types, resources, operation types
    Entity(EntityUpdate),
    MetricType(MetricTypeUpdate),
    Metric(MetricUpdate),
    DataEntity(DataEntityUpdate),
    Relationship(RelationshipUpdate),
}

impl Update {
    fn label(&self) -> &'static str {
        match self {
            Update::Entity(_) => "entity",
            Update::MetricType(_) => "metric type",
            Update::Metric(_) => "metric",
            Update::DataEntity(_) => "data entity",
            Update::Relationship(_) => "relationship",
        }
    }

    /// Whether this update can be applied to elements of `segment_type`
    pub fn applies_to(&self, segment_type: SegmentType) -> bool {
        use SegmentType::*;
        match self {
            Update::Entity(_) => matches!(
                segment_type,
                Tenant | Environment | Feed | ResourceType | Resource | OperationType
            ),
            Update::MetricType(_) => segment_type == MetricType,
            Update::Metric(_) => segment_type == Metric,
            Update::DataEntity(_) => segment_type == DataEntity,
            Update::Relationship(_) => segment_type == Relationship,
        }
    }
}

fn apply_entity(element: &mut Element, update: &EntityUpdate) {
    if let (Some(name), Some(slot)) = (&update.name, element.name_mut()) {
        *slot = Some(name.clone());
    }
    if let (Some(props), Some(slot)) = (&update.properties, element.properties_mut()) {
        *slot = props.clone();
    }
}

impl Element {
    /// Apply an update of the matching kind in place
    pub fn apply(&mut self, update: &Update) -> Result<(), ModelError> {
        let applies = self
            .segment_type()
            .map(|t| update.applies_to(t))
            .unwrap_or(false);
        if !applies {
            return Err(ModelError::UpdateMismatch {
                element: self.path(),
                update: update.label(),
            });
        }

        match (update, &mut *self) {
            (Update::Entity(u), element) => apply_entity(element, u),
            (Update::MetricType(u), Element::MetricType(mt)) => {
                if let Some(unit) = u.unit {
                    mt.unit = unit;
                }
                if u.collection_interval.is_some() {
                    mt.collection_interval = u.collection_interval;
                }
                apply_entity(self, &u.entity);
            }
            (Update::Metric(u), Element::Metric(metric)) => {
                if u.collection_interval.is_some() {
                    metric.collection_interval = u.collection_interval;
                }
                apply_entity(self, &u.entity);
            }
            (Update::DataEntity(u), Element::DataEntity(data)) => {
                data.value = u.value.clone();
                if let Some(props) = &u.properties {
                    data.properties = props.clone();
                }
            }
            (Update::Relationship(u), Element::Relationship(rel)) => {
                if let Some(props) = &u.properties {
                    rel.properties = props.clone();
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_path() -> CanonicalPath {
        CanonicalPath::parse("/t;acme/e;prod/r;web01").unwrap()
    }

    fn server_blueprint() -> Blueprint {
        Blueprint::Resource(ResourceBlueprint {
            entity: EntityBlueprint::new("web01").with_name("Web 01"),
            resource_type: CanonicalPath::parse("/t;acme/rt;server").unwrap(),
        })
    }

    #[test]
    fn test_blueprint_to_element() {
        let element = server_blueprint().to_element(&server_path()).unwrap();
        match &element {
            Element::Resource(r) => {
                assert_eq!(r.location, Placement::environment("acme", "prod"));
                assert_eq!(r.name.as_deref(), Some("Web 01"));
            }
            other => panic!("unexpected element {:?}", other),
        }
        assert_eq!(element.path(), server_path());
    }

    #[test]
    fn test_blueprint_path_mismatch() {
        let wrong = CanonicalPath::parse("/t;acme/e;prod/r;web02").unwrap();
        assert!(matches!(
            server_blueprint().to_element(&wrong),
            Err(ModelError::BlueprintMismatch { .. })
        ));
    }

    #[test]
    fn test_data_role_checked_against_owner() {
        let blueprint = Blueprint::DataEntity(DataEntityBlueprint {
            role: DataRole::ReturnType,
            value: StructuredData::Undefined,
            properties: Properties::new(),
        });
        let path = server_path().extend(SegmentType::DataEntity, "returnType").unwrap();
        assert!(matches!(
            blueprint.to_element(&path),
            Err(ModelError::InvalidDataRole { .. })
        ));
    }

    #[test]
    fn test_update_application() {
        let mut element = server_blueprint().to_element(&server_path()).unwrap();
        let update = Update::Entity(EntityUpdate {
            name: Some("renamed".to_string()),
            properties: None,
        });
        element.apply(&update).unwrap();
        assert_eq!(element.name(), Some("renamed"));

        let wrong = Update::Metric(MetricUpdate::default());
        assert!(matches!(
            element.apply(&wrong),
            Err(ModelError::UpdateMismatch { update: "metric", .. })
        ));
    }
}
