// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory graph state and its operation log
//!
//! Every element ever stored keeps a [`Record`] with its full history, so
//! deleted elements remain visible to queries about the past. Relationship
//! adjacency is indexed per entity and only ever grows; whether an edge
//! exists at an instant is decided by the edge's own history.
//!
//! Writes are expressed as [`Op`]s. The same `apply` runs against a
//! transaction's working copy and, at commit, against the latest committed
//! state. Every check happens before the first mutation, so a failing op
//! leaves the state untouched.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

use crate::backend::Direction;
use crate::errors::{BackendError, BackendResult, NotFoundKind};
use crate::model::{
    identity_hash, relationships, Action, Blueprint, Element, Properties, Relationship,
    StructuredData, Update,
};
use crate::path::{CanonicalPath, SegmentType};
use crate::temporal::{Discriminator, EntityHistory, EntityStateChange};

/// Everything known about one element
#[derive(Debug, Clone, Default)]
pub(crate) struct Record {
    pub history: EntityHistory<Element>,
    pub identity_hash: Option<String>,
    /// Structured data node holding a data entity's value
    pub data_key: Option<Uuid>,
}

/// Ids generated for the edges a persist creates
#[derive(Debug, Clone)]
pub(crate) struct AutoEdges {
    pub contains: String,
    pub defines: String,
}

impl AutoEdges {
    pub fn generate() -> Self {
        Self {
            contains: Uuid::now_v7().to_string(),
            defines: Uuid::now_v7().to_string(),
        }
    }
}

/// One logged write
#[derive(Debug, Clone)]
pub(crate) enum Op {
    Persist {
        path: CanonicalPath,
        blueprint: Blueprint,
        edges: AutoEdges,
        data_key: Uuid,
    },
    PersistData {
        key: Uuid,
        data: StructuredData,
    },
    Relate {
        id: String,
        source: CanonicalPath,
        target: CanonicalPath,
        name: String,
        properties: Properties,
    },
    Update {
        path: CanonicalPath,
        update: Update,
        data_key: Uuid,
    },
    UpdateIdentityHash {
        path: CanonicalPath,
        hash: String,
    },
    Delete {
        path: CanonicalPath,
    },
    DeleteData {
        key: Uuid,
    },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GraphState {
    records: BTreeMap<CanonicalPath, Record>,
    data: HashMap<Uuid, StructuredData>,
    outgoing: HashMap<CanonicalPath, BTreeSet<CanonicalPath>>,
    incoming: HashMap<CanonicalPath, BTreeSet<CanonicalPath>>,
    /// Instant of the most recent applied op
    last_change: Option<DateTime<Utc>>,
    pub version: u64,
}

impl GraphState {
    pub fn record(&self, path: &CanonicalPath) -> Option<&Record> {
        self.records.get(path)
    }

    /// State after the latest change
    pub fn latest(&self, path: &CanonicalPath) -> Option<&Element> {
        self.records.get(path)?.history.latest()
    }

    pub fn at(&self, path: &CanonicalPath, discriminator: &Discriminator) -> Option<&Element> {
        self.records.get(path)?.history.state_at(discriminator)
    }

    /// State as of the discriminator, or the latest state without one
    pub fn element(
        &self,
        path: &CanonicalPath,
        as_of: Option<&Discriminator>,
    ) -> Option<&Element> {
        match as_of {
            Some(discriminator) => self.at(path, discriminator),
            None => self.latest(path),
        }
    }

    pub fn data(&self, key: &Uuid) -> Option<&StructuredData> {
        self.data.get(key)
    }

    /// Paths of every element existing as of the discriminator
    pub fn existing(&self, discriminator: &Discriminator) -> Vec<CanonicalPath> {
        self.records
            .iter()
            .filter(|(_, record)| record.history.state_at(discriminator).is_some())
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Relationships incident to `path` in `direction`, each once
    pub fn relationships(
        &self,
        path: &CanonicalPath,
        direction: Direction,
        discriminator: &Discriminator,
    ) -> Vec<(&CanonicalPath, &Relationship)> {
        let outgoing = self.outgoing.get(path).into_iter().flatten();
        let incoming = self.incoming.get(path).into_iter().flatten();
        let candidates: BTreeSet<&CanonicalPath> = match direction {
            Direction::Outgoing => outgoing.collect(),
            Direction::Incoming => incoming.collect(),
            Direction::Both => outgoing.chain(incoming).collect(),
        };
        candidates
            .into_iter()
            .filter_map(|rel_path| match self.at(rel_path, discriminator) {
                Some(Element::Relationship(rel)) => Some((rel_path, rel)),
                _ => None,
            })
            .collect()
    }

    /// Entities one relationship away from `path`, in path order
    pub fn neighbors(
        &self,
        path: &CanonicalPath,
        direction: Direction,
        names: &[String],
        discriminator: &Discriminator,
    ) -> Vec<CanonicalPath> {
        let mut found: Vec<CanonicalPath> = self
            .relationships(path, direction, discriminator)
            .into_iter()
            .filter(|(_, rel)| names.is_empty() || names.iter().any(|n| *n == rel.name))
            .flat_map(|(_, rel)| other_ends(rel, path, direction))
            .filter(|other| self.at(other, discriminator).is_some())
            .collect();
        found.sort();
        found.dedup();
        found
    }

    /// Apply one op as of `at`
    ///
    /// Ops are stamped strictly after every earlier op, so changes replayed
    /// at one commit instant keep their log order.
    pub fn apply(&mut self, op: &Op, at: DateTime<Utc>) -> BackendResult<()> {
        let at = self.stamp(at);
        match op {
            Op::Persist {
                path,
                blueprint,
                edges,
                data_key,
            } => self.persist(path, blueprint, edges, *data_key, at).map(|_| ()),
            Op::PersistData { key, data } => {
                self.data.insert(*key, data.clone());
                Ok(())
            }
            Op::Relate {
                id,
                source,
                target,
                name,
                properties,
            } => self
                .relate(id, source, target, name, properties.clone(), at)
                .map(|_| ()),
            Op::Update {
                path,
                update,
                data_key,
            } => self.update(path, update, *data_key, at).map(|_| ()),
            Op::UpdateIdentityHash { path, hash } => self.update_identity_hash(path, hash, at),
            Op::Delete { path } => self.delete(path, at),
            Op::DeleteData { key } => self
                .data
                .remove(key)
                .map(|_| ())
                .ok_or_else(|| BackendError::ElementNotFound {
                    kind: NotFoundKind::Entity,
                    description: format!("structured data {}", key),
                }),
        }
    }

    fn stamp(&mut self, at: DateTime<Utc>) -> DateTime<Utc> {
        let at = match self.last_change {
            Some(last) if at <= last => last + Duration::nanoseconds(1),
            _ => at,
        };
        self.last_change = Some(at);
        at
    }

    fn existing_entity(&self, path: &CanonicalPath) -> BackendResult<&Element> {
        match self.latest(path) {
            Some(element) => Ok(element),
            None if path.segment_type() == Some(SegmentType::Relationship) => Err(
                BackendError::relationship_not_found(path.to_string()),
            ),
            None => Err(BackendError::entity_not_found(path)),
        }
    }

    fn push_change(&mut self, path: &CanonicalPath, action: Action, element: Element, at: DateTime<Utc>) {
        self.records
            .entry(path.clone())
            .or_default()
            .history
            .push(EntityStateChange::new(action, element, path.clone(), at));
    }

    pub fn persist(
        &mut self,
        path: &CanonicalPath,
        blueprint: &Blueprint,
        edges: &AutoEdges,
        data_key: Uuid,
        at: DateTime<Utc>,
    ) -> BackendResult<Element> {
        path.validate()?;
        let element = blueprint.to_element(path)?;
        if self.latest(path).is_some() {
            return Err(BackendError::AlreadyExists(path.clone()));
        }

        let parent = path.up();
        if let Some(parent) = &parent {
            self.existing_entity(parent)?;
        }

        let definer = match &element {
            Element::Resource(r) => Some((r.resource_type.clone(), SegmentType::ResourceType)),
            Element::Metric(m) => Some((m.metric_type.clone(), SegmentType::MetricType)),
            _ => None,
        };
        if let Some((definer_path, expected)) = &definer {
            if definer_path.segment_type() != Some(*expected) {
                return Err(BackendError::InvalidArgument(format!(
                    "{} is not a {}",
                    definer_path,
                    expected.display_name()
                )));
            }
            self.existing_entity(definer_path)?;
        }

        let hash = identity_hash(&element);
        self.push_change(path, Action::Created, element.clone(), at);
        if let Some(record) = self.records.get_mut(path) {
            record.identity_hash = hash;
            record.data_key = None;
            if let Element::DataEntity(data) = &element {
                record.data_key = Some(data_key);
                self.data.insert(data_key, data.value.clone());
            }
        }

        if let Some(parent) = parent {
            self.link(&edges.contains, &parent, path, relationships::CONTAINS, Properties::new(), at);
        }
        if let Some((definer_path, _)) = definer {
            self.link(&edges.defines, &definer_path, path, relationships::DEFINES, Properties::new(), at);
        }
        Ok(element)
    }

    fn link(
        &mut self,
        id: &str,
        source: &CanonicalPath,
        target: &CanonicalPath,
        name: &str,
        properties: Properties,
        at: DateTime<Utc>,
    ) -> Element {
        let rel_path = CanonicalPath::relationship(id);
        let element = Element::Relationship(Relationship {
            id: id.to_string(),
            name: name.to_string(),
            source: source.clone(),
            target: target.clone(),
            properties,
        });
        self.push_change(&rel_path, Action::Created, element.clone(), at);
        self.outgoing
            .entry(source.clone())
            .or_default()
            .insert(rel_path.clone());
        self.incoming.entry(target.clone()).or_default().insert(rel_path);
        element
    }

    pub fn relate(
        &mut self,
        id: &str,
        source: &CanonicalPath,
        target: &CanonicalPath,
        name: &str,
        properties: Properties,
        at: DateTime<Utc>,
    ) -> BackendResult<Element> {
        if name.is_empty() {
            return Err(BackendError::InvalidArgument(
                "relationship name must not be empty".to_string(),
            ));
        }
        for endpoint in [source, target] {
            if !endpoint.is_defined() || endpoint.segment_type() == Some(SegmentType::Relationship)
            {
                return Err(BackendError::InvalidArgument(format!(
                    "{} cannot be a relationship endpoint",
                    endpoint
                )));
            }
            self.existing_entity(endpoint)?;
        }
        let rel_path = CanonicalPath::relationship(id);
        if self.latest(&rel_path).is_some() {
            return Err(BackendError::AlreadyExists(rel_path));
        }
        Ok(self.link(id, source, target, name, properties, at))
    }

    pub fn update(
        &mut self,
        path: &CanonicalPath,
        update: &Update,
        data_key: Uuid,
        at: DateTime<Utc>,
    ) -> BackendResult<Element> {
        let mut element = self.existing_entity(path)?.clone();
        element.apply(update)?;

        let hash = identity_hash(&element);
        self.push_change(path, Action::Updated, element.clone(), at);
        if let Some(record) = self.records.get_mut(path) {
            if hash.is_some() {
                record.identity_hash = hash;
            }
            if let Element::DataEntity(data) = &element {
                if let Some(old) = record.data_key.replace(data_key) {
                    self.data.remove(&old);
                }
                self.data.insert(data_key, data.value.clone());
            }
        }
        Ok(element)
    }

    pub fn update_identity_hash(
        &mut self,
        path: &CanonicalPath,
        hash: &str,
        at: DateTime<Utc>,
    ) -> BackendResult<()> {
        let element = self.existing_entity(path)?.clone();
        self.push_change(path, Action::IdentityHashChanged, element, at);
        if let Some(record) = self.records.get_mut(path) {
            record.identity_hash = Some(hash.to_string());
        }
        Ok(())
    }

    /// Delete an element and the relationships incident to it
    pub fn delete(&mut self, path: &CanonicalPath, at: DateTime<Utc>) -> BackendResult<()> {
        let element = self.existing_entity(path)?.clone();
        let now = Discriminator::time(at);
        let incident: Vec<(CanonicalPath, Element)> = if element.is_relationship() {
            Vec::new()
        } else {
            self.relationships(path, Direction::Both, &now)
                .into_iter()
                .map(|(rel_path, rel)| (rel_path.clone(), Element::Relationship(rel.clone())))
                .collect()
        };

        for (rel_path, rel) in incident {
            self.push_change(&rel_path, Action::Deleted, rel, at);
        }
        self.push_change(path, Action::Deleted, element, at);
        if let Some(key) = self.records.get_mut(path).and_then(|r| r.data_key.take()) {
            self.data.remove(&key);
        }
        Ok(())
    }
}

/// The other end(s) of a relationship seen from `from`
pub(crate) fn other_ends(rel: &Relationship, from: &CanonicalPath, direction: Direction) -> Vec<CanonicalPath> {
    match direction {
        Direction::Outgoing => vec![rel.target.clone()],
        Direction::Incoming => vec![rel.source.clone()],
        Direction::Both => {
            let mut ends = Vec::with_capacity(1);
            if &rel.source == from {
                ends.push(rel.target.clone());
            }
            if &rel.target == from {
                ends.push(rel.source.clone());
            }
            ends
        }
    }
}
