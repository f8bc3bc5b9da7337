// Copyright (c) 2025 - Cowboy AI, Inc.
//! Repository - one entity kind under one parent
//!
//! A `Repository<B, K>` resolves ids of kind `K` against its parent path
//! and runs every operation as its own unit of work through
//! [`Inventory::in_transaction`].
//!
//! # Notifications
//!
//! | Operation | Queued |
//! |---|---|
//! | `create` | the entity, then the `contains`/`defines` edges pointing at it |
//! | `update` | `updated`, plus `identity_hash_changed` when the hash moved |
//! | `delete` | every deleted relationship and entity, deepest first |
//! | `relate_to` / `unrelate` | the relationship |

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::debug;

use super::kind::{EntityKind, HasChildren, HasRelationships};
use super::{current, to_element, Inventory};
use crate::backend::{Backend, ConvertTarget, Direction, Transaction};
use crate::errors::{BackendError, BackendResult, InventoryError, InventoryResult};
use crate::model::{relationships, Action, Element, Properties, Relationship};
use crate::notification::Notification;
use crate::path::{CanonicalPath, SegmentType};
use crate::query::{Filter, Page, Pager, Query, Related};
use crate::temporal::{Discriminator, EntityHistory};

/// Entities of kind `K` directly under one parent
pub struct Repository<B: Backend, K: EntityKind> {
    inventory: Inventory<B>,
    /// `None` for tenants, which live at the root
    parent: Option<CanonicalPath>,
    /// Fixed read instant; `None` reads the present
    as_of: Option<Discriminator>,
    kind: PhantomData<fn() -> K>,
}

impl<B: Backend, K: EntityKind> Clone for Repository<B, K> {
    fn clone(&self) -> Self {
        Self {
            inventory: self.inventory.clone(),
            parent: self.parent.clone(),
            as_of: self.as_of,
            kind: PhantomData,
        }
    }
}

/// Typed entity of kind `K` from a native element
async fn typed<B: Backend, K: EntityKind>(
    backend: &B,
    tx: &Transaction,
    native: &B::Element,
) -> BackendResult<K::Entity> {
    let element = backend
        .convert(tx, native, ConvertTarget::Entity(K::SEGMENT_TYPE))
        .await?;
    K::Entity::try_from(element).map_err(|other| {
        BackendError::InvalidArgument(format!(
            "{} is not a {}",
            other.path(),
            K::SEGMENT_TYPE.display_name()
        ))
    })
}

impl<B: Backend, K: EntityKind> Repository<B, K> {
    pub(crate) fn new(inventory: Inventory<B>, parent: Option<CanonicalPath>) -> Self {
        Self {
            inventory,
            parent,
            as_of: None,
            kind: PhantomData,
        }
    }

    pub fn parent(&self) -> Option<&CanonicalPath> {
        self.parent.as_ref()
    }

    /// Read as of `discriminator` instead of the present
    ///
    /// Writes always apply to the present.
    pub fn at(mut self, discriminator: Discriminator) -> Self {
        self.as_of = Some(discriminator);
        self
    }

    /// Canonical path of the entity with `id`
    pub fn path_of(&self, id: &str) -> InventoryResult<CanonicalPath> {
        match &self.parent {
            Some(parent) => Ok(parent.extend(K::SEGMENT_TYPE, id)?),
            None if K::SEGMENT_TYPE == SegmentType::Tenant => Ok(CanonicalPath::tenant(id)),
            None => Err(InventoryError::InvalidArgument(format!(
                "a {} needs a parent",
                K::SEGMENT_TYPE.display_name()
            ))),
        }
    }

    fn read_at(&self) -> Discriminator {
        self.as_of.unwrap_or_else(|| self.inventory.now())
    }

    /// Repository of the `C` children of the entity with `id`
    pub fn children<C: EntityKind>(&self, id: &str) -> InventoryResult<Repository<B, C>>
    where
        K: HasChildren<C>,
    {
        let mut children = Repository::new(self.inventory.clone(), Some(self.path_of(id)?));
        children.as_of = self.as_of;
        Ok(children)
    }

    /// The entity with `id`
    ///
    /// # Errors
    ///
    /// - `EntityNotFound` if there is none at the read instant
    pub async fn get(&self, id: &str) -> InventoryResult<K::Entity> {
        let path = self.path_of(id)?;
        let at = self.read_at();
        self.inventory
            .in_transaction(false, move |backend, tx| {
                let path = path.clone();
                Box::pin(async move {
                    let native = backend.find(tx, &at, &path).await?;
                    typed::<B, K>(backend, tx, &native).await
                })
            })
            .await
    }

    /// Query selecting every `K` under the parent, then any of `filters`
    fn query(&self, filters: &[Vec<Filter>]) -> Query {
        let builder = match &self.parent {
            Some(parent) => Query::path()
                .with([Filter::path(parent.clone())])
                .with([Filter::from(Related::contains())]),
            None => Query::path(),
        };
        builder
            .filter()
            .with([Filter::of_type(K::SEGMENT_TYPE)])
            .alternatives(filters)
            .build()
    }

    /// Entities matching any of the filter groups; all of them when
    /// `filters` is empty
    ///
    /// # Arguments
    ///
    /// * `filters` - Alternative filter groups; an entity is returned if it
    ///   matches every filter of at least one group
    /// * `pager` - Page, applied after filtering
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let eu_or_web = resources
    ///     .get_all(
    ///         &[vec![Filter::property("zone", "eu")], vec![Filter::name("web")]],
    ///         &Pager::page(0, 20),
    ///     )
    ///     .await?;
    /// ```
    pub async fn get_all(
        &self,
        filters: &[Vec<Filter>],
        pager: &Pager,
    ) -> InventoryResult<Page<K::Entity>> {
        let query = self.query(filters);
        let parent = self.parent.clone();
        let pager = pager.clone();
        let at = self.read_at();
        self.inventory
            .in_transaction(false, move |backend, tx| {
                let (query, pager, parent) = (query.clone(), pager.clone(), parent.clone());
                Box::pin(async move {
                    if let Some(parent) = &parent {
                        backend.find(tx, &at, parent).await?;
                    }
                    backend
                        .query_with(
                            tx,
                            &at,
                            &query,
                            &pager,
                            |element| K::Entity::try_from(element).ok(),
                            |_: &K::Entity| true,
                        )
                        .await
                })
            })
            .await
    }

    /// Create an entity under the parent
    ///
    /// # Errors
    ///
    /// - `EntityAlreadyExists` if the id is taken
    /// - `EntityNotFound` if the parent or a referenced type is missing
    pub async fn create(&self, blueprint: K::Blueprint) -> InventoryResult<K::Entity> {
        let blueprint = K::blueprint(blueprint);
        let path = self.path_of(blueprint.id())?;
        let clock = self.inventory.clock();
        let entity = self
            .inventory
            .in_transaction(true, move |backend, tx| {
                let (path, blueprint, clock) = (path.clone(), blueprint.clone(), clock.clone());
                Box::pin(async move {
                    let native = backend.persist(tx, &path, &blueprint).await?;
                    let entity = typed::<B, K>(backend, tx, &native).await?;
                    tx.add_notification(Notification::new(Action::Created, entity.clone().into()));

                    let now = current(clock.as_ref());
                    for edge in backend
                        .get_relationships(tx, &now, &native, Direction::Incoming, &[])
                        .await?
                    {
                        let element = to_element(backend, tx, &edge).await?;
                        tx.add_notification(Notification::new(Action::Created, element));
                    }
                    Ok(entity)
                })
            })
            .await?;
        debug!(kind = %K::SEGMENT_TYPE, "Entity created");
        Ok(entity)
    }

    /// Modify the entity with `id`
    pub async fn update(&self, id: &str, update: K::Update) -> InventoryResult<K::Entity> {
        let path = self.path_of(id)?;
        let update = K::update(update);
        let clock = self.inventory.clock();
        self.inventory
            .in_transaction(true, move |backend, tx| {
                let (path, update, clock) = (path.clone(), update.clone(), clock.clone());
                Box::pin(async move {
                    let now = current(clock.as_ref());
                    let native = backend.find(tx, &now, &path).await?;
                    let before = backend.extract_identity_hash(&native);

                    let updated = backend.update(tx, &native, &update).await?;
                    let entity = typed::<B, K>(backend, tx, &updated).await?;
                    let element: Element = entity.clone().into();
                    tx.add_notification(Notification::new(Action::Updated, element.clone()));
                    if backend.extract_identity_hash(&updated) != before {
                        tx.add_notification(Notification::new(Action::IdentityHashChanged, element));
                    }
                    Ok(entity)
                })
            })
            .await
    }

    /// Overwrite the identity hash of the entity with `id`
    pub async fn set_identity_hash(&self, id: &str, hash: &str) -> InventoryResult<()> {
        let path = self.path_of(id)?;
        let hash = hash.to_string();
        let clock = self.inventory.clock();
        self.inventory
            .in_transaction(true, move |backend, tx| {
                let (path, hash, clock) = (path.clone(), hash.clone(), clock.clone());
                Box::pin(async move {
                    let now = current(clock.as_ref());
                    let native = backend.find(tx, &now, &path).await?;
                    backend.update_identity_hash(tx, &native, hash).await?;
                    let element = typed::<B, K>(backend, tx, &native).await?.into();
                    tx.add_notification(Notification::new(Action::IdentityHashChanged, element));
                    Ok(())
                })
            })
            .await
    }

    /// Delete the entity with `id` and everything it contains
    ///
    /// Relationships touching any deleted entity go with it.
    pub async fn delete(&self, id: &str) -> InventoryResult<()> {
        let path = self.path_of(id)?;
        let clock = self.inventory.clock();
        self.inventory
            .in_transaction(true, move |backend, tx| {
                let (path, clock) = (path.clone(), clock.clone());
                Box::pin(async move {
                    let now = current(clock.as_ref());
                    let root = backend.find(tx, &now, &path).await?;
                    let subtree: Vec<B::Element> = backend
                        .get_transitive_closure_over(
                            tx,
                            &now,
                            &root,
                            Direction::Outgoing,
                            &[relationships::CONTAINS],
                        )
                        .await?
                        .collect();

                    let mut gone = HashSet::new();
                    for native in subtree.iter().rev() {
                        for edge in backend
                            .get_relationships(tx, &now, native, Direction::Both, &[])
                            .await?
                        {
                            if gone.insert(backend.extract_canonical_path(&edge)) {
                                let element = to_element(backend, tx, &edge).await?;
                                tx.add_notification(Notification::new(Action::Deleted, element));
                            }
                        }
                        let element = to_element(backend, tx, native).await?;
                        backend.delete(tx, native).await?;
                        tx.add_notification(Notification::new(Action::Deleted, element));
                    }
                    debug!(path = %path, count = subtree.len(), "Subtree deleted");
                    Ok(())
                })
            })
            .await
    }

    /// Changes of the entity with `id` within `(from, to]`
    ///
    /// The entity is looked up at `to`, then at `from`, then in the
    /// present, so entities deleted since still have a history.
    pub async fn history(
        &self,
        id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> InventoryResult<EntityHistory<Element>> {
        let path = self.path_of(id)?;
        let present = self.inventory.now();
        self.inventory
            .in_transaction(false, move |backend, tx| {
                let path = path.clone();
                Box::pin(async move {
                    let mut last_err = None;
                    for at in [Discriminator::time(to), Discriminator::time(from), present] {
                        match backend.find(tx, &at, &path).await {
                            Ok(native) => return backend.history(tx, &native, from, to).await,
                            Err(err) if err.is_not_found() => last_err = Some(err),
                            Err(err) => return Err(err),
                        }
                    }
                    Err(last_err.unwrap_or_else(|| BackendError::entity_not_found(&path)))
                })
            })
            .await
    }
}

impl<B: Backend, K: HasRelationships> Repository<B, K> {
    /// Relationships of the entity with `id`; any name when `names` is
    /// empty
    pub async fn relationships(
        &self,
        id: &str,
        direction: Direction,
        names: &[&str],
    ) -> InventoryResult<Vec<Relationship>> {
        let path = self.path_of(id)?;
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let at = self.read_at();
        self.inventory
            .in_transaction(false, move |backend, tx| {
                let (path, names) = (path.clone(), names.clone());
                Box::pin(async move {
                    let names: Vec<&str> = names.iter().map(String::as_str).collect();
                    let native = backend.find(tx, &at, &path).await?;
                    let mut found = Vec::new();
                    for edge in backend
                        .get_relationships(tx, &at, &native, direction, &names)
                        .await?
                    {
                        let element = backend
                            .convert(tx, &edge, ConvertTarget::Entity(SegmentType::Relationship))
                            .await?;
                        if let Ok(rel) = Relationship::try_from(element) {
                            found.push(rel);
                        }
                    }
                    Ok(found)
                })
            })
            .await
    }

    /// Relate the entity with `id` to `target`
    ///
    /// # Errors
    ///
    /// - `EntityNotFound` if either end is missing
    /// - `InvalidArgument` if `target` is a relationship or `name` is empty
    pub async fn relate_to(
        &self,
        id: &str,
        target: &CanonicalPath,
        name: &str,
        properties: Properties,
    ) -> InventoryResult<Relationship> {
        let source = self.path_of(id)?;
        let target = target.clone();
        let name = name.to_string();
        let clock = self.inventory.clock();
        self.inventory
            .in_transaction(true, move |backend, tx| {
                let (source, target, name) = (source.clone(), target.clone(), name.clone());
                let (properties, clock) = (properties.clone(), clock.clone());
                Box::pin(async move {
                    let now = current(clock.as_ref());
                    let from = backend.find(tx, &now, &source).await?;
                    let to = backend.find(tx, &now, &target).await?;
                    let edge = backend.relate(tx, &from, &to, &name, properties).await?;
                    let element = backend
                        .convert(tx, &edge, ConvertTarget::Entity(SegmentType::Relationship))
                        .await?;
                    tx.add_notification(Notification::new(Action::Created, element.clone()));
                    Relationship::try_from(element).map_err(|other| {
                        BackendError::InvalidArgument(format!("{} is not a relationship", other.path()))
                    })
                })
            })
            .await
    }

    /// Delete one relationship of the entity with `id`
    ///
    /// # Errors
    ///
    /// - `RelationNotFound` if there is no such relationship
    /// - `InvalidArgument` if the relationship does not touch the entity
    pub async fn unrelate(&self, id: &str, relationship_id: &str) -> InventoryResult<()> {
        let entity = self.path_of(id)?;
        let rel_path = CanonicalPath::relationship(relationship_id);
        let clock = self.inventory.clock();
        self.inventory
            .in_transaction(true, move |backend, tx| {
                let (entity, rel_path, clock) = (entity.clone(), rel_path.clone(), clock.clone());
                Box::pin(async move {
                    let now = current(clock.as_ref());
                    let edge = backend.find(tx, &now, &rel_path).await?;
                    let element = to_element(backend, tx, &edge).await?;
                    let touches = match &element {
                        Element::Relationship(rel) => rel.source == entity || rel.target == entity,
                        _ => false,
                    };
                    if !touches {
                        return Err(BackendError::InvalidArgument(format!(
                            "{} does not touch {}",
                            rel_path, entity
                        )));
                    }
                    backend.delete(tx, &edge).await?;
                    tx.add_notification(Notification::new(Action::Deleted, element));
                    Ok(())
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryBackend;
    use crate::api::{Environments, Resources, ResourceTypes};
    use crate::model::{EntityBlueprint, EntityUpdate, ResourceBlueprint};
    use crate::notification::CollectingSink;
    use crate::temporal::{Clock, ManualClock};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    async fn seeded() -> (Inventory<MemoryBackend>, CollectingSink, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        let sink = CollectingSink::new();
        let inventory = Inventory::new(MemoryBackend::with_clock(clock.clone()))
            .with_sink(sink.clone());

        inventory.tenants().create(EntityBlueprint::new("acme")).await.unwrap();
        clock.advance(Duration::milliseconds(10));
        let tenants = inventory.tenants();
        tenants
            .children::<Environments>("acme")
            .unwrap()
            .create(EntityBlueprint::new("prod"))
            .await
            .unwrap();
        tenants
            .children::<ResourceTypes>("acme")
            .unwrap()
            .create(EntityBlueprint::new("host"))
            .await
            .unwrap();
        clock.advance(Duration::milliseconds(10));
        sink.take().await;
        (inventory, sink, clock)
    }

    fn resources(inventory: &Inventory<MemoryBackend>) -> Repository<MemoryBackend, Resources> {
        inventory
            .tenants()
            .children::<Environments>("acme")
            .unwrap()
            .children::<Resources>("prod")
            .unwrap()
    }

    fn host(id: &str) -> ResourceBlueprint {
        ResourceBlueprint {
            entity: EntityBlueprint::new(id),
            resource_type: CanonicalPath::parse("/t;acme/rt;host").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_notifies_entity_then_edges() {
        let (inventory, sink, _) = seeded().await;
        resources(&inventory).create(host("web01")).await.unwrap();

        let delivered = sink.take().await;
        let actions: Vec<Action> = delivered.iter().map(|n| n.action).collect();
        assert_eq!(actions, vec![Action::Created; 3]);
        assert_eq!(delivered[0].path.to_string(), "/t;acme/e;prod/r;web01");
        let names: HashSet<&str> = delivered[1..]
            .iter()
            .filter_map(|n| n.element.name())
            .collect();
        assert_eq!(names, HashSet::from(["contains", "defines"]));
    }

    #[tokio::test]
    async fn test_duplicate_create_is_already_exists() {
        let (inventory, _, _) = seeded().await;
        let repo = resources(&inventory);
        repo.create(host("web01")).await.unwrap();
        let err = repo.create(host("web01")).await.unwrap_err();
        assert!(matches!(err, InventoryError::EntityAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_deepest_first() {
        let (inventory, sink, clock) = seeded().await;
        let repo = resources(&inventory);
        repo.create(host("web01")).await.unwrap();
        repo.children::<Resources>("web01")
            .unwrap()
            .create(host("nic0"))
            .await
            .unwrap();
        clock.advance(Duration::milliseconds(10));
        sink.take().await;

        repo.delete("web01").await.unwrap();
        let deleted: Vec<String> = sink
            .take()
            .await
            .into_iter()
            .filter(|n| !n.element.is_relationship())
            .map(|n| n.path.to_string())
            .collect();
        assert_eq!(
            deleted,
            vec!["/t;acme/e;prod/r;web01/r;nic0", "/t;acme/e;prod/r;web01"]
        );

        clock.advance(Duration::milliseconds(10));
        let err = repo
            .children::<Resources>("web01")
            .unwrap()
            .get("nic0")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_and_history() {
        let (inventory, _, clock) = seeded().await;
        let environments = inventory.tenants().children::<Environments>("acme").unwrap();
        let created_at = clock.now() - Duration::milliseconds(10);

        environments
            .update(
                "prod",
                EntityUpdate {
                    name: Some("Production".to_string()),
                    properties: None,
                },
            )
            .await
            .unwrap();
        clock.advance(Duration::milliseconds(10));

        let history = environments
            .history("prod", created_at - Duration::milliseconds(1), clock.now())
            .await
            .unwrap();
        let actions: Vec<Action> = history.changes().iter().map(|c| c.action).collect();
        assert_eq!(actions, vec![Action::Created, Action::Updated]);

        let before = environments
            .clone()
            .at(Discriminator::time(created_at))
            .get("prod")
            .await
            .unwrap();
        assert_eq!(before.name, None);
        assert_eq!(environments.get("prod").await.unwrap().name.as_deref(), Some("Production"));
    }

    #[tokio::test]
    async fn test_relate_and_unrelate() {
        let (inventory, sink, clock) = seeded().await;
        let repo = resources(&inventory);
        repo.create(host("web01")).await.unwrap();
        repo.create(host("db01")).await.unwrap();
        clock.advance(Duration::milliseconds(10));
        sink.take().await;

        let db = repo.path_of("db01").unwrap();
        let rel = repo
            .relate_to("web01", &db, "dependsOn", Properties::new())
            .await
            .unwrap();
        clock.advance(Duration::milliseconds(10));

        let outgoing = repo
            .relationships("web01", Direction::Outgoing, &["dependsOn"])
            .await
            .unwrap();
        assert_eq!(outgoing, vec![rel.clone()]);

        let err = repo.unrelate("web01", "missing").await.unwrap_err();
        assert!(err.is_not_found());

        repo.unrelate("db01", &rel.id).await.unwrap();
        clock.advance(Duration::milliseconds(10));
        assert!(repo
            .relationships("web01", Direction::Outgoing, &["dependsOn"])
            .await
            .unwrap()
            .is_empty());

        let actions: Vec<Action> = sink.take().await.iter().map(|n| n.action).collect();
        assert_eq!(actions, vec![Action::Created, Action::Deleted]);
    }

    #[tokio::test]
    async fn test_get_all_with_alternatives_and_paging() {
        let (inventory, _, _) = seeded().await;
        let repo = resources(&inventory);
        for id in ["a", "b", "c", "d"] {
            repo.create(host(id)).await.unwrap();
        }

        let page = repo
            .get_all(&[vec![Filter::id("a")], vec![Filter::id("c")]], &Pager::page(0, 1))
            .await
            .unwrap();
        assert_eq!(page.total_size(), 2);
        let ids: Vec<String> = page.map(|r| r.id).collect();
        assert_eq!(ids, vec!["a".to_string()]);

        let all = repo.get_all(&[], &Pager::unlimited()).await.unwrap();
        assert_eq!(all.total_size(), 4);
    }

    #[tokio::test]
    async fn test_missing_parent_is_not_found() {
        let (inventory, _, _) = seeded().await;
        let orphans = inventory
            .tenants()
            .children::<Environments>("nobody")
            .unwrap();
        let err = orphans.get_all(&[], &Pager::unlimited()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
