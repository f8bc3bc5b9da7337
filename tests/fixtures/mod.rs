// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-inventory
//!
//! Provides a deterministic inventory for integration tests.
//!
//! # Design Principles
//! - All time comes from one [`ManualClock`] shared by the backend and the
//!   inventory (no `Utc::now()`)
//! - The clock only moves when a test calls [`TestInventory::tick`]
//! - Notifications are collected so tests can assert on delivery order

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use cim_inventory::adapters::MemoryBackend;
use cim_inventory::api::{Environments, Inventory, Repository, ResourceTypes, Resources};
use cim_inventory::model::{EntityBlueprint, ResourceBlueprint};
use cim_inventory::notification::CollectingSink;
use cim_inventory::path::CanonicalPath;
use cim_inventory::temporal::{Clock, ManualClock};

// Fixed start timestamp (2026-01-19T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

pub const TENANT: &str = "acme";
pub const ENVIRONMENT: &str = "prod";
pub const RESOURCE_TYPE: &str = "host";

/// Parse the fixed timestamp
pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

/// Inventory over a memory backend with a controllable clock
pub struct TestInventory {
    pub inventory: Inventory<MemoryBackend>,
    pub sink: CollectingSink,
    pub clock: Arc<ManualClock>,
}

impl TestInventory {
    /// Empty inventory at [`fixed_timestamp`]
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(fixed_timestamp()));
        let sink = CollectingSink::new();
        let inventory = Inventory::new(MemoryBackend::with_clock(clock.clone()))
            .with_sink(sink.clone());
        Self {
            inventory,
            sink,
            clock,
        }
    }

    /// Inventory holding `/t;acme`, `/t;acme/e;prod` and `/t;acme/rt;host`
    ///
    /// The clock is moved past the seeding and the seeding notifications
    /// are discarded.
    pub async fn seeded() -> Self {
        let fixture = Self::new();
        let tenants = fixture.inventory.tenants();
        tenants
            .create(EntityBlueprint::new(TENANT))
            .await
            .expect("seed tenant");
        fixture.tick();
        tenants
            .children::<Environments>(TENANT)
            .expect("environments")
            .create(EntityBlueprint::new(ENVIRONMENT))
            .await
            .expect("seed environment");
        tenants
            .children::<ResourceTypes>(TENANT)
            .expect("resource types")
            .create(EntityBlueprint::new(RESOURCE_TYPE))
            .await
            .expect("seed resource type");
        fixture.tick();
        fixture.sink.take().await;
        fixture
    }

    /// Advance the clock by 10ms
    pub fn tick(&self) {
        self.clock.advance(Duration::milliseconds(10));
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Resources directly under `/t;acme/e;prod`
    pub fn resources(&self) -> Repository<MemoryBackend, Resources> {
        self.inventory
            .tenants()
            .children::<Environments>(TENANT)
            .expect("environments")
            .children::<Resources>(ENVIRONMENT)
            .expect("resources")
    }
}

pub fn environment_path() -> CanonicalPath {
    CanonicalPath::parse("/t;acme/e;prod").expect("Invalid path in test fixture")
}

pub fn resource_type_path() -> CanonicalPath {
    CanonicalPath::parse("/t;acme/rt;host").expect("Invalid path in test fixture")
}

/// Blueprint of a host resource
pub fn host(id: &str) -> ResourceBlueprint {
    ResourceBlueprint {
        entity: EntityBlueprint::new(id),
        resource_type: resource_type_path(),
    }
}

/// Blueprint of a host resource with one property
pub fn host_with(id: &str, key: &str, value: &str) -> ResourceBlueprint {
    ResourceBlueprint {
        entity: EntityBlueprint::new(id).with_property(key, value),
        resource_type: resource_type_path(),
    }
}
