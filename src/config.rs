// Copyright (c) 2025 - Cowboy AI, Inc.
//! Configuration
//!
//! Backends receive an opaque [`Configuration`] map. Each [`Property`] is
//! looked up with this precedence:
//!
//! ```text
//! programmatic override  >  environment variable  >  map value  >  default
//! ```
//!
//! [`InventoryConfig`] is the typed view the inventory itself uses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{InventoryError, InventoryResult};

/// A named configuration property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property {
    pub name: &'static str,
    /// Environment variables consulted in order
    pub env_vars: &'static [&'static str],
    pub default: Option<&'static str>,
}

/// Properties understood by the inventory
pub mod properties {
    use super::Property;

    pub const TRANSACTION_RETRIES: Property = Property {
        name: "inventory.transaction.retries",
        env_vars: &["INVENTORY_TRANSACTION_RETRIES"],
        default: Some("5"),
    };

    pub const RETRY_BACKOFF_MS: Property = Property {
        name: "inventory.transaction.retry-backoff-ms",
        env_vars: &["INVENTORY_TRANSACTION_RETRY_BACKOFF_MS"],
        default: Some("50"),
    };

    pub const NOTIFICATION_BUFFER: Property = Property {
        name: "inventory.notification.buffer",
        env_vars: &["INVENTORY_NOTIFICATION_BUFFER"],
        default: Some("1024"),
    };

    pub const BACKEND: Property = Property {
        name: "inventory.backend",
        env_vars: &["INVENTORY_BACKEND"],
        default: Some("memory"),
    };

    /// Memory backend clock, read from the `backend.memory` scope:
    /// `system` or an RFC 3339 instant for a fixed manual clock
    pub const MEMORY_CLOCK: Property = Property {
        name: "clock",
        env_vars: &["INVENTORY_MEMORY_CLOCK"],
        default: None,
    };
}

/// Opaque property map handed to backends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    values: BTreeMap<String, String>,
    #[serde(default)]
    overrides: BTreeMap<String, String>,
    /// Environment snapshot; the process environment when `None`
    #[serde(skip)]
    environment: Option<BTreeMap<String, String>>,
}

impl Configuration {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self {
            values,
            ..Default::default()
        }
    }

    /// Set a value that wins over every other source
    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// Read environment variables from `environment` instead of the process
    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = Some(environment);
        self
    }

    fn env(&self, name: &str) -> Option<String> {
        match &self.environment {
            Some(snapshot) => snapshot.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }

    /// Raw value of a property
    pub fn get(&self, property: &Property) -> Option<String> {
        self.overrides
            .get(property.name)
            .cloned()
            .or_else(|| property.env_vars.iter().find_map(|var| self.env(var)))
            .or_else(|| self.values.get(property.name).cloned())
            .or_else(|| property.default.map(str::to_string))
    }

    /// Parsed value of a property
    pub fn parse<T>(&self, property: &Property) -> InventoryResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(property)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| {
                    InventoryError::Configuration(format!("{}={}: {}", property.name, raw, e))
                })
            })
            .transpose()
    }

    /// The sub-map under `prefix.`, with the prefix stripped
    ///
    /// Overrides are scoped the same way; the environment source is shared.
    pub fn prefixed(&self, prefix: &str) -> Configuration {
        let scope = |map: &BTreeMap<String, String>| -> BTreeMap<String, String> {
            let dotted = format!("{}.", prefix);
            map.iter()
                .filter_map(|(k, v)| k.strip_prefix(&dotted).map(|rest| (rest.to_string(), v.clone())))
                .collect()
        };
        Configuration {
            values: scope(&self.values),
            overrides: scope(&self.overrides),
            environment: self.environment.clone(),
        }
    }

    /// All map values (overrides and environment not applied)
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

/// Typed inventory settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Extra attempts for a unit of work whose commit fails
    pub transaction_retries: u32,
    pub retry_backoff: Duration,
    /// Capacity of channel-backed notification sinks
    pub notification_buffer: usize,
    /// Storage engine to build; its settings live under `backend.{name}`
    pub backend: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            transaction_retries: 5,
            retry_backoff: Duration::from_millis(50),
            notification_buffer: 1024,
            backend: "memory".to_string(),
        }
    }
}

impl InventoryConfig {
    /// Read every setting, falling back to the defaults
    pub fn from_configuration(config: &Configuration) -> InventoryResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            transaction_retries: config
                .parse(&properties::TRANSACTION_RETRIES)?
                .unwrap_or(defaults.transaction_retries),
            retry_backoff: config
                .parse::<u64>(&properties::RETRY_BACKOFF_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
            notification_buffer: config
                .parse(&properties::NOTIFICATION_BUFFER)?
                .unwrap_or(defaults.notification_buffer),
            backend: config.get(&properties::BACKEND).unwrap_or(defaults.backend),
        })
    }

    pub fn with_transaction_retries(mut self, retries: u32) -> Self {
        self.transaction_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_notification_buffer(mut self, buffer: usize) -> Self {
        self.notification_buffer = buffer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_precedence() {
        let config = Configuration::new(map(&[("inventory.transaction.retries", "3")]))
            .with_environment(BTreeMap::new());
        assert_eq!(config.get(&properties::TRANSACTION_RETRIES).as_deref(), Some("3"));

        let config = config.with_environment(map(&[("INVENTORY_TRANSACTION_RETRIES", "7")]));
        assert_eq!(config.get(&properties::TRANSACTION_RETRIES).as_deref(), Some("7"));

        let config = config.with_override("inventory.transaction.retries", "9");
        assert_eq!(config.get(&properties::TRANSACTION_RETRIES).as_deref(), Some("9"));
    }

    #[test]
    fn test_defaults() {
        let config = Configuration::default().with_environment(BTreeMap::new());
        assert_eq!(
            InventoryConfig::from_configuration(&config).unwrap(),
            InventoryConfig::default()
        );
    }

    #[test]
    fn test_invalid_value() {
        let config = Configuration::new(map(&[("inventory.notification.buffer", "lots")]))
            .with_environment(BTreeMap::new());
        assert!(matches!(
            InventoryConfig::from_configuration(&config),
            Err(InventoryError::Configuration(_))
        ));
    }

    #[test]
    fn test_prefixed() {
        let config = Configuration::new(map(&[
            ("backend.memory.history", "true"),
            ("backend.sql.url", "postgres://"),
            ("inventory.backend", "memory"),
        ]));
        let memory = config.prefixed("backend.memory");
        assert_eq!(memory.values(), &map(&[("history", "true")]));
    }
}
