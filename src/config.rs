// src/config.rs

//! Manages server configuration: loading from TOML, applying defaults, and validation.

use crate::core::persistence::writer::DEFAULT_QUEUE_CAPACITY;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use tracing::warn;

/// Which persistence gateway the server writes through to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Keep everything in process. State does not survive a restart.
    #[default]
    Memory,
    /// A Redis-compatible server reached over RESP.
    Resp,
}

/// Settings for the leaderboards themselves.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RankConfig {
    /// The inclusive `[min, max]` range of rank types the service accepts.
    #[serde(default = "default_type_range")]
    pub type_range: [i32; 2],
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            type_range: default_type_range(),
        }
    }
}

impl RankConfig {
    pub fn type_range(&self) -> RangeInclusive<i32> {
        self.type_range[0]..=self.type_range[1]
    }
}

fn default_type_range() -> [i32; 2] {
    [1, 100]
}

/// Settings for the persistence gateway and the write-through queue.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// `host:port` of the store when `backend = "resp"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// The number of writes that may be pending before new ones are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            address: None,
            password: None,
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

/// Configuration for the Prometheus metrics endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsConfig {
    /// If true, `/metrics` is served next to the rank API.
    #[serde(default)]
    pub enabled: bool,
}

/// The configuration file as written, before defaults are resolved.
#[derive(Deserialize, Debug)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    server_id: Option<String>,
    #[serde(default)]
    rank: RankConfig,
    #[serde(default)]
    persistence: PersistenceConfig,
    #[serde(default)]
    metrics: MetricsConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8090
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_server_id() -> String {
    "rank".to_string()
}

/// Represents the final, validated server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Namespaces the persisted rank type registry of this instance.
    pub server_id: String,
    pub rank: RankConfig,
    pub persistence: PersistenceConfig,
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            server_id: default_server_id(),
            rank: RankConfig::default(),
            persistence: PersistenceConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid configuration in '{path}'"))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(contents).context("Failed to parse TOML")?;

        let server_id = match raw.server_id {
            Some(id) => id,
            None => {
                warn!(
                    "No server_id configured. Using '{}' to namespace the rank type registry.",
                    default_server_id()
                );
                default_server_id()
            }
        };

        let config = Config {
            host: raw.host,
            port: raw.port,
            log_level: raw.log_level,
            server_id,
            rank: raw.rank,
            persistence: raw.persistence,
            metrics: raw.metrics,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.server_id.trim().is_empty() {
            return Err(anyhow!("server_id cannot be empty"));
        }
        let [min, max] = self.rank.type_range;
        if min > max {
            return Err(anyhow!(
                "rank.type_range is empty: min {} is greater than max {}",
                min,
                max
            ));
        }
        if self.persistence.queue_capacity == 0 {
            return Err(anyhow!("persistence.queue_capacity cannot be 0"));
        }
        if self.persistence.backend == StoreBackend::Resp
            && self
                .persistence
                .address
                .as_deref()
                .is_none_or(|a| a.trim().is_empty())
        {
            return Err(anyhow!(
                "persistence.address is required when persistence.backend is \"resp\""
            ));
        }
        if self.persistence.backend == StoreBackend::Memory {
            warn!("Using the in-memory persistence backend. Rankings will not survive a restart.");
        }
        Ok(())
    }
}
