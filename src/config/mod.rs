//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Page requested when the client does not send one
pub const DEFAULT_PAGE_NUMBER: usize = 1;

/// Page size used when the client does not send one
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Largest page size a client may request
pub const MAX_PAGE_LIMIT: usize = 100;

/// How long a mutation waits for a row lock before giving up
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(3);

/// Topic receiving `booking_created` notifications
pub const BOOKING_TOPIC: &str = "booking_events";

/// Upper bound on `customer_name`, in characters
pub const CUSTOMER_NAME_MAX_LEN: usize = 100;

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Relational store settings
///
/// When `url` is absent the in-memory store is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

/// Notification broker settings
///
/// When `broker` is absent notifications are only logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    pub broker: Option<String>,
    pub topic: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            broker: None,
            topic: BOOKING_TOPIC.to_string(),
        }
    }
}

/// Row lock settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockingConfig {
    /// Lock wait timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: LOCK_TIMEOUT.as_millis() as u64,
        }
    }
}

/// Listing defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page: usize,
    pub default_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: DEFAULT_PAGE_NUMBER,
            default_size: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Complete configuration for the booking service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub messaging: MessagingConfig,
    pub locking: LockingConfig,
    pub pagination: PaginationConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Override fields from the process environment
    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override fields from an arbitrary key lookup
    ///
    /// Recognised keys: `BOOKING_HOST`, `BOOKING_PORT`, `DATABASE_URL`,
    /// `KAFKA_BROKER`, `KAFKA_BOOKING_TOPIC`, `BOOKING_LOCK_TIMEOUT_MS`,
    /// `BOOKING_PAGE_SIZE`.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("BOOKING_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("BOOKING_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("BOOKING_PORT is not a port number: {port}"))?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(broker) = lookup("KAFKA_BROKER") {
            self.messaging.broker = Some(broker);
        }
        if let Some(topic) = lookup("KAFKA_BOOKING_TOPIC") {
            self.messaging.topic = topic;
        }
        if let Some(timeout) = lookup("BOOKING_LOCK_TIMEOUT_MS") {
            self.locking.timeout_ms = timeout
                .parse()
                .with_context(|| format!("BOOKING_LOCK_TIMEOUT_MS is not an integer: {timeout}"))?;
        }
        if let Some(size) = lookup("BOOKING_PAGE_SIZE") {
            self.pagination.default_size = size
                .parse()
                .with_context(|| format!("BOOKING_PAGE_SIZE is not an integer: {size}"))?;
        }
        Ok(self)
    }

    /// Reject settings the service cannot run with
    ///
    /// The default page size must be a size clients could request
    /// themselves, and the lock wait must be positive.
    pub fn validate(&self) -> Result<()> {
        let size = self.pagination.default_size;
        if !(1..=MAX_PAGE_LIMIT).contains(&size) {
            anyhow::bail!("pagination.default_size must be between 1 and {MAX_PAGE_LIMIT}, got {size}");
        }
        if self.pagination.default_page == 0 {
            anyhow::bail!("pagination.default_page must be at least 1");
        }
        if self.locking.timeout_ms == 0 {
            anyhow::bail!("locking.timeout_ms must be at least 1");
        }
        Ok(())
    }

    /// Lock wait timeout as a [`Duration`]
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.locking.timeout_ms)
    }

    /// `host:port` for the HTTP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Install the global `tracing` subscriber
///
/// Respects `RUST_LOG` and falls back to `info,tower_http=debug`. Calling it
/// more than once is harmless.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
