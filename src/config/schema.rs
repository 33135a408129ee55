//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the forwarding proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, request budget).
    pub listener: ListenerConfig,

    /// Worker pool sizing.
    pub pool: PoolConfig,

    /// Filter policy source.
    pub filter: FilterConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Connections to accept before the proxy stops accepting, drains and exits.
    pub max_requests: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_requests: 100,
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { size: 4 }
    }
}

/// Filter policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Path to the policy file: one hostname or `ip[/mask]` per line.
    pub path: PathBuf,

    /// Reload the policy when the file changes.
    pub watch: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("filter.txt"),
            watch: false,
        }
    }
}

/// Timeout configuration for socket operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Receive timeout while reading the client's request head, in seconds.
    pub client_read_secs: u64,

    /// Destination connect timeout in seconds. Unset means block until the OS gives up.
    pub upstream_connect_secs: Option<u64>,

    /// Destination read/write timeout in seconds. Unset means no timeout.
    pub upstream_io_secs: Option<u64>,
}

impl TimeoutConfig {
    pub fn client_read(&self) -> Duration {
        Duration::from_secs(self.client_read_secs)
    }

    pub fn upstream_connect(&self) -> Option<Duration> {
        self.upstream_connect_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn upstream_io(&self) -> Option<Duration> {
        self.upstream_io_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            client_read_secs: 5,
            upstream_connect_secs: None,
            upstream_io_secs: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
