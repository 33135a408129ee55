//! Per-connection state and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Own everything one request needs (client socket, policy snapshot, request text)
//! - Release it exactly once, whichever pipeline stage the request stopped at
//! - Count live connections so shutdown and tests can observe releases

use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::filter::FilterPolicy;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Counts connections whose context has not been released yet.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Everything one proxied request owns.
///
/// Created by the listener, moved into exactly one work item, and dropped when
/// the pipeline returns. Dropping closes the client socket and frees the
/// request buffers.
#[derive(Debug)]
pub struct ConnectionContext {
    /// Accepted client socket.
    pub client: TcpStream,
    /// This connection's policy snapshot.
    pub policy: FilterPolicy,
    /// Request head bytes, replaced wholesale when rewritten.
    pub request: Vec<u8>,
    /// Host header value as sent.
    pub host_name: Option<String>,
    /// Host with scheme, `www.` and port removed.
    pub clean_host_name: Option<String>,
    /// Destination port.
    pub host_port: Option<u16>,
    guard: ConnectionGuard,
}

impl ConnectionContext {
    /// Fresh context for an accepted client.
    pub fn new(client: TcpStream, policy: FilterPolicy, guard: ConnectionGuard) -> Self {
        Self {
            client,
            policy,
            request: Vec::new(),
            host_name: None,
            clean_host_name: None,
            host_port: None,
            guard,
        }
    }

    /// ID used on every log line for this connection.
    pub fn id(&self) -> ConnectionId {
        self.guard.id()
    }
}

impl Drop for ConnectionContext {
    fn drop(&mut self) {
        tracing::trace!(connection_id = %self.guard.id(), "Connection released");
    }
}
