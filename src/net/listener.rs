//! TCP listener with a fixed request budget.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept up to `max_requests` connections
//! - Wrap each accepted socket in a fresh `ConnectionContext` carrying the
//!   current policy snapshot and hand it to the worker pool
//! - Stop on accept errors or when shutdown is triggered

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use crate::config::ListenerConfig;
use crate::filter::PolicyStore;
use crate::lifecycle::Shutdown;
use crate::net::connection::{ConnectionContext, ConnectionTracker};
use crate::pipeline::Pipeline;
use crate::pool::WorkerPool;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Bind address did not parse.
    Address(std::net::AddrParseError),
    /// Failed to bind to address.
    Bind(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Address(e) => write!(f, "Invalid bind address: {}", e),
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Address(e) => Some(e),
            ListenerError::Bind(e) => Some(e),
        }
    }
}

/// A blocking TCP listener that serves a bounded number of connections.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Connections to accept before `serve` returns.
    max_requests: usize,
    /// Live connection accounting, shared with every context.
    tracker: ConnectionTracker,
}

impl Listener {
    /// Bind to the configured address.
    pub fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(ListenerError::Address)?;

        let listener = TcpListener::bind(addr).map_err(ListenerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            max_requests = config.max_requests,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            max_requests: config.max_requests,
            tracker: ConnectionTracker::new(),
        })
    }

    /// Accept and dispatch connections until the budget is spent, an accept
    /// fails, or `shutdown` fires.
    ///
    /// Returns how many connections were handed to `pool`. Draining the pool
    /// is left to the caller.
    pub fn serve(
        &self,
        pool: &WorkerPool,
        pipeline: &Arc<Pipeline>,
        policies: &PolicyStore,
        shutdown: &Shutdown,
    ) -> usize {
        let mut dispatched = 0;

        while dispatched < self.max_requests && !shutdown.is_triggered() {
            let (stream, peer_addr) = match self.inner.accept() {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::error!(error = %e, dispatched, "Accept failed, no longer accepting");
                    break;
                }
            };

            if shutdown.is_triggered() {
                tracing::debug!(peer_addr = %peer_addr, "Shutdown in progress, dropping connection");
                break;
            }

            let ctx = ConnectionContext::new(stream, policies.snapshot(), self.tracker.track());
            tracing::debug!(
                connection_id = %ctx.id(),
                peer_addr = %peer_addr,
                active = self.tracker.active_count(),
                "Connection accepted"
            );

            let pipeline = Arc::clone(pipeline);
            if !pool.dispatch(move || {
                let _ = pipeline.handle(ctx);
            }) {
                tracing::warn!("Worker pool is draining, no longer accepting");
                break;
            }
            dispatched += 1;
        }

        tracing::info!(dispatched, "Listener stopped accepting");
        dispatched
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Connections accepted but not yet released.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TimeoutConfig;
    use crate::filter::{FilterPolicy, StaticResolver};
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::thread;

    fn local_config(max_requests: usize) -> ListenerConfig {
        ListenerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            max_requests,
        }
    }

    #[test]
    fn rejects_unparsable_address() {
        let config = ListenerConfig {
            bind_address: "localhost".to_string(),
            max_requests: 1,
        };
        assert!(matches!(Listener::bind(&config), Err(ListenerError::Address(_))));
    }

    #[test]
    fn serves_exactly_the_request_budget() {
        let listener = Listener::bind(&local_config(2)).unwrap();
        let addr = listener.local_addr().unwrap();
        let pool = WorkerPool::new(2).unwrap();
        let pipeline = Arc::new(Pipeline::new(
            Arc::new(StaticResolver::new()),
            TimeoutConfig::default(),
        ));
        let policies = PolicyStore::new(FilterPolicy::empty());
        let shutdown = Shutdown::new();

        let clients = thread::spawn(move || {
            (0..2)
                .map(|_| {
                    let mut stream = TcpStream::connect(addr).unwrap();
                    stream.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();
                    let mut response = String::new();
                    stream.read_to_string(&mut response).unwrap();
                    response
                })
                .collect::<Vec<_>>()
        });

        let dispatched = listener.serve(&pool, &pipeline, &policies, &shutdown);
        pool.destroy();

        assert_eq!(dispatched, 2);
        for response in clients.join().unwrap() {
            assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        }
        assert_eq!(listener.tracker().active_count(), 0);
    }

    #[test]
    fn triggered_shutdown_stops_before_accepting() {
        let listener = Listener::bind(&local_config(5)).unwrap();
        let pool = WorkerPool::new(1).unwrap();
        let pipeline = Arc::new(Pipeline::new(
            Arc::new(StaticResolver::new()),
            TimeoutConfig::default(),
        ));
        let policies = PolicyStore::new(FilterPolicy::empty());
        let shutdown = Shutdown::new();
        shutdown.trigger();

        assert_eq!(listener.serve(&pool, &pipeline, &policies, &shutdown), 0);
    }
}
