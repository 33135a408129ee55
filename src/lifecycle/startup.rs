//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start the filter watcher when hot reload is enabled
//! - Bind the listener, serve, then drain the pool
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use notify::RecommendedWatcher;
use thiserror::Error;

use crate::config::watcher::PolicyWatcher;
use crate::config::ProxyConfig;
use crate::filter::{FilterPolicy, PolicyError, PolicyStore, Resolver, SystemResolver};
use crate::lifecycle::{signals, Shutdown};
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError};
use crate::pipeline::Pipeline;
use crate::pool::{PoolError, WorkerPool};

/// Anything that stops the proxy from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("worker pool: {0}")]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("filter watcher: {0}")]
    Watcher(#[from] notify::Error),

    #[error("listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("listener address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// A fully initialized proxy that has not started accepting yet.
pub struct Proxy {
    pool: WorkerPool,
    policies: Arc<PolicyStore>,
    pipeline: Arc<Pipeline>,
    listener: Listener,
    shutdown: Shutdown,
    _watcher: Option<RecommendedWatcher>,
}

impl Proxy {
    /// Start the pool, load the policy and bind, resolving hosts with `resolver`.
    pub fn start(config: &ProxyConfig, resolver: Arc<dyn Resolver>) -> Result<Self, StartupError> {
        let pool = WorkerPool::new(config.pool.size)?;

        let policies = Arc::new(PolicyStore::new(FilterPolicy::load(&config.filter.path)?));
        let watcher = if config.filter.watch {
            let watcher = PolicyWatcher::new(&config.filter.path, Arc::clone(&policies));
            Some(watcher.run()?)
        } else {
            None
        };

        let pipeline = Arc::new(Pipeline::new(resolver, config.timeouts.clone()));
        let listener = Listener::bind(&config.listener)?;

        Ok(Self {
            pool,
            policies,
            pipeline,
            listener,
            shutdown: Shutdown::new(),
            _watcher: watcher,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, StartupError> {
        self.listener.local_addr().map_err(StartupError::LocalAddr)
    }

    /// Handle that stops the accept loop when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Live connection count.
    pub fn tracker(&self) -> ConnectionTracker {
        self.listener.tracker().clone()
    }

    /// Store the accept loop takes policy snapshots from.
    pub fn policies(&self) -> Arc<PolicyStore> {
        Arc::clone(&self.policies)
    }

    /// Serve until the request budget is spent or shutdown fires, then drain
    /// the pool. Returns the number of connections dispatched.
    pub fn run(self) -> usize {
        let dispatched =
            self.listener
                .serve(&self.pool, &self.pipeline, &self.policies, &self.shutdown);
        self.pool.destroy();
        tracing::info!(dispatched, "Shutdown complete");
        dispatched
    }
}

/// Run the proxy for `config` with system DNS and signal handling.
pub fn run(config: &ProxyConfig) -> Result<usize, StartupError> {
    let proxy = Proxy::start(config, Arc::new(SystemResolver))?;
    signals::install(proxy.shutdown_handle(), proxy.local_addr()?)?;
    Ok(proxy.run())
}
