//! Filtering HTTP forward proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────────────┐
//!                    │                    FILTER PROXY                        │
//!                    │                                                        │
//!   Client Request   │  ┌──────────┐    ┌────────────┐    ┌────────────────┐ │
//!   ─────────────────┼─▶│   net    │───▶│   pool     │───▶│   pipeline     │ │
//!                    │  │ listener │    │  workers   │    │ read/validate  │ │
//!                    │  └──────────┘    └────────────┘    └───────┬────────┘ │
//!                    │                                            │          │
//!                    │                                            ▼          │
//!                    │                                    ┌────────────────┐ │
//!                    │                                    │    filter      │ │
//!                    │                                    │ hostname/CIDR  │ │
//!                    │                                    └───────┬────────┘ │
//!                    │                                            ▼          │
//!   Client Response  │  ┌──────────┐                      ┌────────────────┐ │
//!   ◀────────────────┼──│ net::io  │◀─────────────────────│  destination   │◀┼── Origin
//!                    │  │  relay   │                      │  connection    │ │   Server
//!                    │  └──────────┘                      └────────────────┘ │
//!                    │                                                        │
//!                    │  Cross-cutting: config · observability · lifecycle     │
//!                    └───────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use filter_proxy::config::loader::{load_config, ConfigError};
use filter_proxy::config::validation::validate_config;
use filter_proxy::lifecycle::startup;
use filter_proxy::observability::logging;
use filter_proxy::ProxyConfig;

/// Filtering HTTP forward proxy.
#[derive(Debug, Parser)]
#[command(name = "filter-proxy", version, about)]
struct Cli {
    /// Port to listen on
    port: Option<u16>,

    /// Number of worker threads
    pool_size: Option<usize>,

    /// Connections to serve before exiting
    max_number_of_request: Option<usize>,

    /// Filter file with one hostname or ip[/mask] per line
    filter: Option<PathBuf>,

    /// TOML config file; positional arguments override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reload the filter file when it changes
    #[arg(long)]
    watch: bool,
}

impl Cli {
    fn apply(&self, config: &mut ProxyConfig) {
        if let Some(port) = self.port {
            let host = config
                .listener
                .bind_address
                .rsplit_once(':')
                .map(|(host, _)| host)
                .unwrap_or("0.0.0.0");
            config.listener.bind_address = format!("{host}:{port}");
        }
        if let Some(size) = self.pool_size {
            config.pool.size = size;
        }
        if let Some(max) = self.max_number_of_request {
            config.listener.max_requests = max;
        }
        if let Some(filter) = &self.filter {
            config.filter.path = filter.clone();
        }
        if self.watch {
            config.filter.watch = true;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_level)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        pool_size = config.pool.size,
        max_requests = config.listener.max_requests,
        filter = %config.filter.path.display(),
        watch = config.filter.watch,
        "filter-proxy v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = startup::run(&config) {
        tracing::error!(error = %e, "Startup failed");
        return Err(e.into());
    }

    Ok(())
}
