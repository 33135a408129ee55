//! OS signal handling.
//!
//! # Responsibilities
//! - Register a SIGINT/SIGTERM handler
//! - Trigger graceful shutdown and unblock the accept loop
//!
//! # Design Decisions
//! - Uses `ctrlc` with the `termination` feature so SIGTERM is covered too
//! - The accept loop blocks in `accept()`, so the handler makes one throwaway
//!   connection to the listener to wake it
//! - A second signal forces an immediate exit

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream};
use std::time::Duration;

use crate::lifecycle::Shutdown;

const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Exit status used when a second signal arrives during drain.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Install the process-wide handler. Can only succeed once per process.
pub fn install(shutdown: Shutdown, listen_addr: SocketAddr) -> Result<(), ctrlc::Error> {
    let wake_addr = wake_address(listen_addr);

    ctrlc::set_handler(move || {
        if shutdown.trigger() {
            tracing::warn!("Second signal received, forcing exit");
            std::process::exit(FORCED_EXIT_CODE);
        }

        tracing::info!("Shutdown signal received, draining");
        if let Err(e) = TcpStream::connect_timeout(&wake_addr, WAKE_TIMEOUT) {
            tracing::debug!(address = %wake_addr, error = %e, "Could not wake accept loop");
        }
    })?;

    tracing::debug!(wake_address = %wake_addr, "Signal handler installed");
    Ok(())
}

/// Address a local client can reach the listener on.
///
/// A wildcard bind is rewritten to the loopback address of the same family.
pub fn wake_address(listen_addr: SocketAddr) -> SocketAddr {
    let ip = match listen_addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, listen_addr.port())
}
