//! Hostname to IPv4 resolution.
//!
//! # Design Decisions
//! - Resolution sits behind a trait so the pipeline can be driven by a fixed
//!   hosts table instead of live DNS
//! - Only IPv4 answers count; the first one wins

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};

/// Resolves a hostname to one IPv4 address.
pub trait Resolver: Send + Sync + std::fmt::Debug {
    /// First IPv4 address of `host`, or `None` if it does not resolve.
    fn resolve_ipv4(&self, host: &str) -> Option<Ipv4Addr>;
}

/// Resolver backed by the operating system's name service.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    fn resolve_ipv4(&self, host: &str) -> Option<Ipv4Addr> {
        if host.is_empty() {
            return None;
        }

        let addrs = match (host, 0u16).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::debug!(host = %host, error = %e, "Name resolution failed");
                return None;
            }
        };

        addrs.into_iter().find_map(|addr| match addr.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
    }
}

/// Resolver answering from a fixed hosts table. IPv4 literals resolve to themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Ipv4Addr>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an entry.
    pub fn with_host(mut self, host: impl Into<String>, ip: Ipv4Addr) -> Self {
        self.hosts.insert(host.into(), ip);
        self
    }
}

impl Resolver for StaticResolver {
    fn resolve_ipv4(&self, host: &str) -> Option<Ipv4Addr> {
        self.hosts
            .get(host)
            .copied()
            .or_else(|| host.parse().ok())
    }
}
