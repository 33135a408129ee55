//! Host filtering subsystem.
//!
//! # Data Flow
//! ```text
//! raw Host header
//!     → clean_host() (strip http://, www., :port)
//!     → resolver.rs (cleaned name → first IPv4 → "a.b.c.d/32")
//!     → cidr.rs (bit strings)
//!     → evaluate() against each policy.rs line, first match wins
//! ```
//!
//! # Design Decisions
//! - Lines starting with a digit are CIDR rules and match on the resolved
//!   address of the *cleaned* host
//! - Every other line is a hostname literal and matches the *raw* Host value
//!   exactly, so `www.example.com:8080` is not caught by `example.com`
//! - Failing to resolve is its own outcome, distinct from "no match"

pub mod cidr;
pub mod policy;
pub mod resolver;

use std::net::Ipv4Addr;

use thiserror::Error;

use crate::http::request::clean_host;

pub use policy::{FilterPolicy, PolicyError, PolicyStore};
pub use resolver::{Resolver, StaticResolver, SystemResolver};

/// The host could not be turned into an IPv4 address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("could not resolve host {0:?}")]
    Unresolved(String),
}

/// Policy line that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedRule {
    /// An `ip[/mask]` line covering the host's address.
    Cidr(String),
    /// A hostname line equal to the raw Host value.
    Hostname(String),
}

impl std::fmt::Display for MatchedRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchedRule::Cidr(rule) => write!(f, "cidr {rule}"),
            MatchedRule::Hostname(rule) => write!(f, "hostname {rule}"),
        }
    }
}

/// Outcome of checking a host against a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Allowed,
    Blocked(MatchedRule),
}

/// Resolve the cleaned form of `raw_host` to its first IPv4 address.
pub fn resolve_host(resolver: &dyn Resolver, raw_host: &str) -> Result<Ipv4Addr, FilterError> {
    let host = clean_host(raw_host);
    resolver
        .resolve_ipv4(host)
        .ok_or_else(|| FilterError::Unresolved(host.to_string()))
}

impl FilterPolicy {
    /// Check a request against this policy.
    ///
    /// `raw_host` is the Host header as sent; `host_ip` is the resolved address of
    /// its cleaned form.
    pub fn evaluate(&self, raw_host: &str, host_ip: Ipv4Addr) -> FilterDecision {
        let host_bits = cidr::ip_bits(host_ip, cidr::FULL_MASK);

        for line in self.rules() {
            if line.starts_with(|c: char| c.is_ascii_digit()) {
                let Some(rule_bits) = cidr::to_bit_string(line) else {
                    tracing::debug!(rule = %line, "Skipping unparsable CIDR rule");
                    continue;
                };
                if host_bits.starts_with(&rule_bits) {
                    return FilterDecision::Blocked(MatchedRule::Cidr(line.to_string()));
                }
            } else if line == raw_host {
                return FilterDecision::Blocked(MatchedRule::Hostname(line.to_string()));
            }
        }

        FilterDecision::Allowed
    }

    /// Resolve `raw_host` with `resolver`, then [`evaluate`](Self::evaluate) it.
    ///
    /// The resolved address is returned alongside the decision so callers can
    /// connect to the same address that was checked.
    pub fn check_host(
        &self,
        resolver: &dyn Resolver,
        raw_host: &str,
    ) -> Result<(Ipv4Addr, FilterDecision), FilterError> {
        let host_ip = resolve_host(resolver, raw_host)?;
        tracing::trace!(host = %raw_host, entry = %cidr::host_entry(host_ip), "Host resolved");
        Ok((host_ip, self.evaluate(raw_host, host_ip)))
    }
}
