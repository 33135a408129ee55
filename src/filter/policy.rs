//! Filter policy snapshots.
//!
//! # Responsibilities
//! - Load the policy file and normalize line endings to CRLF
//! - Hand each connection an immutable snapshot
//! - Let a reload swap in a new policy without touching in-flight snapshots

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

/// Error type for policy loading.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read filter file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Immutable policy text: one hostname literal or `ip[/mask]` entry per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPolicy {
    text: Arc<str>,
}

impl FilterPolicy {
    /// Build a policy from raw text, rewriting every `\n` terminator as `\r\n`.
    ///
    /// A last line without a terminator is kept as is.
    pub fn from_text(raw: &str) -> Self {
        let mut text = String::with_capacity(raw.len() + raw.len() / 16);
        for line in raw.split_inclusive('\n') {
            match line.strip_suffix('\n') {
                Some(body) => {
                    text.push_str(body.strip_suffix('\r').unwrap_or(body));
                    text.push_str("\r\n");
                }
                None => text.push_str(line),
            }
        }
        Self { text: text.into() }
    }

    /// Read and normalize the policy file at `path`.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let raw = fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let policy = Self::from_text(&raw);

        tracing::info!(
            path = %path.display(),
            rules = policy.rules().count(),
            "Filter policy loaded"
        );
        Ok(policy)
    }

    /// A policy that blocks nothing.
    pub fn empty() -> Self {
        Self::from_text("")
    }

    /// Normalized text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Non-empty policy lines, in file order.
    pub fn rules(&self) -> impl Iterator<Item = &str> {
        self.text
            .split(|c: char| c == '\r' || c == '\n')
            .filter(|line| !line.is_empty())
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::empty()
    }
}

/// Current policy, shared between the listener and the reload watcher.
#[derive(Debug)]
pub struct PolicyStore {
    current: ArcSwap<FilterPolicy>,
}

impl PolicyStore {
    pub fn new(policy: FilterPolicy) -> Self {
        Self {
            current: ArcSwap::from_pointee(policy),
        }
    }

    /// Snapshot for one connection. Later reloads do not affect it.
    pub fn snapshot(&self) -> FilterPolicy {
        FilterPolicy::clone(&self.current.load())
    }

    /// Swap in a new policy for connections accepted from now on.
    pub fn replace(&self, policy: FilterPolicy) {
        self.current.store(Arc::new(policy));
    }
}
