//! Filter policy watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::filter::{FilterPolicy, PolicyError, PolicyStore};

/// Monitors the filter file and swaps fresh policies into a [`PolicyStore`].
///
/// Connections accepted after a swap get the new policy; connections already
/// running keep the snapshot they were created with.
#[derive(Debug)]
pub struct PolicyWatcher {
    path: PathBuf,
    store: Arc<PolicyStore>,
}

impl PolicyWatcher {
    /// Create a new PolicyWatcher.
    pub fn new(path: &Path, store: Arc<PolicyStore>) -> Self {
        Self {
            path: path.to_path_buf(),
            store,
        }
    }

    /// Re-read the file and publish it. On error the current policy stays.
    pub fn reload(&self) -> Result<(), PolicyError> {
        let policy = FilterPolicy::load(&self.path)?;
        self.store.replace(policy);
        Ok(())
    }

    /// Start watching the file in a background thread.
    ///
    /// Watching stops when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Filter file change detected, reloading...");
                        if let Err(e) = self.reload() {
                            tracing::error!(
                                "Failed to reload filter policy: {}. Keeping current policy.",
                                e
                            );
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Filter watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reload_swaps_in_new_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filter.txt");
        fs::write(&path, "example.com\n").unwrap();

        let store = Arc::new(PolicyStore::new(FilterPolicy::load(&path).unwrap()));
        let before = store.snapshot();
        let watcher = PolicyWatcher::new(&path, Arc::clone(&store));

        fs::write(&path, "example.com\n10.0.0.0/8\n").unwrap();
        watcher.reload().unwrap();

        assert_eq!(store.snapshot().as_str(), "example.com\r\n10.0.0.0/8\r\n");
        assert_eq!(before.as_str(), "example.com\r\n");
    }

    #[test]
    fn failed_reload_keeps_current_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filter.txt");
        fs::write(&path, "example.com\n").unwrap();

        let store = Arc::new(PolicyStore::new(FilterPolicy::load(&path).unwrap()));
        let watcher = PolicyWatcher::new(&path, Arc::clone(&store));

        fs::remove_file(&path).unwrap();
        assert!(matches!(watcher.reload(), Err(PolicyError::Io { .. })));
        assert_eq!(store.snapshot().as_str(), "example.com\r\n");
    }

    #[test]
    fn watching_a_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        let store = Arc::new(PolicyStore::new(FilterPolicy::empty()));

        assert!(PolicyWatcher::new(&path, store).run().is_err());
    }
}
