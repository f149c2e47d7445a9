//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::PolicyConfig;

/// A watcher that monitors the configuration file for changes.
///
/// Every change that loads and validates cleanly is pushed to the receiver;
/// a broken file is logged and the previous configuration stays in effect.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<PolicyConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<PolicyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    tracing::info!(path = ?path, "Config file change detected, reloading");
                    match load_config(&path) {
                        Ok(new_config) => {
                            if tx.send(new_config).is_err() {
                                tracing::debug!("Config receiver dropped, ignoring reload");
                            }
                        }
                        Err(e) => {
                            tracing::error!(
                                error = %e,
                                "Failed to reload config, keeping current configuration"
                            );
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    async fn next_weight(rx: &mut mpsc::UnboundedReceiver<PolicyConfig>) -> u32 {
        let config = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("no reload within timeout")
            .expect("watcher channel closed");
        config.endpoints[0].weight
    }

    #[tokio::test]
    async fn test_reloads_valid_changes_only() {
        let dir = std::env::temp_dir().join(format!("ringhash-watch-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ringhash.toml");
        fs::write(&path, "[[endpoints]]\naddress = \"a:1\"\n").unwrap();

        let (watcher, mut rx) = ConfigWatcher::new(&path);
        let _watcher = watcher.run().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Rejected by validation; never forwarded.
        fs::write(&path, "[[endpoints]]\naddress = \"a:1\"\nweight = 0\n").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&path, "[[endpoints]]\naddress = \"a:1\"\nweight = 5\n").unwrap();

        // One write can raise several events; every forwarded config is the valid one.
        assert_eq!(next_weight(&mut rx).await, 5);
        while let Ok(config) = rx.try_recv() {
            assert_eq!(config.endpoints[0].weight, 5);
        }

        fs::remove_dir_all(&dir).unwrap();
    }
}
