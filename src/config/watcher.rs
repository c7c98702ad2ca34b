//! Hot reload of the configuration file.
//!
//! Editors often replace a file instead of writing it in place, which drops a
//! watch placed on the file itself. The watcher therefore observes the parent
//! directory and filters events down to the config path.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::TrackerConfig;

/// Sends a freshly validated [`TrackerConfig`] whenever the file changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<TrackerConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its update channel.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<TrackerConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Begin watching. Reloads stop when the returned handle is dropped.
    pub fn run(self, current: TrackerConfig) -> Result<RecommendedWatcher, notify::Error> {
        let target = self.path.clone();
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = target.file_name().map(|n| n.to_os_string());
        let mut last_sent = current;
        let tx = self.update_tx;

        let handler = move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(error = %e, "Config watch error");
                    return;
                }
            };
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            let touches_config = event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
            if !touches_config {
                return;
            }

            match load_config(&target) {
                Ok(config) => {
                    if last_sent == config {
                        return;
                    }
                    tracing::info!(path = ?target, "Config file changed, reloading");
                    last_sent = config.clone();
                    let _ = tx.send(config);
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "Failed to reload config, keeping current configuration"
                    );
                }
            }
        };

        let mut watcher = RecommendedWatcher::new(
            handler,
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
