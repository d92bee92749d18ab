use crate::blob::{list_existing, matches_extension, BlobRef};
use blobscribe_core::{TriggerConfig, TriggerError};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Watches a directory and yields each new or rewritten blob once writes
/// have been quiet for the settle period.
pub struct BlobWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<BlobRef>,
    task: JoinHandle<()>,
}

impl BlobWatcher {
    /// Must be called from within a tokio runtime.
    pub fn start(config: &TriggerConfig) -> Result<Self, TriggerError> {
        let dir = config.path.clone();
        if !dir.is_dir() {
            return Err(TriggerError::Watch(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<PathBuf>();
        let mut watcher = notify::recommended_watcher(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) if is_write(&event.kind) => {
                    for path in event.paths {
                        let _ = raw_tx.send(path);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("watch error: {e}"),
            },
        )
        .map_err(|e| TriggerError::Watch(e.to_string()))?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| TriggerError::Watch(e.to_string()))?;

        let (blob_tx, rx) = mpsc::unbounded_channel();
        if config.process_existing {
            for blob in list_existing(&dir, &config.extensions)? {
                tracing::debug!(blob = %blob.name, "queued existing blob");
                let _ = blob_tx.send(blob);
            }
        }

        let task = tokio::spawn(settle_loop(
            raw_rx,
            blob_tx,
            config.settle(),
            config.extensions.clone(),
        ));
        tracing::info!(path = %dir.display(), "watching for blobs");

        Ok(Self {
            _watcher: watcher,
            rx,
            task,
        })
    }

    /// Next settled blob; `None` once the watcher has shut down.
    pub async fn next_blob(&mut self) -> Option<BlobRef> {
        self.rx.recv().await
    }
}

impl Drop for BlobWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn is_write(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

async fn settle_loop(
    mut raw_rx: mpsc::UnboundedReceiver<PathBuf>,
    blob_tx: mpsc::UnboundedSender<BlobRef>,
    settle: Duration,
    extensions: Vec<String>,
) {
    let mut pending: HashMap<PathBuf, Instant> = HashMap::new();
    let mut tick = tokio::time::interval((settle / 2).max(Duration::from_millis(10)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            path = raw_rx.recv() => match path {
                Some(path) => {
                    if matches_extension(&path, &extensions) {
                        pending.insert(path, Instant::now());
                    }
                }
                None => break,
            },
            _ = tick.tick() => {
                for path in take_settled(&mut pending, Instant::now(), settle) {
                    // Deleted or renamed away while settling.
                    if !path.is_file() {
                        continue;
                    }
                    if blob_tx.send(BlobRef::from_path(path)).is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Removes and returns paths whose last write is at least `settle` old.
fn take_settled(
    pending: &mut HashMap<PathBuf, Instant>,
    now: Instant,
    settle: Duration,
) -> Vec<PathBuf> {
    let mut ready: Vec<PathBuf> = pending
        .iter()
        .filter(|(_, seen)| now.duration_since(**seen) >= settle)
        .map(|(path, _)| path.clone())
        .collect();
    for path in &ready {
        pending.remove(path);
    }
    ready.sort();
    ready
}
