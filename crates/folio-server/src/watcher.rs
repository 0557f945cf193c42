//! File watching for the markdown store.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use folio_dispatch::{ChangeEvent, ChangeType};
use folio_store::document::id_from_path;
use notify::event::{EventKind, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Lower bound on the size polling interval.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Write-stability settings.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// How long a file's size must stay unchanged before its event is emitted
    pub stability_threshold: Duration,

    /// How often the size is sampled
    pub poll_interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            stability_threshold: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Watches a store directory and emits a [`ChangeEvent`] per settled change
/// to a visible `*.md` file.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    filter: JoinHandle<()>,
}

struct PendingWrite {
    change_type: ChangeType,
    waiter: JoinHandle<()>,
}

impl FileWatcher {
    /// Start watching `dir`. Must be called from within a tokio runtime.
    ///
    /// Returns the watcher and a channel to receive events. Dropping the
    /// watcher stops event delivery.
    pub fn new(
        dir: &Path,
        options: WatchOptions,
    ) -> Result<(Self, mpsc::Receiver<ChangeEvent>), std::io::Error> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            match res {
                Ok(event) => {
                    let _ = raw_tx.send(event);
                }
                Err(e) => tracing::warn!("File watch error: {}", e),
            }
        })
        .map_err(std::io::Error::other)?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(std::io::Error::other)?;

        let known = existing_files(dir)?;
        let filter = tokio::spawn(filter_events(raw_rx, tx, options, known));

        Ok((
            Self {
                _watcher: watcher,
                filter,
            },
            rx,
        ))
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.filter.abort();
    }
}

/// File names of the markdown files already in `dir`.
fn existing_files(dir: &Path) -> Result<HashSet<String>, std::io::Error> {
    let mut known = HashSet::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if id_from_path(&path).is_none() || !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            known.insert(name.to_string());
        }
    }
    Ok(known)
}

/// Turn raw notify events into settled change events.
///
/// `known` tracks the files that exist, so a rename onto an existing file
/// (an editor's atomic save) is reported as a change rather than an add.
async fn filter_events(
    mut raw_rx: mpsc::UnboundedReceiver<notify::Event>,
    tx: mpsc::Sender<ChangeEvent>,
    options: WatchOptions,
    mut known: HashSet<String>,
) {
    let mut pending: HashMap<PathBuf, PendingWrite> = HashMap::new();

    while let Some(event) = raw_rx.recv().await {
        pending.retain(|_, p| !p.waiter.is_finished());

        for path in &event.paths {
            let Some(change_type) = classify_event(path, &event.kind) else {
                continue;
            };
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let previous = pending.remove(path);
            if let Some(p) = &previous {
                p.waiter.abort();
            }

            if change_type == ChangeType::Delete {
                known.remove(file_name);
                emit(&tx, ChangeEvent::new(ChangeType::Delete, file_name)).await;
                continue;
            }

            let was_known = !known.insert(file_name.to_string());
            let change_type = match previous {
                // A file still settling after creation is reported as added.
                Some(p) if p.change_type == ChangeType::Add => ChangeType::Add,
                _ if was_known => ChangeType::Change,
                _ => change_type,
            };
            let waiter = tokio::spawn(await_stable(
                path.clone(),
                ChangeEvent::new(change_type, file_name),
                tx.clone(),
                options,
            ));
            pending.insert(
                path.clone(),
                PendingWrite {
                    change_type,
                    waiter,
                },
            );
        }
    }

    for p in pending.into_values() {
        p.waiter.abort();
    }
}

/// Wait until the file size stops changing, then emit. Gives up silently if
/// the file disappears; its removal produces its own event.
async fn await_stable(
    path: PathBuf,
    event: ChangeEvent,
    tx: mpsc::Sender<ChangeEvent>,
    options: WatchOptions,
) {
    let poll_interval = options.poll_interval.max(MIN_POLL_INTERVAL);
    let mut last_size = None;
    let mut stable_since = Instant::now();

    loop {
        let size = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(_) => return,
        };

        if last_size != Some(size) {
            last_size = Some(size);
            stable_since = Instant::now();
        } else if stable_since.elapsed() >= options.stability_threshold {
            break;
        }

        tokio::time::sleep(poll_interval).await;
    }

    emit(&tx, event).await;
}

async fn emit(tx: &mpsc::Sender<ChangeEvent>, event: ChangeEvent) {
    match event.change_type {
        ChangeType::Add => tracing::info!("New markdown file added: {}", event.file_name),
        ChangeType::Delete => tracing::info!("Markdown file deleted: {}", event.file_name),
        _ => tracing::info!("Markdown file changed: {}", event.file_name),
    }
    let _ = tx.send(event).await;
}

/// Classify a notify event for one path. Only visible `*.md` files count.
fn classify_event(path: &Path, kind: &EventKind) -> Option<ChangeType> {
    id_from_path(path)?;

    let exists_or_deleted = |present: ChangeType| {
        if path.exists() {
            present
        } else {
            ChangeType::Delete
        }
    };

    match kind {
        EventKind::Create(_) => Some(exists_or_deleted(ChangeType::Add)),
        EventKind::Modify(ModifyKind::Name(_)) => Some(exists_or_deleted(ChangeType::Add)),
        EventKind::Modify(_) => Some(exists_or_deleted(ChangeType::Change)),
        EventKind::Remove(_) => Some(ChangeType::Delete),
        _ => None,
    }
}
