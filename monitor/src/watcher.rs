//! Filesystem watcher producing [`ChangeBatch`] values.
//!
//! This module watches a directory tree and reports what changed in it as
//! batches of modified, added and removed paths.
//!
//! # Architecture
//!
//! The watcher uses the [`notify`] crate for the platform event backend (or
//! its polling backend when polling is forced). The notify callback is kept
//! lightweight: it classifies each raw event, drops ignored paths and sends
//! the result through an internal channel to a dedicated async task.
//!
//! The task groups raw changes into windows. The first change after an idle
//! period opens a window of `latency`; every change received before the
//! window closes is folded into the same batch. Folding compares whether a
//! path existed before the window with whether it exists after it, so a
//! file created and then written is reported once as added, and a file
//! created and deleted again is not reported at all.
//!
//! Whether a path existed before the window comes from a record of known
//! files. The record is seeded by walking the root when the watcher starts
//! and is updated after every window, so a file replaced by a rename (as
//! `sed -i` and atomic-save editors do) is reported as modified.
//!
//! The internal channel is bounded by [`WatchOptions::buffer_size`]. The
//! callback never blocks the backend thread: when the channel is full,
//! further changes are dropped with a warning until the task catches up, and
//! batches built from such a burst may misclassify the dropped paths.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use tokio::sync::mpsc;
//! use listen_monitor::watcher::{ChangeWatcher, WatchOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (tx, mut rx) = mpsc::channel(100);
//!     let _watcher = ChangeWatcher::new(WatchOptions::new(PathBuf::from(".")), tx)?;
//!
//!     while let Some(batch) = rx.recv().await {
//!         println!("added: {:?}", batch.added);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{
    event::{CreateKind, ModifyKind, RemoveKind, RenameMode},
    Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::config::{DEFAULT_BUFFER_SIZE, DEFAULT_LATENCY_MS, DEFAULT_POLL_INTERVAL_MS};
use crate::ignore::IgnoreRules;
use crate::types::ChangeBatch;

/// Errors that can occur during file watching operations.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to initialize the file system watcher.
    #[error("failed to create watcher: {0}")]
    WatcherInit(#[from] notify::Error),

    /// Failed to resolve the watch root.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The watch directory does not exist or is not a directory.
    #[error("watch directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),
}

/// Result type for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Settings for a [`ChangeWatcher`].
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Root of the watched tree.
    pub root: PathBuf,
    /// Report paths relative to `root` instead of absolute.
    pub relative_paths: bool,
    /// Window used to group raw events into one batch.
    pub latency: Duration,
    /// Use the polling backend instead of native events.
    pub force_polling: bool,
    /// Interval of the polling backend.
    pub poll_interval: Duration,
    /// Capacity of the channel between the backend callback and the
    /// batching task. Changes arriving while it is full are dropped.
    pub buffer_size: usize,
    /// Paths matching these rules are never reported.
    pub ignore: IgnoreRules,
}

impl WatchOptions {
    /// Options for `root` with absolute paths and default timings.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            relative_paths: false,
            latency: Duration::from_millis(DEFAULT_LATENCY_MS),
            force_polling: false,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            buffer_size: DEFAULT_BUFFER_SIZE,
            ignore: IgnoreRules::default(),
        }
    }
}

/// Kind of change observed for a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Added,
    Modified,
    Removed,
}

impl Change {
    fn existed_before(self) -> bool {
        !matches!(self, Change::Added)
    }

    fn exists_after(self) -> bool {
        !matches!(self, Change::Removed)
    }
}

/// A classified change sent from the notify callback to the batching task.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawChange {
    path: PathBuf,
    change: Change,
}

/// Watches a directory tree and emits [`ChangeBatch`] values.
///
/// Dropping the watcher stops the backend. The batching task then flushes
/// any open window and exits, closing the batch channel.
pub struct ChangeWatcher {
    /// Kept alive to maintain the watch subscription.
    _backend: Box<dyn Watcher + Send>,

    /// Canonical root directory being watched.
    root: PathBuf,

    relative_paths: bool,

    task: JoinHandle<()>,
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("root", &self.root)
            .field("relative_paths", &self.relative_paths)
            .finish_non_exhaustive()
    }
}

impl ChangeWatcher {
    /// Starts watching `options.root` recursively.
    ///
    /// Must be called from within a Tokio runtime: the batching task is
    /// spawned onto the current runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The root does not exist or is not a directory
    /// - The root cannot be canonicalised
    /// - The backend cannot be created or registered (permissions, watch limits)
    pub fn new(options: WatchOptions, batch_sender: mpsc::Sender<ChangeBatch>) -> Result<Self> {
        if !options.root.is_dir() {
            return Err(WatcherError::DirectoryNotFound(options.root));
        }

        // Backends report canonical paths (e.g. /private/var on macOS)
        let root = fs::canonicalize(&options.root)?;

        let known = scan_known_files(&root)?;

        let (internal_tx, internal_rx) = mpsc::channel::<RawChange>(options.buffer_size.max(1));

        let renderer = PathRenderer {
            root: root.clone(),
            relative: options.relative_paths,
        };
        let task = tokio::spawn(collect_batches(
            internal_rx,
            batch_sender,
            options.latency,
            renderer,
            known,
        ));

        let filter = EventFilter {
            root: root.clone(),
            ignore: options.ignore,
        };
        let backend = match create_backend(
            &root,
            filter,
            internal_tx,
            options.force_polling,
            options.poll_interval,
        ) {
            Ok(backend) => backend,
            Err(e) => {
                task.abort();
                return Err(e);
            }
        };

        info!(
            root = %root.display(),
            relative_paths = options.relative_paths,
            force_polling = options.force_polling,
            latency_ms = options.latency.as_millis() as u64,
            "Initialized change watcher"
        );

        Ok(Self {
            _backend: backend,
            root,
            relative_paths: options.relative_paths,
            task,
        })
    }

    /// Returns the canonical directory being watched.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns whether paths are reported relative to the root.
    #[must_use]
    pub fn relative_paths(&self) -> bool {
        self.relative_paths
    }

    /// Returns `true` once the batching task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Creates the notify backend with a lightweight callback.
fn create_backend(
    root: &Path,
    filter: EventFilter,
    internal_tx: mpsc::Sender<RawChange>,
    force_polling: bool,
    poll_interval: Duration,
) -> Result<Box<dyn Watcher + Send>> {
    let handler = move |res: notify::Result<Event>| {
        handle_notify_event(res, &filter, &internal_tx);
    };

    let mut backend: Box<dyn Watcher + Send> = if force_polling {
        let config = Config::default().with_poll_interval(poll_interval);
        Box::new(PollWatcher::new(handler, config)?)
    } else {
        Box::new(RecommendedWatcher::new(handler, Config::default())?)
    };

    backend.watch(root, RecursiveMode::Recursive)?;

    debug!(root = %root.display(), force_polling, "Started recursive watch");

    Ok(backend)
}

/// Drops paths the caller does not want to hear about.
#[derive(Debug, Clone)]
struct EventFilter {
    root: PathBuf,
    ignore: IgnoreRules,
}

impl EventFilter {
    fn accepts(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if relative.as_os_str().is_empty() {
            return false;
        }
        !self.ignore.is_ignored(relative)
    }
}

/// Handles events from the notify crate.
///
/// Runs on the backend's thread, so it only classifies and forwards.
fn handle_notify_event(
    res: notify::Result<Event>,
    filter: &EventFilter,
    internal_tx: &mpsc::Sender<RawChange>,
) {
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "File watcher error");
            return;
        }
    };

    trace!(kind = ?event.kind, paths = ?event.paths, "Received notify event");

    for raw in classify(&event) {
        if !filter.accepts(&raw.path) {
            trace!(path = %raw.path.display(), "Ignoring path");
            continue;
        }

        // Never block the backend thread; a full channel drops the change
        if let Err(e) = internal_tx.try_send(raw) {
            warn!(error = %e, "Failed to queue change, channel may be full");
        }
    }
}

/// Maps one notify event onto per-path changes.
///
/// Directory events and pure access events produce nothing.
fn classify(event: &Event) -> Vec<RawChange> {
    let single = |change: Change| -> Vec<RawChange> {
        event
            .paths
            .iter()
            .filter(|path| change == Change::Removed || !path.is_dir())
            .map(|path| RawChange {
                path: path.clone(),
                change,
            })
            .collect()
    };

    match event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => {
            Vec::new()
        }
        EventKind::Create(_) => single(Change::Added),
        EventKind::Remove(_) => single(Change::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => single(Change::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => single(Change::Added),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to, ..] => {
                let mut changes = vec![RawChange {
                    path: from.clone(),
                    change: Change::Removed,
                }];
                if !to.is_dir() {
                    changes.push(RawChange {
                        path: to.clone(),
                        change: Change::Added,
                    });
                }
                changes
            }
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .filter(|path| !path.is_dir())
            .map(|path| RawChange {
                path: path.clone(),
                change: if path.exists() {
                    Change::Added
                } else {
                    Change::Removed
                },
            })
            .collect(),
        EventKind::Modify(_) => single(Change::Modified),
        _ => {
            trace!(kind = ?event.kind, "Ignoring event kind");
            Vec::new()
        }
    }
}

/// Existence of a path at the start and end of a batch window.
#[derive(Debug, Clone, Copy)]
struct PathState {
    existed_before: bool,
    exists_now: bool,
}

/// Files known to exist at the start of the current window.
#[derive(Debug, Default)]
struct KnownFiles {
    paths: HashSet<PathBuf>,
}

impl KnownFiles {
    fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    fn set(&mut self, path: &Path, exists: bool) {
        if exists {
            self.paths.insert(path.to_path_buf());
        } else {
            self.paths.remove(path);
        }
    }
}

/// Walks the root and records every file below it.
///
/// Symlinks are recorded but not followed. Unreadable directories are
/// skipped.
fn scan_known_files(root: &Path) -> Result<KnownFiles> {
    let mut known = KnownFiles::default();
    scan_directory_recursive(root, &mut known)?;

    debug!(file_count = known.paths.len(), "Scanned existing files");

    Ok(known)
}

fn scan_directory_recursive(dir: &Path, known: &mut KnownFiles) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            warn!(dir = %dir.display(), "Permission denied, skipping directory");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();

        if file_type.is_dir() {
            scan_directory_recursive(&path, known)?;
        } else {
            known.paths.insert(path);
        }
    }

    Ok(())
}

/// Folds raw changes of one window into a [`ChangeBatch`].
#[derive(Debug, Default)]
struct BatchBuilder {
    order: Vec<PathBuf>,
    states: HashMap<PathBuf, PathState>,
}

impl BatchBuilder {
    /// Records one change. The first change seen for a path decides whether
    /// it existed before the window: a known file did, and otherwise the kind
    /// of the change tells (only an addition implies it was absent).
    fn record(&mut self, raw: RawChange, known: &KnownFiles) {
        match self.states.get_mut(&raw.path) {
            Some(state) => state.exists_now = raw.change.exists_after(),
            None => {
                let existed_before = known.contains(&raw.path) || raw.change.existed_before();
                self.order.push(raw.path.clone());
                self.states.insert(
                    raw.path,
                    PathState {
                        existed_before,
                        exists_now: raw.change.exists_after(),
                    },
                );
            }
        }
    }

    /// Builds the batch and carries the end-of-window state into `known`.
    fn finish(self, renderer: &PathRenderer, known: &mut KnownFiles) -> ChangeBatch {
        let mut batch = ChangeBatch::default();

        for path in self.order {
            let Some(state) = self.states.get(&path) else {
                continue;
            };
            known.set(&path, state.exists_now);
            let target = match (state.existed_before, state.exists_now) {
                (false, true) => &mut batch.added,
                (true, true) => &mut batch.modified,
                (true, false) => &mut batch.removed,
                (false, false) => continue,
            };
            target.push(renderer.render(&path));
        }

        batch
    }
}

/// Turns watched paths into the strings placed in a batch.
#[derive(Debug, Clone)]
struct PathRenderer {
    root: PathBuf,
    relative: bool,
}

impl PathRenderer {
    fn render(&self, path: &Path) -> String {
        let shown = if self.relative {
            path.strip_prefix(&self.root).unwrap_or(path)
        } else {
            path
        };
        shown.to_string_lossy().into_owned()
    }
}

/// Async task grouping raw changes into batches.
///
/// Exits when the backend goes away (internal channel closed) or the
/// consumer of the batch channel is gone.
async fn collect_batches(
    mut rx: mpsc::Receiver<RawChange>,
    sender: mpsc::Sender<ChangeBatch>,
    latency: Duration,
    renderer: PathRenderer,
    mut known: KnownFiles,
) {
    while let Some(first) = rx.recv().await {
        let mut builder = BatchBuilder::default();
        builder.record(first, &known);

        let deadline = Instant::now() + latency;
        let mut closed = false;
        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(raw)) => builder.record(raw, &known),
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        let batch = builder.finish(&renderer, &mut known);
        if batch.is_empty() {
            trace!("Window produced no net changes");
        } else {
            debug!(
                modified = batch.modified.len(),
                added = batch.added.len(),
                removed = batch.removed.len(),
                "Emitting change batch"
            );
            if sender.send(batch).await.is_err() {
                debug!("Batch receiver dropped");
                return;
            }
        }

        if closed {
            break;
        }
    }

    debug!("Batch collector shutting down");
}
