//! Watch mode.
//!
//! [`watch`] opens OS-level watches on the literal base directory of every
//! input pattern and converts a matching file once it has been quiet for
//! the debounce duration. The returned [`WatchSession`] owns the watcher,
//! the event task and every pending timer; closing or dropping it stops
//! all of them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::BatchError;
use crate::converter::{ConversionResult, DocumentConverter};
use crate::debouncer::Debouncer;
use crate::patterns::PatternSet;

/// Capacity of the channel between the watcher thread and the event task.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Watch mode options.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Directory for generated PDFs; next to each input when unset.
    pub output_dir: Option<PathBuf>,
    /// Quiet period before a changed file is converted.
    pub debounce: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            debounce: Duration::from_millis(500),
        }
    }
}

/// Type-erased close operation for the session's debouncer.
trait Close: Send + Sync {
    fn close(&self);
}

impl<A, Fut> Close for Debouncer<A>
where
    A: Fn(PathBuf) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    fn close(&self) {
        Debouncer::close(self);
    }
}

/// A running watch.
pub struct WatchSession {
    watcher: Option<RecommendedWatcher>,
    event_task: Option<JoinHandle<()>>,
    debouncer: Arc<dyn Close>,
    results: mpsc::UnboundedReceiver<ConversionResult>,
    watched: Vec<PathBuf>,
    closed: bool,
}

impl WatchSession {
    /// Wait for the next completed conversion.
    ///
    /// Returns `None` once no further results can arrive.
    pub async fn next_result(&mut self) -> Option<ConversionResult> {
        self.results.recv().await
    }

    /// Directories being watched.
    #[must_use]
    pub fn watched_dirs(&self) -> &[PathBuf] {
        &self.watched
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop watching: cancel pending timers, stop the event task and release
    /// the OS watches. Conversions already running finish on their own.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.debouncer.close();
        if let Some(task) = self.event_task.take() {
            task.abort();
        }
        self.watcher.take();
        tracing::debug!("Watch session closed");
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSession")
            .field("watched", &self.watched)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// Start watching `patterns` (relative ones anchored at the current directory).
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns an error if a pattern is invalid, no base directory exists, or the
/// OS watcher cannot be created.
pub fn watch<C, S>(
    converter: Arc<C>,
    patterns: &[S],
    options: WatchOptions,
) -> Result<WatchSession, BatchError>
where
    C: DocumentConverter,
    S: AsRef<str>,
{
    let root = std::env::current_dir()?;
    watch_in(converter, patterns, &root, options)
}

/// Like [`watch`], with relative patterns anchored at `root`.
///
/// # Errors
///
/// See [`watch`].
pub fn watch_in<C, S>(
    converter: Arc<C>,
    patterns: &[S],
    root: &Path,
    options: WatchOptions,
) -> Result<WatchSession, BatchError>
where
    C: DocumentConverter,
    S: AsRef<str>,
{
    let pattern_set = PatternSet::new(patterns, root)?;
    let (results_tx, results) = mpsc::unbounded_channel();

    let output_dir = options.output_dir.map(Arc::new);
    let debouncer = Debouncer::new(options.debounce, move |path: PathBuf| {
        let converter = Arc::clone(&converter);
        let output_dir = output_dir.clone();
        let results_tx = results_tx.clone();
        async move {
            tracing::info!(path = %path.display(), "Converting changed file");
            let result = converter
                .convert(&path, output_dir.as_deref().map(PathBuf::as_path))
                .await;
            let _ = results_tx.send(result);
        }
    });

    let (tx, mut rx) = mpsc::channel::<PathBuf>(EVENT_CHANNEL_CAPACITY);
    let filter = pattern_set.clone();
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        match res {
            Ok(event) if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) => {
                for path in event.paths {
                    if filter.matches(&path) {
                        // Callback runs on the watcher's own thread.
                        let _ = tx.blocking_send(path);
                    }
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "File watcher error"),
        }
    })?;

    let mut watched = Vec::new();
    for base in pattern_set.bases() {
        if !base.is_dir() {
            tracing::warn!(path = %base.display(), "Watch directory does not exist");
            continue;
        }
        watcher.watch(base, RecursiveMode::Recursive)?;
        tracing::debug!(path = %base.display(), "Watching directory");
        watched.push(base.clone());
    }
    if watched.is_empty() {
        return Err(BatchError::NothingToWatch);
    }

    let scheduler = Arc::clone(&debouncer);
    let event_task = tokio::spawn(async move {
        while let Some(path) = rx.recv().await {
            tracing::debug!(path = %path.display(), "File changed");
            if !scheduler.schedule(path) {
                break;
            }
        }
    });

    Ok(WatchSession {
        watcher: Some(watcher),
        event_task: Some(event_task),
        debouncer,
        results,
        watched,
        closed: false,
    })
}
