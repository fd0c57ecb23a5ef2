//! Batch conversion.
//!
//! Files are converted in fixed groups of `concurrency`. Every member of a
//! group runs as its own task; the next group starts only after the whole
//! current group has finished. When `continue_on_error` is off, a group
//! with any failure is the last one started.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;

use crate::converter::{ConversionResult, DocumentConverter};
use crate::patterns::expand_patterns;

/// Batch options.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory for generated PDFs; next to each input when unset.
    pub output_dir: Option<PathBuf>,
    /// Group size. Values below 1 are treated as 1.
    pub concurrency: usize,
    pub continue_on_error: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            concurrency: 3,
            continue_on_error: false,
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// Results of every conversion that ran, in completion order.
    pub results: Vec<ConversionResult>,
    pub succeeded: usize,
    pub failed: usize,
    /// Whether remaining groups were skipped after a failure.
    pub stopped_early: bool,
}

impl BatchResult {
    /// True if at least one file ran and none failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.results.is_empty() && self.failed == 0
    }

    fn push(&mut self, result: ConversionResult) {
        if result.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }
}

/// Runs a converter over many files.
pub struct BatchOrchestrator<C> {
    converter: Arc<C>,
}

impl<C: DocumentConverter> BatchOrchestrator<C> {
    #[must_use]
    pub fn new(converter: Arc<C>) -> Self {
        Self { converter }
    }

    /// Expand `patterns` and convert every matching file.
    ///
    /// No matching files yields an empty result.
    pub async fn run<S: AsRef<str>>(&self, patterns: &[S], options: &BatchOptions) -> BatchResult {
        self.run_with(patterns, options, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_result` as each conversion completes.
    pub async fn run_with<S, P>(
        &self,
        patterns: &[S],
        options: &BatchOptions,
        on_result: P,
    ) -> BatchResult
    where
        S: AsRef<str>,
        P: FnMut(&ConversionResult),
    {
        let files = expand_patterns(patterns);
        if files.is_empty() {
            tracing::warn!("No input files matched");
            return BatchResult::default();
        }
        self.run_files(files, options, on_result).await
    }

    /// Convert an explicit list of files.
    pub async fn run_files<P>(
        &self,
        files: Vec<PathBuf>,
        options: &BatchOptions,
        mut on_result: P,
    ) -> BatchResult
    where
        P: FnMut(&ConversionResult),
    {
        let concurrency = options.concurrency.max(1);
        let output_dir = options.output_dir.clone().map(Arc::new);
        let total = files.len();
        let mut batch = BatchResult::default();

        tracing::info!(files = total, concurrency, "Starting batch");

        for (index, group) in files.chunks(concurrency).enumerate() {
            let mut tasks = JoinSet::new();
            let mut inputs = HashMap::with_capacity(group.len());

            for input in group {
                let converter = Arc::clone(&self.converter);
                let output_dir = output_dir.clone();
                let path = input.clone();
                let handle = tasks.spawn(async move {
                    converter
                        .convert(&path, output_dir.as_deref().map(PathBuf::as_path))
                        .await
                });
                inputs.insert(handle.id(), (input.clone(), Instant::now()));
            }

            let mut group_failed = false;
            while let Some(joined) = tasks.join_next().await {
                let result = match joined {
                    Ok(result) => result,
                    Err(e) => {
                        let (input, started) = inputs
                            .remove(&e.id())
                            .unwrap_or_else(|| (PathBuf::new(), Instant::now()));
                        tracing::warn!(input = %input.display(), error = %e, "Conversion task failed");
                        ConversionResult::failed(
                            input,
                            format!("conversion task failed: {e}"),
                            started.elapsed(),
                        )
                    }
                };
                group_failed |= !result.success;
                on_result(&result);
                batch.push(result);
            }

            let remaining = total - batch.results.len();
            if group_failed && !options.continue_on_error && remaining > 0 {
                tracing::warn!(group = index + 1, skipped = remaining, "Stopping after failed group");
                batch.stopped_early = true;
                break;
            }
        }

        tracing::info!(
            succeeded = batch.succeeded,
            failed = batch.failed,
            "Batch finished"
        );
        batch
    }
}
