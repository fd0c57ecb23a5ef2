//! Conversion orchestration for mdpdf.
//!
//! [`Converter`] turns one markdown file into a PDF. [`BatchOrchestrator`]
//! runs a converter over glob-expanded inputs in bounded groups, and
//! [`watch`] reconverts files as they change.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mdpdf_batch::{BatchOptions, BatchOrchestrator, Converter, render_options};
//! use mdpdf_config::Config;
//! use mdpdf_diagrams::MermaidRenderer;
//! use mdpdf_pdf::WkhtmltopdfGenerator;
//!
//! let config = Config::default();
//! let options = render_options(&config);
//! let converter = Converter::new(config, WkhtmltopdfGenerator::new(), move || {
//!     MermaidRenderer::new(options.clone())
//! });
//! let batch = BatchOrchestrator::new(Arc::new(converter));
//! let result = batch.run(&["docs/**/*.md"], &BatchOptions::default()).await;
//! println!("{} converted, {} failed", result.succeeded, result.failed);
//! ```

mod batch;
mod converter;
mod debouncer;
mod patterns;
mod watch;

use std::path::PathBuf;

pub use batch::{BatchOptions, BatchOrchestrator, BatchResult};
pub use converter::{ConversionResult, Converter, DocumentConverter, render_options};
pub use patterns::{PatternSet, base_dir, expand_patterns};
pub use watch::{WatchOptions, WatchSession, watch, watch_in};

/// Error converting or watching documents.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pdf(#[from] mdpdf_pdf::PdfError),

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("none of the watched directories exist")]
    NothingToWatch,
}
