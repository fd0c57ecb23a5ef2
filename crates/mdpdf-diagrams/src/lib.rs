//! Mermaid diagram extraction, rendering and splicing for markdown documents.
//!
//! This crate turns diagram source blocks embedded in markdown into image
//! references:
//! - [`scan`] finds ```` ```mermaid ```` and `<div class="mermaid">` blocks
//! - [`MermaidRenderer`] renders one diagram through the external `mmdc` CLI
//! - [`Splicer`] replaces blocks in place while tracking a running offset
//! - [`DocumentPipeline`] composes the three for a whole document
//!
//! Individual diagram failures never abort a document: failed blocks stay in
//! the text verbatim and are reported in [`PipelineResult::failures`].
//!
//! # Example
//!
//! ```ignore
//! use mdpdf_diagrams::{DocumentPipeline, MermaidRenderer, RenderOptions};
//!
//! let renderer = MermaidRenderer::new(RenderOptions::default());
//! let pipeline = DocumentPipeline::new(renderer, "/tmp/work");
//!
//! let result = pipeline.process("```mermaid\ngraph TD\n  A --> B\n```").await;
//! assert_eq!(result.text, "![Diagram 1](diagram-1.png)");
//! ```

mod consts;
mod format;
mod pipeline;
mod renderer;
mod scanner;
mod splice;
mod workspace;

pub use consts::{
    DEFAULT_BACKGROUND, DEFAULT_COMMAND, DEFAULT_HEIGHT, DEFAULT_TIMEOUT, DEFAULT_WIDTH,
};
pub use format::ImageFormat;
pub use pipeline::{DocumentPipeline, PipelineResult};
pub use renderer::{DiagramRenderer, MermaidRenderer, RenderOptions, RenderOutcome};
pub use scanner::{DelimiterSyntax, DiagramMatch, default_syntaxes, scan, scan_default};
pub use splice::{SpliceError, Splicer};
pub use workspace::Workspace;
