//! Per-document diagram pipeline.
//!
//! Composes scanning, rendering and splicing for one document. Diagram
//! failures are collected as data and never abort the document.

use std::path::{Path, PathBuf};

use crate::renderer::{DiagramRenderer, RenderOutcome};
use crate::scanner::{DelimiterSyntax, DiagramMatch, default_syntaxes, scan};
use crate::splice::Splicer;

/// Result of processing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    /// Document text with every rendered diagram replaced by an image reference.
    pub text: String,
    /// Number of diagram blocks found.
    pub diagram_count: usize,
    /// One labeled entry per diagram that could not be rendered.
    pub failures: Vec<String>,
}

/// Scanner → renderer → splicer for one document.
///
/// Diagrams are numbered 1, 2, 3, … in the order they appear, whether or not
/// earlier ones rendered, so image names are predictable from the input:
/// diagram *n* is written to `image_dir/diagram-n.<ext>` and referenced as
/// `![Diagram n](diagram-n.<ext>)`.
pub struct DocumentPipeline<R> {
    renderer: R,
    image_dir: PathBuf,
    syntaxes: Vec<DelimiterSyntax>,
}

impl<R: DiagramRenderer> DocumentPipeline<R> {
    /// Create a pipeline writing images into `image_dir`.
    ///
    /// Uses the built-in delimiter syntaxes.
    #[must_use]
    pub fn new(renderer: R, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            image_dir: image_dir.into(),
            syntaxes: default_syntaxes().to_vec(),
        }
    }

    /// Replace the delimiter syntaxes to scan for.
    #[must_use]
    pub fn syntaxes(mut self, syntaxes: Vec<DelimiterSyntax>) -> Self {
        self.syntaxes = syntaxes;
        self
    }

    /// Directory receiving rendered images.
    #[must_use]
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Render every diagram in `text` and splice in image references.
    ///
    /// The renderer's intermediate resources are released before returning.
    pub async fn process(&self, text: &str) -> PipelineResult {
        let matches = scan(text, &self.syntaxes);
        let result = self.render_and_splice(text, &matches).await;
        self.renderer.cleanup();
        result
    }

    async fn render_and_splice(&self, text: &str, matches: &[DiagramMatch]) -> PipelineResult {
        let extension = self.renderer.format().as_str();
        let mut splicer = Splicer::new(text);
        let mut failures = Vec::new();

        for (i, diagram) in matches.iter().enumerate() {
            let number = i + 1;
            let filename = format!("diagram-{number}.{extension}");
            let output = self.image_dir.join(&filename);

            match self.renderer.render(&diagram.code, &output).await {
                RenderOutcome::Rendered(_) => {
                    let reference = format!("![Diagram {number}]({filename})");
                    if let Err(e) = splicer.replace(diagram, &reference) {
                        tracing::warn!(diagram = number, error = %e, "Could not splice diagram");
                        failures.push(format!("Diagram {number}: {e}"));
                    }
                }
                RenderOutcome::Failed(detail) => {
                    tracing::warn!(diagram = number, error = %detail, "Diagram rendering failed");
                    failures.push(format!("Diagram {number}: {detail}"));
                }
            }
        }

        PipelineResult {
            text: splicer.into_text(),
            diagram_count: matches.len(),
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ImageFormat;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Renderer stand-in: fails any code containing "FAIL", records calls.
    #[derive(Default)]
    struct FakeRenderer {
        calls: Mutex<Vec<(String, PathBuf)>>,
        cleanups: AtomicUsize,
        format: ImageFormat,
    }

    impl DiagramRenderer for FakeRenderer {
        async fn render(&self, code: &str, output: &Path) -> RenderOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((code.to_owned(), output.to_path_buf()));
            if code.contains("FAIL") {
                RenderOutcome::Failed("syntax error".to_owned())
            } else {
                RenderOutcome::Rendered(output.to_path_buf())
            }
        }

        fn format(&self) -> ImageFormat {
            self.format
        }

        fn cleanup(&self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pipeline() -> DocumentPipeline<FakeRenderer> {
        DocumentPipeline::new(FakeRenderer::default(), "/work")
    }

    #[tokio::test]
    async fn test_document_without_diagrams_is_unchanged() {
        let text = "# Title\n\nNo diagrams here.\n\n```rust\nfn main() {}\n```\n";
        let pipeline = pipeline();

        let result = pipeline.process(text).await;

        assert_eq!(result.text, text);
        assert_eq!(result.diagram_count, 0);
        assert!(result.failures.is_empty());
        assert!(pipeline.renderer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_diagrams_replaced_across_syntaxes() {
        let text = "# Doc\n\n```mermaid\ngraph TD\n  A --> B\n```\n\nMiddle\n\n<div class=\"mermaid\">\npie\n</div>\n\nEnd\n";
        let pipeline = pipeline();

        let result = pipeline.process(text).await;

        assert_eq!(result.diagram_count, 2);
        assert!(result.failures.is_empty());
        assert_eq!(
            result.text,
            "# Doc\n\n![Diagram 1](diagram-1.png)\n\nMiddle\n\n![Diagram 2](diagram-2.png)\n\nEnd\n"
        );
        assert!(!result.text.contains("```mermaid"));
        assert!(!result.text.contains("<div class=\"mermaid\">"));
    }

    #[tokio::test]
    async fn test_renderer_receives_trimmed_code_and_numbered_paths() {
        let text = "```mermaid\n  graph LR\n```\n<div class=\"mermaid\">sequenceDiagram</div>";
        let pipeline = pipeline();

        pipeline.process(text).await;

        let calls = pipeline.renderer.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                ("graph LR".to_owned(), PathBuf::from("/work/diagram-1.png")),
                ("sequenceDiagram".to_owned(), PathBuf::from("/work/diagram-2.png")),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_diagram_left_verbatim_between_successes() {
        let failing = "```mermaid\nFAIL here\n```";
        let text = format!("```mermaid\nA\n```\n{failing}\n```mermaid\nC\n```");
        let pipeline = pipeline();

        let result = pipeline.process(&text).await;

        assert_eq!(result.diagram_count, 3);
        assert_eq!(
            result.text,
            format!("![Diagram 1](diagram-1.png)\n{failing}\n![Diagram 3](diagram-3.png)")
        );
        assert_eq!(result.failures, vec!["Diagram 2: syntax error".to_owned()]);
    }

    #[tokio::test]
    async fn test_numbering_is_independent_of_failures() {
        let text = "```mermaid\nFAIL\n```\n```mermaid\nok\n```";
        let pipeline = pipeline();

        let result = pipeline.process(text).await;

        assert!(result.text.ends_with("![Diagram 2](diagram-2.png)"));
        assert!(result.failures[0].starts_with("Diagram 1:"));
    }

    #[tokio::test]
    async fn test_cleanup_called_once_per_process() {
        let pipeline = pipeline();

        pipeline.process("```mermaid\nFAIL\n```").await;
        assert_eq!(pipeline.renderer.cleanups.load(Ordering::SeqCst), 1);

        pipeline.process("no diagrams").await;
        assert_eq!(pipeline.renderer.cleanups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_svg_format_extension() {
        let renderer = FakeRenderer {
            format: ImageFormat::Svg,
            ..FakeRenderer::default()
        };
        let pipeline = DocumentPipeline::new(renderer, "/work");

        let result = pipeline.process("```mermaid\ngraph TD\n```").await;

        assert_eq!(result.text, "![Diagram 1](diagram-1.svg)");
    }

    #[tokio::test]
    async fn test_multibyte_text_around_diagrams() {
        let text = "Größe → ```mermaid\nA\n``` ☃ <div class=\"mermaid\">B</div> ünd";
        let pipeline = pipeline();

        let result = pipeline.process(text).await;

        assert_eq!(
            result.text,
            "Größe → ![Diagram 1](diagram-1.png) ☃ ![Diagram 2](diagram-2.png) ünd"
        );
    }

    #[tokio::test]
    async fn test_custom_syntaxes() {
        let pipeline = pipeline().syntaxes(vec![DelimiterSyntax::new("tilde", "~~~mermaid", "~~~")]);

        let result = pipeline.process("~~~mermaid\nA\n~~~\n```mermaid\nB\n```").await;

        assert_eq!(result.diagram_count, 1);
        assert_eq!(result.text, "![Diagram 1](diagram-1.png)\n```mermaid\nB\n```");
    }

    #[tokio::test]
    async fn test_overlapping_syntaxes_report_splice_failure() {
        let text = "<div class=\"mermaid\">\n```mermaid\nx\n```\n</div>";
        let pipeline = pipeline();

        let result = pipeline.process(text).await;

        assert_eq!(result.diagram_count, 2);
        assert_eq!(result.text, "![Diagram 1](diagram-1.png)");
        assert_eq!(result.failures.len(), 1);
        assert!(result.failures[0].starts_with("Diagram 2:"));
    }
}
