//! Single-document conversion.
//!
//! [`Converter`] runs one markdown file through the whole chain: read,
//! copy local assets, render and splice diagrams, build the HTML page and
//! hand it to the PDF generator. Every intermediate file lives in one
//! working directory that is removed when the document is done, unless
//! `keep_temp` is set.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use mdpdf_config::Config;
use mdpdf_diagrams::{DiagramRenderer, DocumentPipeline, RenderOptions};
use mdpdf_pdf::{PdfGenerator, copy_assets, output_path_for, render_html_document};

use crate::BatchError;

/// Outcome of converting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// Markdown input.
    pub input: PathBuf,
    /// Generated PDF (set on success).
    pub output: Option<PathBuf>,
    pub success: bool,
    /// Why the document failed.
    pub error: Option<String>,
    /// Number of diagram blocks found.
    pub diagram_count: usize,
    /// Diagrams that could not be rendered; these do not fail the document.
    pub diagram_failures: Vec<String>,
    pub duration: Duration,
}

impl ConversionResult {
    /// A failed conversion that produced nothing.
    #[must_use]
    pub fn failed(input: impl Into<PathBuf>, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            input: input.into(),
            output: None,
            success: false,
            error: Some(error.into()),
            diagram_count: 0,
            diagram_failures: Vec::new(),
            duration,
        }
    }
}

/// Converts one document.
///
/// Implementations never return errors: every failure is reported through
/// [`ConversionResult::error`].
pub trait DocumentConverter: Send + Sync + 'static {
    fn convert(
        &self,
        input: &Path,
        output_dir: Option<&Path>,
    ) -> impl Future<Output = ConversionResult> + Send;
}

/// Diagram renderer options for the given configuration.
///
/// `keep_temp` also keeps the renderer's workspace.
#[must_use]
pub fn render_options(config: &Config) -> RenderOptions {
    let diagrams = &config.diagrams;
    RenderOptions {
        command: diagrams.command.clone(),
        command_args: diagrams.args.clone(),
        theme: diagrams.theme.as_str().to_owned(),
        background_color: diagrams.background_color.clone(),
        width: diagrams.width,
        height: diagrams.height,
        format: diagrams.output_format,
        timeout: diagrams.timeout(),
        sandbox: diagrams.sandbox,
        browser_executable: diagrams.browser_executable.clone(),
        keep_workspace: config.keep_temp,
    }
}

/// Markdown to PDF converter.
///
/// `renderer_factory` creates one diagram renderer per document so that each
/// document owns its rendering workspace.
pub struct Converter<G, F> {
    config: Config,
    generator: G,
    renderer_factory: F,
}

/// Counts reported by a successful conversion.
struct DocumentStats {
    diagram_count: usize,
    diagram_failures: Vec<String>,
}

impl<G, F, R> Converter<G, F>
where
    G: PdfGenerator,
    F: Fn() -> R + Send + Sync,
    R: DiagramRenderer,
{
    #[must_use]
    pub fn new(config: Config, generator: G, renderer_factory: F) -> Self {
        Self {
            config,
            generator,
            renderer_factory,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Convert `input` into the PDF file `output`.
    pub async fn convert_to(&self, input: &Path, output: &Path) -> ConversionResult {
        let start = Instant::now();

        let work_dir = match tempfile::Builder::new().prefix("mdpdf-").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return ConversionResult::failed(
                    input,
                    format!("failed to create working directory: {e}"),
                    start.elapsed(),
                );
            }
        };

        let result = self.convert_in(input, output, work_dir.path()).await;

        if self.config.keep_temp {
            let kept = work_dir.keep();
            tracing::info!(path = %kept.display(), "Kept working directory");
        }

        let duration = start.elapsed();
        match result {
            Ok(stats) => {
                tracing::info!(
                    input = %input.display(),
                    output = %output.display(),
                    diagrams = stats.diagram_count,
                    "Converted document"
                );
                ConversionResult {
                    input: input.to_path_buf(),
                    output: Some(output.to_path_buf()),
                    success: true,
                    error: None,
                    diagram_count: stats.diagram_count,
                    diagram_failures: stats.diagram_failures,
                    duration,
                }
            }
            Err(e) => {
                tracing::warn!(input = %input.display(), error = %e, "Conversion failed");
                ConversionResult::failed(input, e.to_string(), duration)
            }
        }
    }

    async fn convert_in(
        &self,
        input: &Path,
        output: &Path,
        work_dir: &Path,
    ) -> Result<DocumentStats, BatchError> {
        let markdown =
            tokio::fs::read_to_string(input)
                .await
                .map_err(|source| BatchError::Read {
                    path: input.to_path_buf(),
                    source,
                })?;

        let source_dir = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let markdown = copy_assets(&markdown, source_dir, work_dir).await?;

        let pipeline = DocumentPipeline::new((self.renderer_factory)(), work_dir);
        let processed = pipeline.process(&markdown).await;
        if processed.diagram_count > 0 {
            tracing::debug!(
                input = %input.display(),
                diagrams = processed.diagram_count,
                failed = processed.failures.len(),
                "Processed diagrams"
            );
        }

        let title = input
            .file_stem()
            .map_or_else(|| "document".into(), |s| s.to_string_lossy());
        let html = render_html_document(&processed.text, &title, &self.config.style).await?;
        let html_path = work_dir.join(format!("{title}.html"));
        tokio::fs::write(&html_path, html).await?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.generator
            .generate(&html_path, output, &self.config.pdf)
            .await?;

        Ok(DocumentStats {
            diagram_count: processed.diagram_count,
            diagram_failures: processed.failures,
        })
    }
}

impl<G, F, R> DocumentConverter for Converter<G, F>
where
    G: PdfGenerator + 'static,
    F: Fn() -> R + Send + Sync + 'static,
    R: DiagramRenderer,
{
    async fn convert(&self, input: &Path, output_dir: Option<&Path>) -> ConversionResult {
        self.convert_to(input, &output_path_for(input, output_dir)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdpdf_config::{DiagramsConfig, MermaidTheme};
    use mdpdf_diagrams::ImageFormat;
    use mdpdf_diagrams::RenderOutcome;
    use mdpdf_pdf::PdfError;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    /// Renderer stand-in writing the diagram code as the image.
    struct CopyRenderer;

    impl DiagramRenderer for CopyRenderer {
        async fn render(&self, code: &str, output: &Path) -> RenderOutcome {
            if code.contains("FAIL") {
                return RenderOutcome::Failed("bad diagram".to_owned());
            }
            match tokio::fs::write(output, code).await {
                Ok(()) => RenderOutcome::Rendered(output.to_path_buf()),
                Err(e) => RenderOutcome::Failed(e.to_string()),
            }
        }
    }

    /// Generator stand-in: copies the HTML page to the output and remembers
    /// which files sat next to it.
    #[derive(Default, Clone)]
    struct HtmlCopyGenerator {
        work_files: Arc<Mutex<Vec<String>>>,
    }

    impl PdfGenerator for HtmlCopyGenerator {
        async fn generate(
            &self,
            html_path: &Path,
            output_path: &Path,
            _config: &mdpdf_config::PdfConfig,
        ) -> Result<(), PdfError> {
            let mut names: Vec<String> = std::fs::read_dir(html_path.parent().unwrap())?
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            *self.work_files.lock().unwrap() = names;
            if let Some(parent) = output_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(html_path, output_path).await?;
            Ok(())
        }
    }

    struct FailingGenerator;

    impl PdfGenerator for FailingGenerator {
        async fn generate(
            &self,
            _html_path: &Path,
            output_path: &Path,
            _config: &mdpdf_config::PdfConfig,
        ) -> Result<(), PdfError> {
            Err(PdfError::MissingOutput(output_path.to_path_buf()))
        }
    }

    fn converter<G: PdfGenerator>(generator: G) -> Converter<G, impl Fn() -> CopyRenderer + Send + Sync> {
        Converter::new(Config::default(), generator, || CopyRenderer)
    }

    #[test]
    fn test_render_options_from_config() {
        let config = Config {
            diagrams: DiagramsConfig {
                theme: MermaidTheme::Forest,
                output_format: ImageFormat::Svg,
                command: "npx".to_owned(),
                args: vec!["-y".to_owned(), "@mermaid-js/mermaid-cli".to_owned()],
                sandbox: false,
                timeout_secs: 5,
                ..DiagramsConfig::default()
            },
            keep_temp: true,
            ..Config::default()
        };

        let options = render_options(&config);

        assert_eq!(options.theme, "forest");
        assert_eq!(options.format, ImageFormat::Svg);
        assert_eq!(options.command, "npx");
        assert_eq!(options.command_args.len(), 2);
        assert!(!options.sandbox);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert!(options.keep_workspace);
        assert!(!render_options(&Config::default()).keep_workspace);
    }

    #[tokio::test]
    async fn test_convert_document_with_diagrams() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("guide.md");
        std::fs::write(
            &input,
            "# Guide\n\n```mermaid\ngraph TD\n```\n\n```mermaid\nFAIL\n```\n",
        )
        .unwrap();
        let generator = HtmlCopyGenerator::default();
        let converter = converter(generator.clone());

        let result = converter.convert(&input, None).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output, Some(dir.path().join("guide.pdf")));
        assert_eq!(result.diagram_count, 2);
        assert_eq!(result.diagram_failures, vec!["Diagram 2: bad diagram".to_owned()]);

        let page = std::fs::read_to_string(dir.path().join("guide.pdf")).unwrap();
        assert!(page.contains("<title>guide</title>"));
        assert!(page.contains("src=\"diagram-1.png\""));
        assert!(page.contains("FAIL"));
        assert_eq!(
            *generator.work_files.lock().unwrap(),
            vec!["diagram-1.png".to_owned(), "guide.html".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_convert_into_output_dir_copies_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("img")).unwrap();
        std::fs::write(dir.path().join("img/logo.png"), "png").unwrap();
        let input = dir.path().join("readme.md");
        std::fs::write(&input, "![Logo](img/logo.png)\n").unwrap();
        let out_dir = dir.path().join("pdf");
        let generator = HtmlCopyGenerator::default();
        let converter = converter(generator.clone());

        let result = converter.convert(&input, Some(&out_dir)).await;

        assert!(result.success);
        assert_eq!(result.output, Some(out_dir.join("readme.pdf")));
        assert!(out_dir.join("readme.pdf").exists());
        assert!(generator.work_files.lock().unwrap().contains(&"img".to_owned()));
    }

    #[tokio::test]
    async fn test_convert_to_explicit_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.md");
        std::fs::write(&input, "# Notes\n").unwrap();
        let output = dir.path().join("out/final.pdf");
        let converter = converter(HtmlCopyGenerator::default());

        let result = converter.convert_to(&input, &output).await;

        assert!(result.success);
        assert_eq!(result.output.as_deref(), Some(output.as_path()));
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_convert_missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let converter = converter(HtmlCopyGenerator::default());

        let result = converter.convert(&dir.path().join("nope.md"), None).await;

        assert!(!result.success);
        assert!(result.output.is_none());
        assert!(result.error.unwrap().contains("nope.md"));
    }

    #[tokio::test]
    async fn test_convert_generator_failure_fails_document() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.md");
        std::fs::write(&input, "# Doc\n").unwrap();
        let converter = converter(FailingGenerator);

        let result = converter.convert(&input, None).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("no output"));
    }

    #[test]
    fn test_failed_result() {
        let result = ConversionResult::failed("a.md", "boom", Duration::from_millis(3));

        assert!(!result.success);
        assert_eq!(result.input, PathBuf::from("a.md"));
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.diagram_count, 0);
    }
}
