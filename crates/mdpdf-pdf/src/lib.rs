//! HTML and PDF output for mdpdf.
//!
//! - [`markdown_to_html`] and [`render_page`] build a standalone HTML page
//! - [`build_stylesheet`] assembles the page CSS from configuration
//! - [`copy_assets`] makes local images available next to the page
//! - [`PdfGenerator`] turns the page into a PDF; [`WkhtmltopdfGenerator`]
//!   drives `wkhtmltopdf`

mod assets;
mod generator;
mod html;
mod style;

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use mdpdf_config::StyleConfig;

pub use assets::copy_assets;
pub use generator::{
    DEFAULT_PDF_COMMAND, DEFAULT_PDF_TIMEOUT, PdfGenerator, WkhtmltopdfGenerator, output_path_for,
};
pub use html::{PageData, markdown_to_html, parser_options, render_page, wrap_fragment};
pub use style::{build_stylesheet, highlight_css};

/// Error producing HTML or PDF output.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read stylesheet {}: {source}", path.display())]
    Stylesheet {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("PDF generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("PDF generator exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    #[error("PDF generator produced no output at {}", .0.display())]
    MissingOutput(PathBuf),
}

/// Render `markdown` into a complete HTML page styled per `style`.
///
/// # Errors
///
/// Returns `PdfError::Stylesheet` if the configured CSS file cannot be read.
pub async fn render_html_document(
    markdown: &str,
    title: &str,
    style: &StyleConfig,
) -> Result<String, PdfError> {
    let stylesheet = build_stylesheet(style).await?;
    let body_html = markdown_to_html(markdown);
    Ok(render_page(&PageData {
        title,
        body_html: &body_html,
        stylesheet: &stylesheet,
        body_class: style.body_class.as_deref(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn render_html_document_combines_parts() {
        let style = StyleConfig {
            css: Some(".custom { color: teal; }".to_owned()),
            body_class: Some("report".to_owned()),
            ..StyleConfig::default()
        };

        let html = render_html_document("# Hello\n\n![Diagram 1](diagram-1.png)", "hello", &style)
            .await
            .unwrap();

        assert!(html.contains("<title>hello</title>"));
        assert!(html.contains(".custom { color: teal; }"));
        assert!(html.contains("<body class=\"report\">"));
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("src=\"diagram-1.png\""));
    }
}
