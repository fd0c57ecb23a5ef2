//! PDF generation through an external HTML-to-PDF engine.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use mdpdf_config::PdfConfig;
use tokio::process::Command;

use crate::PdfError;
use crate::html::wrap_fragment;

/// Default PDF engine executable.
pub const DEFAULT_PDF_COMMAND: &str = "wkhtmltopdf";

/// Default wall-clock limit for one PDF.
pub const DEFAULT_PDF_TIMEOUT: Duration = Duration::from_secs(120);

/// Turns an HTML file into a PDF file.
pub trait PdfGenerator: Send + Sync {
    /// Write the PDF for `html_path` to `output_path`.
    fn generate(
        &self,
        html_path: &Path,
        output_path: &Path,
        config: &PdfConfig,
    ) -> impl Future<Output = Result<(), PdfError>> + Send;

    /// Generate the PDF for `html_path` and return its bytes.
    ///
    /// Goes through a temporary file that is removed before returning.
    fn generate_bytes(
        &self,
        html_path: &Path,
        config: &PdfConfig,
    ) -> impl Future<Output = Result<Vec<u8>, PdfError>> + Send {
        async move {
            let dir = tempfile::Builder::new().prefix("mdpdf-pdf-").tempdir()?;
            let output = dir.path().join("output.pdf");
            self.generate(html_path, &output, config).await?;
            Ok(tokio::fs::read(&output).await?)
        }
    }
}

/// `wkhtmltopdf` driver.
#[derive(Debug, Clone)]
pub struct WkhtmltopdfGenerator {
    command: String,
    command_args: Vec<String>,
    timeout: Duration,
}

impl Default for WkhtmltopdfGenerator {
    fn default() -> Self {
        Self {
            command: DEFAULT_PDF_COMMAND.to_owned(),
            command_args: Vec::new(),
            timeout: DEFAULT_PDF_TIMEOUT,
        }
    }
}

impl WkhtmltopdfGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different engine executable.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Arguments placed before the generated ones (e.g. for `xvfb-run`).
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.command_args = args;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, args: Vec<OsString>, output_path: &Path) -> Result<(), PdfError> {
        let child = Command::new(&self.command)
            .args(&self.command_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PdfError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| PdfError::Timeout(self.timeout))??;

        if !result.status.success() {
            return Err(PdfError::Exit {
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_owned(),
            });
        }

        if !tokio::fs::try_exists(output_path).await.unwrap_or(false) {
            return Err(PdfError::MissingOutput(output_path.to_path_buf()));
        }

        Ok(())
    }
}

impl PdfGenerator for WkhtmltopdfGenerator {
    async fn generate(
        &self,
        html_path: &Path,
        output_path: &Path,
        config: &PdfConfig,
    ) -> Result<(), PdfError> {
        if let Some(ranges) = &config.page_ranges {
            tracing::warn!(page_ranges = %ranges, "Page ranges are not supported by wkhtmltopdf; printing all pages");
        }

        // Header and footer templates must be standalone HTML files.
        let templates = tempfile::Builder::new()
            .prefix("mdpdf-templates-")
            .tempdir()?;
        let mut header = None;
        let mut footer = None;
        if config.display_header_footer {
            if let Some(template) = &config.header_template {
                let path = templates.path().join("header.html");
                tokio::fs::write(&path, wrap_fragment(template)).await?;
                header = Some(path);
            }
            if let Some(template) = &config.footer_template {
                let path = templates.path().join("footer.html");
                tokio::fs::write(&path, wrap_fragment(template)).await?;
                footer = Some(path);
            }
        }

        if let Some(parent) = output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = build_args(
            config,
            &Templates {
                header: header.as_deref(),
                footer: footer.as_deref(),
            },
            html_path,
            output_path,
        );
        self.run(args, output_path).await?;

        tracing::debug!(output = %output_path.display(), "Generated PDF");
        Ok(())
    }
}

/// Paths of header/footer template files, when used.
#[derive(Debug, Default)]
struct Templates<'a> {
    header: Option<&'a Path>,
    footer: Option<&'a Path>,
}

/// Command-line arguments for one `wkhtmltopdf` run.
fn build_args(
    config: &PdfConfig,
    templates: &Templates<'_>,
    html_path: &Path,
    output_path: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--quiet".into(), "--encoding".into(), "utf-8".into()];
    let mut push = |flag: &str, value: &str| {
        args.push(flag.into());
        args.push(value.into());
    };

    if !config.prefer_css_page_size {
        match (&config.width, &config.height) {
            (Some(width), Some(height)) => {
                push("--page-width", width);
                push("--page-height", height);
            }
            _ => push("--page-size", &config.format),
        }
    }

    push("-T", &config.margin.top);
    push("-R", &config.margin.right);
    push("-B", &config.margin.bottom);
    push("-L", &config.margin.left);

    if config.landscape {
        push("-O", "Landscape");
    }
    if (config.scale - 1.0).abs() > f64::EPSILON {
        push("--zoom", &config.scale.to_string());
    }

    args.push(if config.print_background {
        "--background".into()
    } else {
        "--no-background".into()
    });

    if let Some(header) = templates.header {
        args.push("--header-html".into());
        args.push(header.into());
    }
    if let Some(footer) = templates.footer {
        args.push("--footer-html".into());
        args.push(footer.into());
    }

    args.push("--enable-local-file-access".into());
    args.push(html_path.into());
    args.push(output_path.into());
    args
}

/// Output path for a markdown input: same stem with a `.pdf` extension,
/// inside `output_dir` when given, else next to the input.
#[must_use]
pub fn output_path_for(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let name = input.with_extension("pdf");
    match (output_dir, name.file_name()) {
        (Some(dir), Some(file)) => dir.join(file),
        _ => name,
    }
}
