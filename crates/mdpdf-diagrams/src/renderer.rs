//! Diagram rendering through an external engine.
//!
//! [`DiagramRenderer`] is the seam between the document pipeline and the
//! engine that turns diagram source into an image. [`MermaidRenderer`] drives
//! the Mermaid CLI (`mmdc`) as a subprocess.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::process::Command;

use crate::consts::{
    DEFAULT_BACKGROUND, DEFAULT_COMMAND, DEFAULT_HEIGHT, DEFAULT_THEME, DEFAULT_TIMEOUT,
    DEFAULT_WIDTH, STDERR_TAIL_BYTES,
};
use crate::format::ImageFormat;
use crate::workspace::Workspace;

/// Result of rendering one diagram.
///
/// Failures are values: a failed render never aborts sibling diagrams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Image written to the contained path.
    Rendered(PathBuf),
    /// Rendering failed with the contained detail message.
    Failed(String),
}

impl RenderOutcome {
    /// Whether the diagram was rendered.
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }
}

/// Renders diagram source code to an image file.
pub trait DiagramRenderer: Send + Sync {
    /// Render `code` to `output`.
    ///
    /// Must not panic or return early on engine errors: every failure is
    /// reported as [`RenderOutcome::Failed`].
    fn render(&self, code: &str, output: &Path) -> impl Future<Output = RenderOutcome> + Send;

    /// Image format written by [`render`](Self::render).
    fn format(&self) -> ImageFormat {
        ImageFormat::Png
    }

    /// Release intermediate resources held by the renderer.
    fn cleanup(&self) {}
}

/// Error raised while driving the rendering engine.
///
/// Converted into [`RenderOutcome::Failed`] at the renderer boundary.
#[derive(Debug, thiserror::Error)]
pub(crate) enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("renderer timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("renderer exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    #[error("process succeeded but produced no output at {}", .0.display())]
    MissingOutput(PathBuf),
}

/// Options for the Mermaid CLI renderer.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Engine executable.
    pub command: String,
    /// Arguments placed before the render arguments (e.g. for `npx`).
    pub command_args: Vec<String>,
    /// Mermaid theme name.
    pub theme: String,
    /// Background color passed to the engine.
    pub background_color: String,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Image format to produce.
    pub format: ImageFormat,
    /// Wall-clock limit for a single render.
    pub timeout: Duration,
    /// Whether the headless browser keeps its sandbox enabled.
    pub sandbox: bool,
    /// Custom browser binary for the engine.
    pub browser_executable: Option<PathBuf>,
    /// Leave the workspace (sources and option files) on disk at cleanup.
    pub keep_workspace: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_owned(),
            command_args: Vec::new(),
            theme: DEFAULT_THEME.to_owned(),
            background_color: DEFAULT_BACKGROUND.to_owned(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            format: ImageFormat::default(),
            timeout: DEFAULT_TIMEOUT,
            sandbox: true,
            browser_executable: None,
            keep_workspace: false,
        }
    }
}

impl RenderOptions {
    /// Rendering options artifact (`-c` file).
    fn render_config(&self) -> Value {
        json!({
            "theme": self.theme,
            "themeVariables": { "background": self.background_color },
        })
    }

    /// Execution environment artifact (`-p` file).
    fn execution_config(&self) -> Value {
        let mut config = json!({});
        if !self.sandbox {
            config["args"] = json!(["--no-sandbox", "--disable-setuid-sandbox"]);
        }
        if let Some(executable) = &self.browser_executable {
            config["executablePath"] = json!(executable.display().to_string());
        }
        config
    }
}

/// Renderer backed by the Mermaid CLI.
///
/// Each instance owns one [`Workspace`]; create one renderer per document so
/// workspaces are never shared between concurrently processed documents.
///
/// # Example
///
/// ```ignore
/// use mdpdf_diagrams::{DiagramRenderer, MermaidRenderer, RenderOptions};
///
/// let renderer = MermaidRenderer::new(RenderOptions::default());
/// let outcome = renderer.render("graph TD\n  A --> B", "out/diagram-1.png".as_ref()).await;
/// renderer.cleanup();
/// ```
#[derive(Debug)]
pub struct MermaidRenderer {
    options: RenderOptions,
    workspace: Workspace,
}

impl MermaidRenderer {
    /// Create a renderer with the given options.
    #[must_use]
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            workspace: Workspace::new("mdpdf-render-"),
        }
    }

    /// Renderer options.
    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Workspace holding intermediate render files.
    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    async fn try_render(&self, code: &str, output: &Path) -> Result<(), RenderError> {
        let input = self.workspace.unique_file("diagram", "mmd")?;
        let render_config = self.workspace.unique_file("config", "json")?;
        let execution_config = self.workspace.unique_file("exec", "json")?;

        tokio::fs::write(&input, code).await?;
        tokio::fs::write(&render_config, self.options.render_config().to_string()).await?;
        tokio::fs::write(&execution_config, self.options.execution_config().to_string()).await?;

        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut command = Command::new(&self.options.command);
        command
            .args(&self.options.command_args)
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(output)
            .arg("-c")
            .arg(&render_config)
            .arg("-p")
            .arg(&execution_config)
            .arg("-w")
            .arg(self.options.width.to_string())
            .arg("-H")
            .arg(self.options.height.to_string())
            .arg("-b")
            .arg(&self.options.background_color)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| RenderError::Spawn {
            command: self.options.command.clone(),
            source,
        })?;

        // Dropping the wait future on timeout kills the child (kill_on_drop).
        let result = tokio::time::timeout(self.options.timeout, child.wait_with_output())
            .await
            .map_err(|_| RenderError::Timeout(self.options.timeout))??;

        if !result.status.success() {
            return Err(RenderError::Exit {
                status: result.status,
                stderr: stderr_tail(&result.stderr),
            });
        }

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(RenderError::MissingOutput(output.to_path_buf()));
        }

        Ok(())
    }
}

impl DiagramRenderer for MermaidRenderer {
    async fn render(&self, code: &str, output: &Path) -> RenderOutcome {
        match self.try_render(code, output).await {
            Ok(()) => {
                tracing::debug!(output = %output.display(), "Rendered diagram");
                RenderOutcome::Rendered(output.to_path_buf())
            }
            Err(e) => {
                tracing::debug!(output = %output.display(), error = %e, "Diagram render failed");
                RenderOutcome::Failed(e.to_string())
            }
        }
    }

    fn format(&self) -> ImageFormat {
        self.options.format
    }

    fn cleanup(&self) {
        if self.options.keep_workspace {
            if let Some(path) = self.workspace.keep() {
                tracing::info!(path = %path.display(), "Kept render workspace");
            }
        } else {
            self.workspace.cleanup();
        }
    }
}

/// Last part of the engine's stderr, trimmed for failure messages.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    if trimmed.len() <= STDERR_TAIL_BYTES {
        return trimmed.to_owned();
    }
    let mut cut = trimmed.len() - STDERR_TAIL_BYTES;
    while !trimmed.is_char_boundary(cut) {
        cut += 1;
    }
    format!("…{}", &trimmed[cut..])
}
