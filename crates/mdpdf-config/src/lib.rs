//! Configuration management for mdpdf.
//!
//! Parses `mdpdf.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Configuration is layered: built-in defaults, then a config file, then
//! caller overrides (a [`ConfigLayer`] built from command-line flags).
//! Layers are merged field by field, so an override that sets only
//! `pdf.margin.top` keeps every other margin from the file.
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `diagrams.command`
//! - `diagrams.browser_executable`
//! - `style.css_file`

mod expand;
mod init;
mod layer;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use mdpdf_diagrams::{
    DEFAULT_BACKGROUND, DEFAULT_COMMAND, DEFAULT_HEIGHT, DEFAULT_TIMEOUT, DEFAULT_WIDTH,
};
use serde::Deserialize;

pub use init::{INIT_TEMPLATE, write_init};
pub use mdpdf_diagrams::ImageFormat;
pub use layer::{
    BatchLayer, ConfigLayer, DiagramsLayer, MarginLayer, PdfLayer, StyleLayer, WatchLayer,
};

/// Configuration filenames to search for, in order of preference.
pub const CONFIG_FILENAMES: [&str; 2] = ["mdpdf.toml", ".mdpdf.toml"];

const MIN_SCALE: f64 = 0.1;
const MAX_SCALE: f64 = 2.0;

/// Application configuration with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// PDF generation options.
    pub pdf: PdfConfig,
    /// Diagram rendering options.
    pub diagrams: DiagramsConfig,
    /// Stylesheet options.
    pub style: StyleConfig,
    /// Batch conversion options.
    pub batch: BatchConfig,
    /// Watch mode options.
    pub watch: WatchConfig,
    /// Keep per-document working directories after conversion.
    pub keep_temp: bool,
    /// Path to the config file (set when one was loaded).
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve(ConfigLayer::default(), None)
    }
}

/// PDF page options.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfConfig {
    /// Paper size name (e.g. `A4`, `Letter`).
    pub format: String,
    pub margin: Margin,
    pub print_background: bool,
    pub landscape: bool,
    /// HTML fragment placed in the page header.
    pub header_template: Option<String>,
    /// HTML fragment placed in the page footer.
    pub footer_template: Option<String>,
    /// Whether header and footer templates are used at all.
    pub display_header_footer: bool,
    /// Content zoom factor in `[0.1, 2]`.
    pub scale: f64,
    /// Explicit page width; takes precedence over `format` together with `height`.
    pub width: Option<String>,
    pub height: Option<String>,
    /// Page ranges to print (e.g. `1-5, 8`).
    pub page_ranges: Option<String>,
    /// Let CSS `@page` rules decide the page size.
    pub prefer_css_page_size: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            format: "A4".to_owned(),
            margin: Margin::default(),
            print_background: true,
            landscape: false,
            header_template: None,
            footer_template: None,
            display_header_footer: false,
            scale: 1.0,
            width: None,
            height: None,
            page_ranges: None,
            prefer_css_page_size: false,
        }
    }
}

/// Page margins as CSS lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Margin {
    pub top: String,
    pub right: String,
    pub bottom: String,
    pub left: String,
}

impl Default for Margin {
    fn default() -> Self {
        let side = || "20mm".to_owned();
        Self {
            top: side(),
            right: side(),
            bottom: side(),
            left: side(),
        }
    }
}

/// Mermaid theme.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MermaidTheme {
    #[default]
    Default,
    Forest,
    Dark,
    Neutral,
    Base,
}

impl MermaidTheme {
    /// Theme name as understood by the rendering engine.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Forest => "forest",
            Self::Dark => "dark",
            Self::Neutral => "neutral",
            Self::Base => "base",
        }
    }
}

impl FromStr for MermaidTheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "forest" => Ok(Self::Forest),
            "dark" => Ok(Self::Dark),
            "neutral" => Ok(Self::Neutral),
            "base" => Ok(Self::Base),
            other => Err(format!(
                "unknown theme '{other}' (expected default, forest, dark, neutral or base)"
            )),
        }
    }
}

impl fmt::Display for MermaidTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagram rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramsConfig {
    pub theme: MermaidTheme,
    pub background_color: String,
    pub width: u32,
    pub height: u32,
    pub output_format: ImageFormat,
    /// Rendering engine executable.
    pub command: String,
    /// Arguments placed before the render arguments.
    pub args: Vec<String>,
    /// Custom headless browser binary for the engine.
    pub browser_executable: Option<PathBuf>,
    /// Keep the headless browser sandbox enabled.
    pub sandbox: bool,
    pub timeout_secs: u64,
}

impl DiagramsConfig {
    /// Wall-clock limit for one diagram render.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            theme: MermaidTheme::default(),
            background_color: DEFAULT_BACKGROUND.to_owned(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            output_format: ImageFormat::default(),
            command: DEFAULT_COMMAND.to_owned(),
            args: Vec::new(),
            browser_executable: None,
            sandbox: true,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// Stylesheet options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleConfig {
    /// Extra stylesheet file (absolute after loading).
    pub css_file: Option<PathBuf>,
    /// Inline CSS appended last.
    pub css: Option<String>,
    /// Code highlight theme name.
    pub highlight_theme: String,
    /// Class added to the `<body>` element.
    pub body_class: Option<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            css_file: None,
            css: None,
            highlight_theme: "github".to_owned(),
            body_class: None,
        }
    }
}

/// Batch conversion options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of documents converted concurrently per group.
    pub concurrency: usize,
    /// Keep starting new groups after a failure.
    pub continue_on_error: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            continue_on_error: false,
        }
    }
}

/// Watch mode options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl WatchConfig {
    /// Quiet period before a changed file is converted.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Refusing to overwrite an existing file.
    #[error("Configuration file already exists: {} (use --force to overwrite)", .0.display())]
    AlreadyExists(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`diagrams.command`").
        field: String,
        /// Error message (e.g., "${`MMDC`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a numeric field to be non-zero.
fn require_positive<T: PartialEq + Default>(value: T, field: &str) -> Result<(), ConfigError> {
    if value == T::default() {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional caller overrides.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdpdf.toml` or `.mdpdf.toml` in the current
    /// directory and its parents. Without a file only defaults and overrides
    /// apply.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing or
    /// expansion fails, or the merged configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        overrides: Option<&ConfigLayer>,
    ) -> Result<Self, ConfigError> {
        let (file_layer, source) = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            (Self::load_layer(path)?, Some(path.to_path_buf()))
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_config(&cwd))
        {
            (Self::load_layer(&discovered)?, Some(discovered))
        } else {
            (ConfigLayer::default(), None)
        };

        let merged = match overrides {
            Some(overrides) => file_layer.merge(overrides.clone()),
            None => file_layer,
        };

        let config = Self::resolve(merged, source);
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from a single merged layer on top of defaults.
    #[must_use]
    pub fn from_layer(layer: ConfigLayer) -> Self {
        Self::resolve(layer, None)
    }

    /// Search for a config file in `start` and its parents.
    #[must_use]
    pub fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            for name in CONFIG_FILENAMES {
                let candidate = current.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Read one config file into a layer with env vars expanded and paths resolved.
    fn load_layer(path: &Path) -> Result<ConfigLayer, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut layer = ConfigLayer::from_toml(&content)?;

        // Expand environment variables before path resolution
        layer.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        layer.resolve_paths(config_dir);

        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(layer)
    }

    fn resolve(layer: ConfigLayer, config_path: Option<PathBuf>) -> Self {
        let ConfigLayer {
            pdf,
            diagrams,
            style,
            batch,
            watch,
            keep_temp,
        } = layer;

        let pdf_defaults = PdfConfig::default();
        let margin_defaults = Margin::default();
        let diagram_defaults = DiagramsConfig::default();
        let style_defaults = StyleConfig::default();
        let batch_defaults = BatchConfig::default();

        Self {
            pdf: PdfConfig {
                format: pdf.format.unwrap_or(pdf_defaults.format),
                margin: Margin {
                    top: pdf.margin.top.unwrap_or(margin_defaults.top),
                    right: pdf.margin.right.unwrap_or(margin_defaults.right),
                    bottom: pdf.margin.bottom.unwrap_or(margin_defaults.bottom),
                    left: pdf.margin.left.unwrap_or(margin_defaults.left),
                },
                print_background: pdf.print_background.unwrap_or(pdf_defaults.print_background),
                landscape: pdf.landscape.unwrap_or(pdf_defaults.landscape),
                header_template: pdf.header_template,
                footer_template: pdf.footer_template,
                display_header_footer: pdf
                    .display_header_footer
                    .unwrap_or(pdf_defaults.display_header_footer),
                scale: pdf.scale.unwrap_or(pdf_defaults.scale),
                width: pdf.width,
                height: pdf.height,
                page_ranges: pdf.page_ranges,
                prefer_css_page_size: pdf
                    .prefer_css_page_size
                    .unwrap_or(pdf_defaults.prefer_css_page_size),
            },
            diagrams: DiagramsConfig {
                theme: diagrams.theme.unwrap_or(diagram_defaults.theme),
                background_color: diagrams
                    .background_color
                    .unwrap_or(diagram_defaults.background_color),
                width: diagrams.width.unwrap_or(diagram_defaults.width),
                height: diagrams.height.unwrap_or(diagram_defaults.height),
                output_format: diagrams
                    .output_format
                    .unwrap_or(diagram_defaults.output_format),
                command: diagrams.command.unwrap_or(diagram_defaults.command),
                args: diagrams.args.unwrap_or_default(),
                browser_executable: diagrams.browser_executable,
                sandbox: diagrams.sandbox.unwrap_or(diagram_defaults.sandbox),
                timeout_secs: diagrams.timeout_secs.unwrap_or(diagram_defaults.timeout_secs),
            },
            style: StyleConfig {
                css_file: style.css_file,
                css: style.css,
                highlight_theme: style
                    .highlight_theme
                    .unwrap_or(style_defaults.highlight_theme),
                body_class: style.body_class,
            },
            batch: BatchConfig {
                concurrency: batch.concurrency.unwrap_or(batch_defaults.concurrency),
                continue_on_error: batch
                    .continue_on_error
                    .unwrap_or(batch_defaults.continue_on_error),
            },
            watch: WatchConfig {
                debounce_ms: watch
                    .debounce_ms
                    .unwrap_or(WatchConfig::default().debounce_ms),
            },
            keep_temp: keep_temp.unwrap_or(false),
            config_path,
        }
    }

    /// Validate configuration values.
    ///
    /// Called automatically by [`load`](Self::load).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_pdf()?;
        self.validate_diagrams()?;
        require_positive(self.batch.concurrency, "batch.concurrency")?;
        Ok(())
    }

    fn validate_pdf(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.pdf.format, "pdf.format")?;

        let scale = self.pdf.scale;
        if !(MIN_SCALE..=MAX_SCALE).contains(&scale) {
            return Err(ConfigError::Validation(format!(
                "pdf.scale must be between {MIN_SCALE} and {MAX_SCALE}, got {scale}"
            )));
        }

        if self.pdf.width.is_some() != self.pdf.height.is_some() {
            return Err(ConfigError::Validation(
                "pdf.width and pdf.height must be set together".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        let diagrams = &self.diagrams;
        require_non_empty(&diagrams.command, "diagrams.command")?;
        require_non_empty(&diagrams.background_color, "diagrams.background_color")?;
        require_positive(diagrams.width, "diagrams.width")?;
        require_positive(diagrams.height, "diagrams.height")?;
        require_positive(diagrams.timeout_secs, "diagrams.timeout_secs")?;
        Ok(())
    }
}
