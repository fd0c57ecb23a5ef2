//! Partial configuration layers.
//!
//! A layer is what one source contributes: a config file, or the overrides a
//! caller builds from command-line flags. Every field is optional; layers are
//! merged field by field and the result is resolved against built-in
//! defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{ConfigError, ImageFormat, MermaidTheme, expand};

/// One configuration source.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    /// `[pdf]` section.
    pub pdf: PdfLayer,
    /// `[diagrams]` section.
    pub diagrams: DiagramsLayer,
    /// `[style]` section.
    pub style: StyleLayer,
    /// `[batch]` section.
    pub batch: BatchLayer,
    /// `[watch]` section.
    pub watch: WatchLayer,
    /// Keep per-document working directories after conversion.
    pub keep_temp: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PdfLayer {
    pub format: Option<String>,
    pub margin: MarginLayer,
    pub print_background: Option<bool>,
    pub landscape: Option<bool>,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
    pub display_header_footer: Option<bool>,
    pub scale: Option<f64>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub page_ranges: Option<String>,
    pub prefer_css_page_size: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct MarginLayer {
    pub top: Option<String>,
    pub right: Option<String>,
    pub bottom: Option<String>,
    pub left: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DiagramsLayer {
    pub theme: Option<MermaidTheme>,
    pub background_color: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub output_format: Option<ImageFormat>,
    pub command: Option<String>,
    /// Arguments placed before the render arguments, e.g. `["-y", "@mermaid-js/mermaid-cli"]` with `npx`.
    pub args: Option<Vec<String>>,
    pub browser_executable: Option<PathBuf>,
    pub sandbox: Option<bool>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct StyleLayer {
    pub css_file: Option<PathBuf>,
    pub css: Option<String>,
    pub highlight_theme: Option<String>,
    pub body_class: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct BatchLayer {
    pub concurrency: Option<usize>,
    pub continue_on_error: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct WatchLayer {
    pub debounce_ms: Option<u64>,
}

/// Replace `base` with `overlay` when the overlay is set.
fn overlay<T>(base: &mut Option<T>, overlay: Option<T>) {
    if overlay.is_some() {
        *base = overlay;
    }
}

impl ConfigLayer {
    /// Parse a layer from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the text is not valid for this layout.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Merge `other` on top of this layer. Fields set in `other` win.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.pdf.merge(other.pdf);
        self.diagrams.merge(other.diagrams);
        self.style.merge(other.style);
        overlay(&mut self.batch.concurrency, other.batch.concurrency);
        overlay(&mut self.batch.continue_on_error, other.batch.continue_on_error);
        overlay(&mut self.watch.debounce_ms, other.watch.debounce_ms);
        overlay(&mut self.keep_temp, other.keep_temp);
        self
    }

    /// Expand `${VAR}` references in the fields that accept them.
    pub(crate) fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(command) = &self.diagrams.command {
            self.diagrams.command = Some(expand::expand_env(command, "diagrams.command")?);
        }
        if let Some(path) = &self.diagrams.browser_executable {
            self.diagrams.browser_executable =
                Some(expand::expand_env_path(path, "diagrams.browser_executable")?);
        }
        if let Some(path) = &self.style.css_file {
            self.style.css_file = Some(expand::expand_env_path(path, "style.css_file")?);
        }
        Ok(())
    }

    /// Resolve relative paths against the directory of the file this layer came from.
    pub(crate) fn resolve_paths(&mut self, config_dir: &Path) {
        if let Some(css_file) = &self.style.css_file
            && css_file.is_relative()
        {
            self.style.css_file = Some(config_dir.join(css_file));
        }
    }
}

impl PdfLayer {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.format, other.format);
        overlay(&mut self.margin.top, other.margin.top);
        overlay(&mut self.margin.right, other.margin.right);
        overlay(&mut self.margin.bottom, other.margin.bottom);
        overlay(&mut self.margin.left, other.margin.left);
        overlay(&mut self.print_background, other.print_background);
        overlay(&mut self.landscape, other.landscape);
        overlay(&mut self.header_template, other.header_template);
        overlay(&mut self.footer_template, other.footer_template);
        overlay(&mut self.display_header_footer, other.display_header_footer);
        overlay(&mut self.scale, other.scale);
        overlay(&mut self.width, other.width);
        overlay(&mut self.height, other.height);
        overlay(&mut self.page_ranges, other.page_ranges);
        overlay(&mut self.prefer_css_page_size, other.prefer_css_page_size);
    }
}

impl DiagramsLayer {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.theme, other.theme);
        overlay(&mut self.background_color, other.background_color);
        overlay(&mut self.width, other.width);
        overlay(&mut self.height, other.height);
        overlay(&mut self.output_format, other.output_format);
        overlay(&mut self.command, other.command);
        overlay(&mut self.args, other.args);
        overlay(&mut self.browser_executable, other.browser_executable);
        overlay(&mut self.sandbox, other.sandbox);
        overlay(&mut self.timeout_secs, other.timeout_secs);
    }
}

impl StyleLayer {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.css_file, other.css_file);
        overlay(&mut self.css, other.css);
        overlay(&mut self.highlight_theme, other.highlight_theme);
        overlay(&mut self.body_class, other.body_class);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_empty_layer() {
        let layer = ConfigLayer::from_toml("").unwrap();
        assert!(layer.pdf.format.is_none());
        assert!(layer.diagrams.theme.is_none());
        assert!(layer.keep_temp.is_none());
    }

    #[test]
    fn test_parse_all_sections() {
        let toml = r#"
keep_temp = true

[pdf]
format = "Letter"
landscape = true
scale = 0.8

[pdf.margin]
top = "1in"

[diagrams]
theme = "forest"
output_format = "svg"
command = "npx"
args = ["-y", "@mermaid-js/mermaid-cli"]

[style]
css = "body { color: red; }"

[batch]
concurrency = 8

[watch]
debounce_ms = 250
"#;
        let layer = ConfigLayer::from_toml(toml).unwrap();

        assert_eq!(layer.keep_temp, Some(true));
        assert_eq!(layer.pdf.format.as_deref(), Some("Letter"));
        assert_eq!(layer.pdf.landscape, Some(true));
        assert_eq!(layer.pdf.scale, Some(0.8));
        assert_eq!(layer.pdf.margin.top.as_deref(), Some("1in"));
        assert!(layer.pdf.margin.left.is_none());
        assert_eq!(layer.diagrams.theme, Some(MermaidTheme::Forest));
        assert_eq!(layer.diagrams.output_format, Some(ImageFormat::Svg));
        assert_eq!(
            layer.diagrams.args,
            Some(vec!["-y".to_owned(), "@mermaid-js/mermaid-cli".to_owned()])
        );
        assert_eq!(layer.style.css.as_deref(), Some("body { color: red; }"));
        assert_eq!(layer.batch.concurrency, Some(8));
        assert_eq!(layer.watch.debounce_ms, Some(250));
    }

    #[test]
    fn test_parse_unknown_theme_fails() {
        let result = ConfigLayer::from_toml("[diagrams]\ntheme = \"sepia\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_merge_is_field_by_field() {
        let file = ConfigLayer::from_toml(
            r#"
[pdf]
format = "Letter"
landscape = false

[pdf.margin]
top = "1in"
bottom = "1in"
"#,
        )
        .unwrap();
        let overrides = ConfigLayer::from_toml(
            r#"
[pdf]
landscape = true

[pdf.margin]
top = "5mm"
"#,
        )
        .unwrap();

        let merged = file.merge(overrides);

        assert_eq!(merged.pdf.format.as_deref(), Some("Letter"));
        assert_eq!(merged.pdf.landscape, Some(true));
        assert_eq!(merged.pdf.margin.top.as_deref(), Some("5mm"));
        assert_eq!(merged.pdf.margin.bottom.as_deref(), Some("1in"));
    }

    #[test]
    fn test_merge_unset_override_keeps_base() {
        let mut base = ConfigLayer::default();
        base.keep_temp = Some(true);
        base.diagrams.theme = Some(MermaidTheme::Dark);

        let merged = base.merge(ConfigLayer::default());

        assert_eq!(merged.keep_temp, Some(true));
        assert_eq!(merged.diagrams.theme, Some(MermaidTheme::Dark));
    }

    #[test]
    fn test_resolve_relative_css_file() {
        let mut layer = ConfigLayer::default();
        layer.style.css_file = Some(PathBuf::from("styles/print.css"));

        layer.resolve_paths(Path::new("/project"));

        assert_eq!(
            layer.style.css_file,
            Some(PathBuf::from("/project/styles/print.css"))
        );
    }

    #[test]
    fn test_resolve_keeps_absolute_css_file() {
        let mut layer = ConfigLayer::default();
        layer.style.css_file = Some(PathBuf::from("/etc/print.css"));

        layer.resolve_paths(Path::new("/project"));

        assert_eq!(layer.style.css_file, Some(PathBuf::from("/etc/print.css")));
    }

    #[test]
    fn test_expand_env_vars_in_command() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("MDPDF_TEST_MMDC_HOME", "/opt/mmdc");
        }
        let mut layer = ConfigLayer::default();
        layer.diagrams.command = Some("${MDPDF_TEST_MMDC_HOME}/bin/mmdc".to_owned());
        layer.style.css_file = Some(PathBuf::from("${MDPDF_TEST_UNSET_CSS:-print.css}"));

        layer.expand_env_vars().unwrap();

        assert_eq!(layer.diagrams.command.as_deref(), Some("/opt/mmdc/bin/mmdc"));
        assert_eq!(layer.style.css_file, Some(PathBuf::from("print.css")));
        unsafe {
            std::env::remove_var("MDPDF_TEST_MMDC_HOME");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_var() {
        let mut layer = ConfigLayer::default();
        layer.diagrams.browser_executable = Some(PathBuf::from("${MDPDF_TEST_NO_SUCH_BROWSER}"));

        let err = layer.expand_env_vars().unwrap_err();

        assert!(err.to_string().contains("diagrams.browser_executable"));
    }
}
