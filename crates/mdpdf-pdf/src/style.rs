//! Stylesheet assembly.
//!
//! The page stylesheet is built from, in order: the base print stylesheet,
//! the code highlight theme, the configured `css_file` and inline `css`.
//! Later rules win, so user styles always override built-in ones.

use mdpdf_config::StyleConfig;

use crate::PdfError;

const BASE_CSS: &str = r#"
html { font-size: 12pt; }
body {
  font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif;
  line-height: 1.5;
  color: #24292f;
  margin: 0;
}
h1, h2, h3, h4, h5, h6 { margin-top: 1.5em; margin-bottom: 0.5em; line-height: 1.25; page-break-after: avoid; }
h1 { font-size: 2em; border-bottom: 1px solid #d0d7de; padding-bottom: 0.3em; }
h2 { font-size: 1.5em; border-bottom: 1px solid #d0d7de; padding-bottom: 0.3em; }
p, ul, ol, table, pre, blockquote { margin-top: 0; margin-bottom: 1em; }
a { color: #0969da; text-decoration: none; }
img { max-width: 100%; page-break-inside: avoid; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #d0d7de; padding: 6px 13px; }
th { font-weight: 600; }
tr:nth-child(2n) { background-color: #f6f8fa; }
blockquote { color: #57606a; border-left: 0.25em solid #d0d7de; padding: 0 1em; }
pre { padding: 1em; overflow: auto; border-radius: 6px; page-break-inside: avoid; }
code { font-family: ui-monospace, SFMono-Regular, Menlo, Consolas, monospace; font-size: 85%; }
pre code { font-size: 100%; }
ul.contains-task-list, li.task-list-item { list-style-type: none; }
.footnote-definition { font-size: 0.85em; }
"#;

const GITHUB_CSS: &str = r"
pre { background-color: #f6f8fa; color: #24292f; }
:not(pre) > code { background-color: rgba(175, 184, 193, 0.2); padding: 0.2em 0.4em; border-radius: 6px; }
";

const MONOKAI_CSS: &str = r"
pre { background-color: #272822; color: #f8f8f2; }
:not(pre) > code { background-color: #272822; color: #f8f8f2; padding: 0.2em 0.4em; border-radius: 4px; }
";

const DEFAULT_HIGHLIGHT_THEME: &str = "github";

/// Built-in code highlight theme CSS, if `name` is known.
#[must_use]
pub fn highlight_css(name: &str) -> Option<&'static str> {
    match name {
        "github" => Some(GITHUB_CSS),
        "monokai" => Some(MONOKAI_CSS),
        _ => None,
    }
}

/// Assemble the page stylesheet for `style`.
///
/// Unknown highlight themes fall back to `github` with a warning.
///
/// # Errors
///
/// Returns `PdfError::Stylesheet` if `css_file` is set but cannot be read.
pub async fn build_stylesheet(style: &StyleConfig) -> Result<String, PdfError> {
    let mut css = String::from(BASE_CSS);

    let highlight = highlight_css(&style.highlight_theme).unwrap_or_else(|| {
        tracing::warn!(
            theme = %style.highlight_theme,
            fallback = DEFAULT_HIGHLIGHT_THEME,
            "Unknown highlight theme"
        );
        GITHUB_CSS
    });
    css.push_str(highlight);

    if let Some(path) = &style.css_file {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| PdfError::Stylesheet {
                    path: path.clone(),
                    source,
                })?;
        css.push('\n');
        css.push_str(&contents);
    }

    if let Some(inline) = &style.css {
        css.push('\n');
        css.push_str(inline);
    }

    Ok(css)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_stylesheet_uses_github_theme() {
        let css = build_stylesheet(&StyleConfig::default()).await.unwrap();

        assert!(css.starts_with(BASE_CSS));
        assert!(css.contains("#f6f8fa; color: #24292f"));
    }

    #[tokio::test]
    async fn monokai_theme() {
        let style = StyleConfig {
            highlight_theme: "monokai".to_owned(),
            ..StyleConfig::default()
        };
        let css = build_stylesheet(&style).await.unwrap();

        assert!(css.contains("#272822"));
    }

    #[tokio::test]
    async fn unknown_theme_falls_back() {
        let style = StyleConfig {
            highlight_theme: "solarized".to_owned(),
            ..StyleConfig::default()
        };
        let css = build_stylesheet(&style).await.unwrap();

        assert!(css.contains(GITHUB_CSS));
    }

    #[tokio::test]
    async fn user_css_comes_last_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let css_file = dir.path().join("print.css");
        std::fs::write(&css_file, "h1 { color: green; }").unwrap();
        let style = StyleConfig {
            css_file: Some(css_file),
            css: Some("h1 { color: red; }".to_owned()),
            ..StyleConfig::default()
        };

        let css = build_stylesheet(&style).await.unwrap();

        let highlight = css.find(GITHUB_CSS).unwrap();
        let file = css.find("color: green").unwrap();
        let inline = css.find("color: red").unwrap();
        assert!(highlight < file);
        assert!(file < inline);
    }

    #[tokio::test]
    async fn missing_css_file_is_error() {
        let style = StyleConfig {
            css_file: Some("/nonexistent/print.css".into()),
            ..StyleConfig::default()
        };

        let err = build_stylesheet(&style).await.unwrap_err();

        assert!(matches!(err, PdfError::Stylesheet { .. }));
        assert!(err.to_string().contains("print.css"));
    }
}
