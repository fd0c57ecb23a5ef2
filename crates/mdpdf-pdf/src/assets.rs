//! Local asset references.
//!
//! The HTML page is generated inside a per-document working directory, so
//! relative images referenced by the markdown must be copied next to it.
//! Links that stay inside the source directory keep their relative path;
//! links that climb out of it with `..` are copied under their file name
//! and rewritten.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::PdfError;

static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+["'][^"']*["'])?\s*\)"#)
        .expect("valid markdown image pattern")
});

static HTML_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#).expect("valid img pattern")
});

/// Where a local reference lands in the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placement {
    /// Path relative to the working directory.
    target: PathBuf,
    /// Replacement link text, when the link must change.
    rewritten: Option<String>,
}

/// Copy every local image referenced by `markdown` from `source_dir` into
/// `work_dir` and return the markdown with escaping links rewritten.
///
/// Missing or unreadable assets are logged and skipped.
///
/// # Errors
///
/// Returns `PdfError::Io` only if a destination directory cannot be created.
pub async fn copy_assets(
    markdown: &str,
    source_dir: &Path,
    work_dir: &Path,
) -> Result<String, PdfError> {
    let mut copies = BTreeMap::new();
    let rewritten = rewrite_links(markdown, |link, placement| {
        copies.insert(placement.target.clone(), source_dir.join(link));
    });

    for (target, source) in copies {
        let destination = work_dir.join(&target);
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            tracing::warn!(asset = %source.display(), "Referenced asset not found");
            continue;
        }
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if let Err(e) = tokio::fs::copy(&source, &destination).await {
            tracing::warn!(asset = %source.display(), error = %e, "Failed to copy asset");
        } else {
            tracing::debug!(asset = %target.display(), "Copied asset");
        }
    }

    Ok(rewritten)
}

/// Rewrite escaping links, reporting each local reference to `on_local`.
fn rewrite_links(markdown: &str, mut on_local: impl FnMut(&str, &Placement)) -> String {
    let mut apply = |caps: &Captures<'_>| -> String {
        let (Some(whole), Some(link)) = (caps.get(0), caps.get(1)) else {
            return String::new();
        };
        let Some(path) = local_path(link.as_str()) else {
            return whole.as_str().to_owned();
        };
        let Some(placement) = place(path) else {
            return whole.as_str().to_owned();
        };
        on_local(path, &placement);

        match &placement.rewritten {
            Some(new_link) => {
                let text = whole.as_str();
                let from = link.start() - whole.start();
                let to = link.end() - whole.start();
                format!("{}{new_link}{}", &text[..from], &text[to..])
            }
            None => whole.as_str().to_owned(),
        }
    };

    let pass = MARKDOWN_IMAGE.replace_all(markdown, &mut apply);
    HTML_IMAGE.replace_all(&pass, &mut apply).into_owned()
}

/// The file path part of a link that refers to a local relative file.
fn local_path(link: &str) -> Option<&str> {
    if link.is_empty()
        || link.starts_with('#')
        || link.starts_with("data:")
        || link.contains("://")
        || link.starts_with("mailto:")
    {
        return None;
    }
    let path = link.split(['?', '#']).next().unwrap_or(link);
    if path.is_empty() || Path::new(path).is_absolute() || path.starts_with('/') {
        return None;
    }
    Some(path)
}

/// Decide where `path` goes in the working directory.
fn place(path: &str) -> Option<Placement> {
    let mut normalized = PathBuf::new();
    let mut escapes = false;
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::ParentDir => {
                if !normalized.pop() {
                    escapes = true;
                }
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if escapes {
        let name = Path::new(path).file_name()?;
        let name = name.to_string_lossy().into_owned();
        return Some(Placement {
            target: PathBuf::from(&name),
            rewritten: Some(name),
        });
    }

    if normalized.as_os_str().is_empty() {
        return None;
    }
    Some(Placement {
        target: normalized,
        rewritten: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn locals(markdown: &str) -> (String, Vec<(String, PathBuf)>) {
        let mut seen = Vec::new();
        let text = rewrite_links(markdown, |link, placement| {
            seen.push((link.to_owned(), placement.target.clone()));
        });
        (text, seen)
    }

    #[test]
    fn local_path_skips_remote_and_special_links() {
        assert_eq!(local_path("https://example.com/a.png"), None);
        assert_eq!(local_path("data:image/png;base64,AAAA"), None);
        assert_eq!(local_path("#section"), None);
        assert_eq!(local_path("/abs/a.png"), None);
        assert_eq!(local_path(""), None);
        assert_eq!(local_path("img/a.png"), Some("img/a.png"));
        assert_eq!(local_path("img/a.png?v=2#x"), Some("img/a.png"));
    }

    #[test]
    fn place_inside_source_keeps_relative_path() {
        assert_eq!(
            place("./img/../img/a.png"),
            Some(Placement {
                target: PathBuf::from("img/a.png"),
                rewritten: None,
            })
        );
    }

    #[test]
    fn place_escaping_link_uses_file_name() {
        assert_eq!(
            place("../shared/logo.png"),
            Some(Placement {
                target: PathBuf::from("logo.png"),
                rewritten: Some("logo.png".to_owned()),
            })
        );
    }

    #[test]
    fn rewrite_leaves_urls_and_data_uris_untouched() {
        let markdown = "![a](https://example.com/a.png) ![b](data:image/png;base64,xyz) <img src=\"http://x/y.png\">";

        let (text, seen) = locals(markdown);

        assert_eq!(text, markdown);
        assert!(seen.is_empty());
    }

    #[test]
    fn rewrite_markdown_and_html_images() {
        let markdown = "![Logo](../logo.png \"Title\")\n<img alt=\"x\" src='img/photo.jpg'>\n";

        let (text, seen) = locals(markdown);

        assert_eq!(
            text,
            "![Logo](logo.png \"Title\")\n<img alt=\"x\" src='img/photo.jpg'>\n"
        );
        assert_eq!(
            seen,
            vec![
                ("../logo.png".to_owned(), PathBuf::from("logo.png")),
                ("img/photo.jpg".to_owned(), PathBuf::from("img/photo.jpg")),
            ]
        );
    }

    #[test]
    fn rewrite_only_touches_link_not_alt_text() {
        let (text, _) = locals("![../a.png](../a.png)");
        assert_eq!(text, "![../a.png](a.png)");
    }

    #[tokio::test]
    async fn copy_assets_into_work_dir() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("docs");
        let work = root.path().join("work");
        std::fs::create_dir_all(source.join("img")).unwrap();
        std::fs::create_dir_all(&work).unwrap();
        std::fs::write(source.join("img/a.png"), "A").unwrap();
        std::fs::write(root.path().join("shared.png"), "S").unwrap();

        let markdown = "![a](img/a.png)\n![s](../shared.png)\n";
        let text = copy_assets(markdown, &source, &work).await.unwrap();

        assert_eq!(text, "![a](img/a.png)\n![s](shared.png)\n");
        assert_eq!(std::fs::read_to_string(work.join("img/a.png")).unwrap(), "A");
        assert_eq!(std::fs::read_to_string(work.join("shared.png")).unwrap(), "S");
    }

    #[tokio::test]
    async fn copy_assets_missing_file_is_not_an_error() {
        let source = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();

        let text = copy_assets("![x](missing.png)", source.path(), work.path())
            .await
            .unwrap();

        assert_eq!(text, "![x](missing.png)");
        assert!(!work.path().join("missing.png").exists());
    }
}
