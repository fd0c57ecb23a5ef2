//! Input pattern handling.
//!
//! Patterns are glob expressions (`docs/**/*.md`) or literal file paths.
//! Batch mode expands them once; watch mode matches change events against
//! them and watches the literal directory prefix of each.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::BatchError;

const GLOB_META: [char; 3] = ['*', '?', '['];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Expand patterns into a deduplicated, sorted list of files.
///
/// A pattern naming an existing file counts as a match even when it
/// contains glob metacharacters. Files are deduplicated by canonical path, so
/// `a.md`, `./sub/../a.md` and the absolute spelling yield one entry (the
/// first spelling seen). Invalid patterns are skipped with a warning.
#[must_use]
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S]) -> Vec<PathBuf> {
    let mut files = BTreeMap::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        let literal = Path::new(pattern);
        if literal.is_file() {
            insert_file(&mut files, literal);
            continue;
        }

        match glob::glob_with(pattern, MATCH_OPTIONS) {
            Ok(paths) => {
                let before = files.len();
                for entry in paths {
                    match entry {
                        Ok(path) if path.is_file() => insert_file(&mut files, &path),
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "Unreadable path while expanding pattern"),
                    }
                }
                if files.len() == before {
                    tracing::debug!(pattern, "Pattern matched no new files");
                }
            }
            Err(e) => tracing::warn!(pattern, error = %e, "Invalid glob pattern"),
        }
    }

    files.into_values().collect()
}

fn insert_file(files: &mut BTreeMap<PathBuf, PathBuf>, path: &Path) {
    let key = std::fs::canonicalize(path).unwrap_or_else(|_| normalize(path));
    files.entry(key).or_insert_with(|| normalize(path));
}

/// Drop `.` components so equal files compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Literal directory prefix of a pattern: the part before the first
/// component containing a glob metacharacter. For a literal file path this
/// is its parent directory.
#[must_use]
pub fn base_dir(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let mut has_glob = false;
    for component in Path::new(pattern).components() {
        if component.as_os_str().to_string_lossy().contains(GLOB_META) {
            has_glob = true;
            break;
        }
        base.push(component);
    }
    if !has_glob {
        base.pop();
    }
    let base = normalize(&base);
    if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        base
    }
}

/// Compiled patterns for matching absolute event paths.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
    bases: Vec<PathBuf>,
}

impl PatternSet {
    /// Compile `patterns`, anchoring relative ones at `root`.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Pattern` for an invalid glob expression.
    pub fn new<S: AsRef<str>>(patterns: &[S], root: &Path) -> Result<Self, BatchError> {
        let mut compiled = Vec::with_capacity(patterns.len());
        let mut bases = BTreeSet::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let relative = normalize(Path::new(pattern));
            let anchored = if relative.is_absolute() {
                relative.to_string_lossy().into_owned()
            } else {
                let root = normalize(root);
                format!(
                    "{}/{}",
                    Pattern::escape(&root.to_string_lossy()).trim_end_matches('/'),
                    relative.to_string_lossy()
                )
            };
            compiled.push(Pattern::new(&anchored).map_err(|source| BatchError::Pattern {
                pattern: pattern.to_owned(),
                source,
            })?);

            let base = base_dir(pattern);
            bases.insert(if base.is_absolute() {
                base
            } else {
                normalize(&root.join(base))
            });
        }

        Ok(Self {
            patterns: compiled,
            bases: bases.into_iter().collect(),
        })
    }

    /// Whether `path` matches any pattern.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_path_with(path, MATCH_OPTIONS))
    }

    /// Directories to watch, deduplicated.
    #[must_use]
    pub fn bases(&self) -> &[PathBuf] {
        &self.bases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "# doc\n").unwrap();
    }

    #[test]
    fn test_expand_glob_and_dedupe() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.md"));
        touch(&dir.path().join("a.md"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("sub/c.md"));
        let root = dir.path().display().to_string();

        let files = expand_patterns(&[
            format!("{root}/*.md"),
            format!("{root}/a.md"),
            format!("{root}/./b.md"),
            format!("{root}/**/*.md"),
        ]);

        assert_eq!(
            files,
            vec![
                dir.path().join("a.md"),
                dir.path().join("b.md"),
                dir.path().join("sub/c.md"),
            ]
        );
    }

    #[test]
    fn test_expand_dedupes_parent_dir_spelling() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.md"));
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let root = dir.path().display().to_string();

        let files = expand_patterns(&[format!("{root}/*.md"), format!("{root}/sub/../a.md")]);

        assert_eq!(files, vec![dir.path().join("a.md")]);
    }

    #[test]
    fn test_expand_dedupes_relative_and_absolute_spelling() {
        // Tests run from the package root.
        let absolute = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");

        let files = expand_patterns(&["Cargo.toml".to_owned(), absolute.display().to_string()]);

        assert_eq!(files, vec![PathBuf::from("Cargo.toml")]);
    }

    #[test]
    fn test_base_dir_treats_braces_literally() {
        assert_eq!(base_dir("docs/{draft}/*.md"), PathBuf::from("docs/{draft}"));
    }

    #[test]
    fn test_expand_literal_file_with_glob_characters() {
        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join("notes[1].md");
        touch(&odd);

        let files = expand_patterns(&[odd.display().to_string()]);

        assert_eq!(files, vec![odd]);
    }

    #[test]
    fn test_expand_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        let files = expand_patterns(&[format!("{}/*.md", dir.path().display())]);
        assert!(files.is_empty());
    }

    #[test]
    fn test_expand_skips_directories_and_invalid_patterns() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("folder.md")).unwrap();
        touch(&dir.path().join("real.md"));
        let root = dir.path().display().to_string();

        let files = expand_patterns(&[format!("{root}/*.md"), format!("{root}/[.md")]);

        assert_eq!(files, vec![dir.path().join("real.md")]);
    }

    #[test]
    fn test_base_dir() {
        assert_eq!(base_dir("docs/**/*.md"), PathBuf::from("docs"));
        assert_eq!(base_dir("*.md"), PathBuf::from("."));
        assert_eq!(base_dir("./docs/guide.md"), PathBuf::from("docs"));
        assert_eq!(base_dir("README.md"), PathBuf::from("."));
        assert_eq!(base_dir("/srv/docs/*/index.md"), PathBuf::from("/srv/docs"));
    }

    #[test]
    fn test_pattern_set_matches_anchored_paths() {
        let set = PatternSet::new(&["docs/**/*.md", "./README.md"], Path::new("/project")).unwrap();

        assert!(set.matches(Path::new("/project/docs/guide.md")));
        assert!(set.matches(Path::new("/project/docs/a/b/deep.md")));
        assert!(set.matches(Path::new("/project/README.md")));
        assert!(!set.matches(Path::new("/project/docs/guide.txt")));
        assert!(!set.matches(Path::new("/project/other/guide.md")));
        assert!(!set.matches(Path::new("/elsewhere/README.md")));
    }

    #[test]
    fn test_pattern_set_star_does_not_cross_directories() {
        let set = PatternSet::new(&["*.md"], Path::new("/project")).unwrap();

        assert!(set.matches(Path::new("/project/a.md")));
        assert!(!set.matches(Path::new("/project/sub/a.md")));
    }

    #[test]
    fn test_pattern_set_bases_are_deduplicated() {
        let set = PatternSet::new(&["docs/*.md", "docs/**/*.md", "*.md"], Path::new("/project"))
            .unwrap();

        assert_eq!(
            set.bases(),
            &[PathBuf::from("/project"), PathBuf::from("/project/docs")]
        );
    }

    #[test]
    fn test_pattern_set_invalid_pattern() {
        let result = PatternSet::new(&["docs/[.md"], Path::new("/project"));
        assert!(matches!(result, Err(BatchError::Pattern { .. })));
    }
}
