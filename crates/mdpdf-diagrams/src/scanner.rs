//! Diagram block scanning.
//!
//! Finds diagram blocks in markdown text for one or more delimiter syntaxes
//! and returns them ordered by their position in the original text.
//!
//! Each syntax is an independent non-greedy matcher. Syntaxes are expected
//! not to nest inside each other; when two syntaxes produce overlapping
//! spans both matches are returned unchanged.

use std::sync::LazyLock;

use regex::Regex;

/// Built-in syntaxes: fenced ```` ```mermaid ```` blocks and
/// `<div class="mermaid">` elements.
static DEFAULT_SYNTAXES: LazyLock<Vec<DelimiterSyntax>> =
    LazyLock::new(|| vec![DelimiterSyntax::fenced(), DelimiterSyntax::html()]);

/// A diagram block found in the original document text.
///
/// Offsets are byte positions into the unmodified text; `text[start..end]`
/// is always equal to `source_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramMatch {
    /// Raw block including its delimiters.
    pub source_text: String,
    /// Diagram body trimmed of leading and trailing whitespace.
    pub code: String,
    /// Start of the block (inclusive).
    pub start: usize,
    /// End of the block (exclusive).
    pub end: usize,
}

/// Opening and closing markers that enclose a diagram body.
#[derive(Debug, Clone)]
pub struct DelimiterSyntax {
    name: String,
    pattern: Regex,
}

impl DelimiterSyntax {
    /// Create a syntax from literal opening and closing markers.
    ///
    /// The body is matched non-greedily across lines, so each block ends at
    /// the first closing marker after its opening marker.
    #[must_use]
    pub fn new(name: impl Into<String>, open: &str, close: &str) -> Self {
        let pattern = format!("(?s){}(.*?){}", regex::escape(open), regex::escape(close));
        Self {
            name: name.into(),
            pattern: Regex::new(&pattern).expect("escaped markers always form a valid pattern"),
        }
    }

    /// Fenced code block: ```` ```mermaid ```` … ```` ``` ````.
    #[must_use]
    pub fn fenced() -> Self {
        Self::new("fenced", "```mermaid", "```")
    }

    /// HTML container: `<div class="mermaid">` … `</div>`.
    #[must_use]
    pub fn html() -> Self {
        Self::new("html", r#"<div class="mermaid">"#, "</div>")
    }

    /// Syntax name used in log output.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn find_all<'a>(&'a self, text: &'a str) -> impl Iterator<Item = DiagramMatch> + 'a {
        self.pattern.captures_iter(text).filter_map(|caps| {
            let whole = caps.get(0)?;
            let body = caps.get(1)?;
            Some(DiagramMatch {
                source_text: whole.as_str().to_owned(),
                code: body.as_str().trim().to_owned(),
                start: whole.start(),
                end: whole.end(),
            })
        })
    }
}

/// Built-in delimiter syntaxes.
#[must_use]
pub fn default_syntaxes() -> &'static [DelimiterSyntax] {
    &DEFAULT_SYNTAXES
}

/// Find all diagram blocks for every syntax, sorted by start offset.
///
/// Pure function: no I/O, deterministic for a given input. The sort is
/// stable, so matches starting at the same offset keep syntax order.
#[must_use]
pub fn scan(text: &str, syntaxes: &[DelimiterSyntax]) -> Vec<DiagramMatch> {
    let mut matches: Vec<DiagramMatch> = syntaxes
        .iter()
        .flat_map(|syntax| syntax.find_all(text))
        .collect();
    matches.sort_by_key(|m| m.start);
    matches
}

/// Find all diagram blocks using the built-in syntaxes.
#[must_use]
pub fn scan_default(text: &str) -> Vec<DiagramMatch> {
    scan(text, default_syntaxes())
}
