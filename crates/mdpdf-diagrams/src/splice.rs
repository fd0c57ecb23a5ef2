//! Progressive text splicing.
//!
//! Replaces diagram spans in document text one at a time. Every replacement
//! changes the length of the text, so [`Splicer`] keeps a running offset
//! (net bytes added so far) and shifts the original span of each later match
//! by it. Matches must be applied in ascending start order.

use crate::scanner::DiagramMatch;

/// Error returned when a span cannot be spliced.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SpliceError {
    /// The span starts before the end of an earlier replacement.
    #[error("span {start}..{end} overlaps or precedes an earlier replacement")]
    OutOfOrder { start: usize, end: usize },

    /// The adjusted span does not hold the original block text.
    #[error("span {start}..{end} no longer contains the original block")]
    Mismatch { start: usize, end: usize },
}

/// Text under progressive replacement.
#[derive(Debug)]
pub struct Splicer {
    text: String,
    /// Net length change introduced by all replacements so far.
    offset: isize,
    /// End of the last replacement in the edited text.
    cursor: usize,
}

impl Splicer {
    /// Start splicing into `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            offset: 0,
            cursor: 0,
        }
    }

    /// Replace the original span of `span` with `replacement`.
    ///
    /// Spans skipped by the caller (failed renders) simply leave the text and
    /// offset untouched.
    pub fn replace(&mut self, span: &DiagramMatch, replacement: &str) -> Result<(), SpliceError> {
        let out_of_order = SpliceError::OutOfOrder {
            start: span.start,
            end: span.end,
        };
        let start = span
            .start
            .checked_add_signed(self.offset)
            .ok_or_else(|| out_of_order.clone())?;
        let end = span
            .end
            .checked_add_signed(self.offset)
            .ok_or_else(|| out_of_order.clone())?;
        if start < self.cursor {
            return Err(out_of_order);
        }
        if self.text.get(start..end) != Some(span.source_text.as_str()) {
            return Err(SpliceError::Mismatch {
                start: span.start,
                end: span.end,
            });
        }

        self.text.replace_range(start..end, replacement);
        self.offset += signed_len(replacement) - signed_len(&span.source_text);
        self.cursor = start + replacement.len();
        Ok(())
    }

    /// Net length change applied so far.
    #[must_use]
    pub fn offset(&self) -> isize {
        self.offset
    }

    /// Current text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Finish splicing and return the edited text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

#[allow(clippy::cast_possible_wrap)]
fn signed_len(s: &str) -> isize {
    // String lengths never exceed isize::MAX.
    s.len() as isize
}
