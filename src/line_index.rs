//! Line-start table for offset to (line, column) conversion
//!
//! Only `\n` starts a new line, which keeps line numbers identical to the
//! rows tree-sitter reports. A `\r` before it stays part of the line.

use serde::{Deserialize, Serialize};

/// Precomputed line starts of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Offsets of each line start; index 0 is always 0
    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Length of the indexed text in bytes
    pub fn text_len(&self) -> usize {
        self.len
    }

    /// 1-based line and 1-based column of `offset`.
    ///
    /// Offsets past the end resolve against the last line.
    pub fn to_line_column(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self.line_starts[line - 1];
        (line, offset - start + 1)
    }

    /// Inverse of [`LineIndex::to_line_column`]; `None` for positions outside the text.
    pub fn offset_at(&self, line: usize, column: usize) -> Option<usize> {
        if line == 0 || column == 0 {
            return None;
        }
        let start = *self.line_starts.get(line - 1)?;
        let end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.len);
        let offset = start + column - 1;
        (offset <= end).then_some(offset)
    }

    /// Text of a 1-based line without its terminator.
    pub fn line_text<'a>(&self, text: &'a str, line: usize) -> Option<&'a str> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(text.len());
        let raw = text.get(start..end)?;
        Some(raw.strip_suffix('\r').unwrap_or(raw))
    }
}
