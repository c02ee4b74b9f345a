//! File reading and content acceptance checks
//!
//! - `read_source`: lossy UTF-8 read with BOM stripping
//! - `check_content`: the "is this worth analyzing" test shared by discovery and
//!   snippet extraction

use std::fs;
use std::path::Path;

use crate::{Result, ScanError};

/// Number of leading bytes inspected by the binary heuristic
const BINARY_SNIFF_LEN: usize = 8000;

/// Share of control characters above which text is treated as binary
const BINARY_CONTROL_RATIO: f64 = 0.3;

/// Outcome of the content acceptance test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Accepted,
    Empty,
    Oversized,
    Binary,
}

impl Acceptance {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Empty => "empty",
            Self::Oversized => "too large",
            Self::Binary => "binary-looking",
        }
    }
}

/// Decide whether a piece of text is worth analyzing.
pub fn check_content(text: &str, max_bytes: u64) -> Acceptance {
    if text.len() as u64 > max_bytes {
        Acceptance::Oversized
    } else if text.trim().is_empty() {
        Acceptance::Empty
    } else if looks_binary(text) {
        Acceptance::Binary
    } else {
        Acceptance::Accepted
    }
}

/// NUL bytes or a high density of control characters mark binary content.
pub fn looks_binary(text: &str) -> bool {
    let sample = &text.as_bytes()[..text.len().min(BINARY_SNIFF_LEN)];
    if sample.contains(&0) {
        return true;
    }
    let control = sample
        .iter()
        .filter(|&&b| b.is_ascii_control() && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c))
        .count();
    !sample.is_empty() && (control as f64 / sample.len() as f64) > BINARY_CONTROL_RATIO
}

/// Read a source file. Invalid UTF-8 is replaced, a leading BOM is dropped.
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScanError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => ScanError::Io(e),
    })?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
}

/// Size of a file on disk without reading it
pub fn file_size(path: &Path) -> Result<u64> {
    Ok(fs::metadata(path)?.len())
}
