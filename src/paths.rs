//! Normalized path handling shared by discovery, analysis and reporting
//!
//! Every path that leaves this module is forward-slash separated, lexically
//! normalized (no `.` or `..` segments) and case-preserved. Relative inputs are
//! resolved against the current working directory first.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, ScanError};

/// An absolute, forward-slash path used as the key of every store and result map.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NormalizedPath(String);

impl NormalizedPath {
    /// Normalize a path without touching the filesystem.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::from_str_lossy(&path.as_ref().to_string_lossy())
    }

    fn from_str_lossy(raw: &str) -> Self {
        let mut raw = raw.replace('\\', "/");
        // Windows verbatim prefix from canonicalize()
        if let Some(stripped) = raw.strip_prefix("//?/") {
            raw = stripped.to_string();
        }

        let absolute = raw.starts_with('/');
        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }

        let joined = segments.join("/");
        if absolute {
            Self(format!("/{}", joined))
        } else {
            Self(joined)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }

    /// Final segment of the path
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Extension including the leading dot, lowercased (e.g. `.yaml`)
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        let dot = name.rfind('.')?;
        if dot == 0 {
            return None;
        }
        Some(name[dot..].to_lowercase())
    }

    pub fn parent(&self) -> Option<NormalizedPath> {
        let idx = self.0.rfind('/')?;
        if idx == 0 {
            if self.0.len() == 1 {
                return None;
            }
            return Some(Self("/".to_string()));
        }
        Some(Self(self.0[..idx].to_string()))
    }

    pub fn join(&self, child: &str) -> NormalizedPath {
        if self.0.ends_with('/') {
            Self::from_str_lossy(&format!("{}{}", self.0, child))
        } else {
            Self::from_str_lossy(&format!("{}/{}", self.0, child))
        }
    }

    /// True when `self` is `dir` or lies somewhere below it.
    pub fn is_within(&self, dir: &NormalizedPath) -> bool {
        if dir.0 == "/" {
            return self.0.starts_with('/');
        }
        self.0 == dir.0
            || (self.0.starts_with(&dir.0) && self.0.as_bytes().get(dir.0.len()) == Some(&b'/'))
    }

    /// Path of `self` relative to `base`, or `None` when it is not below it.
    pub fn relative_to(&self, base: &NormalizedPath) -> Option<&str> {
        if !self.is_within(base) || self.0 == base.0 {
            return None;
        }
        let start = if base.0 == "/" { 1 } else { base.0.len() + 1 };
        Some(&self.0[start..])
    }

    /// Ancestor directories of this path, nearest first, stopping before `base`.
    ///
    /// `/p/a/b/f.js` with base `/p` yields `/p/a/b`, `/p/a`.
    pub fn ancestors_below(&self, base: &NormalizedPath) -> Vec<NormalizedPath> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(dir) = current {
            if dir == *base || !dir.is_within(base) {
                break;
            }
            current = dir.parent();
            ancestors.push(dir);
        }
        ancestors
    }

    /// Derive a reporting-only path by inserting `-{resource}` before the extension.
    ///
    /// `/p/template.yaml` + `MyFn` gives `/p/template-MyFn.yaml`. The result never
    /// denotes a real file.
    pub fn synthetic(&self, resource: &str) -> NormalizedPath {
        let name_start = self.0.rfind('/').map(|idx| idx + 1).unwrap_or(0);
        match self.0[name_start..].rfind('.') {
            Some(dot) if dot > 0 => {
                let split = name_start + dot;
                Self(format!("{}-{}{}", &self.0[..split], resource, &self.0[split..]))
            }
            _ => Self(format!("{}-{}", self.0, resource)),
        }
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NormalizedPath {
    fn from(raw: String) -> Self {
        Self::from_str_lossy(&raw)
    }
}

impl From<NormalizedPath> for String {
    fn from(path: NormalizedPath) -> Self {
        path.0
    }
}

impl From<&str> for NormalizedPath {
    fn from(raw: &str) -> Self {
        Self::from_str_lossy(raw)
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

/// Resolve path, defaulting to current working directory if None.
///
/// Relative paths are joined with the working directory before normalization.
pub fn resolve_path(path: Option<&Path>) -> Result<NormalizedPath> {
    let cwd = || {
        std::env::current_dir().map_err(|e| ScanError::FileNotFound {
            path: format!("current directory: {}", e),
        })
    };

    match path {
        Some(p) if p.is_absolute() => Ok(NormalizedPath::new(p)),
        Some(p) => Ok(NormalizedPath::new(cwd()?.join(p))),
        None => Ok(NormalizedPath::new(cwd()?)),
    }
}
