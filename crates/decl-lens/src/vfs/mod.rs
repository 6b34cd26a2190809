use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Normalized identity of a source file, used as the key of per-file maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(String);

impl FileId {
    pub fn from_path(path: &Path) -> Self {
        Self(normalized_path(path).display().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileId {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn normalized_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Resolve a path reported by the parser to the canonical path used in
/// editor locations.
///
/// Returns `None` for empty or relative paths: neither can be turned into a
/// `file://` URI, so declarations living there cannot be shown to the user.
pub fn canonical_path(path: &str) -> Option<PathBuf> {
    if path.is_empty() {
        return None;
    }
    let path = Path::new(path);
    if !path.is_absolute() {
        return None;
    }
    Some(normalized_path(path))
}

#[cfg(test)]
#[path = "../../tests/src/vfs/vfs_tests.rs"]
mod tests;
