use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use serde_json::Value;

pub const MIN_INDEXED_FILES: usize = 1;
pub const MAX_INDEXED_FILES: usize = 100_000;

/// Extensions picked up by the background workspace scan.
pub const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "h", "hh", "hpp", "hxx"];

#[derive(Debug, Clone, PartialEq)]
pub struct IndexingSettings {
    pub enable: bool,
    pub max_files: usize,
    pub exclude_paths: Vec<String>,
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            enable: true,
            max_files: 2000,
            exclude_paths: Vec::new(),
        }
    }
}

impl IndexingSettings {
    pub(crate) fn apply_patch(
        &mut self,
        patch: IndexingSettingsPatch,
    ) {
        if let Some(v) = patch.enable {
            self.enable = v;
        }
        if let Some(v) = patch.max_files {
            self.max_files = v;
        }
        if let Some(v) = patch.exclude_paths {
            self.exclude_paths = v;
        }
    }

    pub(crate) fn normalize(&mut self) {
        self.max_files = self.max_files.clamp(MIN_INDEXED_FILES, MAX_INDEXED_FILES);
        let mut seen = HashSet::new();
        self.exclude_paths = self
            .exclude_paths
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .filter(|p| seen.insert(p.clone()))
            .collect();
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct IndexingSettingsPatch {
    pub(crate) enable: Option<bool>,
    pub(crate) max_files: Option<usize>,
    pub(crate) exclude_paths: Option<Vec<String>>,
    #[serde(flatten)]
    pub(crate) _extra: HashMap<String, Value>,
}
