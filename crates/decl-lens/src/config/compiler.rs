use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_COMPILER_COMMAND: &str = "clang++";

#[derive(Debug, Clone, PartialEq)]
pub struct CompilerSettings {
    /// Clang-compatible driver used for `-ast-dump=json`.
    pub command: String,
    pub include_paths: Vec<String>,
    pub extra_flags: Vec<String>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMPILER_COMMAND.to_string(),
            include_paths: Vec::new(),
            extra_flags: Vec::new(),
        }
    }
}

impl CompilerSettings {
    pub(crate) fn apply_patch(
        &mut self,
        patch: CompilerSettingsPatch,
    ) {
        if let Some(v) = patch.command {
            self.command = v;
        }
        if let Some(v) = patch.include_paths {
            self.include_paths = v;
        }
        if let Some(v) = patch.extra_flags {
            self.extra_flags = v;
        }
    }

    pub(crate) fn normalize(&mut self) {
        self.command = self.command.trim().to_string();
        if self.command.is_empty() {
            self.command = DEFAULT_COMPILER_COMMAND.to_string();
        }
        self.include_paths =
            self.include_paths.iter().map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect();
        self.extra_flags = self.extra_flags.iter().map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect();
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct CompilerSettingsPatch {
    pub(crate) command: Option<String>,
    pub(crate) include_paths: Option<Vec<String>>,
    pub(crate) extra_flags: Option<Vec<String>>,
    #[serde(flatten)]
    pub(crate) _extra: HashMap<String, Value>,
}
