//! Layered server configuration.
//!
//! Settings are split into one file per category. [`ServerSettings`]
//! aggregates all categories and handles JSON deserialization from LSP
//! initialization options and `didChangeConfiguration` payloads: defaults
//! are patched with whatever keys the client sends, then normalized.

pub(crate) mod compiler;
pub(crate) mod indexing;
pub(crate) mod lens;
pub(crate) mod logging;

use std::collections::HashMap;

pub use compiler::{CompilerSettings, DEFAULT_COMPILER_COMMAND};
use compiler::CompilerSettingsPatch;
use indexing::IndexingSettingsPatch;
pub use indexing::{IndexingSettings, MAX_INDEXED_FILES, MIN_INDEXED_FILES, SOURCE_EXTENSIONS};
pub use lens::{LensSettings, MAX_LENS_LIMIT};
use lens::LensSettingsPatch;
use logging::LoggingSettingsPatch;
pub use logging::{LogLevel, LoggingSettings};
use serde::Deserialize;
use serde_json::Value;

pub const SETTINGS_SECTION_KEY: &str = "decl-lens";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerSettings {
    pub lens: LensSettings,
    pub compiler: CompilerSettings,
    pub indexing: IndexingSettings,
    pub logging: LoggingSettings,
}

impl ServerSettings {
    pub fn from_lsp_payload(payload: Option<&Value>) -> Self {
        let mut settings = Self::default();
        if let Some(payload) = payload {
            settings = settings.merged_with_payload(payload);
        }
        settings
    }

    pub fn merged_with_payload(
        &self,
        payload: &Value,
    ) -> Self {
        let mut merged = self.clone();

        for candidate in payload_candidates(payload) {
            if let Ok(patch) = serde_json::from_value::<ServerSettingsPatch>(candidate.clone()) {
                merged.apply_patch(patch);
            }
        }

        merged.normalize();
        merged
    }

    fn apply_patch(
        &mut self,
        patch: ServerSettingsPatch,
    ) {
        if let Some(p) = patch.lens {
            self.lens.apply_patch(p);
        }
        if let Some(p) = patch.compiler {
            self.compiler.apply_patch(p);
        }
        if let Some(p) = patch.indexing {
            self.indexing.apply_patch(p);
        }
        if let Some(p) = patch.logging {
            self.logging.apply_patch(p);
        }
    }

    fn normalize(&mut self) {
        self.lens.normalize();
        self.compiler.normalize();
        self.indexing.normalize();
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ServerSettingsPatch {
    lens: Option<LensSettingsPatch>,
    compiler: Option<CompilerSettingsPatch>,
    indexing: Option<IndexingSettingsPatch>,
    logging: Option<LoggingSettingsPatch>,
    #[serde(flatten)]
    _extra: HashMap<String, Value>,
}

fn payload_candidates(payload: &Value) -> Vec<Value> {
    let mut candidates = Vec::new();
    candidates.push(payload.clone());
    if let Some(scoped) = payload.get(SETTINGS_SECTION_KEY) {
        candidates.push(scoped.clone());
    }
    candidates
}

#[cfg(test)]
#[path = "../../tests/src/config/settings_tests.rs"]
mod tests;
