use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::lens::LensOptions;

pub const MAX_LENS_LIMIT: u32 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct LensSettings {
    pub enable: bool,
    /// Cap on every relation and reference query; `0` means unbounded.
    pub limit: u32,
    /// Emit `base`/`derived` commands next to the reference markers.
    pub hierarchy: bool,
}

impl Default for LensSettings {
    fn default() -> Self {
        Self {
            enable: true,
            limit: 0,
            hierarchy: true,
        }
    }
}

impl LensSettings {
    pub(crate) fn apply_patch(
        &mut self,
        patch: LensSettingsPatch,
    ) {
        if let Some(v) = patch.enable {
            self.enable = v;
        }
        if let Some(v) = patch.limit {
            self.limit = v;
        }
        if let Some(v) = patch.hierarchy {
            self.hierarchy = v;
        }
    }

    pub(crate) fn normalize(&mut self) {
        self.limit = self.limit.min(MAX_LENS_LIMIT);
    }

    pub fn options(&self) -> LensOptions {
        LensOptions {
            limit: self.limit,
            hierarchy: self.hierarchy,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct LensSettingsPatch {
    pub(crate) enable: Option<bool>,
    pub(crate) limit: Option<u32>,
    pub(crate) hierarchy: Option<bool>,
    #[serde(flatten)]
    pub(crate) _extra: HashMap<String, Value>,
}
