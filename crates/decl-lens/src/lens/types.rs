use std::path::PathBuf;

use crate::ide::navigation::{IdeLocation, IdePosition, IdeRange};

/// Client-side command that opens a location list.
pub const SHOW_REFERENCES: &str = "decl-lens.showReferences";

/// Placeholder payload of an unresolved lens: the document it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolveData {
    pub path: PathBuf,
}

/// Argument of a [`SHOW_REFERENCES`] command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LensArgument {
    pub path: PathBuf,
    pub position: IdePosition,
    pub locations: Vec<IdeLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LensCommand {
    pub title: String,
    /// What the locations are (`"base"`, `"derived"`, `"references"`).
    pub label: String,
    pub command: String,
    pub argument: LensArgument,
}

impl LensCommand {
    /// Build a show-references command titled `"<count> <label>"`, where the
    /// count is always the number of locations carried.
    pub fn show_references(
        label: &str,
        argument: LensArgument,
    ) -> Self {
        Self {
            title: format!("{} {label}", argument.locations.len()),
            label: label.to_string(),
            command: SHOW_REFERENCES.to_string(),
            argument,
        }
    }
}

/// One code lens.
///
/// An unresolved lens is a cheap marker that may later be turned into a
/// resolved one; a resolved lens carries its command and can never be
/// resolved again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lens {
    Unresolved {
        range: IdeRange,
        data: ResolveData,
    },
    Resolved {
        range: IdeRange,
        command: LensCommand,
    },
}

impl Lens {
    pub fn range(&self) -> IdeRange {
        match self {
            Lens::Unresolved {
                range, ..
            }
            | Lens::Resolved {
                range, ..
            } => *range,
        }
    }

    pub fn command(&self) -> Option<&LensCommand> {
        match self {
            Lens::Resolved {
                command, ..
            } => Some(command),
            Lens::Unresolved {
                ..
            } => None,
        }
    }

    pub fn resolve_data(&self) -> Option<&ResolveData> {
        match self {
            Lens::Unresolved {
                data, ..
            } => Some(data),
            Lens::Resolved {
                ..
            } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Lens::Resolved { .. })
    }
}

/// Knobs for one lens computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LensOptions {
    /// Cap on index results per query; `0` means unbounded.
    pub limit: u32,
    /// Emit base/derived commands for classes and virtual methods.
    pub hierarchy: bool,
}

impl Default for LensOptions {
    fn default() -> Self {
        Self {
            limit: 0,
            hierarchy: true,
        }
    }
}

impl LensOptions {
    pub(crate) fn effective_limit(&self) -> u32 {
        if self.limit == 0 {
            u32::MAX
        } else {
            self.limit
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LensError {
    /// The lens carries no placeholder data: it was never meant to be
    /// resolved, or it already is.
    NotResolvable,
    /// The parsed snapshot the lens was computed from is gone.
    StaleSnapshot {
        path: PathBuf,
    },
}

impl std::fmt::Display for LensError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::NotResolvable => write!(f, "failed to resolve codelens"),
            Self::StaleSnapshot {
                path,
            } => {
                write!(f, "failed to resolve codelens: no parsed snapshot for {}", path.display())
            },
        }
    }
}

impl std::error::Error for LensError {}
