use std::path::PathBuf;

/// Zero-based line/character pair. `character` counts bytes of the line as
/// reported by Clang, which matches UTF-16 columns for ASCII sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IdePosition {
    pub line: u32,
    pub character: u32,
}

impl IdePosition {
    pub const fn new(
        line: u32,
        character: u32,
    ) -> Self {
        Self {
            line,
            character,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IdeRange {
    pub start: IdePosition,
    pub end: IdePosition,
}

impl IdeRange {
    pub const fn new(
        start: IdePosition,
        end: IdePosition,
    ) -> Self {
        Self {
            start,
            end,
        }
    }

    /// Half-open containment, except that an empty range contains its start.
    pub fn contains(
        &self,
        position: IdePosition,
    ) -> bool {
        if self.start == self.end {
            return position == self.start;
        }
        self.start <= position && position < self.end
    }
}

/// A canonical editor location: an absolute file path plus a range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdeLocation {
    pub file_path: PathBuf,
    pub range: IdeRange,
}

impl IdeLocation {
    pub fn new(
        file_path: impl Into<PathBuf>,
        range: IdeRange,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            range,
        }
    }
}
