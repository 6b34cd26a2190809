use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent, Url};

use crate::ide::navigation::{IdePosition, IdeRange};

// ── Document ────────────────────────────────────────────────────────────────

/// Snapshot of a single open text document.
#[derive(Debug, Clone)]
pub struct Document {
    pub uri: Url,
    /// Full source text (always kept up-to-date).
    pub text: String,
    /// Document version as reported by the client.
    pub version: i32,
    /// Pre-computed line start byte offsets (rebuilt on every mutation).
    line_offsets: Vec<usize>,
}

impl Document {
    pub fn new(
        uri: Url,
        text: String,
        version: i32,
    ) -> Self {
        let line_offsets = Self::compute_line_offsets(&text);
        Self {
            uri,
            text,
            version,
            line_offsets,
        }
    }

    // ── queries ─────────────────────────────────────────────────────────

    pub fn line_count(&self) -> usize {
        self.line_offsets.len()
    }

    /// Return the full text of a given 0-based line (without the trailing newline).
    pub fn line_text(
        &self,
        line: usize,
    ) -> Option<&str> {
        let start = *self.line_offsets.get(line)?;
        let end = self.line_offsets.get(line + 1).copied().unwrap_or(self.text.len());
        let slice = &self.text[start..end];
        Some(slice.trim_end_matches('\n').trim_end_matches('\r'))
    }

    /// Convert an LSP `Position` (line/character, 0-based) to a byte offset.
    pub fn offset_of(
        &self,
        pos: Position,
    ) -> Option<usize> {
        let line = pos.line as usize;
        let line_start = *self.line_offsets.get(line)?;
        let line_end = self.line_offsets.get(line + 1).copied().unwrap_or(self.text.len());
        let line_text = &self.text[line_start..line_end];

        // LSP character offsets are UTF-16 code-unit counts.
        let mut utf16_offset: u32 = 0;
        let mut byte_offset = line_start;
        for ch in line_text.chars() {
            if utf16_offset >= pos.character {
                break;
            }
            utf16_offset += ch.len_utf16() as u32;
            byte_offset += ch.len_utf8();
        }
        Some(byte_offset)
    }

    /// Convert a byte offset to an LSP `Position`.
    pub fn position_of(
        &self,
        offset: usize,
    ) -> Position {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = match self.line_offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(ins) => ins.saturating_sub(1),
        };
        let line_start = self.line_offsets[line];
        let character = self.text[line_start..offset].chars().map(|c| c.len_utf16() as u32).sum::<u32>();
        Position {
            line: line as u32,
            character,
        }
    }

    /// Re-express a position whose column counts bytes (as the compiler
    /// reports them) in UTF-16 code units. Positions past the end of their
    /// line are returned unchanged.
    pub fn to_utf16(
        &self,
        position: IdePosition,
    ) -> IdePosition {
        let Some(&line_start) = self.line_offsets.get(position.line as usize) else {
            return position;
        };
        let offset = line_start + position.character as usize;
        let within_line = self.line_text(position.line as usize).is_some_and(|text| position.character as usize <= text.len());
        if !within_line {
            return position;
        }
        let lsp = self.position_of(offset);
        IdePosition::new(lsp.line, lsp.character)
    }

    /// Inverse of [`Document::to_utf16`].
    pub fn to_byte_column(
        &self,
        position: IdePosition,
    ) -> IdePosition {
        let Some(&line_start) = self.line_offsets.get(position.line as usize) else {
            return position;
        };
        match self.offset_of(Position::new(position.line, position.character)) {
            Some(offset) => IdePosition::new(position.line, (offset - line_start) as u32),
            None => position,
        }
    }

    pub fn to_utf16_range(
        &self,
        range: IdeRange,
    ) -> IdeRange {
        IdeRange::new(self.to_utf16(range.start), self.to_utf16(range.end))
    }

    // ── mutations ───────────────────────────────────────────────────────

    /// Replace the full content and bump version.
    pub fn set_content(
        &mut self,
        text: String,
        version: i32,
    ) {
        self.text = text;
        self.version = version;
        self.line_offsets = Self::compute_line_offsets(&self.text);
    }

    /// Apply a list of incremental or full-content changes and bump version.
    pub fn apply_changes(
        &mut self,
        changes: Vec<TextDocumentContentChangeEvent>,
        version: i32,
    ) {
        for change in changes {
            if let Some(range) = change.range {
                if let (Some(start), Some(end)) = (self.offset_of(range.start), self.offset_of(range.end)) {
                    self.text.replace_range(start..end, &change.text);
                    self.line_offsets = Self::compute_line_offsets(&self.text);
                }
            } else {
                self.text = change.text;
                self.line_offsets = Self::compute_line_offsets(&self.text);
            }
        }
        self.version = version;
    }

    // ── internal helpers ────────────────────────────────────────────────

    fn compute_line_offsets(text: &str) -> Vec<usize> {
        let mut offsets = vec![0usize];
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                offsets.push(i + 1);
            }
        }
        offsets
    }
}

#[cfg(test)]
#[path = "../../tests/src/document/text_document_tests.rs"]
mod tests;
