//! Mapping between editor-neutral lens values and LSP wire types.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_lsp::lsp_types::{CodeLens, Command, Location, Position, Range, Url};

use crate::{
    document::Document,
    ide::navigation::{IdeLocation, IdePosition, IdeRange},
    lens::{Lens, LensCommand, ResolveData},
};

/// JSON shape of an unresolved lens' `data` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LensData {
    pub uri: Url,
}

pub fn lsp_position_to_ide(position: Position) -> IdePosition {
    IdePosition::new(position.line, position.character)
}

pub fn ide_position_to_lsp(position: IdePosition) -> Position {
    Position::new(position.line, position.character)
}

pub fn lsp_range_to_ide(range: Range) -> IdeRange {
    IdeRange::new(lsp_position_to_ide(range.start), lsp_position_to_ide(range.end))
}

pub fn ide_range_to_lsp(range: IdeRange) -> Range {
    Range::new(ide_position_to_lsp(range.start), ide_position_to_lsp(range.end))
}

pub fn ide_location_to_lsp(location: &IdeLocation) -> Option<Location> {
    let uri = Url::from_file_path(&location.file_path).ok()?;
    Some(Location {
        uri,
        range: ide_range_to_lsp(location.range),
    })
}

/// Convert a lens into an LSP `CodeLens`.
///
/// When the lens' own document is given, the lens range (and the position
/// carried by its command) is re-expressed in UTF-16 columns. Locations
/// without a `file://` form are dropped and the title counts what is left.
pub fn lens_to_lsp(
    lens: &Lens,
    doc: Option<&Document>,
) -> CodeLens {
    let to_editor = |range: IdeRange| match doc {
        Some(doc) => doc.to_utf16_range(range),
        None => range,
    };
    match lens {
        Lens::Unresolved {
            range,
            data,
        } => CodeLens {
            range: ide_range_to_lsp(to_editor(*range)),
            command: None,
            data: resolve_data_to_json(data),
        },
        Lens::Resolved {
            range,
            command,
        } => CodeLens {
            range: ide_range_to_lsp(to_editor(*range)),
            command: Some(command_to_lsp(command, doc)),
            data: None,
        },
    }
}

fn resolve_data_to_json(data: &ResolveData) -> Option<Value> {
    let uri = Url::from_file_path(&data.path).ok()?;
    serde_json::to_value(LensData {
        uri,
    })
    .ok()
}

fn command_to_lsp(
    command: &LensCommand,
    doc: Option<&Document>,
) -> Command {
    let argument = &command.argument;
    let position = match doc {
        Some(doc) => doc.to_utf16(argument.position),
        None => argument.position,
    };
    let locations: Vec<Location> = argument.locations.iter().filter_map(ide_location_to_lsp).collect();
    let uri = Url::from_file_path(&argument.path).ok();
    Command {
        title: format!("{} {}", locations.len(), command.label),
        command: command.command.clone(),
        arguments: Some(vec![json!({
            "uri": uri,
            "position": ide_position_to_lsp(position),
            "locations": locations,
        })]),
    }
}

/// Recover the unresolved lens a client sent back for resolution.
///
/// Returns `None` when the lens carries no (or malformed) placeholder data.
pub fn lsp_code_lens_to_lens(lens: &CodeLens) -> Option<Lens> {
    let data: LensData = serde_json::from_value(lens.data.clone()?).ok()?;
    let path = data.uri.to_file_path().ok()?;
    Some(Lens::Unresolved {
        range: lsp_range_to_ide(lens.range),
        data: ResolveData {
            path,
        },
    })
}

#[cfg(test)]
#[path = "../../tests/src/ide/lsp_tests.rs"]
mod tests;
