use crate::{
    ast::{DeclId, DeclTree},
    ide::navigation::IdeLocation,
};

/// Editor location of a declaration's name token.
///
/// Returns `None` when either the declaration's file or the translation
/// unit's main file has no canonical path; such declarations cannot be
/// shown in a location list. Paths were canonicalized when the tree was
/// built, so this does no I/O.
pub fn declaration_location(
    tree: &DeclTree,
    decl: DeclId,
) -> Option<IdeLocation> {
    let loc = tree.node(decl).loc?;
    let file = tree.canonical_file_path(loc.file)?;
    tree.canonical_file_path(tree.main_file())?;
    Some(IdeLocation::new(file, loc.name_range()))
}

#[cfg(test)]
#[path = "../../tests/src/lens/location_tests.rs"]
mod tests;
