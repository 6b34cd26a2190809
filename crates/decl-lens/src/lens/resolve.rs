use std::path::Path;

use tracing::debug;

use crate::{
    ast::DeclTree,
    index::ReferenceSearch,
    lens::types::{Lens, LensArgument, LensCommand, LensError},
};

/// Turn an unresolved marker into a `"N references"` command by searching
/// for uses of the declaration at the lens' start position.
///
/// Resolved lenses carry no placeholder and are rejected with
/// [`LensError::NotResolvable`].
pub fn resolve_lens(
    tree: &DeclTree,
    lens: &Lens,
    limit: u32,
    search: &dyn ReferenceSearch,
    path: &Path,
) -> Result<Lens, LensError> {
    let Lens::Unresolved {
        range, ..
    } = lens
    else {
        return Err(LensError::NotResolvable);
    };

    let position = range.start;
    let locations = search.find_references(tree, position, limit);
    debug!(
        "[code-lens] resolved {}:{}:{} to {} references",
        path.display(),
        position.line + 1,
        position.character + 1,
        locations.len(),
    );

    let argument = LensArgument {
        path: path.to_path_buf(),
        position,
        locations,
    };
    Ok(Lens::Resolved {
        range: *range,
        command: LensCommand::show_references("references", argument),
    })
}

#[cfg(test)]
#[path = "../../tests/src/lens/resolve_tests.rs"]
mod tests;
