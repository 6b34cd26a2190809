use tracing::debug;

use crate::{
    ast::{DeclId, DeclTree},
    ide::navigation::IdeLocation,
    index::{RelationKind, RelationsRequest, SymbolIndex, symbol_id},
    lens::location::declaration_location,
};

/// Supertypes/overridden methods and subtypes/overriders of a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Hierarchy {
    /// Taken from the tree: what the declaration extends or overrides.
    pub(crate) bases: Vec<IdeLocation>,
    /// Taken from the index: what extends or overrides the declaration.
    pub(crate) derived: Vec<IdeLocation>,
}

pub(crate) fn resolve_hierarchy(
    tree: &DeclTree,
    decl: DeclId,
    index: Option<&dyn SymbolIndex>,
    limit: u32,
) -> Hierarchy {
    let kind = &tree.node(decl).kind;
    let mut hierarchy = Hierarchy::default();

    if let Some(record) = kind.record() {
        if !record.is_final {
            hierarchy.derived = lookup_index(tree, decl, index, limit, RelationKind::BaseOf);
        }
        hierarchy.bases = record.bases.iter().filter_map(|&base| declaration_location(tree, base)).collect();
    } else if let Some(method) = kind.method() {
        if method.is_virtual {
            hierarchy.derived = lookup_index(tree, decl, index, limit, RelationKind::OverriddenBy);
        }
        hierarchy.bases =
            method.overridden.iter().filter_map(|&overridden| declaration_location(tree, overridden)).collect();
    }

    hierarchy
}

fn lookup_index(
    tree: &DeclTree,
    decl: DeclId,
    index: Option<&dyn SymbolIndex>,
    limit: u32,
    predicate: RelationKind,
) -> Vec<IdeLocation> {
    let mut results = Vec::new();
    let Some(index) = index else {
        return results;
    };
    let Some(id) = symbol_id(tree, decl) else {
        return results;
    };

    let request = RelationsRequest {
        subjects: vec![id],
        predicate,
        limit,
    };
    index.relations(&request, &mut |_, object| {
        if (results.len() as u64) < u64::from(limit) {
            results.push(object.canonical_declaration.clone());
        }
    });

    debug!("[code-lens] {predicate:?} lookup for {:?} returned {}", tree.node(decl).name(), results.len());
    results
}
