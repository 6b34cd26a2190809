use std::{collections::HashSet, path::Path};

use tracing::debug;

use crate::{
    ast::{DeclId, DeclTree, LocationKey},
    index::SymbolIndex,
    lens::{
        classify::classify,
        hierarchy::resolve_hierarchy,
        types::{Lens, LensArgument, LensCommand, LensOptions, ResolveData},
    },
};

/// Compute the code lenses of `tree`'s main file.
///
/// Every lens-worthy declaration gets an unresolved marker; classes and
/// virtual methods additionally get ready `"N base"` / `"N derived"`
/// commands. Lenses are ordered by a pre-order, source-order walk.
pub fn document_lenses(
    tree: &DeclTree,
    index: Option<&dyn SymbolIndex>,
    options: &LensOptions,
    path: &Path,
) -> Vec<Lens> {
    let mut walker = LensWalker {
        tree,
        index,
        limit: options.effective_limit(),
        hierarchy: options.hierarchy,
        path,
        visited: HashSet::new(),
        lenses: Vec::new(),
    };
    for &decl in tree.top_level_decls() {
        walker.visit(decl);
    }

    debug!(
        "[code-lens] {} lenses for {} ({} declarations visited)",
        walker.lenses.len(),
        path.display(),
        walker.visited.len(),
    );
    walker.lenses
}

struct LensWalker<'a> {
    tree: &'a DeclTree,
    index: Option<&'a dyn SymbolIndex>,
    limit: u32,
    hierarchy: bool,
    path: &'a Path,
    visited: HashSet<LocationKey>,
    lenses: Vec<Lens>,
}

impl LensWalker<'_> {
    fn visit(
        &mut self,
        decl: DeclId,
    ) {
        let node = self.tree.node(decl);
        if !self.tree.is_in_main_file(decl) || node.is_implicit || node.name().is_none() || node.is_from_macro() {
            return;
        }

        let mut decl = decl;
        let mut class = classify(&node.kind);
        if let Some(pattern) = class.substitute {
            decl = pattern;
            class = classify(&self.tree.node(pattern).kind);
        }
        if class.is_skip() {
            return;
        }

        let Some(key) = self.tree.location_key(decl) else {
            return;
        };
        if !self.visited.insert(key) {
            return;
        }

        let Some(loc) = self.tree.node(decl).loc else {
            return;
        };
        let range = loc.name_range();

        if class.emit_self {
            self.lenses.push(Lens::Unresolved {
                range,
                data: ResolveData {
                    path: self.path.to_path_buf(),
                },
            });
        }

        if self.hierarchy {
            let hierarchy = resolve_hierarchy(self.tree, decl, self.index, self.limit);
            for (label, locations) in [("base", hierarchy.bases), ("derived", hierarchy.derived)] {
                if locations.is_empty() {
                    continue;
                }
                let argument = LensArgument {
                    path: self.path.to_path_buf(),
                    position: range.start,
                    locations,
                };
                self.lenses.push(Lens::Resolved {
                    range,
                    command: LensCommand::show_references(label, argument),
                });
            }
        }

        if class.visit_children {
            for &child in self.tree.children(decl) {
                self.visit(child);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src/lens/walker_tests.rs"]
mod tests;
