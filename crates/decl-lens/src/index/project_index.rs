use std::{collections::HashSet, path::Path, sync::Arc};

use dashmap::DashMap;

use crate::{
    ast::{DeclKind, DeclTree},
    ide::navigation::{IdeLocation, IdePosition},
    index::{IndexedSymbol, ReferenceSearch, RelationKind, RelationsRequest, SymbolId, SymbolIndex, symbol_id},
    lens::declaration_location,
    vfs::FileId,
};

/// `subject <predicate> object`, contributed by the file declaring `object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub subject: SymbolId,
    pub predicate: RelationKind,
    pub object: IndexedSymbol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedReference {
    pub target: SymbolId,
    pub location: IdeLocation,
}

/// Everything one translation unit contributes to the project index.
///
/// Only facts located in the unit's main file are recorded; headers are
/// indexed through their own entries. A relation is recorded once per
/// symbol pair, at the first declaration of the object (an out-of-line
/// definition repeats what its in-class declaration already says).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSymbols {
    pub relations: Vec<Relation>,
    pub references: Vec<IndexedReference>,
}

impl FileSymbols {
    pub fn from_tree(tree: &DeclTree) -> Self {
        let mut symbols = Self::default();
        let mut recorded = HashSet::new();

        for decl in tree.ids() {
            let node = tree.node(decl);
            if node.is_implicit || !tree.is_in_main_file(decl) || matches!(node.kind, DeclKind::Template { .. }) {
                continue;
            }

            let (predicate, subjects) = if let Some(record) = node.kind.record() {
                (RelationKind::BaseOf, &record.bases)
            } else if let Some(method) = node.kind.method() {
                (RelationKind::OverriddenBy, &method.overridden)
            } else {
                continue;
            };
            if subjects.is_empty() {
                continue;
            }

            let (Some(id), Some(name), Some(location)) =
                (symbol_id(tree, decl), node.name(), declaration_location(tree, decl))
            else {
                continue;
            };
            let object = IndexedSymbol {
                id,
                name: name.to_owned(),
                canonical_declaration: location,
            };
            for &subject in subjects {
                if let Some(subject) = symbol_id(tree, subject)
                    && recorded.insert((subject.clone(), predicate, object.id.clone()))
                {
                    symbols.relations.push(Relation {
                        subject,
                        predicate,
                        object: object.clone(),
                    });
                }
            }
        }

        let main_path = tree.canonical_file_path(tree.main_file());
        for site in tree.references() {
            if site.loc.file != tree.main_file() {
                continue;
            }
            let (Some(target), Some(path)) = (symbol_id(tree, site.target), main_path) else {
                continue;
            };
            symbols.references.push(IndexedReference {
                target,
                location: IdeLocation::new(path, site.loc.name_range()),
            });
        }

        symbols
    }
}

/// Workspace-wide index built from the declaration trees of every parsed
/// file.
///
/// Entries are replaced wholesale when a file is reparsed, so readers may
/// briefly observe the previous version of a file. Queries visit files in
/// path order, which makes answers deterministic for a fixed index.
pub struct ProjectIndex {
    files: DashMap<FileId, Arc<FileSymbols>>,
}

impl Default for ProjectIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectIndex {
    pub fn new() -> Self {
        Self {
            files: DashMap::new(),
        }
    }

    pub fn update_file(
        &self,
        path: &Path,
        symbols: FileSymbols,
    ) {
        self.files.insert(FileId::from_path(path), Arc::new(symbols));
    }

    pub fn index_tree(
        &self,
        path: &Path,
        tree: &DeclTree,
    ) {
        self.update_file(path, FileSymbols::from_tree(tree));
    }

    pub fn remove_file(
        &self,
        path: &Path,
    ) {
        self.files.remove(&FileId::from_path(path));
    }

    /// Drop every entry whose file `keep` rejects. Returns how many were
    /// dropped.
    pub fn retain_files(
        &self,
        mut keep: impl FnMut(&FileId) -> bool,
    ) -> usize {
        let before = self.files.len();
        self.files.retain(|file, _| keep(file));
        before.saturating_sub(self.files.len())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Snapshot of all entries in path order. Cloning the `Arc`s releases
    /// the map's shard locks before callbacks run.
    fn sorted_files(&self) -> Vec<(FileId, Arc<FileSymbols>)> {
        let mut files: Vec<_> = self.files.iter().map(|entry| (entry.key().clone(), Arc::clone(entry.value()))).collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));
        files
    }

    /// Uses of `target` across all indexed files.
    pub fn find_references_to(
        &self,
        target: &SymbolId,
        limit: u32,
    ) -> Vec<IdeLocation> {
        let limit = if limit == 0 { usize::MAX } else { limit as usize };
        let mut results = Vec::new();
        for (_, symbols) in self.sorted_files() {
            for reference in &symbols.references {
                if results.len() >= limit {
                    return results;
                }
                if &reference.target == target {
                    results.push(reference.location.clone());
                }
            }
        }
        results
    }
}

impl SymbolIndex for ProjectIndex {
    fn relations(
        &self,
        request: &RelationsRequest,
        callback: &mut dyn FnMut(&SymbolId, &IndexedSymbol),
    ) {
        let mut reported = 0u32;
        for (_, symbols) in self.sorted_files() {
            for relation in &symbols.relations {
                if reported >= request.limit {
                    return;
                }
                if relation.predicate == request.predicate && request.subjects.contains(&relation.subject) {
                    callback(&relation.subject, &relation.object);
                    reported += 1;
                }
            }
        }
    }
}

impl ReferenceSearch for ProjectIndex {
    fn find_references(
        &self,
        tree: &DeclTree,
        position: IdePosition,
        limit: u32,
    ) -> Vec<IdeLocation> {
        let Some(id) = tree.decl_at(position).and_then(|decl| symbol_id(tree, decl)) else {
            return Vec::new();
        };
        self.find_references_to(&id, limit)
    }
}

#[cfg(test)]
#[path = "../../tests/src/index/project_index_tests.rs"]
mod tests;
