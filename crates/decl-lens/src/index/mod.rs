//! Query interfaces to the workspace symbol index.
//!
//! The lens walker only ever talks to [`SymbolIndex`] and [`ReferenceSearch`];
//! how the index is populated, cached or refreshed is not its concern.

mod project_index;

pub use project_index::{FileSymbols, IndexedReference, ProjectIndex, Relation};

use crate::{
    ast::{DeclId, DeclKind, DeclTree},
    ide::navigation::{IdeLocation, IdePosition},
};

/// Cross-file identity of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(String);

impl SymbolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SymbolId {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relation predicates, always read "subject <predicate> object".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Subject is a base class of object.
    BaseOf,
    /// Subject is a virtual method overridden by object.
    OverriddenBy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationsRequest {
    pub subjects: Vec<SymbolId>,
    pub predicate: RelationKind,
    /// Maximum number of pairs reported to the callback.
    pub limit: u32,
}

/// An indexed declaration, as seen from outside the file being annotated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedSymbol {
    pub id: SymbolId,
    pub name: String,
    pub canonical_declaration: IdeLocation,
}

pub trait SymbolIndex: Send + Sync {
    /// Report every `(subject, object)` pair matching `request`, up to its
    /// limit. Subjects the index has never seen produce no callbacks.
    fn relations(
        &self,
        request: &RelationsRequest,
        callback: &mut dyn FnMut(&SymbolId, &IndexedSymbol),
    );
}

pub trait ReferenceSearch {
    /// Uses of the declaration whose name covers `position` in `tree`'s main
    /// file, in index order. `limit == 0` means unbounded.
    fn find_references(
        &self,
        tree: &DeclTree,
        position: IdePosition,
        limit: u32,
    ) -> Vec<IdeLocation>;
}

/// Stable cross-file identity for a declaration, or `None` for anonymous
/// declarations.
///
/// Functions and methods include their type so overloads stay distinct.
/// Template wrappers share the identity of their pattern.
pub fn symbol_id(
    tree: &DeclTree,
    decl: DeclId,
) -> Option<SymbolId> {
    let node = tree.node(decl);
    let prefix = match &node.kind {
        DeclKind::Template {
            pattern: Some(pattern),
        } => return symbol_id(tree, *pattern),
        DeclKind::Template {
            pattern: None,
        } => "t",
        DeclKind::Record(_)
        | DeclKind::ClassSpecialization {
            ..
        } => "c",
        DeclKind::Method(_) => "m",
        DeclKind::Function => "f",
        DeclKind::FunctionSpecialization {
            method, ..
        } => {
            if method.is_some() {
                "m"
            } else {
                "f"
            }
        },
        DeclKind::Namespace | DeclKind::NamespaceAlias => "n",
        DeclKind::Other => "v",
    };
    let qualified = tree.qualified_name(decl)?;
    let id = match (prefix, node.qual_type.as_deref()) {
        ("m" | "f", Some(ty)) => format!("{prefix}:{qualified}#{ty}"),
        _ => format!("{prefix}:{qualified}"),
    };
    Some(SymbolId(id))
}

#[cfg(test)]
#[path = "../../tests/src/index/symbol_id_tests.rs"]
mod tests;
