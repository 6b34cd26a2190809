//! Arena representation of one parsed translation unit.
//!
//! Every declaration lives in a flat `Vec` and is addressed by a [`DeclId`].
//! Parent, child, template-pattern, base-class and overridden-method links
//! are all stored as ids, so the tree can be shared immutably between the
//! lens walker, the reference search and the project index.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{
    ide::navigation::{IdePosition, IdeRange},
    vfs::canonical_path,
};

/// Handle of a declaration inside a [`DeclTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of a file in the tree's file table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceFileId(u32);

/// Location of a declaration's name token.
///
/// `line` and `col` are 1-based as reported by Clang, `col` counted in bytes.
/// `tok_len` is the length of the whole token starting at the location, so
/// the end of the name is the end of the lexical token rather than one
/// character past the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameLoc {
    pub file: SourceFileId,
    pub offset: u32,
    pub line: u32,
    pub col: u32,
    pub tok_len: u32,
    pub is_macro: bool,
}

impl NameLoc {
    pub fn new(
        file: SourceFileId,
        offset: u32,
        line: u32,
        col: u32,
        tok_len: u32,
    ) -> Self {
        Self {
            file,
            offset,
            line,
            col,
            tok_len,
            is_macro: false,
        }
    }

    /// Build a location from a byte offset into `source`, computing line and
    /// column the way Clang reports them.
    pub fn in_source(
        file: SourceFileId,
        source: &str,
        offset: usize,
        tok_len: usize,
    ) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
        let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
        let col = offset - line_start + 1;
        Self::new(file, offset as u32, line as u32, col as u32, tok_len as u32)
    }

    pub fn from_macro(mut self) -> Self {
        self.is_macro = true;
        self
    }

    pub fn key(&self) -> LocationKey {
        LocationKey {
            file: self.file,
            offset: self.offset,
        }
    }

    /// Editor range covering the name token.
    pub fn name_range(&self) -> IdeRange {
        let line = self.line.saturating_sub(1);
        let col = self.col.saturating_sub(1);
        IdeRange::new(IdePosition::new(line, col), IdePosition::new(line, col + self.tok_len))
    }
}

/// Surface position used to de-duplicate declarations that share a name
/// token, such as a template pattern and its canonical declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationKey {
    pub file: SourceFileId,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateStatus {
    /// Generated by the compiler from a pattern; not written in the source.
    ImplicitInstantiation,
    /// `template struct Vec<int>;`
    ExplicitInstantiation,
    /// `template <> struct Vec<bool> { ... };`
    ExplicitSpecialization,
}

impl TemplateStatus {
    pub fn is_explicit(self) -> bool {
        !matches!(self, TemplateStatus::ImplicitInstantiation)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordData {
    /// Immediate declared base classes, in declaration order.
    pub bases: Vec<DeclId>,
    /// No further derivation is possible (`final`).
    pub is_final: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodData {
    pub is_virtual: bool,
    /// Methods this one directly overrides, one per base path.
    pub overridden: Vec<DeclId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    Record(RecordData),
    Method(MethodData),
    Function,
    Namespace,
    NamespaceAlias,
    /// Class/function/alias template wrapper around its templated pattern.
    Template {
        pattern: Option<DeclId>,
    },
    ClassSpecialization {
        status: TemplateStatus,
        record: RecordData,
    },
    FunctionSpecialization {
        status: TemplateStatus,
        method: Option<MethodData>,
    },
    /// Any other named declaration: variables, fields, enums, typedefs.
    Other,
}

impl DeclKind {
    pub fn is_namespace(&self) -> bool {
        matches!(self, DeclKind::Namespace | DeclKind::NamespaceAlias)
    }

    /// Record data for class-like declarations, including specializations.
    pub fn record(&self) -> Option<&RecordData> {
        match self {
            DeclKind::Record(record)
            | DeclKind::ClassSpecialization {
                record, ..
            } => Some(record),
            _ => None,
        }
    }

    /// Method data for member functions, including specialized ones.
    pub fn method(&self) -> Option<&MethodData> {
        match self {
            DeclKind::Method(method) => Some(method),
            DeclKind::FunctionSpecialization {
                method, ..
            } => method.as_ref(),
            _ => None,
        }
    }

    fn record_mut(&mut self) -> Option<&mut RecordData> {
        match self {
            DeclKind::Record(record)
            | DeclKind::ClassSpecialization {
                record, ..
            } => Some(record),
            _ => None,
        }
    }

    fn method_mut(&mut self) -> Option<&mut MethodData> {
        match self {
            DeclKind::Method(method) => Some(method),
            DeclKind::FunctionSpecialization {
                method, ..
            } => method.as_mut(),
            _ => None,
        }
    }
}

/// Semantic owner of a declaration.
///
/// Out-of-line definitions (`void Shape::area() {}`, `void ns::f() {}`) are
/// written in one scope but belong to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SemanticScope {
    /// Same as the lexical parent.
    #[default]
    Lexical,
    TranslationUnit,
    Decl(DeclId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclNode {
    pub name: Option<String>,
    pub kind: DeclKind,
    pub loc: Option<NameLoc>,
    pub is_implicit: bool,
    /// Clang's `type.qualType`, e.g. `"void (int) const"` for methods.
    pub qual_type: Option<String>,
    pub parent: Option<DeclId>,
    pub scope: SemanticScope,
    /// Earlier declaration of the same entity, if any.
    pub previous: Option<DeclId>,
    pub children: Vec<DeclId>,
}

impl DeclNode {
    pub fn new(kind: DeclKind) -> Self {
        Self {
            name: None,
            kind,
            loc: None,
            is_implicit: false,
            qual_type: None,
            parent: None,
            scope: SemanticScope::Lexical,
            previous: None,
            children: Vec::new(),
        }
    }

    pub fn named(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn at(
        mut self,
        loc: NameLoc,
    ) -> Self {
        self.loc = Some(loc);
        self
    }

    pub fn implicit(mut self) -> Self {
        self.is_implicit = true;
        self
    }

    pub fn with_type(
        mut self,
        qual_type: impl Into<String>,
    ) -> Self {
        self.qual_type = Some(qual_type.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn is_from_macro(&self) -> bool {
        self.loc.is_some_and(|loc| loc.is_macro)
    }
}

/// A use of a declaration somewhere in the translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefSite {
    pub target: DeclId,
    pub loc: NameLoc,
}

/// Immutable snapshot of one translation unit's declarations.
#[derive(Debug, Clone)]
pub struct DeclTree {
    nodes: Vec<DeclNode>,
    files: Vec<String>,
    /// `files` resolved once when the tree is built; lookups never touch
    /// the file system.
    canonical_files: Vec<Option<PathBuf>>,
    main_file: SourceFileId,
    top_level: Vec<DeclId>,
    refs: Vec<RefSite>,
}

impl DeclTree {
    pub fn node(
        &self,
        id: DeclId,
    ) -> &DeclNode {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DeclId> + '_ {
        (0..self.nodes.len() as u32).map(DeclId)
    }

    pub fn main_file(&self) -> SourceFileId {
        self.main_file
    }

    /// Path of a file as reported by the parser. May be empty when the
    /// parser could not attribute the location to a file.
    pub fn file_path(
        &self,
        file: SourceFileId,
    ) -> &str {
        self.files.get(file.0 as usize).map(String::as_str).unwrap_or("")
    }

    pub fn main_file_path(&self) -> &str {
        self.file_path(self.main_file)
    }

    /// Canonical absolute path of a file, or `None` when the reported path
    /// is empty or relative.
    pub fn canonical_file_path(
        &self,
        file: SourceFileId,
    ) -> Option<&Path> {
        self.canonical_files.get(file.0 as usize)?.as_deref()
    }

    pub fn top_level_decls(&self) -> &[DeclId] {
        &self.top_level
    }

    pub fn children(
        &self,
        id: DeclId,
    ) -> &[DeclId] {
        &self.node(id).children
    }

    pub fn references(&self) -> &[RefSite] {
        &self.refs
    }

    pub fn is_in_main_file(
        &self,
        id: DeclId,
    ) -> bool {
        self.node(id).loc.is_some_and(|loc| loc.file == self.main_file)
    }

    pub fn location_key(
        &self,
        id: DeclId,
    ) -> Option<LocationKey> {
        self.node(id).loc.map(|loc| loc.key())
    }

    /// Enclosing declaration in the semantic sense; `None` at namespace
    /// scope of the translation unit.
    pub fn semantic_parent(
        &self,
        id: DeclId,
    ) -> Option<DeclId> {
        let node = self.node(id);
        match node.scope {
            SemanticScope::Lexical => node.parent,
            SemanticScope::TranslationUnit => None,
            SemanticScope::Decl(scope) => Some(scope),
        }
    }

    /// `ns::Outer::name`, skipping template wrappers and anonymous scopes.
    pub fn qualified_name(
        &self,
        id: DeclId,
    ) -> Option<String> {
        let mut parts = vec![self.node(id).name()?.to_owned()];
        let mut current = self.semantic_parent(id);
        while let Some(parent) = current {
            let node = self.node(parent);
            if !matches!(node.kind, DeclKind::Template { .. })
                && let Some(name) = node.name()
            {
                parts.push(name.to_owned());
            }
            current = self.semantic_parent(parent);
        }
        parts.reverse();
        Some(parts.join("::"))
    }

    /// Main-file declaration whose name token covers `position`.
    ///
    /// Template wrappers share their pattern's name token; the pattern is
    /// returned in their place.
    pub fn decl_at(
        &self,
        position: IdePosition,
    ) -> Option<DeclId> {
        self.ids().find(|&id| {
            let node = self.node(id);
            !node.is_implicit
                && !matches!(node.kind, DeclKind::Template { .. })
                && node.loc.is_some_and(|loc| loc.file == self.main_file && loc.name_range().contains(position))
        })
    }
}

/// Incremental constructor for [`DeclTree`].
#[derive(Debug)]
pub struct DeclTreeBuilder {
    tree: DeclTree,
    file_ids: HashMap<String, SourceFileId>,
}

impl DeclTreeBuilder {
    pub fn new(main_file: &str) -> Self {
        let mut builder = Self {
            tree: DeclTree {
                nodes: Vec::new(),
                files: Vec::new(),
                canonical_files: Vec::new(),
                main_file: SourceFileId(0),
                top_level: Vec::new(),
                refs: Vec::new(),
            },
            file_ids: HashMap::new(),
        };
        builder.tree.main_file = builder.file(main_file);
        builder
    }

    pub fn main_file(&self) -> SourceFileId {
        self.tree.main_file
    }

    /// Intern a file path.
    pub fn file(
        &mut self,
        path: &str,
    ) -> SourceFileId {
        if let Some(&id) = self.file_ids.get(path) {
            return id;
        }
        let id = SourceFileId(self.tree.files.len() as u32);
        self.tree.files.push(path.to_owned());
        self.file_ids.insert(path.to_owned(), id);
        id
    }

    /// Append `node` as the last child of `parent`, or as a top-level
    /// declaration when `parent` is `None`.
    pub fn add_decl(
        &mut self,
        parent: Option<DeclId>,
        mut node: DeclNode,
    ) -> DeclId {
        let id = DeclId(self.tree.nodes.len() as u32);
        node.parent = parent;
        self.tree.nodes.push(node);
        match parent {
            Some(parent) => self.tree.nodes[parent.index()].children.push(id),
            None => self.tree.top_level.push(id),
        }
        id
    }

    pub fn node(
        &self,
        id: DeclId,
    ) -> &DeclNode {
        self.tree.node(id)
    }

    pub fn node_mut(
        &mut self,
        id: DeclId,
    ) -> &mut DeclNode {
        &mut self.tree.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.tree.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DeclId> + use<> {
        (0..self.tree.nodes.len() as u32).map(DeclId)
    }

    pub fn semantic_parent(
        &self,
        id: DeclId,
    ) -> Option<DeclId> {
        self.tree.semantic_parent(id)
    }

    pub fn qualified_name(
        &self,
        id: DeclId,
    ) -> Option<String> {
        self.tree.qualified_name(id)
    }

    pub fn set_scope(
        &mut self,
        decl: DeclId,
        scope: SemanticScope,
    ) {
        self.node_mut(decl).scope = scope;
    }

    pub fn set_previous(
        &mut self,
        decl: DeclId,
        previous: DeclId,
    ) {
        self.node_mut(decl).previous = Some(previous);
    }

    pub fn set_pattern(
        &mut self,
        template: DeclId,
        pattern: DeclId,
    ) {
        if let DeclKind::Template {
            pattern: slot,
        } = &mut self.node_mut(template).kind
        {
            *slot = Some(pattern);
        }
    }

    pub fn add_base(
        &mut self,
        record: DeclId,
        base: DeclId,
    ) {
        if let Some(data) = self.node_mut(record).kind.record_mut() {
            data.bases.push(base);
        }
    }

    pub fn set_final(
        &mut self,
        record: DeclId,
    ) {
        if let Some(data) = self.node_mut(record).kind.record_mut() {
            data.is_final = true;
        }
    }

    pub fn set_virtual(
        &mut self,
        method: DeclId,
    ) {
        if let Some(data) = self.node_mut(method).kind.method_mut() {
            data.is_virtual = true;
        }
    }

    pub fn add_overridden(
        &mut self,
        method: DeclId,
        overridden: DeclId,
    ) {
        if let Some(data) = self.node_mut(method).kind.method_mut() {
            data.overridden.push(overridden);
        }
    }

    pub fn add_reference(
        &mut self,
        target: DeclId,
        loc: NameLoc,
    ) {
        self.tree.refs.push(RefSite {
            target,
            loc,
        });
    }

    /// Freeze the tree, resolving every file path to its canonical form.
    pub fn finish(mut self) -> DeclTree {
        self.tree.canonical_files = self.tree.files.iter().map(|path| canonical_path(path)).collect();
        self.tree
    }
}

#[cfg(test)]
#[path = "../../tests/src/ast/tree_tests.rs"]
mod tests;
