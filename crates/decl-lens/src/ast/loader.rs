//! Build a [`DeclTree`] from Clang's JSON AST dump.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use clang_ast::{Id, SourceLocation, SourceRange};
use tracing::debug;

use crate::ast::{
    clang_nodes::{Clang, FunctionDecl, NamedDecl, Node, RecordDecl, RefExprData, surface_loc},
    tree::{
        DeclId, DeclKind, DeclNode, DeclTree, DeclTreeBuilder, MethodData, NameLoc, RecordData, SemanticScope,
        TemplateStatus,
    },
};

/// Base-class searches deeper than this are treated as malformed input.
const MAX_HIERARCHY_DEPTH: usize = 64;

#[derive(Debug)]
pub enum LoadError {
    Json(serde_json::Error),
}

impl std::fmt::Display for LoadError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Json(error) => write!(f, "invalid Clang AST JSON: {error}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Parse a `clang -Xclang -ast-dump=json` dump into a declaration tree.
///
/// `source` is the text that was compiled and `main_file` the document path
/// it stands for. Locations reported in any of `tmp_files` (the paths the
/// text was actually compiled from) are attributed to `main_file`.
pub fn load_clang_ast(
    json: &str,
    source: &str,
    main_file: &Path,
    tmp_files: &[String],
) -> Result<DeclTree, LoadError> {
    let root: Node = serde_json::from_str(json).map_err(LoadError::Json)?;
    let main_path = main_file.display().to_string();

    let mut loader = Loader {
        builder: DeclTreeBuilder::new(&main_path),
        root_id: root.id.to_string(),
        source,
        main_path,
        tmp_files,
        path_cache: HashMap::new(),
        clang_ids: HashMap::new(),
        definitions: HashSet::new(),
        pending_bases: Vec::new(),
        pending_scopes: Vec::new(),
        pending_previous: Vec::new(),
        pending_refs: Vec::new(),
    };
    for child in &root.inner {
        loader.walk(child, None);
    }
    let tree = loader.finish();

    debug!("[load-ast] {} declarations, {} references", tree.len(), tree.references().len());
    Ok(tree)
}

struct Loader<'a> {
    builder: DeclTreeBuilder,
    root_id: String,
    source: &'a str,
    main_path: String,
    tmp_files: &'a [String],
    path_cache: HashMap<String, String>,
    /// Clang node id -> arena id.
    clang_ids: HashMap<String, DeclId>,
    /// Records with a complete definition (preferred for base lookup).
    definitions: HashSet<DeclId>,
    pending_bases: Vec<(DeclId, Vec<String>)>,
    /// `parentDeclContextId`: only written when the semantic context
    /// differs from the lexical one.
    pending_scopes: Vec<(DeclId, String)>,
    /// `previousDecl`: the prior declaration of a redeclared entity.
    pending_previous: Vec<(DeclId, String)>,
    pending_refs: Vec<(String, NameLoc)>,
}

impl Loader<'_> {
    fn walk(
        &mut self,
        node: &Node,
        parent: Option<DeclId>,
    ) {
        let decl = match &node.kind {
            Clang::CXXRecordDecl(d) => self.record(node, d, parent, None),
            Clang::ClassTemplateSpecializationDecl(d) => {
                let status = self.specialization_status(parent, d.range.as_ref(), TemplateStatus::ExplicitSpecialization);
                self.record(node, d, parent, Some(status))
            },
            Clang::ClassTemplatePartialSpecializationDecl(d) => {
                self.record(node, d, parent, Some(TemplateStatus::ExplicitSpecialization))
            },
            Clang::FunctionDecl(d) => self.function(node, d, parent, false),
            Clang::CXXMethodDecl(d)
            | Clang::CXXConstructorDecl(d)
            | Clang::CXXDestructorDecl(d)
            | Clang::CXXConversionDecl(d) => self.function(node, d, parent, true),
            Clang::NamespaceDecl(d) => self.named(node, d, parent, DeclKind::Namespace),
            Clang::NamespaceAliasDecl(d) => self.named(node, d, parent, DeclKind::NamespaceAlias),
            Clang::ClassTemplateDecl(d)
            | Clang::FunctionTemplateDecl(d)
            | Clang::TypeAliasTemplateDecl(d)
            | Clang::VarTemplateDecl(d) => self.named(
                node,
                d,
                parent,
                DeclKind::Template {
                    pattern: None,
                },
            ),
            Clang::VarDecl(d)
            | Clang::FieldDecl(d)
            | Clang::EnumDecl(d)
            | Clang::EnumConstantDecl(d)
            | Clang::TypedefDecl(d)
            | Clang::TypeAliasDecl(d) => self.named(node, d, parent, DeclKind::Other),
            Clang::FinalAttr(_) => {
                if let Some(record) = parent {
                    self.builder.set_final(record);
                }
                None
            },
            Clang::DeclRefExpr(d) => {
                self.reference(d, false);
                None
            },
            Clang::MemberExpr(d) => {
                self.reference(d, true);
                None
            },
            Clang::Other {
                ..
            } => None,
        };

        // Non-declaration nodes (statements, linkage specs, ...) are
        // transparent: their declarations attach to the nearest declaration.
        let scope = decl.or(parent);
        for child in &node.inner {
            self.walk(child, scope);
        }
    }

    fn record(
        &mut self,
        node: &Node,
        data: &RecordDecl,
        parent: Option<DeclId>,
        status: Option<TemplateStatus>,
    ) -> Option<DeclId> {
        let kind = match status {
            Some(status) => DeclKind::ClassSpecialization {
                status,
                record: RecordData::default(),
            },
            None if self.is_instantiation_slot(parent) => DeclKind::ClassSpecialization {
                status: TemplateStatus::ImplicitInstantiation,
                record: RecordData::default(),
            },
            None => DeclKind::Record(RecordData::default()),
        };
        let mut decl = DeclNode::new(kind);
        decl.name = data.name.clone();
        decl.is_implicit = data.is_implicit.unwrap_or(false);
        decl.loc = data.loc.as_ref().and_then(|loc| self.name_loc(loc));

        let id = self.add(node, parent, decl);
        self.redeclaration(id, data.parent_decl_context_id, data.previous_decl);
        if data.complete_definition.unwrap_or(false) {
            self.definitions.insert(id);
        }
        let bases: Vec<String> = data
            .bases
            .iter()
            .flatten()
            .filter_map(|base| base.ty.as_ref().and_then(|ty| ty.as_str()).map(str::to_owned))
            .collect();
        if !bases.is_empty() {
            self.pending_bases.push((id, bases));
        }
        Some(id)
    }

    fn function(
        &mut self,
        node: &Node,
        data: &FunctionDecl,
        parent: Option<DeclId>,
        is_method: bool,
    ) -> Option<DeclId> {
        let method = is_method.then(|| MethodData {
            is_virtual: data.is_virtual.unwrap_or(false),
            overridden: Vec::new(),
        });
        let status = if self.is_instantiation_slot(parent) {
            Some(TemplateStatus::ImplicitInstantiation)
        } else if self.is_template(parent) {
            None
        } else {
            data.range.as_ref().and_then(|range| self.status_from_source(range))
        };
        let kind = match (status, method) {
            (Some(status), method) => DeclKind::FunctionSpecialization {
                status,
                method,
            },
            (None, Some(method)) => DeclKind::Method(method),
            (None, None) => DeclKind::Function,
        };

        let mut decl = DeclNode::new(kind);
        decl.name = data.name.clone();
        decl.is_implicit = data.is_implicit.unwrap_or(false);
        decl.qual_type = data.ty.as_ref().and_then(|ty| ty.as_str()).map(str::to_owned);
        decl.loc = data.loc.as_ref().and_then(|loc| self.name_loc(loc));
        let id = self.add(node, parent, decl);
        self.redeclaration(id, data.parent_decl_context_id, data.previous_decl);
        Some(id)
    }

    fn named(
        &mut self,
        node: &Node,
        data: &NamedDecl,
        parent: Option<DeclId>,
        kind: DeclKind,
    ) -> Option<DeclId> {
        let mut decl = DeclNode::new(kind);
        decl.name = data.name.clone();
        decl.is_implicit = data.is_implicit.unwrap_or(false);
        decl.qual_type = data.ty.as_ref().and_then(|ty| ty.as_str()).map(str::to_owned);
        decl.loc = data.loc.as_ref().and_then(|loc| self.name_loc(loc));
        let id = self.add(node, parent, decl);
        self.redeclaration(id, data.parent_decl_context_id, data.previous_decl);
        Some(id)
    }

    fn redeclaration(
        &mut self,
        decl: DeclId,
        scope: Option<Id>,
        previous: Option<Id>,
    ) {
        if let Some(scope) = scope {
            self.pending_scopes.push((decl, scope.to_string()));
        }
        if let Some(previous) = previous {
            self.pending_previous.push((decl, previous.to_string()));
        }
    }

    /// Append a declaration; the first declaration inside a template becomes
    /// its pattern.
    fn add(
        &mut self,
        node: &Node,
        parent: Option<DeclId>,
        decl: DeclNode,
    ) -> DeclId {
        let id = self.builder.add_decl(parent, decl);
        self.clang_ids.insert(node.id.to_string(), id);
        if let Some(parent) = parent
            && matches!(self.builder.node(parent).kind, DeclKind::Template { pattern: None })
        {
            self.builder.set_pattern(parent, id);
        }
        id
    }

    fn is_template(
        &self,
        parent: Option<DeclId>,
    ) -> bool {
        parent.is_some_and(|parent| matches!(self.builder.node(parent).kind, DeclKind::Template { .. }))
    }

    /// A template whose pattern is already known lists its implicit
    /// instantiations after it.
    fn is_instantiation_slot(
        &self,
        parent: Option<DeclId>,
    ) -> bool {
        parent.is_some_and(|parent| {
            matches!(
                self.builder.node(parent).kind,
                DeclKind::Template {
                    pattern: Some(_)
                }
            )
        })
    }

    fn specialization_status(
        &mut self,
        parent: Option<DeclId>,
        range: Option<&SourceRange>,
        fallback: TemplateStatus,
    ) -> TemplateStatus {
        if self.is_template(parent) {
            return TemplateStatus::ImplicitInstantiation;
        }
        range.and_then(|range| self.status_from_source(range)).unwrap_or(fallback)
    }

    /// Read the `template` header at the start of a declaration in the main
    /// file's text.
    fn status_from_source(
        &mut self,
        range: &SourceRange,
    ) -> Option<TemplateStatus> {
        let (bare, _) = surface_loc(&range.begin)?;
        if self.source_path(&bare.file) != self.main_path {
            return None;
        }
        template_status_at(self.source, bare.offset)
    }

    fn reference(
        &mut self,
        data: &RefExprData,
        is_member: bool,
    ) {
        if data.is_implicit.unwrap_or(false) {
            return;
        }
        let target = if is_member {
            data.referenced_member_decl.map(|id| id.to_string())
        } else {
            data.referenced_decl.as_ref().map(|decl| decl.id.to_string())
        };
        let (Some(target), Some(range)) = (target, data.range.as_ref()) else {
            return;
        };
        if let Some(loc) = self.reference_loc(range) {
            self.pending_refs.push((target, loc));
        }
    }

    /// The referenced name is the last token of the expression (`ns::f`,
    /// `obj.member`) unless the expression ends in template arguments.
    fn reference_loc(
        &mut self,
        range: &SourceRange,
    ) -> Option<NameLoc> {
        let end = self.name_loc(&range.end);
        let ends_with_template_args = end.is_some_and(|loc| {
            loc.file == self.builder.main_file() && self.source.as_bytes().get(loc.offset as usize) == Some(&b'>')
        });
        if ends_with_template_args {
            return self.name_loc(&range.begin);
        }
        end
    }

    fn name_loc(
        &mut self,
        loc: &SourceLocation,
    ) -> Option<NameLoc> {
        let (bare, is_macro) = surface_loc(loc)?;
        if bare.line == 0 {
            return None;
        }
        let path = self.source_path(&bare.file);
        let file = self.builder.file(&path);
        let loc = NameLoc::new(file, bare.offset as u32, bare.line as u32, bare.col as u32, bare.tok_len as u32);
        Some(if is_macro { loc.from_macro() } else { loc })
    }

    fn source_path(
        &mut self,
        reported: &str,
    ) -> String {
        if let Some(path) = self.path_cache.get(reported) {
            return path.clone();
        }
        let path = if self.tmp_files.iter().any(|tmp| paths_equivalent(reported, tmp)) {
            self.main_path.clone()
        } else {
            reported.to_owned()
        };
        self.path_cache.insert(reported.to_owned(), path.clone());
        path
    }

    fn finish(mut self) -> DeclTree {
        self.link_redeclarations();
        self.link_bases();
        self.link_overrides();
        self.link_references();
        self.builder.finish()
    }

    /// Attach out-of-line declarations to their semantic scope and to the
    /// declaration they redeclare.
    fn link_redeclarations(&mut self) {
        for (decl, scope) in std::mem::take(&mut self.pending_scopes) {
            let scope = if scope == self.root_id {
                SemanticScope::TranslationUnit
            } else if let Some(&owner) = self.clang_ids.get(&scope) {
                SemanticScope::Decl(owner)
            } else {
                continue;
            };
            self.builder.set_scope(decl, scope);
        }
        for (decl, previous) in std::mem::take(&mut self.pending_previous) {
            if let Some(&previous) = self.clang_ids.get(&previous) {
                self.builder.set_previous(decl, previous);
            }
        }
    }

    fn link_bases(&mut self) {
        let mut records: HashMap<String, DeclId> = HashMap::new();
        // Unqualified name -> qualified name, `None` once it is ambiguous.
        let mut by_name: HashMap<String, Option<String>> = HashMap::new();
        for id in self.builder.ids() {
            let node = self.builder.node(id);
            if node.is_implicit || !matches!(node.kind, DeclKind::Record(_)) {
                continue;
            }
            let (Some(name), Some(qualified)) = (node.name(), self.builder.qualified_name(id)) else {
                continue;
            };
            match by_name.get_mut(name) {
                Some(slot) if slot.as_deref() != Some(qualified.as_str()) => *slot = None,
                Some(_) => {},
                None => {
                    by_name.insert(name.to_owned(), Some(qualified.clone()));
                },
            }
            let is_definition = self.definitions.contains(&id);
            match records.get(&qualified) {
                Some(existing) if !is_definition || self.definitions.contains(existing) => {},
                _ => {
                    records.insert(qualified, id);
                },
            }
        }

        for (record, bases) in std::mem::take(&mut self.pending_bases) {
            let scopes = self.enclosing_scopes(record);
            for base in bases {
                let Some(path) = base_type_name(&base) else {
                    continue;
                };
                let found = lookup_base(&records, &scopes, &path).or_else(|| {
                    let qualified = by_name.get(path.as_str())?.as_ref()?;
                    records.get(qualified).copied()
                });
                if let Some(base) = found.filter(|&base| base != record) {
                    self.builder.add_base(record, base);
                }
            }
        }
    }

    /// Qualified names of the scopes enclosing `record`, innermost first,
    /// ending with the global scope (`""`).
    fn enclosing_scopes(
        &self,
        record: DeclId,
    ) -> Vec<String> {
        let mut scopes = Vec::new();
        let mut current = self.builder.semantic_parent(record);
        while let Some(scope) = current {
            if let Some(qualified) = self.builder.qualified_name(scope)
                && scopes.last() != Some(&qualified)
            {
                scopes.push(qualified);
            }
            current = self.builder.semantic_parent(scope);
        }
        scopes.push(String::new());
        scopes
    }

    fn link_overrides(&mut self) {
        for method in self.builder.ids() {
            if self.builder.node(method).kind.method().is_none() {
                continue;
            }
            let overridden = self.find_overridden(method, 0);
            // Out-of-line definitions do not repeat `virtual`.
            let redeclares_virtual = self.builder.node(method).previous.is_some_and(|previous| {
                self.builder.node(previous).kind.method().is_some_and(|data| data.is_virtual)
            });
            if overridden.is_empty() && !redeclares_virtual {
                continue;
            }
            self.builder.set_virtual(method);
            for target in overridden {
                self.builder.add_overridden(method, target);
            }
        }
    }

    /// Virtual methods `method` overrides: for each direct base, the
    /// nearest same-signature virtual method along that base's hierarchy.
    fn find_overridden(
        &self,
        method: DeclId,
        depth: usize,
    ) -> Vec<DeclId> {
        let node = self.builder.node(method);
        let (Some(name), Some(record)) = (node.name(), self.builder.semantic_parent(method)) else {
            return Vec::new();
        };
        let Some(record) = self.builder.node(record).kind.record() else {
            return Vec::new();
        };
        let params = node.qual_type.as_deref().and_then(parameter_list);

        let mut found = Vec::new();
        let mut seen = HashSet::new();
        for &base in &record.bases {
            self.search_base(base, name, params, depth + 1, &mut seen, &mut found);
        }
        found
    }

    fn search_base(
        &self,
        record: DeclId,
        name: &str,
        params: Option<&str>,
        depth: usize,
        seen: &mut HashSet<DeclId>,
        found: &mut Vec<DeclId>,
    ) {
        if depth > MAX_HIERARCHY_DEPTH || !seen.insert(record) {
            return;
        }
        for &child in &self.builder.node(record).children {
            let candidate = self.builder.node(child);
            if candidate.name() == Some(name)
                && candidate.qual_type.as_deref().and_then(parameter_list) == params
                && self.is_virtual(child, depth)
            {
                found.push(child);
                return;
            }
        }
        let Some(data) = self.builder.node(record).kind.record() else {
            return;
        };
        for &base in &data.bases {
            self.search_base(base, name, params, depth + 1, seen, found);
        }
    }

    fn is_virtual(
        &self,
        method: DeclId,
        depth: usize,
    ) -> bool {
        match self.builder.node(method).kind.method() {
            Some(data) => data.is_virtual || !self.find_overridden(method, depth).is_empty(),
            None => false,
        }
    }

    fn link_references(&mut self) {
        for (target, loc) in std::mem::take(&mut self.pending_refs) {
            let Some(&decl) = self.clang_ids.get(&target) else {
                continue;
            };
            let decl = self.pattern_of_instantiation(decl).unwrap_or(decl);
            self.builder.add_reference(decl, loc);
        }
    }

    /// Uses of an implicit instantiation count as uses of the written pattern.
    fn pattern_of_instantiation(
        &self,
        decl: DeclId,
    ) -> Option<DeclId> {
        let node = self.builder.node(decl);
        let status = match &node.kind {
            DeclKind::ClassSpecialization {
                status, ..
            }
            | DeclKind::FunctionSpecialization {
                status, ..
            } => *status,
            _ => return None,
        };
        if status.is_explicit() {
            return None;
        }
        match self.builder.node(node.parent?).kind {
            DeclKind::Template {
                pattern,
            } => pattern,
            _ => None,
        }
    }
}

/// Classify a declaration by the `template` header starting at `offset`:
/// `template <>` is an explicit specialization, `template` (or
/// `extern template`) followed by a declaration is an explicit
/// instantiation, and a parameterized header is neither.
pub(crate) fn template_status_at(
    source: &str,
    offset: usize,
) -> Option<TemplateStatus> {
    let mut rest = source.get(offset..)?;
    if let Some(after) = strip_keyword(rest, "extern") {
        rest = after.trim_start();
    }
    let rest = strip_keyword(rest, "template")?.trim_start();
    match rest.strip_prefix('<') {
        Some(params) if params.trim_start().starts_with('>') => Some(TemplateStatus::ExplicitSpecialization),
        Some(_) => None,
        None => Some(TemplateStatus::ExplicitInstantiation),
    }
}

fn strip_keyword<'s>(
    text: &'s str,
    keyword: &str,
) -> Option<&'s str> {
    let rest = text.strip_prefix(keyword)?;
    if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some(rest)
}

/// Find `path` as seen from `scopes` (innermost first); a leading `::`
/// restricts the search to the global scope.
fn lookup_base(
    records: &HashMap<String, DeclId>,
    scopes: &[String],
    path: &str,
) -> Option<DeclId> {
    if let Some(global) = path.strip_prefix("::") {
        return records.get(global).copied();
    }
    scopes.iter().find_map(|scope| {
        if scope.is_empty() {
            records.get(path).copied()
        } else {
            records.get(&format!("{scope}::{path}")).copied()
        }
    })
}

/// Reduce a base-specifier type to the class path used for lookup.
///
/// E.g. `const ns::Base<int>` -> `ns::Base`, `struct Shape` -> `Shape`.
/// A leading `::` is kept.
pub(crate) fn base_type_name(qual_type: &str) -> Option<String> {
    let stripped = strip_template_args(qual_type);
    let mut s = stripped.trim();

    loop {
        let before = s;
        for prefix in ["const ", "volatile ", "struct ", "class ", "union ", "typename "] {
            if let Some(rest) = before.strip_prefix(prefix) {
                s = rest.trim_start();
                break;
            }
        }
        if before == s {
            break;
        }
    }

    let (global, path) = match s.strip_prefix("::") {
        Some(rest) => ("::", rest),
        None => ("", s),
    };
    let components: Vec<&str> = path.split("::").map(str::trim).collect();
    let valid = components
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_'));
    valid.then(|| format!("{global}{}", components.join("::")))
}

/// Drop every balanced `<...>` group.
fn strip_template_args(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {},
        }
    }
    out
}

/// `"void (int, float) const"` -> `"(int, float) const"`.
fn parameter_list(qual_type: &str) -> Option<&str> {
    qual_type.find('(').map(|idx| &qual_type[idx..])
}

/// Check if two file paths refer to the same file.
///
/// The AST dump may report a canonicalized path while the temp file list
/// has the original path, or vice versa.
fn paths_equivalent(
    a: &str,
    b: &str,
) -> bool {
    if a == b {
        return true;
    }
    let pa = Path::new(a);
    let pb = Path::new(b);
    matches!((pa.canonicalize(), pb.canonicalize()), (Ok(ca), Ok(cb)) if ca == cb)
}

#[cfg(test)]
#[path = "../../tests/src/ast/loader_tests.rs"]
mod tests;
