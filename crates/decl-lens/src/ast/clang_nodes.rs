use clang_ast::{BareSourceLocation, Id, SourceLocation, SourceRange};
use serde::Deserialize;

pub type Node = clang_ast::Node<Clang>;

/// Clang AST node kinds the loader understands.
///
/// Each variant corresponds to a Clang AST node `"kind"` value.
#[derive(Deserialize)]
pub enum Clang {
    // --- Classes ---
    CXXRecordDecl(RecordDecl),
    ClassTemplateSpecializationDecl(RecordDecl),
    ClassTemplatePartialSpecializationDecl(RecordDecl),

    // --- Functions ---
    FunctionDecl(FunctionDecl),
    CXXMethodDecl(FunctionDecl),
    CXXConstructorDecl(FunctionDecl),
    CXXDestructorDecl(FunctionDecl),
    CXXConversionDecl(FunctionDecl),

    // --- Scopes ---
    NamespaceDecl(NamedDecl),
    NamespaceAliasDecl(NamedDecl),

    // --- Templates ---
    ClassTemplateDecl(NamedDecl),
    FunctionTemplateDecl(NamedDecl),
    TypeAliasTemplateDecl(NamedDecl),
    VarTemplateDecl(NamedDecl),

    // --- Other named declarations ---
    VarDecl(NamedDecl),
    FieldDecl(NamedDecl),
    EnumDecl(NamedDecl),
    EnumConstantDecl(NamedDecl),
    TypedefDecl(NamedDecl),
    TypeAliasDecl(NamedDecl),

    // --- Attributes ---
    FinalAttr(AttrData),

    // --- References ---
    DeclRefExpr(RefExprData),
    MemberExpr(RefExprData),

    // --- Catch-all ---
    // `loc` and `range` must be deserialized even for unrecognized kinds:
    // `clang-ast` carries the "current file" across the stream through
    // `SourceLocation`, and skipping one makes later nodes lose their file.
    #[allow(dead_code)]
    Other {
        #[serde(default)]
        loc: Option<SourceLocation>,
        #[serde(default)]
        range: Option<SourceRange>,
    },
}

#[derive(Deserialize, Debug)]
pub struct NamedDecl {
    pub name: Option<String>,
    pub loc: Option<SourceLocation>,
    pub range: Option<SourceRange>,
    #[serde(rename = "isImplicit")]
    pub is_implicit: Option<bool>,
    #[serde(rename = "type")]
    pub ty: Option<QualType>,
    #[serde(rename = "parentDeclContextId")]
    pub parent_decl_context_id: Option<Id>,
    #[serde(rename = "previousDecl")]
    pub previous_decl: Option<Id>,
}

#[derive(Deserialize, Debug)]
pub struct RecordDecl {
    pub name: Option<String>,
    pub loc: Option<SourceLocation>,
    pub range: Option<SourceRange>,
    #[serde(rename = "isImplicit")]
    pub is_implicit: Option<bool>,
    #[serde(rename = "completeDefinition")]
    pub complete_definition: Option<bool>,
    pub bases: Option<Vec<BaseSpecifier>>,
    #[serde(rename = "parentDeclContextId")]
    pub parent_decl_context_id: Option<Id>,
    #[serde(rename = "previousDecl")]
    pub previous_decl: Option<Id>,
}

#[derive(Deserialize, Debug)]
pub struct FunctionDecl {
    pub name: Option<String>,
    pub loc: Option<SourceLocation>,
    pub range: Option<SourceRange>,
    #[serde(rename = "isImplicit")]
    pub is_implicit: Option<bool>,
    #[serde(rename = "type")]
    pub ty: Option<QualType>,
    #[serde(rename = "virtual")]
    pub is_virtual: Option<bool>,
    #[serde(rename = "parentDeclContextId")]
    pub parent_decl_context_id: Option<Id>,
    #[serde(rename = "previousDecl")]
    pub previous_decl: Option<Id>,
}

#[derive(Deserialize, Debug)]
pub struct BaseSpecifier {
    #[serde(rename = "type")]
    pub ty: Option<QualType>,
}

#[derive(Deserialize, Debug)]
pub struct AttrData {
    #[allow(dead_code)]
    pub range: Option<SourceRange>,
}

/// Reference expression data (DeclRefExpr, MemberExpr).
#[derive(Deserialize, Debug)]
pub struct RefExprData {
    pub range: Option<SourceRange>,
    #[serde(rename = "referencedDecl")]
    pub referenced_decl: Option<ReferencedDecl>,
    #[serde(rename = "referencedMemberDecl")]
    pub referenced_member_decl: Option<Id>,
    #[serde(rename = "isImplicit")]
    pub is_implicit: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct ReferencedDecl {
    pub id: Id,
}

#[derive(Deserialize, Debug)]
pub struct QualType {
    #[serde(rename = "qualType")]
    pub qual_type: Option<String>,
}

impl QualType {
    pub fn as_str(&self) -> Option<&str> {
        self.qual_type.as_deref()
    }
}

/// Surface location of a [`SourceLocation`] and whether it came from a
/// macro expansion.
///
/// Prefers the expansion location (where a macro was invoked, the position
/// the user sees) over the spelling location inside the macro definition.
pub fn surface_loc(loc: &SourceLocation) -> Option<(&BareSourceLocation, bool)> {
    let is_macro = match (&loc.spelling_loc, &loc.expansion_loc) {
        (Some(spelling), Some(expansion)) => {
            spelling.offset != expansion.offset || spelling.file != expansion.file || expansion.is_macro_arg_expansion
        },
        _ => false,
    };
    let bare = loc.expansion_loc.as_ref().or(loc.spelling_loc.as_ref())?;
    Some((bare, is_macro))
}
