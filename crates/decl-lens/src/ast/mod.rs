//! Declaration trees and the Clang front-end that produces them.

mod clang_nodes;
pub mod dump;
pub mod loader;
pub mod tree;

pub use dump::{AstDump, AstDumpError, run_ast_dump};
pub use loader::{LoadError, load_clang_ast};
pub use tree::{
    DeclId, DeclKind, DeclNode, DeclTree, DeclTreeBuilder, LocationKey, MethodData, NameLoc, RecordData, RefSite,
    SemanticScope, SourceFileId, TemplateStatus,
};
