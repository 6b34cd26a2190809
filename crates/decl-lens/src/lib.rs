pub mod ast;
pub mod config;
pub mod document;
pub mod ide;
pub mod index;
pub mod lens;
pub mod progress;
pub mod server;
pub mod vfs;

pub use ast::{DeclTree, DeclTreeBuilder, load_clang_ast, run_ast_dump};
pub use config::ServerSettings;
pub use index::{ProjectIndex, ReferenceSearch, SymbolIndex};
pub use lens::{Lens, LensError, LensOptions, document_lenses, resolve_lens};
pub use server::DeclLensServer;

#[cfg(test)]
#[path = "../tests/src/support.rs"]
pub(crate) mod test_support;
