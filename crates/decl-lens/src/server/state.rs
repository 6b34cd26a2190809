use std::{
    panic::AssertUnwindSafe,
    path::PathBuf,
    sync::{Arc, atomic::AtomicBool},
};

use dashmap::DashMap;
use futures::FutureExt;
use tokio::sync::RwLock;
use tower_lsp::{Client, lsp_types::Url};
use tracing::{debug, warn};

use crate::{
    ast::{DeclTree, load_clang_ast, run_ast_dump},
    config::ServerSettings,
    document::DocumentStore,
    index::ProjectIndex,
    server::workspace::ScanSlot,
};

/// Parsed state of one document, shared between lens requests.
///
/// Replaced wholesale on every successful reparse; requests holding the
/// previous `Arc` keep answering from it.
#[derive(Debug)]
pub struct ParsedUnit {
    pub tree: DeclTree,
    /// Document version the tree was parsed from.
    pub version: i32,
}

/// The decl-lens backend that implements the Language Server Protocol.
pub struct DeclLensServer {
    /// The LSP client handle, used for lens refresh requests and log messages.
    pub(crate) client: Client,

    /// Thread-safe store of all open documents.
    pub(crate) document_store: Arc<DocumentStore>,

    /// Latest parsed snapshot per open document.
    pub(crate) snapshots: Arc<DashMap<Url, Arc<ParsedUnit>>>,

    /// Workspace-wide relations and references.
    pub(crate) index: Arc<ProjectIndex>,

    /// Monotonic per-document reparse generation.
    ///
    /// Bumped on every edit so a debounced reparse of stale text can be
    /// dropped instead of overwriting newer editor state.
    pub(crate) parse_generation: Arc<DashMap<Url, u64>>,

    /// Workspace root folders, populated during `initialize`.
    pub(crate) workspace_roots: RwLock<Vec<PathBuf>>,

    /// Runtime server settings updated from LSP configuration.
    pub(crate) settings: Arc<RwLock<ServerSettings>>,

    /// Background workspace scan; at most one runs at a time.
    pub(crate) scan: ScanSlot,

    /// Whether the client accepts a dynamic `didChangeWatchedFiles`
    /// registration.
    pub(crate) watch_files: AtomicBool,
}

impl DeclLensServer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            document_store: Arc::new(DocumentStore::new()),
            snapshots: Arc::new(DashMap::new()),
            index: Arc::new(ProjectIndex::new()),
            parse_generation: Arc::new(DashMap::new()),
            workspace_roots: RwLock::new(Vec::new()),
            settings: Arc::new(RwLock::new(ServerSettings::default())),
            scan: ScanSlot::default(),
            watch_files: AtomicBool::new(false),
        }
    }

    pub(crate) async fn settings_snapshot(&self) -> ServerSettings {
        self.settings.read().await.clone()
    }

    pub(crate) async fn apply_settings(
        &self,
        settings: ServerSettings,
    ) {
        *self.settings.write().await = settings;
    }

    /// Bump and return the reparse generation of `uri`.
    pub(crate) fn next_generation(
        &self,
        uri: &Url,
    ) -> u64 {
        let mut generation = self.parse_generation.entry(uri.clone()).or_insert(0);
        *generation += 1;
        *generation
    }

    /// Shared handles a background reparse needs.
    pub(crate) fn reparser(&self) -> Reparser {
        Reparser {
            client: self.client.clone(),
            document_store: self.document_store.clone(),
            snapshots: self.snapshots.clone(),
            index: self.index.clone(),
            parse_generation: self.parse_generation.clone(),
        }
    }
}

/// Re-dumps a document's AST off the request path and publishes the result.
pub(crate) struct Reparser {
    client: Client,
    document_store: Arc<DocumentStore>,
    snapshots: Arc<DashMap<Url, Arc<ParsedUnit>>>,
    index: Arc<ProjectIndex>,
    parse_generation: Arc<DashMap<Url, u64>>,
}

impl Reparser {
    fn is_current(
        &self,
        uri: &Url,
        generation: u64,
    ) -> bool {
        self.parse_generation.get(uri).is_some_and(|current| *current == generation)
    }

    /// Parse the stored text of `uri` and replace its snapshot and index
    /// entry. Returns whether a new snapshot was published.
    pub(crate) async fn reparse(
        &self,
        uri: &Url,
        generation: u64,
        settings: &ServerSettings,
    ) -> bool {
        let Some(doc) = self.document_store.get(uri) else {
            return false;
        };
        let Ok(path) = uri.to_file_path() else {
            debug!("[reparse] skipping non-file URI {uri}");
            return false;
        };

        let dump = match run_ast_dump(&settings.compiler, &doc.text, &path).await {
            Ok(dump) => dump,
            Err(error) => {
                warn!("[reparse] {}: {error}", path.display());
                return false;
            },
        };
        if !self.is_current(uri, generation) {
            debug!("[reparse] dropping stale AST for {} (generation {generation})", path.display());
            return false;
        }

        let tree = match load_clang_ast(&dump.json, &doc.text, &path, &dump.tmp_files) {
            Ok(tree) => tree,
            Err(error) => {
                warn!("[reparse] {}: {error}", path.display());
                return false;
            },
        };

        // The document may have been closed while the compiler ran; its
        // facts still belong in the workspace index.
        self.index.index_tree(&path, &tree);
        if !self.document_store.contains(uri) || !self.is_current(uri, generation) {
            return false;
        }
        self.snapshots.insert(
            uri.clone(),
            Arc::new(ParsedUnit {
                tree,
                version: doc.version,
            }),
        );
        debug!("[reparse] published snapshot v{} for {}", doc.version, path.display());

        if settings.lens.enable {
            let result = AssertUnwindSafe(self.client.code_lens_refresh()).catch_unwind().await;
            match result {
                Ok(Ok(())) => {},
                Ok(Err(error)) => debug!("[reparse] codeLens/refresh failed: {error}"),
                Err(_) => warn!("codeLens/refresh panicked (client may have disconnected)"),
            }
        }
        true
    }
}
