use std::{
    panic::AssertUnwindSafe,
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use futures::FutureExt;
use tower_lsp::{
    LanguageServer,
    jsonrpc::{Error, ErrorCode, Result},
    lsp_types::*,
};
use tracing::{debug, info, warn};

use crate::{
    config::{SOURCE_EXTENSIONS, ServerSettings},
    document::Document,
    ide::{
        lsp::{lens_to_lsp, lsp_code_lens_to_lens},
        navigation::IdeRange,
    },
    lens::{Lens, LensError, document_lenses, resolve_lens},
    server::{
        state::{DeclLensServer, ParsedUnit},
        workspace::{WatchedFileAction, WorkspaceIndexer, watched_file_action},
    },
};

const CLIENT_NOTIFICATION_PREFIX: &str = "decl-lens:";
const WATCHED_FILES_REGISTRATION: &str = "decl-lens/watchedFiles";

/// Idle time after the last edit before the document is re-dumped.
const REPARSE_DEBOUNCE_MS: u64 = 300;

#[tower_lsp::async_trait]
impl LanguageServer for DeclLensServer {
    async fn initialize(
        &self,
        params: InitializeParams,
    ) -> Result<InitializeResult> {
        info!("Initializing decl-lens...");

        let initial_settings = ServerSettings::from_lsp_payload(params.initialization_options.as_ref());
        self.apply_settings(initial_settings).await;

        let roots = if let Some(folders) = params.workspace_folders {
            folders.iter().filter_map(|f| f.uri.to_file_path().ok()).collect()
        } else if let Some(root) = params.root_uri {
            root.to_file_path().ok().into_iter().collect()
        } else {
            Vec::new()
        };
        *self.workspace_roots.write().await = roots;

        let watch_files = params
            .capabilities
            .workspace
            .as_ref()
            .and_then(|workspace| workspace.did_change_watched_files.as_ref())
            .and_then(|watched| watched.dynamic_registration)
            .unwrap_or(false);
        self.watch_files.store(watch_files, Ordering::Relaxed);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                code_lens_provider: Some(CodeLensOptions {
                    resolve_provider: Some(true),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "decl-lens".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(
        &self,
        _: InitializedParams,
    ) {
        info!("decl-lens initialized");
        if self.watch_files.load(Ordering::Relaxed) {
            self.spawn_watch_registration();
        }

        let settings = self.settings_snapshot().await;
        if !settings.indexing.enable {
            info!("Skipping workspace scan because decl-lens.indexing.enable=false");
            return;
        }
        self.spawn_workspace_scan(settings).await;
    }

    async fn did_change_configuration(
        &self,
        params: DidChangeConfigurationParams,
    ) {
        let current = self.settings_snapshot().await;
        let merged = current.merged_with_payload(&params.settings);
        if merged == current {
            return;
        }

        let indexing_inputs_changed = merged.indexing != current.indexing || merged.compiler != current.compiler;
        let should_start_workspace_scan = merged.indexing.enable && indexing_inputs_changed;
        self.apply_settings(merged.clone()).await;
        info!("Applied updated decl-lens settings");

        if should_start_workspace_scan {
            self.spawn_workspace_scan(merged).await;
        }
    }

    async fn did_change_watched_files(
        &self,
        params: DidChangeWatchedFilesParams,
    ) {
        let mut changed = Vec::new();
        for event in params.changes {
            let Ok(path) = event.uri.to_file_path() else {
                continue;
            };
            match watched_file_action(&path, event.typ, self.document_store.contains(&event.uri)) {
                WatchedFileAction::Ignore => {},
                WatchedFileAction::Remove => {
                    debug!("[indexing] {} deleted, dropping its index entry", path.display());
                    self.index.remove_file(&path);
                },
                WatchedFileAction::Reindex => changed.push(path),
            }
        }

        let settings = self.settings_snapshot().await;
        if changed.is_empty() || !settings.indexing.enable {
            return;
        }
        let indexer = self.workspace_indexer(settings).await;
        tokio::spawn(async move {
            indexer.index_changed_files(&changed).await;
        });
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down decl-lens");
        Ok(())
    }

    async fn did_open(
        &self,
        params: DidOpenTextDocumentParams,
    ) {
        let uri = params.text_document.uri;
        let text = params.text_document.text;
        let version = params.text_document.version;
        let filename = short_name(&uri);
        let settings = self.settings_snapshot().await;

        info!("Opened {filename} (v{version}, {} bytes)", text.len());
        if settings.logging.level.allows_info() {
            let _ = AssertUnwindSafe(
                self.client.log_message(MessageType::INFO, prefixed_client_message(format!("Opened {filename}"))),
            )
            .catch_unwind()
            .await;
        }

        self.document_store.open(uri.clone(), text, version);
        self.spawn_reparse(uri, settings, None);
    }

    async fn did_change(
        &self,
        params: DidChangeTextDocumentParams,
    ) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        self.document_store.apply_changes(&uri, params.content_changes, version);
        if !self.document_store.contains(&uri) {
            return;
        }

        let settings = self.settings_snapshot().await;
        self.spawn_reparse(uri, settings, Some(Duration::from_millis(REPARSE_DEBOUNCE_MS)));
    }

    async fn did_save(
        &self,
        params: DidSaveTextDocumentParams,
    ) {
        let uri = params.text_document.uri;
        debug!("Saved {}", short_name(&uri));

        if let Some(text) = params.text {
            let version = self.document_store.get(&uri).map(|doc| doc.version).unwrap_or(0);
            self.document_store.update(uri.clone(), text, version);
        }
        if !self.document_store.contains(&uri) {
            return;
        }
        let settings = self.settings_snapshot().await;
        self.spawn_reparse(uri, settings, None);
    }

    async fn did_close(
        &self,
        params: DidCloseTextDocumentParams,
    ) {
        let uri = params.text_document.uri;
        debug!("Closed {}", short_name(&uri));
        // The index entry stays: it is the workspace view of the file.
        self.document_store.close(&uri);
        self.snapshots.remove(&uri);
        self.parse_generation.remove(&uri);
    }

    async fn code_lens(
        &self,
        params: CodeLensParams,
    ) -> Result<Option<Vec<CodeLens>>> {
        let uri = params.text_document.uri;
        let settings = self.settings_snapshot().await;
        if !settings.lens.enable {
            return Ok(None);
        }
        let Some(unit) = self.snapshot(&uri) else {
            debug!("[code-lens] no snapshot yet for {}", short_name(&uri));
            return Ok(None);
        };
        let Ok(path) = uri.to_file_path() else {
            return Ok(None);
        };

        let lenses = document_lenses(&unit.tree, Some(self.index.as_ref()), &settings.lens.options(), &path);
        let doc = self.matching_document(&uri, &unit);
        debug!("[code-lens] {} lens(es) for {}", lenses.len(), short_name(&uri));
        Ok(Some(lenses.iter().map(|lens| lens_to_lsp(lens, doc.as_ref())).collect()))
    }

    async fn code_lens_resolve(
        &self,
        params: CodeLens,
    ) -> Result<CodeLens> {
        let Some(lens) = lsp_code_lens_to_lens(&params) else {
            return Err(Error::invalid_params(LensError::NotResolvable.to_string()));
        };
        let Some(path) = lens.resolve_data().map(|data| data.path.clone()) else {
            return Err(Error::invalid_params(LensError::NotResolvable.to_string()));
        };
        let uri = Url::from_file_path(&path).map_err(|()| Error::invalid_params(LensError::NotResolvable.to_string()))?;

        let Some(unit) = self.snapshot(&uri) else {
            return Err(lens_error(
                LensError::StaleSnapshot {
                    path,
                },
            ));
        };
        let doc = self.matching_document(&uri, &unit);
        let lens = match &doc {
            Some(doc) => to_byte_columns(lens, doc),
            None => lens,
        };

        let limit = self.settings_snapshot().await.lens.limit;
        let resolved = resolve_lens(&unit.tree, &lens, limit, self.index.as_ref(), &path).map_err(lens_error)?;
        Ok(lens_to_lsp(&resolved, doc.as_ref()))
    }
}

impl DeclLensServer {
    fn snapshot(
        &self,
        uri: &Url,
    ) -> Option<Arc<ParsedUnit>> {
        self.snapshots.get(uri).map(|entry| Arc::clone(entry.value()))
    }

    /// The open document, when its text is the one `unit` was parsed from.
    /// Column conversion against any other text would be wrong.
    fn matching_document(
        &self,
        uri: &Url,
        unit: &ParsedUnit,
    ) -> Option<Document> {
        self.document_store.get(uri).filter(|doc| doc.version == unit.version)
    }

    /// Re-dump `uri` in the background, after `debounce` if given. Only the
    /// latest request per document publishes its result.
    fn spawn_reparse(
        &self,
        uri: Url,
        settings: ServerSettings,
        debounce: Option<Duration>,
    ) {
        let generation = self.next_generation(&uri);
        let reparser = self.reparser();
        let generations = self.parse_generation.clone();
        tokio::spawn(async move {
            if let Some(delay) = debounce {
                tokio::time::sleep(delay).await;
                if generations.get(&uri).is_none_or(|current| *current != generation) {
                    return;
                }
            }
            reparser.reparse(&uri, generation, &settings).await;
        });
    }

    async fn workspace_indexer(
        &self,
        settings: ServerSettings,
    ) -> WorkspaceIndexer {
        WorkspaceIndexer {
            client: self.client.clone(),
            index: self.index.clone(),
            document_store: self.document_store.clone(),
            workspace_roots: self.workspace_roots.read().await.clone(),
            settings,
        }
    }

    /// Scan the workspace in the background, replacing any scan in flight.
    async fn spawn_workspace_scan(
        &self,
        settings: ServerSettings,
    ) {
        let indexer = self.workspace_indexer(settings).await;
        self.scan
            .start(async move {
                indexer.index_workspace().await;
            })
            .await;
    }

    fn spawn_watch_registration(&self) {
        let client = self.client.clone();
        tokio::spawn(async move {
            let registration = Registration {
                id: WATCHED_FILES_REGISTRATION.to_string(),
                method: "workspace/didChangeWatchedFiles".to_string(),
                register_options: serde_json::to_value(watched_files_options()).ok(),
            };
            let result = AssertUnwindSafe(client.register_capability(vec![registration])).catch_unwind().await;
            match result {
                Ok(Ok(())) => debug!("Registered watchers for C/C++ sources"),
                Ok(Err(error)) => debug!("didChangeWatchedFiles registration failed: {error}"),
                Err(_) => warn!("didChangeWatchedFiles registration panicked (client may have disconnected)"),
            }
        });
    }
}

fn to_byte_columns(
    lens: Lens,
    doc: &Document,
) -> Lens {
    match lens {
        Lens::Unresolved {
            range,
            data,
        } => Lens::Unresolved {
            range: IdeRange::new(doc.to_byte_column(range.start), doc.to_byte_column(range.end)),
            data,
        },
        resolved => resolved,
    }
}

fn lens_error(error: LensError) -> Error {
    match error {
        LensError::NotResolvable => Error::invalid_params(error.to_string()),
        LensError::StaleSnapshot {
            ..
        } => {
            warn!("[code-lens] {error}");
            Error {
                code: ErrorCode::ContentModified,
                message: error.to_string().into(),
                data: None,
            }
        },
    }
}

fn watched_files_options() -> DidChangeWatchedFilesRegistrationOptions {
    DidChangeWatchedFilesRegistrationOptions {
        watchers: vec![FileSystemWatcher {
            glob_pattern: GlobPattern::String(format!("**/*.{{{}}}", SOURCE_EXTENSIONS.join(","))),
            kind: None,
        }],
    }
}

fn short_name(uri: &Url) -> String {
    uri.path().rsplit('/').next().unwrap_or(uri.path()).to_owned()
}

fn prefixed_client_message(message: impl AsRef<str>) -> String {
    format!("{CLIENT_NOTIFICATION_PREFIX} {}", message.as_ref())
}

#[cfg(test)]
#[path = "../../tests/src/server/handler_tests.rs"]
mod tests;
