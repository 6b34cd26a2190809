use std::{
    collections::HashSet,
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::{sync::Mutex, task::JoinHandle};
use tower_lsp::{
    Client,
    lsp_types::{FileChangeType, Url},
};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::{
    ast::{load_clang_ast, run_ast_dump},
    config::{SOURCE_EXTENSIONS, ServerSettings},
    document::DocumentStore,
    index::ProjectIndex,
    progress::IndexingProgress,
    vfs::{FileId, normalized_path},
};

/// Directory names never descended into by the scan.
const SKIPPED_DIRS: &[&str] = &["target", "build", "node_modules", "out", "bin", "obj"];

/// The background scan currently running, if any.
///
/// Starting a scan aborts the previous one, so a burst of configuration
/// changes leaves a single scan writing to the index.
#[derive(Default)]
pub(crate) struct ScanSlot {
    running: Mutex<Option<JoinHandle<()>>>,
}

impl ScanSlot {
    pub(crate) async fn start(
        &self,
        scan: impl Future<Output = ()> + Send + 'static,
    ) {
        let mut running = self.running.lock().await;
        if let Some(previous) = running.take()
            && !previous.is_finished()
        {
            debug!("[indexing] aborting the previous workspace scan");
            previous.abort();
        }
        *running = Some(tokio::spawn(scan));
    }
}

/// What a `workspace/didChangeWatchedFiles` event means for the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatchedFileAction {
    Ignore,
    Remove,
    Reindex,
}

/// Open documents are kept current by their own reparses; everything else
/// follows the file system.
pub(crate) fn watched_file_action(
    path: &Path,
    change: FileChangeType,
    is_open: bool,
) -> WatchedFileAction {
    if is_open || !is_source_file(path) {
        WatchedFileAction::Ignore
    } else if change == FileChangeType::DELETED {
        WatchedFileAction::Remove
    } else {
        WatchedFileAction::Reindex
    }
}

/// Background pass that parses every C/C++ file under the workspace roots
/// into the [`ProjectIndex`], so `derived` and reference counts see files
/// the user has not opened.
pub(crate) struct WorkspaceIndexer {
    pub(crate) client: Client,
    pub(crate) index: Arc<ProjectIndex>,
    pub(crate) document_store: Arc<DocumentStore>,
    pub(crate) workspace_roots: Vec<PathBuf>,
    pub(crate) settings: ServerSettings,
}

impl WorkspaceIndexer {
    pub(crate) async fn index_workspace(&self) {
        if !self.settings.indexing.enable {
            info!("Skipping workspace scan because decl-lens.indexing.enable=false");
            return;
        }

        let files = discover_source_files(&self.workspace_roots, &self.settings);
        self.forget_unlisted(&files);
        let total = files.len();
        if total == 0 {
            info!("No C/C++ files found in workspace");
            return;
        }

        info!("Indexing {total} C/C++ file(s) in workspace…");
        let progress = IndexingProgress::begin(&self.client, total).await;

        let mut failed = 0usize;
        for (done, path) in files.iter().enumerate() {
            if !self.index_file(path).await {
                failed += 1;
            }
            progress.file_done(done + 1).await;
        }

        let count = self.index.file_count();
        info!("Project index complete: {count} file(s) indexed, {failed} failed");
        progress.finish(count, failed).await;
    }

    /// Re-read files the editor reported as created or changed.
    pub(crate) async fn index_changed_files(
        &self,
        paths: &[PathBuf],
    ) {
        let excluded_prefixes = build_exclude_prefixes(&self.workspace_roots, &self.settings.indexing.exclude_paths);
        for path in paths {
            if !is_within_scan(path, &self.workspace_roots, &excluded_prefixes) {
                debug!("[indexing] ignoring change outside the scanned tree: {}", path.display());
                continue;
            }
            self.index_file(path).await;
        }
    }

    /// Drop index entries of files that vanished or left the scanned tree
    /// since the last scan. Open documents keep theirs.
    fn forget_unlisted(
        &self,
        files: &[PathBuf],
    ) {
        let listed: HashSet<FileId> = files.iter().map(|path| FileId::from_path(path)).collect();
        let dropped = self.index.retain_files(|file| {
            listed.contains(file)
                || Url::from_file_path(file.as_str()).is_ok_and(|uri| self.document_store.contains(&uri))
        });
        if dropped > 0 {
            info!("Dropped {dropped} stale file(s) from the project index");
        }
    }

    /// Parse one file from disk. Open documents are skipped: their
    /// reparses keep the index current.
    async fn index_file(
        &self,
        path: &Path,
    ) -> bool {
        if let Ok(uri) = Url::from_file_path(path)
            && self.document_store.contains(&uri)
        {
            return true;
        }
        let Ok(source) = tokio::fs::read_to_string(path).await else {
            debug!("Failed to read {}", path.display());
            return false;
        };
        let dump = match run_ast_dump(&self.settings.compiler, &source, path).await {
            Ok(dump) => dump,
            Err(error) => {
                debug!("Failed to index {}: {error}", path.display());
                return false;
            },
        };
        match load_clang_ast(&dump.json, &source, path, &dump.tmp_files) {
            Ok(tree) => {
                self.index.index_tree(path, &tree);
                true
            },
            Err(error) => {
                debug!("Failed to index {}: {error}", path.display());
                false
            },
        }
    }
}

/// Source files under `roots` in walk order, without duplicates, capped at
/// `indexing.maxFiles`.
pub(crate) fn discover_source_files(
    roots: &[PathBuf],
    settings: &ServerSettings,
) -> Vec<PathBuf> {
    let excluded_prefixes = build_exclude_prefixes(roots, &settings.indexing.exclude_paths);
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    for root in roots {
        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| should_descend_into_workspace_entry(entry, &excluded_prefixes))
            .filter_map(|e| e.ok())
        {
            if files.len() >= settings.indexing.max_files {
                debug!("Workspace scan stopped at {} file(s)", files.len());
                return files;
            }
            if !entry.file_type().is_file() || !is_source_file(entry.path()) {
                continue;
            }
            let normalized = normalized_path(entry.path());
            if seen.insert(normalized.clone()) {
                files.push(normalized);
            }
        }
    }
    files
}

pub(crate) fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

fn should_descend_into_workspace_entry(
    entry: &DirEntry,
    excluded_prefixes: &[PathBuf],
) -> bool {
    let normalized = normalized_path(entry.path());
    if excluded_prefixes.iter().any(|prefix| normalized.starts_with(prefix)) {
        return false;
    }
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return true;
    }
    entry.file_name().to_str().is_some_and(|name| !is_skipped_dir(name))
}

fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

/// Whether a scan of `roots` would have picked up `path`.
pub(crate) fn is_within_scan(
    path: &Path,
    roots: &[PathBuf],
    excluded_prefixes: &[PathBuf],
) -> bool {
    let path = normalized_path(path);
    if !is_source_file(&path) || excluded_prefixes.iter().any(|prefix| path.starts_with(prefix)) {
        return false;
    }
    roots.iter().any(|root| {
        let Ok(relative) = path.strip_prefix(normalized_path(root)) else {
            return false;
        };
        relative
            .parent()
            .into_iter()
            .flat_map(Path::components)
            .all(|dir| dir.as_os_str().to_str().is_some_and(|name| !is_skipped_dir(name)))
    })
}

/// Exclude entries are absolute paths or paths relative to each root.
fn build_exclude_prefixes(
    workspace_roots: &[PathBuf],
    exclude_paths: &[String],
) -> Vec<PathBuf> {
    let mut excluded_prefixes = Vec::new();
    let mut seen = HashSet::new();

    for raw_path in exclude_paths {
        let exclude_path = PathBuf::from(raw_path);
        if exclude_path.is_absolute() {
            let normalized = normalized_path(&exclude_path);
            if seen.insert(normalized.clone()) {
                excluded_prefixes.push(normalized);
            }
            continue;
        }
        for workspace_root in workspace_roots {
            let normalized = normalized_path(&workspace_root.join(&exclude_path));
            if seen.insert(normalized.clone()) {
                excluded_prefixes.push(normalized);
            }
        }
    }

    excluded_prefixes
}

#[cfg(test)]
#[path = "../../tests/src/server/workspace_tests.rs"]
mod tests;
