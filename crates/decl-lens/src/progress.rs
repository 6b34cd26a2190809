//! `$/progress` reporting for the background workspace scan.
//!
//! The editor shows one activity item per scan, counting files:
//! `Begin("0 / 40 files")`, a `Report` every few files, and an `End` that
//! summarizes how many files made it into the index.

use std::{
    panic::AssertUnwindSafe,
    sync::atomic::{AtomicU64, Ordering},
};

use futures::FutureExt;
use tower_lsp::{Client, lsp_types::*};
use tracing::{debug, warn};

static NEXT_SCAN_ID: AtomicU64 = AtomicU64::new(1);
const TITLE: &str = "decl-lens: Indexing";
/// Reports are sent after every `REPORT_EVERY` files and after the last one.
const REPORT_EVERY: usize = 5;

/// Progress of one workspace scan over `total` files.
///
/// Dropping it before [`finish`](Self::finish) (for example when the scan is
/// aborted) ends the progress item as cancelled.
pub struct IndexingProgress {
    client: Option<Client>,
    token: NumberOrString,
    total: usize,
}

impl IndexingProgress {
    /// Create the progress token and announce the scan.
    ///
    /// A client that rejects `window/workDoneProgress/create` still gets the
    /// notifications; a client that has gone away gets nothing further.
    pub async fn begin(
        client: &Client,
        total: usize,
    ) -> Self {
        let id = NEXT_SCAN_ID.fetch_add(1, Ordering::Relaxed);
        let token = NumberOrString::String(format!("declLens/indexing/{id}"));

        // The create request runs detached so a slow editor cannot stall the
        // scan. Its receiver must outlive the response.
        let create_client = client.clone();
        let create_token = token.clone();
        tokio::spawn(async move {
            let result = AssertUnwindSafe(create_client.send_request::<request::WorkDoneProgressCreate>(
                WorkDoneProgressCreateParams {
                    token: create_token,
                },
            ))
            .catch_unwind()
            .await;
            match result {
                Ok(Ok(())) => {},
                Ok(Err(error)) => debug!("workDoneProgress/create rejected: {error}"),
                Err(_) => warn!("workDoneProgress/create panicked (client may have disconnected)"),
            }
        });

        let begin = WorkDoneProgress::Begin(WorkDoneProgressBegin {
            title: TITLE.to_owned(),
            cancellable: Some(false),
            message: Some(files_message(0, total)),
            percentage: Some(0),
        });
        let client = send(client, &token, begin).await.then(|| client.clone());
        debug!("[indexing] progress {token:?} started for {total} file(s)");

        Self {
            client,
            token,
            total,
        }
    }

    /// Record that `done` files have been processed.
    pub async fn file_done(
        &self,
        done: usize,
    ) {
        if !should_report(done, self.total) {
            return;
        }
        let Some(client) = &self.client else {
            return;
        };
        let report = WorkDoneProgress::Report(WorkDoneProgressReport {
            cancellable: Some(false),
            message: Some(files_message(done, self.total)),
            percentage: Some(percentage(done, self.total)),
        });
        send(client, &self.token, report).await;
    }

    pub async fn finish(
        mut self,
        indexed: usize,
        failed: usize,
    ) {
        let Some(client) = self.client.take() else {
            return;
        };
        let end = WorkDoneProgress::End(WorkDoneProgressEnd {
            message: Some(summary(indexed, failed)),
        });
        send(&client, &self.token, end).await;
        debug!("[indexing] progress {:?} finished", self.token);
    }
}

impl Drop for IndexingProgress {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        let token = self.token.clone();
        debug!("[indexing] progress {token:?} cancelled");
        tokio::spawn(async move {
            let end = WorkDoneProgress::End(WorkDoneProgressEnd {
                message: Some("Cancelled".to_owned()),
            });
            send(&client, &token, end).await;
        });
    }
}

/// Send one `$/progress` notification; `false` if the client panicked away.
async fn send(
    client: &Client,
    token: &NumberOrString,
    value: WorkDoneProgress,
) -> bool {
    let sent = AssertUnwindSafe(client.send_notification::<notification::Progress>(ProgressParams {
        token: token.clone(),
        value: ProgressParamsValue::WorkDone(value),
    }))
    .catch_unwind()
    .await;
    if sent.is_err() {
        warn!("progress notification panicked (client may have disconnected)");
    }
    sent.is_ok()
}

fn files_message(
    done: usize,
    total: usize,
) -> String {
    format!("{done} / {total} files")
}

fn percentage(
    done: usize,
    total: usize,
) -> u32 {
    if total == 0 {
        return 100;
    }
    (done.min(total) * 100 / total) as u32
}

fn should_report(
    done: usize,
    total: usize,
) -> bool {
    done > 0 && (done % REPORT_EVERY == 0 || done == total)
}

fn summary(
    indexed: usize,
    failed: usize,
) -> String {
    match failed {
        0 => format!("{indexed} file(s) indexed"),
        failed => format!("{indexed} file(s) indexed, {failed} failed"),
    }
}

#[cfg(test)]
#[path = "../tests/src/progress_tests.rs"]
mod tests;
