//! The transfer engine: concurrent downloads with pollable progress
//!
//! Callers hand the pool a batch of requests and poll the returned handles
//! on their own tick. Each request runs on its own task; a slow or failed
//! item never blocks the others, and completion order follows the network,
//! not the request order.

use crate::{Download, DownloadResult, NetClient};
use malt_errors::Error;
use malt_hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// One item to download
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Display tag for reporting (the originating item's name)
    pub tag: String,
    pub url: String,
    pub dest: PathBuf,
    /// Bearer token for authenticated object stores
    pub bearer: Option<String>,
    /// Expected SHA-256 digest, verified inline while streaming
    pub expected_hash: Option<Hash>,
}

/// Point-in-time view of one transfer
#[derive(Debug, Clone)]
pub struct TransferSnapshot {
    pub tag: String,
    pub bytes: u64,
    pub total: Option<u64>,
    pub completed: bool,
    /// Terminal error message, if the transfer failed
    pub failed: Option<String>,
}

impl TransferSnapshot {
    /// Percent complete. Monotonically non-decreasing across successive
    /// snapshots of the same transfer; unknown totals report 0 until done.
    #[must_use]
    pub fn percent(&self) -> i32 {
        if self.completed && self.failed.is_none() {
            return 100;
        }
        match self.total {
            Some(total) if total > 0 => {
                let percent = self.bytes.saturating_mul(100) / total;
                i32::try_from(percent.min(100)).unwrap_or(100)
            }
            _ => 0,
        }
    }
}

#[derive(Default)]
struct StatusInner {
    bytes: u64,
    total: Option<u64>,
    completed: bool,
    failed: Option<String>,
}

#[derive(Clone, Default)]
struct StatusCell(Arc<Mutex<StatusInner>>);

impl StatusCell {
    fn update(&self, bytes: u64, total: Option<u64>) {
        let mut inner = self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.bytes = bytes;
        inner.total = total;
    }

    fn finish(&self, failed: Option<String>) {
        let mut inner = self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.completed = true;
        inner.failed = failed;
    }

    fn snapshot(&self, tag: &str) -> TransferSnapshot {
        let inner = self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        TransferSnapshot {
            tag: tag.to_string(),
            bytes: inner.bytes,
            total: inner.total,
            completed: inner.completed,
            failed: inner.failed.clone(),
        }
    }
}

/// Handle to one in-flight transfer
pub struct TransferHandle {
    tag: String,
    dest: PathBuf,
    status: StatusCell,
    task: JoinHandle<Result<DownloadResult, Error>>,
}

impl TransferHandle {
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Current progress snapshot; the engine owns writes, callers only read.
    #[must_use]
    pub fn snapshot(&self) -> TransferSnapshot {
        self.status.snapshot(&self.tag)
    }

    /// Whether the transfer reached a terminal state (success or failure)
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.snapshot().completed
    }

    /// Wait for the transfer and take its outcome
    ///
    /// # Errors
    ///
    /// Returns the transfer's terminal error, or an internal error if the
    /// task panicked.
    pub async fn join(self) -> Result<DownloadResult, Error> {
        self.task
            .await
            .map_err(|e| Error::internal(format!("transfer task failed: {e}")))?
    }
}

/// Fans batches of transfer requests out across concurrent download tasks
#[derive(Clone)]
pub struct TransferPool {
    client: NetClient,
    limit: usize,
}

impl TransferPool {
    /// Create a pool. `limit` bounds concurrently running transfers;
    /// 0 means as many as the batch provides.
    #[must_use]
    pub fn new(client: NetClient, limit: usize) -> Self {
        Self { client, limit }
    }

    /// Start every request. Returns immediately; an empty batch yields an
    /// empty handle list and nothing else happens.
    #[must_use]
    pub fn start(&self, requests: Vec<TransferRequest>) -> Vec<TransferHandle> {
        let semaphore = if self.limit > 0 {
            Some(Arc::new(Semaphore::new(self.limit)))
        } else {
            None
        };

        requests
            .into_iter()
            .map(|request| self.start_one(request, semaphore.clone()))
            .collect()
    }

    fn start_one(
        &self,
        request: TransferRequest,
        semaphore: Option<Arc<Semaphore>>,
    ) -> TransferHandle {
        let status = StatusCell::default();
        let cell = status.clone();
        let client = self.client.clone();
        let tag = request.tag.clone();
        let dest = request.dest.clone();

        let task = tokio::spawn(async move {
            let _permit = match semaphore {
                Some(semaphore) => Some(
                    semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| Error::internal(format!("semaphore closed: {e}")))?,
                ),
                None => None,
            };

            let progress_cell = cell.clone();
            let result = async {
                let download = Download::new(&request.url)?.with_bearer(request.bearer.clone());
                download
                    .execute(
                        &client,
                        &request.dest,
                        request.expected_hash.as_ref(),
                        move |bytes, total| progress_cell.update(bytes, total),
                    )
                    .await
            }
            .await;

            match &result {
                Ok(_) => cell.finish(None),
                Err(e) => {
                    tracing::warn!(tag = %request.tag, error = %e, "transfer failed");
                    cell.finish(Some(e.to_string()));
                }
            }
            result
        });

        TransferHandle {
            tag,
            dest,
            status,
            task,
        }
    }
}
