//! Bulk import trigger followed by a feed reload.

use super::error::{describe, FeedError};
use super::pagination::{LoadOutcome, PaginationController};
use crate::catalog::CatalogService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// What a completed import produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Message returned by the catalog service
    pub message: String,
    /// Outcome of reloading the feed afterwards
    pub reload: Result<LoadOutcome, FeedError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Another import was still running, nothing was sent
    AlreadyRunning,
    Completed(ImportReport),
}

struct Running<'a>(&'a AtomicBool);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Triggers the service-side import, one at a time, and reloads the feed
/// once the service accepts it. The import response does not mean the new
/// data is visible yet, so the reload is always explicit.
pub struct ImportTrigger<C: CatalogService + ?Sized> {
    feed: Arc<PaginationController<C>>,
    running: Arc<AtomicBool>,
}

impl<C: CatalogService + ?Sized> Clone for ImportTrigger<C> {
    fn clone(&self) -> Self {
        Self { feed: Arc::clone(&self.feed), running: Arc::clone(&self.running) }
    }
}

impl<C: CatalogService + ?Sized> ImportTrigger<C> {
    pub fn new(feed: Arc<PaginationController<C>>) -> Self {
        Self { feed, running: Arc::new(AtomicBool::new(false)) }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs the import. On failure the feed is left untouched.
    pub async fn run(&self) -> Result<ImportOutcome, FeedError> {
        if self.running.swap(true, Ordering::SeqCst) {
            info!("Import already running");
            return Ok(ImportOutcome::AlreadyRunning);
        }
        let _running = Running(&self.running);

        let receipt = match self.feed.client().import_products().await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!("Import failed: {:#}", e);
                return Err(FeedError::Import(describe(&e)));
            }
        };
        info!("Import accepted: {}", receipt.message);

        let reload = self.feed.reload().await;
        Ok(ImportOutcome::Completed(ImportReport { message: receipt.message, reload }))
    }
}
