use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::app::Result;
use crate::domain::Picture;
use crate::fetcher::FeedSource;
use crate::store::Store;
use crate::sync::mirror::Mirror;
use crate::sync::walker;

#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run went through; holds the newly mirrored pictures.
    Completed(Vec<Picture>),
    /// Another run was already in progress; nothing was done.
    Skipped,
}

/// One full synchronization pass: establish the cutoff, walk the feed,
/// mirror what is new.
///
/// Runs never overlap: a trigger while a run is in progress is skipped.
/// A store failure while establishing the cutoff aborts the run — without
/// a trustworthy high-water mark nothing can safely be fetched. Every
/// later failure is per-page or per-item and only logged.
pub struct SyncJob<S> {
    store: Arc<S>,
    feed: Arc<dyn FeedSource + Send + Sync>,
    mirror: Mirror<S>,
    max_pages: usize,
    run_guard: Mutex<()>,
    cancelled: Arc<AtomicBool>,
}

impl<S: Store + Send + Sync + 'static> SyncJob<S> {
    pub fn new(
        store: Arc<S>,
        feed: Arc<dyn FeedSource + Send + Sync>,
        mirror: Mirror<S>,
        max_pages: usize,
    ) -> Self {
        Self {
            store,
            feed,
            mirror,
            max_pages,
            run_guard: Mutex::new(()),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let Ok(_guard) = self.run_guard.try_lock() else {
            tracing::info!("Sync already in progress, skipping this trigger");
            return Ok(RunOutcome::Skipped);
        };

        let cutoff = self.store.max_pub_date()?;
        tracing::debug!("Syncing pictures published after {cutoff}");

        let candidates =
            walker::walk(self.feed.as_ref(), cutoff, self.max_pages, &self.cancelled).await;
        tracing::info!("Found {} candidate pictures", candidates.len());

        let mirrored = self.mirror.mirror(candidates, self.cancelled.clone()).await;
        tracing::info!("Mirrored {} new pictures", mirrored.len());

        Ok(RunOutcome::Completed(mirrored))
    }

    /// Ask an in-flight run to wind down: no new page fetches or
    /// downloads are started, in-flight writes finish or clean up.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
