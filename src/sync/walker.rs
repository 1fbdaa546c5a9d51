use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use crate::domain::Picture;
use crate::fetcher::FeedSource;

/// Walk the feed from the newest page toward older ones, collecting every
/// entry published strictly after `cutoff`.
///
/// The walk stops as soon as a page contains an entry at or before the
/// cutoff, when a page exposes no older-page link, when a page fetch
/// fails, or after `max_pages` fetches. A fetch failure is not retried
/// within the run; whatever was collected so far is returned.
pub async fn walk(
    source: &(dyn FeedSource + Send + Sync),
    cutoff: DateTime<Utc>,
    max_pages: usize,
    cancel: &AtomicBool,
) -> Vec<Picture> {
    let mut collected = Vec::new();
    let mut next_url: Option<String> = None;
    let mut pages_fetched = 0;

    loop {
        if cancel.load(Ordering::SeqCst) {
            tracing::info!("Walk cancelled after {} pages", pages_fetched);
            break;
        }
        if pages_fetched >= max_pages {
            tracing::warn!("Reached page limit of {}, stopping walk", max_pages);
            break;
        }

        let page = match source.fetch_page(next_url.as_deref()).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("There was a problem getting the feed data: {e}");
                break;
            }
        };
        pages_fetched += 1;

        let total = page.entries.len();
        let fresh: Vec<_> = page
            .entries
            .iter()
            .filter(|entry| entry.published_at > cutoff)
            .collect();
        let reached_cutoff = fresh.len() < total;

        for entry in fresh {
            match Picture::from_entry(entry) {
                Ok(picture) => collected.push(picture),
                Err(e) => tracing::warn!("Skipping entry with malformed guid: {e}"),
            }
        }

        if reached_cutoff || page.older.is_none() {
            break;
        }
        next_url = page.older;
    }

    collected
}
