use chrono::{DateTime, Utc};
use feed_rs::parser;

use crate::app::{FerrotypeError, Result};

/// A single entry as it appears in the feed, before guid extraction.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub guid: String,
    pub published_at: DateTime<Utc>,
    pub link: Option<String>,
}

/// One parsed page of the paginated feed.
///
/// The feed is reverse-chronological, so the `rel="next"` channel link
/// points to the older page and `rel="previous"` to the newer one.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub entries: Vec<FeedEntry>,
    pub older: Option<String>,
    pub newer: Option<String>,
}

/// Parse a raw feed document into a [`FeedPage`].
///
/// Entries without any usable publication timestamp are dropped with a
/// warning; they cannot participate in the cutoff comparison.
pub fn parse_page(body: &[u8]) -> Result<FeedPage> {
    let feed = parser::parse(body).map_err(|e| FerrotypeError::FeedParse(e.to_string()))?;

    let older = page_link(&feed.links, "next");
    let newer = page_link(&feed.links, "previous");

    let entries = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let published_at = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc));

            match published_at {
                Some(published_at) => Some(FeedEntry {
                    guid: entry.id,
                    published_at,
                    link: entry.links.first().map(|l| l.href.clone()),
                }),
                None => {
                    tracing::warn!("Dropping feed entry without publication date: {}", entry.id);
                    None
                }
            }
        })
        .collect();

    Ok(FeedPage {
        entries,
        older,
        newer,
    })
}

fn page_link(links: &[feed_rs::model::Link], rel: &str) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref().is_some_and(|r| r.eq_ignore_ascii_case(rel)))
        .map(|l| l.href.clone())
}
