use chrono::{DateTime, Utc};
use url::Url;

use crate::app::{FerrotypeError, Result};
use crate::feed::FeedEntry;

/// A picture entry confirmed for mirroring.
///
/// The external id is extracted from the feed guid and acts as the dedup
/// key; the store enforces uniqueness on it. The publication timestamp is
/// only used for the high-water-mark cutoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub external_id: u64,
    pub published_at: DateTime<Utc>,
    pub link: String,
}

impl Picture {
    pub fn from_entry(entry: &FeedEntry) -> Result<Self> {
        Ok(Self {
            external_id: parse_external_id(&entry.guid)?,
            published_at: entry.published_at,
            link: entry.link.clone().unwrap_or_default(),
        })
    }

    /// Deterministic file name of the mirrored image.
    pub fn file_name(&self) -> String {
        format!("{}.jpg", self.external_id)
    }
}

/// Extract the numeric external id from a guid shaped like
/// `https://host/path/<id>.jpg`.
///
/// Anything else is a feed integrity problem for that entry.
pub fn parse_external_id(guid: &str) -> Result<u64> {
    let invalid = || FerrotypeError::InvalidGuid(guid.to_string());

    let url = Url::parse(guid).map_err(|_| invalid())?;
    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .ok_or_else(invalid)?;

    last_segment
        .strip_suffix(".jpg")
        .ok_or_else(invalid)?
        .parse::<u64>()
        .map_err(|_| invalid())
}
