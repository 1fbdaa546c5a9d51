pub mod sqlite;

use chrono::{DateTime, TimeZone, Utc};

use crate::app::Result;
use crate::domain::Picture;

pub use sqlite::SqliteStore;

/// Outcome of a picture insert. The unique constraint on the external id
/// is the source of truth for "already mirrored"; hitting it is not an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Cutoff used when the store holds no pictures yet, predating the first
/// entry the upstream feed ever published.
pub fn sentinel_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2005, 8, 7, 18, 30, 42).unwrap()
}

pub trait Store {
    /// Publication timestamp of the most recently synchronized picture,
    /// or [`sentinel_cutoff`] when the store is empty.
    fn max_pub_date(&self) -> Result<DateTime<Utc>>;

    fn exists_by_external_id(&self, external_id: u64) -> Result<bool>;

    fn insert(&self, picture: &Picture) -> Result<InsertOutcome>;

    fn all_pictures(&self) -> Result<Vec<Picture>>;

    fn count(&self) -> Result<i64>;
}
