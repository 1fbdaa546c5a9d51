use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode};
use rusqlite_migration::{Migrations, M};

use crate::app::{FerrotypeError, Result};
use crate::domain::Picture;
use crate::store::{sentinel_cutoff, InsertOutcome, Store};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| FerrotypeError::Other(format!("Migration failed: {e}")))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FerrotypeError::Other(format!("Store lock poisoned: {e}")))
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn row_to_picture(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    }
}

impl Store for SqliteStore {
    fn max_pub_date(&self) -> Result<DateTime<Utc>> {
        let conn = self.lock()?;

        let max: Option<String> =
            conn.query_row("SELECT max(pub_date) FROM pictures", [], |row| row.get(0))?;

        Ok(max
            .as_deref()
            .and_then(Self::parse_datetime)
            .unwrap_or_else(sentinel_cutoff))
    }

    fn exists_by_external_id(&self, external_id: u64) -> Result<bool> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pictures WHERE external_id = ?1",
            params![external_id as i64],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn insert(&self, picture: &Picture) -> Result<InsertOutcome> {
        let conn = self.lock()?;

        let result = conn.execute(
            "INSERT INTO pictures (external_id, pub_date, link) VALUES (?1, ?2, ?3)",
            params![
                picture.external_id as i64,
                picture.published_at.to_rfc3339(),
                picture.link
            ],
        );

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn all_pictures(&self) -> Result<Vec<Picture>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT external_id, pub_date, link FROM pictures ORDER BY pub_date DESC",
        )?;

        let pictures = stmt
            .query_map([], Self::row_to_picture)?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(external_id, pub_date, link)| Picture {
                external_id: external_id as u64,
                published_at: Self::parse_datetime(&pub_date).unwrap_or_else(sentinel_cutoff),
                link,
            })
            .collect();

        Ok(pictures)
    }

    fn count(&self) -> Result<i64> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pictures", [], |row| row.get(0))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn picture(external_id: u64, published_at: DateTime<Utc>) -> Picture {
        Picture {
            external_id,
            published_at,
            link: format!("https://example.com/p/{external_id}"),
        }
    }

    #[test]
    fn test_max_pub_date_sentinel_on_empty_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.max_pub_date().unwrap(), sentinel_cutoff());
    }

    #[test]
    fn test_max_pub_date_tracks_latest_insert() {
        let store = SqliteStore::in_memory().unwrap();

        let older = Utc.with_ymd_and_hms(2013, 9, 6, 12, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2013, 9, 7, 18, 43, 48).unwrap();

        store.insert(&picture(1, newer)).unwrap();
        store.insert(&picture(2, older)).unwrap();

        assert_eq!(store.max_pub_date().unwrap(), newer);
    }

    #[test]
    fn test_insert_and_exists() {
        let store = SqliteStore::in_memory().unwrap();

        assert!(!store.exists_by_external_id(42).unwrap());

        let outcome = store.insert(&picture(42, Utc::now())).unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);
        assert!(store.exists_by_external_id(42).unwrap());
    }

    #[test]
    fn test_duplicate_insert_reports_already_exists() {
        let store = SqliteStore::in_memory().unwrap();
        let p = picture(42, Utc::now());

        assert_eq!(store.insert(&p).unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert(&p).unwrap(), InsertOutcome::AlreadyExists);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_all_pictures_newest_first() {
        let store = SqliteStore::in_memory().unwrap();

        let older = Utc.with_ymd_and_hms(2013, 9, 6, 12, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2013, 9, 7, 18, 43, 48).unwrap();

        store.insert(&picture(1, older)).unwrap();
        store.insert(&picture(2, newer)).unwrap();

        let all = store.all_pictures().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].external_id, 2);
        assert_eq!(all[0].published_at, newer);
        assert_eq!(all[1].external_id, 1);
    }

    #[test]
    fn test_count() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.count().unwrap(), 0);

        store.insert(&picture(1, Utc::now())).unwrap();
        store.insert(&picture(2, Utc::now())).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("pictures.db");

        {
            let store = SqliteStore::new(&db_path).unwrap();
            store.insert(&picture(7, Utc::now())).unwrap();
        }

        let store = SqliteStore::new(&db_path).unwrap();
        assert!(store.exists_by_external_id(7).unwrap());
    }
}
