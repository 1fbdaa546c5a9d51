use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{FerrotypeError, Result};
use crate::config::Config;
use crate::fetcher::{self, FeedSource, HttpFeedSource, HttpImageSource, ImageSource};
use crate::store::SqliteStore;
use crate::sync::{Mirror, SyncJob};

pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub job: Arc<SyncJob<SqliteStore>>,
    pub storage_dir: PathBuf,
}

impl AppContext {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let storage_dir = match config.storage_dir.clone() {
            Some(dir) => dir,
            None => Self::default_data_dir()?.join("pictures"),
        };
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = match config.db_path.clone() {
            Some(path) => path,
            None => Self::default_data_dir()?.join("ferrotype.db"),
        };
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Arc::new(SqliteStore::new(&db_path)?);

        let client = fetcher::http::build_client();
        let feed: Arc<dyn FeedSource + Send + Sync> =
            Arc::new(HttpFeedSource::new(client.clone(), config.feed_url.clone()));
        let images: Arc<dyn ImageSource + Send + Sync> = Arc::new(HttpImageSource::new(
            client,
            config.image_base_url.clone(),
            config.access_token.clone(),
        ));

        let mirror = Mirror::with_workers(
            store.clone(),
            images,
            storage_dir.clone(),
            config.workers,
        );
        let job = Arc::new(SyncJob::new(store.clone(), feed, mirror, config.max_pages));

        Ok(Self {
            store,
            job,
            storage_dir,
        })
    }

    fn default_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| FerrotypeError::Config("Could not find data directory".into()))?;
        Ok(data_dir.join("ferrotype"))
    }
}
