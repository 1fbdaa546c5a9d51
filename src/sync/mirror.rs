use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;

use crate::app::Result;
use crate::domain::Picture;
use crate::fetcher::ImageSource;
use crate::store::{InsertOutcome, Store};

pub const DEFAULT_WORKERS: usize = 4;

/// Copies the image behind each new picture into the local storage
/// directory and persists the picture afterwards.
///
/// Every picture is handled in isolation: a failed download or write is
/// logged and skipped, never aborting the batch. The store's unique
/// constraint on the external id keeps concurrent writers from
/// duplicating entries; a violation on insert is treated as "someone else
/// got there first".
pub struct Mirror<S> {
    store: Arc<S>,
    images: Arc<dyn ImageSource + Send + Sync>,
    storage_dir: PathBuf,
    semaphore: Arc<Semaphore>,
}

impl<S: Store + Send + Sync + 'static> Mirror<S> {
    pub fn new(
        store: Arc<S>,
        images: Arc<dyn ImageSource + Send + Sync>,
        storage_dir: PathBuf,
    ) -> Self {
        Self::with_workers(store, images, storage_dir, DEFAULT_WORKERS)
    }

    pub fn with_workers(
        store: Arc<S>,
        images: Arc<dyn ImageSource + Send + Sync>,
        storage_dir: PathBuf,
        workers: usize,
    ) -> Self {
        Self {
            store,
            images,
            storage_dir,
            semaphore: Arc::new(Semaphore::new(workers)),
        }
    }

    /// Mirror the given pictures, returning the ones actually persisted.
    pub async fn mirror(&self, pictures: Vec<Picture>, cancel: Arc<AtomicBool>) -> Vec<Picture> {
        let mut handles = Vec::new();

        for picture in pictures {
            let store = self.store.clone();
            let images = self.images.clone();
            let storage_dir = self.storage_dir.clone();
            let semaphore = self.semaphore.clone();
            let cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");

                if cancel.load(Ordering::SeqCst) {
                    return None;
                }

                match mirror_one(&*store, &*images, &storage_dir, &picture).await {
                    Ok(true) => Some(picture),
                    Ok(false) => None,
                    Err(e) => {
                        tracing::error!(
                            "Could not mirror picture {}, skipping: {e}",
                            picture.external_id
                        );
                        None
                    }
                }
            });

            handles.push(handle);
        }

        let mut mirrored = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(picture)) => mirrored.push(picture),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        mirrored
    }
}

/// Mirror a single picture. Returns `Ok(true)` when the picture was newly
/// persisted, `Ok(false)` when it was already mirrored.
async fn mirror_one(
    store: &(dyn Store + Send + Sync),
    images: &(dyn ImageSource + Send + Sync),
    storage_dir: &Path,
    picture: &Picture,
) -> Result<bool> {
    if store.exists_by_external_id(picture.external_id)? {
        tracing::debug!("Picture {} already mirrored", picture.external_id);
        return Ok(false);
    }

    let stream = images.open_image(picture.external_id).await?;
    let final_path = storage_dir.join(picture.file_name());

    write_atomic(&final_path, stream).await?;

    match store.insert(picture)? {
        InsertOutcome::Inserted => Ok(true),
        InsertOutcome::AlreadyExists => {
            // Lost a race with another writer. The file content is
            // immutable upstream, so the extra write is harmless.
            tracing::debug!(
                "Picture {} was mirrored concurrently",
                picture.external_id
            );
            Ok(false)
        }
    }
}

/// Stream the body to a temporary sibling of `final_path` and rename it
/// into place, so a failure mid-stream never corrupts an existing copy.
async fn write_atomic(final_path: &Path, mut stream: crate::fetcher::ByteStream) -> Result<()> {
    let tmp_path = final_path.with_extension("jpg.part");

    let result = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }

    tokio::fs::rename(&tmp_path, final_path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::FerrotypeError;
    use crate::fetcher::ByteStream;
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    struct FakeImageSource {
        bodies: HashMap<u64, Vec<u8>>,
        // Ids whose stream fails after yielding one chunk.
        broken_streams: Vec<u64>,
    }

    impl FakeImageSource {
        fn new(bodies: HashMap<u64, Vec<u8>>) -> Self {
            Self {
                bodies,
                broken_streams: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl ImageSource for FakeImageSource {
        async fn open_image(&self, external_id: u64) -> Result<ByteStream> {
            if self.broken_streams.contains(&external_id) {
                let chunks: Vec<Result<Vec<u8>>> = vec![
                    Ok(b"partial".to_vec()),
                    Err(FerrotypeError::Other("connection reset".into())),
                ];
                return Ok(futures::stream::iter(chunks).boxed());
            }

            let body = self
                .bodies
                .get(&external_id)
                .cloned()
                .ok_or_else(|| FerrotypeError::Other(format!("No image {external_id}")))?;

            Ok(futures::stream::iter(vec![Ok(body)]).boxed())
        }
    }

    // Store whose existence check always misses, to force the insert to
    // arbitrate duplicates.
    struct BlindStore {
        inner: SqliteStore,
    }

    impl Store for BlindStore {
        fn max_pub_date(&self) -> Result<chrono::DateTime<Utc>> {
            self.inner.max_pub_date()
        }

        fn exists_by_external_id(&self, _external_id: u64) -> Result<bool> {
            Ok(false)
        }

        fn insert(&self, picture: &Picture) -> Result<InsertOutcome> {
            self.inner.insert(picture)
        }

        fn all_pictures(&self) -> Result<Vec<Picture>> {
            self.inner.all_pictures()
        }

        fn count(&self) -> Result<i64> {
            self.inner.count()
        }
    }

    fn picture(external_id: u64) -> Picture {
        Picture {
            external_id,
            published_at: Utc.with_ymd_and_hms(2013, 9, 8, 10, 0, 0).unwrap(),
            link: format!("https://example.com/p/{external_id}"),
        }
    }

    fn not_cancelled() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[tokio::test]
    async fn test_mirror_writes_files_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let images = Arc::new(FakeImageSource::new(HashMap::from([
            (1, b"one".to_vec()),
            (2, b"two".to_vec()),
        ])));

        let mirror = Mirror::new(store.clone(), images, dir.path().to_path_buf());
        let mirrored = mirror
            .mirror(vec![picture(1), picture(2)], not_cancelled())
            .await;

        assert_eq!(mirrored.len(), 2);
        assert_eq!(std::fs::read(dir.path().join("1.jpg")).unwrap(), b"one");
        assert_eq!(std::fs::read(dir.path().join("2.jpg")).unwrap(), b"two");
        assert!(store.exists_by_external_id(1).unwrap());
        assert!(store.exists_by_external_id(2).unwrap());
    }

    #[tokio::test]
    async fn test_mirror_isolates_per_item_failures() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        // Image 3 is missing; its fetch fails.
        let images = Arc::new(FakeImageSource::new(HashMap::from([
            (1, b"one".to_vec()),
            (2, b"two".to_vec()),
            (4, b"four".to_vec()),
        ])));

        let mirror = Mirror::new(store.clone(), images, dir.path().to_path_buf());
        let mirrored = mirror
            .mirror(
                vec![picture(1), picture(2), picture(3), picture(4)],
                not_cancelled(),
            )
            .await;

        let mut ids: Vec<u64> = mirrored.iter().map(|p| p.external_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(store.count().unwrap(), 3);
        assert!(!store.exists_by_external_id(3).unwrap());
        assert!(!dir.path().join("3.jpg").exists());
    }

    #[tokio::test]
    async fn test_mirror_skips_already_stored_ids_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.insert(&picture(1)).unwrap();

        // No image bodies at all: a download attempt would fail loudly.
        let images = Arc::new(FakeImageSource::new(HashMap::new()));

        let mirror = Mirror::new(store.clone(), images, dir.path().to_path_buf());
        let mirrored = mirror.mirror(vec![picture(1)], not_cancelled()).await;

        assert!(mirrored.is_empty());
        assert_eq!(store.count().unwrap(), 1);
        assert!(!dir.path().join("1.jpg").exists());
    }

    #[tokio::test]
    async fn test_interrupted_download_leaves_no_file_and_no_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut images = FakeImageSource::new(HashMap::new());
        images.broken_streams.push(9);

        let mirror = Mirror::new(store.clone(), Arc::new(images), dir.path().to_path_buf());
        let mirrored = mirror.mirror(vec![picture(9)], not_cancelled()).await;

        assert!(mirrored.is_empty());
        assert!(!dir.path().join("9.jpg").exists());
        assert!(!dir.path().join("9.jpg.part").exists());
        assert!(!store.exists_by_external_id(9).unwrap());
    }

    #[tokio::test]
    async fn test_interrupted_download_keeps_previous_copy_intact() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        std::fs::write(dir.path().join("9.jpg"), b"good copy").unwrap();

        let mut images = FakeImageSource::new(HashMap::new());
        images.broken_streams.push(9);

        let mirror = Mirror::new(store.clone(), Arc::new(images), dir.path().to_path_buf());
        mirror.mirror(vec![picture(9)], not_cancelled()).await;

        assert_eq!(std::fs::read(dir.path().join("9.jpg")).unwrap(), b"good copy");
    }

    #[tokio::test]
    async fn test_insert_race_is_a_benign_skip() {
        let dir = tempfile::tempdir().unwrap();
        let inner = SqliteStore::in_memory().unwrap();
        inner.insert(&picture(5)).unwrap();

        // The existence check misses, the unique constraint catches it.
        let store = Arc::new(BlindStore { inner });
        let images = Arc::new(FakeImageSource::new(HashMap::from([(5, b"five".to_vec())])));

        let mirror = Mirror::new(store.clone(), images, dir.path().to_path_buf());
        let mirrored = mirror.mirror(vec![picture(5)], not_cancelled()).await;

        assert!(mirrored.is_empty());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mirror_respects_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let images = Arc::new(FakeImageSource::new(HashMap::from([(1, b"one".to_vec())])));

        let mirror = Mirror::new(store.clone(), images, dir.path().to_path_buf());
        let cancelled = Arc::new(AtomicBool::new(true));
        let mirrored = mirror.mirror(vec![picture(1)], cancelled).await;

        assert!(mirrored.is_empty());
        assert_eq!(store.count().unwrap(), 0);
    }
}
