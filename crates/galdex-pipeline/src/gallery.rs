//! Gallery upload processing.
//!
//! Each image runs through an insert-placeholder / encode / store / finalize
//! sequence. The placeholder row exists before the binary does; on any later
//! failure that one row is compensating-deleted so no empty-URL row outlives
//! its upload. At most [`GALLERY_CONCURRENCY`] images are in flight at once.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use galdex_core::defaults::GALLERY_CONCURRENCY;
use galdex_core::{Error, GalleryStore, GalleryUpload, ObjectStorage, Result};
use galdex_media::derive::{derive_gallery_image, gallery_key};
use galdex_media::watermark::WatermarkTile;

/// What a single image failure does to the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Remaining images still process; the batch reports partial success.
    /// Used by the detached create path.
    Partial,
    /// The first failure fails the whole batch. Used by the synchronous
    /// update path.
    Strict,
}

/// Per-batch result under [`FailureMode::Partial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GalleryOutcome {
    pub stored: usize,
    pub failed: usize,
}

/// Runs gallery uploads against a row store and an object store.
#[derive(Clone)]
pub struct GalleryProcessor {
    store: Arc<dyn GalleryStore>,
    storage: Arc<dyn ObjectStorage>,
    asset_base_url: String,
}

impl GalleryProcessor {
    pub fn new(
        store: Arc<dyn GalleryStore>,
        storage: Arc<dyn ObjectStorage>,
        asset_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            storage,
            asset_base_url: asset_base_url.into(),
        }
    }

    /// Process a batch of uploads for one entry.
    ///
    /// Uploads that declare `watermark` are composited with `tile` when one
    /// is available.
    pub async fn process(
        &self,
        entry_id: i64,
        uploads: Vec<GalleryUpload>,
        tile: Option<Arc<WatermarkTile>>,
        mode: FailureMode,
    ) -> Result<GalleryOutcome> {
        if uploads.is_empty() {
            return Ok(GalleryOutcome { stored: 0, failed: 0 });
        }

        let semaphore = Arc::new(Semaphore::new(GALLERY_CONCURRENCY));
        let tasks = uploads.into_iter().map(|upload| {
            let semaphore = Arc::clone(&semaphore);
            let tile = tile.clone();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| Error::Internal("gallery semaphore closed".to_string()))?;
                self.process_one(entry_id, upload, tile).await
            }
        });
        let results = futures::future::join_all(tasks).await;

        let mut outcome = GalleryOutcome { stored: 0, failed: 0 };
        let mut first_error = None;
        for result in results {
            match result {
                Ok(image_id) => {
                    outcome.stored += 1;
                    info!(
                        subsystem = "pipeline",
                        component = "gallery",
                        entry_id,
                        image_id,
                        "gallery image stored"
                    );
                }
                Err(e) => {
                    outcome.failed += 1;
                    warn!(
                        subsystem = "pipeline",
                        component = "gallery",
                        entry_id,
                        error_msg = %e,
                        "gallery image failed"
                    );
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match (mode, first_error) {
            (FailureMode::Strict, Some(e)) => Err(e),
            _ => Ok(outcome),
        }
    }

    /// Full lifecycle for one upload. On failure after the placeholder
    /// insert, the row is deleted before the error propagates.
    async fn process_one(
        &self,
        entry_id: i64,
        upload: GalleryUpload,
        tile: Option<Arc<WatermarkTile>>,
    ) -> Result<i64> {
        let image_id = self
            .store
            .insert_placeholder(entry_id, upload.is_nsfw)
            .await?;

        match self.encode_and_store(entry_id, image_id, upload, tile).await {
            Ok(()) => Ok(image_id),
            Err(e) => {
                if let Err(del_err) = self.store.delete(image_id).await {
                    error!(
                        subsystem = "pipeline",
                        component = "gallery",
                        entry_id,
                        image_id,
                        error_msg = %del_err,
                        "failed to delete orphaned gallery row"
                    );
                }
                Err(e)
            }
        }
    }

    async fn encode_and_store(
        &self,
        entry_id: i64,
        image_id: i64,
        upload: GalleryUpload,
        tile: Option<Arc<WatermarkTile>>,
    ) -> Result<()> {
        let watermark = if upload.watermark { tile } else { None };
        let bytes = upload.bytes;
        let encoded = tokio::task::spawn_blocking(move || {
            derive_gallery_image(&bytes, watermark.as_deref())
        })
        .await
        .map_err(|e| Error::Internal(format!("gallery encode task failed: {e}")))??;

        let key = gallery_key(entry_id, image_id);
        self.storage.put(&key, Bytes::from(encoded)).await?;

        let url = format!(
            "{}/{}",
            self.asset_base_url.trim_end_matches('/'),
            key
        );
        self.store.set_url(image_id, &url).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use galdex_core::GalleryImage;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    /// In-memory gallery row store recording the full row lifecycle.
    pub struct MemoryGalleryStore {
        next_id: AtomicI64,
        rows: Mutex<BTreeMap<i64, GalleryImage>>,
        pub deleted: Mutex<Vec<i64>>,
    }

    impl MemoryGalleryStore {
        pub fn new() -> Self {
            Self {
                next_id: AtomicI64::new(1),
                rows: Mutex::new(BTreeMap::new()),
                deleted: Mutex::new(Vec::new()),
            }
        }

        pub fn rows(&self) -> Vec<GalleryImage> {
            self.rows.lock().unwrap().values().cloned().collect()
        }

        pub fn deleted_ids(&self) -> Vec<i64> {
            self.deleted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GalleryStore for MemoryGalleryStore {
        async fn insert_placeholder(&self, entry_id: i64, is_nsfw: bool) -> Result<i64> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.rows.lock().unwrap().insert(
                id,
                GalleryImage {
                    id,
                    entry_id,
                    url: String::new(),
                    is_nsfw,
                    created: chrono::Utc::now(),
                },
            );
            Ok(id)
        }

        async fn set_url(&self, image_id: i64, url: &str) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .get_mut(&image_id)
                .ok_or_else(|| Error::NotFound(format!("gallery image {image_id}")))?;
            row.url = url.to_string();
            Ok(())
        }

        async fn delete(&self, image_id: i64) -> Result<()> {
            self.rows.lock().unwrap().remove(&image_id);
            self.deleted.lock().unwrap().push(image_id);
            Ok(())
        }
    }
}
