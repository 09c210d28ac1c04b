//! Entry creation workflow.
//!
//! The database-visible part of a create is one transaction: entry row,
//! banner URL, rating aggregate, aliases, and user counters commit or roll
//! back together. Gallery processing is dispatched after the response is
//! ready and tolerates per-image failure; tag registration and search-index
//! pings are best-effort.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::Utc;
use tracing::{error, info, warn};

use galdex_cache::ReadThroughCache;
use galdex_core::defaults::{PUBLISH_POINT_AWARD, WORK_ID_MATCH_LIMIT};
use galdex_core::{
    ContentRating, CreateEntryOutcome, CreateEntryRequest, Error, ObjectStorage, Result,
    SearchIndex,
};
use galdex_db::{Database, NewEntry, PgGalleryRepository};
use galdex_media::derive::{banner_key, banner_mini_key, derive_banner};
use galdex_media::watermark::WatermarkTile;
use galdex_providers::cdn::CdnPurgeClient;
use galdex_providers::dlsite::{normalize_code, DlsiteClient};

use crate::config::PipelineConfig;
use crate::gallery::{FailureMode, GalleryProcessor};
use crate::slug;

/// Cache key for entry listings, invalidated after every mutation.
pub(crate) const LIST_CACHE_KEY: &str = "entries:list";

/// Entry publication workflows: create, update, and their side channels.
pub struct EntryPipeline {
    pub(crate) db: Arc<Database>,
    pub(crate) storage: Arc<dyn ObjectStorage>,
    pub(crate) gallery: GalleryProcessor,
    pub(crate) watermark: Option<Arc<WatermarkTile>>,
    pub(crate) indexnow: Option<Arc<dyn SearchIndex>>,
    pub(crate) dlsite: Option<DlsiteClient>,
    pub(crate) cdn: Option<CdnPurgeClient>,
    pub(crate) cache: ReadThroughCache,
    pub(crate) config: PipelineConfig,
}

impl EntryPipeline {
    pub fn new(
        db: Arc<Database>,
        storage: Arc<dyn ObjectStorage>,
        cache: ReadThroughCache,
        config: PipelineConfig,
    ) -> Self {
        let gallery_store = Arc::new(PgGalleryRepository::new(db.pool.clone()));
        let gallery = GalleryProcessor::new(
            gallery_store,
            Arc::clone(&storage),
            config.asset_base_url.clone(),
        );
        Self {
            db,
            storage,
            gallery,
            watermark: None,
            indexnow: None,
            dlsite: None,
            cdn: None,
            cache,
            config,
        }
    }

    /// Enable gallery watermarking with a pre-rendered tile.
    pub fn with_watermark(mut self, tile: WatermarkTile) -> Self {
        self.watermark = Some(Arc::new(tile));
        self
    }

    /// Enable search-index submissions for SFW entries.
    pub fn with_search_index(mut self, index: Arc<dyn SearchIndex>) -> Self {
        self.indexnow = Some(index);
        self
    }

    /// Enable publisher lookup from DLsite circle metadata on create.
    pub fn with_dlsite(mut self, client: DlsiteClient) -> Self {
        self.dlsite = Some(client);
        self
    }

    /// Enable CDN purging on banner replacement.
    pub fn with_cdn(mut self, client: CdnPurgeClient) -> Self {
        self.cdn = Some(client);
        self
    }

    /// Create a catalog entry for `user_id`.
    ///
    /// Hard identifier collisions (VNDB release id, DLsite code) reject the
    /// request outright. A shared VNDB work id rejects unless the caller set
    /// `is_duplicate`, confirming the entry is a distinct edition.
    pub async fn create_entry(
        &self,
        user_id: i64,
        req: CreateEntryRequest,
    ) -> Result<CreateEntryOutcome> {
        let start = Instant::now();

        let title = req.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::Validation("title is required".to_string()));
        }
        if req.banner.is_empty() {
            return Err(Error::Validation("banner image is required".to_string()));
        }
        let vndb_work_id = normalized_vndb_id(&req.vndb_work_id);
        let vndb_release_id = normalized_vndb_id(&req.vndb_release_id);
        let dlsite_code = match normalized(&req.dlsite_code) {
            Some(code) => Some(normalize_code(&code)?),
            None => None,
        };

        self.check_creation_conflicts(
            vndb_release_id.as_deref(),
            dlsite_code.as_deref(),
            vndb_work_id.as_deref(),
            req.is_duplicate,
        )
        .await?;

        // Encode both banner variants before any row exists.
        let banner_bytes = req.banner.clone();
        let banner = tokio::task::spawn_blocking(move || derive_banner(&banner_bytes))
            .await
            .map_err(|e| Error::Internal(format!("banner encode task failed: {e}")))??;

        let slug = slug::new_slug();
        let entry = NewEntry {
            slug: slug.clone(),
            title,
            vndb_work_id,
            vndb_release_id,
            dlsite_code,
            introduction: req.introduction,
            content_rating: req.content_rating,
            released: req.released,
            user_id,
        };

        let mut tx = self.db.begin_publish_tx().await?;
        let entry_id = self.db.entries.insert_tx(&mut tx, &entry).await?;

        let full_key = banner_key(entry_id);
        let mini_key = banner_mini_key(entry_id);
        self.storage.put(&full_key, Bytes::from(banner.full)).await?;
        self.storage.put(&mini_key, Bytes::from(banner.thumb)).await?;

        let banner_url = self.cache_busted_url(&full_key);
        self.db
            .entries
            .set_banner_tx(&mut tx, entry_id, &banner_url)
            .await?;
        self.db.entries.create_rating_stat_tx(&mut tx, entry_id).await?;
        self.db
            .entries
            .insert_aliases_tx(&mut tx, entry_id, &req.aliases)
            .await?;
        self.db
            .users
            .award_publish_tx(&mut tx, user_id, PUBLISH_POINT_AWARD)
            .await?;
        tx.commit().await.map_err(Error::Database)?;

        if !req.tags.is_empty() {
            if let Err(e) = self.db.tags.register_batch(entry_id, &req.tags).await {
                warn!(
                    subsystem = "pipeline",
                    component = "create",
                    entry_id,
                    error_msg = %e,
                    "tag registration failed"
                );
            }
        }
        self.attach_publisher_from_dlsite(entry_id, user_id, entry.dlsite_code.as_deref())
            .await;
        self.notify_search_index(req.content_rating, &slug).await;
        self.cache.invalidate(LIST_CACHE_KEY).await;

        // Gallery processing is detached: the caller gets its response while
        // images encode in the background, each one succeeding or being
        // compensated independently.
        if !req.gallery.is_empty() {
            let processor = self.gallery.clone();
            let tile = self.watermark.clone();
            let uploads = req.gallery;
            tokio::spawn(async move {
                match processor
                    .process(entry_id, uploads, tile, FailureMode::Partial)
                    .await
                {
                    Ok(outcome) => info!(
                        subsystem = "pipeline",
                        component = "create",
                        entry_id,
                        image_count = outcome.stored,
                        failed = outcome.failed,
                        "detached gallery processing finished"
                    ),
                    Err(e) => error!(
                        subsystem = "pipeline",
                        component = "create",
                        entry_id,
                        error_msg = %e,
                        "detached gallery processing failed"
                    ),
                }
            });
        }

        info!(
            subsystem = "pipeline",
            component = "create",
            entry_id,
            slug = %slug,
            user_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "entry created"
        );
        Ok(CreateEntryOutcome { entry_id, slug })
    }

    /// Resolve the publishing circle behind a DLsite code and link it to the
    /// entry. Best-effort: the entry is already committed, so every failure
    /// here is logged and swallowed.
    async fn attach_publisher_from_dlsite(
        &self,
        entry_id: i64,
        user_id: i64,
        dlsite_code: Option<&str>,
    ) {
        let (Some(code), Some(dlsite)) = (dlsite_code, &self.dlsite) else {
            return;
        };
        let meta = match dlsite.fetch(code).await {
            Ok(meta) => meta,
            Err(e) => {
                warn!(
                    subsystem = "pipeline",
                    component = "create",
                    entry_id,
                    dlsite_code = code,
                    error_msg = %e,
                    "publisher metadata fetch failed"
                );
                return;
            }
        };
        let Some(name) = meta.circle_name.filter(|n| !n.is_empty()) else {
            return;
        };
        let website: Vec<String> = meta.circle_link.into_iter().collect();
        match self.attach_publisher(entry_id, user_id, &name, &website).await {
            Ok(linked) => info!(
                subsystem = "pipeline",
                component = "create",
                entry_id,
                publisher = %name,
                linked,
                "publisher attached"
            ),
            Err(e) => warn!(
                subsystem = "pipeline",
                component = "create",
                entry_id,
                publisher = %name,
                error_msg = %e,
                "publisher linkage failed"
            ),
        }
    }

    /// Link an entry to its publishing company, creating the company row on
    /// first sight. Returns whether a new link was made.
    pub async fn attach_publisher(
        &self,
        entry_id: i64,
        user_id: i64,
        name: &str,
        website: &[String],
    ) -> Result<bool> {
        let company = match self.db.companies.find_by_name(name).await? {
            Some(company) => company,
            None => self.db.companies.create(name, website, user_id).await?,
        };
        self.db.companies.link_entry(entry_id, company.id).await
    }

    async fn check_creation_conflicts(
        &self,
        vndb_release_id: Option<&str>,
        dlsite_code: Option<&str>,
        vndb_work_id: Option<&str>,
        is_duplicate: bool,
    ) -> Result<()> {
        use galdex_core::EntryLookup;

        if let Some(release_id) = vndb_release_id {
            if let Some(existing) = self.db.entries.find_by_release_id(release_id).await? {
                return Err(Error::Duplicate {
                    field: "vndbReleaseId".to_string(),
                    slug: existing.slug,
                });
            }
        }
        if let Some(code) = dlsite_code {
            if let Some(existing) = self.db.entries.find_by_dlsite_code(code).await? {
                return Err(Error::Duplicate {
                    field: "dlsiteCode".to_string(),
                    slug: existing.slug,
                });
            }
        }
        if let Some(work_id) = vndb_work_id {
            if !is_duplicate {
                let holders = self
                    .db
                    .entries
                    .find_all_by_work_id(work_id, WORK_ID_MATCH_LIMIT)
                    .await?;
                if let Some(first) = holders.first() {
                    return Err(Error::Duplicate {
                        field: "vndbWorkId".to_string(),
                        slug: first.slug.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Public banner URL with a timestamp query so replaced banners bypass
    /// stale browser caches.
    pub(crate) fn cache_busted_url(&self, key: &str) -> String {
        format!("{}?t={}", self.config.asset_url(key), Utc::now().timestamp_millis())
    }

    pub(crate) async fn notify_search_index(&self, rating: ContentRating, slug: &str) {
        let url = self.config.entry_url(slug);
        submit_to_search_index(self.indexnow.as_deref(), rating, slug, &url).await;
    }
}

/// Submit the entry URL to the search index for SFW entries only; adult
/// entries stay out of search engines. Failures are logged, never surfaced.
pub(crate) async fn submit_to_search_index(
    index: Option<&dyn SearchIndex>,
    rating: ContentRating,
    slug: &str,
    url: &str,
) {
    if rating != ContentRating::Sfw {
        return;
    }
    let Some(index) = index else {
        return;
    };
    if let Err(e) = index.submit(url).await {
        warn!(
            subsystem = "pipeline",
            component = "indexnow",
            slug,
            error_msg = %e,
            "search index submission failed"
        );
    }
}

pub(crate) fn normalized(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// VNDB ids persist and compare in lowercase (`v123`, `r456`); exact-match
/// lookups depend on it.
pub(crate) fn normalized_vndb_id(value: &Option<String>) -> Option<String> {
    normalized(value).map(|s| s.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn test_normalized_drops_blank_fields() {
        assert_eq!(normalized(&Some("  v123 ".to_string())), Some("v123".to_string()));
        assert_eq!(normalized(&Some("   ".to_string())), None);
        assert_eq!(normalized(&None), None);
    }

    #[test]
    fn test_vndb_ids_are_persisted_lowercase() {
        assert_eq!(
            normalized_vndb_id(&Some(" V123 ".to_string())),
            Some("v123".to_string())
        );
        assert_eq!(
            normalized_vndb_id(&Some("r456".to_string())),
            Some("r456".to_string())
        );
        assert_eq!(normalized_vndb_id(&Some("  ".to_string())), None);
    }

    #[derive(Default)]
    struct RecordingIndex {
        submitted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchIndex for RecordingIndex {
        async fn submit(&self, url: &str) -> Result<u16> {
            self.submitted.lock().unwrap().push(url.to_string());
            Ok(200)
        }
    }

    #[tokio::test]
    async fn test_sfw_entries_are_submitted_to_the_search_index() {
        let index = RecordingIndex::default();
        submit_to_search_index(
            Some(&index as &dyn SearchIndex),
            ContentRating::Sfw,
            "abcd1234",
            "https://site.test/entry/abcd1234",
        )
        .await;
        assert_eq!(
            *index.submitted.lock().unwrap(),
            vec!["https://site.test/entry/abcd1234".to_string()]
        );
    }

    #[tokio::test]
    async fn test_nsfw_entries_are_never_submitted() {
        let index = RecordingIndex::default();
        submit_to_search_index(
            Some(&index as &dyn SearchIndex),
            ContentRating::Nsfw,
            "abcd1234",
            "https://site.test/entry/abcd1234",
        )
        .await;
        assert!(index.submitted.lock().unwrap().is_empty());
    }
}
