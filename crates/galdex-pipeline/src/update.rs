//! Entry update workflow.
//!
//! Unlike create, gallery work here runs synchronously inside the request:
//! the caller is editing existing state and needs to know the final shape,
//! so any new-image failure fails the whole update instead of degrading to
//! partial success.

use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use tracing::{info, warn};

use galdex_core::{Error, GalleryPlan, Result, UpdateEntryRequest};
use galdex_db::EntryScalarUpdate;
use galdex_media::derive::{banner_key, banner_mini_key, derive_banner, gallery_key};
use galdex_providers::dlsite::normalize_code;

use crate::create::{normalized, normalized_vndb_id, EntryPipeline, LIST_CACHE_KEY};
use crate::gallery::FailureMode;

impl EntryPipeline {
    /// Update a catalog entry in place on behalf of `user_id`.
    ///
    /// Only the entry's owner may edit it. Scalar fields and aliases are
    /// replaced; a supplied banner is re-derived and the CDN purged; a
    /// supplied gallery plan is reconciled against the existing rows
    /// (delete, patch NSFW, add).
    pub async fn update_entry(&self, user_id: i64, req: UpdateEntryRequest) -> Result<()> {
        let start = Instant::now();

        let entry = self
            .db
            .entries
            .fetch(req.id)
            .await?
            .ok_or(Error::EntryNotFound(req.id))?;
        if entry.user_id != user_id {
            return Err(Error::Unauthorized(
                "only the entry's owner may edit it".to_string(),
            ));
        }

        let title = req.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::Validation("title is required".to_string()));
        }
        let vndb_work_id = normalized_vndb_id(&req.vndb_work_id);
        let vndb_release_id = normalized_vndb_id(&req.vndb_release_id);
        let dlsite_code = match normalized(&req.dlsite_code) {
            Some(code) => Some(normalize_code(&code)?),
            None => None,
        };

        self.check_update_conflicts(
            req.id,
            vndb_release_id.as_deref(),
            dlsite_code.as_deref(),
            vndb_work_id.as_deref(),
            req.is_duplicate,
        )
        .await?;

        self.db
            .entries
            .update_scalars(&EntryScalarUpdate {
                id: req.id,
                title,
                vndb_work_id,
                vndb_release_id,
                dlsite_code,
                introduction: req.introduction,
                content_rating: req.content_rating,
                released: req.released,
            })
            .await?;
        self.db.entries.replace_aliases(req.id, &req.aliases).await?;

        if !req.tags.is_empty() {
            if let Err(e) = self.db.tags.register_batch(req.id, &req.tags).await {
                warn!(
                    subsystem = "pipeline",
                    component = "update",
                    entry_id = req.id,
                    error_msg = %e,
                    "tag registration failed"
                );
            }
        }

        if let Some(banner) = req.banner {
            self.replace_banner(req.id, banner).await?;
        }

        if let Some(plan) = req.gallery {
            self.reconcile_gallery(req.id, plan).await?;
        }

        self.notify_search_index(req.content_rating, &entry.slug).await;
        self.cache.invalidate(LIST_CACHE_KEY).await;
        self.cache.invalidate(&format!("entry:{}", entry.slug)).await;

        info!(
            subsystem = "pipeline",
            component = "update",
            entry_id = req.id,
            slug = %entry.slug,
            duration_ms = start.elapsed().as_millis() as u64,
            "entry updated"
        );
        Ok(())
    }

    /// Re-derive and store both banner variants, purge the CDN copies, and
    /// point the row at a cache-busted URL.
    async fn replace_banner(&self, entry_id: i64, bytes: Bytes) -> Result<()> {
        let banner = tokio::task::spawn_blocking(move || derive_banner(&bytes))
            .await
            .map_err(|e| Error::Internal(format!("banner encode task failed: {e}")))??;

        let full_key = banner_key(entry_id);
        let mini_key = banner_mini_key(entry_id);
        self.storage.put(&full_key, Bytes::from(banner.full)).await?;
        self.storage.put(&mini_key, Bytes::from(banner.thumb)).await?;

        if let Some(cdn) = &self.cdn {
            let urls = vec![
                self.config.asset_url(&full_key),
                self.config.asset_url(&mini_key),
            ];
            if let Err(e) = cdn.purge(&urls).await {
                warn!(
                    subsystem = "pipeline",
                    component = "update",
                    entry_id,
                    url_count = urls.len(),
                    error_msg = %e,
                    "CDN purge failed"
                );
            }
        }

        let banner_url = self.cache_busted_url(&full_key);
        self.db.entries.set_banner(entry_id, &banner_url).await
    }

    /// Reconcile the stored gallery against the plan: rows absent from
    /// `keep` are deleted along with their objects, kept rows get their NSFW
    /// flag patched, and new uploads are processed synchronously with the
    /// plan-level watermark setting.
    async fn reconcile_gallery(&self, entry_id: i64, plan: GalleryPlan) -> Result<()> {
        let existing = self.db.gallery.list_for_entry(entry_id).await?;
        let keep: HashMap<i64, bool> = plan.keep.iter().map(|k| (k.id, k.is_nsfw)).collect();

        let doomed: Vec<i64> = existing
            .iter()
            .filter(|img| !keep.contains_key(&img.id))
            .map(|img| img.id)
            .collect();
        if !doomed.is_empty() {
            self.db.gallery.delete_many(&doomed).await?;
            for image_id in &doomed {
                let key = gallery_key(entry_id, *image_id);
                if let Err(e) = self.storage.delete(&key).await {
                    warn!(
                        subsystem = "pipeline",
                        component = "update",
                        entry_id,
                        image_id,
                        error_msg = %e,
                        "failed to delete stored gallery object"
                    );
                }
            }
        }

        for img in &existing {
            if let Some(&is_nsfw) = keep.get(&img.id) {
                if is_nsfw != img.is_nsfw {
                    self.db.gallery.set_nsfw(img.id, is_nsfw).await?;
                }
            }
        }

        if !plan.new.is_empty() {
            let mut uploads = plan.new;
            for upload in &mut uploads {
                upload.watermark = plan.watermark;
            }
            let tile = self.watermark.clone();
            self.gallery
                .process(entry_id, uploads, tile, FailureMode::Strict)
                .await?;
        }
        Ok(())
    }

    async fn check_update_conflicts(
        &self,
        entry_id: i64,
        vndb_release_id: Option<&str>,
        dlsite_code: Option<&str>,
        vndb_work_id: Option<&str>,
        is_duplicate: bool,
    ) -> Result<()> {
        use galdex_core::EntryLookup;

        if let Some(release_id) = vndb_release_id {
            if let Some(existing) = self.db.entries.find_by_release_id(release_id).await? {
                if existing.id != entry_id {
                    return Err(Error::Duplicate {
                        field: "vndbReleaseId".to_string(),
                        slug: existing.slug,
                    });
                }
            }
        }
        if let Some(code) = dlsite_code {
            if let Some(existing) = self.db.entries.find_by_dlsite_code(code).await? {
                if existing.id != entry_id {
                    return Err(Error::Duplicate {
                        field: "dlsiteCode".to_string(),
                        slug: existing.slug,
                    });
                }
            }
        }
        if let Some(work_id) = vndb_work_id {
            if !is_duplicate {
                if let Some(other) = self
                    .db
                    .entries
                    .find_other_by_work_id(work_id, entry_id)
                    .await?
                {
                    return Err(Error::Duplicate {
                        field: "vndbWorkId".to_string(),
                        slug: other.slug,
                    });
                }
            }
        }
        Ok(())
    }
}
