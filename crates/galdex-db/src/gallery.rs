//! Gallery image repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use galdex_core::{Error, GalleryImage, GalleryStore, Result};

/// PostgreSQL implementation of the gallery image repository.
///
/// The upload pipeline drives rows through the placeholder lifecycle via the
/// [`GalleryStore`] trait; the reconciliation reads used by the update path
/// live directly on the struct.
pub struct PgGalleryRepository {
    pool: Pool<Postgres>,
}

fn map_image(row: sqlx::postgres::PgRow) -> GalleryImage {
    GalleryImage {
        id: row.get("id"),
        entry_id: row.get("entry_id"),
        url: row.get("url"),
        is_nsfw: row.get("is_nsfw"),
        created: row.get("created"),
    }
}

impl PgGalleryRepository {
    /// Create a new PgGalleryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// All gallery rows for an entry, placeholder rows included.
    pub async fn list_for_entry(&self, entry_id: i64) -> Result<Vec<GalleryImage>> {
        let rows = sqlx::query(
            "SELECT id, entry_id, url, is_nsfw, created FROM gallery_image \
             WHERE entry_id = $1 ORDER BY id",
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.into_iter().map(map_image).collect())
    }

    /// Completed gallery rows only. Placeholder rows (empty URL) must never
    /// be exposed to end users as final.
    pub async fn list_public(&self, entry_id: i64) -> Result<Vec<GalleryImage>> {
        let rows = sqlx::query(
            "SELECT id, entry_id, url, is_nsfw, created FROM gallery_image \
             WHERE entry_id = $1 AND url <> '' ORDER BY id",
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.into_iter().map(map_image).collect())
    }

    /// Patch the NSFW flag on a kept image.
    pub async fn set_nsfw(&self, image_id: i64, is_nsfw: bool) -> Result<()> {
        sqlx::query("UPDATE gallery_image SET is_nsfw = $2 WHERE id = $1")
            .bind(image_id)
            .bind(is_nsfw)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Delete a set of images outright (update-path reconciliation).
    pub async fn delete_many(&self, image_ids: &[i64]) -> Result<()> {
        if image_ids.is_empty() {
            return Ok(());
        }
        sqlx::query("DELETE FROM gallery_image WHERE id = ANY($1)")
            .bind(image_ids)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

#[async_trait]
impl GalleryStore for PgGalleryRepository {
    async fn insert_placeholder(&self, entry_id: i64, is_nsfw: bool) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO gallery_image (entry_id, url, is_nsfw) VALUES ($1, '', $2) RETURNING id",
        )
        .bind(entry_id)
        .bind(is_nsfw)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.get("id"))
    }

    async fn set_url(&self, image_id: i64, url: &str) -> Result<()> {
        sqlx::query("UPDATE gallery_image SET url = $2 WHERE id = $1")
            .bind(image_id)
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn delete(&self, image_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM gallery_image WHERE id = $1")
            .bind(image_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
