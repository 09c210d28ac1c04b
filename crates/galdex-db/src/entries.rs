//! Catalog entry repository implementation.
//!
//! Methods with a `_tx` suffix accept an external transaction so the
//! publication pipeline can compose the entry insert, banner persist,
//! rating-stat row, aliases, and user counters into one all-or-nothing unit.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row, Transaction};

use galdex_core::{CatalogEntry, ContentRating, EntryLookup, EntryRef, Error, Result};

/// Fields for a new entry row. Banner starts empty and is filled in once the
/// upload inside the same transaction succeeds.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub slug: String,
    pub title: String,
    pub vndb_work_id: Option<String>,
    pub vndb_release_id: Option<String>,
    pub dlsite_code: Option<String>,
    pub introduction: String,
    pub content_rating: ContentRating,
    pub released: Option<String>,
    pub user_id: i64,
}

/// Scalar fields replaced directly on update (outside any transaction).
#[derive(Debug, Clone)]
pub struct EntryScalarUpdate {
    pub id: i64,
    pub title: String,
    pub vndb_work_id: Option<String>,
    pub vndb_release_id: Option<String>,
    pub dlsite_code: Option<String>,
    pub introduction: String,
    pub content_rating: ContentRating,
    pub released: Option<String>,
}

/// PostgreSQL implementation of the entry repository.
pub struct PgEntryRepository {
    pool: Pool<Postgres>,
}

const ENTRY_COLUMNS: &str = "id, slug, title, vndb_work_id, vndb_release_id, dlsite_code, \
     banner, introduction, content_rating, released, kinds, languages, platforms, \
     user_id, created, resource_update_time";

fn map_entry(row: sqlx::postgres::PgRow) -> CatalogEntry {
    let rating: String = row.get("content_rating");
    CatalogEntry {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        vndb_work_id: row.get("vndb_work_id"),
        vndb_release_id: row.get("vndb_release_id"),
        dlsite_code: row.get("dlsite_code"),
        banner: row.get("banner"),
        introduction: row.get("introduction"),
        content_rating: ContentRating::from_str(&rating).unwrap_or(ContentRating::Nsfw),
        released: row.get("released"),
        kinds: row.get("kinds"),
        languages: row.get("languages"),
        platforms: row.get("platforms"),
        user_id: row.get("user_id"),
        created: row.get("created"),
        resource_update_time: row.get("resource_update_time"),
    }
}

fn map_ref(row: sqlx::postgres::PgRow) -> EntryRef {
    EntryRef {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
    }
}

impl PgEntryRepository {
    /// Create a new PgEntryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a new entry row within a transaction. Returns the internal id.
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry: &NewEntry,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO entry (
                slug, title, vndb_work_id, vndb_release_id, dlsite_code,
                banner, introduction, content_rating, released, user_id
            )
            VALUES ($1, $2, $3, $4, $5, '', $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&entry.slug)
        .bind(&entry.title)
        .bind(&entry.vndb_work_id)
        .bind(&entry.vndb_release_id)
        .bind(&entry.dlsite_code)
        .bind(&entry.introduction)
        .bind(entry.content_rating.as_str())
        .bind(&entry.released)
        .bind(entry.user_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("id"))
    }

    /// Set the banner URL within a transaction (create path).
    pub async fn set_banner_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        url: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE entry SET banner = $2 WHERE id = $1")
            .bind(id)
            .bind(url)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Set the banner URL directly (update path, after re-derivation).
    pub async fn set_banner(&self, id: i64, url: &str) -> Result<()> {
        sqlx::query("UPDATE entry SET banner = $2 WHERE id = $1")
            .bind(id)
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Insert the zero-initialized rating aggregate row for a new entry.
    pub async fn create_rating_stat_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry_id: i64,
    ) -> Result<()> {
        sqlx::query("INSERT INTO rating_stat (entry_id) VALUES ($1)")
            .bind(entry_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Bulk-insert aliases, skipping rows that would violate uniqueness
    /// rather than failing the batch.
    pub async fn insert_aliases_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry_id: i64,
        aliases: &[String],
    ) -> Result<()> {
        for name in aliases {
            if name.trim().is_empty() {
                continue;
            }
            sqlx::query(
                "INSERT INTO entry_alias (entry_id, name) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(entry_id)
            .bind(name)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        }
        Ok(())
    }

    /// Replace the full alias set: delete-all-then-bulk-insert in one
    /// transaction, skip-duplicates.
    pub async fn replace_aliases(&self, entry_id: i64, aliases: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM entry_alias WHERE entry_id = $1")
            .bind(entry_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        self.insert_aliases_tx(&mut tx, entry_id, aliases).await?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    /// List alias names for an entry.
    pub async fn list_aliases(&self, entry_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM entry_alias WHERE entry_id = $1 ORDER BY id")
            .bind(entry_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(|r| r.get("name")).collect())
    }

    /// Fetch an entry by internal id.
    pub async fn fetch(&self, id: i64) -> Result<Option<CatalogEntry>> {
        let row = sqlx::query(&format!("SELECT {ENTRY_COLUMNS} FROM entry WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(map_entry))
    }

    /// Fetch an entry by external slug.
    pub async fn fetch_by_slug(&self, slug: &str) -> Result<Option<CatalogEntry>> {
        let row = sqlx::query(&format!("SELECT {ENTRY_COLUMNS} FROM entry WHERE slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(map_entry))
    }

    /// Replace scalar fields directly.
    pub async fn update_scalars(&self, update: &EntryScalarUpdate) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE entry
            SET title = $2, vndb_work_id = $3, vndb_release_id = $4,
                dlsite_code = $5, introduction = $6, content_rating = $7,
                released = $8
            WHERE id = $1
            "#,
        )
        .bind(update.id)
        .bind(&update.title)
        .bind(&update.vndb_work_id)
        .bind(&update.vndb_release_id)
        .bind(&update.dlsite_code)
        .bind(&update.introduction)
        .bind(update.content_rating.as_str())
        .bind(&update.released)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// First entry sharing this work id other than `exclude_id`, if any.
    /// Used by the update path's conflict check against entries other than
    /// the one being edited.
    pub async fn find_other_by_work_id(
        &self,
        work_id: &str,
        exclude_id: i64,
    ) -> Result<Option<EntryRef>> {
        let row = sqlx::query(
            "SELECT id, slug, title FROM entry WHERE vndb_work_id = $1 AND id <> $2 LIMIT 1",
        )
        .bind(work_id)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.map(map_ref))
    }
}

#[async_trait]
impl EntryLookup for PgEntryRepository {
    async fn find_by_release_id(&self, release_id: &str) -> Result<Option<EntryRef>> {
        let row = sqlx::query("SELECT id, slug, title FROM entry WHERE vndb_release_id = $1")
            .bind(release_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(map_ref))
    }

    async fn find_by_dlsite_code(&self, code: &str) -> Result<Option<EntryRef>> {
        let row = sqlx::query("SELECT id, slug, title FROM entry WHERE dlsite_code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(map_ref))
    }

    async fn find_all_by_work_id(&self, work_id: &str, limit: i64) -> Result<Vec<EntryRef>> {
        let rows = sqlx::query(
            "SELECT id, slug, title FROM entry WHERE vndb_work_id = $1 ORDER BY id LIMIT $2",
        )
        .bind(work_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.into_iter().map(map_ref).collect())
    }

    async fn find_by_title_or_alias(&self, title: &str) -> Result<Option<EntryRef>> {
        let row = sqlx::query(
            r#"
            SELECT e.id, e.slug, e.title
            FROM entry e
            WHERE LOWER(e.title) = LOWER($1)
               OR EXISTS (
                   SELECT 1 FROM entry_alias a
                   WHERE a.entry_id = e.id AND LOWER(a.name) = LOWER($1)
               )
            ORDER BY e.id
            LIMIT 1
            "#,
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.map(map_ref))
    }
}
