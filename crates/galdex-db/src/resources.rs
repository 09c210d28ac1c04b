//! Resource repository and parent attribute aggregation.
//!
//! Every resource mutation recomputes the parent entry's aggregated
//! `kinds`/`languages`/`platforms` arrays inside the same transaction, so a
//! parent never momentarily reflects a stale aggregate.

use std::collections::BTreeSet;

use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;

use galdex_core::{CreateResourceRequest, Error, Resource, Result, UpdateResourceRequest};

/// Multi-valued attributes of one resource, as read for aggregation.
#[derive(Debug, Clone, Default)]
pub struct ResourceAttributes {
    pub kinds: Vec<String>,
    pub languages: Vec<String>,
    pub platforms: Vec<String>,
}

/// Union of attribute arrays across resources, deduplicated and sorted.
///
/// Sorting makes the replacement arrays deterministic; the parent arrays are
/// a set, not an ordered list.
pub fn union_attributes(resources: &[ResourceAttributes]) -> ResourceAttributes {
    let mut kinds = BTreeSet::new();
    let mut languages = BTreeSet::new();
    let mut platforms = BTreeSet::new();

    for r in resources {
        kinds.extend(r.kinds.iter().cloned());
        languages.extend(r.languages.iter().cloned());
        platforms.extend(r.platforms.iter().cloned());
    }

    ResourceAttributes {
        kinds: kinds.into_iter().collect(),
        languages: languages.into_iter().collect(),
        platforms: platforms.into_iter().collect(),
    }
}

/// PostgreSQL implementation of the resource repository.
pub struct PgResourceRepository {
    pool: Pool<Postgres>,
}

fn map_resource(row: sqlx::postgres::PgRow) -> Resource {
    Resource {
        id: row.get("id"),
        entry_id: row.get("entry_id"),
        user_id: row.get("user_id"),
        kinds: row.get("kinds"),
        languages: row.get("languages"),
        platforms: row.get("platforms"),
        content: row.get("content"),
        storage: row.get("storage"),
        note: row.get("note"),
        size: row.get("size"),
        created: row.get("created"),
    }
}

impl PgResourceRepository {
    /// Create a new PgResourceRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Recompute the parent entry's aggregated attribute arrays as the union
    /// over all remaining child resources (full overwrite, not incremental
    /// merge) and bump `resource_update_time`.
    ///
    /// Must run inside the same transaction as the mutation it follows.
    pub async fn refresh_entry_attributes_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry_id: i64,
    ) -> Result<()> {
        let rows = sqlx::query("SELECT kinds, languages, platforms FROM resource WHERE entry_id = $1")
            .bind(entry_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(Error::Database)?;

        let attrs: Vec<ResourceAttributes> = rows
            .iter()
            .map(|r| ResourceAttributes {
                kinds: r.get("kinds"),
                languages: r.get("languages"),
                platforms: r.get("platforms"),
            })
            .collect();
        let union = union_attributes(&attrs);

        debug!(
            subsystem = "db",
            component = "resources",
            op = "refresh_attributes",
            entry_id = entry_id,
            kind_count = union.kinds.len(),
            language_count = union.languages.len(),
            platform_count = union.platforms.len(),
            "Recomputed entry attribute aggregates"
        );

        sqlx::query(
            r#"
            UPDATE entry
            SET kinds = $2, languages = $3, platforms = $4,
                resource_update_time = now()
            WHERE id = $1
            "#,
        )
        .bind(entry_id)
        .bind(&union.kinds)
        .bind(&union.languages)
        .bind(&union.platforms)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Insert a resource and refresh the parent aggregates in one
    /// transaction. Also awards the submitting user their publish points.
    pub async fn create(&self, req: &CreateResourceRequest, point_award: i32) -> Result<Resource> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query(
            r#"
            INSERT INTO resource (
                entry_id, user_id, kinds, languages, platforms,
                content, storage, note, size
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, entry_id, user_id, kinds, languages, platforms,
                      content, storage, note, size, created
            "#,
        )
        .bind(req.entry_id)
        .bind(req.user_id)
        .bind(&req.kinds)
        .bind(&req.languages)
        .bind(&req.platforms)
        .bind(&req.content)
        .bind(&req.storage)
        .bind(&req.note)
        .bind(&req.size)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query("UPDATE galdex_user SET points = points + $2 WHERE id = $1")
            .bind(req.user_id)
            .bind(point_award)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        self.refresh_entry_attributes_tx(&mut tx, req.entry_id).await?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(map_resource(row))
    }

    /// Replace a resource's editable fields and refresh the parent
    /// aggregates in one transaction.
    pub async fn update(&self, req: &UpdateResourceRequest) -> Result<Resource> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query(
            r#"
            UPDATE resource
            SET kinds = $2, languages = $3, platforms = $4,
                content = $5, note = $6, size = $7
            WHERE id = $1
            RETURNING id, entry_id, user_id, kinds, languages, platforms,
                      content, storage, note, size, created
            "#,
        )
        .bind(req.id)
        .bind(&req.kinds)
        .bind(&req.languages)
        .bind(&req.platforms)
        .bind(&req.content)
        .bind(&req.note)
        .bind(&req.size)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("resource {}", req.id)))?;

        let resource = map_resource(row);
        self.refresh_entry_attributes_tx(&mut tx, resource.entry_id)
            .await?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(resource)
    }

    /// Delete a resource and refresh the parent aggregates in one
    /// transaction.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query("DELETE FROM resource WHERE id = $1 RETURNING entry_id")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound(format!("resource {id}")))?;

        let entry_id: i64 = row.get("entry_id");
        self.refresh_entry_attributes_tx(&mut tx, entry_id).await?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    /// Fetch a resource by id.
    pub async fn fetch(&self, id: i64) -> Result<Option<Resource>> {
        let row = sqlx::query(
            "SELECT id, entry_id, user_id, kinds, languages, platforms, \
             content, storage, note, size, created FROM resource WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.map(map_resource))
    }

    /// All resources attached to an entry.
    pub async fn list_for_entry(&self, entry_id: i64) -> Result<Vec<Resource>> {
        let rows = sqlx::query(
            "SELECT id, entry_id, user_id, kinds, languages, platforms, \
             content, storage, note, size, created FROM resource \
             WHERE entry_id = $1 ORDER BY id",
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.into_iter().map(map_resource).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(kinds: &[&str], languages: &[&str], platforms: &[&str]) -> ResourceAttributes {
        ResourceAttributes {
            kinds: kinds.iter().map(|s| s.to_string()).collect(),
            languages: languages.iter().map(|s| s.to_string()).collect(),
            platforms: platforms.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_union_empty() {
        let union = union_attributes(&[]);
        assert!(union.kinds.is_empty());
        assert!(union.languages.is_empty());
        assert!(union.platforms.is_empty());
    }

    #[test]
    fn test_union_deduplicates_and_sorts() {
        let union = union_attributes(&[
            attrs(&["patch", "save"], &["ja"], &["windows"]),
            attrs(&["patch"], &["en", "ja"], &["android", "windows"]),
        ]);
        assert_eq!(union.kinds, vec!["patch", "save"]);
        assert_eq!(union.languages, vec!["en", "ja"]);
        assert_eq!(union.platforms, vec!["android", "windows"]);
    }

    #[test]
    fn test_union_is_exactly_the_member_union() {
        let a = attrs(&["a"], &[], &["linux"]);
        let b = attrs(&["b"], &["zh"], &[]);
        let union = union_attributes(&[a, b]);
        assert_eq!(union.kinds, vec!["a", "b"]);
        assert_eq!(union.languages, vec!["zh"]);
        assert_eq!(union.platforms, vec!["linux"]);
    }
}
