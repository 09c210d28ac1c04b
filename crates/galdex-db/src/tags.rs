//! Tag repository implementation.
//!
//! Tags are name-keyed with a usage count. Registration creates missing
//! tags, links them to the entry, and increments the usage count only for
//! newly-created links.

use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use galdex_core::{Error, Result};

/// PostgreSQL implementation of the tag repository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Register a batch of tag names against an entry. Returns the number of
    /// new (entry, tag) links created.
    pub async fn register_batch(&self, entry_id: i64, names: &[String]) -> Result<usize> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut linked = 0usize;

        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            // Upsert keeps the existing row without touching its count; the
            // count tracks links, not registration attempts.
            let tag_id: i64 = sqlx::query(
                r#"
                INSERT INTO tag (name) VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                "#,
            )
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?
            .get("id");

            let inserted = sqlx::query(
                "INSERT INTO entry_tag (entry_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(entry_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?
            .rows_affected()
                > 0;

            if inserted {
                sqlx::query("UPDATE tag SET count = count + 1 WHERE id = $1")
                    .bind(tag_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(Error::Database)?;
                linked += 1;
            }
        }

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "tags",
            op = "register_batch",
            entry_id = entry_id,
            tag_count = names.len(),
            linked = linked,
            "Registered entry tags"
        );
        Ok(linked)
    }

    /// Tag names linked to an entry.
    pub async fn list_for_entry(&self, entry_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT t.name FROM tag t
            JOIN entry_tag et ON et.tag_id = t.id
            WHERE et.entry_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(|r| r.get("name")).collect())
    }
}
