//! User counter repository implementation.

use sqlx::{Pool, Postgres, Row, Transaction};

use galdex_core::{Error, Result};

/// PostgreSQL implementation of the user counter repository.
///
/// Only the counters touched by the publication pipeline live here; account
/// management is out of scope.
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Increment the daily image quota counter and award publish points,
    /// inside the create transaction.
    pub async fn award_publish_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        points: i32,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE galdex_user \
             SET daily_image_count = daily_image_count + 1, points = points + $2 \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(points)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Current (daily_image_count, points) for a user.
    pub async fn counters(&self, user_id: i64) -> Result<Option<(i32, i32)>> {
        let row = sqlx::query("SELECT daily_image_count, points FROM galdex_user WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|r| (r.get("daily_image_count"), r.get("points"))))
    }
}
