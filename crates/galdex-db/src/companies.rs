//! Company (publisher/circle) repository implementation.

use sqlx::{Pool, Postgres, Row};

use galdex_core::{Error, Result};

/// A publisher/circle record linked to catalog entries.
#[derive(Debug, Clone)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub count: i32,
    pub official_website: Vec<String>,
}

/// PostgreSQL implementation of the company repository.
pub struct PgCompanyRepository {
    pool: Pool<Postgres>,
}

fn map_company(row: sqlx::postgres::PgRow) -> Company {
    Company {
        id: row.get("id"),
        name: row.get("name"),
        count: row.get("count"),
        official_website: row.get("official_website"),
    }
}

impl PgCompanyRepository {
    /// Create a new PgCompanyRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Find a company by exact name.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Company>> {
        let row = sqlx::query(
            "SELECT id, name, count, official_website FROM company WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.map(map_company))
    }

    /// Create a company with an empty introduction and zero link count.
    pub async fn create(
        &self,
        name: &str,
        official_website: &[String],
        user_id: i64,
    ) -> Result<Company> {
        let row = sqlx::query(
            r#"
            INSERT INTO company (name, official_website, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, count, official_website
            "#,
        )
        .bind(name)
        .bind(official_website)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(map_company(row))
    }

    /// Link a company to an entry. Returns `true` when a new relation row
    /// was created; the company's link count is incremented only then.
    pub async fn link_entry(&self, entry_id: i64, company_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let inserted = sqlx::query(
            "INSERT INTO entry_company (entry_id, company_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(entry_id)
        .bind(company_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?
        .rows_affected()
            > 0;

        if inserted {
            sqlx::query("UPDATE company SET count = count + 1 WHERE id = $1")
                .bind(company_id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(inserted)
    }
}
