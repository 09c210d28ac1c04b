//! # galdex-db
//!
//! PostgreSQL database layer for galdex.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for catalog entries, gallery images,
//!   resources, companies, tags, and user counters
//! - Transaction-aware (`_tx`) method variants so the publication pipeline
//!   can compose multiple repositories into one all-or-nothing unit
//!
//! ## Example
//!
//! ```rust,ignore
//! use galdex_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/galdex").await?;
//!     let entry = db.entries.fetch_by_slug("a1b2c3d4").await?;
//!     println!("{:?}", entry);
//!     Ok(())
//! }
//! ```

pub mod companies;
pub mod entries;
pub mod gallery;
pub mod pool;
pub mod resources;
pub mod tags;
pub mod users;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use galdex_core::*;

// Re-export repository implementations
pub use companies::{Company, PgCompanyRepository};
pub use entries::{EntryScalarUpdate, NewEntry, PgEntryRepository};
pub use gallery::PgGalleryRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use resources::{union_attributes, PgResourceRepository, ResourceAttributes};
pub use tags::PgTagRepository;
pub use users::PgUserRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Catalog entry repository (entries, aliases, rating stats).
    pub entries: PgEntryRepository,
    /// Gallery image repository.
    pub gallery: PgGalleryRepository,
    /// Resource repository with attribute aggregation.
    pub resources: PgResourceRepository,
    /// Company repository for publisher linkage.
    pub companies: PgCompanyRepository,
    /// Tag repository.
    pub tags: PgTagRepository,
    /// User counter repository.
    pub users: PgUserRepository,
}

impl Database {
    /// Connect with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(database_url, config).await?;
        Ok(Self::from_pool(pool))
    }

    /// Build the repository set over an existing pool.
    pub fn from_pool(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            entries: PgEntryRepository::new(pool.clone()),
            gallery: PgGalleryRepository::new(pool.clone()),
            resources: PgResourceRepository::new(pool.clone()),
            companies: PgCompanyRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            users: PgUserRepository::new(pool.clone()),
            pool,
        }
    }

    /// Begin a publication transaction with the generous statement timeout
    /// required by in-transaction image encodes.
    pub async fn begin_publish_tx(&self) -> Result<sqlx::Transaction<'static, sqlx::Postgres>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = '{}s'",
            galdex_core::defaults::CREATE_TX_TIMEOUT_SECS
        ))
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;
        Ok(tx)
    }
}
