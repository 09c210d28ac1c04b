//! End-to-end pipeline tests against a live Postgres.
//!
//! All tests are ignored by default. Run with a test database available:
//!
//! ```bash
//! cargo test -p galdex-pipeline -- --ignored
//! ```

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::{Rgba, RgbaImage};
use sqlx::Row;

use galdex_cache::{KvCache, ReadThroughCache};
use galdex_core::{
    ContentRating, CreateEntryRequest, Error, GalleryPlan, GalleryStore, GalleryUpload, KeepImage,
    UpdateEntryRequest,
};
use galdex_db::test_fixtures::TestDatabase;
use galdex_db::Database;
use galdex_media::storage::MemoryObjectStorage;
use galdex_pipeline::{EntryPipeline, PipelineConfig};
use galdex_providers::dlsite::DlsiteClient;

fn png(width: u32, height: u32, r: u8) -> Bytes {
    let img = RgbaImage::from_pixel(width, height, Rgba([r, 80, 120, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    Bytes::from(out.into_inner())
}

fn create_request(title: &str, banner: Bytes) -> CreateEntryRequest {
    CreateEntryRequest {
        title: title.to_string(),
        vndb_work_id: None,
        vndb_release_id: None,
        dlsite_code: None,
        introduction: "An introduction.".to_string(),
        released: Some("2026-01-01".to_string()),
        content_rating: ContentRating::Nsfw,
        aliases: Vec::new(),
        tags: Vec::new(),
        banner,
        gallery: Vec::new(),
        is_duplicate: false,
    }
}

fn update_request(id: i64, title: &str) -> UpdateEntryRequest {
    UpdateEntryRequest {
        id,
        title: title.to_string(),
        vndb_work_id: None,
        vndb_release_id: None,
        dlsite_code: None,
        introduction: "Edited.".to_string(),
        released: None,
        content_rating: ContentRating::Nsfw,
        aliases: Vec::new(),
        tags: Vec::new(),
        banner: None,
        gallery: None,
        is_duplicate: false,
    }
}

fn pipeline_over(test_db: &TestDatabase) -> (EntryPipeline, Arc<MemoryObjectStorage>) {
    let storage = Arc::new(MemoryObjectStorage::new());
    let db = Arc::new(Database::from_pool(test_db.db.pool.clone()));
    let pipeline = EntryPipeline::new(
        db,
        storage.clone(),
        ReadThroughCache::new(KvCache::disabled()),
        PipelineConfig {
            asset_base_url: "https://assets.test".to_string(),
            site_base_url: "https://site.test".to_string(),
        },
    );
    (pipeline, storage)
}

#[tokio::test]
#[ignore] // requires a running Postgres
async fn test_create_entry_commits_the_full_unit() {
    let test_db = TestDatabase::new().await;
    test_db.cleanup().await;
    let user_id = test_db.seed_user("publisher").await;
    let (pipeline, storage) = pipeline_over(&test_db);

    let mut req = create_request("Moonlit Garden", png(400, 240, 10));
    req.aliases = vec![
        "Tsukiniwa".to_string(),
        "Tsukiniwa".to_string(),
        "  ".to_string(),
    ];

    let outcome = pipeline.create_entry(user_id, req).await.unwrap();
    assert_eq!(outcome.slug.len(), 8);
    assert!(outcome.slug.chars().all(|c| c.is_ascii_hexdigit()));

    let entry = test_db
        .db
        .entries
        .fetch(outcome.entry_id)
        .await
        .unwrap()
        .unwrap();
    let key = format!("entry/{}/banner/banner.avif", outcome.entry_id);
    assert!(entry.banner.starts_with(&format!("https://assets.test/{key}?t=")));
    assert!(storage.get(&key).is_some());
    assert!(storage
        .get(&format!("entry/{}/banner/banner-mini.avif", outcome.entry_id))
        .is_some());

    // Duplicate and blank aliases collapse to one row.
    let aliases = test_db
        .db
        .entries
        .list_aliases(outcome.entry_id)
        .await
        .unwrap();
    assert_eq!(aliases, vec!["Tsukiniwa".to_string()]);

    // Zero-initialized rating aggregate row exists.
    let row = sqlx::query("SELECT count, total FROM rating_stat WHERE entry_id = $1")
        .bind(outcome.entry_id)
        .fetch_one(&test_db.db.pool)
        .await
        .unwrap();
    assert_eq!(row.get::<i32, _>("count"), 0);
    assert_eq!(row.get::<i32, _>("total"), 0);

    // Counters moved inside the same transaction.
    let (daily, points) = test_db.db.users.counters(user_id).await.unwrap().unwrap();
    assert_eq!(daily, 1);
    assert_eq!(points, 3);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // requires a running Postgres
async fn test_create_rejects_taken_dlsite_code() {
    let test_db = TestDatabase::new().await;
    test_db.cleanup().await;
    let user_id = test_db.seed_user("publisher").await;
    let (pipeline, _storage) = pipeline_over(&test_db);

    let mut first = create_request("Original", png(200, 120, 20));
    first.dlsite_code = Some("RJ999999".to_string());
    pipeline.create_entry(user_id, first).await.unwrap();

    let mut second = create_request("Imitator", png(200, 120, 30));
    second.dlsite_code = Some("rj999999".to_string());
    // Confirming a soft duplicate does not soften a hard identifier.
    second.is_duplicate = true;
    match pipeline.create_entry(user_id, second).await {
        Err(Error::Duplicate { field, .. }) => assert_eq!(field, "dlsiteCode"),
        other => panic!("expected dlsiteCode duplicate, got {other:?}"),
    }

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // requires a running Postgres
async fn test_shared_work_id_needs_confirmation() {
    let test_db = TestDatabase::new().await;
    test_db.cleanup().await;
    let user_id = test_db.seed_user("publisher").await;
    let (pipeline, _storage) = pipeline_over(&test_db);

    let mut first = create_request("First Edition", png(200, 120, 40));
    first.vndb_work_id = Some("v100".to_string());
    pipeline.create_entry(user_id, first).await.unwrap();

    // Identifier case must not matter: the stored id is lowercase.
    let mut second = create_request("Second Edition", png(200, 120, 50));
    second.vndb_work_id = Some("V100".to_string());
    match pipeline.create_entry(user_id, second.clone()).await {
        Err(Error::Duplicate { field, .. }) => assert_eq!(field, "vndbWorkId"),
        other => panic!("expected vndbWorkId duplicate, got {other:?}"),
    }

    second.is_duplicate = true;
    let outcome = pipeline.create_entry(user_id, second).await.unwrap();
    assert!(outcome.entry_id > 0);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // requires a running Postgres
async fn test_update_reconciles_the_gallery() {
    let test_db = TestDatabase::new().await;
    test_db.cleanup().await;
    let user_id = test_db.seed_user("publisher").await;
    let (pipeline, _storage) = pipeline_over(&test_db);

    let outcome = pipeline
        .create_entry(user_id, create_request("Gallery Host", png(200, 120, 60)))
        .await
        .unwrap();

    // Two finalized images, as if an earlier upload completed.
    let keep_id = test_db
        .db
        .gallery
        .insert_placeholder(outcome.entry_id, false)
        .await
        .unwrap();
    test_db.db.gallery.set_url(keep_id, "https://assets.test/a").await.unwrap();
    let drop_id = test_db
        .db
        .gallery
        .insert_placeholder(outcome.entry_id, false)
        .await
        .unwrap();
    test_db.db.gallery.set_url(drop_id, "https://assets.test/b").await.unwrap();

    let mut req = update_request(outcome.entry_id, "Gallery Host");
    req.gallery = Some(GalleryPlan {
        keep: vec![KeepImage {
            id: keep_id,
            is_nsfw: true,
        }],
        new: Vec::new(),
        watermark: false,
    });
    pipeline.update_entry(user_id, req).await.unwrap();

    let rows = test_db.db.gallery.list_for_entry(outcome.entry_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, keep_id);
    assert!(rows[0].is_nsfw);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // requires a running Postgres
async fn test_update_new_image_failure_aborts_whole_update() {
    let test_db = TestDatabase::new().await;
    test_db.cleanup().await;
    let user_id = test_db.seed_user("publisher").await;
    let (pipeline, _storage) = pipeline_over(&test_db);

    let outcome = pipeline
        .create_entry(user_id, create_request("Strict Host", png(200, 120, 70)))
        .await
        .unwrap();

    let kept = test_db
        .db
        .gallery
        .insert_placeholder(outcome.entry_id, false)
        .await
        .unwrap();
    test_db.db.gallery.set_url(kept, "https://assets.test/k").await.unwrap();

    let mut req = update_request(outcome.entry_id, "Strict Host");
    req.gallery = Some(GalleryPlan {
        keep: vec![KeepImage {
            id: kept,
            is_nsfw: false,
        }],
        new: vec![GalleryUpload {
            bytes: Bytes::from_static(b"not an image"),
            is_nsfw: false,
            watermark: false,
        }],
        watermark: false,
    });
    assert!(pipeline.update_entry(user_id, req).await.is_err());

    // The kept image survives; the failed upload's placeholder is gone.
    let rows = test_db.db.gallery.list_for_entry(outcome.entry_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, kept);
    assert!(rows.iter().all(|r| !r.url.is_empty()));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // requires a running Postgres
async fn test_update_by_non_owner_is_rejected() {
    let test_db = TestDatabase::new().await;
    test_db.cleanup().await;
    let owner_id = test_db.seed_user("owner").await;
    let intruder_id = test_db.seed_user("intruder").await;
    let (pipeline, _storage) = pipeline_over(&test_db);

    let outcome = pipeline
        .create_entry(owner_id, create_request("Owned Entry", png(200, 120, 80)))
        .await
        .unwrap();

    let req = update_request(outcome.entry_id, "Hijacked");
    let result = pipeline.update_entry(intruder_id, req).await;
    assert!(matches!(result, Err(Error::Unauthorized(_))));

    // Untouched by the rejected edit.
    let entry = test_db
        .db
        .entries
        .fetch(outcome.entry_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.title, "Owned Entry");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // requires a running Postgres
async fn test_attach_publisher_links_each_circle_once() {
    let test_db = TestDatabase::new().await;
    test_db.cleanup().await;
    let user_id = test_db.seed_user("publisher").await;
    let (pipeline, _storage) = pipeline_over(&test_db);

    let first = pipeline
        .create_entry(user_id, create_request("Circle Game A", png(200, 120, 90)))
        .await
        .unwrap();
    let second = pipeline
        .create_entry(user_id, create_request("Circle Game B", png(200, 120, 100)))
        .await
        .unwrap();

    let website = vec!["https://circle.example".to_string()];
    assert!(pipeline
        .attach_publisher(first.entry_id, user_id, "Example Circle", &website)
        .await
        .unwrap());
    // Re-linking the same entry is a no-op.
    assert!(!pipeline
        .attach_publisher(first.entry_id, user_id, "Example Circle", &website)
        .await
        .unwrap());
    // The company row is reused across entries.
    assert!(pipeline
        .attach_publisher(second.entry_id, user_id, "Example Circle", &website)
        .await
        .unwrap());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // requires a running Postgres
async fn test_create_survives_unreachable_publisher_source() {
    let test_db = TestDatabase::new().await;
    test_db.cleanup().await;
    let user_id = test_db.seed_user("publisher").await;
    let (pipeline, _storage) = pipeline_over(&test_db);
    let pipeline =
        pipeline.with_dlsite(DlsiteClient::with_base_url("http://127.0.0.1:1".to_string()));

    let mut req = create_request("Offline Circle", png(200, 120, 110));
    req.dlsite_code = Some("RJ888888".to_string());

    // Publisher lookup is post-commit and best-effort; its failure never
    // surfaces.
    let outcome = pipeline.create_entry(user_id, req).await.unwrap();
    assert!(outcome.entry_id > 0);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // requires a running Postgres
async fn test_update_unknown_entry_is_not_found() {
    let test_db = TestDatabase::new().await;
    test_db.cleanup().await;
    let user_id = test_db.seed_user("publisher").await;
    let (pipeline, _storage) = pipeline_over(&test_db);

    let result = pipeline
        .update_entry(user_id, update_request(424242, "Ghost"))
        .await;
    assert!(matches!(result, Err(Error::EntryNotFound(424242))));

    test_db.cleanup().await;
}
