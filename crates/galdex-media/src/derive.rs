//! Image derivation: turn a raw upload into finished public variants.
//!
//! Banners get a full-size variant capped at 1920x1080 plus a 460x259
//! thumbnail; gallery images get the full-size treatment with an optional
//! watermark. Everything is re-encoded as AVIF at a fixed quality, and
//! encoded sizes are checked against a ceiling as a guard against
//! pathological inputs.

use std::io::Cursor;
use std::time::Instant;

use image::codecs::avif::AvifEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use tracing::{debug, warn};

use galdex_core::defaults::{
    AVIF_QUALITY, AVIF_SPEED, GALLERY_SIZE_RATIO, IMAGE_MAX_HEIGHT, IMAGE_MAX_WIDTH,
    REFERENCE_IMAGE_BYTES, THUMB_MAX_HEIGHT, THUMB_MAX_WIDTH, THUMB_SIZE_RATIO,
};
use galdex_core::{Error, Result};

use crate::watermark::WatermarkTile;

/// Finished banner variants ready for upload.
#[derive(Debug, Clone)]
pub struct DerivedBanner {
    /// Full-size variant, capped at 1920x1080.
    pub full: Vec<u8>,
    /// Thumbnail variant, capped at 460x259.
    pub thumb: Vec<u8>,
}

/// Target dimensions fitting inside `max_w` x `max_h`, preserving aspect
/// ratio and never upscaling.
pub fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width <= max_w && height <= max_h {
        return (width, height);
    }
    let scale = f64::min(max_w as f64 / width as f64, max_h as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w.min(max_w), h.min(max_h))
}

/// True when an encoded size stays within `ratio` times the reference size.
pub fn within_size_ceiling(encoded_len: usize, ratio: f64) -> bool {
    (encoded_len as f64) <= ratio * REFERENCE_IMAGE_BYTES as f64
}

fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(bytes).map_err(|e| Error::Image(e.to_string()))?;
    Ok(img.into_rgba8())
}

fn resize_to_fit(img: &RgbaImage, max_w: u32, max_h: u32) -> RgbaImage {
    let (w, h) = fit_within(img.width(), img.height(), max_w, max_h);
    if (w, h) == (img.width(), img.height()) {
        img.clone()
    } else {
        imageops::resize(img, w, h, FilterType::Lanczos3)
    }
}

fn encode_avif(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = AvifEncoder::new_with_speed_quality(&mut buf, AVIF_SPEED, AVIF_QUALITY);
    encoder
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| Error::Image(e.to_string()))?;
    Ok(buf.into_inner())
}

/// Derive the banner variants from a raw upload.
///
/// Fails when the input cannot be decoded or when the encoded thumbnail
/// exceeds its size ceiling.
pub fn derive_banner(bytes: &[u8]) -> Result<DerivedBanner> {
    let start = Instant::now();
    let source = decode(bytes)?;

    let full = encode_avif(&resize_to_fit(&source, IMAGE_MAX_WIDTH, IMAGE_MAX_HEIGHT))?;
    let thumb = encode_avif(&resize_to_fit(&source, THUMB_MAX_WIDTH, THUMB_MAX_HEIGHT))?;

    if !within_size_ceiling(thumb.len(), THUMB_SIZE_RATIO) {
        warn!(
            subsystem = "media",
            component = "banner",
            encoded_bytes = thumb.len(),
            "Encoded banner thumbnail exceeds size ceiling"
        );
        return Err(Error::Image("banner image is too large".to_string()));
    }

    debug!(
        subsystem = "media",
        component = "banner",
        op = "derive_banner",
        encoded_bytes = full.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Derived banner variants"
    );
    Ok(DerivedBanner { full, thumb })
}

/// Derive a gallery image from a raw upload, optionally compositing the
/// repeating watermark tile before encoding.
pub fn derive_gallery_image(bytes: &[u8], watermark: Option<&WatermarkTile>) -> Result<Vec<u8>> {
    let start = Instant::now();
    let source = decode(bytes)?;

    let mut resized = resize_to_fit(&source, IMAGE_MAX_WIDTH, IMAGE_MAX_HEIGHT);
    if let Some(tile) = watermark {
        tile.apply(&mut resized);
    }

    let encoded = encode_avif(&resized)?;
    if !within_size_ceiling(encoded.len(), GALLERY_SIZE_RATIO) {
        warn!(
            subsystem = "media",
            component = "gallery",
            encoded_bytes = encoded.len(),
            "Encoded gallery image exceeds size ceiling"
        );
        return Err(Error::Image("gallery image is too large".to_string()));
    }

    debug!(
        subsystem = "media",
        component = "gallery",
        op = "derive_gallery_image",
        encoded_bytes = encoded.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Derived gallery image"
    );
    Ok(encoded)
}

// ─── Object storage keys ───────────────────────────────────────────────────

/// Storage key for the full-size banner.
pub fn banner_key(entry_id: i64) -> String {
    format!("entry/{entry_id}/banner/banner.avif")
}

/// Storage key for the banner thumbnail.
pub fn banner_mini_key(entry_id: i64) -> String {
    format!("entry/{entry_id}/banner/banner-mini.avif")
}

/// Storage key for a gallery image.
pub fn gallery_key(entry_id: i64, image_id: i64) -> String {
    format!("entry/{entry_id}/gallery/{image_id}.avif")
}
