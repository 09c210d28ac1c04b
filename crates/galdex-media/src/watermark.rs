//! Repeating text watermark for gallery images.
//!
//! The watermark is a fixed-configuration semi-transparent rotated text
//! tile, composited over the image on a grid. Parameters are configuration,
//! never user input. Rendering the text needs a font file; when none is
//! configured the caller treats watermarking as disabled.

use std::path::PathBuf;

use ab_glyph::{FontVec, PxScale};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use tracing::info;

use galdex_core::defaults::{
    WATERMARK_ANGLE_DEGREES, WATERMARK_FONT_SIZE, WATERMARK_OPACITY, WATERMARK_TEXT,
    WATERMARK_TILE_SIZE,
};
use galdex_core::{Error, Result};

/// Fixed watermark configuration.
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    pub text: String,
    pub font_size: f32,
    /// Text opacity, 0.0–1.0.
    pub opacity: f32,
    /// Rotation in degrees counter-clockwise.
    pub angle_degrees: f32,
    /// Side length of the square tile, pixels.
    pub tile_size: u32,
    /// TTF/OTF file to rasterize the text with.
    pub font_path: Option<PathBuf>,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: WATERMARK_TEXT.to_string(),
            font_size: WATERMARK_FONT_SIZE,
            opacity: WATERMARK_OPACITY,
            angle_degrees: WATERMARK_ANGLE_DEGREES,
            tile_size: WATERMARK_TILE_SIZE,
            font_path: None,
        }
    }
}

impl WatermarkConfig {
    /// Read the font path from `GALDEX_WATERMARK_FONT`; all other parameters
    /// keep their fixed defaults.
    pub fn from_env() -> Self {
        Self {
            font_path: std::env::var("GALDEX_WATERMARK_FONT").ok().map(PathBuf::from),
            ..Self::default()
        }
    }
}

/// A pre-rendered watermark tile, ready to composite over images.
#[derive(Debug, Clone)]
pub struct WatermarkTile {
    tile: RgbaImage,
}

impl WatermarkTile {
    /// Render the tile from configuration. Fails when no font is configured
    /// or the font file cannot be loaded.
    pub fn render(config: &WatermarkConfig) -> Result<Self> {
        let font_path = config
            .font_path
            .as_ref()
            .ok_or_else(|| Error::Config("watermark font not configured".to_string()))?;
        let font_bytes = std::fs::read(font_path)?;
        let font = FontVec::try_from_vec(font_bytes)
            .map_err(|_| Error::Config(format!("invalid watermark font: {}", font_path.display())))?;

        let size = config.tile_size;
        let mut tile = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));

        let alpha = (config.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        let color = Rgba([255, 255, 255, alpha]);
        let scale = PxScale::from(config.font_size);

        // Center the text before rotating the whole tile.
        let (text_w, text_h) = text_size(scale, &font, &config.text);
        let x = (size as i32 - text_w as i32) / 2;
        let y = (size as i32 - text_h as i32) / 2;
        draw_text_mut(&mut tile, color, x, y, scale, &font, &config.text);

        let tile = rotate_about_center(
            &tile,
            config.angle_degrees.to_radians(),
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
        );

        info!(
            subsystem = "media",
            component = "watermark",
            op = "render",
            tile_size = size,
            "Rendered watermark tile"
        );
        Ok(Self { tile })
    }

    /// Build a tile from an already-rendered image (test seam).
    pub fn from_image(tile: RgbaImage) -> Self {
        Self { tile }
    }

    /// Composite the tile over the image on a repeating grid.
    pub fn apply(&self, image: &mut RgbaImage) {
        let (tw, th) = (self.tile.width(), self.tile.height());
        if tw == 0 || th == 0 {
            return;
        }
        let mut y = 0i64;
        while y < image.height() as i64 {
            let mut x = 0i64;
            while x < image.width() as i64 {
                imageops::overlay(image, &self.tile, x, y);
                x += tw as i64;
            }
            y += th as i64;
        }
    }
}
