use anyhow::{Context, Result};
use image::{ImageBuffer, Pixel, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Screenshot extensions tried in order when looking up an entry.
const SCREENSHOT_EXTENSIONS: &[&str] = &["png", "jpg"];

/// Pixel rectangle inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning the corners `(x0, y0)` (inclusive) and `(x1, y1)` (exclusive).
    pub fn from_corners(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Clamp the rectangle so it lies inside an image of the given size.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }
}

/// Crop a pixel rectangle from an image, clamped to the image bounds.
pub fn crop_rect<P>(
    img: &ImageBuffer<P, Vec<P::Subpixel>>,
    rect: &PixelRect,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    let (w, h) = img.dimensions();
    let r = rect.clamp_to(w, h);
    image::imageops::crop_imm(img, r.x, r.y, r.width, r.height).to_image()
}

/// Find the screenshot stored for an entry: `<dir>/<id>.png`, else `<dir>/<id>.jpg`.
pub fn find_screenshot(dir: &Path, id: &str) -> Option<PathBuf> {
    SCREENSHOT_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", id, ext)))
        .find(|path| path.is_file())
}

/// Decode a screenshot from disk into a 3-channel image.
pub fn load_screenshot(path: &Path) -> Result<RgbImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .to_rgb8();
    debug!(
        "Loaded {} ({}x{})",
        path.display(),
        img.width(),
        img.height()
    );
    Ok(img)
}
