use anyhow::{Context, Result};
use hoh_capture::{crop_rect, PixelRect};
use image::{GrayImage, Luma, RgbImage};
use std::process::Command;
use tracing::{debug, warn};

use crate::config::ValueCrop;

/// Reads loss counts from cleaned-up value crops using Tesseract OCR.
/// Falls back gracefully when Tesseract is not installed.
pub struct DigitReader {
    tesseract_available: bool,
    whitelist: String,
}

impl DigitReader {
    pub fn new(whitelist: &str) -> Self {
        let tesseract_available = check_tesseract();
        if tesseract_available {
            debug!("Tesseract OCR available");
        } else {
            warn!("Tesseract not found. Loss counts will read as 0. Install tesseract and retry");
        }

        Self {
            tesseract_available,
            whitelist: whitelist.to_string(),
        }
    }

    /// Check if OCR is available
    pub fn is_available(&self) -> bool {
        self.tesseract_available
    }

    /// Read a count such as "12,345" from a prepared value crop.
    /// Returns `None` when OCR is unavailable or the text is not a number.
    pub fn read_count(&self, image: &GrayImage) -> Option<u64> {
        if !self.tesseract_available || image.width() == 0 || image.height() == 0 {
            return None;
        }

        match self.run_tesseract(image) {
            Ok(text) => parse_count(&text),
            Err(e) => {
                warn!("OCR failed: {:#}", e);
                None
            }
        }
    }

    /// Run Tesseract on a prepared grayscale image
    fn run_tesseract(&self, image: &GrayImage) -> Result<String> {
        // Unique file per call so workers never share an input
        let input = tempfile::Builder::new()
            .prefix("hoh_ocr_")
            .suffix(".png")
            .tempfile()
            .context("Failed to create OCR temp file")?;
        image
            .save(input.path())
            .with_context(|| format!("Failed to write {}", input.path().display()))?;

        let output = Command::new("tesseract")
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg("eng")
            .arg("--psm")
            .arg("6") // Uniform block of text
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", self.whitelist))
            .output()
            .context("Failed to run tesseract")?;

        if !output.status.success() {
            anyhow::bail!("tesseract exited with {}", output.status);
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("OCR result: '{}'", text);
        Ok(text)
    }
}

/// Cut the loss count next to an icon out of the popup and clean it up for OCR.
///
/// The value sits at `crop.left..crop.right` from the icon's left edge, over
/// the icon's full height. Steps:
/// 1. Convert to grayscale
/// 2. Stretch contrast around the mean intensity
/// 3. Scale brightness
/// 4. Clear pixels darker than the threshold
pub fn prepare_value_crop(popup: &RgbImage, icon: &PixelRect, crop: &ValueCrop) -> GrayImage {
    let rect = PixelRect::from_corners(
        icon.x + crop.left,
        icon.y,
        icon.x + crop.right,
        icon.bottom(),
    );
    let region = crop_rect(popup, &rect);
    let gray = image::imageops::grayscale(&region);
    let enhanced = adjust_brightness(&adjust_contrast(&gray, crop.contrast), crop.brightness);
    clear_below(&enhanced, crop.threshold)
}

/// Blend each pixel away from the image's mean intensity by `factor`.
fn adjust_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    if (factor - 1.0).abs() < f32::EPSILON {
        return img.clone();
    }
    let mean = mean_intensity(img);
    map_intensity(img, |v| mean + (v - mean) * factor)
}

fn adjust_brightness(img: &GrayImage, factor: f32) -> GrayImage {
    if (factor - 1.0).abs() < f32::EPSILON {
        return img.clone();
    }
    map_intensity(img, |v| v * factor)
}

fn clear_below(img: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let v = img.get_pixel(x, y)[0];
        if v < threshold {
            Luma([0])
        } else {
            Luma([v])
        }
    })
}

fn mean_intensity(img: &GrayImage) -> f32 {
    let n = img.width() as u64 * img.height() as u64;
    if n == 0 {
        return 0.0;
    }
    let sum: u64 = img.pixels().map(|p| p[0] as u64).sum();
    (sum as f64 / n as f64).round() as f32
}

fn map_intensity(img: &GrayImage, f: impl Fn(f32) -> f32) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let v = f(img.get_pixel(x, y)[0] as f32);
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

/// Parse OCR output like "12,345" into a count.
pub fn parse_count(text: &str) -> Option<u64> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok()
}

/// Check if Tesseract is installed and accessible
fn check_tesseract() -> bool {
    Command::new("tesseract")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_prepare_value_crop_geometry() {
        let popup = RgbImage::from_pixel(1180, 900, Rgb([200, 200, 200]));
        let icon = PixelRect::new(100, 300, 160, 120);
        let crop = prepare_value_crop(&popup, &icon, &ValueCrop::default());
        assert_eq!(crop.dimensions(), (195, 120));
    }

    #[test]
    fn test_prepare_value_crop_clamps_at_edge() {
        let popup = RgbImage::from_pixel(1180, 900, Rgb([200, 200, 200]));
        let icon = PixelRect::new(1000, 800, 160, 100);
        let crop = prepare_value_crop(&popup, &icon, &ValueCrop::default());
        assert_eq!(crop.dimensions(), (25, 100));
    }

    #[test]
    fn test_prepare_value_crop_clears_dark_pixels() {
        // Dark text column on a light background, right of the icon
        let popup = RgbImage::from_fn(600, 200, |x, _| {
            if x == 200 {
                Rgb([30, 30, 30])
            } else {
                Rgb([180, 180, 180])
            }
        });
        let icon = PixelRect::new(0, 0, 150, 100);
        let crop = prepare_value_crop(&popup, &icon, &ValueCrop::default());

        // x=200 in the popup is x=45 in the crop
        assert_eq!(crop.get_pixel(45, 10)[0], 0);
        assert!(crop.get_pixel(10, 10)[0] > 180);
    }

    #[test]
    fn test_contrast_around_mean() {
        let img = GrayImage::from_fn(2, 1, |x, _| if x == 0 { Luma([100]) } else { Luma([200]) });
        let out = adjust_contrast(&img, 2.0);
        // mean 150
        assert_eq!(out.get_pixel(0, 0)[0], 50);
        assert_eq!(out.get_pixel(1, 0)[0], 250);
    }

    #[test]
    fn test_brightness_saturates() {
        let img = GrayImage::from_pixel(1, 1, Luma([240]));
        assert_eq!(adjust_brightness(&img, 1.2).get_pixel(0, 0)[0], 255);
        let img = GrayImage::from_pixel(1, 1, Luma([100]));
        assert_eq!(adjust_brightness(&img, 1.2).get_pixel(0, 0)[0], 120);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("12,345"), Some(12345));
        assert_eq!(parse_count(" 7\n"), Some(7));
        assert_eq!(parse_count("1 234"), Some(1234));
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count(",,"), None);
        assert_eq!(parse_count("12a"), None);
    }
}
