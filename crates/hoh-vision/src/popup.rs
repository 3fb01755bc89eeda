use hoh_capture::{crop_rect, PixelRect};
use image::imageops::FilterType;
use image::RgbImage;
use tracing::debug;

use crate::config::VisionConfig;
use crate::mask::{bounding_rect, color_range_mask, contour_area, external_contours};

/// Locate the loss-report popup in a screenshot and normalize it.
///
/// The popup is the largest near-white blob. It is rescaled to
/// `canonical_width` (keeping aspect ratio) and trimmed to `popup_width`.
/// Returns `None` when there is no blob, or when the largest one is too
/// small to be the popup once rescaled.
pub fn locate_popup(screenshot: &RgbImage, config: &VisionConfig) -> Option<RgbImage> {
    let mask = color_range_mask(screenshot, config.white_low, config.white_high);
    let contours = external_contours(&mask);

    // Zero-area contours (lines, single pixels) are never selected
    let mut best: Option<(f64, usize)> = None;
    let mut best_area = 0.0;
    for (i, contour) in contours.iter().enumerate() {
        let area = contour_area(contour);
        if area > best_area {
            best_area = area;
            best = Some((area, i));
        }
    }
    let Some((area, idx)) = best else {
        debug!("No white region in screenshot");
        return None;
    };

    let bounds = bounding_rect(&contours[idx]);
    if bounds.width == 0 || bounds.height == 0 {
        debug!("Largest white region is degenerate");
        return None;
    }

    let scaled_area = area * config.canonical_width as f64 / bounds.width as f64;
    if scaled_area < config.min_popup_area {
        debug!(
            "Largest white region too small: area {:.0} at canonical width (min {:.0})",
            scaled_area, config.min_popup_area
        );
        return None;
    }

    let height =
        (config.canonical_width as u64 * bounds.height as u64 / bounds.width as u64) as u32;
    if height == 0 {
        debug!("Popup height rounds to zero");
        return None;
    }

    let region = crop_rect(screenshot, &bounds);
    let scaled = if bounds.width == config.canonical_width {
        region
    } else {
        image::imageops::resize(&region, config.canonical_width, height, FilterType::Triangle)
    };

    let width = config.popup_width.min(config.canonical_width);
    debug!(
        "Popup at ({}, {}) {}x{}, normalized to {}x{}",
        bounds.x, bounds.y, bounds.width, bounds.height, width, height
    );
    Some(crop_rect(&scaled, &PixelRect::new(0, 0, width, height)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn screenshot_with_rect(w: u32, h: u32, rect: PixelRect) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            if x >= rect.x && x < rect.right() && y >= rect.y && y < rect.bottom() {
                Rgb([240, 240, 240])
            } else {
                Rgb([20, 20, 20])
            }
        })
    }

    #[test]
    fn test_no_white_region() {
        let img = RgbImage::from_pixel(800, 600, Rgb([30, 30, 30]));
        assert!(locate_popup(&img, &VisionConfig::default()).is_none());
    }

    #[test]
    fn test_popup_is_rescaled_and_trimmed() {
        let img = screenshot_with_rect(1000, 700, PixelRect::new(200, 100, 600, 450));
        let popup = locate_popup(&img, &VisionConfig::default()).unwrap();
        assert_eq!(popup.dimensions(), (1180, 900));
        assert_eq!(popup.get_pixel(600, 450), &Rgb([240, 240, 240]));
    }

    #[test]
    fn test_height_truncates_at_fractional_scale() {
        // 1200 * 400 / 700 = 685.7; the height is truncated, not rounded
        let img = screenshot_with_rect(1000, 700, PixelRect::new(100, 100, 700, 400));
        let popup = locate_popup(&img, &VisionConfig::default()).unwrap();
        assert_eq!(popup.dimensions(), (1180, 685));
    }

    #[test]
    fn test_popup_touching_left_edge() {
        let img = screenshot_with_rect(1000, 700, PixelRect::new(0, 0, 600, 450));
        let popup = locate_popup(&img, &VisionConfig::default()).unwrap();
        assert_eq!(popup.dimensions(), (1180, 900));
    }

    #[test]
    fn test_popup_filling_screenshot() {
        let img = RgbImage::from_pixel(1000, 700, Rgb([240, 240, 240]));
        let popup = locate_popup(&img, &VisionConfig::default()).unwrap();
        assert_eq!(popup.dimensions(), (1180, 840));
    }

    #[test]
    fn test_zero_area_region_not_selected() {
        let mut img = RgbImage::from_pixel(300, 200, Rgb([20, 20, 20]));
        for x in 10..200 {
            img.put_pixel(x, 50, Rgb([250, 250, 250]));
        }
        let config = VisionConfig {
            min_popup_area: 0.0,
            ..VisionConfig::default()
        };
        assert!(locate_popup(&img, &config).is_none());
    }

    #[test]
    fn test_small_region_rejected() {
        let img = screenshot_with_rect(1000, 700, PixelRect::new(300, 300, 100, 100));
        assert!(locate_popup(&img, &VisionConfig::default()).is_none());
    }

    #[test]
    fn test_largest_region_wins() {
        let mut img = screenshot_with_rect(1600, 1000, PixelRect::new(50, 50, 1200, 600));
        for y in 800..900 {
            for x in 1400..1500 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        // Marker inside the big popup survives unscaled
        img.put_pixel(60, 60, Rgb([250, 0, 0]));

        let popup = locate_popup(&img, &VisionConfig::default()).unwrap();
        assert_eq!(popup.dimensions(), (1180, 600));
        assert_eq!(popup.get_pixel(10, 10), &Rgb([250, 0, 0]));
    }

    #[test]
    fn test_input_is_not_modified() {
        let img = screenshot_with_rect(1000, 700, PixelRect::new(200, 100, 600, 450));
        let before = img.clone();
        let _ = locate_popup(&img, &VisionConfig::default());
        assert_eq!(img, before);
    }
}
