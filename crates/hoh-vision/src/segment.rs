use hoh_capture::PixelRect;
use image::{GrayImage, Luma, RgbImage};
use imageproc::point::Point;
use tracing::debug;

use crate::config::VisionConfig;
use crate::mask::{bounding_rect, color_range_mask, contour_area, external_contours, fill_contour};

/// A candidate troop icon inside a normalized popup
#[derive(Debug, Clone, PartialEq)]
pub struct IconRegion {
    pub contour: Vec<Point<i32>>,
    pub bounds: PixelRect,
    pub area: f64,
}

impl IconRegion {
    /// Reading-order key: rows of `row_band` pixels top to bottom, left to right within a row.
    fn reading_order(&self, row_band: u32, popup_width: u32) -> u64 {
        let band = (self.bounds.y / row_band.max(1)) as u64;
        self.bounds.x as u64 + band * row_band as u64 * popup_width as u64
    }
}

/// Split a normalized popup into icon regions in reading order.
///
/// Icons are the non-white blobs of the popup whose area exceeds
/// `min_icon_area`. Blobs inside other blobs are ignored.
pub fn segment_icons(popup: &RgbImage, config: &VisionConfig) -> Vec<IconRegion> {
    let mut mask = color_range_mask(popup, config.white_low, config.white_high);
    image::imageops::invert(&mut mask);

    let mut regions: Vec<IconRegion> = external_contours(&mask)
        .into_iter()
        .filter_map(|contour| {
            let area = contour_area(&contour);
            if area <= config.min_icon_area {
                return None;
            }
            let bounds = bounding_rect(&contour);
            Some(IconRegion {
                contour,
                bounds,
                area,
            })
        })
        .collect();

    let popup_width = popup.width();
    regions.sort_by_key(|r| r.reading_order(config.row_band, popup_width));

    debug!("Segmented {} icon regions", regions.len());
    regions
}

/// Mask of the popup's size selecting the region (255 inside, 0 outside).
pub fn region_mask(width: u32, height: u32, region: &IconRegion) -> GrayImage {
    fill_contour(width, height, &region.contour)
}

/// Share of the mask that is set, for logging.
pub fn mask_coverage(mask: &GrayImage) -> f64 {
    let total = mask.width() as u64 * mask.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let set = mask.pixels().filter(|p| **p != Luma([0])).count() as u64;
    set as f64 / total as f64
}
