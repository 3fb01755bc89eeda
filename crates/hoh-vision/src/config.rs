use serde::{Deserialize, Serialize};

/// Thresholds for popup location, icon segmentation and icon matching.
///
/// All pixel quantities are in canonical popup coordinates unless noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Inclusive lower bound of the near-white color range (per channel)
    pub white_low: [u8; 3],
    /// Inclusive upper bound of the near-white color range (per channel)
    pub white_high: [u8; 3],
    /// Width every located popup is rescaled to
    pub canonical_width: u32,
    /// Width of the popup after trimming the right edge
    pub popup_width: u32,
    /// Minimum popup contour area after rescaling to `canonical_width`
    pub min_popup_area: f64,
    /// Icon contours with an area at or below this are treated as noise
    pub min_icon_area: f64,
    /// Height of the horizontal bands used for reading order
    pub row_band: u32,
    /// FAST-9 intensity threshold
    pub fast_threshold: u8,
    /// Strongest keypoints kept per image
    pub max_keypoints: usize,
    /// Smoothing applied before sampling descriptors
    pub blur_sigma: f32,
    /// Nearest / second-nearest distance ratio for accepting a match
    pub match_ratio: f32,
    /// Accepted matches needed before a reference can win
    pub min_matches: usize,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            white_low: [200, 200, 200],
            white_high: [255, 255, 255],
            canonical_width: 1200,
            popup_width: 1180,
            min_popup_area: 150_000.0,
            min_icon_area: 6000.0,
            row_band: 100,
            fast_threshold: 20,
            max_keypoints: 500,
            blur_sigma: 2.0,
            match_ratio: 0.7,
            min_matches: 8,
        }
    }
}

/// Where the loss count sits relative to an icon, and how to clean it up for OCR.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueCrop {
    /// Left edge of the value, measured from the icon's left edge
    pub left: u32,
    /// Right edge of the value, measured from the icon's left edge
    pub right: u32,
    /// Pixels darker than this are cleared after enhancement
    pub threshold: u8,
    pub contrast: f32,
    pub brightness: f32,
    /// Characters Tesseract may emit
    pub whitelist: String,
}

impl Default for ValueCrop {
    fn default() -> Self {
        Self {
            left: 155,
            right: 350,
            threshold: 50,
            contrast: 1.2,
            brightness: 1.2,
            whitelist: "0123456789,".to_string(),
        }
    }
}
