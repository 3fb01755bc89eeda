pub mod classifier;
pub mod config;
pub mod digit_reader;
pub mod features;
pub mod mask;
pub mod matcher;
pub mod popup;
pub mod reference;
pub mod segment;

pub use classifier::{
    classify_descriptors, classify_icons, classify_region, ClassifiedIcon, Classification,
};
pub use config::{ValueCrop, VisionConfig};
pub use digit_reader::{prepare_value_crop, DigitReader};
pub use features::{Descriptor, DescriptorSet};
pub use popup::locate_popup;
pub use reference::{ReferenceIcon, ReferenceLibrary};
pub use segment::{region_mask, segment_icons, IconRegion};

use image::RgbImage;

/// A located popup and its classified icons
#[derive(Debug, Clone)]
pub struct PopupAnalysis {
    pub popup: RgbImage,
    pub icons: Vec<ClassifiedIcon>,
}

/// Run the full vision pipeline on one screenshot.
///
/// Returns `None` when no popup is found.
pub fn analyze_screenshot(
    screenshot: &RgbImage,
    library: &ReferenceLibrary,
    config: &VisionConfig,
) -> Option<PopupAnalysis> {
    let popup = locate_popup(screenshot, config)?;
    let icons = classify_icons(&popup, library, config);
    Some(PopupAnalysis { popup, icons })
}
