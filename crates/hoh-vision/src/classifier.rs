use hoh_data::TroopType;
use image::RgbImage;
use tracing::debug;

use crate::config::VisionConfig;
use crate::features::DescriptorSet;
use crate::matcher::count_good_matches;
use crate::reference::ReferenceLibrary;
use crate::segment::{mask_coverage, region_mask, segment_icons, IconRegion};

/// Outcome of classifying one icon region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub troop_type: Option<TroopType>,
    /// Good matches of the winning reference (0 when unclassified)
    pub matches: usize,
}

impl Classification {
    pub fn unclassified() -> Self {
        Self {
            troop_type: None,
            matches: 0,
        }
    }

    pub fn is_classified(&self) -> bool {
        self.troop_type.is_some()
    }
}

/// An icon region together with the type assigned to it
#[derive(Debug, Clone)]
pub struct ClassifiedIcon {
    pub region: IconRegion,
    pub classification: Classification,
}

/// Pick the reference that best matches a region's descriptors.
///
/// Types in `assigned` are skipped. Every reference icon of every remaining
/// type is matched against the region; one with at least `min_matches` good
/// matches is a candidate, and the candidate with the strictly greatest
/// count wins (earliest in library order on ties).
pub fn classify_descriptors(
    region: &DescriptorSet,
    library: &ReferenceLibrary,
    assigned: &[TroopType],
    config: &VisionConfig,
) -> Classification {
    let mut best = Classification::unclassified();
    if region.len() < 2 {
        return best;
    }

    for (troop, icons) in library.iter() {
        if assigned.contains(&troop) {
            continue;
        }
        for icon in icons {
            let matches = count_good_matches(
                icon.descriptors.descriptors(),
                region.descriptors(),
                config.match_ratio,
            );
            if matches >= config.min_matches && matches > best.matches {
                best = Classification {
                    troop_type: Some(troop),
                    matches,
                };
            }
        }
    }

    best
}

/// Classify one region of a normalized popup, describing only the pixels inside it.
pub fn classify_region(
    popup: &RgbImage,
    region: &IconRegion,
    library: &ReferenceLibrary,
    assigned: &[TroopType],
    config: &VisionConfig,
) -> Classification {
    let mask = region_mask(popup.width(), popup.height(), region);
    let descriptors = DescriptorSet::detect(popup, Some(&mask), config);
    let classification = classify_descriptors(&descriptors, library, assigned, config);

    debug!(
        "Region at ({}, {}): mask {:.2}%, {} descriptors -> {:?} ({} matches)",
        region.bounds.x,
        region.bounds.y,
        mask_coverage(&mask) * 100.0,
        descriptors.len(),
        classification.troop_type,
        classification.matches
    );
    classification
}

/// Segment a normalized popup and classify its icons in reading order.
///
/// Each troop type is assigned to at most one region: once a region takes a
/// type, later regions only compete for the remaining types. Unclassified
/// regions are returned too, with no type.
pub fn classify_icons(
    popup: &RgbImage,
    library: &ReferenceLibrary,
    config: &VisionConfig,
) -> Vec<ClassifiedIcon> {
    let regions = segment_icons(popup, config);
    let mut assigned: Vec<TroopType> = Vec::with_capacity(TroopType::COUNT);
    let mut icons = Vec::with_capacity(regions.len());

    for region in regions {
        let classification = classify_region(popup, &region, library, &assigned, config);
        if let Some(troop) = classification.troop_type {
            assigned.push(troop);
        }
        icons.push(ClassifiedIcon {
            region,
            classification,
        });
    }

    icons
}
