use image::{GrayImage, RgbImage};
use imageproc::corners::{corners_fast9, Corner};
use imageproc::filter::gaussian_blur_f32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::OnceLock;

use crate::config::VisionConfig;

pub const DESCRIPTOR_BYTES: usize = 32;
const DESCRIPTOR_BITS: usize = DESCRIPTOR_BYTES * 8;

/// Half-size of the square patch descriptor samples are drawn from
const PATCH_RADIUS: i32 = 15;
/// Keypoints closer than this to the image edge cannot be described
const EDGE_MARGIN: u32 = PATCH_RADIUS as u32 + 1;
/// Weaker corners within this Chebyshev distance of a kept corner are dropped
const SUPPRESSION_RADIUS: u32 = 3;
const PATTERN_SEED: u64 = 0x686f_685f_6272_6965;

/// 256-bit binary descriptor
pub type Descriptor = [u8; DESCRIPTOR_BYTES];

/// Offsets of the two pixels compared for one descriptor bit
type SamplePair = ((i32, i32), (i32, i32));

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

/// Keypoints of an image and their descriptors, index-aligned.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<Descriptor>,
}

impl DescriptorSet {
    /// Detect keypoints over the whole image and describe them.
    ///
    /// With a mask, keypoints on zero mask pixels are discarded; the
    /// descriptors themselves still sample the unmasked image.
    pub fn detect(image: &RgbImage, mask: Option<&GrayImage>, config: &VisionConfig) -> Self {
        let gray = image::imageops::grayscale(image);
        Self::detect_gray(&gray, mask, config)
    }

    pub fn detect_gray(
        gray: &GrayImage,
        mask: Option<&GrayImage>,
        config: &VisionConfig,
    ) -> Self {
        let (w, h) = gray.dimensions();
        if w <= EDGE_MARGIN * 2 || h <= EDGE_MARGIN * 2 {
            return Self::default();
        }

        let mut corners: Vec<Corner> = corners_fast9(gray, config.fast_threshold)
            .into_iter()
            .filter(|c| {
                c.x >= EDGE_MARGIN
                    && c.y >= EDGE_MARGIN
                    && c.x < w - EDGE_MARGIN
                    && c.y < h - EDGE_MARGIN
            })
            .filter(|c| {
                mask.map_or(true, |m| {
                    m.get_pixel_checked(c.x, c.y).map_or(false, |p| p[0] > 0)
                })
            })
            .collect();

        if corners.is_empty() {
            return Self::default();
        }

        corners.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.y.cmp(&b.y))
                .then(a.x.cmp(&b.x))
        });
        let keypoints = suppress_neighbours(&corners, w, h, config.max_keypoints);

        let smoothed = if config.blur_sigma > 0.0 {
            gaussian_blur_f32(gray, config.blur_sigma)
        } else {
            gray.clone()
        };
        let pattern = sampling_pattern();
        let descriptors = keypoints
            .iter()
            .map(|kp| describe(&smoothed, kp, pattern))
            .collect();

        Self {
            keypoints,
            descriptors,
        }
    }

    /// Build a set from precomputed descriptors (keypoint positions unknown).
    pub fn from_descriptors(descriptors: Vec<Descriptor>) -> Self {
        let keypoints = descriptors
            .iter()
            .map(|_| Keypoint {
                x: 0,
                y: 0,
                score: 0.0,
            })
            .collect();
        Self {
            keypoints,
            descriptors,
        }
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Greedy non-maximum suppression over corners sorted strongest first.
fn suppress_neighbours(
    sorted: &[Corner],
    width: u32,
    height: u32,
    limit: usize,
) -> Vec<Keypoint> {
    let mut taken = vec![false; (width * height) as usize];
    let mut kept = Vec::new();

    for corner in sorted {
        if kept.len() >= limit {
            break;
        }

        let x0 = corner.x.saturating_sub(SUPPRESSION_RADIUS);
        let y0 = corner.y.saturating_sub(SUPPRESSION_RADIUS);
        let x1 = (corner.x + SUPPRESSION_RADIUS).min(width - 1);
        let y1 = (corner.y + SUPPRESSION_RADIUS).min(height - 1);
        let crowded = (y0..=y1).any(|y| (x0..=x1).any(|x| taken[(y * width + x) as usize]));
        if crowded {
            continue;
        }

        taken[(corner.y * width + corner.x) as usize] = true;
        kept.push(Keypoint {
            x: corner.x,
            y: corner.y,
            score: corner.score,
        });
    }

    kept
}

fn describe(smoothed: &GrayImage, kp: &Keypoint, pattern: &[SamplePair]) -> Descriptor {
    let mut desc = [0u8; DESCRIPTOR_BYTES];
    for (i, &(a, b)) in pattern.iter().enumerate() {
        if sample(smoothed, kp, a) < sample(smoothed, kp, b) {
            desc[i / 8] |= 1 << (i % 8);
        }
    }
    desc
}

fn sample(img: &GrayImage, kp: &Keypoint, (dx, dy): (i32, i32)) -> u8 {
    let x = (kp.x as i32 + dx) as u32;
    let y = (kp.y as i32 + dy) as u32;
    img.get_pixel(x, y)[0]
}

/// Fixed pseudo-random pixel pairs, identical for every image in a run.
fn sampling_pattern() -> &'static [SamplePair] {
    static PATTERN: OnceLock<Vec<SamplePair>> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
        let mut offset = move || {
            (
                rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS),
                rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS),
            )
        };
        (0..DESCRIPTOR_BITS).map(|_| (offset(), offset())).collect()
    })
}
