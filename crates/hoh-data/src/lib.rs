use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Border added around every reference icon so keypoints near its edges survive.
pub const DEFAULT_TEMPLATE_BORDER: u32 = 50;

/// Troop categories the hall-of-honor popup can report losses for.
///
/// The declaration order is the library iteration order and the column order
/// of the exported table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TroopType {
    #[serde(rename = "T5 Inf")]
    T5Infantry,
    #[serde(rename = "T5 Cav")]
    T5Cavalry,
    #[serde(rename = "T5 Arch")]
    T5Archer,
    #[serde(rename = "T5 Siege")]
    T5Siege,
    #[serde(rename = "T4 Inf")]
    T4Infantry,
    #[serde(rename = "T4 Cav")]
    T4Cavalry,
    #[serde(rename = "T4 Arch")]
    T4Archer,
    #[serde(rename = "T4 Siege")]
    T4Siege,
}

impl TroopType {
    pub const COUNT: usize = 8;

    pub const ALL: [TroopType; Self::COUNT] = [
        TroopType::T5Infantry,
        TroopType::T5Cavalry,
        TroopType::T5Archer,
        TroopType::T5Siege,
        TroopType::T4Infantry,
        TroopType::T4Cavalry,
        TroopType::T4Archer,
        TroopType::T4Siege,
    ];

    /// Display label, also used as the template directory name.
    pub fn label(self) -> &'static str {
        match self {
            TroopType::T5Infantry => "T5 Inf",
            TroopType::T5Cavalry => "T5 Cav",
            TroopType::T5Archer => "T5 Arch",
            TroopType::T5Siege => "T5 Siege",
            TroopType::T4Infantry => "T4 Inf",
            TroopType::T4Cavalry => "T4 Cav",
            TroopType::T4Archer => "T4 Arch",
            TroopType::T4Siege => "T4 Siege",
        }
    }

    /// Position in [`TroopType::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

impl fmt::Display for TroopType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single reference icon, already padded.
#[derive(Debug, Clone)]
pub struct TemplateIcon {
    pub name: String,
    pub image: RgbImage,
}

/// Reference icon images grouped by troop type, in [`TroopType::ALL`] order.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    icons: Vec<(TroopType, Vec<TemplateIcon>)>,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self {
            icons: TroopType::ALL.into_iter().map(|t| (t, Vec::new())).collect(),
        }
    }
}

impl TemplateSet {
    /// Load templates from a directory-per-label layout:
    ///   - dir/T5 Inf/*.png
    ///   - dir/T4 Cav/*.jpg
    ///   - ...
    ///
    /// Hidden files are ignored and files are read in name order. Every icon
    /// gets a constant black border of `border` pixels on each side.
    pub fn load(dir: &Path, border: u32) -> Result<Self> {
        let mut set = Self::default();

        for troop in TroopType::ALL {
            let type_dir = dir.join(troop.label());
            if !type_dir.is_dir() {
                warn!(
                    "No template directory for {}: {}",
                    troop,
                    type_dir.display()
                );
                continue;
            }

            for path in list_template_files(&type_dir)? {
                match load_icon(&path, border) {
                    Ok(icon) => {
                        debug!("Loaded template {}/{}", troop, icon.name);
                        set.push(troop, icon);
                    }
                    Err(e) => warn!("Failed to load template {}: {:#}", path.display(), e),
                }
            }
        }

        info!(
            "Loaded {} reference icons from {}",
            set.len(),
            dir.display()
        );

        Ok(set)
    }

    /// Add an already padded icon.
    pub fn push(&mut self, troop: TroopType, icon: TemplateIcon) {
        self.icons[troop.index()].1.push(icon);
    }

    pub fn icons(&self, troop: TroopType) -> &[TemplateIcon] {
        &self.icons[troop.index()].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (TroopType, &[TemplateIcon])> {
        self.icons.iter().map(|(t, icons)| (*t, icons.as_slice()))
    }

    /// Total number of icons across all troop types
    pub fn len(&self) -> usize {
        self.icons.iter().map(|(_, icons)| icons.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn list_template_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && !is_hidden(path))
        .collect();
    paths.sort();
    Ok(paths)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('.'))
}

fn load_icon(path: &Path, border: u32) -> Result<TemplateIcon> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .to_rgb8();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(TemplateIcon {
        name,
        image: pad_with_border(&img, border),
    })
}

/// Surround `img` with a constant black border of `border` pixels.
pub fn pad_with_border(img: &RgbImage, border: u32) -> RgbImage {
    let mut padded = RgbImage::from_pixel(
        img.width() + border * 2,
        img.height() + border * 2,
        Rgb([0, 0, 0]),
    );
    image::imageops::replace(&mut padded, img, border as i64, border as i64);
    padded
}
