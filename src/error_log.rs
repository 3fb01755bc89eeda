use anyhow::{Context, Result};
use hoh_data::TroopType;
use image::GrayImage;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Human-readable log of entries that need manual review.
///
/// Shared by all workers; each append holds the lock for the whole line.
pub struct ErrorLog {
    dir: PathBuf,
    file: Mutex<File>,
}

impl ErrorLog {
    /// Open (or create) `dir/error.log` for appending.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join("error.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append one line for an entry.
    pub fn record(&self, id: &str, message: &str) {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(file, "{}: {}", id, message) {
            warn!("Failed to write error log: {}", e);
        }
    }

    /// Save the value crop that could not be read as `<id>-<troop>.png`.
    pub fn save_crop(&self, id: &str, troop: TroopType, crop: &GrayImage) {
        let path = self.dir.join(format!("{}-{}.png", id, troop.label()));
        if let Err(e) = crop.save(&path) {
            warn!("Failed to save {}: {}", path.display(), e);
        }
    }
}
