use anyhow::{Context, Result};
use hoh_capture::{find_screenshot, load_screenshot};
use hoh_state::{EntryId, EntryResult, EntryStatus};
use hoh_vision::{analyze_screenshot, prepare_value_crop, DigitReader, ReferenceLibrary};
use std::path::PathBuf;
use std::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::error_log::ErrorLog;

/// Manages the screenshot → popup → icons → counts pipeline for one scan directory.
///
/// Everything here is read-only once built, so one pipeline serves all workers.
pub struct Pipeline {
    library: ReferenceLibrary,
    reader: DigitReader,
    config: ScanConfig,
    screenshots_dir: PathBuf,
    error_log: ErrorLog,
}

impl Pipeline {
    pub fn new(
        library: ReferenceLibrary,
        reader: DigitReader,
        config: ScanConfig,
        screenshots_dir: PathBuf,
        error_log: ErrorLog,
    ) -> Self {
        info!(
            "Pipeline ready: {} reference icons, OCR {}",
            library.icon_count(),
            if reader.is_available() {
                "enabled"
            } else {
                "disabled"
            }
        );
        Self {
            library,
            reader,
            config,
            screenshots_dir,
            error_log,
        }
    }

    /// Process one entry. Returns `None` when the entry has no usable screenshot.
    pub fn process_entry(&self, entry: &EntryId) -> Option<EntryResult> {
        let Some(path) = find_screenshot(&self.screenshots_dir, &entry.id) else {
            warn!("No screenshot for {}, skipping", entry.id);
            self.error_log.record(&entry.id, "screenshot not found");
            return None;
        };

        let screenshot = match load_screenshot(&path) {
            Ok(img) => img,
            Err(e) => {
                warn!("Skipping {}: {:#}", entry.id, e);
                self.error_log
                    .record(&entry.id, &format!("screenshot unreadable: {:#}", e));
                return None;
            }
        };

        let Some(analysis) = analyze_screenshot(&screenshot, &self.library, &self.config.vision)
        else {
            warn!("No popup found for {}", entry.id);
            self.error_log.record(&entry.id, "popup not found");
            return Some(EntryResult::new(entry, EntryStatus::PopupNotFound));
        };

        let mut result = EntryResult::new(entry, EntryStatus::Processed);
        for icon in &analysis.icons {
            let Some(troop) = icon.classification.troop_type else {
                debug!(
                    "{}: unclassified region at ({}, {})",
                    entry.id, icon.region.bounds.x, icon.region.bounds.y
                );
                continue;
            };

            let crop = prepare_value_crop(
                &analysis.popup,
                &icon.region.bounds,
                &self.config.value_crop,
            );
            match self.reader.read_count(&crop) {
                Some(count) => result.dead.set(troop, count),
                None => {
                    warn!("{}: unreadable {} count", entry.id, troop);
                    self.error_log
                        .record(&entry.id, &format!("{} count unreadable", troop));
                    self.error_log.save_crop(&entry.id, troop, &crop);
                }
            }
        }

        info!(
            "{} {}",
            result.id,
            result
                .dead
                .iter()
                .map(|(_, n)| n.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );
        Some(result)
    }

    /// Process every entry on a pool of `jobs` workers (0 = one per core).
    ///
    /// Results come back in completion order and are re-sorted by rank.
    /// Entries without a screenshot are left out.
    pub fn run_batch(&self, entries: &[EntryId], jobs: usize) -> Result<Vec<EntryResult>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|i| format!("hoh-worker-{}", i))
            .build()
            .context("Failed to build worker pool")?;
        info!(
            "Processing {} entries on {} workers",
            entries.len(),
            pool.current_num_threads()
        );

        let (tx, rx) = mpsc::channel();
        pool.scope(|s| {
            for entry in entries {
                let tx = tx.clone();
                s.spawn(move |_| {
                    let _ = tx.send(self.process_entry(entry));
                });
            }
        });
        drop(tx);

        let mut results: Vec<EntryResult> = rx.into_iter().flatten().collect();
        results.sort_by_key(|r| r.rank);
        info!(
            "Processed {} of {} entries",
            results.len(),
            entries.len()
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoh_data::TroopType;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    fn pipeline(dir: &Path) -> Pipeline {
        let screenshots = dir.join("hoh");
        std::fs::create_dir_all(&screenshots).unwrap();
        Pipeline::new(
            ReferenceLibrary::default(),
            DigitReader::new("0123456789,"),
            ScanConfig::default(),
            screenshots,
            ErrorLog::open(&dir.join("logs").join("hoh")).unwrap(),
        )
    }

    fn entry(rank: usize, id: &str) -> EntryId {
        EntryId {
            rank,
            id: id.to_string(),
        }
    }

    fn save_popup_screenshot(path: &Path) {
        let mut img = RgbImage::from_pixel(1400, 1100, Rgb([40, 40, 40]));
        for y in 100..1000 {
            for x in 100..1300 {
                img.put_pixel(x, y, Rgb([235, 235, 235]));
            }
        }
        img.save(path).unwrap();
    }

    #[test]
    fn test_missing_screenshot_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        assert!(p.process_entry(&entry(1, "404")).is_none());

        let log = std::fs::read_to_string(dir.path().join("logs/hoh/error.log")).unwrap();
        assert!(log.contains("404: screenshot not found"));
    }

    #[test]
    fn test_popup_not_found_gives_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        RgbImage::from_pixel(300, 200, Rgb([0, 0, 0]))
            .save(dir.path().join("hoh/5.png"))
            .unwrap();

        let result = p.process_entry(&entry(1, "5")).unwrap();
        assert_eq!(result.status, EntryStatus::PopupNotFound);
        assert_eq!(result.dead.total(), 0);
    }

    #[test]
    fn test_popup_without_icons() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        save_popup_screenshot(&dir.path().join("hoh/9.jpg"));

        let result = p.process_entry(&entry(1, "9")).unwrap();
        assert_eq!(result.status, EntryStatus::Processed);
        assert_eq!(result.dead.get(TroopType::T5Infantry), 0);
    }

    #[test]
    fn test_batch_sorted_by_rank() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        for id in ["a", "b", "c", "e"] {
            save_popup_screenshot(&dir.path().join(format!("hoh/{}.png", id)));
        }
        let entries = vec![
            entry(1, "a"),
            entry(2, "b"),
            entry(3, "c"),
            entry(4, "d"),
            entry(5, "e"),
        ];

        let results = p.run_batch(&entries, 3).unwrap();
        let ranks: Vec<usize> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 5]);
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "e"]);
    }
}
