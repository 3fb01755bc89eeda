use anyhow::{Context, Result};
use hoh_data::TroopType;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info};

/// Loss counts for one entry, one per troop type (0 when not reported)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TroopCounts([u64; TroopType::COUNT]);

impl TroopCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, troop: TroopType) -> u64 {
        self.0[troop.index()]
    }

    pub fn set(&mut self, troop: TroopType, count: u64) {
        self.0[troop.index()] = count;
    }

    /// Counts in `TroopType::ALL` order
    pub fn iter(&self) -> impl Iterator<Item = (TroopType, u64)> + '_ {
        TroopType::ALL.iter().map(|&t| (t, self.get(t)))
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

/// How far processing of an entry got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Popup located and icons classified
    Processed,
    /// Screenshot decoded but no popup found; counts are all zero
    PopupNotFound,
}

/// An entry to process: its id and 1-based position in the entry list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryId {
    pub rank: usize,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryResult {
    pub rank: usize,
    pub id: String,
    pub dead: TroopCounts,
    pub status: EntryStatus,
}

impl EntryResult {
    pub fn new(entry: &EntryId, status: EntryStatus) -> Self {
        Self {
            rank: entry.rank,
            id: entry.id.clone(),
            dead: TroopCounts::new(),
            status,
        }
    }

    /// `id` followed by the counts, tab separated
    pub fn to_row(&self) -> String {
        let mut row = self.id.clone();
        for (_, count) in self.dead.iter() {
            let _ = write!(row, "\t{}", count);
        }
        row
    }
}

/// Read entry ids from a tab-separated file: first column is the id, rows are ranks.
/// Blank lines are skipped without consuming a rank.
pub fn read_entry_ids(path: &Path) -> Result<Vec<EntryId>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let entries: Vec<EntryId> = text
        .lines()
        .filter_map(|line| line.split('\t').next())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .enumerate()
        .map(|(i, id)| EntryId {
            rank: i + 1,
            id: id.to_string(),
        })
        .collect();

    info!("Read {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Header row of the result table: `ID` then every troop label
pub fn table_header() -> String {
    let mut header = String::from("ID");
    for troop in TroopType::ALL {
        header.push('\t');
        header.push_str(troop.label());
    }
    header
}

/// Write results as a tab-separated table in the given order.
pub fn write_table(path: &Path, results: &[EntryResult]) -> Result<()> {
    let mut out = table_header();
    out.push('\n');
    for result in results {
        out.push_str(&result.to_row());
        out.push('\n');
    }

    std::fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote {} rows to {}", results.len(), path.display());
    Ok(())
}
