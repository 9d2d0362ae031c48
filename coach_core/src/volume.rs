//! Per-muscle-group training volume.
//!
//! Sets are appended to a JSONL log like meals are, and summed over a
//! trailing window to check each group against a 10 to 20 sets per week
//! range.

use crate::types::VolumeEntry;
use crate::{jsonl, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Trailing window for the weekly report, ending on the report date
pub const VOLUME_WINDOW_DAYS: u32 = 7;

pub const MIN_WEEKLY_SETS: u32 = 10;
pub const MAX_WEEKLY_SETS: u32 = 20;

/// Volume sink trait for persisting set counts
pub trait VolumeSink {
    fn append(&mut self, entry: &VolumeEntry) -> Result<()>;
}

/// JSONL-based volume log with file locking
pub struct JsonlVolumeLog {
    path: PathBuf,
}

impl JsonlVolumeLog {
    pub const FILE_NAME: &'static str = "volume.jsonl";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log at `<data_dir>/volume.jsonl`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VolumeSink for JsonlVolumeLog {
    fn append(&mut self, entry: &VolumeEntry) -> Result<()> {
        jsonl::append(&self.path, entry)?;
        tracing::debug!(
            "Appended {} sets of {} for {}",
            entry.sets,
            entry.muscle_group,
            entry.date
        );
        Ok(())
    }
}

/// Read all volume entries, in file order
pub fn read_volume(path: &Path) -> Result<Vec<VolumeEntry>> {
    jsonl::read_all(path, "volume")
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VolumeAdvice {
    Increase,
    OnTrack,
    /// Cut back for a week if fatigue is high or sleep is poor
    Reduce,
}

impl VolumeAdvice {
    pub fn classify(weekly_sets: u32) -> Self {
        if weekly_sets < MIN_WEEKLY_SETS {
            VolumeAdvice::Increase
        } else if weekly_sets > MAX_WEEKLY_SETS {
            VolumeAdvice::Reduce
        } else {
            VolumeAdvice::OnTrack
        }
    }
}

impl fmt::Display for VolumeAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeAdvice::Increase => {
                write!(f, "under {} sets/week, consider adding", MIN_WEEKLY_SETS)
            }
            VolumeAdvice::OnTrack => write!(f, "on track"),
            VolumeAdvice::Reduce => write!(
                f,
                "over {} sets/week, deload if fatigue is high or sleep is poor",
                MAX_WEEKLY_SETS
            ),
        }
    }
}

/// One row of the weekly report
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GroupVolume {
    pub muscle_group: String,
    pub sets: u32,
    pub advice: VolumeAdvice,
}

/// Sets per muscle group over the `days` days ending on `end` (inclusive)
pub fn sets_by_group(
    entries: &[VolumeEntry],
    end: NaiveDate,
    days: u32,
) -> BTreeMap<String, u32> {
    let mut totals = BTreeMap::new();
    if days == 0 {
        return totals;
    }
    let start = end - Duration::days(i64::from(days) - 1);

    for entry in entries.iter().filter(|e| e.date >= start && e.date <= end) {
        *totals.entry(entry.muscle_group.clone()).or_insert(0u32) += entry.sets;
    }
    totals
}

/// Weekly totals with advice, sorted by muscle group
pub fn weekly_report(entries: &[VolumeEntry], end: NaiveDate) -> Vec<GroupVolume> {
    sets_by_group(entries, end, VOLUME_WINDOW_DAYS)
        .into_iter()
        .map(|(muscle_group, sets)| GroupVolume {
            muscle_group,
            sets,
            advice: VolumeAdvice::classify(sets),
        })
        .collect()
}
