//! Append-only food intake log.
//!
//! Entries are appended to a JSONL (JSON Lines) file under an exclusive lock.
//! Malformed lines are skipped on read. Nothing is ever rewritten: undoing an
//! entry appends a reversal marker, and every per-day view drops both the
//! marker and the entry it cancels.

use crate::composer::{KCAL_PER_G_CARB, KCAL_PER_G_FAT, KCAL_PER_G_PROTEIN};
use crate::types::{IntakeEntry, IntakeTotals};
use crate::{exercise, guard, jsonl, Result};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Logged kcal and macro-derived kcal may differ by this much before the
/// entry is flagged
pub const KCAL_MISMATCH_TOLERANCE: f64 = 80.0;

/// Intake sink trait for persisting meal entries
pub trait IntakeSink {
    fn append(&mut self, entry: &IntakeEntry) -> Result<()>;
}

/// JSONL-based intake log with file locking
pub struct JsonlIntakeLog {
    path: PathBuf,
}

impl JsonlIntakeLog {
    pub const FILE_NAME: &'static str = "intake.jsonl";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log at `<data_dir>/intake.jsonl`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cancel the most recent live entry for `date`.
    ///
    /// Returns the cancelled entry, or `None` when the day has nothing left
    /// to undo.
    pub fn undo_last(&mut self, date: NaiveDate) -> Result<Option<IntakeEntry>> {
        let entries = read_entries(&self.path)?;
        let last = match entries_for_date(&entries, date).last() {
            Some(entry) => (*entry).clone(),
            None => {
                tracing::info!("Nothing to undo for {}", date);
                return Ok(None);
            }
        };

        self.append(&IntakeEntry::reversal_of(&last))?;
        tracing::info!("Reversed intake {} ({}) for {}", last.id, last.meal_tag, date);
        Ok(Some(last))
    }
}

impl IntakeSink for JsonlIntakeLog {
    fn append(&mut self, entry: &IntakeEntry) -> Result<()> {
        jsonl::append(&self.path, entry)?;
        tracing::debug!("Appended intake {} ({}) for {}", entry.id, entry.meal_tag, entry.date);
        Ok(())
    }
}

/// Read all entries from an intake log, in file order, markers included
pub fn read_entries(path: &Path) -> Result<Vec<IntakeEntry>> {
    jsonl::read_all(path, "intake")
}

/// Entries still in effect: reversal markers and the entries they cancel are
/// dropped
pub fn live_entries(entries: &[IntakeEntry]) -> Vec<&IntakeEntry> {
    let reversed: HashSet<Uuid> = entries.iter().filter_map(|e| e.reverses).collect();
    entries
        .iter()
        .filter(|e| !e.is_reversal() && !reversed.contains(&e.id))
        .collect()
}

/// Live entries logged for `date`, oldest first
pub fn entries_for_date(entries: &[IntakeEntry], date: NaiveDate) -> Vec<&IntakeEntry> {
    let mut day: Vec<&IntakeEntry> = live_entries(entries)
        .into_iter()
        .filter(|e| e.date == date)
        .collect();
    day.sort_by_key(|e| e.logged_at);
    day
}

/// Summed kcal and macros of the live entries for `date`; zero when nothing
/// was logged
pub fn sums_for_date(entries: &[IntakeEntry], date: NaiveDate) -> IntakeTotals {
    live_entries(entries)
        .into_iter()
        .filter(|e| e.date == date)
        .fold(IntakeTotals::default(), |acc, e| IntakeTotals {
            kcal: acc.kcal + e.kcal,
            protein_g: acc.protein_g + e.protein_g,
            fat_g: acc.fat_g + e.fat_g,
            carb_g: acc.carb_g + e.carb_g,
        })
}

/// Target minus intake, floored at zero per field
pub fn remaining(target: IntakeTotals, eaten: IntakeTotals) -> IntakeTotals {
    IntakeTotals {
        kcal: (target.kcal - eaten.kcal).max(0.0),
        protein_g: (target.protein_g - eaten.protein_g).max(0.0),
        fat_g: (target.fat_g - eaten.fat_g).max(0.0),
        carb_g: (target.carb_g - eaten.carb_g).max(0.0),
    }
}

/// Fill in kcal from the macros when it was left at zero, and flag entries
/// whose kcal disagrees with their macros. The logged kcal always wins.
pub fn reconcile_kcal(mut entry: IntakeEntry) -> IntakeEntry {
    let from_macros = entry.protein_g * KCAL_PER_G_PROTEIN
        + entry.fat_g * KCAL_PER_G_FAT
        + entry.carb_g * KCAL_PER_G_CARB;

    if entry.kcal <= 0.0 && from_macros > 0.0 {
        entry.kcal = from_macros;
    } else if from_macros > 0.0 && (entry.kcal - from_macros).abs() > KCAL_MISMATCH_TOLERANCE {
        let flag = format!("kcal differs from macros ({:.0}), kept kcal", from_macros);
        entry.note = if entry.note.trim().is_empty() {
            flag
        } else {
            format!("{} | {}", entry.note.trim(), flag)
        };
    }
    entry
}

/// Rough energy availability for an intake day: the exercise cost comes from
/// the day's logged load index instead of individual activity blocks.
pub fn estimated_day_ea(intake_kcal: f64, load_index: f64, weight_kg: f64, ffm: f64) -> f64 {
    guard::energy_availability(intake_kcal, exercise::kcal_from_load(load_index, weight_kg), ffm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::fs::OpenOptions;
    use std::io::Write;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
    }

    fn entry(d: u32, meal: &str, kcal: f64) -> IntakeEntry {
        IntakeEntry {
            id: Uuid::new_v4(),
            logged_at: Utc::now(),
            date: date(d),
            meal_tag: meal.into(),
            kcal,
            protein_g: 30.0,
            fat_g: 10.0,
            carb_g: 50.0,
            note: String::new(),
            reverses: None,
        }
    }

    #[test]
    fn test_append_and_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut log = JsonlIntakeLog::in_dir(temp_dir.path());

        let first = entry(1, "breakfast", 450.0);
        let id = first.id;
        log.append(&first).unwrap();
        log.append(&entry(1, "lunch", 700.0)).unwrap();
        log.append(&entry(2, "dinner", 800.0)).unwrap();

        let entries = read_entries(log.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, id);
    }

    #[test]
    fn test_sums_for_date() {
        let entries = vec![
            entry(1, "breakfast", 450.0),
            entry(1, "lunch", 700.0),
            entry(2, "dinner", 800.0),
        ];
        let sums = sums_for_date(&entries, date(1));
        assert_eq!(sums.kcal, 1150.0);
        assert_eq!(sums.protein_g, 60.0);
        assert_eq!(sums_for_date(&entries, date(3)), IntakeTotals::default());
    }

    #[test]
    fn test_entries_for_date_sorted_by_time() {
        let mut late = entry(1, "dinner", 800.0);
        late.logged_at = Utc::now() + Duration::hours(2);
        let entries = vec![late, entry(1, "breakfast", 450.0), entry(2, "lunch", 500.0)];

        let day = entries_for_date(&entries, date(1));
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].meal_tag, "breakfast");
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut log = JsonlIntakeLog::in_dir(temp_dir.path());
        log.append(&entry(1, "snack", 200.0)).unwrap();

        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        writeln!(file, "{{ garbage").unwrap();
        writeln!(file).unwrap();
        log.append(&entry(1, "snack", 150.0)).unwrap();

        let entries = read_entries(log.path()).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_read_missing_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        let entries = read_entries(&temp_dir.path().join("none.jsonl")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_undo_last_reverses_latest_entry() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut log = JsonlIntakeLog::in_dir(temp_dir.path());

        let mut breakfast = entry(1, "breakfast", 450.0);
        breakfast.logged_at = Utc::now() - Duration::hours(3);
        log.append(&breakfast).unwrap();
        log.append(&entry(1, "lunch", 700.0)).unwrap();
        log.append(&entry(2, "dinner", 800.0)).unwrap();

        let undone = log.undo_last(date(1)).unwrap().unwrap();
        assert_eq!(undone.meal_tag, "lunch");

        let entries = read_entries(log.path()).unwrap();
        // Append-only: the marker is a fourth line
        assert_eq!(entries.len(), 4);
        assert_eq!(sums_for_date(&entries, date(1)).kcal, 450.0);
        assert_eq!(sums_for_date(&entries, date(2)).kcal, 800.0);
        let day = entries_for_date(&entries, date(1));
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].meal_tag, "breakfast");

        // Second undo takes breakfast, the third finds nothing
        assert_eq!(log.undo_last(date(1)).unwrap().unwrap().meal_tag, "breakfast");
        assert!(log.undo_last(date(1)).unwrap().is_none());
        let entries = read_entries(log.path()).unwrap();
        assert_eq!(sums_for_date(&entries, date(1)), IntakeTotals::default());
    }

    #[test]
    fn test_remaining_floors_at_zero() {
        let target = IntakeTotals {
            kcal: 2000.0,
            protein_g: 170.0,
            fat_g: 60.0,
            carb_g: 200.0,
        };
        let eaten = IntakeTotals {
            kcal: 2300.0,
            protein_g: 100.0,
            fat_g: 80.0,
            carb_g: 150.0,
        };
        let left = remaining(target, eaten);
        assert_eq!(left.kcal, 0.0);
        assert_eq!(left.protein_g, 70.0);
        assert_eq!(left.fat_g, 0.0);
        assert_eq!(left.carb_g, 50.0);
    }

    #[test]
    fn test_reconcile_kcal() {
        let mut from_macros = entry(1, "snack", 0.0);
        from_macros.protein_g = 20.0;
        from_macros.fat_g = 10.0;
        from_macros.carb_g = 30.0;
        assert_eq!(reconcile_kcal(from_macros).kcal, 290.0);

        // 30/10/50 g is 410 kcal: within tolerance of 450
        let close = reconcile_kcal(entry(1, "breakfast", 450.0));
        assert_eq!(close.kcal, 450.0);
        assert!(close.note.is_empty());

        let far = reconcile_kcal(entry(1, "lunch", 700.0));
        assert_eq!(far.kcal, 700.0);
        assert!(far.note.contains("kcal differs from macros (410)"));

        let mut bare = entry(1, "coffee", 0.0);
        bare.protein_g = 0.0;
        bare.fat_g = 0.0;
        bare.carb_g = 0.0;
        assert_eq!(reconcile_kcal(bare).kcal, 0.0);
    }

    #[test]
    fn test_estimated_day_ea() {
        // Load 360 MET·min at 88 kg is 554.4 kcal of exercise
        let ea = estimated_day_ea(2000.0, 360.0, 88.0, 67.032);
        assert!((ea - (2000.0 - 554.4) / 67.032).abs() < 1e-9);
        assert!((estimated_day_ea(1340.64, 0.0, 88.0, 67.032) - 20.0).abs() < 1e-9);
    }
}
