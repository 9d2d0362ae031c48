//! Date-keyed persistence for daily metrics and targets.
//!
//! [`JsonStore`] keeps both tables in one JSON document. Reads take a shared
//! lock; writes go through a locked temp file that is renamed over the
//! original, so readers never see a half-written document. Read-modify-write
//! cycles are serialized through a sidecar lock file.

use crate::types::{DailyMetrics, DailyTargets};
use crate::{Error, Result};
use chrono::{NaiveDate, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Persistence collaborator for the planner's inputs and outputs
pub trait DailyStore {
    /// Insert or replace the metrics record for its date
    fn upsert_metrics(&mut self, metrics: DailyMetrics) -> Result<()>;

    /// Insert or replace the targets record for its date
    fn upsert_targets(&mut self, targets: DailyTargets) -> Result<()>;

    /// All metrics records, ascending by date
    fn history(&self) -> Result<Vec<DailyMetrics>>;

    /// Targets with `from <= date <= to`, ascending by date
    fn targets_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyTargets>>;

    fn targets_for(&self, date: NaiveDate) -> Result<Option<DailyTargets>> {
        Ok(self.targets_between(date, date)?.into_iter().next())
    }
}

/// On-disk document
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreDocument {
    #[serde(default)]
    pub metrics: BTreeMap<NaiveDate, DailyMetrics>,
    #[serde(default)]
    pub targets: BTreeMap<NaiveDate, DailyTargets>,
}

impl StoreDocument {
    /// Load the document with a shared lock.
    ///
    /// A missing or empty file is an empty store. A file that does not parse
    /// is moved aside to `<name>.corrupt-<timestamp>` before starting empty,
    /// so the next save never overwrites the only copy of the history.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No store file at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = Vec::new();
        let read = std::io::BufReader::new(&file).read_to_end(&mut contents);
        file.unlock()?;
        read?;

        if contents.iter().all(u8::is_ascii_whitespace) {
            tracing::info!("Store {:?} is empty", path);
            return Ok(Self::default());
        }

        match serde_json::from_slice::<StoreDocument>(&contents) {
            Ok(doc) => {
                tracing::debug!(
                    "Loaded store from {:?}: {} metrics, {} targets",
                    path,
                    doc.metrics.len(),
                    doc.targets.len()
                );
                Ok(doc)
            }
            Err(e) => {
                let backup = quarantine(path)?;
                tracing::warn!(
                    "Failed to parse store {:?}: {}. Moved it to {:?}, starting empty.",
                    path,
                    e,
                    backup
                );
                Ok(Self::default())
            }
        }
    }

    /// Atomically replace the document on disk
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Store(format!("store path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved store to {:?}", path);
        Ok(())
    }

    /// Load, modify and save back.
    ///
    /// The whole cycle runs under an exclusive lock on `<name>.lock`, so
    /// concurrent updates are serialized instead of losing writes.
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut StoreDocument),
    {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(sidecar_path(path, ".lock"))?;
        lock.lock_exclusive()?;

        let result = Self::load(path).and_then(|mut doc| {
            f(&mut doc);
            doc.save(path).map(|()| doc)
        });

        let _ = lock.unlock();
        result
    }
}

/// `path` with `suffix` appended to its file name
fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Move an unparseable store out of the way, keeping its bytes
fn quarantine(path: &Path) -> Result<PathBuf> {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let backup = sidecar_path(path, &format!(".corrupt-{}", stamp));
    match std::fs::rename(path, &backup) {
        Ok(()) => Ok(backup),
        // Another reader moved it first
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(backup),
        Err(e) => Err(Error::Store(format!(
            "store {:?} is corrupt and could not be moved aside: {}",
            path, e
        ))),
    }
}

/// Single-file JSON implementation of [`DailyStore`]
#[derive(Clone, Debug)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub const FILE_NAME: &'static str = "store.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/store.json`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DailyStore for JsonStore {
    fn upsert_metrics(&mut self, metrics: DailyMetrics) -> Result<()> {
        let date = metrics.date;
        StoreDocument::update(&self.path, |doc| {
            doc.metrics.insert(date, metrics);
        })?;
        tracing::debug!("Upserted metrics for {}", date);
        Ok(())
    }

    fn upsert_targets(&mut self, targets: DailyTargets) -> Result<()> {
        let date = targets.date;
        StoreDocument::update(&self.path, |doc| {
            doc.targets.insert(date, targets);
        })?;
        tracing::debug!("Upserted targets for {}", date);
        Ok(())
    }

    fn history(&self) -> Result<Vec<DailyMetrics>> {
        Ok(StoreDocument::load(&self.path)?.metrics.into_values().collect())
    }

    fn targets_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyTargets>> {
        if from > to {
            return Ok(Vec::new());
        }
        let doc = StoreDocument::load(&self.path)?;
        Ok(doc.targets.range(from..=to).map(|(_, t)| t.clone()).collect())
    }
}

impl JsonStore {
    /// Upsert a batch of targets with one load/save cycle
    pub fn upsert_targets_batch(&mut self, batch: Vec<DailyTargets>) -> Result<usize> {
        let count = batch.len();
        StoreDocument::update(&self.path, |doc| {
            for targets in batch {
                doc.targets.insert(targets.date, targets);
            }
        })?;
        tracing::info!("Upserted {} target records", count);
        Ok(count)
    }
}
