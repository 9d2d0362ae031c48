//! Locked JSON Lines append and read, shared by the append-only logs.

use crate::Result;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Append one record as a line, under an exclusive lock
pub(crate) fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    file.lock_exclusive()?;

    let mut writer = std::io::BufWriter::new(&file);
    let line = serde_json::to_string(record)?;
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    drop(writer);

    file.unlock()?;
    Ok(())
}

/// Read every parseable record in file order.
///
/// A missing file is empty. Blank lines are ignored and malformed lines are
/// skipped with a warning naming `kind`.
pub(crate) fn read_all<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = match line_result {
            Ok(line) => line,
            Err(e) => {
                let _ = file.unlock();
                return Err(e.into());
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Skipping {} line {}: {}", kind, line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} {} records from {:?}", records.len(), kind, path);
    Ok(records)
}
