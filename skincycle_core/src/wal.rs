//! Append-only snapshot log.
//!
//! Each assembled snapshot can be appended to a JSONL (JSON Lines) file so
//! external history tools can see what the user was shown on a given day.
//! Appends take an exclusive file lock; reads take a shared one.

use crate::{Result, RoutineSnapshot};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One logged snapshot
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub snapshot: RoutineSnapshot,
}

impl SnapshotRecord {
    pub fn new(snapshot: RoutineSnapshot, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at,
            snapshot,
        }
    }
}

/// Destination for logged snapshots
pub trait SnapshotSink {
    fn append(&mut self, record: &SnapshotRecord) -> Result<()>;
}

/// JSONL-based snapshot sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl SnapshotSink for JsonlSink {
    fn append(&mut self, record: &SnapshotRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!(
            "Logged snapshot {} for '{}' on {}",
            record.id,
            record.snapshot.routine_id,
            record.snapshot.date
        );
        Ok(())
    }
}

/// Read all snapshot records from a log file
///
/// Lines that don't parse are skipped with a warning.
pub fn read_snapshots(path: &Path) -> Result<Vec<SnapshotRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SnapshotRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse snapshot at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} snapshots from {:?}", records.len(), path);
    Ok(records)
}
