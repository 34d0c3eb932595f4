//! CSV export of logged snapshots.
//!
//! Flattens the snapshot log into one row per adapted step, written to a CSV
//! file that spreadsheet or history tools can consume. The log is the source
//! of truth and is left untouched, so every export rewrites the whole CSV.

use crate::wal::{read_snapshots, SnapshotRecord};
use crate::{AdaptedStep, Error, Result};
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    record_id: String,
    recorded_at: String,
    routine_id: String,
    date: String,
    active_tokens: String,
    step_id: String,
    product_category: String,
    time_of_day: String,
    should_show: bool,
    emphasis: String,
    display_order: i32,
    guidance_text: String,
    warnings: String,
    origin: String,
    rule_id: Option<String>,
}

impl CsvRow {
    fn new(record: &SnapshotRecord, step: &AdaptedStep) -> Self {
        let snapshot = &record.snapshot;
        CsvRow {
            record_id: record.id.to_string(),
            recorded_at: record.recorded_at.to_rfc3339(),
            routine_id: snapshot.routine_id.clone(),
            date: snapshot.date.to_string(),
            active_tokens: snapshot
                .active_tokens
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(";"),
            step_id: step.step_id.clone(),
            product_category: step.product_category.to_string(),
            time_of_day: step.time_of_day.to_string(),
            should_show: step.should_show,
            emphasis: step.emphasis.to_string(),
            display_order: step.display_order,
            guidance_text: step.guidance_text.clone(),
            warnings: step.warnings.join(" | "),
            origin: step.origin.to_string(),
            rule_id: step.rule_id.clone(),
        }
    }
}

/// Write every logged snapshot in `log_path` to `csv_path`
///
/// The CSV is replaced atomically, so exporting twice gives the same file.
/// Returns the number of rows written.
pub fn export_csv(log_path: &Path, csv_path: &Path) -> Result<usize> {
    let records = read_snapshots(log_path)?;

    if records.is_empty() {
        tracing::info!("No snapshots in {:?} to export", log_path);
        return Ok(0);
    }

    let parent = match csv_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    let mut writer = csv::Writer::from_writer(temp.as_file());

    let mut rows = 0;
    for record in &records {
        for step in record.snapshot.adapted_steps() {
            writer.serialize(CsvRow::new(record, step))?;
            rows += 1;
        }
    }

    writer.flush()?;
    drop(writer);
    temp.as_file().sync_all()?;
    temp.persist(csv_path).map_err(|e| Error::Io(e.error))?;

    tracing::info!(
        "Exported {} rows from {} snapshots to {:?}",
        rows,
        records.len(),
        csv_path
    );
    Ok(rows)
}
