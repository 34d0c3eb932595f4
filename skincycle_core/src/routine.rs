//! Base routine import.
//!
//! Routines come from the routine store either as JSON (a serialized
//! [`BaseRoutine`]) or as a CSV export with one row per step:
//!
//! ```text
//! id,product_category,time_of_day,order,description
//! am-cleanse,cleanser,morning,1,Gel cleanser
//! ```

use crate::{BaseRoutine, Error, Result, RoutineStep};
use std::collections::HashSet;
use std::path::Path;

/// Load a routine from `path`, choosing the format by extension
///
/// For CSV files the routine id and name are taken from the file stem.
pub fn load_routine(path: &Path) -> Result<BaseRoutine> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let routine = match extension.as_deref() {
        Some("json") => {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str::<BaseRoutine>(&contents)?
        }
        Some("csv") => {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("routine");
            load_routine_csv(path, stem, stem)?
        }
        _ => {
            return Err(Error::Routine(format!(
                "Unsupported routine file {:?} (expected .json or .csv)",
                path
            )))
        }
    };

    validate_routine(&routine)?;
    tracing::info!(
        "Loaded routine '{}' with {} steps from {:?}",
        routine.id,
        routine.steps.len(),
        path
    );
    Ok(routine)
}

/// Read routine steps from a CSV file with a header row
pub fn load_routine_csv(path: &Path, id: &str, name: &str) -> Result<BaseRoutine> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut steps = Vec::new();
    for (row, record) in reader.deserialize::<RoutineStep>().enumerate() {
        match record {
            Ok(step) => steps.push(step),
            Err(e) => {
                return Err(Error::Routine(format!(
                    "Invalid step on row {} of {:?}: {}",
                    row + 2,
                    path,
                    e
                )))
            }
        }
    }

    Ok(BaseRoutine {
        id: id.to_string(),
        name: name.to_string(),
        steps,
    })
}

/// Step ids must be present and unique
pub fn validate_routine(routine: &BaseRoutine) -> Result<()> {
    let mut seen = HashSet::new();
    for step in &routine.steps {
        if step.id.trim().is_empty() {
            return Err(Error::Routine(format!(
                "Routine '{}' has a step with empty ID",
                routine.id
            )));
        }
        if !seen.insert(step.id.as_str()) {
            return Err(Error::Routine(format!(
                "Routine '{}' has duplicate step ID '{}'",
                routine.id, step.id
            )));
        }
        if !step.product_category.is_known() {
            tracing::debug!(
                "Step '{}' uses category '{}' which no built-in rule targets",
                step.id,
                step.product_category
            );
        }
    }
    Ok(())
}
