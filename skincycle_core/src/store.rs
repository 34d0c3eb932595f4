//! File-backed stores for engine inputs.
//!
//! The cycle profile, the latest weather reading and the routine override
//! attachments are kept as JSON files in the data directory. Reads take a
//! shared lock; writes go to a locked temp file that is renamed into place.
//!
//! Missing or unreadable files behave like "nothing stored": the engine then
//! simply runs without that context source.

use crate::context::{AttachmentSource, CycleProfileSource, WeatherSource};
use crate::{CycleProfile, Error, Result, RoutineAdaptationAttachment, WeatherReading};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const PROFILE_FILE: &str = "profile.json";
pub const WEATHER_FILE: &str = "weather.json";
pub const ATTACHMENTS_FILE: &str = "attachments.json";

/// JSON store rooted at a data directory
#[derive(Clone, Debug)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn profile_path(&self) -> PathBuf {
        self.dir.join(PROFILE_FILE)
    }

    pub fn weather_path(&self) -> PathBuf {
        self.dir.join(WEATHER_FILE)
    }

    pub fn attachments_path(&self) -> PathBuf {
        self.dir.join(ATTACHMENTS_FILE)
    }

    pub fn load_profile(&self) -> Result<Option<CycleProfile>> {
        read_json_locked(&self.profile_path())
    }

    /// Persist a profile after validating it
    pub fn save_profile(&self, profile: &CycleProfile) -> Result<()> {
        profile.validate()?;
        write_json_atomic(&self.profile_path(), profile)
    }

    pub fn load_weather(&self) -> Result<Option<WeatherReading>> {
        read_json_locked(&self.weather_path())
    }

    pub fn save_weather(&self, reading: &WeatherReading) -> Result<()> {
        write_json_atomic(&self.weather_path(), reading)
    }

    pub fn load_attachments(&self) -> Result<Vec<RoutineAdaptationAttachment>> {
        Ok(read_json_locked(&self.attachments_path())?.unwrap_or_default())
    }

    pub fn save_attachments(&self, attachments: &[RoutineAdaptationAttachment]) -> Result<()> {
        write_json_atomic(&self.attachments_path(), attachments)
    }

    /// Load attachments, modify them, and save them back
    pub fn update_attachments<F>(&self, f: F) -> Result<Vec<RoutineAdaptationAttachment>>
    where
        F: FnOnce(&mut Vec<RoutineAdaptationAttachment>) -> Result<()>,
    {
        let mut attachments = self.load_attachments()?;
        f(&mut attachments)?;
        self.save_attachments(&attachments)?;
        Ok(attachments)
    }
}

impl CycleProfileSource for ProfileStore {
    fn cycle_profile(&self) -> Option<CycleProfile> {
        self.load_profile().unwrap_or_else(|e| {
            tracing::warn!("Unable to load cycle profile: {}", e);
            None
        })
    }
}

impl WeatherSource for ProfileStore {
    fn latest_reading(&self) -> Option<WeatherReading> {
        self.load_weather().unwrap_or_else(|e| {
            tracing::warn!("Unable to load weather reading: {}", e);
            None
        })
    }
}

impl AttachmentSource for ProfileStore {
    fn attachments_for(&self, routine_id: &str) -> Vec<RoutineAdaptationAttachment> {
        match self.load_attachments() {
            Ok(all) => all.attachments_for(routine_id),
            Err(e) => {
                tracing::warn!("Unable to load routine attachments: {}", e);
                Vec::new()
            }
        }
    }
}

/// Read a JSON file with a shared lock
///
/// Returns None if the file doesn't exist, can't be read, or doesn't parse.
fn read_json_locked<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        tracing::debug!("No file at {:?}", path);
        return Ok(None);
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("Unable to open {:?}: {}. Ignoring it.", path, e);
            return Ok(None);
        }
    };

    if let Err(e) = file.lock_shared() {
        tracing::warn!("Unable to lock {:?}: {}. Ignoring it.", path, e);
        return Ok(None);
    }

    let mut contents = String::new();
    let mut reader = std::io::BufReader::new(&file);
    if let Err(e) = reader.read_to_string(&mut contents) {
        let _ = file.unlock();
        tracing::warn!("Failed to read {:?}: {}. Ignoring it.", path, e);
        return Ok(None);
    }

    file.unlock()?;

    match serde_json::from_str::<T>(&contents) {
        Ok(value) => {
            tracing::debug!("Loaded {:?}", path);
            Ok(Some(value))
        }
        Err(e) => {
            tracing::warn!("Failed to parse {:?}: {}. Ignoring it.", path, e);
            Ok(None)
        }
    }
}

/// Write a JSON file atomically
///
/// Writes to a locked temp file in the same directory, syncs it, then renames
/// it over the target.
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Other(format!("{:?} has no parent directory", path)))?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        let contents = serde_json::to_string_pretty(value)?;
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Saved {:?}", path);
    Ok(())
}
