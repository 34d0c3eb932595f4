//! Cycle state derivation.
//!
//! Maps a [`CycleProfile`] and a calendar date to a cycle day, a discrete
//! [`CyclePhase`] and a progress fraction within that phase.
//!
//! Phase boundaries after the period are fixed at day 13 (end of follicular)
//! and day 16 (end of ovulation) whatever the average cycle length is.

use crate::{CyclePhase, CycleProfile, Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Last day of the follicular phase
pub const FOLLICULAR_END_DAY: i32 = 13;

/// Last day of the ovulation phase
pub const OVULATION_END_DAY: i32 = 16;

/// Derived cycle position for one date
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CycleState {
    pub day_in_cycle: i32,
    pub phase: CyclePhase,
    pub progress: f64,
}

impl CycleProfile {
    /// Cycle length used for arithmetic, never below 1
    pub fn effective_cycle_length(&self) -> i32 {
        self.average_cycle_length.max(1)
    }

    /// Reject profiles a user should not be able to save
    ///
    /// The derivers accept any profile; this is for the editing boundary.
    pub fn validate(&self) -> Result<()> {
        if self.average_cycle_length <= 0 {
            return Err(Error::Profile(format!(
                "average cycle length must be positive, got {}",
                self.average_cycle_length
            )));
        }
        if self.period_length <= 0 {
            return Err(Error::Profile(format!(
                "period length must be positive, got {}",
                self.period_length
            )));
        }
        if self.period_length > self.average_cycle_length {
            return Err(Error::Profile(format!(
                "period length {} exceeds cycle length {}",
                self.period_length, self.average_cycle_length
            )));
        }
        Ok(())
    }
}

/// Day of the cycle for `date`, in `[1, average_cycle_length]`
///
/// Dates before the last period start wrap backwards into the previous cycle.
pub fn current_day_in_cycle(profile: &CycleProfile, date: NaiveDate) -> i32 {
    let length = i64::from(profile.effective_cycle_length());
    let days_since = (date - profile.last_period_start_date).num_days();
    let day = days_since.rem_euclid(length) + 1;
    day.clamp(1, length) as i32
}

/// Phase for a given cycle day
pub fn phase_for_day(day: i32, period_length: i32) -> CyclePhase {
    if day <= period_length {
        CyclePhase::Menstrual
    } else if day <= FOLLICULAR_END_DAY {
        CyclePhase::Follicular
    } else if day <= OVULATION_END_DAY {
        CyclePhase::Ovulation
    } else {
        CyclePhase::Luteal
    }
}

pub fn current_phase(profile: &CycleProfile, date: NaiveDate) -> CyclePhase {
    phase_for_day(current_day_in_cycle(profile, date), profile.period_length)
}

/// First and last cycle day of `phase` for this profile
///
/// A long period swallows the start of the later phases, so each phase starts
/// after whichever earlier boundary is latest.
pub fn phase_bounds(profile: &CycleProfile, phase: CyclePhase) -> (i32, i32) {
    let period = profile.period_length;
    match phase {
        CyclePhase::Menstrual => (1, period),
        CyclePhase::Follicular => (period + 1, FOLLICULAR_END_DAY),
        CyclePhase::Ovulation => (period.max(FOLLICULAR_END_DAY) + 1, OVULATION_END_DAY),
        CyclePhase::Luteal => (
            period.max(OVULATION_END_DAY) + 1,
            profile.effective_cycle_length(),
        ),
    }
}

/// Linear position within the current phase
pub fn phase_progress(profile: &CycleProfile, date: NaiveDate) -> f64 {
    let day = current_day_in_cycle(profile, date);
    progress_for_day(profile, day)
}

fn progress_for_day(profile: &CycleProfile, day: i32) -> f64 {
    let phase = phase_for_day(day, profile.period_length);
    let (start, end) = phase_bounds(profile, phase);
    let span = (end - start).max(1);
    (f64::from(day - start) / f64::from(span)).clamp(0.0, 1.0)
}

/// Day, phase and progress in one pass
pub fn derive_cycle_state(profile: &CycleProfile, date: NaiveDate) -> CycleState {
    if profile.average_cycle_length <= 0 {
        tracing::warn!(
            "Cycle length {} is not positive, clamping to 1",
            profile.average_cycle_length
        );
    }

    let day_in_cycle = current_day_in_cycle(profile, date);
    let phase = phase_for_day(day_in_cycle, profile.period_length);
    let progress = progress_for_day(profile, day_in_cycle);

    tracing::debug!(
        "Cycle day {} on {}: {} ({:.2})",
        day_in_cycle,
        date,
        phase,
        progress
    );

    CycleState {
        day_in_cycle,
        phase,
        progress,
    }
}
