//! Read-only context providers and the daily planner.
//!
//! Storage, weather fetching and profile editing live outside the engine. They
//! are injected through the source traits below, and the planner turns
//! whatever they currently hold into one [`RoutineSnapshot`].

use crate::cycle::{derive_cycle_state, CycleState};
use crate::registry::RuleSetRegistry;
use crate::snapshot::assemble;
use crate::weather::{derive_weather_context, WeatherContext, STALE_AFTER_SECONDS};
use crate::{
    ActiveContexts, BaseRoutine, Config, CycleProfile, RoutineAdaptationAttachment, RoutineSnapshot,
    WeatherReading,
};
use chrono::{DateTime, NaiveDate, Utc};

/// Supplies the user's cycle profile, if one was entered
pub trait CycleProfileSource {
    fn cycle_profile(&self) -> Option<CycleProfile>;
}

/// Supplies the most recent weather reading, if any
pub trait WeatherSource {
    fn latest_reading(&self) -> Option<WeatherReading>;
}

/// Supplies override attachments for a routine
pub trait AttachmentSource {
    fn attachments_for(&self, routine_id: &str) -> Vec<RoutineAdaptationAttachment>;
}

impl CycleProfileSource for Option<CycleProfile> {
    fn cycle_profile(&self) -> Option<CycleProfile> {
        self.clone()
    }
}

impl WeatherSource for Option<WeatherReading> {
    fn latest_reading(&self) -> Option<WeatherReading> {
        self.clone()
    }
}

impl AttachmentSource for [RoutineAdaptationAttachment] {
    fn attachments_for(&self, routine_id: &str) -> Vec<RoutineAdaptationAttachment> {
        self.iter()
            .filter(|a| a.routine_id == routine_id)
            .cloned()
            .collect()
    }
}

impl AttachmentSource for Vec<RoutineAdaptationAttachment> {
    fn attachments_for(&self, routine_id: &str) -> Vec<RoutineAdaptationAttachment> {
        self.as_slice().attachments_for(routine_id)
    }
}

/// Which context sources feed the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannerSettings {
    pub cycle_enabled: bool,
    pub weather_enabled: bool,
    pub stale_after_seconds: i64,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            cycle_enabled: true,
            weather_enabled: true,
            stale_after_seconds: STALE_AFTER_SECONDS,
        }
    }
}

impl From<&Config> for PlannerSettings {
    fn from(config: &Config) -> Self {
        Self {
            cycle_enabled: config.adaptation.cycle_enabled,
            weather_enabled: config.adaptation.weather_enabled,
            stale_after_seconds: config.weather.stale_after_seconds,
        }
    }
}

/// A snapshot plus the derived context that produced it
#[derive(Clone, Debug)]
pub struct DailyPlan {
    pub snapshot: RoutineSnapshot,
    pub cycle: Option<CycleState>,
    pub weather: Option<WeatherContext>,
}

/// Gathers context from providers and assembles the day's snapshot
pub struct DailyPlanner<'a> {
    pub cycle: &'a dyn CycleProfileSource,
    pub weather: &'a dyn WeatherSource,
    pub attachments: &'a dyn AttachmentSource,
    pub registry: &'a RuleSetRegistry,
    pub settings: PlannerSettings,
}

impl<'a> DailyPlanner<'a> {
    /// Plan `routine` for `date`; `now` is only used for weather staleness
    pub fn plan(&self, routine: &BaseRoutine, date: NaiveDate, now: DateTime<Utc>) -> DailyPlan {
        let cycle = if self.settings.cycle_enabled {
            self.cycle
                .cycle_profile()
                .map(|profile| derive_cycle_state(&profile, date))
        } else {
            None
        };

        let weather = if self.settings.weather_enabled {
            self.weather
                .latest_reading()
                .map(|reading| derive_weather_context(&reading, now, self.settings.stale_after_seconds))
        } else {
            None
        };

        let active = active_contexts(cycle.as_ref(), weather.as_ref());
        let attachments = self.attachments.attachments_for(&routine.id);
        let book = self.registry.current();

        let snapshot = assemble(routine, &active, &book, &attachments, date);

        DailyPlan {
            snapshot,
            cycle,
            weather,
        }
    }
}

/// Active contexts from whichever sources produced a result
pub fn active_contexts(
    cycle: Option<&CycleState>,
    weather: Option<&WeatherContext>,
) -> ActiveContexts {
    let mut active = ActiveContexts::new();
    if let Some(state) = cycle {
        active = active.with_cycle_phase(state.phase);
    }
    if let Some(ctx) = weather {
        active = active.with_weather_tokens(ctx.tokens.clone());
    }
    active
}
