#![forbid(unsafe_code)]

//! Core domain model and adaptation engine for Skincycle.
//!
//! This crate provides:
//! - Domain types (routines, cycle profiles, weather readings, rules, snapshots)
//! - Cycle phase and weather context derivation
//! - The default rule catalog and an atomically reloadable registry
//! - The rule engine and snapshot assembly
//! - Persistence (profile store, routine import, snapshot log, CSV export)

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod cycle;
pub mod weather;
pub mod rules;
pub mod engine;
pub mod snapshot;
pub mod registry;
pub mod context;
pub mod store;
pub mod routine;
pub mod wal;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use cycle::{derive_cycle_state, CycleState};
pub use weather::{derive_weather_context, WeatherContext};
pub use rules::{build_default_rule_book, get_default_rule_book};
pub use engine::AdaptationRuleEngine;
pub use snapshot::assemble;
pub use registry::RuleSetRegistry;
pub use context::{DailyPlan, DailyPlanner, PlannerSettings};
pub use store::ProfileStore;
pub use routine::load_routine;
pub use wal::{JsonlSink, SnapshotRecord, SnapshotSink};
pub use export::export_csv;
