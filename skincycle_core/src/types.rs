//! Core domain types for the Skincycle routine adaptation engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Context tokens and product categories
//! - Base routines and their steps
//! - Cycle profiles and weather readings (engine inputs)
//! - Rules, rule sets and per-routine override attachments
//! - Step adaptations and routine snapshots (engine outputs)
//!
//! Everything here is pure semantic data. Colors, icons and other
//! presentation concerns are mapped by callers, never carried on these enums.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// Context Tokens
// ============================================================================

/// Well-known context token keys
pub mod tokens {
    pub const MENSTRUAL: &str = "menstrual";
    pub const FOLLICULAR: &str = "follicular";
    pub const OVULATION: &str = "ovulation";
    pub const LUTEAL: &str = "luteal";

    pub const UV_LOW: &str = "uv_low";
    pub const UV_MODERATE: &str = "uv_moderate";
    pub const UV_HIGH: &str = "uv_high";
    pub const UV_EXTREME: &str = "uv_extreme";
    pub const LOW_HUMIDITY: &str = "low_humidity";
    pub const HIGH_HUMIDITY: &str = "high_humidity";
    pub const WINDY: &str = "windy";
    pub const COLD: &str = "cold";
    pub const HOT: &str = "hot";
    pub const SNOW: &str = "snow";

    pub const CYCLE: &[&str] = &[MENSTRUAL, FOLLICULAR, OVULATION, LUTEAL];
    pub const WEATHER: &[&str] = &[
        UV_LOW,
        UV_MODERATE,
        UV_HIGH,
        UV_EXTREME,
        LOW_HUMIDITY,
        HIGH_HUMIDITY,
        WINDY,
        COLD,
        HOT,
        SNOW,
    ];
}

/// An opaque key identifying an active biological or environmental condition
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextToken(String);

impl ContextToken {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContextToken {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for ContextToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered token set; iteration order never depends on insertion order
pub type TokenSet = BTreeSet<ContextToken>;

// ============================================================================
// Product Categories
// ============================================================================

/// Categories the rule engine knows how to adapt
pub const KNOWN_CATEGORIES: &[&str] = &[
    "cleanser",
    "toner",
    "essence",
    "serum",
    "treatment",
    "retinol",
    "exfoliator",
    "moisturizer",
    "sunscreen",
    "eye_cream",
    "face_oil",
    "mask",
    "spot_treatment",
    "lip_care",
    "mist",
    "makeup_remover",
];

/// Product category tag, normalized to lowercase snake case
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ProductCategory(String);

impl ProductCategory {
    pub fn new(raw: &str) -> Self {
        let normalized = raw
            .trim()
            .to_lowercase()
            .replace([' ', '-'], "_");
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this category appears in [`KNOWN_CATEGORIES`]
    pub fn is_known(&self) -> bool {
        KNOWN_CATEGORIES.contains(&self.0.as_str())
    }
}

impl From<String> for ProductCategory {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<&str> for ProductCategory {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<ProductCategory> for String {
    fn from(category: ProductCategory) -> Self {
        category.0
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Base Routine
// ============================================================================

/// When in the day (or week) a step is performed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Evening,
    Weekly,
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Weekly => "weekly",
        };
        f.write_str(label)
    }
}

/// One step of the user's fixed base routine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoutineStep {
    pub id: String,
    pub product_category: ProductCategory,
    pub time_of_day: TimeOfDay,
    pub order: i32,
    #[serde(default)]
    pub description: String,
}

/// The user's base routine, before any adaptation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BaseRoutine {
    pub id: String,
    pub name: String,
    pub steps: Vec<RoutineStep>,
}

// ============================================================================
// Cycle Inputs
// ============================================================================

/// User-owned menstrual cycle profile
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleProfile {
    pub last_period_start_date: NaiveDate,
    pub average_cycle_length: i32,
    pub period_length: i32,
}

/// Discrete phase of the menstrual cycle
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
}

impl CyclePhase {
    pub const ALL: [CyclePhase; 4] = [
        CyclePhase::Menstrual,
        CyclePhase::Follicular,
        CyclePhase::Ovulation,
        CyclePhase::Luteal,
    ];

    pub fn token_key(self) -> &'static str {
        match self {
            CyclePhase::Menstrual => tokens::MENSTRUAL,
            CyclePhase::Follicular => tokens::FOLLICULAR,
            CyclePhase::Ovulation => tokens::OVULATION,
            CyclePhase::Luteal => tokens::LUTEAL,
        }
    }

    pub fn token(self) -> ContextToken {
        ContextToken::new(self.token_key())
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token_key())
    }
}

// ============================================================================
// Weather Inputs
// ============================================================================

/// A single weather observation supplied by the weather collaborator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeatherReading {
    pub uv_index: u32,
    /// Relative humidity, 0-100
    pub humidity: f64,
    pub wind_speed_kmh: f64,
    pub temperature_c: f64,
    #[serde(default)]
    pub has_snow: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub condition: Option<String>,
}

/// UV index tier
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UvLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl UvLevel {
    pub fn token_key(self) -> &'static str {
        match self {
            UvLevel::Low => tokens::UV_LOW,
            UvLevel::Moderate => tokens::UV_MODERATE,
            UvLevel::High => tokens::UV_HIGH,
            UvLevel::Extreme => tokens::UV_EXTREME,
        }
    }

    pub fn token(self) -> ContextToken {
        ContextToken::new(self.token_key())
    }
}

/// Advice bundle derived from a weather reading
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WeatherRecommendation {
    pub spf_level: String,
    pub texture_adjustment: Option<String>,
    pub warnings: Vec<String>,
    pub tips: Vec<String>,
}

// ============================================================================
// Rules
// ============================================================================

/// Source of context tokens a rule set reacts to
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationType {
    Cycle,
    Weather,
    SkinState,
}

impl AdaptationType {
    pub const ALL: [AdaptationType; 3] = [
        AdaptationType::Cycle,
        AdaptationType::Weather,
        AdaptationType::SkinState,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AdaptationType::Cycle => "cycle",
            AdaptationType::Weather => "weather",
            AdaptationType::SkinState => "skin_state",
        }
    }

    /// Token vocabulary for this type, or None when it is open-ended
    pub fn known_tokens(self) -> Option<&'static [&'static str]> {
        match self {
            AdaptationType::Cycle => Some(tokens::CYCLE),
            AdaptationType::Weather => Some(tokens::WEATHER),
            AdaptationType::SkinState => None,
        }
    }
}

impl fmt::Display for AdaptationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instruction severity for a routine step
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    Skip,
    Reduce,
    #[default]
    Normal,
    Emphasize,
}

impl Emphasis {
    /// Rank used when rules conflict: skip > reduce > emphasize > normal
    pub fn severity(self) -> u8 {
        match self {
            Emphasis::Skip => 3,
            Emphasis::Reduce => 2,
            Emphasis::Emphasize => 1,
            Emphasis::Normal => 0,
        }
    }
}

impl fmt::Display for Emphasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Emphasis::Skip => "skip",
            Emphasis::Reduce => "reduce",
            Emphasis::Normal => "normal",
            Emphasis::Emphasize => "emphasize",
        };
        f.write_str(label)
    }
}

/// Where a rule (and therefore an adaptation) came from
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleOrigin {
    #[default]
    Default,
    AiRecommended,
    UserCustom,
}

impl RuleOrigin {
    /// Precedence tier: user rules beat everything else, the rest share a tier
    pub fn tier(self) -> u8 {
        match self {
            RuleOrigin::UserCustom => 1,
            RuleOrigin::Default | RuleOrigin::AiRecommended => 0,
        }
    }
}

impl fmt::Display for RuleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RuleOrigin::Default => "default",
            RuleOrigin::AiRecommended => "ai_recommended",
            RuleOrigin::UserCustom => "user_custom",
        };
        f.write_str(label)
    }
}

/// What a rule does to a matching step
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleAction {
    pub emphasis: Emphasis,
    /// Guidance text; `{step}` is replaced with the step description
    #[serde(default)]
    pub guidance_template: Option<String>,
    #[serde(default)]
    pub order_priority: Option<i32>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// (category, token) -> action
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdaptationRule {
    pub id: String,
    pub product_category: ProductCategory,
    pub context_token: ContextToken,
    pub action: RuleAction,
    #[serde(default)]
    pub origin: RuleOrigin,
}

/// Per-context summary card
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Briefing {
    pub context_token: ContextToken,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Briefing {
    /// Minimal card used when a rule set ships no briefing for a token
    pub fn placeholder(token: &ContextToken) -> Self {
        Self {
            context_token: token.clone(),
            title: token.to_string(),
            summary: String::new(),
            tips: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Versioned rules plus briefings for one adaptation type
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSet {
    #[serde(rename = "type")]
    pub adaptation_type: AdaptationType,
    pub version: u32,
    pub rules: Vec<AdaptationRule>,
    #[serde(default)]
    pub briefings: Vec<Briefing>,
}

/// All loaded rule sets, at most one per adaptation type
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleBook {
    pub sets: BTreeMap<AdaptationType, RuleSet>,
}

/// User-owned override rules layered over one routine's default rules
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutineAdaptationAttachment {
    pub routine_id: String,
    #[serde(rename = "type")]
    pub adaptation_type: AdaptationType,
    #[serde(default)]
    pub custom_rules: Option<Vec<AdaptationRule>>,
    pub last_updated: DateTime<Utc>,
}

// ============================================================================
// Active Contexts
// ============================================================================

/// Active token sets keyed by the adaptation type that produced them
///
/// A type present in the map is active even when its token set is empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveContexts(BTreeMap<AdaptationType, TokenSet>);

impl ActiveContexts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, adaptation_type: AdaptationType, tokens: TokenSet) {
        self.0.insert(adaptation_type, tokens);
    }

    /// Cycle adaptation always contributes exactly one token
    pub fn with_cycle_phase(mut self, phase: CyclePhase) -> Self {
        self.insert(AdaptationType::Cycle, TokenSet::from([phase.token()]));
        self
    }

    pub fn with_weather_tokens(mut self, tokens: TokenSet) -> Self {
        self.insert(AdaptationType::Weather, tokens);
        self
    }

    pub fn tokens_for(&self, adaptation_type: AdaptationType) -> Option<&TokenSet> {
        self.0.get(&adaptation_type)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Active types in their canonical order
    pub fn types(&self) -> impl Iterator<Item = AdaptationType> + '_ {
        self.0.keys().copied()
    }

    /// Union of every active token across types
    pub fn all_tokens(&self) -> TokenSet {
        self.0.values().flatten().cloned().collect()
    }
}

// ============================================================================
// Engine Outputs
// ============================================================================

/// Resolved outcome for one base step under the active context
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepAdaptation {
    pub step_id: String,
    /// Tokens of every rule that matched, sorted
    pub matched_tokens: Vec<ContextToken>,
    pub emphasis: Emphasis,
    pub guidance: String,
    pub order_override: Option<i32>,
    pub warnings: Vec<String>,
    pub origin: RuleOrigin,
    /// Id of the winning rule, if any rule matched
    pub rule_id: Option<String>,
}

/// A base step after adaptation, ready for display
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdaptedStep {
    pub step_id: String,
    pub product_category: ProductCategory,
    pub time_of_day: TimeOfDay,
    pub should_show: bool,
    pub emphasis: Emphasis,
    pub guidance_text: String,
    pub display_order: i32,
    pub base_order: i32,
    pub warnings: Vec<String>,
    pub origin: RuleOrigin,
    pub matched_tokens: Vec<ContextToken>,
    pub rule_id: Option<String>,
}

/// Fully resolved per-day view of a routine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutineSnapshot {
    pub routine_id: String,
    pub date: NaiveDate,
    pub active_types: Vec<AdaptationType>,
    pub active_tokens: TokenSet,
    pub morning: Vec<AdaptedStep>,
    pub evening: Vec<AdaptedStep>,
    pub weekly: Vec<AdaptedStep>,
    /// None when no active type contributes a token
    pub briefing: Option<Briefing>,
}

impl RoutineSnapshot {
    pub fn section(&self, time_of_day: TimeOfDay) -> &[AdaptedStep] {
        match time_of_day {
            TimeOfDay::Morning => &self.morning,
            TimeOfDay::Evening => &self.evening,
            TimeOfDay::Weekly => &self.weekly,
        }
    }

    /// All adapted steps, section by section, in display order
    pub fn adapted_steps(&self) -> impl Iterator<Item = &AdaptedStep> {
        self.morning
            .iter()
            .chain(self.evening.iter())
            .chain(self.weekly.iter())
    }

    pub fn step(&self, step_id: &str) -> Option<&AdaptedStep> {
        self.adapted_steps().find(|s| s.step_id == step_id)
    }
}
