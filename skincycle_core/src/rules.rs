//! Default rule sets shipped with the app.
//!
//! One [`RuleSet`] per built-in adaptation type, each with a briefing for every
//! token it reacts to.

use crate::types::tokens;
use crate::*;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashSet};

/// Version stamped on the built-in rule sets
pub const DEFAULT_RULES_VERSION: u32 = 1;

/// Cached default rule book, built once and cloned into each registry
static DEFAULT_RULE_BOOK: Lazy<RuleBook> = Lazy::new(build_default_rule_book);

/// Get a reference to the cached default rule book
pub fn get_default_rule_book() -> &'static RuleBook {
    &DEFAULT_RULE_BOOK
}

/// Builds the default rule book with the built-in cycle and weather rule sets
///
/// **Note**: The registry starts from `get_default_rule_book()`, which returns
/// a cached reference. Call this when you need a fresh book to mutate.
pub fn build_default_rule_book() -> RuleBook {
    let mut book = RuleBook::default();
    book.insert(build_cycle_rule_set());
    book.insert(build_weather_rule_set());
    book
}

fn rule(
    id: &str,
    category: &str,
    token: &str,
    emphasis: Emphasis,
    guidance: Option<&str>,
    warnings: &[&str],
) -> AdaptationRule {
    AdaptationRule {
        id: id.into(),
        product_category: ProductCategory::new(category),
        context_token: ContextToken::new(token),
        action: RuleAction {
            emphasis,
            guidance_template: guidance.map(Into::into),
            order_priority: None,
            warnings: warnings.iter().map(|w| w.to_string()).collect(),
        },
        origin: RuleOrigin::Default,
    }
}

fn briefing(token: &str, title: &str, summary: &str, tips: &[&str], warnings: &[&str]) -> Briefing {
    Briefing {
        context_token: ContextToken::new(token),
        title: title.into(),
        summary: summary.into(),
        tips: tips.iter().map(|t| t.to_string()).collect(),
        warnings: warnings.iter().map(|w| w.to_string()).collect(),
    }
}

// ============================================================================
// Cycle
// ============================================================================

fn build_cycle_rule_set() -> RuleSet {
    use Emphasis::*;

    let rules = vec![
        // Menstrual: skin is reactive and dehydrated
        rule(
            "cycle_menstrual_exfoliator",
            "exfoliator",
            tokens::MENSTRUAL,
            Reduce,
            Some("Go gentle with {step}: at most once this week"),
            &["Skin is more sensitive during your period"],
        ),
        rule(
            "cycle_menstrual_retinol",
            "retinol",
            tokens::MENSTRUAL,
            Reduce,
            Some("Use {step} every other night while skin is sensitive"),
            &["Skin is more sensitive during your period"],
        ),
        rule(
            "cycle_menstrual_moisturizer",
            "moisturizer",
            tokens::MENSTRUAL,
            Emphasize,
            Some("Be generous with {step} to support the barrier"),
            &[],
        ),
        rule(
            "cycle_menstrual_mask",
            "mask",
            tokens::MENSTRUAL,
            Emphasize,
            Some("A calming, hydrating mask helps this week"),
            &[],
        ),
        // Follicular: skin is resilient, good window for actives
        rule(
            "cycle_follicular_serum",
            "serum",
            tokens::FOLLICULAR,
            Emphasize,
            Some("Good window for active serums like vitamin C"),
            &[],
        ),
        rule(
            "cycle_follicular_exfoliator",
            "exfoliator",
            tokens::FOLLICULAR,
            Emphasize,
            Some("Skin tolerates {step} well right now"),
            &[],
        ),
        rule(
            "cycle_follicular_retinol",
            "retinol",
            tokens::FOLLICULAR,
            Emphasize,
            Some("Skin tolerates {step} well right now"),
            &[],
        ),
        // Ovulation: oil production peaks
        rule(
            "cycle_ovulation_cleanser",
            "cleanser",
            tokens::OVULATION,
            Emphasize,
            Some("Double cleanse in the evening to manage extra oil"),
            &[],
        ),
        rule(
            "cycle_ovulation_face_oil",
            "face_oil",
            tokens::OVULATION,
            Reduce,
            Some("Use only a drop of {step}"),
            &[],
        ),
        rule(
            "cycle_ovulation_spot_treatment",
            "spot_treatment",
            tokens::OVULATION,
            Emphasize,
            Some("Keep {step} ready for early breakouts"),
            &[],
        ),
        // Luteal: congestion and breakouts
        rule(
            "cycle_luteal_face_oil",
            "face_oil",
            tokens::LUTEAL,
            Skip,
            None,
            &["Heavy oils can clog pores before your period"],
        ),
        rule(
            "cycle_luteal_spot_treatment",
            "spot_treatment",
            tokens::LUTEAL,
            Emphasize,
            Some("Apply {step} to emerging blemishes"),
            &[],
        ),
        rule(
            "cycle_luteal_cleanser",
            "cleanser",
            tokens::LUTEAL,
            Emphasize,
            Some("Cleanse thoroughly to keep pores clear"),
            &[],
        ),
        rule(
            "cycle_luteal_mask",
            "mask",
            tokens::LUTEAL,
            Emphasize,
            Some("A clay mask helps with congestion"),
            &[],
        ),
    ];

    let briefings = vec![
        briefing(
            tokens::MENSTRUAL,
            "Menstrual phase",
            "Hormone levels are low, so skin can feel dry, dull and reactive.",
            &["Focus on hydration and barrier repair", "Keep actives to a minimum"],
            &["Skin is more sensitive during your period"],
        ),
        briefing(
            tokens::FOLLICULAR,
            "Follicular phase",
            "Rising estrogen makes skin plumper and more resilient.",
            &[
                "A good time to introduce new products",
                "Actives and exfoliation are well tolerated",
            ],
            &[],
        ),
        briefing(
            tokens::OVULATION,
            "Ovulation",
            "Skin is at its brightest, but oil production starts to climb.",
            &["Keep textures light", "Double cleanse in the evening"],
            &[],
        ),
        briefing(
            tokens::LUTEAL,
            "Luteal phase",
            "Progesterone increases oil and congestion ahead of your period.",
            &[
                "Use targeted spot treatments",
                "Favor non-comedogenic products",
            ],
            &["Breakouts are more likely this week"],
        ),
    ];

    RuleSet {
        adaptation_type: AdaptationType::Cycle,
        version: DEFAULT_RULES_VERSION,
        rules,
        briefings,
    }
}

// ============================================================================
// Weather
// ============================================================================

fn build_weather_rule_set() -> RuleSet {
    use Emphasis::*;

    let rules = vec![
        rule(
            "weather_uv_moderate_sunscreen",
            "sunscreen",
            tokens::UV_MODERATE,
            Emphasize,
            Some("Apply SPF 30+ and reapply when outdoors"),
            &[],
        ),
        rule(
            "weather_uv_high_sunscreen",
            "sunscreen",
            tokens::UV_HIGH,
            Emphasize,
            Some("Apply SPF 50+ and reapply every 2 hours"),
            &[],
        ),
        rule(
            "weather_uv_high_retinol",
            "retinol",
            tokens::UV_HIGH,
            Skip,
            None,
            &["Skip retinoids in high UV"],
        ),
        rule(
            "weather_uv_high_exfoliator",
            "exfoliator",
            tokens::UV_HIGH,
            Skip,
            None,
            &["Exfoliation increases sun sensitivity"],
        ),
        rule(
            "weather_uv_extreme_sunscreen",
            "sunscreen",
            tokens::UV_EXTREME,
            Emphasize,
            Some("Apply SPF 50+ generously and reapply every 2 hours"),
            &["Extreme UV: limit time outdoors"],
        ),
        rule(
            "weather_uv_extreme_retinol",
            "retinol",
            tokens::UV_EXTREME,
            Skip,
            None,
            &["Skip retinoids in high UV"],
        ),
        rule(
            "weather_uv_extreme_exfoliator",
            "exfoliator",
            tokens::UV_EXTREME,
            Skip,
            None,
            &["Exfoliation increases sun sensitivity"],
        ),
        rule(
            "weather_low_humidity_moisturizer",
            "moisturizer",
            tokens::LOW_HUMIDITY,
            Emphasize,
            Some("Layer {step} over damp skin to lock in water"),
            &[],
        ),
        rule(
            "weather_low_humidity_mist",
            "mist",
            tokens::LOW_HUMIDITY,
            Emphasize,
            Some("Refresh with {step} through the day"),
            &[],
        ),
        rule(
            "weather_low_humidity_exfoliator",
            "exfoliator",
            tokens::LOW_HUMIDITY,
            Reduce,
            Some("Exfoliate less often while the air is dry"),
            &["Dry air can weaken the skin barrier"],
        ),
        rule(
            "weather_high_humidity_moisturizer",
            "moisturizer",
            tokens::HIGH_HUMIDITY,
            Reduce,
            Some("A thin layer of {step} is enough today"),
            &[],
        ),
        rule(
            "weather_high_humidity_face_oil",
            "face_oil",
            tokens::HIGH_HUMIDITY,
            Skip,
            None,
            &["Oils feel heavy and can congest pores in humid air"],
        ),
        rule(
            "weather_windy_moisturizer",
            "moisturizer",
            tokens::WINDY,
            Emphasize,
            Some("Apply {step} before heading out to shield against wind"),
            &[],
        ),
        rule(
            "weather_windy_lip_care",
            "lip_care",
            tokens::WINDY,
            Emphasize,
            Some("Reapply {step} often"),
            &["Strong wind can cause windburn and dehydration"],
        ),
        rule(
            "weather_cold_cleanser",
            "cleanser",
            tokens::COLD,
            Reduce,
            Some("Use a gentle cleanser and lukewarm water"),
            &[],
        ),
        rule(
            "weather_cold_face_oil",
            "face_oil",
            tokens::COLD,
            Emphasize,
            Some("Seal in moisture with {step}"),
            &[],
        ),
        rule(
            "weather_cold_moisturizer",
            "moisturizer",
            tokens::COLD,
            Emphasize,
            Some("Use a richer layer of {step}"),
            &[],
        ),
        rule(
            "weather_hot_sunscreen",
            "sunscreen",
            tokens::HOT,
            Emphasize,
            Some("Use a sweat-resistant sunscreen"),
            &[],
        ),
        rule(
            "weather_hot_moisturizer",
            "moisturizer",
            tokens::HOT,
            Reduce,
            Some("Switch {step} for a lightweight gel"),
            &[],
        ),
        rule(
            "weather_hot_mist",
            "mist",
            tokens::HOT,
            Emphasize,
            Some("Cool down with {step}"),
            &[],
        ),
        rule(
            "weather_snow_sunscreen",
            "sunscreen",
            tokens::SNOW,
            Emphasize,
            Some("Apply sunscreen even though it is cold"),
            &["Snow reflects UV rays; wear sunscreen even in the cold"],
        ),
        rule(
            "weather_snow_lip_care",
            "lip_care",
            tokens::SNOW,
            Emphasize,
            Some("Use {step} with SPF"),
            &[],
        ),
    ];

    let briefings = vec![
        briefing(
            tokens::UV_LOW,
            "Low UV",
            "UV is low today, but daily SPF still prevents cumulative damage.",
            &["A light SPF 15+ is enough"],
            &[],
        ),
        briefing(
            tokens::UV_MODERATE,
            "Moderate UV",
            "Moderate UV today. Protect exposed skin if you spend time outside.",
            &["Use SPF 30+", "Reapply when outdoors"],
            &[],
        ),
        briefing(
            tokens::UV_HIGH,
            "High UV",
            "High UV today. Sun protection is the priority.",
            &["Use SPF 50+", "Wear a hat and sunglasses"],
            &[crate::weather::RETINOID_MORNING_WARNING],
        ),
        briefing(
            tokens::UV_EXTREME,
            "Extreme UV",
            "Extreme UV today. Unprotected skin can burn in minutes.",
            &["Use SPF 50+ and reapply often", "Seek shade at midday"],
            &[
                crate::weather::RETINOID_MORNING_WARNING,
                "Extreme UV: limit time outdoors",
            ],
        ),
        briefing(
            tokens::LOW_HUMIDITY,
            "Dry air",
            "Low humidity pulls water out of the skin.",
            &["Layer hydrating products", "Use a humidifier indoors"],
            &["Dry air can weaken the skin barrier"],
        ),
        briefing(
            tokens::HIGH_HUMIDITY,
            "Humid air",
            "High humidity keeps skin hydrated but can feel greasy.",
            &["Use lightweight, gel-based textures"],
            &[],
        ),
        briefing(
            tokens::WINDY,
            "Windy",
            "Wind strips moisture and can irritate exposed skin.",
            &["Apply a barrier balm before going out"],
            &["Strong wind can cause windburn and dehydration"],
        ),
        briefing(
            tokens::COLD,
            "Cold",
            "Cold air and indoor heating dry out the skin.",
            &["Cleanse with lukewarm water", "Add an occlusive final layer"],
            &[],
        ),
        briefing(
            tokens::HOT,
            "Hot",
            "Heat increases sweat and oil.",
            &["Choose oil-free products", "Keep a facial mist on hand"],
            &[],
        ),
        briefing(
            tokens::SNOW,
            "Snow",
            "Snow reflects sunlight back onto the skin.",
            &["Wear sunscreen even on cold days"],
            &["Snow reflects UV rays; wear sunscreen even in the cold"],
        ),
    ];

    RuleSet {
        adaptation_type: AdaptationType::Weather,
        version: DEFAULT_RULES_VERSION,
        rules,
        briefings,
    }
}

// ============================================================================
// Lookup and validation
// ============================================================================

impl RuleSet {
    /// Briefing for a token, if the set ships one
    pub fn briefing_for(&self, token: &ContextToken) -> Option<&Briefing> {
        self.briefings.iter().find(|b| &b.context_token == token)
    }

    /// Validate the rule set for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let ty = self.adaptation_type;
        let vocabulary = ty.known_tokens();

        let mut seen_ids = HashSet::new();
        for rule in &self.rules {
            if rule.id.is_empty() {
                errors.push(format!("{} rule set has a rule with empty ID", ty));
            } else if !seen_ids.insert(rule.id.as_str()) {
                errors.push(format!("{} rule set has duplicate rule ID '{}'", ty, rule.id));
            }
            if !rule.product_category.is_known() {
                errors.push(format!(
                    "Rule '{}' references unknown product category '{}'",
                    rule.id, rule.product_category
                ));
            }
            if let Some(known) = vocabulary {
                if !known.contains(&rule.context_token.as_str()) {
                    errors.push(format!(
                        "Rule '{}' uses token '{}' which is not a {} token",
                        rule.id, rule.context_token, ty
                    ));
                }
            }
        }

        let mut seen_tokens = BTreeSet::new();
        for briefing in &self.briefings {
            if !seen_tokens.insert(&briefing.context_token) {
                errors.push(format!(
                    "{} rule set has more than one briefing for '{}'",
                    ty, briefing.context_token
                ));
            }
            if briefing.title.is_empty() {
                errors.push(format!(
                    "Briefing for '{}' has empty title",
                    briefing.context_token
                ));
            }
        }

        errors
    }
}

impl RuleBook {
    pub fn get(&self, adaptation_type: AdaptationType) -> Option<&RuleSet> {
        self.sets.get(&adaptation_type)
    }

    /// Insert a rule set, replacing any set of the same type
    pub fn insert(&mut self, set: RuleSet) -> Option<RuleSet> {
        self.sets.insert(set.adaptation_type, set)
    }

    pub fn validate(&self) -> Vec<String> {
        self.sets.values().flat_map(RuleSet::validate).collect()
    }
}
