//! Adaptation rule engine.
//!
//! Resolves exactly one [`StepAdaptation`] per base routine step from the
//! active context tokens, the loaded rule book and any per-routine override
//! attachments.
//!
//! ## Resolution
//!
//! 1. Collect matching rules: override rules first, then default rules, each
//!    walked in adaptation-type order. A rule matches when its category equals
//!    the step's and its token is active for the rule's adaptation type.
//! 2. No match → normal emphasis, the step's own description, no warnings.
//! 3. Otherwise the highest origin tier wins (user rules beat the rest), and
//!    within that tier the most severe emphasis wins
//!    (`skip > reduce > emphasize > normal`). Ties go to the rule collected
//!    first.
//! 4. The winner supplies guidance and order override; warnings are the
//!    de-duplicated union over every matching rule.
//!
//! Resolution never fails. Rules with unknown categories are skipped and
//! logged when the engine is built.

use crate::{
    ActiveContexts, AdaptationRule, AdaptationType, ContextToken, Emphasis, RoutineAdaptationAttachment,
    RoutineStep, RuleBook, RuleOrigin, StepAdaptation,
};
use std::collections::BTreeSet;

/// Placeholder in guidance templates replaced by the step description
pub const STEP_PLACEHOLDER: &str = "{step}";

/// A rule that matched a step, with the origin it competes under
#[derive(Clone, Copy, Debug)]
struct Candidate<'a> {
    rule: &'a AdaptationRule,
    origin: RuleOrigin,
}

/// A rule eligible to match, tagged with the type whose tokens gate it
#[derive(Clone, Copy, Debug)]
struct IndexedRule<'a> {
    adaptation_type: AdaptationType,
    rule: &'a AdaptationRule,
    origin: RuleOrigin,
}

/// Rule engine bound to one routine and one set of active contexts
///
/// Borrows its inputs and never mutates them, so one engine can resolve any
/// number of steps and can be shared across threads.
#[derive(Debug)]
pub struct AdaptationRuleEngine<'a> {
    active: &'a ActiveContexts,
    /// Overrides first, then defaults, each in adaptation-type order
    rules: Vec<IndexedRule<'a>>,
}

impl<'a> AdaptationRuleEngine<'a> {
    /// Build an engine for `routine_id`
    ///
    /// Attachments for other routines and for inactive types are ignored.
    pub fn new(
        book: &'a RuleBook,
        active: &'a ActiveContexts,
        attachments: &'a [RoutineAdaptationAttachment],
        routine_id: &str,
    ) -> Self {
        let mut rules = Vec::new();

        for ty in active.types() {
            let overrides = attachments
                .iter()
                .filter(|a| a.routine_id == routine_id && a.adaptation_type == ty)
                .filter_map(|a| a.custom_rules.as_deref())
                .flatten();
            for rule in overrides {
                push_known(&mut rules, ty, rule, RuleOrigin::UserCustom);
            }
        }

        for ty in active.types() {
            match book.get(ty) {
                Some(set) => {
                    for rule in &set.rules {
                        push_known(&mut rules, ty, rule, rule.origin);
                    }
                }
                None => tracing::debug!("No rule set loaded for active type {}", ty),
            }
        }

        Self { active, rules }
    }

    /// Resolve the adaptation for one step
    pub fn resolve(&self, step: &RoutineStep) -> StepAdaptation {
        if !step.product_category.is_known() {
            tracing::debug!(
                "Step '{}' has unknown category '{}', using default adaptation",
                step.id,
                step.product_category
            );
        }

        let candidates = self.matching_rules(step);

        match candidates.as_slice() {
            [] => default_adaptation(step),
            [only] => apply(step, *only, &candidates),
            _ => {
                let winner = pick_winner(&candidates);
                tracing::debug!(
                    "Step '{}' matched {} rules, '{}' wins with {}",
                    step.id,
                    candidates.len(),
                    winner.rule.id,
                    winner.rule.action.emphasis
                );
                apply(step, winner, &candidates)
            }
        }
    }

    fn matching_rules(&self, step: &RoutineStep) -> Vec<Candidate<'a>> {
        self.rules
            .iter()
            .filter(|indexed| indexed.rule.product_category == step.product_category)
            .filter(|indexed| {
                self.active
                    .tokens_for(indexed.adaptation_type)
                    .is_some_and(|tokens| tokens.contains(&indexed.rule.context_token))
            })
            .map(|indexed| Candidate {
                rule: indexed.rule,
                origin: indexed.origin,
            })
            .collect()
    }
}

fn push_known<'a>(
    rules: &mut Vec<IndexedRule<'a>>,
    adaptation_type: AdaptationType,
    rule: &'a AdaptationRule,
    origin: RuleOrigin,
) {
    if rule.product_category.is_known() {
        rules.push(IndexedRule {
            adaptation_type,
            rule,
            origin,
        });
    } else {
        tracing::warn!(
            "Skipping {} rule '{}': unknown product category '{}'",
            adaptation_type,
            rule.id,
            rule.product_category
        );
    }
}

/// Highest origin tier, then most severe emphasis, then first collected
fn pick_winner<'a>(candidates: &[Candidate<'a>]) -> Candidate<'a> {
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        let better_tier = candidate.origin.tier() > best.origin.tier();
        let same_tier_more_severe = candidate.origin.tier() == best.origin.tier()
            && candidate.rule.action.emphasis.severity() > best.rule.action.emphasis.severity();
        if better_tier || same_tier_more_severe {
            best = *candidate;
        }
    }
    best
}

fn apply(step: &RoutineStep, winner: Candidate<'_>, all: &[Candidate<'_>]) -> StepAdaptation {
    let action = &winner.rule.action;

    let mut warnings: Vec<String> = Vec::new();
    for warning in all.iter().flat_map(|c| c.rule.action.warnings.iter()) {
        if !warnings.contains(warning) {
            warnings.push(warning.clone());
        }
    }

    let matched_tokens: BTreeSet<&ContextToken> =
        all.iter().map(|c| &c.rule.context_token).collect();

    StepAdaptation {
        step_id: step.id.clone(),
        matched_tokens: matched_tokens.into_iter().cloned().collect(),
        emphasis: action.emphasis,
        guidance: render_guidance(action.guidance_template.as_deref(), step),
        order_override: action.order_priority,
        warnings,
        origin: winner.origin,
        rule_id: Some(winner.rule.id.clone()),
    }
}

/// Adaptation for a step no rule matched
pub fn default_adaptation(step: &RoutineStep) -> StepAdaptation {
    StepAdaptation {
        step_id: step.id.clone(),
        matched_tokens: Vec::new(),
        emphasis: Emphasis::Normal,
        guidance: step.description.clone(),
        order_override: None,
        warnings: Vec::new(),
        origin: RuleOrigin::Default,
        rule_id: None,
    }
}

/// Fill a guidance template for a step
///
/// Without a template the step's own description is the guidance.
pub fn render_guidance(template: Option<&str>, step: &RoutineStep) -> String {
    match template {
        Some(template) => {
            let subject = if step.description.trim().is_empty() {
                step.product_category.as_str()
            } else {
                step.description.as_str()
            };
            template.replace(STEP_PLACEHOLDER, subject)
        }
        None => step.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tokens;
    use crate::{build_default_rule_book, ProductCategory, RuleAction, RuleSet, TimeOfDay, TokenSet};
    use chrono::Utc;

    fn step(id: &str, category: &str) -> RoutineStep {
        RoutineStep {
            id: id.into(),
            product_category: ProductCategory::new(category),
            time_of_day: TimeOfDay::Evening,
            order: 1,
            description: format!("My {}", category),
        }
    }

    fn rule(id: &str, category: &str, token: &str, emphasis: Emphasis, warnings: &[&str]) -> AdaptationRule {
        AdaptationRule {
            id: id.into(),
            product_category: ProductCategory::new(category),
            context_token: ContextToken::new(token),
            action: RuleAction {
                emphasis,
                guidance_template: Some(format!("{} guidance", id)),
                order_priority: None,
                warnings: warnings.iter().map(|w| w.to_string()).collect(),
            },
            origin: RuleOrigin::Default,
        }
    }

    fn book(cycle: Vec<AdaptationRule>, weather: Vec<AdaptationRule>) -> RuleBook {
        let mut book = RuleBook::default();
        book.insert(RuleSet {
            adaptation_type: AdaptationType::Cycle,
            version: 1,
            rules: cycle,
            briefings: vec![],
        });
        book.insert(RuleSet {
            adaptation_type: AdaptationType::Weather,
            version: 1,
            rules: weather,
            briefings: vec![],
        });
        book
    }

    fn weather(keys: &[&str]) -> TokenSet {
        keys.iter().map(|k| ContextToken::new(*k)).collect()
    }

    fn attachment(ty: AdaptationType, rules: Vec<AdaptationRule>) -> RoutineAdaptationAttachment {
        RoutineAdaptationAttachment {
            routine_id: "routine-1".into(),
            adaptation_type: ty,
            custom_rules: Some(rules),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_no_match_resolves_to_default() {
        let book = build_default_rule_book();
        let active = ActiveContexts::new().with_weather_tokens(weather(&[tokens::UV_LOW]));
        let engine = AdaptationRuleEngine::new(&book, &active, &[], "routine-1");

        let s = step("s1", "toner");
        let adaptation = engine.resolve(&s);

        assert_eq!(adaptation.emphasis, Emphasis::Normal);
        assert_eq!(adaptation.guidance, "My toner");
        assert!(adaptation.warnings.is_empty());
        assert_eq!(adaptation.origin, RuleOrigin::Default);
        assert!(adaptation.rule_id.is_none());
    }

    #[test]
    fn test_nothing_active_resolves_to_default() {
        let book = build_default_rule_book();
        let active = ActiveContexts::new();
        let engine = AdaptationRuleEngine::new(&book, &active, &[], "routine-1");

        assert_eq!(engine.resolve(&step("s1", "retinol")), default_adaptation(&step("s1", "retinol")));
    }

    #[test]
    fn test_retinol_skipped_in_high_uv() {
        let book = book(
            vec![],
            vec![rule(
                "retinol_uv",
                "retinol",
                tokens::UV_HIGH,
                Emphasis::Skip,
                &["Skip retinoids in high UV"],
            )],
        );
        let active = ActiveContexts::new().with_weather_tokens(weather(&[tokens::UV_HIGH]));
        let engine = AdaptationRuleEngine::new(&book, &active, &[], "routine-1");

        let adaptation = engine.resolve(&step("s1", "retinol"));
        assert_eq!(adaptation.emphasis, Emphasis::Skip);
        assert_eq!(adaptation.warnings, vec!["Skip retinoids in high UV".to_string()]);
        assert_eq!(adaptation.rule_id.as_deref(), Some("retinol_uv"));
    }

    #[test]
    fn test_token_must_be_active_for_rule_type() {
        // A weather rule keyed on a cycle token never fires from the cycle source
        let book = book(
            vec![],
            vec![rule("odd", "retinol", tokens::MENSTRUAL, Emphasis::Skip, &[])],
        );
        let active = ActiveContexts::new()
            .with_cycle_phase(crate::CyclePhase::Menstrual)
            .with_weather_tokens(weather(&[tokens::UV_LOW]));
        let engine = AdaptationRuleEngine::new(&book, &active, &[], "routine-1");

        assert_eq!(engine.resolve(&step("s1", "retinol")).emphasis, Emphasis::Normal);
    }

    #[test]
    fn test_severity_merge_unions_warnings() {
        let book = book(
            vec![rule(
                "menstrual_exfoliator",
                "exfoliator",
                tokens::MENSTRUAL,
                Emphasis::Reduce,
                &["Skin is sensitive", "Be gentle"],
            )],
            vec![rule(
                "uv_exfoliator",
                "exfoliator",
                tokens::UV_HIGH,
                Emphasis::Skip,
                &["Be gentle", "Sun sensitivity"],
            )],
        );
        let active = ActiveContexts::new()
            .with_cycle_phase(crate::CyclePhase::Menstrual)
            .with_weather_tokens(weather(&[tokens::UV_HIGH]));
        let engine = AdaptationRuleEngine::new(&book, &active, &[], "routine-1");

        let adaptation = engine.resolve(&step("s1", "exfoliator"));
        assert_eq!(adaptation.emphasis, Emphasis::Skip);
        assert_eq!(adaptation.guidance, "uv_exfoliator guidance");
        assert_eq!(
            adaptation.warnings,
            vec![
                "Skin is sensitive".to_string(),
                "Be gentle".to_string(),
                "Sun sensitivity".to_string()
            ]
        );
        assert_eq!(
            adaptation.matched_tokens,
            vec![ContextToken::new(tokens::MENSTRUAL), ContextToken::new(tokens::UV_HIGH)]
        );
    }

    #[test]
    fn test_default_rules_merge_menstrual_and_high_uv() {
        let book = build_default_rule_book();
        let active = ActiveContexts::new()
            .with_cycle_phase(crate::CyclePhase::Menstrual)
            .with_weather_tokens(weather(&[tokens::UV_HIGH]));
        let engine = AdaptationRuleEngine::new(&book, &active, &[], "routine-1");

        let adaptation = engine.resolve(&step("s1", "exfoliator"));
        assert_eq!(adaptation.emphasis, Emphasis::Skip);
        assert!(!adaptation.warnings.is_empty());
    }

    #[test]
    fn test_emphasize_beats_normal_and_loses_to_reduce() {
        let book = book(
            vec![rule("c", "serum", tokens::LUTEAL, Emphasis::Normal, &[])],
            vec![
                rule("w1", "serum", tokens::COLD, Emphasis::Emphasize, &[]),
                rule("w2", "serum", tokens::WINDY, Emphasis::Reduce, &[]),
            ],
        );
        let cycle_only = ActiveContexts::new()
            .with_cycle_phase(crate::CyclePhase::Luteal)
            .with_weather_tokens(weather(&[tokens::COLD]));
        let engine = AdaptationRuleEngine::new(&book, &cycle_only, &[], "routine-1");
        assert_eq!(engine.resolve(&step("s", "serum")).emphasis, Emphasis::Emphasize);

        let all = ActiveContexts::new()
            .with_cycle_phase(crate::CyclePhase::Luteal)
            .with_weather_tokens(weather(&[tokens::COLD, tokens::WINDY]));
        let engine = AdaptationRuleEngine::new(&book, &all, &[], "routine-1");
        assert_eq!(engine.resolve(&step("s", "serum")).emphasis, Emphasis::Reduce);
    }

    #[test]
    fn test_equal_severity_keeps_first_collected() {
        let book = book(
            vec![rule("cycle_first", "mask", tokens::LUTEAL, Emphasis::Emphasize, &[])],
            vec![rule("weather_second", "mask", tokens::HOT, Emphasis::Emphasize, &[])],
        );
        let active = ActiveContexts::new()
            .with_cycle_phase(crate::CyclePhase::Luteal)
            .with_weather_tokens(weather(&[tokens::HOT]));
        let engine = AdaptationRuleEngine::new(&book, &active, &[], "routine-1");

        assert_eq!(
            engine.resolve(&step("s", "mask")).rule_id.as_deref(),
            Some("cycle_first")
        );
    }

    #[test]
    fn test_user_rule_beats_more_severe_default() {
        let book = book(
            vec![],
            vec![rule("uv_retinol", "retinol", tokens::UV_HIGH, Emphasis::Skip, &["Default warning"])],
        );
        let mut custom = rule("mine", "retinol", tokens::UV_HIGH, Emphasis::Reduce, &["My warning"]);
        custom.action.order_priority = Some(99);
        let attachments = vec![attachment(AdaptationType::Weather, vec![custom])];
        let active = ActiveContexts::new().with_weather_tokens(weather(&[tokens::UV_HIGH]));
        let engine = AdaptationRuleEngine::new(&book, &active, &attachments, "routine-1");

        let adaptation = engine.resolve(&step("s1", "retinol"));
        assert_eq!(adaptation.emphasis, Emphasis::Reduce);
        assert_eq!(adaptation.origin, RuleOrigin::UserCustom);
        assert_eq!(adaptation.order_override, Some(99));
        assert_eq!(
            adaptation.warnings,
            vec!["My warning".to_string(), "Default warning".to_string()]
        );
    }

    #[test]
    fn test_ai_recommended_shares_tier_with_default() {
        let mut suggested = rule(
            "ai_exfoliator",
            "exfoliator",
            tokens::MENSTRUAL,
            Emphasis::Reduce,
            &["Suggested warning"],
        );
        suggested.origin = RuleOrigin::AiRecommended;
        let book = book(
            vec![suggested],
            vec![rule("uv_exfoliator", "exfoliator", tokens::UV_HIGH, Emphasis::Skip, &["Default warning"])],
        );
        let active = ActiveContexts::new()
            .with_cycle_phase(crate::CyclePhase::Menstrual)
            .with_weather_tokens(weather(&[tokens::UV_HIGH]));
        let engine = AdaptationRuleEngine::new(&book, &active, &[], "routine-1");

        let adaptation = engine.resolve(&step("s1", "exfoliator"));
        assert_eq!(adaptation.emphasis, Emphasis::Skip);
        assert_eq!(adaptation.origin, RuleOrigin::Default);
        assert_eq!(adaptation.rule_id.as_deref(), Some("uv_exfoliator"));
        assert_eq!(
            adaptation.warnings,
            vec!["Suggested warning".to_string(), "Default warning".to_string()]
        );
    }

    #[test]
    fn test_user_rule_beats_ai_recommended() {
        let mut suggested = rule("ai_retinol", "retinol", tokens::UV_HIGH, Emphasis::Skip, &[]);
        suggested.origin = RuleOrigin::AiRecommended;
        let book = book(vec![], vec![suggested]);
        let attachments = vec![attachment(
            AdaptationType::Weather,
            vec![rule("mine", "retinol", tokens::UV_HIGH, Emphasis::Emphasize, &[])],
        )];
        let active = ActiveContexts::new().with_weather_tokens(weather(&[tokens::UV_HIGH]));
        let engine = AdaptationRuleEngine::new(&book, &active, &attachments, "routine-1");

        let adaptation = engine.resolve(&step("s1", "retinol"));
        assert_eq!(adaptation.emphasis, Emphasis::Emphasize);
        assert_eq!(adaptation.origin, RuleOrigin::UserCustom);
        assert_eq!(adaptation.rule_id.as_deref(), Some("mine"));
    }

    #[test]
    fn test_attachments_for_other_routines_are_ignored() {
        let book = book(vec![], vec![]);
        let mut foreign = attachment(
            AdaptationType::Weather,
            vec![rule("theirs", "retinol", tokens::UV_HIGH, Emphasis::Skip, &[])],
        );
        foreign.routine_id = "routine-2".into();
        let attachments = vec![foreign];
        let active = ActiveContexts::new().with_weather_tokens(weather(&[tokens::UV_HIGH]));
        let engine = AdaptationRuleEngine::new(&book, &active, &attachments, "routine-1");

        assert_eq!(engine.resolve(&step("s1", "retinol")).emphasis, Emphasis::Normal);
    }

    #[test]
    fn test_attachments_for_inactive_types_are_ignored() {
        let book = book(vec![], vec![]);
        let attachments = vec![attachment(
            AdaptationType::Cycle,
            vec![rule("mine", "retinol", tokens::MENSTRUAL, Emphasis::Skip, &[])],
        )];
        let active = ActiveContexts::new().with_weather_tokens(weather(&[tokens::UV_HIGH]));
        let engine = AdaptationRuleEngine::new(&book, &active, &attachments, "routine-1");

        assert_eq!(engine.resolve(&step("s1", "retinol")).emphasis, Emphasis::Normal);
    }

    #[test]
    fn test_unknown_category_rule_is_skipped() {
        crate::logging::init_test();
        let book = book(
            vec![],
            vec![rule("weird", "toothpaste", tokens::UV_HIGH, Emphasis::Skip, &[])],
        );
        let active = ActiveContexts::new().with_weather_tokens(weather(&[tokens::UV_HIGH]));
        let engine = AdaptationRuleEngine::new(&book, &active, &[], "routine-1");

        let adaptation = engine.resolve(&step("s1", "toothpaste"));
        assert_eq!(adaptation.emphasis, Emphasis::Normal);
        assert!(adaptation.rule_id.is_none());
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let book = build_default_rule_book();
        let active = ActiveContexts::new()
            .with_cycle_phase(crate::CyclePhase::Luteal)
            .with_weather_tokens(weather(&[tokens::UV_EXTREME, tokens::COLD, tokens::WINDY]));
        let engine = AdaptationRuleEngine::new(&book, &active, &[], "routine-1");

        for category in ["moisturizer", "face_oil", "cleanser", "sunscreen", "retinol"] {
            let s = step("s", category);
            let first = engine.resolve(&s);
            for _ in 0..5 {
                let again = AdaptationRuleEngine::new(&book, &active, &[], "routine-1").resolve(&s);
                assert_eq!(again, first);
            }
        }
    }

    #[test]
    fn test_render_guidance() {
        let s = step("s1", "retinol");
        assert_eq!(render_guidance(Some("Use {step} twice"), &s), "Use My retinol twice");
        assert_eq!(render_guidance(None, &s), "My retinol");

        let mut bare = s.clone();
        bare.description.clear();
        assert_eq!(render_guidance(Some("Use {step}"), &bare), "Use retinol");
    }
}
