//! Snapshot assembly.
//!
//! Combines a base routine, the resolved adaptation for each of its steps and
//! one selected briefing into an ordered, time-of-day partitioned
//! [`RoutineSnapshot`].

use crate::engine::AdaptationRuleEngine;
use crate::{
    ActiveContexts, AdaptationType, AdaptedStep, BaseRoutine, Briefing, Emphasis,
    RoutineAdaptationAttachment, RoutineSnapshot, RoutineStep, RuleBook, StepAdaptation, TimeOfDay,
};
use chrono::NaiveDate;

/// Assemble the snapshot for `routine` on `date`
///
/// Pure and idempotent: the same inputs always give the same snapshot, so
/// callers may cache by (routine id, active tokens, day).
pub fn assemble(
    routine: &BaseRoutine,
    active: &ActiveContexts,
    book: &RuleBook,
    attachments: &[RoutineAdaptationAttachment],
    date: NaiveDate,
) -> RoutineSnapshot {
    let engine = AdaptationRuleEngine::new(book, active, attachments, &routine.id);

    let mut morning = Vec::new();
    let mut evening = Vec::new();
    let mut weekly = Vec::new();

    for step in &routine.steps {
        let adapted = adapt_step(step, engine.resolve(step));
        match step.time_of_day {
            TimeOfDay::Morning => morning.push(adapted),
            TimeOfDay::Evening => evening.push(adapted),
            TimeOfDay::Weekly => weekly.push(adapted),
        }
    }

    for section in [&mut morning, &mut evening, &mut weekly] {
        sort_section(section);
    }

    let snapshot = RoutineSnapshot {
        routine_id: routine.id.clone(),
        date,
        active_types: active.types().collect(),
        active_tokens: active.all_tokens(),
        morning,
        evening,
        weekly,
        briefing: select_briefing(active, book),
    };

    tracing::debug!(
        "Assembled snapshot for routine '{}' on {}: {} steps, {} hidden",
        snapshot.routine_id,
        date,
        routine.steps.len(),
        snapshot.adapted_steps().filter(|s| !s.should_show).count()
    );

    snapshot
}

fn adapt_step(step: &RoutineStep, adaptation: StepAdaptation) -> AdaptedStep {
    AdaptedStep {
        step_id: adaptation.step_id,
        product_category: step.product_category.clone(),
        time_of_day: step.time_of_day,
        should_show: adaptation.emphasis != Emphasis::Skip,
        emphasis: adaptation.emphasis,
        guidance_text: adaptation.guidance,
        display_order: adaptation.order_override.unwrap_or(step.order),
        base_order: step.order,
        warnings: adaptation.warnings,
        origin: adaptation.origin,
        matched_tokens: adaptation.matched_tokens,
        rule_id: adaptation.rule_id,
    }
}

/// Display order, then base order, then step id
fn sort_section(steps: &mut [AdaptedStep]) {
    steps.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then(a.base_order.cmp(&b.base_order))
            .then_with(|| a.step_id.cmp(&b.step_id))
    });
}

/// Pick the briefing shown with a snapshot
///
/// The cycle phase takes priority. Otherwise the lexicographically first
/// weather token is used, then the first token of any other active type. A
/// token without a briefing gets a placeholder card.
pub fn select_briefing(active: &ActiveContexts, book: &RuleBook) -> Option<Briefing> {
    let chosen = [AdaptationType::Cycle, AdaptationType::Weather, AdaptationType::SkinState]
        .into_iter()
        .find_map(|ty| {
            active
                .tokens_for(ty)
                .and_then(|tokens| tokens.first())
                .map(|token| (ty, token))
        });

    let (ty, token) = chosen?;
    let briefing = book
        .get(ty)
        .and_then(|set| set.briefing_for(token))
        .cloned()
        .unwrap_or_else(|| {
            tracing::debug!("No {} briefing for '{}', using placeholder", ty, token);
            Briefing::placeholder(token)
        });
    Some(briefing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tokens;
    use crate::{
        build_default_rule_book, AdaptationRule, ContextToken, CyclePhase, ProductCategory,
        RuleAction, RuleOrigin, RuleSet, TokenSet,
    };
    use chrono::Utc;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    fn step(id: &str, category: &str, time_of_day: TimeOfDay, order: i32) -> RoutineStep {
        RoutineStep {
            id: id.into(),
            product_category: ProductCategory::new(category),
            time_of_day,
            order,
            description: format!("{} step", category),
        }
    }

    fn routine() -> BaseRoutine {
        BaseRoutine {
            id: "routine-1".into(),
            name: "Everyday".into(),
            steps: vec![
                step("am-spf", "sunscreen", TimeOfDay::Morning, 3),
                step("am-cleanse", "cleanser", TimeOfDay::Morning, 1),
                step("am-moist", "moisturizer", TimeOfDay::Morning, 2),
                step("pm-cleanse", "cleanser", TimeOfDay::Evening, 1),
                step("pm-retinol", "retinol", TimeOfDay::Evening, 2),
                step("pm-oil", "face_oil", TimeOfDay::Evening, 3),
                step("wk-exfoliate", "exfoliator", TimeOfDay::Weekly, 1),
                step("wk-mask", "mask", TimeOfDay::Weekly, 2),
            ],
        }
    }

    fn weather(keys: &[&str]) -> TokenSet {
        keys.iter().map(|k| ContextToken::new(*k)).collect()
    }

    fn ids(steps: &[AdaptedStep]) -> Vec<&str> {
        steps.iter().map(|s| s.step_id.as_str()).collect()
    }

    #[test]
    fn test_every_step_appears_exactly_once() {
        let book = build_default_rule_book();
        let active = ActiveContexts::new()
            .with_cycle_phase(CyclePhase::Luteal)
            .with_weather_tokens(weather(&[tokens::UV_HIGH, tokens::HOT]));
        let routine = routine();

        let snapshot = assemble(&routine, &active, &book, &[], date());

        let mut seen: Vec<&str> = snapshot.adapted_steps().map(|s| s.step_id.as_str()).collect();
        seen.sort();
        let mut expected: Vec<&str> = routine.steps.iter().map(|s| s.id.as_str()).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_sections_are_sorted_by_order() {
        let book = build_default_rule_book();
        let snapshot = assemble(&routine(), &ActiveContexts::new(), &book, &[], date());

        assert_eq!(ids(&snapshot.morning), vec!["am-cleanse", "am-moist", "am-spf"]);
        assert_eq!(ids(&snapshot.evening), vec!["pm-cleanse", "pm-retinol", "pm-oil"]);
        assert_eq!(ids(&snapshot.weekly), vec!["wk-exfoliate", "wk-mask"]);
        assert!(snapshot.briefing.is_none());
    }

    #[test]
    fn test_ties_break_on_step_id() {
        let mut routine = routine();
        routine.steps = vec![
            step("b", "toner", TimeOfDay::Morning, 1),
            step("a", "serum", TimeOfDay::Morning, 1),
        ];
        let snapshot = assemble(&routine, &ActiveContexts::new(), &RuleBook::default(), &[], date());
        assert_eq!(ids(&snapshot.morning), vec!["a", "b"]);
    }

    #[test]
    fn test_order_override_moves_step() {
        let custom = AdaptationRule {
            id: "retinol_last".into(),
            product_category: ProductCategory::new("retinol"),
            context_token: ContextToken::new(tokens::FOLLICULAR),
            action: RuleAction {
                emphasis: Emphasis::Emphasize,
                guidance_template: None,
                order_priority: Some(10),
                warnings: vec![],
            },
            origin: RuleOrigin::UserCustom,
        };
        let attachments = vec![RoutineAdaptationAttachment {
            routine_id: "routine-1".into(),
            adaptation_type: AdaptationType::Cycle,
            custom_rules: Some(vec![custom]),
            last_updated: Utc::now(),
        }];
        let active = ActiveContexts::new().with_cycle_phase(CyclePhase::Follicular);

        let snapshot = assemble(&routine(), &active, &build_default_rule_book(), &attachments, date());

        assert_eq!(ids(&snapshot.evening), vec!["pm-cleanse", "pm-oil", "pm-retinol"]);
        let retinol = snapshot.step("pm-retinol").unwrap();
        assert_eq!(retinol.display_order, 10);
        assert_eq!(retinol.base_order, 2);
    }

    #[test]
    fn test_skip_hides_step() {
        let book = build_default_rule_book();
        let active = ActiveContexts::new().with_weather_tokens(weather(&[tokens::UV_HIGH]));

        let snapshot = assemble(&routine(), &active, &book, &[], date());
        let retinol = snapshot.step("pm-retinol").unwrap();

        assert_eq!(retinol.emphasis, Emphasis::Skip);
        assert!(!retinol.should_show);
        assert!(snapshot.step("am-spf").unwrap().should_show);
    }

    #[test]
    fn test_menstrual_and_high_uv_exfoliator() {
        let book = build_default_rule_book();
        let active = ActiveContexts::new()
            .with_cycle_phase(CyclePhase::Menstrual)
            .with_weather_tokens(weather(&[tokens::UV_HIGH]));

        let snapshot = assemble(&routine(), &active, &book, &[], date());
        let exfoliator = snapshot.step("wk-exfoliate").unwrap();

        assert_eq!(exfoliator.emphasis, Emphasis::Skip);
        assert!(!exfoliator.should_show);
        assert!(!exfoliator.warnings.is_empty());
        assert_eq!(
            snapshot.active_types,
            vec![AdaptationType::Cycle, AdaptationType::Weather]
        );
        assert_eq!(snapshot.active_tokens.len(), 2);
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let book = build_default_rule_book();
        let active = ActiveContexts::new()
            .with_cycle_phase(CyclePhase::Ovulation)
            .with_weather_tokens(weather(&[tokens::UV_MODERATE, tokens::HIGH_HUMIDITY]));
        let routine = routine();

        let first = assemble(&routine, &active, &book, &[], date());
        let second = assemble(&routine, &active, &book, &[], date());
        assert_eq!(first, second);
    }

    #[test]
    fn test_cycle_briefing_has_priority() {
        let book = build_default_rule_book();
        let active = ActiveContexts::new()
            .with_cycle_phase(CyclePhase::Luteal)
            .with_weather_tokens(weather(&[tokens::UV_HIGH]));

        let briefing = select_briefing(&active, &book).unwrap();
        assert_eq!(briefing.context_token.as_str(), tokens::LUTEAL);
        assert_eq!(briefing.title, "Luteal phase");
    }

    #[test]
    fn test_weather_briefing_uses_first_token() {
        let book = build_default_rule_book();
        let active = ActiveContexts::new()
            .with_weather_tokens(weather(&[tokens::UV_HIGH, tokens::WINDY, tokens::COLD]));

        let briefing = select_briefing(&active, &book).unwrap();
        assert_eq!(briefing.context_token.as_str(), tokens::COLD);
    }

    #[test]
    fn test_missing_briefing_gets_placeholder() {
        let mut book = RuleBook::default();
        book.insert(RuleSet {
            adaptation_type: AdaptationType::Cycle,
            version: 1,
            rules: vec![],
            briefings: vec![],
        });
        let active = ActiveContexts::new().with_cycle_phase(CyclePhase::Ovulation);

        let briefing = select_briefing(&active, &book).unwrap();
        assert_eq!(briefing.title, "ovulation");
        assert!(briefing.summary.is_empty());
        assert!(briefing.tips.is_empty());
        assert!(briefing.warnings.is_empty());
    }

    #[test]
    fn test_empty_weather_falls_through_to_none() {
        let active = ActiveContexts::new().with_weather_tokens(TokenSet::new());
        assert!(select_briefing(&active, &build_default_rule_book()).is_none());
    }
}
