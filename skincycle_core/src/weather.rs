//! Weather context derivation.
//!
//! Turns a [`WeatherReading`] into a set of non-exclusive context tokens and a
//! [`WeatherRecommendation`]. Stale readings are flagged but still classified.

use crate::types::tokens;
use crate::{ContextToken, TokenSet, UvLevel, WeatherReading, WeatherRecommendation};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Readings older than this are reported as stale
pub const STALE_AFTER_SECONDS: i64 = 3600;

/// Humidity below this (percent) is `low_humidity`
pub const LOW_HUMIDITY_BELOW: f64 = 35.0;
/// Humidity above this (percent) is `high_humidity`
pub const HIGH_HUMIDITY_ABOVE: f64 = 70.0;
/// Wind above this (km/h) is `windy`
pub const WINDY_ABOVE_KMH: f64 = 25.0;
/// Temperature below this (°C) is `cold`
pub const COLD_BELOW_C: f64 = 8.0;
/// Temperature above this (°C) is `hot`
pub const HOT_ABOVE_C: f64 = 30.0;

pub const RETINOID_MORNING_WARNING: &str = "Avoid retinoids and acids in morning routine";

/// Everything derived from one reading
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeatherContext {
    pub uv_level: UvLevel,
    pub tokens: TokenSet,
    pub recommendation: WeatherRecommendation,
    pub is_stale: bool,
}

impl WeatherReading {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }

    /// Older than one hour
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.is_stale_after(now, STALE_AFTER_SECONDS)
    }

    pub fn is_stale_after(&self, now: DateTime<Utc>, max_age_seconds: i64) -> bool {
        self.age(now) > Duration::seconds(max_age_seconds)
    }
}

/// UV tier: 0-2 low, 3-7 moderate, 8-10 high, 11+ extreme
pub fn classify_uv(uv_index: u32) -> UvLevel {
    match uv_index {
        0..=2 => UvLevel::Low,
        3..=7 => UvLevel::Moderate,
        8..=10 => UvLevel::High,
        _ => UvLevel::Extreme,
    }
}

/// Token set for a reading
///
/// The UV token is always present; every other token is an independent check.
pub fn derive_context_tokens(reading: &WeatherReading) -> TokenSet {
    let mut set = TokenSet::new();
    set.insert(classify_uv(reading.uv_index).token());

    let checks = [
        (reading.humidity < LOW_HUMIDITY_BELOW, tokens::LOW_HUMIDITY),
        (reading.humidity > HIGH_HUMIDITY_ABOVE, tokens::HIGH_HUMIDITY),
        (reading.wind_speed_kmh > WINDY_ABOVE_KMH, tokens::WINDY),
        (reading.temperature_c < COLD_BELOW_C, tokens::COLD),
        (reading.temperature_c > HOT_ABOVE_C, tokens::HOT),
        (reading.has_snow, tokens::SNOW),
    ];
    set.extend(
        checks
            .into_iter()
            .filter(|(active, _)| *active)
            .map(|(_, key)| ContextToken::new(key)),
    );

    set
}

/// Advice for a reading
///
/// Sources are applied in a fixed order: UV, humidity, wind, temperature,
/// snow. The first source to set a texture adjustment keeps it; tips and
/// warnings accumulate.
pub fn build_recommendation(reading: &WeatherReading) -> WeatherRecommendation {
    let mut rec = RecommendationBuilder::default();

    match classify_uv(reading.uv_index) {
        UvLevel::Low => {
            rec.spf("SPF 15+");
            rec.tip("A daily SPF is still worth wearing on low UV days");
        }
        UvLevel::Moderate => {
            rec.spf("SPF 30+");
            rec.tip("Reapply sunscreen every 2 hours when outdoors");
        }
        UvLevel::High => {
            rec.spf("SPF 50+");
            rec.tip("Reapply sunscreen every 2 hours when outdoors");
            rec.tip("Wear a wide-brimmed hat and sunglasses");
            rec.warning(RETINOID_MORNING_WARNING);
        }
        UvLevel::Extreme => {
            rec.spf("SPF 50+ PA++++");
            rec.tip("Reapply sunscreen every 2 hours, more often if sweating");
            rec.tip("Seek shade between 10am and 4pm");
            rec.warning(RETINOID_MORNING_WARNING);
            rec.warning("Extreme UV: limit time outdoors");
        }
    }

    if reading.humidity < LOW_HUMIDITY_BELOW {
        rec.texture("Switch to a richer, cream-based moisturizer");
        rec.tip("Layer a hydrating serum with hyaluronic acid under moisturizer");
        rec.warning("Dry air can weaken the skin barrier");
    } else if reading.humidity > HIGH_HUMIDITY_ABOVE {
        rec.texture("Use lightweight, gel-based textures");
        rec.tip("Blot excess oil instead of washing more often");
    }

    if reading.wind_speed_kmh > WINDY_ABOVE_KMH {
        rec.tip("Apply a barrier balm to cheeks and lips before going out");
        rec.warning("Strong wind can cause windburn and dehydration");
    }

    if reading.temperature_c < COLD_BELOW_C {
        rec.texture("Seal moisture in with an occlusive final layer");
        rec.tip("Cleanse with lukewarm water, never hot");
    } else if reading.temperature_c > HOT_ABOVE_C {
        rec.texture("Choose oil-free, non-comedogenic products");
        rec.tip("Keep a facial mist on hand to cool down");
    }

    if reading.has_snow {
        rec.warning("Snow reflects UV rays; wear sunscreen even in the cold");
    }

    rec.finish()
}

/// Tokens, recommendation and staleness for a reading
pub fn derive_weather_context(
    reading: &WeatherReading,
    now: DateTime<Utc>,
    stale_after_seconds: i64,
) -> WeatherContext {
    let is_stale = reading.is_stale_after(now, stale_after_seconds);
    if is_stale {
        tracing::info!(
            "Weather reading is {} minutes old, classifying anyway",
            reading.age(now).num_minutes()
        );
    }

    WeatherContext {
        uv_level: classify_uv(reading.uv_index),
        tokens: derive_context_tokens(reading),
        recommendation: build_recommendation(reading),
        is_stale,
    }
}

#[derive(Default)]
struct RecommendationBuilder {
    inner: WeatherRecommendation,
}

impl RecommendationBuilder {
    fn spf(&mut self, level: &str) {
        self.inner.spf_level = level.to_string();
    }

    fn texture(&mut self, advice: &str) {
        if self.inner.texture_adjustment.is_none() {
            self.inner.texture_adjustment = Some(advice.to_string());
        }
    }

    fn tip(&mut self, tip: &str) {
        push_unique(&mut self.inner.tips, tip);
    }

    fn warning(&mut self, warning: &str) {
        push_unique(&mut self.inner.warnings, warning);
    }

    fn finish(self) -> WeatherRecommendation {
        self.inner
    }
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}
