//! Terminal presentation for engine output.
//!
//! The core crate only emits semantic tags; glyphs and labels are chosen here.

use skincycle_core::{CyclePhase, Emphasis, UvLevel};

/// Glyph and short label for a step's emphasis
pub struct EmphasisStyle {
    pub glyph: &'static str,
    pub label: &'static str,
}

pub fn emphasis_style(emphasis: Emphasis) -> EmphasisStyle {
    match emphasis {
        Emphasis::Normal => EmphasisStyle {
            glyph: "•",
            label: "",
        },
        Emphasis::Emphasize => EmphasisStyle {
            glyph: "★",
            label: "focus",
        },
        Emphasis::Reduce => EmphasisStyle {
            glyph: "↓",
            label: "go easy",
        },
        Emphasis::Skip => EmphasisStyle {
            glyph: "✗",
            label: "skip today",
        },
    }
}

pub fn phase_glyph(phase: CyclePhase) -> &'static str {
    match phase {
        CyclePhase::Menstrual => "◐",
        CyclePhase::Follicular => "◑",
        CyclePhase::Ovulation => "●",
        CyclePhase::Luteal => "◒",
    }
}

pub fn uv_label(level: UvLevel) -> &'static str {
    match level {
        UvLevel::Low => "Low",
        UvLevel::Moderate => "Moderate",
        UvLevel::High => "High",
        UvLevel::Extreme => "Extreme",
    }
}

/// Text progress bar, `width` cells wide
pub fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "█".repeat(filled), "·".repeat(width - filled))
}
