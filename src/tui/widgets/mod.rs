pub mod dashboard;
pub mod deck_detail;
pub mod decks;
pub mod review;

use chrono::NaiveDate;
use ratatui::style::Color;

use cardwise::SchedulingRecord;

pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub(crate) fn status_color(label: &str) -> Color {
    match label {
        "New" => Color::Cyan,
        "Due" => Color::Yellow,
        "Learned" => Color::Green,
        _ => Color::White,
    }
}

/// "today", "in 3d", "2d ago" or "-" for unscheduled cards.
pub(crate) fn format_next_review(record: Option<&SchedulingRecord>, today: NaiveDate) -> String {
    let Some(next) = record.and_then(|r| r.next_review) else {
        return "-".to_string();
    };

    let days = (next - today).num_days();
    match days {
        0 => "today".to_string(),
        d if d > 0 => format!("in {}d", d),
        d => format!("{}d ago", -d),
    }
}

/// Ease factor on a 1.3..=3.0 scale as a five-cell bar.
pub(crate) fn ease_bar(ease: f64) -> String {
    let span = 3.0 - SchedulingRecord::MIN_EASE;
    let ratio = ((ease - SchedulingRecord::MIN_EASE) / span).clamp(0.0, 1.0);
    let filled = (ratio * 5.0).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(5 - filled))
}
