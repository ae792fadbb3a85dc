use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MAX_QUESTION_LEN: usize = 1000;
pub const MAX_ANSWER_LEN: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub deck_id: i64,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

/// SM-2 recall quality, 0 (blackout) through 5 (perfect recall).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Grade(u8);

impl Grade {
    pub const MAX: u8 = 5;
    /// Lowest grade that counts as a successful recall.
    pub const PASSING: u8 = 3;

    pub fn new(value: i64) -> Result<Self> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(Grade(value as u8))
        } else {
            Err(Error::InvalidGrade(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= Self::PASSING
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "Blackout",
            1 => "Wrong",
            2 => "Wrong (familiar)",
            3 => "Hard",
            4 => "Good",
            _ => "Perfect",
        }
    }

    pub fn all() -> impl Iterator<Item = Grade> {
        (0..=Self::MAX).map(Grade)
    }
}

impl TryFrom<i64> for Grade {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Grade::new(value)
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> u8 {
        grade.0
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-card SM-2 state. Absent until the card is graded for the first time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingRecord {
    pub card_id: i64,
    pub interval: u32,
    pub repetitions: u32,
    pub ease_factor: f64,
    pub next_review: Option<NaiveDate>,
    pub last_grade: Option<Grade>,
}

impl SchedulingRecord {
    pub const INITIAL_EASE: f64 = 2.5;
    pub const MIN_EASE: f64 = 1.3;
    /// Consecutive successful recalls after which a card counts as learned.
    pub const LEARNED_REPETITIONS: u32 = 3;
    /// Longest gap between reviews, in days.
    pub const MAX_INTERVAL: u32 = 36_500;

    /// Latest review date that keeps its `YYYY-MM-DD` text form ordered
    /// correctly against other stored dates.
    pub fn latest_review_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
    }

    pub fn new(card_id: i64) -> Self {
        Self {
            card_id,
            interval: 0,
            repetitions: 0,
            ease_factor: Self::INITIAL_EASE,
            next_review: None,
            last_grade: None,
        }
    }

    pub fn is_unscheduled(&self) -> bool {
        self.next_review.is_none()
    }

    pub fn is_due(&self, today: NaiveDate) -> bool {
        matches!(self.next_review, Some(next) if next <= today)
    }

    pub fn is_learned(&self) -> bool {
        self.repetitions >= Self::LEARNED_REPETITIONS
    }

    pub fn status_label(&self, today: NaiveDate) -> &'static str {
        if self.is_unscheduled() {
            "New"
        } else if self.is_due(today) {
            "Due"
        } else if self.is_learned() {
            "Learned"
        } else {
            "Learning"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardWithRecord {
    pub card: Card,
    pub record: Option<SchedulingRecord>,
}

impl CardWithRecord {
    pub fn status_label(&self, today: NaiveDate) -> &'static str {
        match &self.record {
            Some(record) => record.status_label(today),
            None => "New",
        }
    }

    pub fn is_due_or_new(&self, today: NaiveDate) -> bool {
        match &self.record {
            Some(record) => record.is_unscheduled() || record.is_due(today),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckSummary {
    pub deck: Deck,
    pub card_count: i64,
    /// Cards that are due or have never been scheduled.
    pub due_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSession {
    pub id: i64,
    pub deck_id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ReviewSession {
    pub fn is_open(&self) -> bool {
        self.finished_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session: ReviewSession,
    pub answer_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAnswer {
    pub id: i64,
    pub session_id: i64,
    pub card_id: i64,
    pub rating: Grade,
    pub note: Option<String>,
    pub answered_at: DateTime<Utc>,
}

/// Result of grading one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub record: SchedulingRecord,
    pub session_id: i64,
    pub session_closed: bool,
    pub next_card: Option<CardWithRecord>,
}

pub fn validate_deck(title: &str, description: Option<&str>) -> Result<()> {
    check_text("title", title, MAX_TITLE_LEN)?;
    if let Some(desc) = description {
        if desc.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(Error::Validation(format!(
                "description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }
    }
    Ok(())
}

pub fn validate_card(question: &str, answer: &str) -> Result<()> {
    check_text("question", question, MAX_QUESTION_LEN)?;
    check_text("answer", answer, MAX_ANSWER_LEN)
}

fn check_text(field: &str, value: &str, max_len: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    if value.chars().count() > max_len {
        return Err(Error::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(())
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
