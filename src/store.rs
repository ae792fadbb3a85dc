//! What the scheduler needs from persistence.
//!
//! Every method is a single query against whatever handle implements it. The
//! SQLite implementation lives in [`crate::db`] and is written for
//! `rusqlite::Connection`, so an open transaction satisfies these traits too.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::models::{Card, CardWithRecord, Deck, Grade, ReviewSession, SchedulingRecord};

pub trait CardStore {
    fn get_deck(&self, deck_id: i64) -> Result<Option<Deck>>;

    /// The card, only if it belongs to `deck_id`.
    fn get_card(&self, card_id: i64, deck_id: i64) -> Result<Option<Card>>;

    /// Cards of a deck ordered by id ascending.
    fn list_cards(&self, deck_id: i64) -> Result<Vec<Card>>;
}

pub trait SchedulingStore {
    fn get_record(&self, card_id: i64) -> Result<Option<SchedulingRecord>>;

    fn upsert_record(&self, record: &SchedulingRecord) -> Result<()>;

    /// Cards with `next_review <= today`, earliest first, ties by card id.
    fn due_cards(&self, deck_id: i64, today: NaiveDate, limit: usize) -> Result<Vec<CardWithRecord>>;

    /// Cards with no record or no `next_review`, by card id.
    fn new_cards(&self, deck_id: i64, limit: usize) -> Result<Vec<CardWithRecord>>;
}

pub trait SessionStore {
    fn get_open_session(&self, deck_id: i64) -> Result<Option<ReviewSession>>;

    fn create_session(&self, deck_id: i64, started_at: DateTime<Utc>) -> Result<ReviewSession>;

    fn close_session(&self, session_id: i64, finished_at: DateTime<Utc>) -> Result<()>;

    fn append_answer(
        &self,
        session_id: i64,
        card_id: i64,
        rating: Grade,
        note: Option<&str>,
        answered_at: DateTime<Utc>,
    ) -> Result<i64>;
}

/// Everything a grading action touches.
pub trait ReviewStore: CardStore + SchedulingStore + SessionStore {}

impl<T: CardStore + SchedulingStore + SessionStore + ?Sized> ReviewStore for T {}
