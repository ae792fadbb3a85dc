//! Flashcard decks reviewed on an SM-2 spaced-repetition schedule.
//!
//! [`Scheduler`] answers "which card next?" for a deck and records grades,
//! keeping each card's [`SchedulingRecord`] and the deck's review session
//! up to date. Persistence goes through the traits in [`store`]; [`Database`]
//! implements them on SQLite.

pub mod clock;
pub mod db;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod sm2;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use db::{Database, Stats};
pub use error::{Error, Result};
pub use models::{
    AnswerOutcome, Card, CardWithRecord, Deck, DeckSummary, Grade, ReviewAnswer, ReviewSession,
    SchedulingRecord, SessionSummary,
};
pub use scheduler::Scheduler;
