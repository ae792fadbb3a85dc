//! Review scheduling: what to show next, and what happens when a card is graded.

use crate::clock::{Clock, SystemClock};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{AnswerOutcome, CardWithRecord, Grade, SchedulingRecord};
use crate::sm2;
use crate::store::{CardStore, ReviewStore, SchedulingStore};

pub struct Scheduler<C: Clock = SystemClock> {
    clock: C,
}

impl Scheduler<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl Default for Scheduler<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The next card to review in a deck, or `None` when nothing is due.
    ///
    /// Scheduled cards whose review date has arrived come first (earliest
    /// date, then lowest id). Only once those are exhausted do never-scheduled
    /// cards surface, lowest id first.
    pub fn next_card<S>(&self, store: &S, deck_id: i64) -> Result<Option<CardWithRecord>>
    where
        S: CardStore + SchedulingStore + ?Sized,
    {
        if store.get_deck(deck_id)?.is_none() {
            return Err(Error::deck_not_found(deck_id));
        }

        let today = self.clock.today();
        if let Some(due) = store.due_cards(deck_id, today, 1)?.into_iter().next() {
            return Ok(Some(due));
        }

        Ok(store.new_cards(deck_id, 1)?.into_iter().next())
    }

    /// Grade a card and advance the deck's review session.
    ///
    /// All writes (session, scheduling record, answer log, session close)
    /// commit together or not at all.
    pub fn record_answer(
        &self,
        db: &mut Database,
        deck_id: i64,
        card_id: i64,
        grade: i64,
        note: Option<&str>,
    ) -> Result<AnswerOutcome> {
        let grade = Grade::new(grade).map_err(|e| {
            tracing::warn!(deck_id, card_id, grade, "rejected grade");
            e
        })?;

        db.transaction(|tx| self.grade_in(tx, deck_id, card_id, grade, note))
    }

    /// The body of [`Scheduler::record_answer`], against an already-open unit of work.
    pub fn grade_in<S>(
        &self,
        store: &S,
        deck_id: i64,
        card_id: i64,
        grade: Grade,
        note: Option<&str>,
    ) -> Result<AnswerOutcome>
    where
        S: ReviewStore + ?Sized,
    {
        let card = store
            .get_card(card_id, deck_id)?
            .ok_or_else(|| Error::card_not_found(card_id))?;

        let now = self.clock.now();
        let session = match store.get_open_session(deck_id)? {
            Some(session) => session,
            None => {
                let session = store.create_session(deck_id, now)?;
                tracing::info!(deck_id, session_id = session.id, "review session opened");
                session
            }
        };

        let record = store
            .get_record(card.id)?
            .unwrap_or_else(|| SchedulingRecord::new(card.id));
        let updated = sm2::apply_grade(&record, grade, self.clock.today());
        store.upsert_record(&updated)?;
        store.append_answer(session.id, card.id, grade, note, now)?;

        tracing::debug!(
            card_id = card.id,
            grade = grade.value(),
            interval = updated.interval,
            repetitions = updated.repetitions,
            ease_factor = updated.ease_factor,
            "card graded"
        );

        let next_card = self.next_card(store, deck_id)?;
        let session_closed = next_card.is_none();
        if session_closed {
            store.close_session(session.id, now)?;
            tracing::info!(deck_id, session_id = session.id, "review session finished");
        }

        Ok(AnswerOutcome {
            record: updated,
            session_id: session.id,
            session_closed,
            next_card,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::SessionStore;
    use chrono::{Duration, NaiveDate};

    fn day0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn scheduler_on(date: NaiveDate) -> Scheduler<FixedClock> {
        Scheduler::with_clock(FixedClock::on(date))
    }

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        db
    }

    fn deck_with_cards(db: &Database, n: usize) -> (i64, Vec<i64>) {
        let deck = db.create_deck("Deck", None).unwrap();
        let cards = (0..n)
            .map(|i| {
                db.add_card(deck, &format!("question {}", i), &format!("answer {}", i))
                    .unwrap()
            })
            .collect();
        (deck, cards)
    }

    fn schedule(db: &Database, card_id: i64, next_review: Option<NaiveDate>) {
        db.conn()
            .upsert_record(&SchedulingRecord {
                next_review,
                ..SchedulingRecord::new(card_id)
            })
            .unwrap();
    }

    fn count_answers(db: &Database) -> i64 {
        db.conn()
            .query_row("SELECT COUNT(*) FROM review_answers", [], |row| row.get(0))
            .unwrap()
    }

    mod next_card_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn empty_deck_has_nothing_due() {
            let db = setup_db();
            let (deck, _) = deck_with_cards(&db, 0);
            let next = scheduler_on(day0()).next_card(db.conn(), deck).unwrap();
            assert!(next.is_none());
        }

        #[test]
        fn unknown_deck_is_not_found() {
            let db = setup_db();
            let err = scheduler_on(day0()).next_card(db.conn(), 77).unwrap_err();
            assert!(matches!(err, Error::NotFound { entity: "deck", id: 77 }));
        }

        #[test]
        fn overdue_card_beats_new_card() {
            let db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 2);
            // the new card has the lower id, the overdue one must still win
            schedule(&db, cards[1], Some(day0() - Duration::days(1)));

            let next = scheduler_on(day0()).next_card(db.conn(), deck).unwrap().unwrap();
            assert_eq!(next.card.id, cards[1]);
        }

        #[test]
        fn tie_on_date_goes_to_lower_id() {
            let db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 3);
            schedule(&db, cards[2], Some(day0()));
            schedule(&db, cards[1], Some(day0()));

            let next = scheduler_on(day0()).next_card(db.conn(), deck).unwrap().unwrap();
            assert_eq!(next.card.id, cards[1]);
        }

        #[test]
        fn earliest_due_date_first() {
            let db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 2);
            schedule(&db, cards[0], Some(day0()));
            schedule(&db, cards[1], Some(day0() - Duration::days(5)));

            let next = scheduler_on(day0()).next_card(db.conn(), deck).unwrap().unwrap();
            assert_eq!(next.card.id, cards[1]);
        }

        #[test]
        fn new_cards_in_insertion_order() {
            let db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 3);
            schedule(&db, cards[0], Some(day0() + Duration::days(3)));

            let next = scheduler_on(day0()).next_card(db.conn(), deck).unwrap().unwrap();
            assert_eq!(next.card.id, cards[1]);
            assert!(next.record.is_none());
        }

        #[test]
        fn future_cards_are_not_due() {
            let db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 1);
            schedule(&db, cards[0], Some(day0() + Duration::days(1)));

            let scheduler = scheduler_on(day0());
            assert!(scheduler.next_card(db.conn(), deck).unwrap().is_none());

            let tomorrow = scheduler_on(day0() + Duration::days(1));
            let next = tomorrow.next_card(db.conn(), deck).unwrap().unwrap();
            assert_eq!(next.card.id, cards[0]);
        }

        #[test]
        fn repeated_calls_are_stable() {
            let db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 4);
            schedule(&db, cards[3], Some(day0()));
            schedule(&db, cards[2], Some(day0()));

            let scheduler = scheduler_on(day0());
            let first = scheduler.next_card(db.conn(), deck).unwrap();
            for _ in 0..5 {
                assert_eq!(scheduler.next_card(db.conn(), deck).unwrap(), first);
            }
        }

        #[test]
        fn other_decks_do_not_leak_in() {
            let db = setup_db();
            let (deck, _) = deck_with_cards(&db, 0);
            let (other, other_cards) = deck_with_cards(&db, 1);
            schedule(&db, other_cards[0], Some(day0() - Duration::days(1)));

            let scheduler = scheduler_on(day0());
            assert!(scheduler.next_card(db.conn(), deck).unwrap().is_none());
            assert!(scheduler.next_card(db.conn(), other).unwrap().is_some());
        }
    }

    mod record_answer_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn far_future_review_is_not_due_today() {
            let mut db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 1);
            db.conn()
                .upsert_record(&SchedulingRecord {
                    interval: 3_000_000,
                    repetitions: 10,
                    next_review: Some(day0()),
                    ..SchedulingRecord::new(cards[0])
                })
                .unwrap();

            let scheduler = scheduler_on(day0());
            let outcome = scheduler
                .record_answer(&mut db, deck, cards[0], 5, None)
                .unwrap();

            let stored = db.get_record(cards[0]).unwrap().unwrap();
            let next = stored.next_review.unwrap();
            assert!(next > day0());
            assert!(next <= SchedulingRecord::latest_review_date());
            assert_eq!(stored.interval, SchedulingRecord::MAX_INTERVAL);

            assert!(outcome.session_closed);
            assert!(outcome.next_card.is_none());
            assert!(scheduler.next_card(db.conn(), deck).unwrap().is_none());
            assert_eq!(db.get_stats(day0()).unwrap().due_today, 0);
            assert_eq!(db.list_decks(day0()).unwrap()[0].due_count, 0);
        }

        #[test]
        fn first_answer_creates_record_and_session() {
            let mut db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 2);

            let outcome = scheduler_on(day0())
                .record_answer(&mut db, deck, cards[0], 5, None)
                .unwrap();

            assert_eq!(outcome.record.repetitions, 1);
            assert_eq!(outcome.record.interval, 1);
            assert!((outcome.record.ease_factor - 2.6).abs() < 1e-9);
            assert_eq!(outcome.record.next_review, Some(day0() + Duration::days(1)));
            assert_eq!(db.get_record(cards[0]).unwrap(), Some(outcome.record.clone()));

            // the second card is still new, so the session stays open
            assert!(!outcome.session_closed);
            assert_eq!(outcome.next_card.map(|c| c.card.id), Some(cards[1]));
            let open = db.conn().get_open_session(deck).unwrap().unwrap();
            assert_eq!(open.id, outcome.session_id);
        }

        #[test]
        fn answers_reuse_the_open_session() {
            let mut db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 3);
            let scheduler = scheduler_on(day0());

            let first = scheduler
                .record_answer(&mut db, deck, cards[0], 4, None)
                .unwrap();
            let second = scheduler
                .record_answer(&mut db, deck, cards[1], 2, Some("mixed up"))
                .unwrap();

            assert_eq!(first.session_id, second.session_id);
            let sessions = db.list_sessions(deck).unwrap();
            assert_eq!(sessions.len(), 1);
            assert_eq!(sessions[0].answer_count, 2);

            let answers = db.list_answers(first.session_id).unwrap();
            assert_eq!(answers[1].rating.value(), 2);
            assert_eq!(answers[1].note.as_deref(), Some("mixed up"));
        }

        #[test]
        fn grading_last_card_closes_session() {
            let mut db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 1);
            let scheduler = scheduler_on(day0());

            let outcome = scheduler
                .record_answer(&mut db, deck, cards[0], 4, None)
                .unwrap();

            assert!(outcome.session_closed);
            assert!(outcome.next_card.is_none());
            assert!(db.conn().get_open_session(deck).unwrap().is_none());

            let sessions = db.list_sessions(deck).unwrap();
            assert_eq!(sessions.len(), 1);
            assert!(sessions[0].session.finished_at.is_some());
            assert!(scheduler.next_card(db.conn(), deck).unwrap().is_none());
        }

        #[test]
        fn new_session_after_previous_closed() {
            let mut db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 1);

            let first = scheduler_on(day0())
                .record_answer(&mut db, deck, cards[0], 5, None)
                .unwrap();
            assert!(first.session_closed);

            let tomorrow = scheduler_on(day0() + Duration::days(1));
            let second = tomorrow
                .record_answer(&mut db, deck, cards[0], 5, None)
                .unwrap();

            assert_ne!(first.session_id, second.session_id);
            assert_eq!(second.record.repetitions, 2);
            assert_eq!(second.record.interval, 6);
            assert_eq!(db.list_sessions(deck).unwrap().len(), 2);
        }

        #[test]
        fn failed_card_comes_back_tomorrow() {
            let mut db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 1);

            let outcome = scheduler_on(day0())
                .record_answer(&mut db, deck, cards[0], 1, None)
                .unwrap();
            assert_eq!(outcome.record.repetitions, 0);
            assert_eq!(outcome.record.next_review, Some(day0() + Duration::days(1)));
            assert!(outcome.session_closed);

            let tomorrow = scheduler_on(day0() + Duration::days(1));
            let next = tomorrow.next_card(db.conn(), deck).unwrap().unwrap();
            assert_eq!(next.card.id, cards[0]);
        }

        #[test]
        fn invalid_grade_leaves_no_trace() {
            let mut db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 1);

            for bad in [-1, 6, 100] {
                let err = scheduler_on(day0())
                    .record_answer(&mut db, deck, cards[0], bad, None)
                    .unwrap_err();
                assert!(matches!(err, Error::InvalidGrade(g) if g == bad));
            }

            assert!(db.get_record(cards[0]).unwrap().is_none());
            assert!(db.list_sessions(deck).unwrap().is_empty());
            assert_eq!(count_answers(&db), 0);
        }

        #[test]
        fn card_from_other_deck_is_not_found() {
            let mut db = setup_db();
            let (deck, _) = deck_with_cards(&db, 1);
            let (_, foreign) = deck_with_cards(&db, 1);

            let err = scheduler_on(day0())
                .record_answer(&mut db, deck, foreign[0], 4, None)
                .unwrap_err();

            assert!(matches!(err, Error::NotFound { entity: "card", .. }));
            assert!(err.is_client_error());
            assert!(db.list_sessions(deck).unwrap().is_empty());
            assert!(db.get_record(foreign[0]).unwrap().is_none());
        }

        #[test]
        fn failure_mid_transaction_rolls_back() {
            let mut db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 2);
            // break the answer log so the append step fails after the record upsert
            db.conn()
                .execute_batch("DROP TABLE review_answers;")
                .unwrap();

            let err = scheduler_on(day0())
                .record_answer(&mut db, deck, cards[0], 4, None)
                .unwrap_err();

            assert!(matches!(err, Error::StoreUnavailable(_)));
            assert!(!err.is_client_error());
            assert!(db.get_record(cards[0]).unwrap().is_none());
            assert!(db.conn().get_open_session(deck).unwrap().is_none());
        }

        #[test]
        fn existing_record_is_advanced() {
            let mut db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 1);
            db.conn()
                .upsert_record(&SchedulingRecord {
                    card_id: cards[0],
                    interval: 6,
                    repetitions: 2,
                    ease_factor: 2.5,
                    next_review: Some(day0()),
                    last_grade: Some(Grade::new(4).unwrap()),
                })
                .unwrap();

            let outcome = scheduler_on(day0())
                .record_answer(&mut db, deck, cards[0], 4, None)
                .unwrap();

            assert_eq!(outcome.record.repetitions, 3);
            assert_eq!(outcome.record.interval, 15);
            assert_eq!(outcome.record.next_review, Some(day0() + Duration::days(15)));
        }

        #[test]
        fn review_whole_deck_until_done() {
            let mut db = setup_db();
            let (deck, cards) = deck_with_cards(&db, 3);
            let scheduler = scheduler_on(day0());

            let mut seen = Vec::new();
            let mut next = scheduler.next_card(db.conn(), deck).unwrap();
            let mut last_outcome = None;
            while let Some(cwr) = next {
                seen.push(cwr.card.id);
                let outcome = scheduler
                    .record_answer(&mut db, deck, cwr.card.id, 3, None)
                    .unwrap();
                next = outcome.next_card.clone();
                last_outcome = Some(outcome);
            }

            assert_eq!(seen, cards);
            let last = last_outcome.unwrap();
            assert!(last.session_closed);
            assert_eq!(db.list_sessions(deck).unwrap().len(), 1);
            assert_eq!(count_answers(&db), 3);
        }
    }
}
