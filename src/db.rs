use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row, TransactionBehavior};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{
    validate_card, validate_deck, Card, CardWithRecord, Deck, DeckSummary, Grade, ReviewAnswer,
    ReviewSession, SchedulingRecord, SessionSummary,
};
use crate::store::{CardStore, SchedulingStore, SessionStore};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CARD_WITH_RECORD_COLUMNS: &str = r#"
    c.id, c.deck_id, c.question, c.answer, c.created_at,
    s.card_id, s.interval, s.repetitions, s.ease_factor, s.next_review, s.last_grade
"#;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS decks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                deck_id INTEGER NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
            );

            -- SM-2 state, one row per card once it has been graded
            CREATE TABLE IF NOT EXISTS card_srs (
                card_id INTEGER PRIMARY KEY,
                interval INTEGER NOT NULL DEFAULT 0 CHECK(interval >= 0),
                repetitions INTEGER NOT NULL DEFAULT 0 CHECK(repetitions >= 0),
                ease_factor REAL NOT NULL DEFAULT 2.5 CHECK(ease_factor >= 1.3),
                next_review TEXT,
                last_grade INTEGER CHECK(last_grade BETWEEN 0 AND 5),
                FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS review_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                deck_id INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                finished_at TEXT,
                FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
            );

            -- Append-only answer log
            CREATE TABLE IF NOT EXISTS review_answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL,
                card_id INTEGER NOT NULL,
                rating INTEGER NOT NULL CHECK(rating BETWEEN 0 AND 5),
                note TEXT,
                answered_at TEXT NOT NULL,
                FOREIGN KEY (session_id) REFERENCES review_sessions(id) ON DELETE CASCADE,
                FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_open
                ON review_sessions(deck_id) WHERE finished_at IS NULL;
            CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck_id);
            CREATE INDEX IF NOT EXISTS idx_srs_next_review ON card_srs(next_review);
            CREATE INDEX IF NOT EXISTS idx_sessions_deck ON review_sessions(deck_id);
            CREATE INDEX IF NOT EXISTS idx_answers_session ON review_answers(session_id);
            CREATE INDEX IF NOT EXISTS idx_answers_card ON review_answers(card_id);
            "#,
        )?;

        tracing::debug!("schema ready");
        Ok(())
    }

    /// The underlying connection, usable wherever a read-only store is needed.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` as one unit of work.
    ///
    /// The write lock is taken up front (`BEGIN IMMEDIATE`). Returning `Ok`
    /// commits; returning `Err`, or unwinding out of `f`, rolls everything back.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(error = %e, "rolling back");
                Err(e)
            }
        }
    }

    // Deck operations
    pub fn create_deck(&self, title: &str, description: Option<&str>) -> Result<i64> {
        validate_deck(title, description)?;
        self.conn.execute(
            "INSERT INTO decks (title, description, created_at) VALUES (?1, ?2, ?3)",
            params![title.trim(), description, Utc::now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_deck(&self, id: i64) -> Result<Option<Deck>> {
        self.conn.get_deck(id)
    }

    /// Decks newest first, with card and due counts as of `today`.
    pub fn list_decks(&self, today: NaiveDate) -> Result<Vec<DeckSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT d.id, d.title, d.description, d.created_at,
                   COUNT(c.id),
                   COALESCE(SUM(CASE
                       WHEN c.id IS NULL THEN 0
                       WHEN s.card_id IS NULL OR s.next_review IS NULL OR s.next_review <= ?1 THEN 1
                       ELSE 0
                   END), 0)
            FROM decks d
            LEFT JOIN cards c ON c.deck_id = d.id
            LEFT JOIN card_srs s ON s.card_id = c.id
            GROUP BY d.id
            ORDER BY d.id DESC
            "#,
        )?;

        let rows = stmt.query_map(params![today], |row| {
            Ok(DeckSummary {
                deck: row_to_deck(row)?,
                card_count: row.get(4)?,
                due_count: row.get(5)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn delete_deck(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM decks WHERE id = ?1", params![id])?;
        if rows > 0 {
            tracing::info!(deck_id = id, "deck deleted");
        }
        Ok(rows > 0)
    }

    // Card operations
    pub fn add_card(&self, deck_id: i64, question: &str, answer: &str) -> Result<i64> {
        validate_card(question, answer)?;
        self.require_deck(deck_id)?;

        self.conn.execute(
            "INSERT INTO cards (deck_id, question, answer, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![deck_id, question.trim(), answer.trim(), Utc::now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_card(&self, card_id: i64, deck_id: i64) -> Result<Option<Card>> {
        self.conn.get_card(card_id, deck_id)
    }

    /// Cards of a deck by id, each with its scheduling record if graded.
    pub fn list_cards(&self, deck_id: i64) -> Result<Vec<CardWithRecord>> {
        self.require_deck(deck_id)?;

        let sql = format!(
            r#"
            SELECT {}
            FROM cards c
            LEFT JOIN card_srs s ON s.card_id = c.id
            WHERE c.deck_id = ?1
            ORDER BY c.id ASC
            "#,
            CARD_WITH_RECORD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![deck_id], row_to_card_with_record)?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_card(
        &self,
        deck_id: i64,
        card_id: i64,
        question: &str,
        answer: &str,
    ) -> Result<Card> {
        validate_card(question, answer)?;

        let rows = self.conn.execute(
            "UPDATE cards SET question = ?1, answer = ?2 WHERE id = ?3 AND deck_id = ?4",
            params![question.trim(), answer.trim(), card_id, deck_id],
        )?;
        if rows == 0 {
            return Err(Error::card_not_found(card_id));
        }

        self.conn
            .get_card(card_id, deck_id)?
            .ok_or_else(|| Error::card_not_found(card_id))
    }

    pub fn delete_card(&self, deck_id: i64, card_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM cards WHERE id = ?1 AND deck_id = ?2",
            params![card_id, deck_id],
        )?;
        Ok(rows > 0)
    }

    pub fn get_record(&self, card_id: i64) -> Result<Option<SchedulingRecord>> {
        self.conn.get_record(card_id)
    }

    // Session history
    pub fn list_sessions(&self, deck_id: i64) -> Result<Vec<SessionSummary>> {
        self.require_deck(deck_id)?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT rs.id, rs.deck_id, rs.started_at, rs.finished_at, COUNT(ra.id)
            FROM review_sessions rs
            LEFT JOIN review_answers ra ON ra.session_id = rs.id
            WHERE rs.deck_id = ?1
            GROUP BY rs.id
            ORDER BY rs.started_at DESC, rs.id DESC
            "#,
        )?;

        let rows = stmt.query_map(params![deck_id], |row| {
            Ok(SessionSummary {
                session: row_to_session(row)?,
                answer_count: row.get(4)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn list_answers(&self, session_id: i64) -> Result<Vec<ReviewAnswer>> {
        let exists: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM review_sessions WHERE id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(Error::session_not_found(session_id));
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, session_id, card_id, rating, note, answered_at
            FROM review_answers
            WHERE session_id = ?1
            ORDER BY id ASC
            "#,
        )?;

        let rows = stmt.query_map(params![session_id], |row| {
            Ok(ReviewAnswer {
                id: row.get(0)?,
                session_id: row.get(1)?,
                card_id: row.get(2)?,
                rating: grade_column(row, 3)?,
                note: row.get(4)?,
                answered_at: row.get(5)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_stats(&self, today: NaiveDate) -> Result<Stats> {
        let total_decks: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM decks", [], |row| row.get(0))?;

        let total_cards: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;

        let due_today: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM cards c
            LEFT JOIN card_srs s ON s.card_id = c.id
            WHERE s.card_id IS NULL OR s.next_review IS NULL OR s.next_review <= ?1
            "#,
            params![today],
            |row| row.get(0),
        )?;

        let learned_cards: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM card_srs WHERE repetitions >= ?1",
            params![SchedulingRecord::LEARNED_REPETITIONS],
            |row| row.get(0),
        )?;

        let reviewed_cards: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT card_id) FROM review_answers",
            [],
            |row| row.get(0),
        )?;

        let total_answers: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM review_answers", [], |row| row.get(0))?;

        Ok(Stats {
            total_decks,
            total_cards,
            due_today,
            learned_cards,
            reviewed_cards,
            total_answers,
        })
    }

    fn require_deck(&self, deck_id: i64) -> Result<()> {
        match self.conn.get_deck(deck_id)? {
            Some(_) => Ok(()),
            None => Err(Error::deck_not_found(deck_id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_decks: i64,
    pub total_cards: i64,
    pub due_today: i64,
    pub learned_cards: i64,
    pub reviewed_cards: i64,
    pub total_answers: i64,
}

impl CardStore for Connection {
    fn get_deck(&self, deck_id: i64) -> Result<Option<Deck>> {
        let deck = self.query_row(
            "SELECT id, title, description, created_at FROM decks WHERE id = ?1",
            params![deck_id],
            row_to_deck,
        );

        match deck {
            Ok(d) => Ok(Some(d)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_card(&self, card_id: i64, deck_id: i64) -> Result<Option<Card>> {
        let card = self.query_row(
            r#"
            SELECT id, deck_id, question, answer, created_at
            FROM cards
            WHERE id = ?1 AND deck_id = ?2
            "#,
            params![card_id, deck_id],
            row_to_card,
        );

        match card {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_cards(&self, deck_id: i64) -> Result<Vec<Card>> {
        let mut stmt = self.prepare(
            r#"
            SELECT id, deck_id, question, answer, created_at
            FROM cards
            WHERE deck_id = ?1
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![deck_id], row_to_card)?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl SchedulingStore for Connection {
    fn get_record(&self, card_id: i64) -> Result<Option<SchedulingRecord>> {
        let record = self.query_row(
            r#"
            SELECT card_id, interval, repetitions, ease_factor, next_review, last_grade
            FROM card_srs
            WHERE card_id = ?1
            "#,
            params![card_id],
            |row| row_to_record(row, 0),
        );

        match record {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn upsert_record(&self, record: &SchedulingRecord) -> Result<()> {
        self.execute(
            r#"
            INSERT INTO card_srs (card_id, interval, repetitions, ease_factor, next_review, last_grade)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(card_id) DO UPDATE SET
                interval = excluded.interval,
                repetitions = excluded.repetitions,
                ease_factor = excluded.ease_factor,
                next_review = excluded.next_review,
                last_grade = excluded.last_grade
            "#,
            params![
                record.card_id,
                record.interval,
                record.repetitions,
                record.ease_factor,
                record.next_review,
                record.last_grade.map(Grade::value),
            ],
        )?;
        Ok(())
    }

    fn due_cards(&self, deck_id: i64, today: NaiveDate, limit: usize) -> Result<Vec<CardWithRecord>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM cards c
            JOIN card_srs s ON s.card_id = c.id
            WHERE c.deck_id = ?1
              AND s.next_review IS NOT NULL
              AND s.next_review <= ?2
            ORDER BY s.next_review ASC, c.id ASC
            LIMIT ?3
            "#,
            CARD_WITH_RECORD_COLUMNS
        );
        let mut stmt = self.prepare(&sql)?;
        let rows = stmt.query_map(
            params![deck_id, today, limit as i64],
            row_to_card_with_record,
        )?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn new_cards(&self, deck_id: i64, limit: usize) -> Result<Vec<CardWithRecord>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM cards c
            LEFT JOIN card_srs s ON s.card_id = c.id
            WHERE c.deck_id = ?1
              AND (s.card_id IS NULL OR s.next_review IS NULL)
            ORDER BY c.id ASC
            LIMIT ?2
            "#,
            CARD_WITH_RECORD_COLUMNS
        );
        let mut stmt = self.prepare(&sql)?;
        let rows = stmt.query_map(params![deck_id, limit as i64], row_to_card_with_record)?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl SessionStore for Connection {
    fn get_open_session(&self, deck_id: i64) -> Result<Option<ReviewSession>> {
        let session = self.query_row(
            r#"
            SELECT id, deck_id, started_at, finished_at
            FROM review_sessions
            WHERE deck_id = ?1 AND finished_at IS NULL
            ORDER BY started_at DESC, id DESC
            LIMIT 1
            "#,
            params![deck_id],
            row_to_session,
        );

        match session {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create_session(&self, deck_id: i64, started_at: DateTime<Utc>) -> Result<ReviewSession> {
        self.execute(
            "INSERT INTO review_sessions (deck_id, started_at) VALUES (?1, ?2)",
            params![deck_id, started_at],
        )?;

        Ok(ReviewSession {
            id: self.last_insert_rowid(),
            deck_id,
            started_at,
            finished_at: None,
        })
    }

    fn close_session(&self, session_id: i64, finished_at: DateTime<Utc>) -> Result<()> {
        let rows = self.execute(
            "UPDATE review_sessions SET finished_at = ?1 WHERE id = ?2 AND finished_at IS NULL",
            params![finished_at, session_id],
        )?;
        if rows == 0 {
            return Err(Error::session_not_found(session_id));
        }
        Ok(())
    }

    fn append_answer(
        &self,
        session_id: i64,
        card_id: i64,
        rating: Grade,
        note: Option<&str>,
        answered_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.execute(
            r#"
            INSERT INTO review_answers (session_id, card_id, rating, note, answered_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![session_id, card_id, rating.value(), note, answered_at],
        )?;
        Ok(self.last_insert_rowid())
    }
}

fn row_to_deck(row: &Row) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn row_to_card(row: &Row) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn row_to_session(row: &Row) -> rusqlite::Result<ReviewSession> {
    Ok(ReviewSession {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
    })
}

// Record columns start at `base`: card_id, interval, repetitions, ease_factor, next_review, last_grade
fn row_to_record(row: &Row, base: usize) -> rusqlite::Result<SchedulingRecord> {
    let last_grade: Option<i64> = row.get(base + 5)?;
    let last_grade = match last_grade {
        Some(raw) => Some(to_grade(raw, base + 5)?),
        None => None,
    };

    Ok(SchedulingRecord {
        card_id: row.get(base)?,
        interval: row.get(base + 1)?,
        repetitions: row.get(base + 2)?,
        ease_factor: row.get(base + 3)?,
        next_review: row.get(base + 4)?,
        last_grade,
    })
}

fn row_to_card_with_record(row: &Row) -> rusqlite::Result<CardWithRecord> {
    let card = row_to_card(row)?;
    let srs_card_id: Option<i64> = row.get(5)?;
    let record = match srs_card_id {
        Some(_) => Some(row_to_record(row, 5)?),
        None => None,
    };
    Ok(CardWithRecord { card, record })
}

fn grade_column(row: &Row, idx: usize) -> rusqlite::Result<Grade> {
    let raw: i64 = row.get(idx)?;
    to_grade(raw, idx)
}

fn to_grade(raw: i64, idx: usize) -> rusqlite::Result<Grade> {
    Grade::new(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}
