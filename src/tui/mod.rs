mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use cardwise::{AnswerOutcome, CardWithRecord, Clock, Database, DeckSummary, Scheduler, Stats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Decks,
    DeckDetail,
    Review,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Decks,
            View::Decks => View::Dashboard,
            View::DeckDetail => View::Decks,
            View::Review => View::DeckDetail,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Decks,
            View::Decks => View::Dashboard,
            View::DeckDetail => View::Decks,
            View::Review => View::DeckDetail,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn first(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(0);
        }
    }

    fn last(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(self.items.len() - 1);
        }
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

/// State of an in-progress review of one deck.
pub struct ReviewState {
    pub deck: DeckSummary,
    pub current: Option<CardWithRecord>,
    pub revealed: bool,
    pub answered: u32,
    pub last_outcome: Option<AnswerOutcome>,
}

pub struct App {
    db: Database,
    scheduler: Scheduler,
    pub view: View,
    pub stats: Stats,
    pub decks: StatefulList<DeckSummary>,
    pub selected_deck: Option<DeckSummary>,
    pub deck_cards: StatefulList<CardWithRecord>,
    pub review: Option<ReviewState>,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(db: Database, scheduler: Scheduler) -> Result<Self, Box<dyn std::error::Error>> {
        let today = scheduler.clock().today();
        let stats = db.get_stats(today)?;
        let decks = db.list_decks(today)?;

        Ok(Self {
            db,
            scheduler,
            view: View::Dashboard,
            stats,
            decks: StatefulList::with_items(decks),
            selected_deck: None,
            deck_cards: StatefulList::with_items(Vec::new()),
            review: None,
            status: None,
            should_quit: false,
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.scheduler.clock().today()
    }

    pub fn refresh_data(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let today = self.today();
        self.stats = self.db.get_stats(today)?;

        let selected = self.decks.selected;
        self.decks = StatefulList::with_items(self.db.list_decks(today)?);
        if let Some(i) = selected {
            if i < self.decks.items.len() {
                self.decks.selected = Some(i);
            }
        }

        if let Some(deck_id) = self.selected_deck.as_ref().map(|d| d.deck.id) {
            self.selected_deck = self
                .decks
                .items
                .iter()
                .find(|d| d.deck.id == deck_id)
                .cloned();
            match &self.selected_deck {
                Some(_) => {
                    self.deck_cards = StatefulList::with_items(self.db.list_cards(deck_id)?);
                }
                None => {
                    self.deck_cards = StatefulList::with_items(Vec::new());
                    if matches!(self.view, View::DeckDetail | View::Review) {
                        self.view = View::Decks;
                        self.review = None;
                    }
                }
            }
        }
        Ok(())
    }

    fn select_deck(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(summary) = self.decks.selected_item() {
            let cards = self.db.list_cards(summary.deck.id)?;
            self.selected_deck = Some(summary.clone());
            self.deck_cards = StatefulList::with_items(cards);
            self.view = View::DeckDetail;
        }
        Ok(())
    }

    fn start_review(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(deck) = self.selected_deck.clone() else {
            return Ok(());
        };

        let current = self.scheduler.next_card(self.db.conn(), deck.deck.id)?;
        if current.is_none() {
            self.status = Some(format!("Nothing due in '{}'", deck.deck.title));
            return Ok(());
        }

        self.review = Some(ReviewState {
            deck,
            current,
            revealed: false,
            answered: 0,
            last_outcome: None,
        });
        self.status = None;
        self.view = View::Review;
        Ok(())
    }

    fn leave_review(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.review = None;
        self.view = View::DeckDetail;
        self.refresh_data()
    }

    fn reveal(&mut self) {
        if let Some(review) = self.review.as_mut() {
            if review.current.is_some() {
                review.revealed = true;
            }
        }
    }

    fn grade_current(&mut self, grade: i64) -> Result<(), Box<dyn std::error::Error>> {
        let Some(review) = self.review.as_mut() else {
            return Ok(());
        };
        if !review.revealed {
            return Ok(());
        }
        let Some(current) = &review.current else {
            return Ok(());
        };

        let deck_id = review.deck.deck.id;
        let card_id = current.card.id;
        match self
            .scheduler
            .record_answer(&mut self.db, deck_id, card_id, grade, None)
        {
            Ok(outcome) => {
                review.current = outcome.next_card.clone();
                review.revealed = false;
                review.answered += 1;
                review.last_outcome = Some(outcome);
                self.status = None;
            }
            Err(e) if e.is_client_error() => {
                self.status = Some(e.to_string());
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn handle_key(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.view == View::Review {
            return self.handle_review_key(key);
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
            }

            KeyCode::Esc => {
                if self.view == View::DeckDetail {
                    self.view = View::Decks;
                    self.selected_deck = None;
                }
                self.status = None;
            }

            KeyCode::Char('h') | KeyCode::Left => match self.view {
                View::DeckDetail => {
                    self.view = View::Decks;
                    self.selected_deck = None;
                }
                _ => self.view = self.view.prev(),
            },
            KeyCode::Char('l') | KeyCode::Right => match self.view {
                View::Decks => self.select_deck()?,
                View::DeckDetail => {}
                _ => self.view = self.view.next(),
            },

            KeyCode::Tab => {
                if modifiers.contains(KeyModifiers::SHIFT) {
                    self.view = self.view.prev();
                } else {
                    self.view = self.view.next();
                }
            }
            KeyCode::BackTab => {
                self.view = self.view.prev();
            }

            KeyCode::Char('j') | KeyCode::Down => match self.view {
                View::Decks => self.decks.next(),
                View::DeckDetail => self.deck_cards.next(),
                _ => {}
            },
            KeyCode::Char('k') | KeyCode::Up => match self.view {
                View::Decks => self.decks.previous(),
                View::DeckDetail => self.deck_cards.previous(),
                _ => {}
            },

            KeyCode::Char('g') => match self.view {
                View::Decks => self.decks.first(),
                View::DeckDetail => self.deck_cards.first(),
                _ => {}
            },
            KeyCode::Char('G') => match self.view {
                View::Decks => self.decks.last(),
                View::DeckDetail => self.deck_cards.last(),
                _ => {}
            },

            KeyCode::Enter => match self.view {
                View::Decks => self.select_deck()?,
                View::DeckDetail => self.start_review()?,
                _ => {}
            },
            KeyCode::Char('s') if self.view == View::DeckDetail => self.start_review()?,

            _ => {}
        }
        Ok(())
    }

    fn handle_review_key(&mut self, key: KeyCode) -> Result<(), Box<dyn std::error::Error>> {
        match key {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left => {
                self.leave_review()?;
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                let finished = self
                    .review
                    .as_ref()
                    .map_or(true, |r| r.current.is_none());
                if finished {
                    self.leave_review()?;
                } else {
                    self.reveal();
                }
            }
            KeyCode::Char(c @ '0'..='5') => {
                let grade = i64::from(c as u8 - b'0');
                self.grade_current(grade)?;
            }
            _ => {}
        }
        Ok(())
    }
}

pub fn run(db: Database, scheduler: Scheduler) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = App::new(db, scheduler).and_then(|mut app| run_app(&mut terminal, &mut app));

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
