mod tui;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use cardwise::models::JsonOutput;
use cardwise::{CardWithRecord, Clock, Database, Error, Scheduler};

const DEFAULT_DB_NAME: &str = "cardwise.db";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Parser)]
#[command(name = "cardwise")]
#[command(about = "Flashcard decks with SM-2 spaced-repetition review")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage decks
    #[command(subcommand)]
    Deck(DeckCommands),

    /// Manage cards in a deck
    #[command(subcommand)]
    Card(CardCommands),

    /// Show learning statistics
    Stats,

    /// Show the next card due in a deck
    Next {
        /// Deck ID
        deck: i64,
    },

    /// Grade a card (SM-2 quality 0-5) and advance its schedule
    Answer {
        /// Deck ID
        deck: i64,

        /// Card ID
        card: i64,

        /// Recall quality: 0-2 failed, 3 hard, 4 good, 5 perfect
        #[arg(long, short, allow_negative_numbers = true)]
        grade: i64,

        /// Optional note stored with the answer
        #[arg(long, short)]
        note: Option<String>,
    },

    /// List review sessions for a deck
    Sessions {
        /// Deck ID
        deck: i64,
    },

    /// Show the answers recorded in a review session
    History {
        /// Session ID
        session: i64,
    },

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum DeckCommands {
    /// List all decks
    List,

    /// Add a new deck
    Add {
        /// Deck title
        title: String,

        /// Deck description
        #[arg(long, short)]
        description: Option<String>,
    },

    /// Show deck details and its cards
    Show {
        /// Deck ID
        id: i64,
    },

    /// Delete a deck with all its cards and review history
    Delete {
        /// Deck ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum CardCommands {
    /// List the cards of a deck
    List {
        /// Deck ID
        deck: i64,
    },

    /// Add a card to a deck
    Add {
        /// Deck ID
        deck: i64,

        /// Question text
        #[arg(long, short)]
        question: String,

        /// Answer text
        #[arg(long, short)]
        answer: String,
    },

    /// Replace a card's question and answer
    Edit {
        /// Deck ID
        deck: i64,

        /// Card ID
        card: i64,

        /// Question text
        #[arg(long, short)]
        question: String,

        /// Answer text
        #[arg(long, short)]
        answer: String,
    },

    /// Delete a card
    Delete {
        /// Deck ID
        deck: i64,

        /// Card ID
        card: i64,
    },
}

fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARDWISE_DB") {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cardwise");

    std::fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}

fn log_filter() -> EnvFilter {
    std::env::var("CARDWISE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let json = cli.json;
    if let Err(e) = run(cli) {
        if json {
            match serde_json::to_string(&JsonOutput::<()>::err(e.to_string())) {
                Ok(out) => println!("{}", out),
                Err(_) => eprintln!("Error: {}", e),
            }
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    execute(cli, &get_db_path())
}

fn execute(cli: Cli, db_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open(db_path)?;
    tracing::debug!(path = %db_path.display(), "database opened");

    let scheduler = Scheduler::new();
    let today = scheduler.clock().today();

    match cli.command {
        Commands::Init => {
            db.init()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Deck(deck_cmd) => match deck_cmd {
            DeckCommands::List => {
                let decks = db.list_decks(today)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&decks))?);
                } else if decks.is_empty() {
                    println!("No decks found.");
                } else {
                    println!("{:<5} {:<40} {:>6} {:>6}", "ID", "TITLE", "CARDS", "DUE");
                    println!("{}", "-".repeat(60));
                    for d in decks {
                        println!(
                            "{:<5} {:<40} {:>6} {:>6}",
                            d.deck.id,
                            truncate(&d.deck.title, 38),
                            d.card_count,
                            d.due_count
                        );
                    }
                }
            }

            DeckCommands::Add { title, description } => {
                let id = db.create_deck(&title, description.as_deref())?;

                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "id": id,
                            "title": title
                        })))?
                    );
                } else {
                    println!("Added deck '{}' with ID: {}", title, id);
                }
            }

            DeckCommands::Show { id } => {
                if let Some(deck) = db.get_deck(id)? {
                    let cards = db.list_cards(id)?;

                    if cli.json {
                        println!(
                            "{}",
                            serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                                "deck": deck,
                                "cards": cards
                            })))?
                        );
                    } else {
                        println!("Deck: {}", deck.title);
                        println!("ID: {}", deck.id);
                        if let Some(desc) = &deck.description {
                            println!("Description: {}", desc);
                        }
                        println!("Created: {}", deck.created_at.format("%Y-%m-%d %H:%M"));
                        println!();
                        print_card_table(&cards, today);
                    }
                } else {
                    return Err(Error::deck_not_found(id).into());
                }
            }

            DeckCommands::Delete { id } => {
                if db.delete_deck(id)? {
                    if cli.json {
                        println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                    } else {
                        println!("Deck {} deleted.", id);
                    }
                } else {
                    return Err(Error::deck_not_found(id).into());
                }
            }
        },

        Commands::Card(card_cmd) => match card_cmd {
            CardCommands::List { deck } => {
                let cards = db.list_cards(deck)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&cards))?);
                } else {
                    print_card_table(&cards, today);
                }
            }

            CardCommands::Add {
                deck,
                question,
                answer,
            } => {
                let id = db.add_card(deck, &question, &answer)?;
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "id": id,
                            "deck_id": deck
                        })))?
                    );
                } else {
                    println!("Added card {} to deck {}.", id, deck);
                }
            }

            CardCommands::Edit {
                deck,
                card,
                question,
                answer,
            } => {
                let updated = db.update_card(deck, card, &question, &answer)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&updated))?);
                } else {
                    println!("Updated card {}.", updated.id);
                }
            }

            CardCommands::Delete { deck, card } => {
                if db.delete_card(deck, card)? {
                    if cli.json {
                        println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                    } else {
                        println!("Card {} deleted.", card);
                    }
                } else {
                    return Err(Error::card_not_found(card).into());
                }
            }
        },

        Commands::Stats => {
            let stats = db.get_stats(today)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&stats))?);
            } else {
                println!("=== Learning Statistics ===");
                println!("Decks: {}", stats.total_decks);
                println!("Cards: {}", stats.total_cards);
                println!("Due today: {}", stats.due_today);
                println!("Learned (3+ successful reviews): {}", stats.learned_cards);
                println!("Reviewed at least once: {}", stats.reviewed_cards);
                println!("Total answers: {}", stats.total_answers);
            }
        }

        Commands::Next { deck } => {
            let next = scheduler.next_card(db.conn(), deck)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&next))?);
            } else if let Some(cwr) = next {
                println!("=== Next Card (deck {}) ===", deck);
                println!();
                println!("Card ID: {}", cwr.card.id);
                println!("Question: {}", cwr.card.question);
                println!("Status: {}", cwr.status_label(today));
                if let Some(record) = &cwr.record {
                    println!(
                        "Interval: {} days, ease {:.2}, streak {}",
                        record.interval, record.ease_factor, record.repetitions
                    );
                }
                println!();
                println!("After recalling, record your grade with:");
                println!(
                    "  cardwise answer {} {} --grade <0-5>",
                    deck, cwr.card.id
                );
            } else {
                println!("Nothing due in this deck. Come back later!");
            }
        }

        Commands::Answer {
            deck,
            card,
            grade,
            note,
        } => {
            let outcome = scheduler.record_answer(&mut db, deck, card, grade, note.as_deref())?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&outcome))?);
            } else {
                let record = &outcome.record;
                println!("Answer recorded for card {}.", card);
                if let Some(next) = record.next_review {
                    println!(
                        "Next review: {} (in {} day{})",
                        next,
                        record.interval,
                        if record.interval == 1 { "" } else { "s" }
                    );
                }
                println!(
                    "Ease factor: {:.2}, successful streak: {}",
                    record.ease_factor, record.repetitions
                );
                match &outcome.next_card {
                    Some(next) => println!(
                        "Next up: card {} - {}",
                        next.card.id,
                        truncate(&next.card.question, 60)
                    ),
                    None => println!("Session complete: no more cards due."),
                }
            }
        }

        Commands::Sessions { deck } => {
            let sessions = db.list_sessions(deck)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&sessions))?);
            } else if sessions.is_empty() {
                println!("No review sessions yet.");
            } else {
                println!("{:<5} {:<18} {:<18} {:>7}", "ID", "STARTED", "FINISHED", "ANSWERS");
                println!("{}", "-".repeat(52));
                for s in sessions {
                    let finished = s
                        .session
                        .finished_at
                        .map(|f| f.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "open".to_string());
                    println!(
                        "{:<5} {:<18} {:<18} {:>7}",
                        s.session.id,
                        s.session.started_at.format("%Y-%m-%d %H:%M"),
                        finished,
                        s.answer_count
                    );
                }
            }
        }

        Commands::History { session } => {
            let answers = db.list_answers(session)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&answers))?);
            } else if answers.is_empty() {
                println!("No answers in this session.");
            } else {
                println!("{:<8} {:<6} {:<18} NOTE", "CARD", "GRADE", "ANSWERED");
                println!("{}", "-".repeat(50));
                for a in answers {
                    println!(
                        "{:<8} {:<6} {:<18} {}",
                        a.card_id,
                        a.rating,
                        a.answered_at.format("%Y-%m-%d %H:%M"),
                        a.note.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Tui => {
            tui::run(db, scheduler)?;
        }
    }

    Ok(())
}

fn print_card_table(cards: &[CardWithRecord], today: chrono::NaiveDate) {
    if cards.is_empty() {
        println!("No cards in this deck.");
        return;
    }

    println!(
        "{:<6} {:<40} {:<9} {:>8} {:>5} NEXT",
        "ID", "QUESTION", "STATUS", "INTERVAL", "EASE"
    );
    println!("{}", "-".repeat(84));
    for cwr in cards {
        let (interval, ease, next) = match &cwr.record {
            Some(r) => (
                format!("{}d", r.interval),
                format!("{:.2}", r.ease_factor),
                r.next_review
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            None => ("-".to_string(), "-".to_string(), "-".to_string()),
        };
        println!(
            "{:<6} {:<40} {:<9} {:>8} {:>5} {}",
            cwr.card.id,
            truncate(&cwr.card.question, 38),
            cwr.status_label(today),
            interval,
            ease,
            next
        );
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
