use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use cardwise::{CardWithRecord, DeckSummary};

use super::{ease_bar, format_next_review, status_color, truncate};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(summary) = &app.selected_deck else {
        let block = Block::default().borders(Borders::ALL).title(" Deck ");
        let paragraph = Paragraph::new("No deck selected").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Header
            Constraint::Min(0),    // Cards
            Constraint::Length(5), // Selected card
        ])
        .split(area);

    draw_header(f, summary, chunks[0]);
    draw_cards(f, app, chunks[1]);
    draw_selected(f, app.deck_cards.selected_item(), chunks[2]);
}

fn draw_header(f: &mut Frame, summary: &DeckSummary, area: Rect) {
    let description = summary
        .deck
        .description
        .as_deref()
        .unwrap_or("No description");

    let text = vec![
        Line::from(Span::styled(description, Style::default().fg(Color::White))),
        Line::from(vec![
            Span::styled("Cards: ", Style::default().fg(Color::Gray)),
            Span::styled(
                summary.card_count.to_string(),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("  "),
            Span::styled("Due: ", Style::default().fg(Color::Gray)),
            Span::styled(
                summary.due_count.to_string(),
                Style::default().fg(if summary.due_count > 0 {
                    Color::Yellow
                } else {
                    Color::White
                }),
            ),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", summary.deck.title))
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_cards(f: &mut Frame, app: &App, area: Rect) {
    let today = app.today();

    let items: Vec<ListItem> = app
        .deck_cards
        .items
        .iter()
        .map(|cwr| {
            let status = cwr.status_label(today);
            let (interval, ease) = match &cwr.record {
                Some(r) if !r.is_unscheduled() => {
                    (format!("{}d", r.interval), ease_bar(r.ease_factor))
                }
                _ => ("-".to_string(), "     ".to_string()),
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<40}", truncate(&cwr.card.question, 38)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:<10}", status),
                    Style::default().fg(status_color(status)),
                ),
                Span::styled(
                    format!("{:>7}  ", interval),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(ease, Style::default().fg(Color::Green)),
                Span::styled(
                    format!("  {}", format_next_review(cwr.record.as_ref(), today)),
                    Style::default().fg(Color::Gray),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Cards ")
        .title_style(Style::default().fg(Color::Cyan));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.deck_cards.selected);

    f.render_stateful_widget(list, area, &mut state);
}

fn draw_selected(f: &mut Frame, cwr: Option<&CardWithRecord>, area: Rect) {
    let text = match cwr {
        Some(cwr) => {
            let mut lines = vec![Line::from(vec![
                Span::styled("A: ", Style::default().fg(Color::Gray)),
                Span::styled(cwr.card.answer.as_str(), Style::default().fg(Color::White)),
            ])];
            if let Some(record) = &cwr.record {
                lines.push(Line::from(vec![
                    Span::styled("Ease: ", Style::default().fg(Color::Gray)),
                    Span::styled(
                        format!("{:.2}", record.ease_factor),
                        Style::default().fg(Color::Green),
                    ),
                    Span::styled("  Streak: ", Style::default().fg(Color::Gray)),
                    Span::styled(
                        record.repetitions.to_string(),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::styled("  Last grade: ", Style::default().fg(Color::Gray)),
                    Span::styled(
                        record
                            .last_grade
                            .map(|g| format!("{} ({})", g, g.label()))
                            .unwrap_or_else(|| "-".to_string()),
                        Style::default().fg(Color::White),
                    ),
                ]));
            }
            lines
        }
        None => vec![Line::from(Span::styled(
            "This deck has no cards yet.",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Card ")
        .title_style(Style::default().fg(Color::Magenta));

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}
