use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    draw_stats(f, app, chunks[0]);
    draw_due_decks(f, app, chunks[1]);
}

fn stat_line(label: &str, value: i64, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<10}", label), Style::default().fg(Color::Gray)),
        Span::styled(
            value.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
    ])
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let stats = &app.stats;
    let due_color = if stats.due_today > 0 {
        Color::Yellow
    } else {
        Color::White
    };

    let text = vec![
        stat_line("Decks:", stats.total_decks, Color::White),
        stat_line("Cards:", stats.total_cards, Color::White),
        stat_line("Due:", stats.due_today, due_color),
        stat_line("Reviewed:", stats.reviewed_cards, Color::Cyan),
        stat_line("Learned:", stats.learned_cards, Color::Green),
        stat_line("Answers:", stats.total_answers, Color::White),
        Line::from(""),
        Line::from(Span::styled(
            app.today().format("%A, %b %d").to_string(),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Stats ")
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_due_decks(f: &mut Frame, app: &App, area: Rect) {
    let mut due: Vec<_> = app
        .decks
        .items
        .iter()
        .filter(|d| d.due_count > 0)
        .collect();
    due.sort_by(|a, b| b.due_count.cmp(&a.due_count));

    let items: Vec<ListItem> = if due.is_empty() {
        vec![ListItem::new(Span::styled(
            "Nothing due. Come back later!",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        due.iter()
            .map(|summary| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:>4} due  ", summary.due_count),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::styled(
                        truncate(&summary.deck.title, 30),
                        Style::default().fg(Color::White),
                    ),
                    Span::styled(
                        format!("  ({} cards)", summary.card_count),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Due Today ")
        .title_style(Style::default().fg(Color::Yellow));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}
