use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .decks
        .items
        .iter()
        .map(|summary| {
            let due_style = if summary.due_count > 0 {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<34}", truncate(&summary.deck.title, 32)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>6}", summary.card_count),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(format!("{:>6}", summary.due_count), due_style),
                Span::styled(
                    format!("   {}", summary.deck.created_at.format("%b %d, %Y")),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Decks ({}) ", app.decks.items.len()))
        .title_style(Style::default().fg(Color::Cyan));

    let header_style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);
    let header = Line::from(vec![
        Span::styled(format!("{:<34}", "Title"), header_style),
        Span::styled(format!("{:>6}", "Cards"), header_style),
        Span::styled(format!("{:>6}", "Due"), header_style),
        Span::styled("   Created", header_style),
    ]);

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.decks.selected);

    // Header sits on the first inner row; the list starts one row lower.
    let header_area = Rect {
        x: area.x + 3,
        y: area.y + 1,
        width: area.width.saturating_sub(4),
        height: 1,
    };
    let list_area = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(1),
    };

    f.render_stateful_widget(list, list_area, &mut state);
    f.render_widget(Paragraph::new(header), header_area);
}
