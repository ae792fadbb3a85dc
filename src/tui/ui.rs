use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{dashboard, deck_detail, decks, review};
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Dashboard", "Decks", "Review"];
    let selected = match app.view {
        View::Dashboard => 0,
        View::Decks | View::DeckDetail => 1,
        View::Review => 2,
    };

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(" Cardwise "))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area),
        View::Decks => decks::draw(f, app, area),
        View::DeckDetail => deck_detail::draw(f, app, area),
        View::Review => review::draw(f, app, area),
    }
}

fn key(k: &str) -> Span<'_> {
    Span::styled(k, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    if let Some(status) = &app.status {
        let line = Line::from(vec![
            Span::styled(status.as_str(), Style::default().fg(Color::Yellow)),
            Span::raw("  "),
            key("<Esc>"),
            Span::raw(" Dismiss"),
        ]);
        let bar = Paragraph::new(line).style(Style::default().bg(Color::DarkGray));
        f.render_widget(bar, area);
        return;
    }

    let mut spans = Vec::new();

    match app.view {
        View::Dashboard => {
            spans.extend(vec![
                key("h/l"),
                Span::raw(" Views  "),
                key("^r"),
                Span::raw(" Refresh  "),
            ]);
        }
        View::Decks => {
            spans.extend(vec![
                key("h/l"),
                Span::raw(" Views  "),
                key("j/k"),
                Span::raw(" Nav  "),
                key("g/G"),
                Span::raw(" Top/Bot  "),
                key("l/<CR>"),
                Span::raw(" Open  "),
            ]);
        }
        View::DeckDetail => {
            spans.extend(vec![
                key("h/<Esc>"),
                Span::raw(" Back  "),
                key("j/k"),
                Span::raw(" Nav  "),
                key("s/<CR>"),
                Span::raw(" Review  "),
                key("^r"),
                Span::raw(" Refresh  "),
            ]);
        }
        View::Review => {
            let revealed = app.review.as_ref().is_some_and(|r| r.revealed);
            if revealed {
                spans.extend(vec![key("0-5"), Span::raw(" Grade  ")]);
            } else {
                spans.extend(vec![key("<Space>"), Span::raw(" Reveal  ")]);
            }
            spans.extend(vec![key("<Esc>"), Span::raw(" End review  ")]);
        }
    }

    if app.view != View::Review {
        spans.extend(vec![key("q"), Span::raw(" Quit")]);
    }

    let help = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}
