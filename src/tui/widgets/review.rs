use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use cardwise::{AnswerOutcome, Grade};

use crate::tui::{App, ReviewState};

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(review) = &app.review else {
        let block = Block::default().borders(Borders::ALL).title(" Review ");
        let paragraph = Paragraph::new("No review in progress").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),    // Card
            Constraint::Length(4), // Last answer
            Constraint::Length(8), // Grade legend
        ])
        .split(area);

    draw_card(f, review, chunks[0]);
    draw_last_outcome(f, review.last_outcome.as_ref(), chunks[1]);
    draw_grades(f, review.revealed, chunks[2]);
}

fn draw_card(f: &mut Frame, review: &ReviewState, area: Rect) {
    let title = format!(
        " {} - {} answered ",
        review.deck.deck.title, review.answered
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let Some(current) = &review.current else {
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Session complete",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "No more cards are due in this deck. Press <Space> to return.",
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center);
        f.render_widget(paragraph, area);
        return;
    };

    let mut text = vec![
        Line::from(""),
        Line::from(Span::styled(
            current.card.question.as_str(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    if review.revealed {
        text.push(Line::from(Span::styled(
            "─".repeat(area.width.saturating_sub(8) as usize / 2),
            Style::default().fg(Color::DarkGray),
        )));
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            current.card.answer.as_str(),
            Style::default().fg(Color::Cyan),
        )));
    } else {
        text.push(Line::from(Span::styled(
            "Press <Space> to reveal the answer",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_last_outcome(f: &mut Frame, outcome: Option<&AnswerOutcome>, area: Rect) {
    let text = match outcome {
        Some(outcome) => {
            let record = &outcome.record;
            let next = record
                .next_review
                .map(|d| d.format("%b %d").to_string())
                .unwrap_or_else(|| "-".to_string());
            vec![Line::from(vec![
                Span::styled("Next review: ", Style::default().fg(Color::Gray)),
                Span::styled(next, Style::default().fg(Color::White)),
                Span::styled(
                    format!(" (+{}d)", record.interval),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled("  Ease: ", Style::default().fg(Color::Gray)),
                Span::styled(
                    format!("{:.2}", record.ease_factor),
                    Style::default().fg(Color::Green),
                ),
                Span::styled("  Streak: ", Style::default().fg(Color::Gray)),
                Span::styled(
                    record.repetitions.to_string(),
                    Style::default().fg(Color::White),
                ),
            ])]
        }
        None => vec![Line::from(Span::styled(
            "No answers yet",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Last Answer ")
        .title_style(Style::default().fg(Color::Magenta));

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_grades(f: &mut Frame, revealed: bool, area: Rect) {
    let lines: Vec<Line> = Grade::all()
        .map(|grade| {
            let color = match (revealed, grade.is_pass()) {
                (false, _) => Color::DarkGray,
                (true, true) => Color::Green,
                (true, false) => Color::Red,
            };
            Line::from(vec![
                Span::styled(
                    format!(" {} ", grade),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(grade.label(), Style::default().fg(Color::Gray)),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Grade ")
        .title_style(Style::default().fg(Color::Cyan));

    f.render_widget(Paragraph::new(lines).block(block), area);
}
