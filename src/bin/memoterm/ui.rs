//! Ratatui rendering for the feed, level meter, and detail view.

use crate::app::{App, Mode, RecordingState};
use memoterm::feed::FeedEntry;
use memoterm::optimistic::CardPhase;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(frame.size());

    draw_header(frame, app, chunks[0]);
    draw_feed(frame, app, chunks[1]);
    draw_status(frame, app, chunks[2]);

    if app.mode == Mode::Detail {
        draw_detail(frame, app);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    match app.recording_state() {
        RecordingState::Recording => {
            let level = app.meter.smoothed().clamp(0.0, 1.0);
            let gauge = Gauge::default()
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(" recording (space to stop) "),
                )
                .gauge_style(Style::default().fg(Color::Red))
                .ratio(level as f64)
                .label(format!("rms {:.4}", app.meter.rms()));
            frame.render_widget(gauge, area);
        }
        RecordingState::Processing => {
            let text = Paragraph::new("Working on your memo...")
                .block(Block::default().borders(Borders::ALL).title(" memoterm "));
            frame.render_widget(text, area);
        }
        RecordingState::Idle => {
            let text = Paragraph::new("space: record   enter: open   d: delete/dismiss   q: quit")
                .block(Block::default().borders(Borders::ALL).title(" memoterm "));
            frame.render_widget(text, area);
        }
    }
}

fn draw_feed(frame: &mut Frame, app: &App, area: Rect) {
    let mut items: Vec<ListItem> = Vec::new();
    let mut selectable_rows: Vec<usize> = Vec::new();

    for group in &app.feed.groups {
        items.push(ListItem::new(Line::from(Span::styled(
            group.section.label(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))));
        for entry in &group.entries {
            selectable_rows.push(items.len());
            items.push(ListItem::new(entry_line(entry)));
        }
    }

    if items.is_empty() {
        let empty = Paragraph::new("No memos yet. Press space and start talking.")
            .block(Block::default().borders(Borders::ALL).title(" memos "));
        frame.render_widget(empty, area);
        return;
    }

    let mut state = ListState::default();
    state.select(selectable_rows.get(app.feed.selected).copied());

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" memos "))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, area, &mut state);
}

fn entry_line(entry: &FeedEntry) -> Line<'_> {
    match entry {
        FeedEntry::Optimistic(card) => {
            let (marker, style) = match &card.phase {
                CardPhase::Pending => ("~ ", Style::default().fg(Color::Yellow)),
                CardPhase::Confirmed => ("+ ", Style::default().fg(Color::Green)),
                CardPhase::Failed(_) => ("! ", Style::default().fg(Color::Red)),
            };
            let mut spans = vec![
                Span::styled(marker, style),
                Span::styled(card.title.clone(), style),
            ];
            if let CardPhase::Failed(message) = &card.phase {
                spans.push(Span::styled(
                    format!("  {message}"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Line::from(spans)
        }
        FeedEntry::Stored(card) => Line::from(vec![
            Span::raw("  "),
            Span::raw(card.title.clone()),
            Span::styled(
                format!("  [{}]", card.mood.as_str()),
                Style::default().fg(Color::Magenta),
            ),
        ]),
    }
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let status = Paragraph::new(app.status.as_str()).style(Style::default().fg(Color::Gray));
    frame.render_widget(status, area);
}

fn draw_detail(frame: &mut Frame, app: &App) {
    let Some(entry) = app.feed.selected_entry() else {
        return;
    };

    let area = centered_rect(80, 70, frame.size());
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = Vec::new();
    match entry {
        FeedEntry::Stored(card) => {
            lines.push(Line::from(Span::styled(
                card.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(format!(
                "{}  mood: {}",
                card.created_at.format("%Y-%m-%d %H:%M"),
                card.mood.as_str()
            )));
            if !card.categories.is_empty() {
                lines.push(Line::from(format!("tags: {}", card.categories.join(", "))));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(card.transcript.clone()));
            if !card.action_items.is_empty() {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Action items",
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                for item in &card.action_items {
                    lines.push(Line::from(format!("- {item}")));
                }
            }
        }
        FeedEntry::Optimistic(card) => {
            lines.push(Line::from(Span::styled(
                card.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            let phase = match &card.phase {
                CardPhase::Pending => "processing...".to_string(),
                CardPhase::Confirmed => "saved".to_string(),
                CardPhase::Failed(message) => message.clone(),
            };
            lines.push(Line::from(phase));
            if !card.transcript.is_empty() {
                lines.push(Line::from(""));
                lines.push(Line::from(card.transcript.clone()));
            }
        }
    }

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" memo (esc to close) "));
    frame.render_widget(detail, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
