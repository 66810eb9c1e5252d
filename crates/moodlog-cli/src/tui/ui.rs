//! UI rendering

use std::path::Path;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use moodlog_core::{Emoticon, StoreError};

use super::app::{App, Screen};
use crate::output::{format_date, glyph};

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App<'_>) {
    // Create vertical layout for status bar at the bottom
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    match app.screen() {
        Screen::Home => draw_home(frame, app, chunks[0]),
        Screen::Write => draw_write(frame, app, chunks[0]),
    }

    draw_status_bar(frame, app, chunks[1]);

    // Draw help overlay if visible
    if app.show_help {
        draw_help_overlay(frame);
    }

    if let Some(message) = &app.error {
        draw_error_modal(frame, message);
    }
}

/// Frame shown while the store opens
pub fn draw_loading(frame: &mut Frame, store_path: &Path) {
    let area = centered(frame.area(), 60, 5);
    let text = vec![
        Line::from(Span::styled(
            "Opening journal…",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            store_path.display().to_string(),
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];
    frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), area);
}

/// Blocking screen for a store that could not be opened
pub fn draw_startup_error(frame: &mut Frame, err: &StoreError) {
    let area = centered(frame.area(), 70, 12);

    let mut text = vec![
        Line::from(Span::styled(
            err.to_string(),
            Style::default().fg(Color::Red),
        )),
        Line::from(""),
    ];
    if let Some(hint) = err.recovery_suggestion() {
        text.push(Line::from(hint));
        text.push(Line::from(""));
    }
    text.push(Line::from(Span::styled(
        "Press any key to exit",
        Style::default().add_modifier(Modifier::DIM),
    )));

    let block = Block::default()
        .title(" Cannot open journal ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

/// Draw the journal list
fn draw_home(frame: &mut Frame, app: &App<'_>, area: Rect) {
    let entries = app.entries();
    let block = Block::default()
        .title(format!(" My Journal ({}) ", entries.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    if entries.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "No entries yet. Press a to write how you feel.",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ])
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = entries
        .iter()
        .map(|feeling| {
            let header = Line::from(vec![
                Span::styled(
                    format!("{} ", glyph(feeling)),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    format_date(feeling),
                    Style::default().add_modifier(Modifier::DIM),
                ),
            ]);

            let body = if feeling.is_editing {
                Line::from(vec![
                    Span::styled("  ✎ ", Style::default().fg(Color::Cyan)),
                    Span::raw(app.list.buffer().to_string()),
                    Span::styled("▏", Style::default().fg(Color::Cyan)),
                ])
            } else {
                Line::from(format!("  {}", feeling.message))
            };

            ListItem::new(vec![header, body])
        })
        .collect();

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .add_modifier(Modifier::BOLD)
            .add_modifier(Modifier::REVERSED),
    );

    let mut state = ListState::default();
    state.select(Some(app.selected));

    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw the new entry form
fn draw_write(frame: &mut Frame, app: &App<'_>, area: Rect) {
    let block = Block::default()
        .title(" How do you feel today? ")
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(entry) = app.write.as_ref() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(inner);

    let mut moods = Vec::new();
    for (n, emoticon) in Emoticon::ALL.iter().enumerate() {
        let style = if entry.emoticon() == Some(*emoticon) {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        moods.push(Span::styled(
            format!(" {} {} ", emoticon.glyph(), emoticon.label()),
            style,
        ));
        moods.push(Span::styled(
            format!("{} ", n + 1),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(moods)), chunks[0]);

    let message = Paragraph::new(Line::from(vec![
        Span::raw(entry.message().to_string()),
        Span::styled("▏", Style::default().fg(Color::Cyan)),
    ]))
    .block(Block::default().title(" Message ").borders(Borders::ALL))
    .wrap(Wrap { trim: false });
    frame.render_widget(message, chunks[1]);

    let save = Paragraph::new(Span::styled(
        "[ Save ]",
        Style::default().add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(save, chunks[2]);
}

/// Draw the status bar at the bottom
fn draw_status_bar(frame: &mut Frame, app: &App<'_>, area: Rect) {
    let content = if let Some(msg) = &app.status_message {
        msg.clone()
    } else {
        match app.screen() {
            Screen::Home if app.is_editing() => "Enter:save  Esc:cancel".to_string(),
            Screen::Home => "a:write  e:edit  d:delete  ?:help  q:quit".to_string(),
            Screen::Write => "←/→:mood  Enter:save  Esc:back".to_string(),
        }
    };

    let paragraph = Paragraph::new(content).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let popup_area = centered(frame.area(), 46, 18);

    // Clear the popup area
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("My Journal:"),
        Line::from("  j/k, ↑/↓    Move up/down"),
        Line::from("  e, Enter    Edit entry"),
        Line::from("  Enter       Save edit"),
        Line::from("  Esc         Cancel edit"),
        Line::from("  d           Delete entry"),
        Line::from("  a, +        Write new entry"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from("Write:"),
        Line::from("  ←/→, Tab    Choose mood"),
        Line::from("  Alt+1..4    Jump to mood"),
        Line::from("  Enter/Esc   Save / Back"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    let paragraph = Paragraph::new(help_text).block(block);
    frame.render_widget(paragraph, popup_area);
}

/// Draw an error modal over everything
fn draw_error_modal(frame: &mut Frame, message: &str) {
    let area = centered(frame.area(), 60, 7);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let text = vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to dismiss",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

/// Centered popup area, clamped to the frame
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
