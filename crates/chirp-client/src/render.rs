//! Top-level view.
//!
//! Pure render functions that take `&AppState` and draw to a frame. No state
//! mutation happens here.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::auth;
use crate::feed;
use crate::state::AppState;

/// Draws the whole screen: header, auth form or feed, notice and key hints.
pub fn render(app: &AppState, frame: &mut Frame) {
    let [header, body, notice, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    frame.render_widget(Paragraph::new(header_line(app)), header);

    match app.session.identity() {
        None => auth::render_auth_screen(frame, body, &app.auth, app.tasks.auth.is_running()),
        Some(_) => feed::render_feed(frame, body, &app.feed),
    }

    if let Some(message) = &app.notice {
        let line = Line::from(vec![
            Span::styled(message.clone(), Style::default().fg(Color::Yellow)),
            Span::styled("  (Esc to dismiss)", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(line), notice);
    }

    frame.render_widget(Paragraph::new(footer_line(app)), footer);
}

fn header_line(app: &AppState) -> Line<'static> {
    let mut spans = vec![Span::styled(
        "chirp",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if let Some(identity) = app.session.identity() {
        spans.push(Span::styled(
            format!("  signed in as {}", identity.display_name),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if app.tasks.sign_out.is_running() {
        spans.push(Span::styled(
            "  signing out...",
            Style::default().fg(Color::Yellow),
        ));
    }
    Line::from(spans)
}

fn footer_line(app: &AppState) -> Line<'static> {
    let hints = if app.session.is_signed_in() {
        "↑/↓ select · Tab comments · Enter send · Ctrl+O sign out · Ctrl+C quit"
    } else {
        "Enter submit · Ctrl+C quit"
    };
    Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray)))
}

/// A `width` x `height` rectangle centered in `area`, clamped to fit.
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Clears `area` and draws a titled border around it.
pub fn render_container(frame: &mut Frame, area: Rect, title: &str, border_color: Color) {
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {title} "))
        .title_style(
            Style::default()
                .fg(border_color)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(block, area);
}
