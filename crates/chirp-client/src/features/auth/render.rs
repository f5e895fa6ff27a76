//! Auth feature view.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use super::{AuthField, AuthFormState, AuthMode};
use crate::render::{centered_rect, render_container};

const FORM_WIDTH: u16 = 64;
const FORM_HEIGHT: u16 = 16;
const LABEL_WIDTH: usize = 10;

/// Renders the auth form centered in `area`.
pub fn render_auth_screen(frame: &mut Frame, area: Rect, form: &AuthFormState, pending: bool) {
    let popup = centered_rect(area, FORM_WIDTH, FORM_HEIGHT);
    render_container(frame, popup, form.mode.title(), Color::Cyan);

    let inner = Rect::new(
        popup.x + 2,
        popup.y + 1,
        popup.width.saturating_sub(4),
        popup.height.saturating_sub(2),
    );
    frame.render_widget(Paragraph::new(auth_form_lines(form, pending)), inner);
}

pub fn auth_form_lines(form: &AuthFormState, pending: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for field in form.fields() {
        lines.push(field_line(form, *field));
        if *field == AuthField::AvatarPath {
            lines.push(avatar_status_line(form));
        }
    }
    lines.push(Line::from(""));

    if pending {
        let status = match form.mode {
            AuthMode::SignIn => "Signing in...",
            AuthMode::SignUp => "Creating account...",
        };
        lines.push(Line::from(Span::styled(
            status,
            Style::default().fg(Color::Yellow),
        )));
    } else if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    } else if let Some(missing) = form.missing_requirement() {
        lines.push(Line::from(Span::styled(
            missing,
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Press Enter to continue",
            Style::default().fg(Color::Green),
        )));
    }

    if let (AuthMode::SignIn, Some(hint)) = (form.mode, &form.account_hint) {
        lines.push(Line::from(Span::styled(
            hint.clone(),
            Style::default().fg(Color::Magenta),
        )));
    }

    lines.push(Line::from(""));
    let toggle_hint = match form.mode {
        AuthMode::SignIn => "Ctrl+T create account",
        AuthMode::SignUp => "Ctrl+T back to sign in",
    };
    lines.push(Line::from(Span::styled(
        format!("Tab next field · {toggle_hint}"),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(Span::styled(
        "Ctrl+G sign in with Google · Ctrl+C quit",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

fn field_line(form: &AuthFormState, field: AuthField) -> Line<'static> {
    let focused = form.focus == field;
    let raw = form.value(field);
    let shown = if field == AuthField::Password {
        "•".repeat(raw.chars().count())
    } else {
        raw.to_string()
    };

    let marker = if focused { "> " } else { "  " };
    let label_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    let mut spans = vec![
        Span::styled(marker, Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("{:<width$}", field.label(), width = LABEL_WIDTH),
            label_style,
        ),
        Span::raw(shown),
    ];
    if focused {
        spans.push(Span::styled("█", Style::default().fg(Color::Cyan)));
    }
    Line::from(spans)
}

fn avatar_status_line(form: &AuthFormState) -> Line<'static> {
    let indent = " ".repeat(LABEL_WIDTH + 2);
    match &form.avatar {
        Some(avatar) => {
            let kind = avatar.content_type.as_deref().unwrap_or("unknown type");
            Line::from(vec![
                Span::raw(indent),
                Span::styled(
                    format!("✓ {} ({kind}, {} bytes)", avatar.file_name, avatar.bytes.len()),
                    Style::default().fg(Color::Green),
                ),
            ])
        }
        None => Line::from(vec![
            Span::raw(indent),
            Span::styled(
                "type an image path and press Enter",
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    }
}
