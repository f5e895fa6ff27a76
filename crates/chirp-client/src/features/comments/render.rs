//! Comment thread view.

use chirp_types::Comment;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::{CommentThreadState, ThreadPhase};

const INDENT: &str = "    ";

/// One comment: author and time on the first line, body below.
pub fn comment_lines(comment: &Comment) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::raw(INDENT),
        Span::styled("↳ ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            comment.user_name.clone(),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", comment.timestamp.display()),
            Style::default().fg(Color::DarkGray),
        ),
    ])];
    lines.extend(comment.text.lines().map(|text| {
        Line::from(vec![Span::raw(format!("{INDENT}  ")), Span::raw(text.to_string())])
    }));
    lines
}

/// The expanded part of a post: comments, input line and status.
///
/// Collapsed threads render nothing but a pending error.
pub fn thread_lines(thread: &CommentThreadState, focused: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match &thread.phase {
        ThreadPhase::Collapsed => {}
        ThreadPhase::Loading { .. } => lines.push(Line::from(vec![
            Span::raw(INDENT),
            Span::styled("Loading comments...", Style::default().fg(Color::Yellow)),
        ])),
        ThreadPhase::Live { comments, .. } if comments.is_empty() => lines.push(Line::from(vec![
            Span::raw(INDENT),
            Span::styled("No comments yet.", Style::default().fg(Color::DarkGray)),
        ])),
        ThreadPhase::Live { comments, .. } => {
            lines.extend(comments.iter().flat_map(comment_lines));
        }
    }

    if thread.is_expanded() {
        lines.push(input_line(thread, focused));
    }
    if let Some(error) = &thread.error {
        lines.push(Line::from(vec![
            Span::raw(INDENT),
            Span::styled(error.clone(), Style::default().fg(Color::Red)),
        ]));
    }
    lines
}

fn input_line(thread: &CommentThreadState, focused: bool) -> Line<'static> {
    let mut spans = vec![
        Span::raw(INDENT),
        Span::styled("› ", Style::default().fg(Color::Cyan)),
    ];
    if thread.draft.is_empty() && !focused {
        spans.push(Span::styled(
            "Add a comment",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        spans.push(Span::raw(thread.draft.clone()));
    }
    if focused {
        spans.push(Span::styled("█", Style::default().fg(Color::Cyan)));
    }
    if thread.sending > 0 {
        spans.push(Span::styled(
            "  sending...",
            Style::default().fg(Color::Yellow),
        ));
    }
    Line::from(spans)
}
