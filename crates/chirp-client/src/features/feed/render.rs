//! Feed view.

use chirp_types::Post;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use super::{FeedPhase, FeedState};
use crate::comments::{self, ThreadPhase};

/// One feed item: avatar marker, author, time, body, image link and the
/// comment count for expanded threads.
pub fn post_lines(post: &Post, selected: bool) -> Vec<Line<'static>> {
    let bar = if selected { "▌ " } else { "  " };
    let avatar = if post.avatar.is_empty() { "○" } else { "◉" };
    let name_style = if selected {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(bar, Style::default().fg(Color::Cyan)),
        Span::styled(format!("{avatar} "), Style::default().fg(Color::Blue)),
        Span::styled(post.user_name.clone(), name_style),
        Span::styled(
            format!("  {}", post.timestamp.display()),
            Style::default().fg(Color::DarkGray),
        ),
    ])];
    lines.extend(
        post.text
            .lines()
            .map(|text| Line::from(vec![Span::raw(bar), Span::raw(text.to_string())])),
    );
    if post.has_image() {
        lines.push(Line::from(vec![
            Span::raw(bar),
            Span::styled("[image] ", Style::default().fg(Color::Blue)),
            Span::styled(
                post.image.clone(),
                Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::UNDERLINED),
            ),
        ]));
    }
    lines
}

/// All feed lines plus the index of the first line of the selected post.
pub fn feed_lines(feed: &FeedState) -> (Vec<Line<'static>>, usize) {
    let mut lines = Vec::new();
    let mut selected_start = 0;

    for (index, post) in feed.posts.iter().enumerate() {
        let selected = index == feed.selected;
        if selected {
            selected_start = lines.len();
        }
        lines.extend(post_lines(post, selected));
        if let Some(thread) = feed.thread(&post.id) {
            if let ThreadPhase::Live { comments, .. } = &thread.phase {
                lines.push(Line::from(Span::styled(
                    format!("    {} comment(s)", comments.len()),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            lines.extend(comments::thread_lines(thread, selected));
        }
        lines.push(Line::from(""));
    }
    (lines, selected_start)
}

pub fn render_feed(frame: &mut Frame, area: Rect, feed: &FeedState) {
    if feed.posts.is_empty() {
        let (message, color) = match (&feed.error, feed.phase) {
            (Some(error), _) => (format!("{error}  (Ctrl+R to reload)"), Color::Red),
            (None, FeedPhase::Loading { .. }) => ("Loading posts...".to_string(), Color::Yellow),
            (None, _) => ("No posts yet.".to_string(), Color::DarkGray),
        };
        let para = Paragraph::new(Line::from(Span::styled(
            message,
            Style::default().fg(color),
        )));
        frame.render_widget(para, area);
        return;
    }

    let (mut lines, selected_start) = feed_lines(feed);
    if let Some(error) = &feed.error {
        lines.insert(
            0,
            Line::from(Span::styled(
                format!("{error}  (Ctrl+R to reload)"),
                Style::default().fg(Color::Red),
            )),
        );
    }
    let scroll = selected_start.saturating_sub(usize::from(area.height) / 3);
    let para = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0));
    frame.render_widget(para, area);
}

#[cfg(test)]
mod tests {
    use chirp_types::ServerTimestamp;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn post(image: &str) -> Post {
        Post {
            id: "p1".into(),
            avatar: "https://img/a.png".into(),
            image: image.into(),
            text: "hello\nworld".into(),
            timestamp: ServerTimestamp::from_datetime(
                Utc.timestamp_opt(1_614_881_207, 0).unwrap(),
            ),
            user_name: "Ada".into(),
        }
    }

    fn flatten(lines: &[Line<'static>]) -> String {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_post_lines_show_header_and_body() {
        let p = post("");
        let text = flatten(&post_lines(&p, false));
        assert!(text.contains("Ada"));
        assert!(text.contains(&p.timestamp.display()));
        assert!(text.contains("hello"));
        assert!(text.contains("world"));
        assert!(!text.contains("[image]"));
    }

    #[test]
    fn test_post_lines_link_image() {
        let text = flatten(&post_lines(&post("https://img/pic.jpg"), true));
        assert!(text.contains("[image] https://img/pic.jpg"));
        assert!(text.starts_with("▌"));
    }
}
