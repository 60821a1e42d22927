//! UI rendering with ratatui.
//!
//! Two-column layout: session list on the left, chat and input on the right.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, List, ListItem, ListState, Paragraph, Scrollbar, ScrollbarOrientation,
    ScrollbarState, Wrap,
};
use ratatui::Frame;
use typhoon_assistant_core::Message;

use crate::app::{App, Focus};

/// Horizontal padding for chat content.
const CHAT_PADDING: u16 = 2;

/// Render the UI.
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header bar
            Constraint::Min(5),    // Sessions + chat
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header_bar(frame, app, main_layout[0]);

    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
        .split(main_layout[1]);

    render_sessions_panel(frame, app, content_layout[0]);
    render_chat_column(frame, app, content_layout[1]);
    render_status_bar(frame, app, main_layout[2]);
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Truncate a string in the middle with ellipsis if it exceeds `max_len` chars.
fn truncate_middle(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len <= max_len {
        return s.to_string();
    }
    if max_len < 5 {
        return s.chars().take(max_len).collect();
    }
    let keep = (max_len - 3) / 2;
    let start: String = s.chars().take(keep).collect();
    let end: String = s.chars().skip(len - keep).collect();
    format!("{start}...{end}")
}

/// Header bar with title, model settings and backend URL.
fn render_header_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "TYPHOON ASSISTANT";
    let chat = app.chat();
    let thinking = if chat.deep_thinking() { "deep thinking" } else { "fast" };
    let settings = format!(" {} · {thinking}", chat.model());

    let max_url_width = (area.width as usize / 2).saturating_sub(2);
    let display_url = truncate_middle(app.base_url(), max_url_width);

    let used = Span::raw(title).width() + Span::raw(settings.as_str()).width() + display_url.chars().count();
    let line = Line::from(vec![
        Span::styled(title, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(settings, Style::default().fg(Color::Gray)),
        Span::raw(" ".repeat((area.width as usize).saturating_sub(used))),
        Span::raw(display_url),
    ]);

    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(Color::DarkGray)),
        area,
    );
}

/// Session list.
fn render_sessions_panel(frame: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus == Focus::Sessions;

    let block = Block::default()
        .title(" Sessions ")
        .borders(Borders::ALL)
        .border_style(if is_focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        });

    let items: Vec<ListItem> = app
        .sessions
        .iter()
        .map(|session| {
            let marker = if app.is_current_session(session) {
                Span::styled("● ", Style::default().fg(Color::Green))
            } else {
                Span::raw("  ")
            };
            let mut spans = vec![marker, Span::raw(session.label().to_string())];
            if let Some(count) = session.message_count {
                spans.push(Span::styled(
                    format!(" ({count})"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.selected_session);
    frame.render_stateful_widget(list, area, &mut state);

    if is_focused && area.height > 4 {
        let help_area = Rect::new(
            area.x + 1,
            area.y + area.height.saturating_sub(2),
            area.width.saturating_sub(2),
            1,
        );
        let help = Paragraph::new(Line::from(vec![
            Span::styled("[n]", Style::default().fg(Color::Yellow)),
            Span::raw("ew "),
            Span::styled("[p]", Style::default().fg(Color::Yellow)),
            Span::raw("opular "),
            Span::styled("[Enter]", Style::default().fg(Color::Yellow)),
            Span::raw(" open"),
        ]))
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, help_area);
    }
}

/// Right column: chat messages, separator and input line.
fn render_chat_column(frame: &mut Frame, app: &mut App, area: Rect) {
    let is_focused = app.focus == Focus::Chat;

    let title = match app.chat().session_id() {
        Some(id) => app
            .sessions
            .iter()
            .find(|s| &s.session_id == id)
            .map_or_else(|| " Chat ".to_string(), |s| format!(" Chat: {} ", s.label())),
        None => " Chat ".to_string(),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if is_focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        });

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let inner_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Messages
            Constraint::Length(1), // Separator
            Constraint::Length(1), // Input
        ])
        .split(inner_area);

    let max_scroll = render_messages(frame, app, inner_layout[0]);
    app.set_chat_scroll_limit(max_scroll);
    render_input_line(frame, app, inner_layout[1], inner_layout[2], is_focused);
}

/// Lines for one transcript message.
fn message_lines<'a>(message: &'a Message, open: bool, spinner: &'static str) -> Vec<Line<'a>> {
    let mut lines = Vec::new();

    if message.is_user() {
        lines.push(Line::from(vec![
            Span::styled("[You] ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(message.content.as_str(), Style::default().fg(Color::White)),
        ]));
        lines.push(Line::from(""));
        return lines;
    }

    lines.push(Line::from(Span::styled(
        "[Assistant]",
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )));

    let reasoning_style = Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC);
    for text in message.reasoning.lines() {
        lines.push(Line::from(vec![
            Span::styled("│ ", reasoning_style),
            Span::styled(text, reasoning_style),
        ]));
    }

    if open && message.content.is_empty() {
        lines.push(Line::from(vec![
            Span::styled(spinner, Style::default().fg(Color::Yellow)),
            Span::styled(" thinking...", Style::default().fg(Color::DarkGray)),
        ]));
    } else {
        for text in message.content.split('\n') {
            lines.push(Line::from(Span::raw(text)));
        }
        if open {
            if let Some(last) = lines.last_mut() {
                last.push_span(Span::styled("▌", Style::default().fg(Color::Yellow)));
            }
        }
    }

    lines.push(Line::from(""));
    lines
}

/// Draw the transcript and return how many rows it can scroll up.
fn render_messages(frame: &mut Frame, app: &App, area_full: Rect) -> usize {
    let area = Rect::new(
        area_full.x + CHAT_PADDING,
        area_full.y,
        area_full.width.saturating_sub(CHAT_PADDING * 2 + 1), // +1 for scrollbar
        area_full.height,
    );

    let transcript = app.chat().transcript();
    if transcript.is_empty() {
        let mut help = vec![Line::from(Span::styled(
            "Ask about typhoon tracks, intensity or forecasts. Press Enter to send.",
            Style::default().fg(Color::DarkGray),
        ))];
        if !app.popular_questions.is_empty() {
            help.push(Line::from(""));
            help.push(Line::from(Span::styled(
                "Suggested (Ctrl+P to insert):",
                Style::default().fg(Color::DarkGray),
            )));
            for question in &app.popular_questions {
                help.push(Line::from(Span::styled(
                    format!("  • {question}"),
                    Style::default().fg(Color::Gray),
                )));
            }
        }
        frame.render_widget(Paragraph::new(help).wrap(Wrap { trim: true }), area);
        return 0;
    }

    let open_id = transcript.open_id();
    let lines: Vec<Line> = transcript
        .messages()
        .iter()
        .flat_map(|m| message_lines(m, Some(m.id) == open_id, app.spinner_char()))
        .collect();

    let text = Text::from(lines);
    let visible_lines = area.height as usize;
    let total_wrapped_lines = calculate_wrapped_line_count(&text, area.width as usize);

    // chat_scroll counts rows up from the bottom; the paragraph skips rows from the top
    let max_scroll = total_wrapped_lines.saturating_sub(visible_lines);
    let effective_scroll = app.chat_scroll.min(max_scroll);
    let scroll_offset = max_scroll - effective_scroll;

    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .scroll((to_u16(scroll_offset), 0));
    frame.render_widget(paragraph, area);

    if total_wrapped_lines > visible_lines {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"));
        let mut scrollbar_state = ScrollbarState::new(total_wrapped_lines)
            .position(scroll_offset)
            .viewport_content_length(visible_lines);
        frame.render_stateful_widget(scrollbar, area_full, &mut scrollbar_state);
    }

    max_scroll
}

/// Separator and input prompt.
fn render_input_line(
    frame: &mut Frame,
    app: &App,
    separator_area: Rect,
    input_area: Rect,
    is_focused: bool,
) {
    let separator = Paragraph::new("─".repeat(separator_area.width as usize))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(separator, separator_area);

    let prompt = if is_focused { "> " } else { "│ " };
    let prompt_color = if is_focused { Color::Cyan } else { Color::DarkGray };

    // Keep the cursor visible when the input is wider than the line
    let before_cursor = Span::raw(app.input_before_cursor()).width();
    let available = (input_area.width as usize).saturating_sub(prompt.len() + 1);
    let skip_width = before_cursor.saturating_sub(available);
    let mut skipped = 0;
    let visible: String = app
        .input
        .chars()
        .skip_while(|c| {
            if skipped < skip_width {
                skipped += Span::raw(c.to_string()).width();
                true
            } else {
                false
            }
        })
        .collect();

    let input_line = Line::from(vec![
        Span::styled(prompt, Style::default().fg(prompt_color)),
        Span::styled(visible, Style::default().fg(Color::White)),
    ]);
    frame.render_widget(Paragraph::new(input_line), input_area);

    if is_focused {
        let x = input_area.x + to_u16(prompt.len() + before_cursor.saturating_sub(skipped));
        frame.set_cursor_position((x.min(input_area.right().saturating_sub(1)), input_area.y));
    }
}

/// Status bar: focus indicator, then error, status or key help.
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mode_indicator = match (app.focus, app.is_streaming()) {
        (_, true) => Span::styled(
            format!(" {} STREAMING ", app.spinner_char()),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ),
        (Focus::Chat, false) => {
            Span::styled(" CHAT ", Style::default().fg(Color::Black).bg(Color::Green))
        }
        (Focus::Sessions, false) => {
            Span::styled(" SESSIONS ", Style::default().fg(Color::Black).bg(Color::Magenta))
        }
    };

    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let status = if let Some(ref error) = app.error_message {
        Line::from(vec![
            mode_indicator,
            Span::styled(" ERROR: ", Style::default().fg(Color::Red).bold()),
            Span::styled(error.as_str(), Style::default().fg(Color::Red)),
        ])
    } else if let Some(ref status) = app.status_message {
        Line::from(vec![
            mode_indicator,
            Span::styled(format!(" {status}"), Style::default().fg(Color::Green)),
        ])
    } else if app.focus == Focus::Chat {
        Line::from(vec![
            mode_indicator,
            Span::raw(" "),
            key("Enter"),
            Span::raw(":send "),
            key("Esc"),
            Span::raw(":stop "),
            key("^N"),
            Span::raw(":new "),
            key("^T"),
            Span::raw(":thinking "),
            key("Tab"),
            Span::raw(":sessions "),
            key("^C"),
            Span::raw(":quit"),
        ])
    } else {
        Line::from(vec![
            mode_indicator,
            Span::raw(" "),
            key("Enter"),
            Span::raw(":open "),
            key("n"),
            Span::raw(":new "),
            key("t"),
            Span::raw(":thinking "),
            key("j/k"),
            Span::raw(":scroll "),
            key("q"),
            Span::raw(":quit "),
            key("Tab"),
            Span::raw(":chat"),
        ])
    };

    frame.render_widget(
        Paragraph::new(status).style(Style::default().bg(Color::DarkGray)),
        area,
    );
}

/// Number of visual lines after wrapping.
fn calculate_wrapped_line_count(text: &Text, available_width: usize) -> usize {
    if available_width == 0 {
        return text.lines.len();
    }

    text.lines
        .iter()
        .map(|line| match line.width() {
            0 => 1,
            w => w.div_ceil(available_width),
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_middle_counts_chars() {
        assert_eq!(truncate_middle("short", 10), "short");
        assert_eq!(truncate_middle("http://example.com/api", 11), "http.../api");
        assert_eq!(truncate_middle("台风台风台风台风", 7), "台风...台风");
    }

    #[test]
    fn wrapped_line_count() {
        let text = Text::from(vec![Line::from("abcdef"), Line::from(""), Line::from("abc")]);
        assert_eq!(calculate_wrapped_line_count(&text, 4), 4);
        assert_eq!(calculate_wrapped_line_count(&text, 0), 3);
    }

    #[test]
    fn open_message_without_text_shows_spinner() {
        let message = Message::assistant_placeholder();
        let lines = message_lines(&message, true, "⠋");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].to_string().contains("thinking"));
    }

    #[test]
    fn reasoning_lines_are_prefixed() {
        let message = Message::assistant("Answer\nmore").with_reasoning("step one\nstep two");
        let lines = message_lines(&message, false, "⠋");
        let rendered: Vec<String> = lines.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["[Assistant]", "│ step one", "│ step two", "Answer", "more", ""]
        );
    }

    #[test]
    fn open_message_has_cursor() {
        let message = Message::assistant("Partial");
        let lines = message_lines(&message, true, "⠋");
        assert_eq!(lines[1].to_string(), "Partial▌");
    }
}
