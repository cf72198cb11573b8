use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::message::{Role, PLACEHOLDER_TEXT};

const INPUT_HINT: &str = "Ask me something… (try: what is RAG? / time / weather Boston)";

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;
    let mut bold = false;

    while let Some(pos) = rest.find("**") {
        let chunk = &rest[..pos];
        if !chunk.is_empty() {
            spans.push(if bold {
                Span::styled(
                    chunk.to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                )
            } else {
                Span::raw(chunk.to_string())
            });
        }
        rest = &rest[pos + 2..];
        bold = !bold;
    }

    if !rest.is_empty() {
        if bold {
            // Unclosed marker, render it literally
            spans.push(Span::raw(format!("**{}", rest)));
        } else {
            spans.push(Span::raw(rest.to_string()));
        }
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, transcript, input bar, footer
    let [header_area, transcript_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, transcript_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let badge = if app.state.is_loading {
        Span::styled(" Thinking… ", Style::default().fg(Color::Yellow).bold())
    } else {
        Span::styled(" Ready ", Style::default().fg(Color::Green).bold())
    };

    let title = Line::from(vec![
        Span::styled(" chaterm ", Style::default().fg(Color::Cyan).bold()),
        badge,
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints = Line::from(vec![
        Span::styled(
            " Enter send · Up/Down scroll · Ctrl+R reset · Esc quit ",
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("[{} messages]", app.state.messages.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(hints), area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    // Store inner dimensions for scroll calculations (minus borders)
    app.transcript_height = area.height.saturating_sub(2);
    app.transcript_width = area.width.saturating_sub(2);

    let mut lines: Vec<Line> = Vec::new();
    let pending_id = app.pending_placeholder_id().map(str::to_string);

    for msg in &app.state.messages {
        lines.push(role_label(msg.role));

        let is_pending_placeholder = app.state.is_loading
            && pending_id.as_deref() == Some(msg.id.as_str())
            && msg.content == PLACEHOLDER_TEXT;

        if is_pending_placeholder {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        } else if msg.error {
            for line in msg.content.lines() {
                lines.push(Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(Color::Red),
                )));
            }
        } else if msg.role == Role::Assistant {
            for line in msg.content.lines() {
                lines.push(parse_markdown_line(line));
            }
        } else {
            for line in msg.content.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }

        if let Some(summary) = msg.sources_summary() {
            lines.push(Line::from(Span::styled(
                summary,
                Style::default().fg(Color::DarkGray),
            )));
        }

        lines.push(Line::default());
    }

    let transcript = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.transcript_scroll, 0));

    frame.render_widget(transcript, area);
}

fn role_label(role: Role) -> Line<'static> {
    let (label, color) = match role {
        Role::User => ("You:", Color::Cyan),
        Role::Assistant => ("AI:", Color::Yellow),
        Role::System => ("System:", Color::Magenta),
        Role::Tool => ("Tool:", Color::Magenta),
    };
    Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.state.is_loading {
        Color::DarkGray
    } else {
        Color::Yellow
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message (Enter to send) ");

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (scroll_offset, cursor_x) = input_window(app.cursor, inner_width);

    let input = if app.input.is_empty() {
        Paragraph::new(INPUT_HINT)
            .style(Style::default().fg(Color::DarkGray))
            .block(input_block)
    } else {
        let visible_text: String = app
            .input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text)
            .style(Style::default().fg(Color::Cyan))
            .block(input_block)
    };

    frame.render_widget(input, area);

    frame.set_cursor_position((
        area.x.saturating_add(cursor_x).saturating_add(1),
        area.y.saturating_add(1),
    ));
}

/// Scroll offset keeping the cursor inside the visible input window, plus the
/// cursor column within that window. Stays in bounds on a zero-width area.
fn input_window(cursor_pos: usize, inner_width: usize) -> (usize, u16) {
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };
    let cursor_x = cursor_pos.saturating_sub(scroll_offset).min(inner_width) as u16;
    (scroll_offset, cursor_x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn bold_markers_become_styled_spans() {
        let line = parse_markdown_line("a **b** c");
        assert_eq!(flatten(&line), "a b c");
        assert_eq!(line.spans.len(), 3);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn unclosed_bold_marker_is_literal() {
        let line = parse_markdown_line("a **b");
        assert_eq!(flatten(&line), "a **b");
    }

    #[test]
    fn plain_text_is_one_span() {
        let line = parse_markdown_line("just text");
        assert_eq!(line.spans.len(), 1);
    }

    #[test]
    fn cursor_stays_within_input_window() {
        // Cursor left of the window edge: no scrolling
        assert_eq!(input_window(5, 10), (0, 5));
        // Cursor past the edge: window slides, cursor pinned to last column
        assert_eq!(input_window(15, 10), (6, 9));
        // Degenerate zero-width area with a long input must not overflow
        assert_eq!(input_window(1000, 0), (0, 0));
    }
}
