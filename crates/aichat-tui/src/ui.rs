use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use aichat_core::{ChatRole, ChatSession};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use crate::app::{App, InputMode};
use crate::markdown::render_markdown;

fn question_bubble() -> Style {
    Style::default().bg(Color::Blue).fg(Color::White)
}

fn answer_bubble() -> Style {
    Style::default().bg(Color::DarkGray).fg(Color::White)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat history, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(4),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" AI Chat App ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.endpoint.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" SCROLL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INPUT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Alt+Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" g/G ", key_style),
            Span::styled(" top/bottom ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let border_color = if app.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Chat ");
    let inner = block.inner(area);

    // Store area for mouse hit-testing and page size for scrolling
    app.chat_area = Some(area);
    app.chat_height = inner.height;

    if app.session.messages().is_empty() && !app.session.is_awaiting_response() {
        app.chat_scroll = 0;
        app.max_chat_scroll = 0;

        let top_padding = inner.height.saturating_sub(2) / 2;
        let mut lines = vec![Line::default(); top_padding as usize];
        lines.push(Line::from("What are you working on today?"));
        lines.push(Line::from("Ask me anything!"));

        let placeholder = Paragraph::new(Text::from(lines))
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let lines = chat_lines(&app.session, app.animation_frame, inner.width as usize);
    let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    app.max_chat_scroll = total.saturating_sub(inner.height);
    app.chat_scroll = if app.follow_bottom {
        app.max_chat_scroll
    } else {
        app.chat_scroll.min(app.max_chat_scroll)
    };

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);

    if app.max_chat_scroll > 0 {
        let mut scrollbar_state =
            ScrollbarState::new(app.max_chat_scroll as usize).position(app.chat_scroll as usize);
        let track = Rect::new(area.x, area.y + 1, area.width, area.height.saturating_sub(2));
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            track,
            &mut scrollbar_state,
        );
    }
}

/// Every line of the conversation, already wrapped to `width` columns.
fn chat_lines(session: &ChatSession, animation_frame: u8, width: usize) -> Vec<Line<'static>> {
    let bubble_max = (width * 4 / 5).max(4);
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in session.messages() {
        match msg.role {
            ChatRole::Question => {
                lines.push(label("You", Color::Cyan, Alignment::Right));
                let body = msg
                    .content
                    .lines()
                    .map(|line| vec![Span::raw(line.to_string())])
                    .collect();
                lines.extend(bubble_lines(body, bubble_max, question_bubble(), Alignment::Right));
            }
            ChatRole::Answer => {
                lines.push(label("AI", Color::Yellow, Alignment::Left));
                let body = render_markdown(&msg.content);
                lines.extend(bubble_lines(body, bubble_max, answer_bubble(), Alignment::Left));
            }
        }
        lines.push(Line::default());
    }

    if session.is_awaiting_response() {
        lines.push(label("AI", Color::Yellow, Alignment::Left));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize % 3) + 1);
        let thinking = Span::styled(
            format!("Thinking{:<3}", dots),
            Style::default().add_modifier(Modifier::ITALIC),
        );
        lines.extend(bubble_lines(
            vec![vec![thinking]],
            bubble_max,
            answer_bubble(),
            Alignment::Left,
        ));
    }

    lines
}

fn label(text: &'static str, color: Color, alignment: Alignment) -> Line<'static> {
    Line::from(Span::styled(
        text,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
    .alignment(alignment)
}

/// Wrap `body` into a padded block of uniform width painted with `bubble`.
fn bubble_lines(
    body: Vec<Vec<Span<'static>>>,
    max_width: usize,
    bubble: Style,
    alignment: Alignment,
) -> Vec<Line<'static>> {
    // One column of padding on each side
    let text_width = max_width.saturating_sub(2).max(1);

    let mut wrapped: Vec<Vec<Span<'static>>> = body
        .into_iter()
        .flat_map(|line| wrap_spans(line, text_width))
        .collect();
    if wrapped.is_empty() {
        wrapped.push(Vec::new());
    }

    let inner_width = wrapped.iter().map(|l| spans_width(l)).max().unwrap_or(0);

    wrapped
        .into_iter()
        .map(|spans| {
            let pad = inner_width - spans_width(&spans);
            let mut out = vec![Span::styled(" ", bubble)];
            out.extend(
                spans
                    .into_iter()
                    .map(|span| Span::styled(span.content, bubble.patch(span.style))),
            );
            out.push(Span::styled(" ".repeat(pad + 1), bubble));
            Line::from(out).alignment(alignment)
        })
        .collect()
}

/// Display columns, so wide characters count twice
fn spans_width(spans: &[Span]) -> usize {
    spans.iter().map(Span::width).sum()
}

/// Byte index of the longest prefix of `s` that fits in `cols` columns
fn split_at_width(s: &str, cols: usize) -> usize {
    let mut acc = 0;
    for (byte_idx, ch) in s.char_indices() {
        let w = ch.width().unwrap_or(0);
        if acc + w > cols {
            return byte_idx;
        }
        acc += w;
    }
    s.len()
}

/// Greedy word wrap that keeps each word's style.
///
/// `width` is in display columns. Leading whitespace survives on the first
/// line only; words wider than `width` are split.
fn wrap_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Vec<Span<'static>>> {
    let width = width.max(1);
    let mut lines: Vec<Vec<Span<'static>>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0;
    let mut wrapped = false;

    for span in spans {
        for piece in split_words(&span.content) {
            let piece_width = piece.width();

            if piece.starts_with(char::is_whitespace) {
                if wrapped && current_width == 0 {
                    continue;
                }
                if current_width + piece_width > width {
                    lines.push(finish_line(&mut current));
                    current_width = 0;
                    wrapped = true;
                    continue;
                }
                current.push(Span::styled(piece.to_string(), span.style));
                current_width += piece_width;
                continue;
            }

            if current_width > 0 && current_width + piece_width > width && piece_width <= width {
                lines.push(finish_line(&mut current));
                current_width = 0;
                wrapped = true;
            }

            let mut rest = piece;
            while !rest.is_empty() {
                let room = width - current_width;
                let remaining = rest.width();
                if remaining <= room {
                    current.push(Span::styled(rest.to_string(), span.style));
                    current_width += remaining;
                    break;
                }
                let mut split = split_at_width(rest, room);
                if split == 0 && current_width == 0 {
                    // A character wider than the whole line still has to go somewhere
                    split = rest.chars().next().map_or(rest.len(), char::len_utf8);
                }
                if split > 0 {
                    current.push(Span::styled(rest[..split].to_string(), span.style));
                    rest = &rest[split..];
                }
                lines.push(finish_line(&mut current));
                current_width = 0;
                wrapped = true;
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(finish_line(&mut current));
    }

    lines
}

/// Alternating runs of whitespace and non-whitespace
fn split_words(s: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut prev_space: Option<bool> = None;

    for (i, c) in s.char_indices() {
        let space = c.is_whitespace();
        if prev_space.is_some_and(|p| p != space) {
            pieces.push(&s[start..i]);
            start = i;
        }
        prev_space = Some(space);
    }
    if start < s.len() {
        pieces.push(&s[start..]);
    }

    pieces
}

fn finish_line(current: &mut Vec<Span<'static>>) -> Vec<Span<'static>> {
    while current
        .last()
        .is_some_and(|s| s.content.chars().all(char::is_whitespace))
    {
        current.pop();
    }
    std::mem::take(current)
}

/// The part of `line` between display columns `skip` and `skip + take`.
/// A wide character cut by the left edge becomes blanks so columns stay put.
fn visible_columns(line: &str, skip: usize, take: usize) -> String {
    let mut out = String::new();
    let mut col = 0;
    for ch in line.chars() {
        let w = ch.width().unwrap_or(0);
        let start = col;
        col += w;
        if col <= skip {
            continue;
        }
        if start < skip {
            out.push_str(&" ".repeat(col - skip));
            continue;
        }
        if col > skip + take {
            break;
        }
        out.push(ch);
    }
    out
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let [box_area, button_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(10),
    ])
    .areas(area);

    app.send_button_area = Some(button_area);

    let editing = app.input_mode == InputMode::Editing;
    let input_border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Ask ");

    // Scroll the visible window so the cursor stays inside the box
    let inner_width = box_area.width.saturating_sub(2) as usize;
    let inner_height = box_area.height.saturating_sub(2) as usize;
    let (row, _) = app.cursor_row_col();
    let col = app.cursor_column();
    let row_offset = if inner_height > 0 && row >= inner_height {
        row - inner_height + 1
    } else {
        0
    };
    let col_offset = if inner_width > 0 && col >= inner_width {
        col - inner_width + 1
    } else {
        0
    };

    let draft = app.session.draft();
    let input = if draft.is_empty() {
        Paragraph::new(Span::styled(
            "Ask anything...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let visible: Vec<Line> = draft
            .split('\n')
            .skip(row_offset)
            .take(inner_height)
            .map(|line| Line::from(visible_columns(line, col_offset, inner_width)))
            .collect();
        // Cyan to match the "You" label
        Paragraph::new(Text::from(visible)).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(input_block), box_area);

    // Show cursor when editing
    if editing {
        frame.set_cursor_position((
            box_area.x + 1 + (col - col_offset) as u16,
            box_area.y + 1 + (row - row_offset) as u16,
        ));
    }

    let (button_text, button_style) = if app.send_enabled() {
        ("Send", Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD))
    } else {
        ("...", Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM))
    };
    let button = Paragraph::new(button_text)
        .style(button_style)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(button_style),
        );
    frame.render_widget(button, button_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubGenerator;
    use aichat_core::{RequestFailed, FALLBACK_MESSAGE};
    use ratatui::{backend::TestBackend, Terminal};

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn screen(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for row in buffer.content.chunks(width as usize) {
            for cell in row {
                out.push_str(cell.symbol());
            }
            out.push('\n');
        }
        out
    }

    fn app() -> App {
        App::new(
            ChatSession::new(StubGenerator::replying("x")),
            "http://localhost/generate",
        )
    }

    #[test]
    fn test_wrap_spans_words() {
        let lines = wrap_spans(vec![Span::raw("the quick brown fox")], 10);
        let text: Vec<String> = lines
            .iter()
            .map(|l| l.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text, vec!["the quick", "brown fox"]);
    }

    #[test]
    fn test_wrap_spans_splits_long_words() {
        let lines = wrap_spans(vec![Span::raw("abcdefghij")], 4);
        let text: Vec<String> = lines
            .iter()
            .map(|l| l.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_spans_keeps_styles_and_indent() {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let lines = wrap_spans(
            vec![Span::raw("  lead "), Span::styled("strong words", bold)],
            12,
        );
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][0].content, "  ");
        assert_eq!(lines[0][1].content, "lead");
        assert_eq!(lines[1][0].content, "strong");
        assert_eq!(lines[1][2].content, "words");
        assert_eq!(lines[1][2].style, bold);
    }

    #[test]
    fn test_wrap_spans_measures_wide_chars() {
        let lines = wrap_spans(vec![Span::raw("日本語テキスト")], 5);
        let text: Vec<String> = lines
            .iter()
            .map(|l| l.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text, vec!["日本", "語テ", "キス", "ト"]);

        // Narrower than one wide character still makes progress
        assert_eq!(wrap_spans(vec![Span::raw("日本")], 1).len(), 2);
    }

    #[tokio::test]
    async fn test_wide_char_bubbles_stay_within_width() {
        let mut session = ChatSession::new(StubGenerator::replying("答えは**東京**です。"));
        session.submit("日本語のテキストです日本語のテキストです").await;

        let lines = chat_lines(&session, 0, 20);
        for line in &lines {
            assert!(line.width() <= 16, "{:?} is {} columns", line_text(line), line.width());
        }

        // Every row of the question bubble is padded to the same width
        let ai_label = lines.iter().position(|l| line_text(l) == "AI").unwrap();
        let question_rows: Vec<usize> = lines[1..ai_label - 1].iter().map(Line::width).collect();
        assert!(question_rows.len() > 1);
        assert!(question_rows.iter().all(|w| *w == question_rows[0]));
    }

    #[test]
    fn test_visible_columns() {
        assert_eq!(visible_columns("日本語", 0, 4), "日本");
        assert_eq!(visible_columns("日本語", 1, 4), " 本");
        assert_eq!(visible_columns("abc", 1, 5), "bc");
    }

    #[test]
    fn test_wrap_empty_line() {
        assert_eq!(wrap_spans(Vec::new(), 10), vec![Vec::<Span>::new()]);
    }

    #[tokio::test]
    async fn test_chat_lines_alignment_and_width() {
        let mut session = ChatSession::new(StubGenerator::replying("**Paris** is the capital"));
        session.submit("capital of France").await;

        let lines = chat_lines(&session, 0, 20);
        assert_eq!(line_text(&lines[0]), "You");
        assert_eq!(lines[0].alignment, Some(Alignment::Right));
        assert_eq!(lines[1].alignment, Some(Alignment::Right));

        let ai_label = lines.iter().position(|l| line_text(l) == "AI").unwrap();
        assert_eq!(lines[ai_label].alignment, Some(Alignment::Left));

        // Bubbles never exceed 80% of the width
        for line in &lines {
            assert!(line.width() <= 16);
        }

        let answer: String = lines[ai_label + 1..]
            .iter()
            .map(line_text)
            .collect::<Vec<_>>()
            .join(" ");
        assert!(answer.contains("Paris"));
        assert!(!answer.contains("**"));
    }

    #[test]
    fn test_empty_state_placeholder() {
        let mut app = app();
        let out = screen(&mut app, 60, 16);
        assert!(out.contains("AI Chat App"));
        assert!(out.contains("What are you working on today?"));
        assert!(out.contains("Ask anything..."));
        assert!(out.contains("Send"));
    }

    #[test]
    fn test_thinking_indicator_while_awaiting() {
        let mut app = app();
        app.session.set_draft("hello");
        assert!(app.session.begin_draft().is_some());

        let out = screen(&mut app, 60, 16);
        assert!(out.contains("hello"));
        assert!(out.contains("Thinking."));
        assert!(!out.contains("Send"));
        assert!(!out.contains("What are you working on today?"));
    }

    #[test]
    fn test_fallback_renders_and_scroll_follows_bottom() {
        let mut app = app();
        for i in 0..10 {
            assert!(app.session.begin(&format!("question {}", i)).is_some());
            app.session.finish(Err(RequestFailed::Aborted("x".into())));
        }

        let out = screen(&mut app, 60, 16);
        assert!(app.max_chat_scroll > 0);
        assert_eq!(app.chat_scroll, app.max_chat_scroll);
        assert!(out.contains("question 9"));
        assert!(out.contains(&FALLBACK_MESSAGE[..28]));
        assert!(!out.contains("question 0"));
    }
}
