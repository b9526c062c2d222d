//! Markdown styling for answers
//!
//! Answers are parsed with pulldown-cmark and flattened into styled lines for
//! the chat bubbles. Block structure (headings, lists, quotes, rules, fenced
//! code) becomes prefixes and separate lines; inline markup becomes a stack of
//! styles so nested emphasis combines.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

fn code_style() -> Style {
    Style::default().fg(Color::Green)
}

fn quote_style() -> Style {
    Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::ITALIC)
}

/// Style `text` into lines of spans, blocks separated by an empty line.
pub fn render_markdown(text: &str) -> Vec<Vec<Span<'static>>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut writer = LineWriter::default();
    for event in Parser::new_ext(text, options) {
        writer.event(event);
    }
    writer.finish()
}

#[derive(Default)]
struct LineWriter {
    lines: Vec<Vec<Span<'static>>>,
    current: Vec<Span<'static>>,
    // Whether `current` holds content beyond quote and list prefixes
    has_text: bool,
    styles: Vec<Style>,
    // Next number for ordered lists, None for bullet lists
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    in_code_block: bool,
}

impl LineWriter {
    fn event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.in_code_block {
                    for line in text.lines() {
                        self.push(Span::styled(line.to_string(), code_style()));
                        self.flush();
                    }
                } else {
                    let style = self.style();
                    self.push(Span::styled(text.into_string(), style));
                }
            }
            Event::Code(code) => self.push(Span::styled(code.into_string(), code_style())),
            Event::Html(html) | Event::InlineHtml(html) => {
                let style = self.style();
                for line in html.lines() {
                    self.push(Span::styled(line.to_string(), style));
                    self.flush();
                }
            }
            Event::SoftBreak | Event::HardBreak => self.flush(),
            Event::Rule => {
                self.block_break();
                self.push(Span::styled(
                    "─".repeat(10),
                    Style::default().fg(Color::DarkGray),
                ));
                self.flush();
            }
            Event::TaskListMarker(done) => {
                let marker = if done { "[x] " } else { "[ ] " };
                let style = self.style();
                self.push(Span::styled(marker, style));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => self.block_break(),
            Tag::Heading { .. } => {
                self.block_break();
                self.push_style(Modifier::BOLD | Modifier::UNDERLINED);
            }
            Tag::BlockQuote(_) => {
                self.block_break();
                self.quote_depth += 1;
                let quoted = self.style().patch(quote_style());
                self.styles.push(quoted);
            }
            Tag::CodeBlock(kind) => {
                self.block_break();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.push(Span::styled(
                            lang.into_string(),
                            Style::default().fg(Color::DarkGray),
                        ));
                        self.flush();
                    }
                }
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.block_break();
                } else {
                    self.flush();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                // Drop the prefixes of an item that never got text
                self.current.clear();
                self.begin_line();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.current
                    .push(Span::raw(format!("{}{}", "  ".repeat(depth), marker)));
            }
            Tag::Emphasis => self.push_style(Modifier::ITALIC),
            Tag::Strong => self.push_style(Modifier::BOLD),
            Tag::Strikethrough => self.push_style(Modifier::CROSSED_OUT),
            Tag::Link { .. } => {
                let link = self.style().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED);
                self.styles.push(link);
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Item => self.flush(),
            TagEnd::Heading(_) => {
                self.styles.pop();
                self.flush();
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.styles.pop();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::CodeBlock => {
                self.flush();
                self.in_code_block = false;
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.styles.pop();
            }
            _ => {}
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, modifier: Modifier) {
        let style = self.style().add_modifier(modifier);
        self.styles.push(style);
    }

    /// Open a line with the quote gutter if nothing is on it yet
    fn begin_line(&mut self) {
        if self.current.is_empty() && self.quote_depth > 0 {
            self.current
                .push(Span::styled("│ ".repeat(self.quote_depth), quote_style()));
        }
    }

    fn push(&mut self, span: Span<'static>) {
        self.begin_line();
        self.current.push(span);
        self.has_text = true;
    }

    /// End the current line. A line holding only a list marker stays open
    /// so a loose item's paragraph lands next to its bullet.
    fn flush(&mut self) {
        if self.has_text {
            self.lines.push(std::mem::take(&mut self.current));
            self.has_text = false;
        }
    }

    /// Separate top-level blocks with one empty line
    fn block_break(&mut self) {
        self.flush();
        if self.lists.is_empty() && self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.lines.push(Vec::new());
        }
    }

    fn finish(mut self) -> Vec<Vec<Span<'static>>> {
        self.flush();
        self.lines
    }
}
