use aichat_core::{ChatSession, RequestFailed};
use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use unicode_width::UnicodeWidthChar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: ChatSession,
    pub endpoint: String,

    // Draft cursor, as a char index into the session draft
    pub cursor: usize,

    // The one outstanding generate request, if any
    pub request_task: Option<JoinHandle<Result<String, RequestFailed>>>,

    // Chat history scrolling
    pub chat_scroll: u16,
    pub max_chat_scroll: u16,
    pub chat_height: u16,
    pub follow_bottom: bool,

    // Thinking indicator animation
    pub animation_frame: u8,

    // Layout areas for mouse hit-testing
    pub chat_area: Option<Rect>,
    pub send_button_area: Option<Rect>,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl App {
    pub fn new(session: ChatSession, endpoint: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            session,
            endpoint: endpoint.into(),

            cursor: 0,
            request_task: None,

            chat_scroll: 0,
            max_chat_scroll: 0,
            chat_height: 0,
            follow_bottom: true,

            animation_frame: 0,

            chat_area: None,
            send_button_area: None,
        }
    }

    /// Submit the draft. The request runs on its own task; the event loop
    /// picks up the outcome through [`App::wait_request`].
    pub fn submit(&mut self) -> bool {
        let Some(request) = self.session.begin_draft() else {
            return false;
        };

        self.cursor = 0;
        self.animation_frame = 0;
        self.request_task = Some(tokio::spawn(request.send()));
        true
    }

    /// Resolves when the outstanding request settles; never resolves if there is none.
    pub async fn wait_request(&mut self) -> Result<String, RequestFailed> {
        let Some(task) = self.request_task.as_mut() else {
            return std::future::pending().await;
        };

        let joined = task.await;
        self.request_task = None;
        joined.unwrap_or_else(|e| Err(RequestFailed::Aborted(e.to_string())))
    }

    pub fn send_enabled(&self) -> bool {
        !self.session.is_awaiting_response()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_awaiting_response() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Draft editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(self.session.draft(), self.cursor);
        self.session.draft_mut().insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(self.session.draft(), self.cursor);
            self.session.draft_mut().remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        let char_count = self.session.draft().chars().count();
        if self.cursor < char_count {
            let byte_pos = char_to_byte_index(self.session.draft(), self.cursor);
            self.session.draft_mut().remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.session.draft().chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    /// Move to the start of the cursor's line
    pub fn cursor_home(&mut self) {
        let (_, col) = self.cursor_row_col();
        self.cursor -= col;
    }

    /// Move to the end of the cursor's line
    pub fn cursor_end(&mut self) {
        let rest = self
            .session
            .draft()
            .chars()
            .skip(self.cursor)
            .take_while(|c| *c != '\n')
            .count();
        self.cursor += rest;
    }

    /// Row and column of the cursor within the (possibly multi-line) draft
    pub fn cursor_row_col(&self) -> (usize, usize) {
        let mut row = 0;
        let mut col = 0;
        for c in self.session.draft().chars().take(self.cursor) {
            if c == '\n' {
                row += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (row, col)
    }

    /// Display column of the cursor on its line; wide characters take two
    pub fn cursor_column(&self) -> usize {
        let draft = self.session.draft();
        let before = &draft[..char_to_byte_index(draft, self.cursor)];
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        before[line_start..]
            .chars()
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    // Chat history scrolling

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
        if self.chat_scroll >= self.max_chat_scroll {
            self.chat_scroll = self.max_chat_scroll;
            self.follow_bottom = true;
        }
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.follow_bottom = false;
        self.chat_scroll = 0;
    }

    /// Stick to the newest message; the next render settles the offset
    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
    }
}
