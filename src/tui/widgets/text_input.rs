use ratatui::layout::Rect;
use std::cmp;

/// Line-based text buffer backing the form fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInput {
    pub lines: Vec<String>,
    pub cursor_line: usize,
    pub cursor_col: usize, // in chars, not bytes
    pub multi_line: bool,
}

impl TextInput {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor_line: 0,
            cursor_col: 0,
            multi_line: false,
        }
    }

    pub fn multi_line() -> Self {
        Self {
            multi_line: true,
            ..Self::new()
        }
    }

    /// Replace the content and put the cursor at the end
    pub fn with_text(mut self, content: &str) -> Self {
        self.lines = if content.is_empty() {
            vec![String::new()]
        } else if self.multi_line {
            content.split('\n').map(|s| s.to_string()).collect()
        } else {
            vec![content.replace('\n', " ")]
        };
        self.cursor_line = self.lines.len() - 1;
        self.cursor_col = self.current_line_len();
        self
    }

    fn current_line_len(&self) -> usize {
        self.lines
            .get(self.cursor_line)
            .map(|l| l.chars().count())
            .unwrap_or(0)
    }

    fn byte_index(line: &str, col: usize) -> usize {
        line.char_indices().nth(col).map(|(i, _)| i).unwrap_or(line.len())
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' {
            self.insert_newline();
            return;
        }
        let col = cmp::min(self.cursor_col, self.current_line_len());
        if let Some(line) = self.lines.get_mut(self.cursor_line) {
            let idx = Self::byte_index(line, col);
            line.insert(idx, ch);
            self.cursor_col = col + 1;
        }
    }

    /// Insert pasted text; newlines collapse to spaces in single-line inputs
    pub fn insert_str(&mut self, text: &str) {
        for ch in text.chars().filter(|c| *c != '\r') {
            if ch == '\n' && !self.multi_line {
                self.insert_char(' ');
            } else {
                self.insert_char(ch);
            }
        }
    }

    pub fn insert_newline(&mut self) {
        if !self.multi_line {
            return;
        }
        let col = cmp::min(self.cursor_col, self.current_line_len());
        let Some(line) = self.lines.get_mut(self.cursor_line) else {
            return;
        };
        let idx = Self::byte_index(line, col);
        let remainder = line.split_off(idx);
        self.lines.insert(self.cursor_line + 1, remainder);
        self.cursor_line += 1;
        self.cursor_col = 0;
    }

    /// Backspace
    pub fn delete_char(&mut self) {
        let col = cmp::min(self.cursor_col, self.current_line_len());
        if col > 0 {
            if let Some(line) = self.lines.get_mut(self.cursor_line) {
                let idx = Self::byte_index(line, col - 1);
                line.remove(idx);
                self.cursor_col = col - 1;
            }
        } else if self.cursor_line > 0 {
            let current = self.lines.remove(self.cursor_line);
            self.cursor_line -= 1;
            self.cursor_col = self.current_line_len();
            self.lines[self.cursor_line].push_str(&current);
        }
    }

    /// Delete key
    pub fn delete_forward(&mut self) {
        let col = cmp::min(self.cursor_col, self.current_line_len());
        if col < self.current_line_len() {
            if let Some(line) = self.lines.get_mut(self.cursor_line) {
                let idx = Self::byte_index(line, col);
                line.remove(idx);
            }
        } else if self.cursor_line + 1 < self.lines.len() {
            let next = self.lines.remove(self.cursor_line + 1);
            self.lines[self.cursor_line].push_str(&next);
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col = cmp::min(self.cursor_col, self.current_line_len()) - 1;
        } else if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = self.current_line_len();
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_col < self.current_line_len() {
            self.cursor_col += 1;
        } else if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.cursor_col = 0;
        }
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = cmp::min(self.cursor_col, self.current_line_len());
        }
    }

    pub fn move_cursor_down(&mut self) {
        if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.cursor_col = cmp::min(self.cursor_col, self.current_line_len());
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_col = self.current_line_len();
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// Screen position of the cursor inside a bordered area, if visible.
    /// Lines are not wrapped; the view scrolls in both directions to keep
    /// the cursor in sight.
    pub fn cursor_screen_pos(&self, area: Rect) -> Option<(u16, u16)> {
        let inner_height = area.height.saturating_sub(2) as usize;
        let inner_width = area.width.saturating_sub(2) as usize;
        if inner_height == 0 || inner_width == 0 {
            return None;
        }
        let row = self.cursor_line - self.scroll_offset(inner_height);
        let col = self.cursor_col() - self.scroll_col(inner_width);
        Some((area.x + 1 + col as u16, area.y + 1 + row as u16))
    }

    /// Cursor column clamped to the current line
    fn cursor_col(&self) -> usize {
        cmp::min(self.cursor_col, self.current_line_len())
    }

    /// First visible line for a viewport of `height` lines
    pub fn scroll_offset(&self, height: usize) -> usize {
        if height == 0 || self.cursor_line < height {
            0
        } else {
            self.cursor_line + 1 - height
        }
    }

    /// First visible column for a viewport of `width` columns.
    /// The cursor may sit one past the last char, so it needs its own cell.
    pub fn scroll_col(&self, width: usize) -> usize {
        let col = self.cursor_col();
        if width == 0 || col < width {
            0
        } else {
            col + 1 - width
        }
    }

    /// Slices of the lines that fit a `height` x `width` viewport
    pub fn visible_lines(&self, height: usize, width: usize) -> Vec<String> {
        let scroll_col = self.scroll_col(width);
        self.lines
            .iter()
            .skip(self.scroll_offset(height))
            .take(height)
            .map(|line| line.chars().skip(scroll_col).take(width).collect())
            .collect()
    }
}

impl Default for TextInput {
    fn default() -> Self {
        Self::new()
    }
}
