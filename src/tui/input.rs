//! Input field handling for the terminal user interface.
//!
//! The cursor counts characters, not bytes, so Chinese text edits safely.

/// A text input field with cursor position and active state management.
#[derive(Clone, Default)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
    pub active: bool,
}

impl InputField {
    /// Create a new empty input field.
    pub fn new() -> Self {
        Self::default()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn char_len(&self) -> usize {
        self.value.chars().count()
    }

    /// Insert a character at the current cursor position.
    pub fn handle_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor.
    pub fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_index(self.cursor - 1);
            self.value.remove(at);
            self.cursor -= 1;
        }
    }

    /// Delete the character at the cursor position.
    pub fn handle_delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.char_len() {
            self.cursor += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_multibyte_text() {
        let mut field = InputField::new();
        field.handle_char('风');
        field.handle_char('管');
        assert_eq!(field.cursor, 2);
        field.move_cursor_left();
        field.handle_char('阀');
        assert_eq!(field.value, "风阀管");
        field.handle_backspace();
        assert_eq!(field.value, "风管");
        field.handle_delete();
        assert_eq!(field.value, "风");
        field.move_cursor_right();
        field.move_cursor_right();
        assert_eq!(field.cursor, 1);
    }

    #[test]
    fn test_backspace_at_start_is_noop() {
        let mut field = InputField::new();
        field.handle_backspace();
        field.handle_delete();
        assert!(field.value.is_empty());
        field.handle_char('a');
        field.move_cursor_left();
        field.handle_delete();
        assert_eq!((field.value.as_str(), field.cursor), ("", 0));
    }
}
