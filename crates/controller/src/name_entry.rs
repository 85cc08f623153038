use crate::display::LCD_COLS;

const ENTER: char = '\r';
const NEWLINE: char = '\n';
const CTRL_C: char = '\u{3}';
const DELETE: char = '\u{7f}';
const BACKSPACE: char = '\u{8}';

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    Editing,
    Submitted(String),
}

/// Name typed one key at a time on the prop's keyboard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameEntry {
    name: String,
}

impl NameEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&mut self, key: char) -> KeyOutcome {
        match key {
            ENTER | NEWLINE | CTRL_C => return KeyOutcome::Submitted(self.name.clone()),
            DELETE | BACKSPACE => {
                self.name.pop();
            }
            c if c.is_control() => {}
            c => {
                // the bottom LCD row is the only place the name is shown
                if self.name.chars().count() < LCD_COLS {
                    self.name.push(c);
                }
            }
        }
        KeyOutcome::Editing
    }
}
