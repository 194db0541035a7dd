/// Keys the composer distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Char(char),
}

/// What a key press does to the draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeKey {
    Submit,
    Newline,
    Edit,
}

impl ComposeKey {
    /// Enter submits; Shift+Enter inserts a line break
    pub fn classify(key: Key, shift: bool) -> Self {
        match key {
            Key::Enter if shift => ComposeKey::Newline,
            Key::Enter => ComposeKey::Submit,
            Key::Backspace | Key::Char(_) => ComposeKey::Edit,
        }
    }
}

/// The message being typed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    text: String,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Apply a key press; returns the submitted text on `Submit`
    pub fn handle_key(&mut self, key: Key, shift: bool) -> Option<String> {
        match (ComposeKey::classify(key, shift), key) {
            (ComposeKey::Submit, _) => Some(std::mem::take(&mut self.text)),
            (ComposeKey::Newline, _) => {
                self.text.push('\n');
                None
            }
            (ComposeKey::Edit, Key::Backspace) => {
                self.text.pop();
                None
            }
            (ComposeKey::Edit, Key::Char(c)) => {
                self.text.push(c);
                None
            }
            (ComposeKey::Edit, Key::Enter) => None,
        }
    }

    /// Line-mode input where a trailing `\` stands in for Shift+Enter
    pub fn feed_line(&mut self, line: &str) -> Option<String> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        match line.strip_suffix('\\') {
            Some(continued) => {
                self.text.push_str(continued);
                self.text.push('\n');
                None
            }
            None => {
                self.text.push_str(line);
                Some(std::mem::take(&mut self.text))
            }
        }
    }

    /// Put back a submission the controller refused so nothing typed is lost
    pub fn restore(&mut self, text: String) {
        if self.text.is_empty() {
            self.text = text;
        } else {
            self.text = format!("{}\n{}", text, self.text);
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}
