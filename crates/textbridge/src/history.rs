use std::collections::VecDeque;

/// Maximum number of messages kept for quick reuse.
pub const HISTORY_CAPACITY: usize = 5;

/// Recently sent messages, most recent first, unique by text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: VecDeque<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted entries (most recent first).
    ///
    /// Duplicates and anything past capacity are dropped so a hand-edited
    /// store cannot break the bound.
    pub fn from_entries(entries: Vec<String>) -> Self {
        let mut history = Self::new();
        for entry in entries.into_iter().rev() {
            history.record(entry);
        }
        history
    }

    /// Move `message` to the front, evicting the oldest entry past capacity.
    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.entries.retain(|m| *m != message);
        self.entries.push_front(message);
        self.entries.truncate(HISTORY_CAPACITY);
    }

    /// Entries, most recent first.
    pub fn list(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// The `index`-th most recent message (0 = newest).
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}
