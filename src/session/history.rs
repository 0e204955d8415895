/// Visited URLs in the order they were visited, plus the entry on display.
///
/// Entries are only ever appended, and never twice in a row.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
    cursor: Option<usize>,
}

impl History {
    /// Restores a saved history with the cursor on its most recent entry.
    pub fn from_entries(mut entries: Vec<String>) -> Self {
        entries.dedup();
        let cursor = entries.len().checked_sub(1);
        Self { entries, cursor }
    }

    /// Appends `url` unless it is already the last entry, and moves the cursor
    /// to the end. Returns whether anything was appended.
    pub fn record(&mut self, url: String) -> bool {
        let appended = self.entries.last() != Some(&url);
        if appended {
            self.entries.push(url);
        }
        self.cursor = Some(self.entries.len() - 1);
        appended
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        self.cursor = Some(index);
        true
    }

    pub fn previous_index(&self) -> Option<usize> {
        self.cursor?.checked_sub(1)
    }

    pub fn next_index(&self) -> Option<usize> {
        let next = self.cursor? + 1;
        (next < self.entries.len()).then_some(next)
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_duplicates_are_suppressed() {
        let mut history = History::default();
        assert!(history.record("https://a.com".into()));
        assert!(!history.record("https://a.com".into()));
        assert!(history.record("https://b.com".into()));
        assert!(history.record("https://a.com".into()));
        assert_eq!(
            history.entries(),
            ["https://a.com", "https://b.com", "https://a.com"]
        );
        assert_eq!(history.cursor(), Some(2));
    }

    #[test]
    fn recording_from_the_middle_moves_cursor_to_the_end() {
        let mut history = History::from_entries(vec!["a".into(), "b".into(), "c".into()]);
        history.select(0);
        history.record("a".into());
        assert_eq!(history.len(), 4);
        assert_eq!(history.cursor(), Some(3));
        history.select(3);
        assert!(!history.record("a".into()));
        assert_eq!(history.cursor(), Some(3));
    }

    #[test]
    fn neighbours() {
        let mut history = History::default();
        assert_eq!(history.previous_index(), None);
        assert_eq!(history.next_index(), None);
        history.record("a".into());
        history.record("b".into());
        assert_eq!(history.previous_index(), Some(0));
        assert_eq!(history.next_index(), None);
        history.select(0);
        assert_eq!(history.previous_index(), None);
        assert_eq!(history.next_index(), Some(1));
    }

    #[test]
    fn restored_history_is_cleaned_up() {
        let history =
            History::from_entries(vec!["a".into(), "a".into(), "b".into(), "a".into()]);
        assert_eq!(history.entries(), ["a", "b", "a"]);
        assert_eq!(history.cursor(), Some(2));
        assert_eq!(History::from_entries(Vec::new()).cursor(), None);
    }

    #[test]
    fn select_is_bounds_checked() {
        let mut history = History::from_entries(vec!["a".into()]);
        assert!(!history.select(1));
        assert_eq!(history.cursor(), Some(0));
    }
}
