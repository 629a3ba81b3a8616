/// Append-only list of advisory messages shown in the chat panel.
#[derive(Clone, Debug, Default)]
pub struct AdvisoryLog {
    entries: Vec<String>,
}

impl AdvisoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` for empty text or an exact repeat of the newest entry.
    pub fn push(&mut self, message: &str) -> bool {
        if message.is_empty() || self.last() == Some(message) {
            return false;
        }
        self.entries.push(message.to_owned());
        true
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
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
    fn drops_immediate_repeat() {
        let mut log = AdvisoryLog::new();
        assert!(log.push("Compressions too shallow"));
        assert!(!log.push("Compressions too shallow"));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn allows_non_adjacent_repeat() {
        let mut log = AdvisoryLog::new();
        log.push("Push harder");
        log.push("Good rhythm");
        assert!(log.push("Push harder"));
        assert_eq!(log.entries(), ["Push harder", "Good rhythm", "Push harder"]);
    }

    #[test]
    fn ignores_empty() {
        let mut log = AdvisoryLog::new();
        assert!(!log.push(""));
        assert!(log.is_empty());
    }
}
