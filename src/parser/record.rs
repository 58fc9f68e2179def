//! Flat key/value record produced from one log line.

use std::collections::HashMap;

/// Fields of one parsed line plus the event tag that selected its grammar.
///
/// Keys are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    event_tag: String,
    fields: HashMap<String, String>,
}

impl RawRecord {
    #[must_use]
    pub fn new(event_tag: impl Into<String>) -> Self {
        Self {
            event_tag: event_tag.into(),
            fields: HashMap::new(),
        }
    }

    /// Builder-style insert, handy in tests.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn event_tag(&self) -> &str {
        &self.event_tag
    }

    /// Insert a field. The key is lower-cased; a later value replaces an earlier one.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_ascii_lowercase(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_lowercased() {
        let record = RawRecord::new("ActionModifyGold")
            .with("PlayerId", "P1")
            .with("Gold", "4");
        assert_eq!(record.event_tag(), "ActionModifyGold");
        assert_eq!(record.get("playerid"), Some("P1"));
        assert_eq!(record.get("gold"), Some("4"));
        assert_eq!(record.get("Gold"), None);
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_later_value_wins() {
        let mut record = RawRecord::new("ActionEnterShopPhase");
        record.insert("round", "1");
        record.insert("Round", "2");
        assert_eq!(record.get("round"), Some("2"));
        assert!(!record.is_empty());
    }
}
