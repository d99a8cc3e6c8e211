use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registry entry as read back from the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub city_id: String,
    pub description: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Case-insensitive substring match over the full name.
    /// Search terms are applied client-side over an already-fetched page.
    pub fn matches_term(&self, term: &str) -> bool {
        self.full_name()
            .to_lowercase()
            .contains(&term.to_lowercase())
    }
}

/// Payload for a new entry submission.
///
/// `search_name` and `created_at` are derived at submit time; the entry id
/// is assigned by the remote store.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
    pub gender: String,
    pub city_id: String,
    pub description: String,
    pub accepted_terms: bool,
}

impl EntryDraft {
    /// Lowercased full name, stored alongside the entry for prefix queries.
    pub fn search_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(first: &str, last: &str) -> Entry {
        Entry {
            id: "e1".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            city_id: "pichincha-quito".to_string(),
            description: String::new(),
            age: None,
            gender: None,
            created_at: None,
        }
    }

    #[test]
    fn test_matches_term_is_case_insensitive() {
        let e = entry("Juan", "Pérez");
        assert!(e.matches_term("juan"));
        assert!(e.matches_term("PÉREZ"));
        assert!(e.matches_term("an pé"));
        assert!(!e.matches_term("maria"));
    }

    #[test]
    fn test_search_name_is_lowercased_full_name() {
        let draft = EntryDraft {
            first_name: "Juan".to_string(),
            last_name: "Pérez".to_string(),
            age: 33,
            gender: "M".to_string(),
            city_id: "pichincha-quito".to_string(),
            description: String::new(),
            accepted_terms: true,
        };
        assert_eq!(draft.search_name(), "juan pérez");
    }
}
