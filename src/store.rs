//! Fact persistence.
//!
//! Stores are keyed by [`FactKey`], so committing the same document twice
//! leaves exactly one fact per key.

use crate::error::Result;
use crate::pipeline::{ExtractedFact, FactKey};
use indexmap::IndexMap;

/// A sink for normalized facts.
pub trait FactStore {
    /// Insert or replace facts by key. Returns the number of facts written.
    fn upsert_all(&mut self, facts: &[ExtractedFact]) -> Result<usize>;
}

/// In-memory fact store preserving first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryFactStore {
    facts: IndexMap<FactKey, ExtractedFact>,
}

impl MemoryFactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored facts.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Look up a fact by key.
    pub fn get(&self, key: &FactKey) -> Option<&ExtractedFact> {
        self.facts.get(key)
    }

    /// Iterate over stored facts.
    pub fn facts(&self) -> impl Iterator<Item = &ExtractedFact> {
        self.facts.values()
    }

    /// Facts of one entity, in insertion order.
    pub fn facts_for_entity<'a>(&'a self, entity_id: &'a str) -> impl Iterator<Item = &'a ExtractedFact> + 'a {
        self.facts.values().filter(move |f| f.entity_id == entity_id)
    }

    /// Serialize all facts as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        let facts: Vec<&ExtractedFact> = self.facts.values().collect();
        Ok(serde_json::to_string_pretty(&facts)?)
    }
}

impl FactStore for MemoryFactStore {
    fn upsert_all(&mut self, facts: &[ExtractedFact]) -> Result<usize> {
        for fact in facts {
            self.facts.insert(fact.key(), fact.clone());
        }
        Ok(facts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fact(row_id: &str, value: f64) -> ExtractedFact {
        ExtractedFact {
            entity_id: "DBK".to_string(),
            reporting_period: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            template_code: "KM1".to_string(),
            row_id: row_id.to_string(),
            dimension: None,
            item_ref: None,
            value,
            is_ratio: false,
            source_page: 3,
        }
    }

    #[test]
    fn test_upsert_replaces_by_key() {
        let mut store = MemoryFactStore::new();
        store.upsert_all(&[fact("1", 4921.0), fact("2", 5400.0)]).unwrap();
        store.upsert_all(&[fact("1", 4922.0)]).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&fact("1", 0.0).key()).unwrap().value, 4922.0);
        let order: Vec<&str> = store.facts().map(|f| f.row_id.as_str()).collect();
        assert_eq!(order, vec!["1", "2"]);
    }

    #[test]
    fn test_json_export() {
        let mut store = MemoryFactStore::new();
        store.upsert_all(&[fact("1", 4921.0)]).unwrap();
        let json = store.to_json().unwrap();
        assert!(json.contains("\"reporting_period\": \"2023-12-31\""));
        assert_eq!(store.facts_for_entity("DBK").count(), 1);
        assert_eq!(store.facts_for_entity("BNP").count(), 0);
    }
}
