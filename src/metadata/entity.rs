//! Reporting entity detection.

use super::{Detection, FallbackReason};
use crate::catalog::normalize_label;
use serde::Serialize;

/// Entity identifier used when nothing matches.
pub const UNKNOWN_ENTITY: &str = "UNKNOWN";

/// `(name pattern, canonical id, display name)`
const BUILTIN_ENTITIES: &[(&str, &str, &str)] = &[
    ("deutsche bank", "DBK", "Deutsche Bank AG"),
    ("commerzbank", "CBK", "Commerzbank AG"),
    ("bnp paribas", "BNP", "BNP Paribas SA"),
    ("bnp paribas fortis", "BNPF", "BNP Paribas Fortis SA/NV"),
    ("societe generale", "GLE", "Société Générale SA"),
    ("société générale", "GLE", "Société Générale SA"),
    ("credit agricole", "ACA", "Crédit Agricole SA"),
    ("crédit agricole", "ACA", "Crédit Agricole SA"),
    ("ing groep", "INGA", "ING Groep N.V."),
    ("ing bank", "INGA", "ING Groep N.V."),
    ("abn amro", "ABN", "ABN AMRO Bank N.V."),
    ("rabobank", "RABO", "Coöperatieve Rabobank U.A."),
    ("banco santander", "SAN", "Banco Santander SA"),
    ("bbva", "BBVA", "Banco Bilbao Vizcaya Argentaria SA"),
    ("banco bilbao vizcaya argentaria", "BBVA", "Banco Bilbao Vizcaya Argentaria SA"),
    ("caixabank", "CABK", "CaixaBank SA"),
    ("unicredit", "UCG", "UniCredit S.p.A."),
    ("intesa sanpaolo", "ISP", "Intesa Sanpaolo S.p.A."),
    ("kbc group", "KBC", "KBC Group NV"),
    ("erste group", "EBS", "Erste Group Bank AG"),
    ("raiffeisen bank international", "RBI", "Raiffeisen Bank International AG"),
    ("nordea", "NDA", "Nordea Bank Abp"),
    ("danske bank", "DANSKE", "Danske Bank A/S"),
];

/// A reporting entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    /// Canonical identifier
    pub id: String,
    /// Human-readable name
    pub display_name: String,
}

impl Entity {
    /// The sentinel for undetected entities.
    pub fn unknown() -> Self {
        Self {
            id: UNKNOWN_ENTITY.to_string(),
            display_name: "Unknown".to_string(),
        }
    }
}

/// One name pattern of the entity table.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPattern {
    /// Normalized name phrase
    pub pattern: String,
    /// The entity it identifies
    pub entity: Entity,
}

/// Static name pattern table, longest pattern first.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    patterns: Vec<EntityPattern>,
}

impl EntityTable {
    /// The builtin table.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_ENTITIES.iter().map(|(pattern, id, name)| {
            (pattern.to_string(), id.to_string(), name.to_string())
        }))
    }

    /// Build a table from `(pattern, id, display name)` triples.
    pub fn new(entries: impl IntoIterator<Item = (String, String, String)>) -> Self {
        let mut patterns: Vec<EntityPattern> = entries
            .into_iter()
            .map(|(pattern, id, display_name)| EntityPattern {
                pattern: normalize_label(&pattern),
                entity: Entity { id, display_name },
            })
            .filter(|p| !p.pattern.is_empty())
            .collect();
        // Longest pattern first: the most specific name wins
        patterns.sort_by(|a, b| b.pattern.len().cmp(&a.pattern.len()));
        Self { patterns }
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True when the table has no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Longest word-bounded pattern found in `text`.
    pub fn detect(&self, text: &str) -> Option<&Entity> {
        let haystack = format!(" {} ", normalize_label(text));
        self.patterns
            .iter()
            .find(|p| haystack.contains(&format!(" {} ", p.pattern)))
            .map(|p| &p.entity)
    }

    /// Entity whose identifier appears as a segment of a file identifier
    /// (`dbk_pillar3_2023.json`).
    fn detect_id_segment(&self, file_id: &str) -> Option<&Entity> {
        file_id
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .find_map(|segment| {
                self.patterns
                    .iter()
                    .find(|p| p.entity.id.eq_ignore_ascii_case(segment))
                    .map(|p| &p.entity)
            })
    }

    /// Detect from text, then from the file identifier, then fall back to
    /// [`UNKNOWN_ENTITY`].
    pub fn detect_with_fallback(&self, text: &str, file_id: &str) -> Detection<Entity> {
        if let Some(entity) = self.detect(text) {
            return Detection::detected(entity.clone());
        }
        if let Some(entity) = self.detect(file_id).or_else(|| self.detect_id_segment(file_id)) {
            return Detection::fallback(entity.clone(), FallbackReason::FromFileName);
        }
        Detection::fallback(Entity::unknown(), FallbackReason::Default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Confidence;

    #[test]
    fn test_longest_pattern_wins() {
        let table = EntityTable::builtin();
        let entity = table.detect("Pillar 3 disclosures of BNP Paribas Fortis SA/NV").unwrap();
        assert_eq!(entity.id, "BNPF");
        assert_eq!(table.detect("BNP Paribas Group").unwrap().id, "BNP");
    }

    #[test]
    fn test_word_bounded() {
        let table = EntityTable::builtin();
        assert!(table.detect("Ordeanordeax").is_none());
        assert_eq!(table.detect("NORDEA BANK ABP").unwrap().id, "NDA");
    }

    #[test]
    fn test_file_name_fallback() {
        let table = EntityTable::builtin();
        let detection = table.detect_with_fallback("Risk report", "ucg_pillar3_2023.json");
        assert_eq!(detection.value.id, "UCG");
        assert_eq!(detection.confidence, Confidence::Fallback(FallbackReason::FromFileName));

        let detection = table.detect_with_fallback("Risk report", "commerzbank-2023-q4");
        assert_eq!(detection.value.id, "CBK");
    }

    #[test]
    fn test_unknown_sentinel() {
        let detection = EntityTable::builtin().detect_with_fallback("Risk report", "report");
        assert_eq!(detection.value, Entity::unknown());
        assert!(!detection.is_detected());
    }
}
