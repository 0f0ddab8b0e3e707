//! Template catalog: the known, versioned disclosure templates.
//!
//! A template maps row identifiers to [`RowSpec`]s (expected label, canonical
//! item reference, ratio flag) plus the data-driven exceptions the extractors
//! consult: label overrides for rows that are routinely mislabeled or shifted,
//! ratio overrides for lexically ambiguous labels, and ratio rows exempt from
//! percentage re-basing.
//!
//! The catalog is immutable once loaded and is shared read-only across
//! documents (`Arc<TemplateCatalog>`).

use crate::error::{Error, Result};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

const BUILTIN_TEMPLATES: &str = include_str!("builtin_templates.json");

lazy_static! {
    static ref BUILTIN: Arc<TemplateCatalog> = Arc::new(
        TemplateCatalog::from_json_str(BUILTIN_TEMPLATES).unwrap()
    );
}

/// A secondary axis separating values reported against the same row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    /// First measure of a multi-measure row
    Primary,
    /// Second measure of a multi-measure row
    Secondary,
}

impl Dimension {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Primary => "primary",
            Dimension::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a row is recognized in free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Identifier alone; the label only raises confidence
    ExactId,
    /// Identifier followed by a fuzzy label prefix
    #[default]
    IdWithLabel,
    /// Fuzzy label anywhere on the line; the identifier is ignored
    LabelOnly,
}

/// One row of a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSpec {
    /// Template-local identifier ("1", "4a", "EU 7a")
    pub row_id: String,
    /// Label printed next to the row
    pub expected_label: String,
    /// Cross-template item this row maps to, when known
    pub item_ref: Option<String>,
    /// Row reports a ratio rather than an amount
    pub is_ratio: bool,
    /// Free-text matching strategy
    pub matcher: MatchStrategy,
    /// Row carries only this dimension in multi-dimension templates
    pub only_dimension: Option<Dimension>,
}

/// A label phrase that pins a row to a canonical identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelOverride {
    /// Phrase matched against the normalized label text
    pub label: String,
    /// Canonical row identifier
    pub row_id: String,
}

/// An immutable, versioned disclosure template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateDefinition {
    /// Template code ("KM1")
    pub code: String,
    /// Catalog version of this template
    pub version: String,
    /// Human-readable title
    pub title: String,
    /// Section titles that refer to this template in an index
    pub aliases: Vec<String>,
    /// Reported dimensions; empty for single-value templates
    pub dimensions: Vec<Dimension>,
    /// Label overrides, checked in order
    pub label_overrides: Vec<LabelOverride>,
    /// Ratio rows whose values are left as parsed
    pub rebase_exempt: Vec<String>,
    rows: IndexMap<String, RowSpec>,
    #[serde(skip)]
    id_lookup: HashMap<String, String>,
}

impl TemplateDefinition {
    /// Look up a row by its exact identifier.
    pub fn row(&self, row_id: &str) -> Option<&RowSpec> {
        self.rows.get(row_id)
    }

    /// Rows in catalog order.
    pub fn rows(&self) -> impl Iterator<Item = &RowSpec> {
        self.rows.values()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when rows report more than one measure.
    pub fn is_multi_dimensional(&self) -> bool {
        self.dimensions.len() > 1
    }

    /// True when `row_id` is exempt from ratio re-basing.
    pub fn is_rebase_exempt(&self, row_id: &str) -> bool {
        self.rebase_exempt.iter().any(|r| r == row_id)
    }

    /// Resolve a printed identifier ("EU-7a", "eu 7A", "7a") to a row.
    ///
    /// The `EU` marker is optional in both directions.
    pub fn resolve_row_id(&self, printed: &str) -> Option<&RowSpec> {
        let key = normalize_row_id(printed);
        if key.is_empty() {
            return None;
        }
        let row_id = self
            .id_lookup
            .get(&key)
            .or_else(|| key.strip_prefix("eu").and_then(|k| self.id_lookup.get(k)))
            .or_else(|| self.id_lookup.get(&format!("eu{}", key)))?;
        self.rows.get(row_id)
    }

    /// Canonical row for a label covered by the override table.
    pub fn override_for_label(&self, label: &str) -> Option<&RowSpec> {
        let normalized = normalize_label(label);
        if normalized.is_empty() {
            return None;
        }
        self.label_overrides
            .iter()
            .find(|o| normalized.contains(&normalize_label(&o.label)))
            .and_then(|o| self.rows.get(&o.row_id))
    }

    fn from_file(file: TemplateFile) -> Result<Self> {
        let mut rows = IndexMap::new();
        let mut id_lookup = HashMap::new();

        for row in file.rows {
            let mut is_ratio = row.is_ratio.unwrap_or_else(|| infer_is_ratio(&row.label));
            if let Some(&forced) = file.ratio_overrides.get(&row.row_id) {
                is_ratio = forced;
            }
            if let Some(dim) = row.only_dimension {
                if !file.dimensions.contains(&dim) {
                    return Err(Error::Catalog(format!(
                        "{} row {} restricted to undeclared dimension {}",
                        file.code, row.row_id, dim
                    )));
                }
            }

            let spec = RowSpec {
                row_id: row.row_id.clone(),
                expected_label: row.label,
                item_ref: row.item_ref,
                is_ratio,
                matcher: row.matcher,
                only_dimension: row.only_dimension,
            };
            if id_lookup
                .insert(normalize_row_id(&row.row_id), row.row_id.clone())
                .is_some()
            {
                return Err(Error::Catalog(format!(
                    "duplicate row {} in {}",
                    row.row_id, file.code
                )));
            }
            rows.insert(row.row_id, spec);
        }

        for referenced in file
            .label_overrides
            .iter()
            .map(|o| &o.row_id)
            .chain(file.rebase_exempt.iter())
            .chain(file.ratio_overrides.keys())
        {
            if !rows.contains_key(referenced) {
                return Err(Error::Catalog(format!(
                    "{} references unknown row {}",
                    file.code, referenced
                )));
            }
        }

        Ok(Self {
            code: file.code,
            version: file.version,
            title: file.title,
            aliases: file.aliases,
            dimensions: file.dimensions,
            label_overrides: file.label_overrides,
            rebase_exempt: file.rebase_exempt,
            rows,
            id_lookup,
        })
    }
}

/// Registry of templates keyed by code.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: IndexMap<String, TemplateDefinition>,
}

impl TemplateCatalog {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Arc<TemplateCatalog> {
        Arc::clone(&BUILTIN)
    }

    /// Parse a catalog from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut templates = IndexMap::new();
        for template in file.templates {
            let definition = TemplateDefinition::from_file(template)?;
            let code = definition.code.clone();
            if templates.insert(code.clone(), definition).is_some() {
                return Err(Error::Catalog(format!("duplicate template {}", code)));
            }
        }
        Ok(Self { templates })
    }

    /// Load a catalog file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Look up a template by code.
    pub fn get(&self, code: &str) -> Option<&TemplateDefinition> {
        self.templates.get(code)
    }

    /// Templates in catalog order.
    pub fn templates(&self) -> impl Iterator<Item = &TemplateDefinition> {
        self.templates.values()
    }

    /// Template codes in catalog order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True when the catalog holds no templates.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// `(normalized alias, template code)` pairs, longest alias first.
    pub fn alias_table(&self) -> Vec<(String, String)> {
        let mut aliases: Vec<(String, String)> = self
            .templates
            .values()
            .flat_map(|t| {
                t.aliases
                    .iter()
                    .map(move |a| (normalize_label(a), t.code.clone()))
            })
            .filter(|(alias, _)| !alias.is_empty())
            .collect();
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        aliases
    }
}

/// Normalize a printed row identifier: lowercase, no spaces, dashes or dots.
pub fn normalize_row_id(printed: &str) -> String {
    printed
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalize a label: lowercase, punctuation to spaces, collapsed whitespace.
pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Guess whether a label describes a ratio.
fn infer_is_ratio(label: &str) -> bool {
    let lower = label.to_lowercase();
    lower.contains('%') || lower.contains("ratio") || lower.contains("percentage")
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    templates: Vec<TemplateFile>,
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    code: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    dimensions: Vec<Dimension>,
    rows: Vec<RowFile>,
    #[serde(default)]
    label_overrides: Vec<LabelOverride>,
    #[serde(default)]
    ratio_overrides: IndexMap<String, bool>,
    #[serde(default)]
    rebase_exempt: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RowFile {
    row_id: String,
    label: String,
    #[serde(default)]
    item_ref: Option<String>,
    #[serde(default)]
    is_ratio: Option<bool>,
    #[serde(default)]
    matcher: MatchStrategy,
    #[serde(default)]
    only_dimension: Option<Dimension>,
}
