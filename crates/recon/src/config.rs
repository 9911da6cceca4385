use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Deserialize;

use crate::error::ReconError;
use crate::fill::{FixedDefault, Imputation, LeaveEmpty, MeanFill};
use crate::model::Field;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    /// Explicit source order. Defaults to `[[sources]]` declaration order.
    #[serde(default)]
    pub priority: Option<Vec<String>>,
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub imputation: ImputationConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub enrichment: Option<EnrichmentConfig>,
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

/// How to read one dataset and which canonical fields it can supply.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub id: String,
    pub file: String,
    #[serde(default)]
    pub format: Option<SourceFormat>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_quote")]
    pub quote: char,
    #[serde(default)]
    pub escape: Option<char>,
    /// Worksheet name for spreadsheet sources. Defaults to the first sheet.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Native rating scale of this source; ratings are rescaled to 0-5.
    #[serde(default = "default_rating_scale")]
    pub rating_scale: f64,
    /// Canonical field name -> source column name.
    pub columns: BTreeMap<String, String>,
}

fn default_delimiter() -> char {
    ','
}

fn default_quote() -> char {
    '"'
}

fn default_rating_scale() -> f64 {
    5.0
}

impl SourceConfig {
    /// Adapter for the emitter's own artifact: every column under its canonical header.
    pub fn canonical(id: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file: file.into(),
            format: Some(SourceFormat::Csv),
            delimiter: default_delimiter(),
            quote: default_quote(),
            escape: None,
            sheet: None,
            rating_scale: default_rating_scale(),
            columns: Field::ALL
                .into_iter()
                .map(|f| (f.name().to_string(), f.column().to_string()))
                .collect(),
        }
    }

    pub fn format(&self) -> SourceFormat {
        if let Some(format) = self.format {
            return format;
        }
        let lower = self.file.to_ascii_lowercase();
        if [".xlsx", ".xlsm", ".xls", ".xlsb", ".ods"]
            .iter()
            .any(|ext| lower.ends_with(ext))
        {
            SourceFormat::Xlsx
        } else {
            SourceFormat::Csv
        }
    }

    /// Mapped (field, source column) pairs. Unknown field names are skipped here;
    /// `validate` rejects them up front.
    pub fn column_map(&self) -> Vec<(Field, &str)> {
        self.columns
            .iter()
            .filter_map(|(name, column)| Field::parse(name).map(|f| (f, column.as_str())))
            .collect()
    }

    /// The fields this source can supply.
    pub fn capabilities(&self) -> BTreeSet<Field> {
        self.column_map().into_iter().map(|(f, _)| f).collect()
    }

    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }

    fn validate(&self) -> Result<(), ReconError> {
        let id = &self.id;
        if id.trim().is_empty() {
            return Err(ReconError::ConfigValidation("source id must not be empty".into()));
        }
        if self.columns.is_empty() {
            return Err(ReconError::ConfigValidation(format!(
                "source '{id}': at least one column must be mapped"
            )));
        }
        for name in self.columns.keys() {
            if Field::parse(name).is_none() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{id}': unknown canonical field '{name}'"
                )));
            }
        }
        // Two spellings of the year field would map the same column twice
        if self.capabilities().len() != self.columns.len() {
            return Err(ReconError::ConfigValidation(format!(
                "source '{id}': a canonical field is mapped more than once"
            )));
        }
        for (what, c) in [("delimiter", Some(self.delimiter)), ("quote", Some(self.quote)), ("escape", self.escape)] {
            if let Some(c) = c {
                if !c.is_ascii() {
                    return Err(ReconError::ConfigValidation(format!(
                        "source '{id}': {what} must be a single ASCII character, got '{c}'"
                    )));
                }
            }
        }
        if !(self.rating_scale.is_finite() && self.rating_scale > 0.0) {
            return Err(ReconError::ConfigValidation(format!(
                "source '{id}': rating_scale must be positive, got {}",
                self.rating_scale
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Total order over source ids. Lower rank wins precedence conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePriority {
    order: Vec<String>,
}

impl SourcePriority {
    pub fn new(order: Vec<String>) -> Self {
        Self { order }
    }

    pub fn rank(&self, source: &str) -> Option<usize> {
        self.order.iter().position(|s| s == source)
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }
}

// ---------------------------------------------------------------------------
// Imputation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ImputationPolicy {
    Named(NamedPolicy),
    Default { default: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedPolicy {
    Mean,
    None,
}

impl ImputationPolicy {
    pub fn strategy(&self) -> Box<dyn Imputation> {
        match *self {
            Self::Named(NamedPolicy::Mean) => Box::new(MeanFill),
            Self::Named(NamedPolicy::None) => Box::new(LeaveEmpty),
            Self::Default { default } => Box::new(FixedDefault(default)),
        }
    }
}

fn default_policy() -> ImputationPolicy {
    ImputationPolicy::Named(NamedPolicy::Mean)
}

/// Only the Amazon and Google ratings are imputable.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImputationConfig {
    #[serde(default = "default_policy")]
    pub rating_amazon: ImputationPolicy,
    #[serde(default = "default_policy")]
    pub rating_google: ImputationPolicy,
}

impl Default for ImputationConfig {
    fn default() -> Self {
        Self {
            rating_amazon: default_policy(),
            rating_google: default_policy(),
        }
    }
}

impl ImputationConfig {
    pub fn policies(&self) -> [(Field, ImputationPolicy); 2] {
        [
            (Field::RatingAmazon, self.rating_amazon),
            (Field::RatingGoogle, self.rating_google),
        ]
    }
}

// ---------------------------------------------------------------------------
// Output + Enrichment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_csv")]
    pub csv: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub cypher: Option<String>,
    #[serde(default)]
    pub report: Option<String>,
}

fn default_output_csv() -> String {
    "merged_books_final.csv".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv: default_output_csv(),
            delimiter: default_delimiter(),
            cypher: None,
            report: None,
        }
    }
}

/// Fills empty fields from a scraper cache before reconciliation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrichmentConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    pub cache: SourceConfig,
}

fn default_workers() -> usize {
    4
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.sources.is_empty() {
            return Err(ReconError::ConfigValidation("at least one source is required".into()));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !seen.insert(source.id.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate source id '{}'",
                    source.id
                )));
            }
        }

        if let Some(ref priority) = self.priority {
            let mut listed = HashSet::new();
            for id in priority {
                if !seen.contains(id.as_str()) {
                    return Err(ReconError::UnknownSource(format!("priority lists '{id}'")));
                }
                if !listed.insert(id.as_str()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "priority lists '{id}' more than once"
                    )));
                }
            }
            if let Some(missing) = self.sources.iter().find(|s| !listed.contains(s.id.as_str())) {
                return Err(ReconError::ConfigValidation(format!(
                    "priority must list every source; '{}' is missing",
                    missing.id
                )));
            }
        }

        for (field, policy) in self.imputation.policies() {
            if let ImputationPolicy::Default { default } = policy {
                if !(0.0..=5.0).contains(&default) {
                    return Err(ReconError::ConfigValidation(format!(
                        "imputation default for {field} must be within 0-5, got {default}"
                    )));
                }
            }
        }

        if !self.output.delimiter.is_ascii() {
            return Err(ReconError::ConfigValidation(
                "output delimiter must be a single ASCII character".into(),
            ));
        }

        if let Some(ref enrichment) = self.enrichment {
            enrichment.cache.validate()?;
            if !enrichment.cache.capabilities().contains(&Field::Isbn) {
                return Err(ReconError::ConfigValidation(
                    "enrichment cache must map the isbn column".into(),
                ));
            }
            if enrichment.workers == 0 {
                return Err(ReconError::ConfigValidation(
                    "enrichment workers must be at least 1".into(),
                ));
            }
        }

        Ok(())
    }

    pub fn source_priority(&self) -> SourcePriority {
        let order = match self.priority {
            Some(ref ids) => ids.clone(),
            None => self.sources.iter().map(|s| s.id.clone()).collect(),
        };
        SourcePriority::new(order)
    }

    /// Sources in priority order.
    pub fn ordered_sources(&self) -> Vec<&SourceConfig> {
        let priority = self.source_priority();
        let mut sources: Vec<&SourceConfig> = self.sources.iter().collect();
        sources.sort_by_key(|s| priority.rank(&s.id).unwrap_or(usize::MAX));
        sources
    }

    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
