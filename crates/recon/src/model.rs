use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;

// ---------------------------------------------------------------------------
// Canonical schema
// ---------------------------------------------------------------------------

/// One column of the canonical schema. Declaration order is output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Isbn,
    Title,
    Authors,
    RatingGoodreads,
    Language,
    NumPages,
    PublicationYear,
    Publisher,
    RatingAmazon,
    RatingGoogle,
    Category,
}

/// How the merger resolves two known values for the same field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// First known value by source priority wins.
    Precedence,
    /// Mean of every contribution.
    Aggregate,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Isbn,
        Field::Title,
        Field::Authors,
        Field::RatingGoodreads,
        Field::Language,
        Field::NumPages,
        Field::PublicationYear,
        Field::Publisher,
        Field::RatingAmazon,
        Field::RatingGoogle,
        Field::Category,
    ];

    pub const RATINGS: [Field; 3] = [Field::RatingGoodreads, Field::RatingAmazon, Field::RatingGoogle];

    /// Canonical field name, as used in config `columns` tables.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Isbn => "isbn",
            Self::Title => "title",
            Self::Authors => "authors",
            Self::RatingGoodreads => "rating_goodreads",
            Self::Language => "language",
            Self::NumPages => "num_pages",
            Self::PublicationYear => "publication_year",
            Self::Publisher => "publisher",
            Self::RatingAmazon => "rating_amazon",
            Self::RatingGoogle => "rating_google",
            Self::Category => "category",
        }
    }

    /// Header used in the emitted artifact. Only the year differs from [`Field::name`].
    pub fn column(&self) -> &'static str {
        match self {
            Self::PublicationYear => "publication_date",
            other => other.name(),
        }
    }

    /// Accepts either the canonical name or the artifact column name.
    pub fn parse(name: &str) -> Option<Field> {
        let name = name.trim();
        Field::ALL
            .into_iter()
            .find(|f| f.name() == name || f.column() == name)
    }

    pub fn policy(&self) -> MergePolicy {
        match self {
            Self::RatingGoodreads | Self::RatingAmazon | Self::RatingGoogle => MergePolicy::Aggregate,
            Self::Isbn
            | Self::Title
            | Self::Authors
            | Self::Language
            | Self::NumPages
            | Self::PublicationYear
            | Self::Publisher
            | Self::Category => MergePolicy::Precedence,
        }
    }

    pub fn is_rating(&self) -> bool {
        self.policy() == MergePolicy::Aggregate
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One row of one source after column renaming. Cell text is untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub source: String,
    /// 1-based line (CSV) or row (XLSX) number in the source file.
    pub line: u64,
    pub values: BTreeMap<Field, String>,
}

impl RawRecord {
    pub fn new(source: impl Into<String>, line: u64) -> Self {
        Self {
            source: source.into(),
            line,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// True when the field is absent or blank.
    pub fn is_missing(&self, field: Field) -> bool {
        self.get(field).map_or(true, |v| v.trim().is_empty())
    }
}

/// Pre-loaded records grouped by source id, plus whatever the loaders reported.
#[derive(Debug, Default)]
pub struct ReconInput {
    pub records: HashMap<String, Vec<RawRecord>>,
    pub diagnostics: Diagnostics,
    /// Looked-up metadata, applied after every declared source.
    pub supplement: Option<Supplement>,
}

/// Rows from a metadata lookup, at most one per ISBN. They only fill fields
/// still unknown once every declared source has been merged, and never
/// create an identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Supplement {
    pub source: String,
    /// Scale of the lookup's ratings; rescaled to 0-5 like any source.
    pub rating_scale: f64,
    pub records: Vec<RawRecord>,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    Isbn(String),
    /// Fallback: normalized, lowercased title.
    Title(String),
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Isbn(isbn) => write!(f, "isbn:{isbn}"),
            Self::Title(title) => write!(f, "title:{title}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// The reconciled book. `None` (or an empty author list) means unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub language: Option<String>,
    pub num_pages: Option<u32>,
    pub publication_year: Option<i32>,
    pub publisher: Option<String>,
    pub rating_goodreads: Option<f64>,
    pub rating_amazon: Option<f64>,
    pub rating_google: Option<f64>,
    pub category: Option<String>,
}

impl CanonicalRecord {
    pub fn is_known(&self, field: Field) -> bool {
        match field {
            Field::Isbn => self.isbn.is_some(),
            Field::Title => self.title.is_some(),
            Field::Authors => !self.authors.is_empty(),
            Field::Language => self.language.is_some(),
            Field::NumPages => self.num_pages.is_some(),
            Field::PublicationYear => self.publication_year.is_some(),
            Field::Publisher => self.publisher.is_some(),
            Field::Category => self.category.is_some(),
            Field::RatingGoodreads | Field::RatingAmazon | Field::RatingGoogle => {
                self.rating(field).is_some()
            }
        }
    }

    /// Rating slot for a rating field; `None` for any other field.
    pub fn rating(&self, field: Field) -> Option<f64> {
        match field {
            Field::RatingGoodreads => self.rating_goodreads,
            Field::RatingAmazon => self.rating_amazon,
            Field::RatingGoogle => self.rating_google,
            _ => None,
        }
    }

    pub fn rating_mut(&mut self, field: Field) -> Option<&mut Option<f64>> {
        match field {
            Field::RatingGoodreads => Some(&mut self.rating_goodreads),
            Field::RatingAmazon => Some(&mut self.rating_amazon),
            Field::RatingGoogle => Some(&mut self.rating_google),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconSummary {
    pub raw_records: usize,
    pub records_per_source: BTreeMap<String, usize>,
    pub identities: usize,
    /// Identities that more than one raw record contributed to.
    pub merged_identities: usize,
    /// Identities that gained fields from the supplement.
    pub supplemented_identities: usize,
    pub supplemented_fields: usize,
    pub duplicates_dropped: usize,
    pub output_records: usize,
    pub imputed: BTreeMap<String, usize>,
    /// Output records with a known value, per output column.
    pub coverage: BTreeMap<String, usize>,
    pub diagnostics: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub priority: Vec<String>,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub records: Vec<CanonicalRecord>,
    pub diagnostics: Diagnostics,
}
