//! Field-level merge of one source row into an open canonical record.
//!
//! Precedence fields keep the value from the best-ranked source that supplied
//! one (first seen wins within a rank). Rating fields average every
//! contribution.

use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::model::{CanonicalRecord, Field, MergePolicy, RawRecord};
use crate::normalize;

// ---------------------------------------------------------------------------
// Contribution
// ---------------------------------------------------------------------------

/// One raw row after field normalization: the values it can contribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contribution {
    pub source: String,
    pub line: u64,
    pub values: CanonicalRecord,
}

impl Contribution {
    /// Normalize every field the row carries. Numeric cells that do not
    /// convert are recorded and treated as unknown.
    pub fn from_raw(raw: &RawRecord, rating_scale: f64, diags: &mut Diagnostics) -> Self {
        let mut values = CanonicalRecord::default();
        let isbn_cell = raw.get(Field::Isbn);

        for (&field, cell) in &raw.values {
            if cell.trim().is_empty() {
                continue;
            }
            let converted = match field {
                Field::Isbn => {
                    values.isbn = normalize::normalize_isbn(cell);
                    true
                }
                Field::Title => {
                    values.title = normalize::normalize_title(cell);
                    true
                }
                Field::Authors => {
                    values.authors = normalize::split_authors(cell);
                    true
                }
                Field::Language => {
                    values.language = normalize::normalize_language(cell);
                    true
                }
                Field::Publisher => {
                    values.publisher = normalize::normalize_text(cell);
                    true
                }
                Field::Category => {
                    values.category = normalize::normalize_category(cell);
                    true
                }
                Field::NumPages => {
                    values.num_pages = normalize::normalize_pages(cell);
                    values.num_pages.is_some()
                }
                Field::PublicationYear => {
                    values.publication_year = normalize::normalize_year(cell);
                    values.publication_year.is_some()
                }
                Field::RatingGoodreads | Field::RatingAmazon | Field::RatingGoogle => {
                    let rating = normalize::normalize_rating(cell, rating_scale);
                    if let Some(slot) = values.rating_mut(field) {
                        *slot = rating;
                    }
                    rating.is_some()
                }
            };

            if !converted {
                diags.record(
                    Diagnostic::new(
                        DiagnosticKind::FieldConversion,
                        &raw.source,
                        format!("{field}: cannot convert '{}'", cell.trim()),
                    )
                    .at_line(raw.line)
                    .with_key(isbn_cell),
                );
            }
        }

        Self {
            source: raw.source.clone(),
            line: raw.line,
            values,
        }
    }
}

// ---------------------------------------------------------------------------
// Open record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct RatingAccumulator {
    sum: f64,
    count: usize,
}

impl RatingAccumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// A canonical record still accepting contributions.
#[derive(Debug, Clone)]
pub struct OpenRecord {
    record: CanonicalRecord,
    /// Rank of the source that set each known precedence field.
    ranks: BTreeMap<Field, usize>,
    ratings: BTreeMap<Field, RatingAccumulator>,
    contributors: BTreeSet<String>,
    contributions: usize,
}

impl OpenRecord {
    /// Seed a new record from the first contribution for its identity.
    pub fn seed(contribution: &Contribution, rank: usize) -> Self {
        let mut open = Self {
            record: CanonicalRecord::default(),
            ranks: BTreeMap::new(),
            ratings: BTreeMap::new(),
            contributors: BTreeSet::new(),
            contributions: 0,
        };
        open.merge(contribution, rank);
        open
    }

    /// Merge in place. Never creates a second record.
    pub fn merge(&mut self, contribution: &Contribution, rank: usize) {
        let incoming = &contribution.values;
        for field in Field::ALL {
            if !incoming.is_known(field) {
                continue;
            }
            match field.policy() {
                MergePolicy::Precedence => self.merge_precedence(field, incoming, rank),
                MergePolicy::Aggregate => {
                    if let Some(value) = incoming.rating(field) {
                        let acc = self.ratings.entry(field).or_default();
                        acc.add(value);
                        if let Some(slot) = self.record.rating_mut(field) {
                            *slot = acc.mean();
                        }
                    }
                }
            }
        }
        self.contributors.insert(contribution.source.clone());
        self.contributions += 1;
    }

    /// Fill only the fields this record still lacks, each at most once.
    /// Returns how many were filled. Does not count as a contribution.
    pub fn fill_unknown(&mut self, contribution: &Contribution) -> usize {
        let incoming = &contribution.values;
        let mut filled = 0;
        for field in Field::ALL {
            if field == Field::Isbn || !incoming.is_known(field) || self.record.is_known(field) {
                continue;
            }
            match field.policy() {
                MergePolicy::Precedence => self.merge_precedence(field, incoming, usize::MAX),
                MergePolicy::Aggregate => {
                    if let Some(value) = incoming.rating(field) {
                        self.ratings.entry(field).or_default().add(value);
                        if let Some(slot) = self.record.rating_mut(field) {
                            *slot = Some(value);
                        }
                    }
                }
            }
            filled += 1;
        }
        if filled > 0 {
            self.contributors.insert(contribution.source.clone());
        }
        filled
    }

    fn merge_precedence(&mut self, field: Field, incoming: &CanonicalRecord, rank: usize) {
        if let Some(&held) = self.ranks.get(&field) {
            if rank >= held {
                if !same_value(field, &self.record, incoming) {
                    tracing::debug!(%field, held_rank = held, offered_rank = rank, "conflicting value ignored");
                }
                return;
            }
        }

        let target = &mut self.record;
        match field {
            Field::Isbn => target.isbn = incoming.isbn.clone(),
            Field::Title => target.title = incoming.title.clone(),
            Field::Authors => target.authors = incoming.authors.clone(),
            Field::Language => target.language = incoming.language.clone(),
            Field::NumPages => target.num_pages = incoming.num_pages,
            Field::PublicationYear => target.publication_year = incoming.publication_year,
            Field::Publisher => target.publisher = incoming.publisher.clone(),
            Field::Category => target.category = incoming.category.clone(),
            Field::RatingGoodreads | Field::RatingAmazon | Field::RatingGoogle => return,
        }
        self.ranks.insert(field, rank);
    }

    pub fn record(&self) -> &CanonicalRecord {
        &self.record
    }

    pub fn contributions(&self) -> usize {
        self.contributions
    }

    pub fn contributors(&self) -> &BTreeSet<String> {
        &self.contributors
    }

    pub fn into_record(self) -> CanonicalRecord {
        self.record
    }
}

fn same_value(field: Field, a: &CanonicalRecord, b: &CanonicalRecord) -> bool {
    match field {
        Field::Isbn => a.isbn == b.isbn,
        Field::Title => a.title == b.title,
        Field::Authors => a.authors == b.authors,
        Field::Language => a.language == b.language,
        Field::NumPages => a.num_pages == b.num_pages,
        Field::PublicationYear => a.publication_year == b.publication_year,
        Field::Publisher => a.publisher == b.publisher,
        Field::Category => a.category == b.category,
        Field::RatingGoodreads | Field::RatingAmazon | Field::RatingGoogle => a.rating(field) == b.rating(field),
    }
}
