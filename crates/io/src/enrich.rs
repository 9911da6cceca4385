//! Metadata lookups for every ISBN in the loaded input.
//!
//! Lookups only produce a [`Supplement`]: one row per found ISBN, tagged with
//! the cache's own rating scale. The engine applies it after all declared
//! sources, to fields that are still unknown.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use biblion_recon::config::SourceConfig;
use biblion_recon::diagnostics::Diagnostics;
use biblion_recon::model::{Field, RawRecord, ReconInput, Supplement};
use biblion_recon::normalize;

/// Fields a lookup may supply.
pub const LOOKUP_FIELDS: [Field; 7] = [
    Field::Authors,
    Field::RatingGoodreads,
    Field::Language,
    Field::NumPages,
    Field::PublicationYear,
    Field::Publisher,
    Field::Category,
];

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(BTreeMap<Field, String>),
    NotFound,
}

/// Metadata provider keyed by ISBN. Failures of any kind surface as `NotFound`.
pub trait MetadataLookup: Sync {
    fn lookup(&self, isbn: &str) -> LookupOutcome;
}

/// Lookup over a previously scraped table.
#[derive(Debug, Clone, Default)]
pub struct CacheLookup {
    entries: HashMap<String, BTreeMap<Field, String>>,
}

impl CacheLookup {
    /// First row per ISBN wins. Rows without ISBN and blank cells are ignored.
    pub fn from_records(records: impl IntoIterator<Item = RawRecord>) -> Self {
        let mut entries: HashMap<String, BTreeMap<Field, String>> = HashMap::new();
        for record in records {
            let Some(isbn) = record.get(Field::Isbn).and_then(normalize::normalize_isbn) else {
                continue;
            };
            let values: BTreeMap<Field, String> = record
                .values
                .into_iter()
                .filter(|(field, value)| LOOKUP_FIELDS.contains(field) && !value.trim().is_empty())
                .collect();
            entries.entry(isbn).or_insert(values);
        }
        Self { entries }
    }

    /// Load the cache file. An unreadable cache is a diagnostic and an empty lookup.
    pub fn load(base_dir: &Path, source: &SourceConfig, diags: &mut Diagnostics) -> Self {
        Self::from_records(crate::source::load_source(base_dir, source, diags))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataLookup for CacheLookup {
    fn lookup(&self, isbn: &str) -> LookupOutcome {
        match self.entries.get(isbn) {
            Some(values) if !values.is_empty() => LookupOutcome::Found(values.clone()),
            _ => LookupOutcome::NotFound,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichReport {
    /// Distinct ISBNs in the input.
    pub looked_up: usize,
    pub found: usize,
}

/// Look up every distinct ISBN of `input` on a pool of `workers` threads.
/// Supplement rows come out in ISBN order; `line` is the row's position.
pub fn collect_supplement<L: MetadataLookup + ?Sized>(
    input: &ReconInput,
    lookup: &L,
    cache: &SourceConfig,
    workers: usize,
) -> (Supplement, EnrichReport) {
    let isbns: Vec<String> = input
        .records
        .values()
        .flatten()
        .filter_map(|r| r.get(Field::Isbn).and_then(normalize::normalize_isbn))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let step = |isbn: &String| match lookup.lookup(isbn) {
        LookupOutcome::Found(values) => Some((isbn.clone(), values)),
        LookupOutcome::NotFound => None,
    };
    let outcomes: Vec<Option<(String, BTreeMap<Field, String>)>> = match rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
    {
        Ok(pool) => pool.install(|| isbns.par_iter().map(step).collect()),
        Err(e) => {
            tracing::warn!(error = %e, "cannot start lookup workers, looking up sequentially");
            isbns.iter().map(step).collect()
        }
    };

    let mut records = Vec::new();
    for (isbn, values) in outcomes.into_iter().flatten() {
        let mut row = RawRecord::new(cache.id.as_str(), records.len() as u64 + 1).with(Field::Isbn, isbn);
        let before = row.values.len();
        for (field, value) in values {
            if LOOKUP_FIELDS.contains(&field) && !value.trim().is_empty() {
                row.values.insert(field, value);
            }
        }
        if row.values.len() > before {
            records.push(row);
        }
    }

    let report = EnrichReport {
        looked_up: isbns.len(),
        found: records.len(),
    };
    tracing::info!(looked_up = report.looked_up, found = report.found, "lookups finished");
    let supplement = Supplement {
        source: cache.id.clone(),
        rating_scale: cache.rating_scale,
        records,
    };
    (supplement, report)
}
