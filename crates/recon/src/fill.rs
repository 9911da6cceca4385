//! Completeness pass over the merged record set.
//!
//! Runs once after every source is merged: drop later duplicates of an ISBN,
//! then let each imputable rating field's strategy fill what is still unknown.
//! All other unknown fields stay empty.

use std::collections::{BTreeMap, HashSet};

use crate::config::ImputationConfig;
use crate::model::{CanonicalRecord, Field};

/// Decides the value given to records missing an imputable field.
pub trait Imputation: std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Fill value given every known value of the field across the output set.
    /// `None` leaves the field unknown.
    fn fill_value(&self, known: &[f64]) -> Option<f64>;
}

/// Dataset-wide mean of the known values, rounded to 2 decimal places.
///
/// Biases the output toward the mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanFill;

impl Imputation for MeanFill {
    fn name(&self) -> &'static str {
        "mean"
    }

    fn fill_value(&self, known: &[f64]) -> Option<f64> {
        if known.is_empty() {
            return None;
        }
        let mean = known.iter().sum::<f64>() / known.len() as f64;
        Some(round2(mean))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LeaveEmpty;

impl Imputation for LeaveEmpty {
    fn name(&self) -> &'static str {
        "none"
    }

    fn fill_value(&self, _known: &[f64]) -> Option<f64> {
        None
    }
}

/// A configured constant.
#[derive(Debug, Clone, Copy)]
pub struct FixedDefault(pub f64);

impl Imputation for FixedDefault {
    fn name(&self) -> &'static str {
        "default"
    }

    fn fill_value(&self, _known: &[f64]) -> Option<f64> {
        Some(self.0)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Keep the first record for each non-empty ISBN, in creation order.
/// Returns how many later duplicates were dropped.
pub fn dedupe_by_isbn(records: &mut Vec<CanonicalRecord>) -> usize {
    let before = records.len();
    let mut seen: HashSet<String> = HashSet::new();
    records.retain(|record| match record.isbn {
        Some(ref isbn) => {
            let keep = seen.insert(isbn.clone());
            if !keep {
                tracing::debug!(%isbn, "dropping later duplicate");
            }
            keep
        }
        None => true,
    });
    before - records.len()
}

/// Fill unknown values of a rating field. Returns how many records were filled.
pub fn impute(records: &mut [CanonicalRecord], field: Field, strategy: &dyn Imputation) -> usize {
    let known: Vec<f64> = records.iter().filter_map(|r| r.rating(field)).collect();
    let Some(value) = strategy.fill_value(&known) else {
        return 0;
    };

    let mut filled = 0;
    for record in records.iter_mut() {
        if let Some(slot) = record.rating_mut(field) {
            if slot.is_none() {
                *slot = Some(value);
                filled += 1;
            }
        }
    }
    tracing::debug!(%field, strategy = strategy.name(), value, filled, "imputed missing ratings");
    filled
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillReport {
    pub duplicates_dropped: usize,
    pub imputed: BTreeMap<String, usize>,
}

/// Dedupe, then impute with the configured strategies.
pub fn complete(records: &mut Vec<CanonicalRecord>, config: &ImputationConfig) -> FillReport {
    let duplicates_dropped = dedupe_by_isbn(records);
    let mut imputed = BTreeMap::new();
    for (field, policy) in config.policies() {
        let strategy = policy.strategy();
        imputed.insert(field.name().to_string(), impute(records, field, strategy.as_ref()));
    }
    FillReport {
        duplicates_dropped,
        imputed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImputationPolicy, NamedPolicy};

    fn book(isbn: Option<&str>, amazon: Option<f64>) -> CanonicalRecord {
        CanonicalRecord {
            isbn: isbn.map(str::to_string),
            title: Some("T".into()),
            rating_amazon: amazon,
            ..Default::default()
        }
    }

    #[test]
    fn mean_fill_rounds_to_two_places() {
        let mut records = vec![
            book(Some("1"), Some(4.0)),
            book(Some("2"), Some(3.0)),
            book(Some("3"), Some(3.0)),
            book(Some("4"), None),
        ];
        let filled = impute(&mut records, Field::RatingAmazon, &MeanFill);
        assert_eq!(filled, 1);
        assert_eq!(records[3].rating_amazon, Some(3.33));
        // Known values are untouched
        assert_eq!(records[0].rating_amazon, Some(4.0));
    }

    #[test]
    fn mean_fill_without_known_values_leaves_unknown() {
        let mut records = vec![book(Some("1"), None)];
        assert_eq!(impute(&mut records, Field::RatingAmazon, &MeanFill), 0);
        assert_eq!(records[0].rating_amazon, None);
    }

    #[test]
    fn leave_empty_and_fixed_default() {
        let mut records = vec![book(Some("1"), Some(5.0)), book(Some("2"), None)];
        assert_eq!(impute(&mut records, Field::RatingAmazon, &LeaveEmpty), 0);
        assert_eq!(records[1].rating_amazon, None);
        assert_eq!(impute(&mut records, Field::RatingAmazon, &FixedDefault(2.5)), 1);
        assert_eq!(records[1].rating_amazon, Some(2.5));
    }

    #[test]
    fn impute_ignores_non_rating_fields() {
        let mut records = vec![book(Some("1"), None)];
        assert_eq!(impute(&mut records, Field::Publisher, &FixedDefault(1.0)), 0);
        assert_eq!(records[0].publisher, None);
    }

    #[test]
    fn dedupe_keeps_first_created() {
        let mut records = vec![
            book(Some("1"), Some(1.0)),
            book(None, None),
            book(Some("1"), Some(5.0)),
            book(None, None),
            book(Some("2"), None),
        ];
        assert_eq!(dedupe_by_isbn(&mut records), 1);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].rating_amazon, Some(1.0));
    }

    #[test]
    fn complete_dedupes_before_imputing() {
        let mut records = vec![
            book(Some("1"), Some(4.0)),
            book(Some("1"), Some(1.0)),
            book(Some("2"), None),
        ];
        let config = ImputationConfig {
            rating_amazon: ImputationPolicy::Named(NamedPolicy::Mean),
            rating_google: ImputationPolicy::Named(NamedPolicy::None),
        };
        let report = complete(&mut records, &config);
        assert_eq!(report.duplicates_dropped, 1);
        assert_eq!(report.imputed["rating_amazon"], 1);
        assert_eq!(report.imputed["rating_google"], 0);
        // Mean over emitted records only: the dropped 1.0 does not count
        assert_eq!(records[1].rating_amazon, Some(4.0));
        assert_eq!(records[1].rating_google, None);
    }
}
