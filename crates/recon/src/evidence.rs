use std::collections::BTreeMap;

use crate::diagnostics::Diagnostics;
use crate::fill::FillReport;
use crate::model::{CanonicalRecord, Field, ReconSummary};

/// Counters gathered by the engine while sources are resolved and merged.
#[derive(Debug, Clone, Default)]
pub struct StageCounts {
    pub records_per_source: BTreeMap<String, usize>,
    pub identities: usize,
    pub merged_identities: usize,
    pub supplemented_identities: usize,
    pub supplemented_fields: usize,
    pub fill: FillReport,
}

/// Compute summary statistics for a finished run.
pub fn compute_summary(stages: StageCounts, output: &[CanonicalRecord], diagnostics: &Diagnostics) -> ReconSummary {
    let mut coverage: BTreeMap<String, usize> = BTreeMap::new();
    for field in Field::ALL {
        let known = output.iter().filter(|r| r.is_known(field)).count();
        coverage.insert(field.column().to_string(), known);
    }

    ReconSummary {
        raw_records: stages.records_per_source.values().sum(),
        records_per_source: stages.records_per_source,
        identities: stages.identities,
        merged_identities: stages.merged_identities,
        supplemented_identities: stages.supplemented_identities,
        supplemented_fields: stages.supplemented_fields,
        duplicates_dropped: stages.fill.duplicates_dropped,
        output_records: output.len(),
        imputed: stages.fill.imputed,
        coverage,
        diagnostics: diagnostics.counts(),
    }
}
