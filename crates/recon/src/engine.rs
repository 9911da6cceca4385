use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::evidence::{compute_summary, StageCounts};
use crate::fill;
use crate::identity::Resolver;
use crate::merge::Contribution;
use crate::model::{ReconInput, ReconMeta, ReconResult};

/// Run reconciliation per config. Returns the canonical table + summary.
///
/// Sources are consumed in priority order; within a source, in row order.
/// The only failure is input for a source the config does not declare.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    let mut undeclared: Vec<&String> = input
        .records
        .keys()
        .filter(|id| config.source(id).is_none())
        .collect();
    undeclared.sort();
    if let Some(id) = undeclared.first() {
        return Err(ReconError::UnknownSource(format!("input has records for undeclared source '{id}'")));
    }

    let priority = config.source_priority();
    let mut diagnostics = input.diagnostics.clone();
    let mut resolver = Resolver::new();
    let mut stages = StageCounts::default();

    for source in config.ordered_sources() {
        let rank = priority.rank(&source.id).unwrap_or(usize::MAX);
        let rows = input.records.get(&source.id).map(Vec::as_slice).unwrap_or(&[]);
        stages.records_per_source.insert(source.id.clone(), rows.len());

        for raw in rows {
            let contribution = Contribution::from_raw(raw, source.rating_scale, &mut diagnostics);
            resolver.observe(&contribution, rank, &mut diagnostics);
        }
        tracing::debug!(
            source = %source.id,
            rank,
            rows = rows.len(),
            identities = resolver.identities(),
            "source merged"
        );
    }

    stages.identities = resolver.identities();
    stages.merged_identities = resolver.merged();

    if let Some(ref supplement) = input.supplement {
        for raw in &supplement.records {
            let contribution = Contribution::from_raw(raw, supplement.rating_scale, &mut diagnostics);
            let filled = resolver.supplement(&contribution);
            if filled > 0 {
                stages.supplemented_identities += 1;
                stages.supplemented_fields += filled;
            }
        }
        tracing::debug!(
            source = %supplement.source,
            rows = supplement.records.len(),
            identities = stages.supplemented_identities,
            fields = stages.supplemented_fields,
            "supplement applied"
        );
    }

    let mut records = resolver.finish();
    stages.fill = fill::complete(&mut records, &config.imputation);

    let summary = compute_summary(stages, &records, &diagnostics);
    tracing::info!(
        raw = summary.raw_records,
        identities = summary.identities,
        merged = summary.merged_identities,
        output = summary.output_records,
        warnings = diagnostics.len(),
        "reconciliation finished"
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            priority: priority.ids().to_vec(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        records,
        diagnostics,
    })
}
