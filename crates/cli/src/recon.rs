//! `biblion run` / `biblion validate`: config-driven book reconciliation.

use std::path::{Path, PathBuf};

use serde::Serialize;

use biblion_io::enrich::{collect_supplement, CacheLookup, EnrichReport};
use biblion_io::source::{load_all, resolve};
use biblion_recon::config::ReconConfig;
use biblion_recon::diagnostics::Diagnostics;
use biblion_recon::graph::GraphExportStats;
use biblion_recon::model::{ReconMeta, ReconSummary};

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_RUNTIME};
use crate::CliError;

#[derive(Serialize)]
struct ArtifactReport {
    path: String,
    rows: usize,
    fingerprint: String,
}

/// JSON run report. Records themselves live in the artifact.
#[derive(Serialize)]
struct RunReport<'a> {
    meta: &'a ReconMeta,
    summary: &'a ReconSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    enrichment: Option<EnrichReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    graph: Option<GraphExportStats>,
    artifact: ArtifactReport,
    diagnostics: &'a Diagnostics,
}

fn runtime_err(msg: impl Into<String>) -> CliError {
    CliError::new(EXIT_RUNTIME, msg)
}

fn load_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        CliError::usage(format!("cannot read config {}: {e}", config_path.display()))
            .with_hint("pass the path to a .recon.toml file")
    })?;
    ReconConfig::from_toml(&config_str).map_err(|e| CliError::new(EXIT_INVALID_CONFIG, e.to_string()))
}

/// Compute blake3 hash of bytes (with algorithm prefix).
fn fingerprint(data: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(data).to_hex())
}

pub fn cmd_run(
    config_path: PathBuf,
    out: Option<PathBuf>,
    cypher: Option<PathBuf>,
    report: Option<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    // Resolve file paths relative to config file's directory
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut input = load_all(base_dir, &config);

    let enrichment = match config.enrichment {
        Some(ref enrichment) => {
            let cache = CacheLookup::load(base_dir, &enrichment.cache, &mut input.diagnostics);
            tracing::info!(entries = cache.len(), workers = enrichment.workers, "looking up metadata in cache");
            let (supplement, report) = collect_supplement(&input, &cache, &enrichment.cache, enrichment.workers);
            input.supplement = Some(supplement);
            Some(report)
        }
        None => None,
    };

    let result = biblion_recon::run(&config, &input).map_err(|e| CliError::general(e.to_string()))?;

    // Artifact is always written, even when empty
    let artifact_path = out.unwrap_or_else(|| resolve(base_dir, &config.output.csv));
    biblion_io::artifact::write_artifact(&artifact_path, &result.records, config.output.delimiter as u8)
        .map_err(|e| runtime_err(e.to_string()))?;
    let artifact_bytes = std::fs::read(&artifact_path)
        .map_err(|e| runtime_err(format!("cannot read back {}: {e}", artifact_path.display())))?;

    let cypher_path = cypher.or_else(|| config.output.cypher.as_deref().map(|p| resolve(base_dir, p)));
    let graph = match cypher_path {
        Some(ref path) => Some(
            biblion_io::cypher::write_script(path, &result.records).map_err(|e| runtime_err(e.to_string()))?,
        ),
        None => None,
    };

    let run_report = RunReport {
        meta: &result.meta,
        summary: &result.summary,
        enrichment,
        graph,
        artifact: ArtifactReport {
            path: artifact_path.display().to_string(),
            rows: result.records.len(),
            fingerprint: fingerprint(&artifact_bytes),
        },
        diagnostics: &result.diagnostics,
    };

    let report_path = report.or_else(|| config.output.report.as_deref().map(|p| resolve(base_dir, p)));
    if report_path.is_some() || json_output {
        let json_str = serde_json::to_string_pretty(&run_report)
            .map_err(|e| runtime_err(format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = report_path {
            std::fs::write(path, &json_str)
                .map_err(|e| runtime_err(format!("cannot write report {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }

        if json_output {
            println!("{json_str}");
        }
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "reconciled {} rows from {} sources into {} records ({} merged, {} warnings) -> {}",
        s.raw_records,
        s.records_per_source.len(),
        s.output_records,
        s.merged_identities,
        result.diagnostics.len(),
        artifact_path.display(),
    );

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let priority = config.source_priority();
    eprintln!(
        "valid: '{}' with {} source(s), priority: {}",
        config.name,
        config.sources.len(),
        priority.ids().join(" > "),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_prefixed() {
        let fp = fingerprint(b"isbn,title\n");
        assert!(fp.starts_with("blake3:"));
        assert_eq!(fp.len(), "blake3:".len() + 64);
        assert_eq!(fp, fingerprint(b"isbn,title\n"));
    }
}
