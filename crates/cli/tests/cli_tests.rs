// End-to-end tests for the biblion binary: exit codes, artifact, --json contract.
//
// Run with: cargo test -p biblion-cli --test cli_tests -- --nocapture

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const GOODREADS: &str = "\
isbn,title,authors,average_rating
0441013597,Dune,Frank Herbert,4.5
0618260307,The Hobbit,J.R.R. Tolkien,4.27
";

const AMAZON: &str = "\
Id,Title,review/score
0441013597,Dune,5.0
0441013597,Dune,4.0
";

const CONFIG: &str = r#"
name = "CLI"

[[sources]]
id = "goodreads"
file = "goodreads.csv"
[sources.columns]
isbn = "isbn"
title = "title"
authors = "authors"
rating_goodreads = "average_rating"

[[sources]]
id = "amazon"
file = "amazon.csv"
[sources.columns]
isbn = "Id"
title = "Title"
rating_amazon = "review/score"

[output]
csv = "out/merged.csv"
"#;

fn biblion() -> Command {
    Command::new(env!("CARGO_BIN_EXE_biblion"))
}

/// Temp dir holding both sources and a config with `extra` appended.
fn workspace(extra: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("goodreads.csv"), GOODREADS).unwrap();
    std::fs::write(dir.path().join("amazon.csv"), AMAZON).unwrap();
    std::fs::write(dir.path().join("books.recon.toml"), format!("{CONFIG}{extra}")).unwrap();
    dir
}

fn run(dir: &Path, extra_args: &[&str]) -> Output {
    let config = dir.join("books.recon.toml");
    biblion()
        .arg("run")
        .arg(&config)
        .args(extra_args)
        .output()
        .expect("spawn biblion run")
}

fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Stdout must be exactly one JSON object.
fn single_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let val: serde_json::Value = serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be valid JSON: {e}\nstdout:\n{stdout}"));
    assert!(val.is_object(), "report should be a JSON object");
    val
}

// ===========================================================================
// biblion run
// ===========================================================================

#[test]
fn run_writes_artifact_next_to_config() {
    let dir = workspace("");
    let output = run(dir.path(), &[]);
    assert_exit(&output, 0);

    let artifact = std::fs::read_to_string(dir.path().join("out/merged.csv")).unwrap();
    let lines: Vec<&str> = artifact.lines().collect();
    assert_eq!(
        lines[0],
        "isbn,title,authors,rating_goodreads,language,num_pages,publication_date,publisher,rating_amazon,rating_google,category"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("0441013597,Dune,Frank Herbert,4.5,"), "got {}", lines[1]);
    assert!(lines[2].starts_with("0618260307,The Hobbit,J.R.R. Tolkien,4.27,"), "got {}", lines[2]);

    // Nothing on stdout without --json
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("into 2 records"), "stderr: {stderr}");
}

#[test]
fn out_flag_overrides_configured_path() {
    let dir = workspace("");
    let target = dir.path().join("elsewhere.csv");
    let output = run(dir.path(), &["--out", target.to_str().unwrap()]);
    assert_exit(&output, 0);
    assert!(target.exists());
    assert!(!dir.path().join("out/merged.csv").exists());
}

#[test]
fn json_report_has_stable_shape() {
    let dir = workspace("");
    let output = run(dir.path(), &["--json"]);
    assert_exit(&output, 0);

    let val = single_json(&output);
    for key in ["meta", "summary", "artifact", "diagnostics"] {
        assert!(val.get(key).is_some(), "missing key '{key}'");
    }
    assert!(val.get("graph").is_none());
    assert!(val.get("enrichment").is_none());

    assert_eq!(val["meta"]["config_name"], "CLI");
    assert_eq!(val["meta"]["priority"], serde_json::json!(["goodreads", "amazon"]));
    assert_eq!(val["summary"]["raw_records"], 4);
    assert_eq!(val["summary"]["output_records"], 2);
    assert_eq!(val["summary"]["merged_identities"], 1);
    assert_eq!(val["artifact"]["rows"], 2);
    assert!(val["artifact"]["fingerprint"].as_str().unwrap().starts_with("blake3:"));
    assert_eq!(val["diagnostics"], serde_json::json!([]));
}

#[test]
fn reruns_have_the_same_fingerprint() {
    let dir = workspace("");
    let first = single_json(&run(dir.path(), &["--json"]));
    let second = single_json(&run(dir.path(), &["--json"]));
    assert_eq!(first["artifact"]["fingerprint"], second["artifact"]["fingerprint"]);
}

#[test]
fn report_and_cypher_files_are_written() {
    let dir = workspace("");
    let report = dir.path().join("report.json");
    let cypher = dir.path().join("import.cypher");
    let output = run(
        dir.path(),
        &["--report", report.to_str().unwrap(), "--cypher", cypher.to_str().unwrap()],
    );
    assert_exit(&output, 0);

    let val: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(val["graph"]["books"], 2);
    assert_eq!(val["graph"]["skipped_without_isbn"], 0);

    let script = std::fs::read_to_string(&cypher).unwrap();
    assert!(script.contains("MERGE (b:Book {isbn: '0441013597'})"));
    assert!(script.contains("MERGE (b)-[:AUTHORED_BY]->(n)"));
}

#[test]
fn enrichment_fills_only_unknown_fields() {
    let extra = r#"
[[sources]]
id = "ratings"
file = "ratings.csv"
rating_scale = 10.0
[sources.columns]
isbn = "ISBN"
rating_goodreads = "Book-Rating"

[enrichment]
workers = 2
[enrichment.cache]
id = "scraper"
file = "cache.csv"
[enrichment.cache.columns]
isbn = "isbn"
language = "language_code"
rating_goodreads = "average_rating"
"#;
    let dir = workspace(extra);
    // Several rows per ISBN, most of them without a rating
    std::fs::write(
        dir.path().join("ratings.csv"),
        "ISBN,Book-Rating\n0195153448,8\n0195153448,\n0195153448,\n0000000001,\n0000000001,\n0000000001,\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("cache.csv"),
        "isbn,language_code,average_rating\n0441013597,,1.0\n0618260307,eng,\n0195153448,,5.0\n0000000001,,4.5\n",
    )
    .unwrap();

    let output = run(dir.path(), &["--json"]);
    assert_exit(&output, 0);
    let val = single_json(&output);
    assert_eq!(val["enrichment"]["looked_up"], 4);
    assert_eq!(val["enrichment"]["found"], 4);
    assert_eq!(val["summary"]["supplemented_identities"], 2);
    assert_eq!(val["summary"]["supplemented_fields"], 2);
    assert_eq!(val["summary"]["output_records"], 4);

    let artifact = std::fs::read_to_string(dir.path().join("out/merged.csv")).unwrap();
    let row = |isbn: &str| -> Vec<String> {
        let line = artifact.lines().find(|l| l.starts_with(isbn)).unwrap();
        line.split(',').map(str::to_string).collect()
    };
    // Language was missing everywhere
    assert_eq!(row("0618260307")[4], "English");
    // Goodreads source already rated it: the cache value is not mixed in
    assert_eq!(row("0441013597")[3], "4.5");
    // 8 on a 10-point scale; blank rows stay blank
    assert_eq!(row("0195153448")[3], "4.0");
    // Cache rating on its own 5-point scale, counted once
    assert_eq!(row("0000000001")[3], "4.5");
}

#[test]
fn missing_source_is_a_warning_not_a_failure() {
    let dir = workspace("");
    std::fs::remove_file(dir.path().join("amazon.csv")).unwrap();

    let output = run(dir.path(), &["--json"]);
    assert_exit(&output, 0);
    let val = single_json(&output);
    let diags = val["diagnostics"].as_array().unwrap();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0]["kind"], "source_load");
    assert_eq!(diags[0]["source"], "amazon");
    assert_eq!(val["summary"]["output_records"], 2);
}

// ===========================================================================
// Exit codes
// ===========================================================================

#[test]
fn missing_config_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = biblion()
        .args(["run", dir.path().join("nope.toml").to_str().unwrap()])
        .output()
        .unwrap();
    assert_exit(&output, 2);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"));
    assert!(stderr.contains("hint:"));
}

#[test]
fn invalid_config_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.recon.toml");
    std::fs::write(&config, "name = \"empty\"\nsources = []\n").unwrap();

    for cmd in ["run", "validate"] {
        let output = biblion().args([cmd, config.to_str().unwrap()]).output().unwrap();
        assert_exit(&output, 3);
    }
}

#[test]
fn unparseable_config_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.recon.toml");
    std::fs::write(&config, "name = [unterminated\n").unwrap();
    let output = biblion().args(["validate", config.to_str().unwrap()]).output().unwrap();
    assert_exit(&output, 3);
}

#[test]
fn no_command_is_usage_error() {
    let output = biblion().output().unwrap();
    assert_exit(&output, 2);
}

#[test]
fn validate_reports_priority() {
    let dir = workspace("");
    let output = biblion()
        .args(["validate", dir.path().join("books.recon.toml").to_str().unwrap()])
        .output()
        .unwrap();
    assert_exit(&output, 0);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("valid: 'CLI' with 2 source(s)"), "stderr: {stderr}");
    assert!(stderr.contains("goodreads > amazon"));
    // validate never touches the output
    assert!(!dir.path().join("out").exists());
}
