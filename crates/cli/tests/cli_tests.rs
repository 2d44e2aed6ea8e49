// End-to-end tests for the `lmatch` binary: exit codes and the --json contract.
//
// Run with: cargo test -p ledgermatch-cli --test cli_tests

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const INTERNAL: &str = "transaction_id,amount,status\n\
TXN001,100.00,Completed\n\
TXN002,200.00,Pending\n\
TXN003,300.00,Failed\n";

const PROVIDER: &str = "ref_id,total,state\n\
TXN001,100.00,Completed\n\
TXN002,250.00,Completed\n\
TXN004,400.00,Pending\n";

fn lmatch(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lmatch"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("LMATCH_CONFIG")
        .output()
        .expect("run lmatch")
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn ledgers(dir: &Path) -> (String, String) {
    let internal = write(dir, "internal.csv", INTERNAL);
    let provider = write(dir, "provider.csv", PROVIDER);
    (
        internal.to_str().unwrap().to_string(),
        provider.to_str().unwrap().to_string(),
    )
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ===========================================================================
// lmatch run
// ===========================================================================

#[test]
fn run_json_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let (internal, provider) = ledgers(dir.path());

    let output = lmatch(&["run", &internal, &provider, "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let val: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();

    assert!(val["session_id"].as_str().unwrap().starts_with("sha256:"));
    assert_eq!(val["column_mappings"]["internal"]["transaction_reference"], "transaction_id");
    assert_eq!(val["column_mappings"]["provider"]["amount"], "total");
    assert_eq!(val["column_mappings"]["provider"]["status"], "state");
    assert_eq!(val["summary"]["matched"], 2);
    assert_eq!(val["summary"]["internal_only"], 1);
    assert_eq!(val["summary"]["provider_only"], 1);
    assert_eq!(val["internal_only"][0]["transaction_reference"], "TXN003");
    assert_eq!(val["provider_only"][0]["transaction_reference"], "TXN004");

    let keys: Vec<&str> = val.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        ["session_id", "column_mappings", "matched", "internal_only", "provider_only", "summary"]
    );
}

#[test]
fn run_session_id_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let (internal, provider) = ledgers(dir.path());

    let a = lmatch(&["run", &internal, &provider, "--json"]);
    let b = lmatch(&["run", &internal, &provider, "--json"]);
    let a: serde_json::Value = serde_json::from_slice(&a.stdout).unwrap();
    let b: serde_json::Value = serde_json::from_slice(&b.stdout).unwrap();
    assert_eq!(a["session_id"], b["session_id"]);
}

#[test]
fn run_prints_human_summary_without_json() {
    let dir = tempfile::tempdir().unwrap();
    let (internal, provider) = ledgers(dir.path());

    let output = lmatch(&["run", &internal, &provider]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("2 matched, 1 internal only, 1 provider only; "));
}

#[test]
fn run_fail_on_high_risk() {
    let dir = tempfile::tempdir().unwrap();
    let (internal, provider) = ledgers(dir.path());

    let output = lmatch(&["run", &internal, &provider, "--fail-on-high-risk"]);
    assert_eq!(output.status.code(), Some(7));
    assert!(stderr(&output).contains("high-risk"));
}

#[test]
fn run_writes_exports() {
    let dir = tempfile::tempdir().unwrap();
    let (internal, provider) = ledgers(dir.path());
    let out_dir = dir.path().join("out");
    let zip_path = dir.path().join("results.zip");
    let json_path = dir.path().join("result.json");

    let output = lmatch(&[
        "run",
        &internal,
        &provider,
        "--export-dir",
        out_dir.to_str().unwrap(),
        "--zip",
        zip_path.to_str().unwrap(),
        "--output",
        json_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    assert!(out_dir.join("matched_transactions.csv").exists());
    assert!(out_dir.join("internal_only_transactions.csv").exists());
    assert!(out_dir.join("provider_only_transactions.csv").exists());

    let archive = zip::ZipArchive::new(std::fs::File::open(&zip_path).unwrap()).unwrap();
    assert_eq!(archive.len(), 3);

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(saved["summary"]["matched"], 2);
}

#[test]
fn run_prints_single_category_csv() {
    let dir = tempfile::tempdir().unwrap();
    let (internal, provider) = ledgers(dir.path());

    let output = lmatch(&["run", &internal, &provider, "--category", "provider_only"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "transaction_reference,amount,status\nTXN004,400,Pending\n"
    );
}

#[test]
fn run_refuses_empty_category() {
    let dir = tempfile::tempdir().unwrap();
    let internal = write(dir.path(), "internal.csv", "transaction_id,amount\nTXN001,100\n");
    let provider = write(dir.path(), "provider.csv", "ref_id,total\nTXN001,100\n");

    let output = lmatch(&[
        "run",
        internal.to_str().unwrap(),
        provider.to_str().unwrap(),
        "--category",
        "internal_only",
    ]);
    assert_eq!(output.status.code(), Some(6));
    assert!(stderr(&output).contains("no data available for category: internal_only"));
}

#[test]
fn run_rejects_unknown_category() {
    let dir = tempfile::tempdir().unwrap();
    let (internal, provider) = ledgers(dir.path());

    let output = lmatch(&["run", &internal, &provider, "--category", "summary"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn run_with_rules_only_config() {
    let dir = tempfile::tempdir().unwrap();
    let (internal, provider) = ledgers(dir.path());
    let config = write(dir.path(), "scoring.toml", "variance_threshold_pct = 50.0\n\n[outlier]\nenabled = false\n");

    let output = lmatch(&["run", &internal, &provider, "--json", "--config", config.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let val: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    // 25% variance is under the threshold; the Completed/Pending conflict still counts
    assert_eq!(val["summary"]["high_risk"], 1);
    assert_eq!(val["summary"]["anomalies"], 1);
}

#[test]
fn run_rejects_non_csv_input() {
    let dir = tempfile::tempdir().unwrap();
    let (_, provider) = ledgers(dir.path());
    let txt = write(dir.path(), "internal.txt", INTERNAL);

    let output = lmatch(&["run", txt.to_str().unwrap(), &provider]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("only .csv files are accepted"));
}

#[test]
fn run_missing_file_is_ingest_error() {
    let dir = tempfile::tempdir().unwrap();
    let (_, provider) = ledgers(dir.path());
    let missing = dir.path().join("nope.csv");

    let output = lmatch(&["run", missing.to_str().unwrap(), &provider]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn run_non_numeric_amount_is_ingest_error() {
    let dir = tempfile::tempdir().unwrap();
    let (_, provider) = ledgers(dir.path());
    let bad = write(dir.path(), "bad.csv", "transaction_id,amount\nTXN001,100\nTXN002,lots\n");

    let output = lmatch(&["run", bad.to_str().unwrap(), &provider]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("'lots'"));
}

#[test]
fn run_without_reference_column() {
    let dir = tempfile::tempdir().unwrap();
    let (_, provider) = ledgers(dir.path());
    let unmapped = write(dir.path(), "unmapped.csv", "foo,bar\nx,y\n");

    let output = lmatch(&["run", unmapped.to_str().unwrap(), &provider]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("internal"));
}

#[test]
fn run_with_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let (internal, provider) = ledgers(dir.path());
    let config = write(dir.path(), "scoring.toml", "[outlier]\ncontamination = 0.9\n");

    let output = lmatch(&["run", &internal, &provider, "--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(5));
}

// ===========================================================================
// lmatch map / validate-config
// ===========================================================================

#[test]
fn map_prints_mapping_json() {
    let dir = tempfile::tempdir().unwrap();
    let (_, provider) = ledgers(dir.path());

    let output = lmatch(&["map", &provider]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let val: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        val,
        serde_json::json!({
            "transaction_reference": "ref_id",
            "amount": "total",
            "status": "state",
        })
    );
}

#[test]
fn validate_config_accepts_defaults_and_rejects_unknown_keys() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "good.toml", "variance_threshold_pct = 2.5\n");
    let bad = write(dir.path(), "bad.toml", "variance_treshold_pct = 2.5\n");

    let output = lmatch(&["validate-config", good.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("variance threshold 2.5%"));

    let output = lmatch(&["validate-config", bad.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn no_subcommand_is_usage_error() {
    let output = lmatch(&[]);
    assert_eq!(output.status.code(), Some(2));
}
