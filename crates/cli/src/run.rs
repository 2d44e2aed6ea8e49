//! `lmatch run`, `lmatch map`, `lmatch validate-config`.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use ledgermatch_io::{
    export_category, is_csv_path, read_table_file, require_numeric, write_category_files,
    write_zip, Category,
};
use ledgermatch_recon::mapper::score_header;
use ledgermatch_recon::{
    map_columns, reconcile_with, AnomalyScorer, ColumnMapping, MatchedTable, ReconError,
    ReconSummary, ResultStore, ScoringConfig, Table,
};

use crate::exit_codes::{EXIT_EXPORT, EXIT_HIGH_RISK, EXIT_INVALID_CONFIG, EXIT_MISSING_KEY};
use crate::CliError;

#[derive(Args)]
pub struct RunArgs {
    /// Internal ledger (CSV)
    internal: PathBuf,

    /// Provider ledger (CSV)
    provider: PathBuf,

    /// Scoring config (TOML); defaults apply when omitted
    #[arg(long, env = "LMATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Output JSON to stdout instead of human summary
    #[arg(long)]
    json: bool,

    /// Write JSON output to file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write one CSV per non-empty category into this directory
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Write all non-empty categories into a ZIP archive
    #[arg(long, value_name = "FILE")]
    zip: Option<PathBuf>,

    /// Print one category (matched, internal_only, provider_only) as CSV to stdout
    #[arg(long, value_name = "NAME", conflicts_with = "json")]
    category: Option<Category>,

    /// Exit with code 7 when any matched transaction is high risk
    #[arg(long)]
    fail_on_high_risk: bool,
}

#[derive(Serialize)]
struct ColumnMappings<'a> {
    internal: &'a ColumnMapping,
    provider: &'a ColumnMapping,
}

/// JSON envelope of a run.
#[derive(Serialize)]
struct RunReport<'a> {
    session_id: String,
    column_mappings: ColumnMappings<'a>,
    matched: &'a MatchedTable,
    internal_only: &'a Table,
    provider_only: &'a Table,
    summary: &'a ReconSummary,
}

fn load_config(path: Option<&Path>) -> Result<ScoringConfig, CliError> {
    let Some(path) = path else {
        return Ok(ScoringConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_INVALID_CONFIG, format!("cannot read config {}: {e}", path.display()))
    })?;
    ScoringConfig::from_toml(&text).map_err(|e| CliError::new(EXIT_INVALID_CONFIG, e.to_string()))
}

fn load_ledger(path: &Path) -> Result<(Table, ColumnMapping), CliError> {
    if !is_csv_path(path) {
        return Err(CliError::args(format!("{}: not a CSV file", path.display()))
            .with_hint("only .csv files are accepted"));
    }
    let raw = read_table_file(path)
        .map_err(|e| CliError::ingest(format!("{}: {e}", path.display())))?;
    let mapping = map_columns(&raw.columns);
    let table = raw.rename(&mapping);
    require_numeric(&table, "amount")
        .map_err(|e| CliError::ingest(format!("{}: {e}", path.display())))?;
    log::info!("{}: {} row(s), {} mapped column(s)", path.display(), table.len(), mapping.len());
    Ok((table, mapping))
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let (internal, internal_mapping) = load_ledger(&args.internal)?;
    let (provider, provider_mapping) = load_ledger(&args.provider)?;

    let scorer = AnomalyScorer::new(config);
    let result = reconcile_with(&internal, &provider, &scorer).map_err(|e| match &e {
        ReconError::MissingKeyColumn { .. } => CliError::new(EXIT_MISSING_KEY, e.to_string())
            .with_hint("no header looked like a transaction reference (e.g. transaction_id, ref_id)"),
        _ => CliError::general(e.to_string()),
    })?;

    let report = RunReport {
        session_id: ResultStore::key_for(&internal, &provider),
        column_mappings: ColumnMappings {
            internal: &internal_mapping,
            provider: &provider_mapping,
        },
        matched: &result.matched,
        internal_only: &result.internal_only,
        provider_only: &result.provider_only,
        summary: &result.summary,
    };
    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_EXPORT, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    if let Some(category) = args.category {
        let bytes = export_category(&result, category)
            .map_err(|e| CliError::new(EXIT_EXPORT, e.to_string()))?;
        std::io::stdout()
            .write_all(&bytes)
            .map_err(|e| CliError::new(EXIT_EXPORT, e.to_string()))?;
    }

    if let Some(ref dir) = args.export_dir {
        let written = write_category_files(dir, &result)
            .map_err(|e| CliError::new(EXIT_EXPORT, e.to_string()))?;
        for path in written {
            eprintln!("wrote {}", path.display());
        }
    }

    if let Some(ref path) = args.zip {
        let file = std::fs::File::create(path)
            .map_err(|e| CliError::new(EXIT_EXPORT, format!("{}: {e}", path.display())))?;
        let entries = write_zip(file, &result).map_err(|e| CliError::new(EXIT_EXPORT, e.to_string()))?;
        eprintln!("wrote {} ({} file(s))", path.display(), entries);
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "recon: {} matched, {} internal only, {} provider only; {} anomalies, {} high risk, {} amount mismatches, {} status mismatches",
        s.matched,
        s.internal_only,
        s.provider_only,
        s.anomalies,
        s.high_risk,
        s.amount_mismatches,
        s.status_mismatches,
    );

    if args.fail_on_high_risk && s.high_risk > 0 {
        return Err(CliError::new(
            EXIT_HIGH_RISK,
            format!("{} high-risk transaction(s) found", s.high_risk),
        ));
    }
    Ok(())
}

pub fn cmd_map(file: PathBuf) -> Result<(), CliError> {
    if !is_csv_path(&file) {
        return Err(CliError::args(format!("{}: not a CSV file", file.display())));
    }
    let table = read_table_file(&file)
        .map_err(|e| CliError::ingest(format!("{}: {e}", file.display())))?;
    for header in &table.columns {
        log::debug!("{header:?}: scores {:?}", score_header(header));
    }
    let mapping = map_columns(&table.columns);
    let json_str = serde_json::to_string_pretty(&mapping)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
    println!("{json_str}");
    Ok(())
}

pub fn cmd_validate_config(path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&path))?;
    eprintln!(
        "{}: ok (variance threshold {}%, {} critical status pair(s), outlier detection {})",
        path.display(),
        config.variance_threshold_pct,
        config.critical_status_pairs.len(),
        if config.outlier.enabled { "on" } else { "off" },
    );
    Ok(())
}
