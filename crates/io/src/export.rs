//! Result export: one CSV per category, or all non-empty categories in a ZIP.

use std::fmt;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ledgermatch_recon::{MatchedTable, ReconResult, Table};
use zip::write::SimpleFileOptions;

use crate::error::ExportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Matched,
    InternalOnly,
    ProviderOnly,
}

impl Category {
    /// Archive order.
    pub const ALL: [Category; 3] = [Self::Matched, Self::InternalOnly, Self::ProviderOnly];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::InternalOnly => "internal_only",
            Self::ProviderOnly => "provider_only",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_transactions.csv", self.name())
    }

    pub fn row_count(&self, result: &ReconResult) -> usize {
        match self {
            Self::Matched => result.matched.len(),
            Self::InternalOnly => result.internal_only.len(),
            Self::ProviderOnly => result.provider_only.len(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("invalid category: {s}"))
    }
}

pub fn write_table_csv<W: Write>(writer: W, table: &Table) -> Result<(), ExportError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(&table.columns)?;
    for row in &table.rows {
        out.write_record(row.iter().map(|v| v.to_string()))?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_matched_csv<W: Write>(writer: W, matched: &MatchedTable) -> Result<(), ExportError> {
    const DERIVED: [&str; 5] = [
        "amount_match",
        "status_match",
        "anomaly",
        "amount_variance",
        "risk_level",
    ];

    let mut out = csv::Writer::from_writer(writer);
    out.write_record(matched.columns.iter().map(String::as_str).chain(DERIVED))?;
    for row in &matched.rows {
        let mut record: Vec<String> = row.values.iter().map(|v| v.to_string()).collect();
        record.push(row.amount_match.to_string());
        record.push(row.status_match.to_string());
        record.push(row.anomaly.to_string());
        record.push(row.amount_variance.to_string());
        record.push(row.risk_level.to_string());
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

fn category_bytes(result: &ReconResult, category: Category) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    match category {
        Category::Matched => write_matched_csv(&mut buf, &result.matched)?,
        Category::InternalOnly => write_table_csv(&mut buf, &result.internal_only)?,
        Category::ProviderOnly => write_table_csv(&mut buf, &result.provider_only)?,
    }
    Ok(buf)
}

/// CSV bytes for one category. An empty category is an error.
pub fn export_category(result: &ReconResult, category: Category) -> Result<Vec<u8>, ExportError> {
    if category.row_count(result) == 0 {
        return Err(ExportError::EmptyCategory(category.name().to_string()));
    }
    category_bytes(result, category)
}

/// Write each non-empty category as `<category>_transactions.csv` in `dir`.
pub fn write_category_files(dir: &Path, result: &ReconResult) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for category in Category::ALL {
        if category.row_count(result) == 0 {
            continue;
        }
        let path = dir.join(category.file_name());
        std::fs::write(&path, category_bytes(result, category)?)?;
        log::debug!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// ZIP archive of every non-empty category. Returns the number of entries.
pub fn write_zip<W: Write + Seek>(writer: W, result: &ReconResult) -> Result<usize, ExportError> {
    let mut zip = zip::ZipWriter::new(writer);
    let options = SimpleFileOptions::default();
    let mut entries = 0;
    for category in Category::ALL {
        if category.row_count(result) == 0 {
            continue;
        }
        zip.start_file(category.file_name(), options)?;
        zip.write_all(&category_bytes(result, category)?)?;
        entries += 1;
    }
    zip.finish()?;
    Ok(entries)
}
