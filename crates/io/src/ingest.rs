// CSV/TSV ingestion into typed tables

use std::io::Read;
use std::path::Path;

use ledgermatch_recon::{Table, Value};

use crate::error::IngestError;

pub fn read_table_file(path: &Path) -> Result<Table, IngestError> {
    let content = read_file_as_utf8(path)?;
    read_table(&content)
}

/// Parse delimited text with a header row. Empty cells become `Null`; a column
/// whose non-empty cells all parse as finite numbers becomes numeric, any other
/// column keeps its cells as text.
pub fn read_table(content: &str) -> Result<Table, IngestError> {
    let delimiter = sniff_delimiter(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::Csv(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::EmptyHeader);
    }

    let mut raw: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| IngestError::Csv(e.to_string()))?;
        raw.push(record.iter().map(|f| f.to_string()).collect());
    }

    let numeric: Vec<bool> = (0..headers.len())
        .map(|c| {
            let mut cells = raw.iter().map(|r| r[c].as_str()).filter(|s| !s.is_empty());
            let first = cells.next();
            first.is_some() && first.into_iter().chain(cells).all(|s| parse_number(s).is_some())
        })
        .collect();

    let mut table = Table::new(headers);
    for cells in raw {
        let row = cells
            .into_iter()
            .zip(&numeric)
            .map(|(cell, &is_numeric)| {
                if cell.is_empty() {
                    Value::Null
                } else if is_numeric {
                    parse_number(&cell).map_or(Value::Null, Value::Number)
                } else {
                    Value::Text(cell)
                }
            })
            .collect();
        table
            .push_row(row)
            .map_err(|e| IngestError::Csv(e.to_string()))?;
    }

    log::debug!(
        "ingested {} row(s), {} column(s), delimiter {:?}",
        table.len(),
        table.columns.len(),
        delimiter as char
    );
    Ok(table)
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Ensure every non-null cell of `column` is a number. A missing column passes.
pub fn require_numeric(table: &Table, column: &str) -> Result<(), IngestError> {
    let Some(idx) = table.column_index(column) else {
        return Ok(());
    };
    for (row, values) in table.rows.iter().enumerate() {
        if let Value::Text(s) = &values[idx] {
            if parse_number(s).is_none() {
                return Err(IngestError::NonNumeric {
                    column: column.to_string(),
                    row: row + 1,
                    value: s.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Only `.csv` (any case) is accepted.
pub fn is_csv_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // More columns breaks ties
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IngestError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| IngestError::Io(format!("{}: {e}", path.display())))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| IngestError::Io(format!("{}: {e}", path.display())))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}
