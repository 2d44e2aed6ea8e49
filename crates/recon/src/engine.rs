//! Sorted full outer join of two canonical ledgers on `transaction_reference`.
//!
//! Number references join numbers and sort numerically; text references join
//! text. A number never joins a text cell, even with the same digits. Blank
//! references join each other and sort last.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::{ReconError, Side};
use crate::model::{MatchedRow, MatchedTable, ReconResult, Table, Value};
use crate::scorer::AnomalyScorer;
use crate::summary::compute_summary;

pub const KEY_COLUMN: &str = "transaction_reference";

/// Reconcile two canonicalized tables with the default scorer.
pub fn reconcile(internal: &Table, provider: &Table) -> Result<ReconResult, ReconError> {
    reconcile_with(internal, provider, &AnomalyScorer::default())
}

/// Full outer join on `transaction_reference`, then match flags, scoring and summary.
pub fn reconcile_with(
    internal: &Table,
    provider: &Table,
    scorer: &AnomalyScorer,
) -> Result<ReconResult, ReconError> {
    let internal_key = internal
        .column_index(KEY_COLUMN)
        .ok_or(ReconError::MissingKeyColumn { side: Side::Internal })?;
    let provider_key = provider
        .column_index(KEY_COLUMN)
        .ok_or(ReconError::MissingKeyColumn { side: Side::Provider })?;

    let output = outer_join(internal, internal_key, provider, provider_key);
    let mut matched = output.matched;
    apply_match_flags(&mut matched);
    let matched = scorer.score(matched);

    let summary = compute_summary(&matched, &output.internal_only, &output.provider_only);
    log::debug!(
        "reconciled: {} matched, {} internal-only, {} provider-only, {} anomalies",
        summary.matched,
        summary.internal_only,
        summary.provider_only,
        summary.anomalies,
    );

    Ok(ReconResult {
        matched,
        internal_only: output.internal_only,
        provider_only: output.provider_only,
        summary,
    })
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Join key of a reference cell.
///
/// Kinds never join across: the number `1001` and the text `"1001"` are
/// different keys. Numbers order numerically, text lexicographically, and
/// all numbers sort before all text. Null references form one key of their
/// own, sorted last, so blank references on both sides match each other.
#[derive(Debug, Clone)]
enum JoinKey {
    Number(f64),
    Text(String),
    Null,
}

impl JoinKey {
    fn of(value: &Value) -> Self {
        match value {
            // +0.0 folds -0.0 into 0.0
            Value::Number(n) => Self::Number(n + 0.0),
            Value::Text(s) => Self::Text(s.clone()),
            Value::Null => Self::Null,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Text(_) => 1,
            Self::Null => 2,
        }
    }
}

impl Ord for JoinKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for JoinKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for JoinKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for JoinKey {}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Null => f.write_str("<null>"),
        }
    }
}

/// Index of row positions per key, in input order.
fn build_index(table: &Table, key_idx: usize) -> BTreeMap<JoinKey, Vec<usize>> {
    let mut index: BTreeMap<JoinKey, Vec<usize>> = BTreeMap::new();
    for (i, row) in table.rows.iter().enumerate() {
        index.entry(JoinKey::of(&row[key_idx])).or_default().push(i);
    }
    index
}

#[derive(Debug)]
pub struct JoinOutput {
    pub matched: MatchedTable,
    pub internal_only: Table,
    pub provider_only: Table,
}

/// Sorted full outer join. Duplicate keys (null included) produce every
/// internal × provider combination. Shared non-key columns get `_internal` / `_provider` suffixes.
pub fn outer_join(
    internal: &Table,
    internal_key: usize,
    provider: &Table,
    provider_key: usize,
) -> JoinOutput {
    let internal_names: HashSet<&str> = internal.columns.iter().map(String::as_str).collect();
    let provider_names: HashSet<&str> = provider.columns.iter().map(String::as_str).collect();

    let mut columns = Vec::with_capacity(internal.columns.len() + provider.columns.len());
    for (i, col) in internal.columns.iter().enumerate() {
        if i != internal_key && provider_names.contains(col.as_str()) {
            columns.push(format!("{col}_internal"));
        } else {
            columns.push(col.clone());
        }
    }
    let provider_cols: Vec<usize> = (0..provider.columns.len())
        .filter(|&i| i != provider_key)
        .collect();
    for &i in &provider_cols {
        let col = &provider.columns[i];
        if internal_names.contains(col.as_str()) {
            columns.push(format!("{col}_provider"));
        } else {
            columns.push(col.clone());
        }
    }

    let internal_index = build_index(internal, internal_key);
    let provider_index = build_index(provider, provider_key);

    let mut keys: Vec<&JoinKey> = internal_index.keys().chain(provider_index.keys()).collect();
    keys.sort_unstable();
    keys.dedup();

    let mut matched = MatchedTable {
        columns,
        rows: Vec::new(),
    };
    let mut internal_only = Table::new(internal.columns.iter().cloned());
    let mut provider_only = Table::new(provider.columns.iter().cloned());

    for key in keys {
        match (internal_index.get(key), provider_index.get(key)) {
            (Some(left), Some(right)) => {
                if left.len() > 1 || right.len() > 1 {
                    log::warn!(
                        "reference '{key}' repeats ({} internal × {} provider): {} matched rows",
                        left.len(),
                        right.len(),
                        left.len() * right.len()
                    );
                }
                for &l in left {
                    for &r in right {
                        let mut values = internal.rows[l].clone();
                        values.extend(provider_cols.iter().map(|&i| provider.rows[r][i].clone()));
                        matched.rows.push(MatchedRow::new(values));
                    }
                }
            }
            (Some(left), None) => {
                internal_only
                    .rows
                    .extend(left.iter().map(|&l| internal.rows[l].clone()));
            }
            (None, Some(right)) => {
                provider_only
                    .rows
                    .extend(right.iter().map(|&r| provider.rows[r].clone()));
            }
            (None, None) => {}
        }
    }

    JoinOutput {
        matched,
        internal_only,
        provider_only,
    }
}

/// `amount_match` / `status_match`: strict equality when both sides carry the
/// column, vacuously true otherwise.
fn apply_match_flags(matched: &mut MatchedTable) {
    let amount = matched
        .column_index("amount_internal")
        .zip(matched.column_index("amount_provider"));
    let status = matched
        .column_index("status_internal")
        .zip(matched.column_index("status_provider"));

    for row in &mut matched.rows {
        row.amount_match = amount.map_or(true, |(a, b)| row.values[a].strict_eq(&row.values[b]));
        row.status_match = status.map_or(true, |(a, b)| row.values[a].strict_eq(&row.values[b]));
    }
}
