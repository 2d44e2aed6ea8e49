//! Heuristic schema mapper. Infers which input header plays which canonical role.
//!
//! Headers are lower-cased and `_`/`-` become spaces. Every role keyword found
//! as a substring adds one point to that role. A header goes to its single best
//! role (ties resolved in [`CanonicalRole::ALL`] order), and a role keeps the
//! first header that reached its highest score.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::model::Table;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalRole {
    TransactionReference,
    Amount,
    Status,
    TransactionDate,
    TransactionCurrency,
}

impl CanonicalRole {
    /// Evaluation order. Earlier roles win per-header ties.
    pub const ALL: [CanonicalRole; 5] = [
        Self::TransactionReference,
        Self::Amount,
        Self::Status,
        Self::TransactionDate,
        Self::TransactionCurrency,
    ];

    /// Column name used after renaming.
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::TransactionReference => "transaction_reference",
            Self::Amount => "amount",
            Self::Status => "status",
            Self::TransactionDate => "transaction_date",
            Self::TransactionCurrency => "transaction_currency",
        }
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::TransactionReference => &[
                "reference",
                "id",
                "txn_id",
                "transaction_id",
                "ref",
                "txn_ref",
                "trans_id",
            ],
            Self::Amount => &["amount", "value", "total", "sum", "price", "cost", "fee", "charge"],
            Self::Status => &["status", "state", "condition", "stage", "phase"],
            Self::TransactionDate => &["date", "time", "timestamp", "created", "processed"],
            Self::TransactionCurrency => &["currency", "curr", "ccy"],
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::TransactionReference => 0,
            Self::Amount => 1,
            Self::Status => 2,
            Self::TransactionDate => 3,
            Self::TransactionCurrency => 4,
        }
    }
}

impl fmt::Display for CanonicalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

fn normalize(header: &str) -> String {
    header.to_lowercase().replace(['_', '-'], " ")
}

/// Keyword hit count per role, indexed like [`CanonicalRole::ALL`].
///
/// Keywords that contain `_` (e.g. `txn_id`) never hit, since normalization
/// has already replaced underscores with spaces.
pub fn score_header(header: &str) -> [usize; 5] {
    let normalized = normalize(header);
    let mut scores = [0usize; 5];
    for role in CanonicalRole::ALL {
        scores[role.index()] = role
            .keywords()
            .iter()
            .filter(|kw| normalized.contains(*kw))
            .count();
    }
    scores
}

/// Best role for one header, or `None` when no keyword hits.
fn best_role(scores: &[usize; 5]) -> Option<(CanonicalRole, usize)> {
    let mut best: Option<(CanonicalRole, usize)> = None;
    for role in CanonicalRole::ALL {
        let score = scores[role.index()];
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((role, score));
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Role → source header. Each role and each header appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    roles: BTreeMap<CanonicalRole, String>,
}

impl ColumnMapping {
    pub fn get(&self, role: CanonicalRole) -> Option<&str> {
        self.roles.get(&role).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalRole, &str)> {
        self.roles.iter().map(|(r, h)| (*r, h.as_str()))
    }

    pub fn role_for(&self, header: &str) -> Option<CanonicalRole> {
        self.roles
            .iter()
            .find(|(_, h)| h.as_str() == header)
            .map(|(r, _)| *r)
    }
}

impl Serialize for ColumnMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.roles.len()))?;
        for (role, header) in &self.roles {
            map.serialize_entry(role.column_name(), header)?;
        }
        map.end()
    }
}

/// Infer the canonical mapping for a header row.
pub fn map_columns<S: AsRef<str>>(headers: &[S]) -> ColumnMapping {
    let mut roles: BTreeMap<CanonicalRole, String> = BTreeMap::new();
    let mut best_scores: BTreeMap<CanonicalRole, usize> = BTreeMap::new();

    for header in headers {
        let header = header.as_ref();
        let Some((role, score)) = best_role(&score_header(header)) else {
            continue;
        };
        // Strictly greater: the first header to reach a score keeps the role.
        if score > best_scores.get(&role).copied().unwrap_or(0) {
            roles.insert(role, header.to_string());
            best_scores.insert(role, score);
        }
    }

    log::debug!("mapped {} of {} header(s)", roles.len(), headers.len());
    ColumnMapping { roles }
}

// ---------------------------------------------------------------------------
// Renaming
// ---------------------------------------------------------------------------

impl Table {
    /// Rename mapped headers to their canonical column names.
    ///
    /// Only the first column carrying a mapped header takes the role. Any other
    /// column whose name is already taken (a claimed canonical name, or a
    /// repeated header) becomes `<name>_source`, numbered from `_source_2` on
    /// further clashes, so the result never holds duplicate names.
    pub fn rename(&self, mapping: &ColumnMapping) -> Table {
        let mut winners: HashMap<usize, CanonicalRole> = HashMap::new();
        for (role, header) in mapping.iter() {
            if let Some(idx) = self.columns.iter().position(|c| c == header) {
                winners.insert(idx, role);
            }
        }

        let mut taken: HashSet<String> =
            winners.values().map(|r| r.column_name().to_string()).collect();
        let mut columns = Vec::with_capacity(self.columns.len());
        for (i, col) in self.columns.iter().enumerate() {
            if let Some(role) = winners.get(&i) {
                columns.push(role.column_name().to_string());
                continue;
            }
            let name = if taken.contains(col) {
                source_name(col, &taken)
            } else {
                col.clone()
            };
            taken.insert(name.clone());
            columns.push(name);
        }

        Table {
            columns,
            rows: self.rows.clone(),
        }
    }
}

fn source_name(col: &str, taken: &HashSet<String>) -> String {
    let base = format!("{col}_source");
    let mut name = base.clone();
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("{base}_{n}");
        n += 1;
    }
    name
}
