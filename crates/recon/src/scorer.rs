//! Anomaly scorer. Attaches variance, rule flags and outlier flags to matched rows.
//!
//! Three steps run in order, each one only raising risk:
//! 1. amount variance above the threshold → `High`
//! 2. statistical outlier on the standardized amount pair → `Medium` (if still `Low`)
//! 3. critical status conflict → `High`

use crate::config::ScoringConfig;
use crate::error::OutlierError;
use crate::isolation::IsolationForest;
use crate::model::{MatchedTable, RiskLevel, Value};

/// Unsupervised outlier model over an n×2 amount matrix. One flag per row.
pub trait OutlierDetector: Send + Sync {
    fn detect(&self, matrix: &[[f64; 2]]) -> Result<Vec<bool>, OutlierError>;
}

/// Zero mean, unit population variance per column. A constant column is
/// centred but left unscaled.
pub fn standardize(matrix: &[[f64; 2]]) -> Result<Vec<[f64; 2]>, OutlierError> {
    if matrix.is_empty() {
        return Ok(Vec::new());
    }
    for (row, point) in matrix.iter().enumerate() {
        if let Some(column) = point.iter().position(|v| !v.is_finite()) {
            return Err(OutlierError::NonFinite { row, column });
        }
    }

    let n = matrix.len() as f64;
    let mut mean = [0.0f64; 2];
    let mut scale = [0.0f64; 2];
    for c in 0..2 {
        mean[c] = matrix.iter().map(|p| p[c]).sum::<f64>() / n;
        let var = matrix.iter().map(|p| (p[c] - mean[c]).powi(2)).sum::<f64>() / n;
        scale[c] = if var > 0.0 { var.sqrt() } else { 1.0 };
    }

    Ok(matrix
        .iter()
        .map(|p| [(p[0] - mean[0]) / scale[0], (p[1] - mean[1]) / scale[1]])
        .collect())
}

/// `|internal - provider| / internal * 100`, with a zero internal amount
/// replaced by 1.
pub fn amount_variance(internal: f64, provider: f64) -> f64 {
    let denom = if internal == 0.0 { 1.0 } else { internal };
    ((internal - provider) / denom).abs() * 100.0
}

fn contains_ci(value: &Value, needle: &str) -> bool {
    value
        .as_str()
        .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase()))
}

pub struct AnomalyScorer {
    config: ScoringConfig,
    detector: Box<dyn OutlierDetector>,
}

impl Default for AnomalyScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl AnomalyScorer {
    /// Scorer backed by a seeded isolation forest built from `config.outlier`.
    pub fn new(config: ScoringConfig) -> Self {
        let detector = Box::new(IsolationForest::from_config(&config.outlier));
        Self { config, detector }
    }

    pub fn with_detector(config: ScoringConfig, detector: Box<dyn OutlierDetector>) -> Self {
        Self { config, detector }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score every matched row. An empty table is returned unchanged.
    pub fn score(&self, mut matched: MatchedTable) -> MatchedTable {
        if matched.is_empty() {
            return matched;
        }

        for row in &mut matched.rows {
            row.anomaly = false;
            row.amount_variance = 0.0;
            row.risk_level = RiskLevel::Low;
        }

        if let (Some(ai), Some(pi)) = (
            matched.column_index("amount_internal"),
            matched.column_index("amount_provider"),
        ) {
            self.apply_variance_rule(&mut matched, ai, pi);
            if self.config.outlier.enabled && matched.len() >= 2 {
                self.apply_outlier_rule(&mut matched, ai, pi);
            }
        }

        if let (Some(si), Some(pi)) = (
            matched.column_index("status_internal"),
            matched.column_index("status_provider"),
        ) {
            self.apply_status_rule(&mut matched, si, pi);
        }

        matched
    }

    fn apply_variance_rule(&self, matched: &mut MatchedTable, ai: usize, pi: usize) {
        for row in &mut matched.rows {
            let (Some(internal), Some(provider)) =
                (row.values[ai].as_f64(), row.values[pi].as_f64())
            else {
                continue;
            };
            row.amount_variance = amount_variance(internal, provider);
            if row.amount_variance > self.config.variance_threshold_pct {
                row.anomaly = true;
                row.escalate(RiskLevel::High);
            }
        }
    }

    fn apply_outlier_rule(&self, matched: &mut MatchedTable, ai: usize, pi: usize) {
        let matrix: Vec<[f64; 2]> = matched
            .rows
            .iter()
            .map(|r| {
                [
                    r.values[ai].as_f64().unwrap_or(0.0),
                    r.values[pi].as_f64().unwrap_or(0.0),
                ]
            })
            .collect();

        let flags = match standardize(&matrix).and_then(|m| self.detector.detect(&m)) {
            Ok(flags) => flags,
            Err(e) => {
                log::warn!("outlier detection skipped: {e}");
                return;
            }
        };
        if flags.len() != matched.rows.len() {
            log::warn!(
                "outlier detection skipped: {} flag(s) for {} row(s)",
                flags.len(),
                matched.rows.len()
            );
            return;
        }

        let mut flagged = 0usize;
        for (row, flag) in matched.rows.iter_mut().zip(flags) {
            if flag {
                row.anomaly = true;
                row.escalate(RiskLevel::Medium);
                flagged += 1;
            }
        }
        log::debug!("outlier model flagged {flagged} of {} row(s)", matched.rows.len());
    }

    fn apply_status_rule(&self, matched: &mut MatchedTable, si: usize, pi: usize) {
        for row in &mut matched.rows {
            let internal = &row.values[si];
            let provider = &row.values[pi];
            let conflict = self.config.critical_status_pairs.iter().any(|(a, b)| {
                (contains_ci(internal, a) && contains_ci(provider, b))
                    || (contains_ci(internal, b) && contains_ci(provider, a))
            });
            if conflict {
                row.anomaly = true;
                row.escalate(RiskLevel::High);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchedRow;

    struct FlagRows(Vec<usize>);

    impl OutlierDetector for FlagRows {
        fn detect(&self, matrix: &[[f64; 2]]) -> Result<Vec<bool>, OutlierError> {
            Ok((0..matrix.len()).map(|i| self.0.contains(&i)).collect())
        }
    }

    struct Broken;

    impl OutlierDetector for Broken {
        fn detect(&self, matrix: &[[f64; 2]]) -> Result<Vec<bool>, OutlierError> {
            Err(OutlierError::TooFewRows(matrix.len()))
        }
    }

    fn table(rows: &[(&str, f64, f64, &str, &str)]) -> MatchedTable {
        MatchedTable {
            columns: vec![
                "transaction_reference".into(),
                "amount_internal".into(),
                "status_internal".into(),
                "amount_provider".into(),
                "status_provider".into(),
            ],
            rows: rows
                .iter()
                .map(|(r, ai, ap, si, sp)| {
                    MatchedRow::new(vec![
                        (*r).into(),
                        (*ai).into(),
                        (*si).into(),
                        (*ap).into(),
                        (*sp).into(),
                    ])
                })
                .collect(),
        }
    }

    fn scorer(detector: impl OutlierDetector + 'static) -> AnomalyScorer {
        AnomalyScorer::with_detector(ScoringConfig::default(), Box::new(detector))
    }

    #[test]
    fn variance_formula_and_zero_guard() {
        assert_eq!(amount_variance(0.0, 37.0), 3700.0);
        assert_eq!(amount_variance(200.0, 220.0), 10.0);
        assert_eq!(amount_variance(-100.0, -110.0), 10.0);
        assert_eq!(amount_variance(100.0, 100.0), 0.0);
    }

    #[test]
    fn high_variance_is_high_risk() {
        let t = table(&[
            ("TXN001", 100.0, 100.0, "Completed", "Completed"),
            ("TXN002", 200.0, 220.0, "Completed", "Completed"),
            ("TXN003", 1000.0, 500.0, "Completed", "Completed"),
        ]);
        let out = scorer(FlagRows(vec![])).score(t);
        assert_eq!(out.rows[0].risk_level, RiskLevel::Low);
        assert!(!out.rows[0].anomaly);
        assert_eq!(out.rows[1].amount_variance, 10.0);
        assert_eq!(out.rows[1].risk_level, RiskLevel::High);
        assert_eq!(out.rows[2].amount_variance, 50.0);
        assert!(out.rows[2].anomaly);
    }

    #[test]
    fn variance_at_threshold_is_not_flagged() {
        let t = table(&[("TXN001", 100.0, 105.0, "Completed", "Completed")]);
        let out = scorer(FlagRows(vec![])).score(t);
        assert_eq!(out.rows[0].amount_variance, 5.0);
        assert_eq!(out.rows[0].risk_level, RiskLevel::Low);
    }

    #[test]
    fn outlier_flag_gives_medium_but_never_downgrades_high() {
        let t = table(&[
            ("TXN001", 100.0, 100.0, "Completed", "Completed"),
            ("TXN002", 100.0, 150.0, "Completed", "Completed"),
            ("TXN003", 100.0, 100.0, "Completed", "Completed"),
        ]);
        let out = scorer(FlagRows(vec![0, 1])).score(t);
        assert_eq!(out.rows[0].risk_level, RiskLevel::Medium);
        assert!(out.rows[0].anomaly);
        assert_eq!(out.rows[1].risk_level, RiskLevel::High);
        assert_eq!(out.rows[2].risk_level, RiskLevel::Low);
    }

    #[test]
    fn status_conflict_overrides_medium() {
        let t = table(&[
            ("TXN001", 100.0, 100.0, "Processed", "Failed"),
            ("TXN002", 200.0, 200.0, "Completed", "Completed"),
        ]);
        let out = scorer(FlagRows(vec![0])).score(t);
        assert!(out.rows[0].anomaly);
        assert_eq!(out.rows[0].risk_level, RiskLevel::High);
        assert_eq!(out.rows[1].risk_level, RiskLevel::Low);
    }

    #[test]
    fn status_conflict_is_symmetric_substring_and_case_insensitive() {
        let t = table(&[
            ("TXN001", 1.0, 1.0, "payment FAILED", "processed ok"),
            ("TXN002", 1.0, 1.0, "Pending review", "COMPLETED"),
            ("TXN003", 1.0, 1.0, "Pending", "Failed"),
        ]);
        let out = scorer(FlagRows(vec![])).score(t);
        assert_eq!(out.rows[0].risk_level, RiskLevel::High);
        assert_eq!(out.rows[1].risk_level, RiskLevel::High);
        assert_eq!(out.rows[2].risk_level, RiskLevel::Low);
    }

    #[test]
    fn null_status_never_conflicts() {
        let mut t = table(&[("TXN001", 1.0, 1.0, "Processed", "Failed")]);
        t.rows[0].values[4] = Value::Null;
        let out = scorer(FlagRows(vec![])).score(t);
        assert_eq!(out.rows[0].risk_level, RiskLevel::Low);
    }

    #[test]
    fn detector_failure_keeps_rule_results() {
        let t = table(&[
            ("TXN001", 100.0, 200.0, "Completed", "Completed"),
            ("TXN002", 100.0, 100.0, "Success", "Error"),
            ("TXN003", 100.0, 100.0, "Completed", "Completed"),
        ]);
        let out = scorer(Broken).score(t);
        assert_eq!(out.rows[0].risk_level, RiskLevel::High);
        assert_eq!(out.rows[1].risk_level, RiskLevel::High);
        assert_eq!(out.rows[2].risk_level, RiskLevel::Low);
        assert!(!out.rows[2].anomaly);
    }

    #[test]
    fn single_row_skips_outlier_step() {
        let t = table(&[("TXN001", 100.0, 100.0, "Completed", "Completed")]);
        let out = scorer(FlagRows(vec![0])).score(t);
        assert_eq!(out.rows[0].risk_level, RiskLevel::Low);
        assert!(!out.rows[0].anomaly);
    }

    #[test]
    fn null_amount_leaves_zero_variance() {
        let mut t = table(&[("TXN001", 0.0, 50.0, "Completed", "Completed")]);
        t.rows[0].values[1] = Value::Null;
        let out = scorer(FlagRows(vec![])).score(t);
        assert_eq!(out.rows[0].amount_variance, 0.0);
        assert_eq!(out.rows[0].risk_level, RiskLevel::Low);
    }

    #[test]
    fn empty_table_is_untouched() {
        let t = MatchedTable::default();
        assert_eq!(scorer(FlagRows(vec![0])).score(t.clone()), t);
    }

    #[test]
    fn no_amount_columns_skips_amount_steps() {
        let t = MatchedTable {
            columns: vec!["transaction_reference".into(), "amount".into()],
            rows: vec![
                MatchedRow::new(vec!["A".into(), 1.0.into()]),
                MatchedRow::new(vec!["B".into(), 1000.0.into()]),
            ],
        };
        let out = scorer(FlagRows(vec![0, 1])).score(t);
        assert!(out.rows.iter().all(|r| r.risk_level == RiskLevel::Low && !r.anomaly));
    }

    #[test]
    fn isolation_forest_finds_clear_outlier() {
        let mut rows: Vec<(String, f64)> = (1..=9).map(|i| (format!("TXN{i:03}"), 100.0)).collect();
        rows.push(("TXN010".into(), 10000.0));
        let t = MatchedTable {
            columns: vec![
                "transaction_reference".into(),
                "amount_internal".into(),
                "amount_provider".into(),
            ],
            rows: rows
                .iter()
                .map(|(r, a)| MatchedRow::new(vec![r.as_str().into(), (*a).into(), (*a).into()]))
                .collect(),
        };
        let out = AnomalyScorer::default().score(t);
        assert!(out.rows[9].anomaly);
        assert_eq!(out.rows[9].risk_level, RiskLevel::Medium);
        assert!(out.rows[..9].iter().all(|r| !r.anomaly));
    }

    #[test]
    fn standardize_constant_column() {
        let m = standardize(&[[5.0, 1.0], [5.0, 3.0]]).unwrap();
        assert_eq!(m, vec![[0.0, -1.0], [0.0, 1.0]]);
        assert!(standardize(&[[f64::INFINITY, 0.0]]).is_err());
    }

    #[test]
    fn custom_critical_pairs() {
        let mut config = ScoringConfig::default();
        config.critical_status_pairs = vec![("Settled".into(), "Reversed".into())];
        let s = AnomalyScorer::with_detector(config, Box::new(FlagRows(vec![])));
        let t = table(&[
            ("TXN001", 1.0, 1.0, "Settled", "Reversed"),
            ("TXN002", 1.0, 1.0, "Processed", "Failed"),
        ]);
        let out = s.score(t);
        assert_eq!(out.rows[0].risk_level, RiskLevel::High);
        assert_eq!(out.rows[1].risk_level, RiskLevel::Low);
    }
}
