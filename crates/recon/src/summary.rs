use crate::model::{MatchedTable, ReconSummary, RiskLevel, Table};

/// Count categories and flagged matched rows. All zero for empty input.
pub fn compute_summary(
    matched: &MatchedTable,
    internal_only: &Table,
    provider_only: &Table,
) -> ReconSummary {
    let mut summary = ReconSummary {
        matched: matched.len(),
        internal_only: internal_only.len(),
        provider_only: provider_only.len(),
        ..Default::default()
    };

    for row in &matched.rows {
        if row.anomaly {
            summary.anomalies += 1;
        }
        if row.risk_level == RiskLevel::High {
            summary.high_risk += 1;
        }
        if !row.amount_match {
            summary.amount_mismatches += 1;
        }
        if !row.status_match {
            summary.status_mismatches += 1;
        }
    }

    summary
}
