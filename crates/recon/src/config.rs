use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Anomaly scoring knobs. Every key is optional; defaults reproduce the
/// standard rule set (5% variance, four critical status pairs, 10% contamination).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    #[serde(default = "default_variance_threshold")]
    pub variance_threshold_pct: f64,
    #[serde(default = "default_critical_pairs")]
    pub critical_status_pairs: Vec<(String, String)>,
    #[serde(default)]
    pub outlier: OutlierConfig,
}

fn default_variance_threshold() -> f64 {
    5.0
}

fn default_critical_pairs() -> Vec<(String, String)> {
    [
        ("Processed", "Failed"),
        ("Completed", "Pending"),
        ("Success", "Error"),
        ("Approved", "Rejected"),
    ]
    .into_iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect()
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            variance_threshold_pct: default_variance_threshold(),
            critical_status_pairs: default_critical_pairs(),
            outlier: OutlierConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outlier model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutlierConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Expected share of rows flagged as outliers.
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_true() -> bool {
    true
}

fn default_contamination() -> f64 {
    0.1
}

fn default_n_estimators() -> usize {
    100
}

fn default_max_samples() -> usize {
    256
}

fn default_seed() -> u64 {
    42
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            contamination: default_contamination(),
            n_estimators: default_n_estimators(),
            max_samples: default_max_samples(),
            seed: default_seed(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ScoringConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ScoringConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if !self.variance_threshold_pct.is_finite() || self.variance_threshold_pct < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "variance_threshold_pct must be a non-negative number, got {}",
                self.variance_threshold_pct
            )));
        }

        for (a, b) in &self.critical_status_pairs {
            if a.is_empty() || b.is_empty() {
                return Err(ReconError::ConfigValidation(
                    "critical_status_pairs entries must not be empty".into(),
                ));
            }
        }

        let o = &self.outlier;
        if !(o.contamination > 0.0 && o.contamination <= 0.5) {
            return Err(ReconError::ConfigValidation(format!(
                "outlier.contamination must be in (0, 0.5], got {}",
                o.contamination
            )));
        }
        if o.n_estimators == 0 {
            return Err(ReconError::ConfigValidation(
                "outlier.n_estimators must be at least 1".into(),
            ));
        }
        if o.max_samples < 2 {
            return Err(ReconError::ConfigValidation(format!(
                "outlier.max_samples must be at least 2, got {}",
                o.max_samples
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
