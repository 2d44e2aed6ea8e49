//! `ledgermatch-recon`: two-ledger transaction reconciliation with risk scoring.
//!
//! Pure engine crate: receives already-parsed tables, returns classified and
//! scored results. No CLI or IO dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod isolation;
pub mod mapper;
pub mod model;
pub mod scorer;
pub mod store;
pub mod summary;

pub use config::{OutlierConfig, ScoringConfig};
pub use engine::{reconcile, reconcile_with, KEY_COLUMN};
pub use error::{OutlierError, ReconError, Side};
pub use isolation::IsolationForest;
pub use mapper::{map_columns, CanonicalRole, ColumnMapping};
pub use model::{
    ColumnType, MatchedRow, MatchedTable, ReconResult, ReconSummary, RiskLevel, Table, Value,
};
pub use scorer::{AnomalyScorer, OutlierDetector};
pub use store::ResultStore;
