use std::fmt;

/// Which input table an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Internal,
    Provider,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal => write!(f, "internal"),
            Self::Provider => write!(f, "provider"),
        }
    }
}

#[derive(Debug)]
pub enum ReconError {
    /// The join key column is absent after canonical renaming.
    MissingKeyColumn { side: Side },
    /// A row does not have one value per header column.
    RowWidth { expected: usize, found: usize },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, contamination out of range, etc.).
    ConfigValidation(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKeyColumn { side } => {
                write!(f, "transaction_reference column not found in {side} table")
            }
            Self::RowWidth { expected, found } => {
                write!(f, "row has {found} value(s), header has {expected} column(s)")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

/// Failure inside the statistical outlier step. Never escapes `reconcile`:
/// the scorer logs it and skips the step.
#[derive(Debug, Clone, PartialEq)]
pub enum OutlierError {
    /// Fewer rows than the model can work with.
    TooFewRows(usize),
    /// NaN or infinite value in the amount matrix.
    NonFinite { row: usize, column: usize },
}

impl fmt::Display for OutlierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewRows(n) => write!(f, "outlier model needs at least 2 rows, got {n}"),
            Self::NonFinite { row, column } => {
                write!(f, "non-finite value at row {row}, column {column}")
            }
        }
    }
}

impl std::error::Error for OutlierError {}
