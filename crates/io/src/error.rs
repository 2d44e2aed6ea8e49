use std::fmt;

#[derive(Debug)]
pub enum IngestError {
    /// File could not be read.
    Io(String),
    /// Malformed delimited text (unequal row lengths, bad quoting, etc.).
    Csv(String),
    /// No header row.
    EmptyHeader,
    /// A cell in a column that must be numeric does not parse as a number.
    NonNumeric { column: String, row: usize, value: String },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::EmptyHeader => write!(f, "input has no header row"),
            Self::NonNumeric { column, row, value } => {
                write!(f, "column '{column}', row {row}: cannot parse number '{value}'")
            }
        }
    }
}

impl std::error::Error for IngestError {}

#[derive(Debug)]
pub enum ExportError {
    Io(String),
    Csv(String),
    Zip(String),
    /// Requested category holds no rows.
    EmptyCategory(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Zip(msg) => write!(f, "ZIP error: {msg}"),
            Self::EmptyCategory(category) => {
                write!(f, "no data available for category: {category}")
            }
        }
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

impl From<zip::result::ZipError> for ExportError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Zip(e.to_string())
    }
}
