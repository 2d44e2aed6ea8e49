//! `ledgermatch-io`: the file-facing collaborators of the reconciliation engine.
//!
//! Ingestion turns delimited text into typed tables; export writes results back
//! out as CSV files or a ZIP bundle.

pub mod error;
pub mod export;
pub mod ingest;

pub use error::{ExportError, IngestError};
pub use export::{export_category, write_category_files, write_zip, Category};
pub use ingest::{is_csv_path, read_table, read_table_file, require_numeric};
