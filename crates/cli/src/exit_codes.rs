//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `lmatch` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | CLI usage error (bad args, non-CSV input)                 |
//! | 3    | Ingestion error (unreadable file, malformed CSV, amounts) |
//! | 4    | No transaction reference column on one side               |
//! | 5    | Invalid scoring config                                    |
//! | 6    | Export failed (output, export dir, zip)                   |
//! | 7    | High-risk transactions found with `--fail-on-high-risk`   |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, wrong file type.
pub const EXIT_USAGE: u8 = 2;

/// Input file could not be read or parsed, or the amount column holds text.
pub const EXIT_INGEST: u8 = 3;

/// Neither header of a side mapped to `transaction_reference`.
pub const EXIT_MISSING_KEY: u8 = 4;

/// Scoring config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 5;

/// Writing JSON output, category CSVs or the ZIP archive failed.
pub const EXIT_EXPORT: u8 = 6;

/// At least one matched row is high risk and `--fail-on-high-risk` was given.
pub const EXIT_HIGH_RISK: u8 = 7;
