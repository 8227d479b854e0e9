//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract. Scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Domain     | Description                                     |
//! |------|------------|-------------------------------------------------|
//! | 0    | Universal  | Success, every row matched                      |
//! | 1    | Universal  | General error (unspecified)                     |
//! | 2    | Universal  | CLI usage error (bad args, bad status name)     |
//! | 3    | extract    | A document could not be read as a table         |
//! | 4    | columns    | Key or quantity column could not be selected    |
//! | 5    | config     | Job file or settings file invalid               |
//! | 6    | compare    | Divergent or missing items found                |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed, no discrepancies.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure (report write, JSON serialization).
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown status name.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Pipeline (3-6)
// =============================================================================

/// Extractor could not produce a table (unsupported, malformed, no table, pdftotext missing).
pub const EXIT_FORMAT_READ: u8 = 3;

/// Override names a column that does not exist, or a table has no columns.
pub const EXIT_COLUMN_SELECTION: u8 = 4;

/// Job TOML or settings file failed to parse or validate.
pub const EXIT_CONFIG: u8 = 5;

/// Comparison ran but found diverged or missing rows.
/// Like `diff(1)`, a non-zero exit means "documents differ."
pub const EXIT_DISCREPANCIES: u8 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_FORMAT_READ,
            EXIT_COLUMN_SELECTION,
            EXIT_CONFIG,
            EXIT_DISCREPANCIES,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
