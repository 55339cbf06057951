//! CLI Exit Code Registry
//!
//! Single source of truth for `pricecheck` exit codes. Scripts and
//! schedulers branch on these, so a code never changes meaning.
//!
//! | Code | Meaning                                                     |
//! |------|-------------------------------------------------------------|
//! | 0    | Success                                                     |
//! | 1    | `--strict` and at least one actionable table is non-empty   |
//! | 2    | Usage error (bad arguments; clap exits with this itself)    |
//! | 3    | Configuration error (read, parse, validation, missing column) |
//! | 4    | Dataset load error                                          |
//! | 5    | Result save error                                           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant below
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map the error to it in `recon.rs`

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// `--strict` run found items that need attention.
/// Like `diff(1)`, exit 1 means "datasets differ."
pub const EXIT_MISMATCH: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file unreadable, malformed, or invalid; or a required column is
/// absent from an input dataset.
pub const EXIT_CONFIG: u8 = 3;

/// An input dataset could not be read or decoded.
pub const EXIT_LOAD: u8 = 4;

/// A result table could not be written.
pub const EXIT_SAVE: u8 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [EXIT_SUCCESS, EXIT_MISMATCH, EXIT_USAGE, EXIT_CONFIG, EXIT_LOAD, EXIT_SAVE];
        let unique: std::collections::BTreeSet<u8> = codes.iter().copied().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
