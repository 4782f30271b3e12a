//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract - scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                                 |
//! |---------|------------------|---------------------------------------------|
//! | 0       | Universal        | Success                                     |
//! | 1       | Universal        | General error (unspecified)                 |
//! | 2       | Universal        | CLI usage error (bad args, missing file)    |
//! | 3-9     | Universal        | I/O, settings, permission                   |
//! | 10-19   | compare / qc     | Load failures, QC verdicts                  |
//! | 20-29   | checklist        | Store integrity, schema, migration          |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use paramgrid_io::StoreError;

// =============================================================================
// Universal (0-9)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// File could not be read or written.
pub const EXIT_IO: u8 = 3;

/// Settings file could not be parsed or failed validation.
pub const EXIT_CONFIG: u8 = 4;

/// The session role lacks the capability the command needs.
pub const EXIT_PERMISSION: u8 = 5;

// =============================================================================
// Compare / QC (10-19)
// =============================================================================

/// QC verdict is FAIL.
pub const EXIT_QC_FAILED: u8 = 10;

/// One or more sources failed to load (compare/candidates with --strict;
/// qc when no loaded source failed).
pub const EXIT_SOURCE_LOAD: u8 = 11;

// =============================================================================
// Checklist (20-29)
// =============================================================================

/// An active checklist item with the same (module, part, item) exists.
pub const EXIT_CHECKLIST_INTEGRITY: u8 = 20;

/// Checklist database is at the wrong schema version for this command.
pub const EXIT_CHECKLIST_SCHEMA: u8 = 21;

/// Migration verification failed; the database was left unchanged.
pub const EXIT_CHECKLIST_MIGRATION: u8 = 22;

/// Rollback requested but no snapshot is available.
pub const EXIT_CHECKLIST_NO_SNAPSHOT: u8 = 23;

/// Map a StoreError to its exit code.
pub fn store_exit_code(err: &StoreError) -> u8 {
    match err {
        StoreError::Integrity { .. } => EXIT_CHECKLIST_INTEGRITY,
        StoreError::SchemaVersion { .. } => EXIT_CHECKLIST_SCHEMA,
        StoreError::Verification(_) => EXIT_CHECKLIST_MIGRATION,
        StoreError::NoSnapshot => EXIT_CHECKLIST_NO_SNAPSHOT,
        StoreError::Import(_) => EXIT_IO,
        StoreError::Sqlite(_) => EXIT_ERROR,
    }
}
