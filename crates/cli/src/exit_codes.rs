//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Description                                              |
//! |------|----------------------------------------------------------|
//! | 0    | Success (recoverable data warnings do not change it)     |
//! | 1    | General error (unspecified)                              |
//! | 2    | CLI usage error (bad args, missing config file)          |
//! | 3    | Config file does not parse or does not validate          |
//! | 4    | Runtime I/O failure writing an output                    |

/// Success - command completed. Skipped rows and files are reported, not fatal.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing config file.
pub const EXIT_USAGE: u8 = 2;

/// Config parse or validation error.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Cannot write the artifact, Cypher script or report.
pub const EXIT_RUNTIME: u8 = 4;
