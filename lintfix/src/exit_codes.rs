//! Stable exit codes for lintfix CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed (invalid config, unreadable document, tool or model failure).
pub const FAILED: i32 = 1;
/// `lintfix fix` was run without a document to repair.
pub const NO_TARGET: i32 = 2;
