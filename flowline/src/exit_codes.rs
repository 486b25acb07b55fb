//! Stable exit codes for flowline CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid manifest, config or arguments.
pub const INVALID: i32 = 1;
/// `flowline resolve` found no route for the path.
pub const NOT_FOUND: i32 = 2;
