//! Standard exit codes for CLI operations
//!
//! These follow Unix conventions and sysexits.h where applicable. The
//! distinguished restart code the server exits with after an upgrade lives
//! in `depot_server::RESTART_EXIT_CODE`.

#![allow(dead_code)]

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
