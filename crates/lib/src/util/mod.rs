//! Shared utilities.
//!
//! Filesystem helpers used by extraction and pruning, plus test helpers.

pub mod fs;
