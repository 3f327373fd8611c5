//! Lifecycle integration tests for debstage-lib.

mod common;
mod registrar_tests;
