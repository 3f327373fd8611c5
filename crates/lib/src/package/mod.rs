//! Package builds from pre-built archives.
//!
//! A [`PackageBuilder`] is the rule attached to every stage label of one
//! package in one role. The scheduler calls
//! [`build_label`](PackageBuilder::build_label) when a label is due; the
//! builder resolves the label's directories and performs that stage.
//!
//! # Submodules
//!
//! - [`execute`] - Stage dispatch and actions

pub mod execute;
mod types;

pub use execute::PackageBuilder;
pub use types::*;
