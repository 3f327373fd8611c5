//! debstage-lib: stage-driven installation of pre-built Debian packages
//!
//! This crate builds the packages of an embedded image tree by unpacking
//! their `.deb` archives instead of compiling them:
//! - `Label`: one package (or checkout) at one build stage
//! - `PackageBuilder`: performs a stage for a package, as a Dev or Runtime target
//! - `RuleSet`: the dependency graph a scheduler walks to order labels
//! - `BuildConfig`: where the tree lives and which external tools to run

pub mod config;
pub mod consts;
pub mod extract;
pub mod instructions;
pub mod label;
pub mod layout;
pub mod package;
pub mod process;
pub mod prune;
pub mod rules;
pub mod util;
