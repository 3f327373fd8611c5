//! Build configuration.
//!
//! `BuildConfig` is read from a JSON file. Every field is optional:
//!
//! ```json
//! {
//!   "root": "/work/image",
//!   "extract_command": ["dpkg-deb", "-X", "{archive}", "{dest}"],
//!   "make_program": "make",
//!   "command_timeout_secs": 600,
//!   "record_instructions": true
//! }
//! ```
//!
//! The build root comes from `DEBSTAGE_ROOT` when set, then `root`, then the
//! current directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{DEFAULT_MAKE_PROGRAM, ROOT_ENV_VAR};
use crate::extract::ExtractCommand;
use crate::instructions::{InstructionDb, NullInstructor};
use crate::layout::PathRoots;
use crate::package::BuildContext;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("cannot determine build root: {0}")]
  Root(#[source] std::io::Error),

  #[error("command_timeout_secs must be greater than zero")]
  InvalidTimeout,

  #[error("extract_command must not be empty")]
  EmptyExtractCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
  pub root: Option<PathBuf>,
  pub extract_command: ExtractCommand,
  pub make_program: String,
  pub command_timeout_secs: Option<u64>,
  /// Store handed-off instruction files under the admin directory instead of discarding them.
  pub record_instructions: bool,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      root: None,
      extract_command: ExtractCommand::default(),
      make_program: DEFAULT_MAKE_PROGRAM.to_string(),
      command_timeout_secs: None,
      record_instructions: true,
    }
  }
}

impl BuildConfig {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config: BuildConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = ?path, "loaded build config");
    Ok(config)
  }

  pub fn roots(&self) -> Result<PathRoots, ConfigError> {
    if let Ok(root) = std::env::var(ROOT_ENV_VAR)
      && !root.is_empty()
    {
      return Ok(PathRoots::new(root));
    }
    match &self.root {
      Some(root) => Ok(PathRoots::new(root)),
      None => PathRoots::from_env().map_err(ConfigError::Root),
    }
  }

  pub fn command_timeout(&self) -> Result<Option<Duration>, ConfigError> {
    match self.command_timeout_secs {
      Some(0) => Err(ConfigError::InvalidTimeout),
      Some(secs) => Ok(Some(Duration::from_secs(secs))),
      None => Ok(None),
    }
  }

  /// Validate the configuration and assemble the context stage actions run with.
  pub fn build_context(&self) -> Result<BuildContext, ConfigError> {
    if self.extract_command.0.is_empty() {
      return Err(ConfigError::EmptyExtractCommand);
    }
    let roots = self.roots()?;
    let ctx = BuildContext::new(roots.clone())
      .with_extract_command(self.extract_command.clone())
      .with_make_program(&self.make_program)
      .with_command_timeout(self.command_timeout()?);

    Ok(if self.record_instructions {
      ctx.with_instructor(Arc::new(InstructionDb::for_roots(&roots)))
    } else {
      ctx.with_instructor(Arc::new(NullInstructor))
    })
  }
}
