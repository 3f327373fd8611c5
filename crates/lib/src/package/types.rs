use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::DEFAULT_MAKE_PROGRAM;
use crate::extract::{ExtractCommand, ExtractError};
use crate::instructions::{InstructionError, Instructor, NullInstructor};
use crate::label::Tag;
use crate::layout::PathRoots;
use crate::process::ProcessError;
use crate::prune::PruneError;

/// Which tree an installed package lands in.
///
/// Dev packages (headers and libraries other packages build against) stay in
/// their object directory. Runtime packages are also unpacked into the install
/// tree and may carry instructions for the image assembler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
  Dev,
  #[default]
  Runtime,
}

impl TargetKind {
  /// Whether the Installed stage extracts into the install tree.
  pub fn writes_install(self) -> bool {
    matches!(self, TargetKind::Runtime)
  }

  /// Whether the Installed stage looks for an instruction file.
  pub fn applies_instructions(self) -> bool {
    matches!(self, TargetKind::Runtime)
  }
}

/// Everything needed to build one package from a pre-built archive.
///
/// Relative paths (`archive`, `instructions_file`, `postinstall_makefile`)
/// are resolved against the checkout directory. Without an explicit archive
/// the file is named after `deb_name`, which in turn defaults to `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
  pub name: String,
  pub checkout: String,
  /// Name the package is declared under in Debian, when it differs from `name`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deb_name: Option<String>,
  /// Archive file name, e.g. `util-linux_2.38_amd64.deb`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub archive: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instructions_file: Option<PathBuf>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub postinstall_makefile: Option<PathBuf>,
  #[serde(default)]
  pub kind: TargetKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub domain: Option<String>,
  /// Archive-absolute subtrees dropped before writing the install tree.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub prune_targets: Vec<String>,
}

impl PackageDescriptor {
  pub fn new(name: &str, checkout: &str) -> Self {
    Self {
      name: name.to_string(),
      checkout: checkout.to_string(),
      deb_name: None,
      archive: None,
      instructions_file: None,
      postinstall_makefile: None,
      kind: TargetKind::default(),
      domain: None,
      prune_targets: Vec::new(),
    }
  }

  pub fn with_deb_name(mut self, deb_name: &str) -> Self {
    self.deb_name = Some(deb_name.to_string());
    self
  }

  pub fn with_archive(mut self, archive: &str) -> Self {
    self.archive = Some(archive.to_string());
    self
  }

  /// Debian package name: `deb_name`, else `name`.
  pub fn deb_name(&self) -> &str {
    self.deb_name.as_deref().unwrap_or(&self.name)
  }

  /// Archive file in the checkout: `archive`, else [`Self::deb_name`].
  pub fn archive_file(&self) -> &str {
    self.archive.as_deref().unwrap_or_else(|| self.deb_name())
  }

  pub fn with_kind(mut self, kind: TargetKind) -> Self {
    self.kind = kind;
    self
  }

  pub fn with_instructions_file(mut self, file: impl Into<PathBuf>) -> Self {
    self.instructions_file = Some(file.into());
    self
  }

  pub fn with_postinstall_makefile(mut self, makefile: impl Into<PathBuf>) -> Self {
    self.postinstall_makefile = Some(makefile.into());
    self
  }

  pub fn with_domain(mut self, domain: &str) -> Self {
    self.domain = Some(domain.to_string());
    self
  }

  pub fn with_prune_targets<I, S>(mut self, targets: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.prune_targets = targets.into_iter().map(Into::into).collect();
    self
  }
}

/// Shared settings and collaborators for every stage action.
#[derive(Debug, Clone)]
pub struct BuildContext {
  pub roots: PathRoots,
  pub extract: ExtractCommand,
  pub make_program: String,
  /// Limit for each external command; `None` waits indefinitely.
  pub command_timeout: Option<Duration>,
  pub instructor: Arc<dyn Instructor>,
}

impl BuildContext {
  pub fn new(roots: PathRoots) -> Self {
    Self {
      roots,
      extract: ExtractCommand::default(),
      make_program: DEFAULT_MAKE_PROGRAM.to_string(),
      command_timeout: None,
      instructor: Arc::new(NullInstructor),
    }
  }

  pub fn with_extract_command(mut self, extract: ExtractCommand) -> Self {
    self.extract = extract;
    self
  }

  pub fn with_make_program(mut self, program: &str) -> Self {
    self.make_program = program.to_string();
    self
  }

  pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.command_timeout = timeout;
    self
  }

  pub fn with_instructor(mut self, instructor: Arc<dyn Instructor>) -> Self {
    self.instructor = instructor;
    self
  }
}

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("checkout for {label} does not exist: {path}")]
  CheckoutMissing { label: String, path: PathBuf },

  #[error("package builder cannot handle {label} (tag {tag})")]
  InvalidTag { label: String, tag: Tag },

  #[error("failed to create {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to remove {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Extract(#[from] ExtractError),

  #[error(transparent)]
  Prune(#[from] PruneError),

  #[error(transparent)]
  Instructions(#[from] InstructionError),

  #[error("post-install failed: {0}")]
  Process(#[from] ProcessError),
}
