//! Archive extraction.
//!
//! Packages are "built" by unpacking a pre-built archive with an external
//! tool. The tool is described by an [`ExtractCommand`], an argument-vector
//! template in which `{archive}` and `{dest}` are substituted per argument.
//! The default is `dpkg-deb -X {archive} {dest}`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::DEFAULT_EXTRACT_COMMAND;
use crate::layout::DirectoryLayout;
use crate::process::{CommandSpec, ProcessError, run_command};
use crate::util::fs::copy_tree;

pub const ARCHIVE_TOKEN: &str = "{archive}";
pub const DEST_TOKEN: &str = "{dest}";

#[derive(Debug, Error)]
pub enum ExtractError {
  #[error("extract command is empty")]
  EmptyCommand,

  #[error("archive not found: {0}")]
  ArchiveMissing(PathBuf),

  #[error("extraction failed: {0}")]
  Command(#[from] ProcessError),

  #[error("failed to create {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to copy {from} to {to}: {source}")]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Argument-vector template for the archive extraction tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractCommand(pub Vec<String>);

impl Default for ExtractCommand {
  fn default() -> Self {
    Self(DEFAULT_EXTRACT_COMMAND.iter().map(|s| s.to_string()).collect())
  }
}

impl ExtractCommand {
  pub fn new<I, S>(argv: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self(argv.into_iter().map(Into::into).collect())
  }

  /// Instantiate the template for one archive and destination.
  pub fn command_for(&self, archive: &Path, dest: &Path) -> Result<CommandSpec, ExtractError> {
    let (program, args) = self.0.split_first().ok_or(ExtractError::EmptyCommand)?;
    Ok(
      CommandSpec::new(substitute(program, archive, dest))
        .args(args.iter().map(|arg| substitute(arg, archive, dest))),
    )
  }
}

fn substitute(arg: &str, archive: &Path, dest: &Path) -> OsString {
  // Whole-argument tokens keep non-UTF-8 paths intact.
  match arg {
    ARCHIVE_TOKEN => archive.as_os_str().to_os_string(),
    DEST_TOKEN => dest.as_os_str().to_os_string(),
    _ => OsString::from(
      arg
        .replace(ARCHIVE_TOKEN, &archive.to_string_lossy())
        .replace(DEST_TOKEN, &dest.to_string_lossy()),
    ),
  }
}

/// Extract `archive` into `dest`, creating `dest` if needed.
///
/// A non-zero exit from the tool is returned as [`ExtractError::Command`].
/// Whatever the tool wrote before failing stays in `dest`.
pub async fn extract(
  command: &ExtractCommand,
  archive: &Path,
  dest: &Path,
  timeout: Option<Duration>,
) -> Result<(), ExtractError> {
  if !archive.exists() {
    return Err(ExtractError::ArchiveMissing(archive.to_path_buf()));
  }
  tokio::fs::create_dir_all(dest)
    .await
    .map_err(|source| ExtractError::CreateDir {
      path: dest.to_path_buf(),
      source,
    })?;

  info!(archive = ?archive, dest = ?dest, "extracting archive");
  run_command(&command.command_for(archive, dest)?, timeout).await?;
  Ok(())
}

/// Which subtrees [`split_include_lib`] found and copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitResult {
  pub include: bool,
  pub lib: bool,
}

/// Copy `usr/include` and `usr/lib` out of an extracted tree.
///
/// Both destinations are created. A missing source subtree is skipped.
pub fn split_include_lib(source_root: &Path, inc_dest: &Path, lib_dest: &Path) -> Result<SplitResult, ExtractError> {
  let usr = source_root.join("usr");
  Ok(SplitResult {
    include: copy_subtree(&usr.join("include"), inc_dest)?,
    lib: copy_subtree(&usr.join("lib"), lib_dest)?,
  })
}

fn copy_subtree(from: &Path, to: &Path) -> Result<bool, ExtractError> {
  std::fs::create_dir_all(to).map_err(|source| ExtractError::CreateDir {
    path: to.to_path_buf(),
    source,
  })?;

  if !from.is_dir() {
    debug!(path = ?from, "subtree absent, skipping copy");
    return Ok(false);
  }

  let written = copy_tree(from, to).map_err(|source| ExtractError::Copy {
    from: from.to_path_buf(),
    to: to.to_path_buf(),
    source,
  })?;
  debug!(from = ?from, to = ?to, entries = written, "copied subtree");
  Ok(true)
}

/// Extract into `<object>/obj` and split headers and libraries into
/// `<object>/include` and `<object>/lib` so dependents can build against them.
pub async fn extract_into_obj(
  command: &ExtractCommand,
  archive: &Path,
  layout: &DirectoryLayout,
  timeout: Option<Duration>,
) -> Result<SplitResult, ExtractError> {
  let extracted = layout.object_extract_dir();
  extract(command, archive, &extracted, timeout).await?;
  split_include_lib(&extracted, &layout.object_include_dir(), &layout.object_lib_dir())
}
