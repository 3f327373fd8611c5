//! Pruning of extracted archive trees.
//!
//! Debian archives carry documentation and manual pages that an embedded
//! image rarely wants. [`prune`] removes a set of subtrees from a
//! [`Hierarchy`] before it is installed. Targets are archive-absolute paths
//! such as `/usr/share/doc`. Erasing a target that is absent is a no-op, so
//! pruning is idempotent and order-independent.

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::consts::DEFAULT_PRUNE_TARGETS;
use crate::util::fs::replace_non_dir;

#[derive(Debug, Error)]
pub enum PruneError {
  #[error("invalid prune target '{0}': must be an absolute path below the archive root")]
  InvalidTarget(String),

  #[error("io error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

impl PruneError {
  fn io(path: &Path) -> impl FnOnce(io::Error) -> PruneError + '_ {
    move |source| PruneError::Io {
      path: path.to_path_buf(),
      source,
    }
  }
}

/// A tree of archive entries that subtrees can be erased from.
pub trait Hierarchy {
  /// Erase `target` and everything below it. Returns whether anything was removed.
  fn erase_target(&mut self, target: &str) -> Result<bool, PruneError>;
}

/// Turn `/usr/share/doc` into `usr/share/doc`, rejecting the root itself and
/// anything that could escape it.
fn target_relative_path(target: &str) -> Result<PathBuf, PruneError> {
  let invalid = || PruneError::InvalidTarget(target.to_string());
  let path = Path::new(target);
  if !path.is_absolute() {
    return Err(invalid());
  }

  let mut rel = PathBuf::new();
  for component in path.components() {
    match component {
      Component::RootDir | Component::CurDir => {}
      Component::Normal(part) => rel.push(part),
      Component::ParentDir | Component::Prefix(_) => return Err(invalid()),
    }
  }

  if rel.as_os_str().is_empty() {
    return Err(invalid());
  }
  Ok(rel)
}

/// Erase every target from `hierarchy`. Returns how many targets were present.
pub fn prune<H, S>(hierarchy: &mut H, targets: &[S]) -> Result<usize, PruneError>
where
  H: Hierarchy + ?Sized,
  S: AsRef<str>,
{
  let mut erased = 0;
  for target in targets {
    if hierarchy.erase_target(target.as_ref())? {
      debug!(target = target.as_ref(), "pruned subtree");
      erased += 1;
    }
  }
  Ok(erased)
}

/// Prune documentation and manual pages.
pub fn prune_docs<H: Hierarchy + ?Sized>(hierarchy: &mut H) -> Result<usize, PruneError> {
  prune(hierarchy, DEFAULT_PRUNE_TARGETS)
}

/// An extracted tree on disk.
#[derive(Debug, Clone)]
pub struct DiskHierarchy {
  root: PathBuf,
}

impl DiskHierarchy {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}

impl Hierarchy for DiskHierarchy {
  fn erase_target(&mut self, target: &str) -> Result<bool, PruneError> {
    let path = self.root.join(target_relative_path(target)?);
    match path.symlink_metadata() {
      Ok(_) => {
        replace_non_dir(&path).map_err(PruneError::io(&path))?;
        Ok(true)
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(PruneError::io(&path)(e)),
    }
  }
}

/// One entry of a [`MemHierarchy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemNode {
  Dir,
  /// File whose content is read from `source` when materialized.
  File { source: PathBuf },
  Symlink { target: PathBuf },
}

/// An in-memory archive hierarchy keyed by archive-relative path.
///
/// Nothing touches the destination until [`materialize`](Self::materialize),
/// so erased subtrees are never written.
#[derive(Debug, Clone, Default)]
pub struct MemHierarchy {
  entries: BTreeMap<PathBuf, MemNode>,
}

impl MemHierarchy {
  pub fn new() -> Self {
    Self::default()
  }

  /// Index every entry below `root`.
  pub fn from_dir(root: &Path) -> Result<Self, PruneError> {
    let mut hierarchy = Self::new();
    for entry in WalkDir::new(root).min_depth(1) {
      let entry = entry.map_err(|e| PruneError::io(root)(io::Error::from(e)))?;
      let rel = entry
        .path()
        .strip_prefix(root)
        .map_err(|e| PruneError::io(root)(io::Error::other(e)))?
        .to_path_buf();
      let file_type = entry.file_type();
      let node = if file_type.is_dir() {
        MemNode::Dir
      } else if file_type.is_symlink() {
        let target = std::fs::read_link(entry.path()).map_err(PruneError::io(entry.path()))?;
        MemNode::Symlink { target }
      } else {
        MemNode::File {
          source: entry.path().to_path_buf(),
        }
      };
      hierarchy.entries.insert(rel, node);
    }
    Ok(hierarchy)
  }

  /// Add an entry at an archive-absolute path.
  pub fn insert(&mut self, path: &str, node: MemNode) -> Result<(), PruneError> {
    self.entries.insert(target_relative_path(path)?, node);
    Ok(())
  }

  pub fn contains(&self, path: &str) -> bool {
    target_relative_path(path).is_ok_and(|rel| self.entries.contains_key(&rel))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn paths(&self) -> impl Iterator<Item = &Path> {
    self.entries.keys().map(PathBuf::as_path)
  }

  /// Write every remaining entry below `dest`, overwriting what is there.
  pub fn materialize(&self, dest: &Path) -> Result<(), PruneError> {
    std::fs::create_dir_all(dest).map_err(PruneError::io(dest))?;

    // BTreeMap order puts every directory before its children.
    for (rel, node) in &self.entries {
      let path = dest.join(rel);
      if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(PruneError::io(parent))?;
      }
      match node {
        MemNode::Dir => {
          if path.symlink_metadata().is_ok_and(|m| !m.is_dir()) {
            replace_non_dir(&path).map_err(PruneError::io(&path))?;
          }
          std::fs::create_dir_all(&path).map_err(PruneError::io(&path))?;
        }
        MemNode::File { source } => {
          replace_non_dir(&path).map_err(PruneError::io(&path))?;
          std::fs::copy(source, &path).map_err(PruneError::io(source))?;
        }
        MemNode::Symlink { target } => {
          replace_non_dir(&path).map_err(PruneError::io(&path))?;
          write_symlink(target, &path).map_err(PruneError::io(&path))?;
        }
      }
    }
    Ok(())
  }
}

#[cfg(unix)]
fn write_symlink(target: &Path, path: &Path) -> io::Result<()> {
  std::os::unix::fs::symlink(target, path)
}

#[cfg(not(unix))]
fn write_symlink(target: &Path, path: &Path) -> io::Result<()> {
  let resolved = path.parent().map(|p| p.join(target)).unwrap_or_else(|| target.to_path_buf());
  std::fs::copy(resolved, path).map(|_| ())
}

impl Hierarchy for MemHierarchy {
  fn erase_target(&mut self, target: &str) -> Result<bool, PruneError> {
    let rel = target_relative_path(target)?;
    let before = self.entries.len();
    self.entries.retain(|path, _| !path.starts_with(&rel));
    Ok(self.entries.len() != before)
  }
}
