//! Instruction files and their hand-off.
//!
//! A Runtime package may ship `<name>.instructions.xml` next to its archive in
//! the checkout. It describes ownership and permission changes to apply when
//! the install tree is deployed. The builder does not interpret the
//! instructions: it checks that the file is well-formed XML and hands it to an
//! [`Instructor`], which records it for whoever assembles the final image.
//!
//! # Storage Layout
//!
//! [`InstructionDb`] keeps one file per package and role:
//!
//! ```text
//! <root>/.debstage/instructions/
//! └── <name>/
//!     └── <role>.xml          # `_default.xml` for labels without a role
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::INSTRUCTIONS_SUFFIX;
use crate::layout::PathRoots;

const INSTRUCTIONS_DIR: &str = "instructions";
const DEFAULT_ROLE_FILE: &str = "_default";

#[derive(Debug, Error)]
pub enum InstructionError {
  #[error("failed to read instruction file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("instruction file is empty: {0}")]
  Empty(PathBuf),

  #[error("malformed instruction file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: roxmltree::Error,
  },

  #[error("failed to store instructions for {name}: {source}")]
  Store {
    name: String,
    #[source]
    source: io::Error,
  },
}

/// A parsed instruction file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionFile {
  pub path: PathBuf,
  pub contents: String,
  /// Name of the document's root element.
  pub root: String,
}

impl InstructionFile {
  /// Read and parse `path`. Empty or malformed documents are rejected.
  pub fn load(path: &Path) -> Result<Self, InstructionError> {
    let contents = fs::read_to_string(path).map_err(|source| InstructionError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(path, contents)
  }

  pub fn parse(path: &Path, contents: String) -> Result<Self, InstructionError> {
    if contents.trim().is_empty() {
      return Err(InstructionError::Empty(path.to_path_buf()));
    }
    let root = {
      let doc = roxmltree::Document::parse(&contents).map_err(|source| InstructionError::Parse {
        path: path.to_path_buf(),
        source,
      })?;
      doc.root_element().tag_name().name().to_string()
    };
    Ok(Self {
      path: path.to_path_buf(),
      contents,
      root,
    })
  }
}

/// Locate the instruction file for package `name` in `checkout`.
///
/// `override_file` (relative to the checkout) replaces the default
/// `<name>.instructions.xml`. Returns `None` when the file does not exist.
pub fn discover(checkout: &Path, name: &str, override_file: Option<&Path>) -> Option<PathBuf> {
  let path = match override_file {
    Some(file) => checkout.join(file),
    None => checkout.join(format!("{name}{INSTRUCTIONS_SUFFIX}")),
  };
  if path.is_file() {
    Some(path)
  } else {
    debug!(path = ?path, "no instruction file");
    None
  }
}

/// Receives the instruction file of an installed Runtime package.
pub trait Instructor: fmt::Debug + Send + Sync {
  fn instruct(&self, name: &str, role: Option<&str>, file: InstructionFile) -> Result<(), InstructionError>;
}

/// Discards every instruction file.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullInstructor;

impl Instructor for NullInstructor {
  fn instruct(&self, name: &str, _role: Option<&str>, file: InstructionFile) -> Result<(), InstructionError> {
    debug!(package = name, path = ?file.path, "discarding instructions");
    Ok(())
  }
}

/// Stores instruction files under the build root's admin directory.
#[derive(Debug, Clone)]
pub struct InstructionDb {
  base_path: PathBuf,
}

impl InstructionDb {
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  pub fn for_roots(roots: &PathRoots) -> Self {
    Self::new(roots.admin_dir().join(INSTRUCTIONS_DIR))
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  pub fn instruction_path(&self, name: &str, role: Option<&str>) -> PathBuf {
    self
      .base_path
      .join(name)
      .join(format!("{}.xml", role.unwrap_or(DEFAULT_ROLE_FILE)))
  }

  /// Load the stored instructions for a package, if any.
  pub fn load(&self, name: &str, role: Option<&str>) -> Result<Option<InstructionFile>, InstructionError> {
    let path = self.instruction_path(name, role);
    match fs::metadata(&path) {
      Ok(_) => InstructionFile::load(&path).map(Some),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(InstructionError::Read { path, source }),
    }
  }

  /// Forget the stored instructions for a package. Returns whether any existed.
  pub fn remove(&self, name: &str, role: Option<&str>) -> Result<bool, InstructionError> {
    match fs::remove_file(self.instruction_path(name, role)) {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
      Err(source) => Err(InstructionError::Store {
        name: name.to_string(),
        source,
      }),
    }
  }

  fn store(&self, name: &str, role: Option<&str>, contents: &str) -> io::Result<PathBuf> {
    let path = self.instruction_path(name, role);
    let dir = self.base_path.join(name);
    fs::create_dir_all(&dir)?;

    // Write to a temp file and rename so readers never see a partial file.
    let temp_path = dir.join(format!("{}.xml.tmp", role.unwrap_or(DEFAULT_ROLE_FILE)));
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, &path)?;
    Ok(path)
  }
}

impl Instructor for InstructionDb {
  fn instruct(&self, name: &str, role: Option<&str>, file: InstructionFile) -> Result<(), InstructionError> {
    let stored = self
      .store(name, role, &file.contents)
      .map_err(|source| InstructionError::Store {
        name: name.to_string(),
        source,
      })?;
    info!(package = name, role = ?role, from = ?file.path, to = ?stored, "recorded instructions");
    Ok(())
  }
}
