//! Directory layout resolution.
//!
//! Every path the package builder touches is derived here from a build root
//! and a label. Nothing is created or checked; see
//! [`PackageBuilder`](crate::package::PackageBuilder) for that.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── src/<checkout>/                 # checkouts (contain the .deb archives)
//! ├── obj/<name>/<role>/              # object directory per package and role
//! │   ├── obj/                        # raw extraction
//! │   ├── include/                    # copied from obj/usr/include
//! │   └── lib/                        # copied from obj/usr/lib
//! ├── install/<role>/                 # staging tree destined for the image
//! ├── domains/<domain>/...            # the same layout, one per subdomain
//! └── .debstage/                      # administrative state
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{ADMIN_DIR, ROOT_ENV_VAR};
use crate::label::Label;

/// Role directory used for labels that carry no role.
const DEFAULT_ROLE_DIR: &str = "_default";

/// The three path roots for one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLayout {
  pub checkout: PathBuf,
  pub object: PathBuf,
  pub install: PathBuf,
}

impl DirectoryLayout {
  /// Raw extraction directory inside the object directory.
  pub fn object_extract_dir(&self) -> PathBuf {
    self.object.join("obj")
  }

  pub fn object_include_dir(&self) -> PathBuf {
    self.object.join("include")
  }

  pub fn object_lib_dir(&self) -> PathBuf {
    self.object.join("lib")
  }
}

/// Path-root configuration for a build tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRoots {
  pub root: PathBuf,
}

impl PathRoots {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Build root from `DEBSTAGE_ROOT`, falling back to the current directory.
  pub fn from_env() -> std::io::Result<Self> {
    match std::env::var(ROOT_ENV_VAR) {
      Ok(root) if !root.is_empty() => Ok(Self::new(root)),
      _ => Ok(Self::new(std::env::current_dir()?)),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn admin_dir(&self) -> PathBuf {
    self.root.join(ADMIN_DIR)
  }

  /// Root of a domain's tree, or the build root without one.
  pub fn domain_root(&self, domain: Option<&str>) -> PathBuf {
    match domain {
      Some(domain) => self.root.join("domains").join(domain),
      None => self.root.clone(),
    }
  }

  pub fn checkout_path(&self, checkout: &str, domain: Option<&str>) -> PathBuf {
    self.domain_root(domain).join("src").join(checkout)
  }

  pub fn package_obj_path(&self, name: &str, role: Option<&str>, domain: Option<&str>) -> PathBuf {
    self
      .domain_root(domain)
      .join("obj")
      .join(name)
      .join(role.unwrap_or(DEFAULT_ROLE_DIR))
  }

  pub fn package_install_path(&self, role: Option<&str>, domain: Option<&str>) -> PathBuf {
    self
      .domain_root(domain)
      .join("install")
      .join(role.unwrap_or(DEFAULT_ROLE_DIR))
  }

  /// Resolve all three paths for a package label whose archive lives in `checkout`.
  pub fn layout(&self, checkout: &str, label: &Label) -> DirectoryLayout {
    DirectoryLayout {
      checkout: self.checkout_path(checkout, label.domain()),
      object: self.package_obj_path(&label.name, label.role(), label.domain()),
      install: self.package_install_path(label.role(), label.domain()),
    }
  }
}
