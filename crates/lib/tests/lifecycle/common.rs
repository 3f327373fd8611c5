//! Shared helpers for lifecycle integration tests.
//!
//! Archives are faked as directories under the checkout and "extracted" with
//! `cp -R`, so the tests need no `dpkg-deb`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use debstage_lib::extract::ExtractCommand;
use debstage_lib::instructions::{InstructionError, InstructionFile, Instructor};
use debstage_lib::label::{Label, Tag};
use debstage_lib::layout::{DirectoryLayout, PathRoots};
use debstage_lib::package::{BuildContext, PackageBuilder, PackageDescriptor, TargetKind};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const CHECKOUT: &str = "debs";
pub const ROLE: &str = "base";

/// Contents of a typical runtime package with headers and libraries.
pub const UTIL_LINUX_FILES: &[(&str, &str)] = &[
  ("usr/bin/mount", "mount-elf"),
  ("usr/include/libmount/libmount.h", "struct libmnt_fs;"),
  ("usr/lib/libmount.so.1", "libmount-elf"),
  ("usr/share/doc/util-linux/copyright", "GPL-2.0"),
  ("usr/share/man/man8/mount.8.gz", "manpage"),
];

/// Isolated build tree.
pub struct TestTree {
  pub temp: TempDir,
  pub roots: PathRoots,
}

impl TestTree {
  /// Tree with an existing, empty checkout.
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let roots = PathRoots::new(temp.path());
    std::fs::create_dir_all(roots.checkout_path(CHECKOUT, None)).unwrap();
    Self { temp, roots }
  }

  /// Tree without any checkout.
  pub fn without_checkout() -> Self {
    let temp = TempDir::new().unwrap();
    let roots = PathRoots::new(temp.path());
    Self { temp, roots }
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn checkout(&self) -> PathBuf {
    self.roots.checkout_path(CHECKOUT, None)
  }

  /// Write a file relative to the checkout.
  pub fn write_checkout_file(&self, relative_path: &str, content: &str) {
    write_file(&self.checkout(), relative_path, content);
  }

  /// Create a fake archive in the checkout.
  pub fn add_archive(&self, archive: &str, files: &[(&str, &str)]) {
    let dir = self.checkout().join(archive);
    std::fs::create_dir_all(&dir).unwrap();
    for (path, content) in files {
      write_file(&dir, path, content);
    }
  }

  /// Context that extracts fake archives by copying them.
  pub fn context(&self) -> BuildContext {
    BuildContext::new(self.roots.clone()).with_extract_command(copy_extract_command())
  }

  pub fn layout(&self, name: &str) -> DirectoryLayout {
    self.roots.layout(CHECKOUT, &Label::package(name, ROLE, Tag::Installed))
  }

  pub fn listing(&self, path: &Path) -> Vec<(String, String)> {
    tree_listing(path)
  }

  /// Every path below the root, for "nothing else was written" checks.
  pub fn all_paths(&self) -> Vec<String> {
    tree_listing(self.root()).into_iter().map(|(path, _)| path).collect()
  }
}

pub fn descriptor(name: &str, archive: &str, kind: TargetKind) -> PackageDescriptor {
  PackageDescriptor::new(name, CHECKOUT).with_archive(archive).with_kind(kind)
}

pub fn builder(name: &str, archive: &str, kind: TargetKind) -> PackageBuilder {
  PackageBuilder::new(descriptor(name, archive, kind))
}

pub fn label(name: &str, tag: Tag) -> Label {
  Label::package(name, ROLE, tag)
}

pub fn copy_extract_command() -> ExtractCommand {
  ExtractCommand::new(["cp", "-R", "{archive}/.", "{dest}"])
}

/// Copying extract command that also appends each destination to `log`.
pub fn logging_extract_command(log: &Path) -> ExtractCommand {
  let script = format!("cp -R \"$1\"/. \"$2\" && echo \"$2\" >> '{}'", log.display());
  ExtractCommand::new([
    "sh".to_string(),
    "-c".to_string(),
    script,
    "sh".to_string(),
    "{archive}".to_string(),
    "{dest}".to_string(),
  ])
}

/// Extract command that writes part of the tree and then fails.
pub fn failing_extract_command() -> ExtractCommand {
  ExtractCommand::new([
    "sh",
    "-c",
    "mkdir -p \"$2/usr/bin\" && echo half > \"$2/usr/bin/partial\" && echo 'truncated archive' >&2 && exit 2",
    "sh",
    "{archive}",
    "{dest}",
  ])
}

pub fn read_lines(path: &Path) -> Vec<String> {
  std::fs::read_to_string(path)
    .unwrap_or_default()
    .lines()
    .map(str::to_string)
    .collect()
}

pub fn write_file(root: &Path, relative_path: &str, content: &str) {
  let path = root.join(relative_path);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, content).unwrap();
}

/// Sorted `(path, content)` pairs below `root`; empty when `root` is missing.
pub fn tree_listing(root: &Path) -> Vec<(String, String)> {
  let mut entries = Vec::new();
  if !root.exists() {
    return entries;
  }
  for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
    let entry = entry.unwrap();
    let rel = entry.path().strip_prefix(root).unwrap().to_string_lossy().to_string();
    if entry.file_type().is_dir() {
      entries.push((format!("{rel}/"), String::new()));
    } else {
      entries.push((rel, std::fs::read_to_string(entry.path()).unwrap_or_default()));
    }
  }
  entries
}

/// Instructor that remembers every hand-off.
#[derive(Debug, Default)]
pub struct RecordingInstructor {
  calls: Mutex<Vec<(String, Option<String>, InstructionFile)>>,
}

impl RecordingInstructor {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn calls(&self) -> Vec<(String, Option<String>, InstructionFile)> {
    self.calls.lock().unwrap().clone()
  }
}

impl Instructor for RecordingInstructor {
  fn instruct(&self, name: &str, role: Option<&str>, file: InstructionFile) -> Result<(), InstructionError> {
    self
      .calls
      .lock()
      .unwrap()
      .push((name.to_string(), role.map(str::to_string), file));
    Ok(())
  }
}
