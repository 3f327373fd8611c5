//! Filesystem tree helpers.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

/// Recursively copy the contents of `src` into `dst`.
///
/// `dst` is created if needed. Existing files are overwritten, so copying the
/// same tree twice leaves the same result as copying it once. Symlinks are
/// recreated as symlinks on Unix and copied as files elsewhere.
///
/// Returns the number of entries (files, directories, links) written.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<usize> {
  fs::create_dir_all(dst)?;
  let mut written = 0;

  for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
    let entry = entry.map_err(io::Error::from)?;
    let rel = entry.path().strip_prefix(src).map_err(io::Error::other)?;
    let target = dst.join(rel);
    let file_type = entry.file_type();

    if file_type.is_dir() {
      if target.symlink_metadata().is_ok_and(|m| !m.is_dir()) {
        fs::remove_file(&target)?;
      }
      fs::create_dir_all(&target)?;
    } else if file_type.is_symlink() {
      replace_non_dir(&target)?;
      copy_symlink(entry.path(), &target)?;
    } else {
      replace_non_dir(&target)?;
      fs::copy(entry.path(), &target)?;
    }
    written += 1;
  }

  Ok(written)
}

/// Remove whatever is at `path`, directory or not. A missing path is fine.
pub fn replace_non_dir(path: &Path) -> io::Result<()> {
  match path.symlink_metadata() {
    Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
    Ok(_) => fs::remove_file(path),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e),
  }
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
  let points_to = fs::read_link(link)?;
  std::os::unix::fs::symlink(points_to, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
  fs::copy(link, target).map(|_| ())
}
