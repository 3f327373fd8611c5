//! Stage dispatch for a single package label.

use std::io;
use std::path::Path;

use tracing::{debug, info};

use crate::consts::POSTINSTALL_TARGET_SUFFIX;
use crate::extract::{extract, extract_into_obj};
use crate::instructions::{InstructionFile, discover};
use crate::label::{Label, LabelKind, Tag};
use crate::layout::{DirectoryLayout, PathRoots};
use crate::process::{CommandSpec, run_command};
use crate::prune::{MemHierarchy, prune};

use super::types::{BuildContext, BuildError, PackageDescriptor, TargetKind};

/// Prefix of the staging directory used while pruning an install extraction.
const INSTALL_STAGING_PREFIX: &str = ".install-staging-";

/// What a stage tag asks of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageAction {
  Nothing,
  Install,
  PostInstall,
  Clean,
}

impl StageAction {
  fn for_tag(tag: Tag) -> Option<Self> {
    match tag {
      Tag::PreConfig | Tag::Configured | Tag::Built => Some(StageAction::Nothing),
      Tag::Installed => Some(StageAction::Install),
      Tag::PostInstalled => Some(StageAction::PostInstall),
      Tag::Clean | Tag::DistClean => Some(StageAction::Clean),
      Tag::CheckedOut | Tag::Deployed => None,
    }
  }
}

/// Builds one package by extracting its archive.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
  descriptor: PackageDescriptor,
  kind: TargetKind,
}

impl PackageBuilder {
  /// Builder for the descriptor's own target kind.
  pub fn new(descriptor: PackageDescriptor) -> Self {
    let kind = descriptor.kind;
    Self { descriptor, kind }
  }

  pub fn with_kind(descriptor: PackageDescriptor, kind: TargetKind) -> Self {
    Self { descriptor, kind }
  }

  pub fn descriptor(&self) -> &PackageDescriptor {
    &self.descriptor
  }

  pub fn kind(&self) -> TargetKind {
    self.kind
  }

  pub fn layout(&self, roots: &PathRoots, label: &Label) -> DirectoryLayout {
    roots.layout(&self.descriptor.checkout, label)
  }

  /// Bring `label` to its stage.
  ///
  /// The checkout must exist before anything else is checked or touched. A
  /// failing external command leaves whatever it already wrote in place.
  pub async fn build_label(&self, ctx: &BuildContext, label: &Label) -> Result<(), BuildError> {
    let layout = self.layout(&ctx.roots, label);
    if !layout.checkout.is_dir() {
      return Err(BuildError::CheckoutMissing {
        label: label.to_string(),
        path: layout.checkout,
      });
    }

    let invalid = || BuildError::InvalidTag {
      label: label.to_string(),
      tag: label.tag,
    };
    if label.kind != LabelKind::Package {
      return Err(invalid());
    }
    let action = StageAction::for_tag(label.tag).ok_or_else(invalid)?;

    info!(label = %label, kind = ?self.kind, "building label");
    self.ensure_dirs(&layout).await?;

    match action {
      StageAction::Nothing => {
        debug!(label = %label, "nothing to do");
        Ok(())
      }
      StageAction::Install => self.install(ctx, label, &layout).await,
      StageAction::PostInstall => self.post_install(ctx, label, &layout).await,
      StageAction::Clean => self.clean(&layout).await,
    }
  }

  async fn ensure_dirs(&self, layout: &DirectoryLayout) -> Result<(), BuildError> {
    let dirs = if self.kind.writes_install() {
      vec![layout.object.clone(), layout.install.clone()]
    } else {
      vec![layout.object_extract_dir()]
    };
    for dir in dirs {
      tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|source| BuildError::CreateDir { path: dir, source })?;
    }
    Ok(())
  }

  async fn install(&self, ctx: &BuildContext, label: &Label, layout: &DirectoryLayout) -> Result<(), BuildError> {
    let archive = layout.checkout.join(self.descriptor.archive_file());

    let split = extract_into_obj(&ctx.extract, &archive, layout, ctx.command_timeout).await?;
    debug!(include = split.include, lib = split.lib, "split object tree");

    if self.kind.writes_install() {
      self.install_runtime(ctx, &archive, layout).await?;
    }
    if self.kind.applies_instructions() {
      self.hand_off_instructions(ctx, label, layout)?;
    }
    Ok(())
  }

  async fn install_runtime(
    &self,
    ctx: &BuildContext,
    archive: &Path,
    layout: &DirectoryLayout,
  ) -> Result<(), BuildError> {
    let targets = &self.descriptor.prune_targets;
    if targets.is_empty() {
      extract(&ctx.extract, archive, &layout.install, ctx.command_timeout).await?;
      return Ok(());
    }

    // Staging lives inside the object directory and is removed on drop.
    let staging = tempfile::Builder::new()
      .prefix(INSTALL_STAGING_PREFIX)
      .tempdir_in(&layout.object)
      .map_err(|source| BuildError::CreateDir {
        path: layout.object.clone(),
        source,
      })?;
    extract(&ctx.extract, archive, staging.path(), ctx.command_timeout).await?;

    let mut tree = MemHierarchy::from_dir(staging.path())?;
    let pruned = prune(&mut tree, targets.as_slice())?;
    debug!(pruned, remaining = tree.len(), "pruned install tree");
    tree.materialize(&layout.install)?;
    Ok(())
  }

  fn hand_off_instructions(&self, ctx: &BuildContext, label: &Label, layout: &DirectoryLayout) -> Result<(), BuildError> {
    let Some(path) = discover(
      &layout.checkout,
      &label.name,
      self.descriptor.instructions_file.as_deref(),
    ) else {
      return Ok(());
    };

    let file = InstructionFile::load(&path)?;
    info!(label = %label, path = ?path, "handing off instructions");
    ctx.instructor.instruct(&label.name, label.role(), file)?;
    Ok(())
  }

  async fn post_install(&self, ctx: &BuildContext, label: &Label, layout: &DirectoryLayout) -> Result<(), BuildError> {
    let Some(makefile) = &self.descriptor.postinstall_makefile else {
      debug!(label = %label, "no post-install makefile");
      return Ok(());
    };

    let target = format!("{}{}", label.name, POSTINSTALL_TARGET_SUFFIX);
    let spec = CommandSpec::new(&ctx.make_program)
      .arg("-f")
      .arg(makefile)
      .arg(&target)
      .current_dir(&layout.checkout);
    run_command(&spec, ctx.command_timeout).await?;
    Ok(())
  }

  async fn clean(&self, layout: &DirectoryLayout) -> Result<(), BuildError> {
    match tokio::fs::remove_dir_all(&layout.object).await {
      Ok(()) => {
        info!(path = ?layout.object, "removed object directory");
        Ok(())
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(source) => Err(BuildError::Remove {
        path: layout.object.clone(),
        source,
      }),
    }
  }
}
