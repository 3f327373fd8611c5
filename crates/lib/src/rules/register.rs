//! Registration of packages into a [`RuleSet`].
//!
//! Registering a package builds graph structure only. For each role it
//! creates one [`PackageBuilder`], attaches it to every stage label of the
//! package, chains the forward stages, and hangs `PreConfig` off the checkout
//! and off the `PostInstalled` stage of each explicit dependency.

use std::sync::Arc;

use tracing::debug;

use crate::label::{Label, Tag};
use crate::package::{PackageBuilder, PackageDescriptor, TargetKind};

use super::RuleSet;

const RESET_TAGS: [Tag; 2] = [Tag::Clean, Tag::DistClean];

/// Attach `builder` to every stage label of its package in `role`.
///
/// Returns the labels added, forward stages first.
pub fn add_package_rules(rules: &mut RuleSet, builder: Arc<PackageBuilder>, role: &str) -> Vec<Label> {
  let descriptor = builder.descriptor();
  let labels: Vec<Label> = Tag::PACKAGE_STAGES
    .iter()
    .chain(RESET_TAGS.iter())
    .map(|&tag| Label::package(&descriptor.name, role, tag).with_domain(descriptor.domain.as_deref()))
    .collect();

  for label in &labels {
    rules.add_rule(label.clone(), Arc::clone(&builder));
  }
  for pair in labels[..Tag::PACKAGE_STAGES.len()].windows(2) {
    rules.add_dependency(&pair[1], &pair[0]);
  }
  labels
}

/// `PreConfig` of the package waits for its checkout.
pub fn package_depends_on_checkout(rules: &mut RuleSet, descriptor: &PackageDescriptor, role: &str) {
  let domain = descriptor.domain.as_deref();
  let preconfig = Label::package(&descriptor.name, role, Tag::PreConfig).with_domain(domain);
  let checkout = Label::checkout(&descriptor.checkout, Tag::CheckedOut).with_domain(domain);
  rules.add_dependency(&preconfig, &checkout);
}

/// `PreConfig` of the package waits for each dependency, in the same role, to be post-installed.
pub fn package_depends_on_packages<S: AsRef<str>>(
  rules: &mut RuleSet,
  descriptor: &PackageDescriptor,
  role: &str,
  depends_on: &[S],
) {
  let domain = descriptor.domain.as_deref();
  let preconfig = Label::package(&descriptor.name, role, Tag::PreConfig).with_domain(domain);
  for dep in depends_on {
    let dependency = Label::package(dep.as_ref(), role, Tag::PostInstalled).with_domain(domain);
    rules.add_dependency(&preconfig, &dependency);
  }
}

/// Register a package for each of `roles` using the descriptor's target kind.
pub fn register_package<R, D>(rules: &mut RuleSet, descriptor: &PackageDescriptor, roles: &[R], depends_on: &[D])
where
  R: AsRef<str>,
  D: AsRef<str>,
{
  register_with_kind(rules, descriptor, descriptor.kind, roles, depends_on);
}

/// Register a package as a Dev target regardless of its descriptor.
pub fn register_dev_package<R, D>(rules: &mut RuleSet, descriptor: &PackageDescriptor, roles: &[R], depends_on: &[D])
where
  R: AsRef<str>,
  D: AsRef<str>,
{
  register_with_kind(rules, descriptor, TargetKind::Dev, roles, depends_on);
}

fn register_with_kind<R, D>(
  rules: &mut RuleSet,
  descriptor: &PackageDescriptor,
  kind: TargetKind,
  roles: &[R],
  depends_on: &[D],
) where
  R: AsRef<str>,
  D: AsRef<str>,
{
  for role in roles {
    let role = role.as_ref();
    let builder = Arc::new(PackageBuilder::with_kind(descriptor.clone(), kind));
    add_package_rules(rules, builder, role);
    package_depends_on_checkout(rules, descriptor, role);
    package_depends_on_packages(rules, descriptor, role, depends_on);
    debug!(package = %descriptor.name, role, kind = ?kind, deps = depends_on.len(), "registered package");
  }
}
