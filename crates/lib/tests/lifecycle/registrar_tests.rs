//! Registering packages and building through the rule set.

use debstage_lib::label::{Label, Tag};
use debstage_lib::package::{PackageDescriptor, TargetKind};
use debstage_lib::rules::{RuleError, RuleSet, register_dev_package, register_package};

use super::common::*;

fn image_rules() -> RuleSet {
  let mut rules = RuleSet::new();
  let libc = PackageDescriptor::new("libc6-dev", CHECKOUT).with_archive("libc6-dev_2.36_amd64.deb");
  let util_linux = PackageDescriptor::new("util-linux", CHECKOUT).with_archive("util-linux_1.0_amd64.deb");
  let busybox = PackageDescriptor::new("busybox", CHECKOUT).with_archive("busybox_1.36_amd64.deb");

  register_dev_package(&mut rules, &libc, &[ROLE], &[] as &[&str]);
  register_package(&mut rules, &util_linux, &[ROLE], &["libc6-dev"]);
  register_package(&mut rules, &busybox, &[ROLE, "rescue"], &["libc6-dev", "util-linux"]);
  rules
}

#[test]
fn preconfig_waits_for_checkout_and_dependencies() {
  let rules = image_rules();

  assert_eq!(
    rules.dependencies_of(&label("util-linux", Tag::PreConfig)),
    vec![
      Label::checkout(CHECKOUT, Tag::CheckedOut),
      label("libc6-dev", Tag::PostInstalled),
    ]
  );
  assert_eq!(
    rules.dependencies_of(&label("busybox", Tag::PreConfig)),
    vec![
      Label::checkout(CHECKOUT, Tag::CheckedOut),
      label("libc6-dev", Tag::PostInstalled),
      label("util-linux", Tag::PostInstalled),
    ]
  );
}

#[test]
fn dependency_edges_use_the_dependent_role() {
  let rules = image_rules();
  let rescue_preconfig = Label::package("busybox", "rescue", Tag::PreConfig);

  assert!(
    rules
      .dependencies_of(&rescue_preconfig)
      .contains(&Label::package("util-linux", "rescue", Tag::PostInstalled))
  );
  // Nobody registered util-linux for the rescue role, so that label has no rule.
  assert!(
    rules
      .rule_for(&Label::package("util-linux", "rescue", Tag::PostInstalled))
      .is_none()
  );
}

#[test]
fn label_count_covers_stages_checkout_and_placeholders() {
  let rules = image_rules();
  // 4 registered (package, role) pairs x 7 tags, one checkout, and the
  // rescue-role dependency labels nobody registered.
  assert_eq!(rules.label_count(), 4 * 7 + 1 + 2);
  assert!(rules.verify_acyclic().is_ok());
}

#[test]
fn mutual_dependencies_form_a_cycle() {
  let mut rules = RuleSet::new();
  let a = PackageDescriptor::new("a", CHECKOUT).with_archive("a.deb");
  let b = PackageDescriptor::new("b", CHECKOUT).with_archive("b.deb");
  register_package(&mut rules, &a, &[ROLE], &["b"]);
  register_package(&mut rules, &b, &[ROLE], &["a"]);

  assert!(matches!(rules.verify_acyclic(), Err(RuleError::CycleDetected { .. })));
}

#[tokio::test]
async fn registered_rules_build_their_labels() {
  let tree = TestTree::new();
  tree.add_archive("libc6-dev_2.36_amd64.deb", &[("usr/include/stdio.h", "int printf();")]);
  tree.add_archive("util-linux_1.0_amd64.deb", UTIL_LINUX_FILES);
  let rules = image_rules();
  let ctx = tree.context();

  for name in ["libc6-dev", "util-linux"] {
    let installed = label(name, Tag::Installed);
    let rule = rules.rule_for(&installed).unwrap();
    rule.build_label(&ctx, &installed).await.unwrap();
  }

  assert_eq!(
    rules.rule_for(&label("libc6-dev", Tag::Installed)).unwrap().kind(),
    TargetKind::Dev
  );
  assert!(tree.layout("libc6-dev").object_include_dir().join("stdio.h").is_file());
  assert!(tree.layout("util-linux").install.join("usr/bin/mount").is_file());
  assert!(!tree.layout("util-linux").install.join("usr/include/stdio.h").exists());
}
