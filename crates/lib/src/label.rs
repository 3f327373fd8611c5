//! Labels and build stage tags.
//!
//! A [`Label`] names one buildable unit at one stage of its lifecycle. Labels
//! are plain values: the scheduler creates them, the rule set stores them as
//! graph nodes, and the package builder dispatches on their [`Tag`].
//!
//! # Text Form
//!
//! ```text
//! package:(domain)name{role}/tag
//! checkout:name/tag
//! ```
//!
//! The `(domain)` part is optional for both kinds; checkouts never carry a role.
//!
//! # Example
//!
//! ```
//! use debstage_lib::label::{Label, LabelKind, Tag};
//!
//! let label: Label = "package:busybox{x86}/installed".parse().unwrap();
//! assert_eq!(label.kind, LabelKind::Package);
//! assert_eq!(label.role.as_deref(), Some("x86"));
//! assert_eq!(label.tag, Tag::Installed);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
  #[error("unknown tag: {0}")]
  UnknownTag(String),

  #[error("unknown label kind: {0}")]
  UnknownKind(String),

  #[error("malformed label '{label}': {reason}")]
  Malformed { label: String, reason: String },
}

/// An enumerated build stage.
///
/// Package stages advance in the order `PreConfig → Configured → Built →
/// Installed → PostInstalled`. `Clean` and `DistClean` reset a package rather
/// than advancing it. `CheckedOut` and `Deployed` belong to checkouts and
/// deployments; a package builder rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tag {
  #[serde(rename = "checked_out")]
  CheckedOut,
  #[serde(rename = "preconfig")]
  PreConfig,
  #[serde(rename = "configured")]
  Configured,
  #[serde(rename = "built")]
  Built,
  #[serde(rename = "installed")]
  Installed,
  #[serde(rename = "postinstalled")]
  PostInstalled,
  #[serde(rename = "clean")]
  Clean,
  #[serde(rename = "distclean")]
  DistClean,
  #[serde(rename = "deployed")]
  Deployed,
}

impl Tag {
  /// Forward stages of a package, in order.
  pub const PACKAGE_STAGES: [Tag; 5] = [
    Tag::PreConfig,
    Tag::Configured,
    Tag::Built,
    Tag::Installed,
    Tag::PostInstalled,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Tag::CheckedOut => "checked_out",
      Tag::PreConfig => "preconfig",
      Tag::Configured => "configured",
      Tag::Built => "built",
      Tag::Installed => "installed",
      Tag::PostInstalled => "postinstalled",
      Tag::Clean => "clean",
      Tag::DistClean => "distclean",
      Tag::Deployed => "deployed",
    }
  }

  /// Returns true for the tags that reset a package instead of advancing it.
  pub fn is_reset(self) -> bool {
    matches!(self, Tag::Clean | Tag::DistClean)
  }

  /// The stage a package must reach before this one, if any.
  pub fn previous_stage(self) -> Option<Tag> {
    let idx = Self::PACKAGE_STAGES.iter().position(|t| *t == self)?;
    idx.checked_sub(1).map(|prev| Self::PACKAGE_STAGES[prev])
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Tag {
  type Err = LabelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "checked_out" => Ok(Tag::CheckedOut),
      "preconfig" => Ok(Tag::PreConfig),
      "configured" => Ok(Tag::Configured),
      "built" => Ok(Tag::Built),
      "installed" => Ok(Tag::Installed),
      "postinstalled" => Ok(Tag::PostInstalled),
      "clean" => Ok(Tag::Clean),
      "distclean" => Ok(Tag::DistClean),
      "deployed" => Ok(Tag::Deployed),
      other => Err(LabelError::UnknownTag(other.to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
  Checkout,
  Package,
}

impl LabelKind {
  pub fn as_str(self) -> &'static str {
    match self {
      LabelKind::Checkout => "checkout",
      LabelKind::Package => "package",
    }
  }
}

/// Identifies one buildable unit at one build stage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label {
  pub kind: LabelKind,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub domain: Option<String>,
  pub tag: Tag,
}

impl Label {
  pub fn package(name: &str, role: &str, tag: Tag) -> Self {
    Self {
      kind: LabelKind::Package,
      name: name.to_string(),
      role: Some(role.to_string()),
      domain: None,
      tag,
    }
  }

  pub fn checkout(name: &str, tag: Tag) -> Self {
    Self {
      kind: LabelKind::Checkout,
      name: name.to_string(),
      role: None,
      domain: None,
      tag,
    }
  }

  pub fn with_domain(mut self, domain: Option<&str>) -> Self {
    self.domain = domain.map(str::to_string);
    self
  }

  /// Copy of this label at a different stage.
  pub fn with_tag(&self, tag: Tag) -> Self {
    Self { tag, ..self.clone() }
  }

  pub fn role(&self) -> Option<&str> {
    self.role.as_deref()
  }

  pub fn domain(&self) -> Option<&str> {
    self.domain.as_deref()
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:", self.kind.as_str())?;
    if let Some(domain) = &self.domain {
      write!(f, "({domain})")?;
    }
    f.write_str(&self.name)?;
    if let Some(role) = &self.role {
      write!(f, "{{{role}}}")?;
    }
    write!(f, "/{}", self.tag)
  }
}

impl FromStr for Label {
  type Err = LabelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let malformed = |reason: &str| LabelError::Malformed {
      label: s.to_string(),
      reason: reason.to_string(),
    };

    let (kind, rest) = s.split_once(':').ok_or_else(|| malformed("missing kind"))?;
    let kind = match kind {
      "checkout" => LabelKind::Checkout,
      "package" => LabelKind::Package,
      other => return Err(LabelError::UnknownKind(other.to_string())),
    };

    let (domain, rest) = match rest.strip_prefix('(') {
      Some(inner) => {
        let (domain, rest) = inner.split_once(')').ok_or_else(|| malformed("unclosed domain"))?;
        if domain.is_empty() {
          return Err(malformed("empty domain"));
        }
        (Some(domain.to_string()), rest)
      }
      None => (None, rest),
    };

    let (body, tag) = rest.rsplit_once('/').ok_or_else(|| malformed("missing tag"))?;
    let tag: Tag = tag.parse()?;

    let (name, role) = match body.strip_suffix('}') {
      Some(inner) => {
        let (name, role) = inner.split_once('{').ok_or_else(|| malformed("unopened role"))?;
        if role.is_empty() {
          return Err(malformed("empty role"));
        }
        (name, Some(role.to_string()))
      }
      None => (body, None),
    };

    if name.is_empty() {
      return Err(malformed("empty name"));
    }
    if kind == LabelKind::Checkout && role.is_some() {
      return Err(malformed("checkouts do not take a role"));
    }

    Ok(Label {
      kind,
      name: name.to_string(),
      role,
      domain,
      tag,
    })
  }
}
