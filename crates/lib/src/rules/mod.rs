//! Build rules and their dependency graph.
//!
//! A [`RuleSet`] maps labels to the [`PackageBuilder`] that performs them and
//! records which labels must be reached before which. Edges run from
//! dependency to dependent, so a topological order of the graph is a valid
//! build order. Deciding what to build is left to the scheduler.
//!
//! # Submodules
//!
//! - [`register`] - Wiring packages into a rule set

pub mod register;

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::label::Label;
use crate::package::PackageBuilder;

pub use register::{register_dev_package, register_package};

#[derive(Debug, Error)]
pub enum RuleError {
  #[error("dependency cycle detected at {label}")]
  CycleDetected { label: String },
}

#[derive(Debug, Default)]
pub struct RuleSet {
  graph: DiGraph<Label, ()>,
  nodes: HashMap<Label, NodeIndex>,
  rules: HashMap<Label, Arc<PackageBuilder>>,
}

impl RuleSet {
  pub fn new() -> Self {
    Self::default()
  }

  fn node(&mut self, label: &Label) -> NodeIndex {
    if let Some(&idx) = self.nodes.get(label) {
      return idx;
    }
    let idx = self.graph.add_node(label.clone());
    self.nodes.insert(label.clone(), idx);
    idx
  }

  /// Attach `builder` to `label`, returning the rule it replaces.
  pub fn add_rule(&mut self, label: Label, builder: Arc<PackageBuilder>) -> Option<Arc<PackageBuilder>> {
    self.node(&label);
    self.rules.insert(label, builder)
  }

  /// Record that `dependent` cannot be built before `dependency`.
  ///
  /// Either label may be unknown so far; it is added without a rule.
  /// Adding the same dependency twice keeps a single edge.
  pub fn add_dependency(&mut self, dependent: &Label, dependency: &Label) {
    let to = self.node(dependent);
    let from = self.node(dependency);
    self.graph.update_edge(from, to, ());
  }

  pub fn rule_for(&self, label: &Label) -> Option<&Arc<PackageBuilder>> {
    self.rules.get(label)
  }

  pub fn contains(&self, label: &Label) -> bool {
    self.nodes.contains_key(label)
  }

  /// Number of labels in the graph, with or without a rule.
  pub fn label_count(&self) -> usize {
    self.graph.node_count()
  }

  /// Direct dependencies of `label`, sorted.
  pub fn dependencies_of(&self, label: &Label) -> Vec<Label> {
    self.neighbors(label, Direction::Incoming)
  }

  /// Labels that directly depend on `label`, sorted.
  pub fn dependents_of(&self, label: &Label) -> Vec<Label> {
    self.neighbors(label, Direction::Outgoing)
  }

  fn neighbors(&self, label: &Label, direction: Direction) -> Vec<Label> {
    let Some(&idx) = self.nodes.get(label) else {
      return Vec::new();
    };
    let mut labels: Vec<Label> = self
      .graph
      .neighbors_directed(idx, direction)
      .map(|n| self.graph[n].clone())
      .collect();
    labels.sort();
    labels
  }

  pub fn verify_acyclic(&self) -> Result<(), RuleError> {
    toposort(&self.graph, None).map_err(|cycle| RuleError::CycleDetected {
      label: self.graph[cycle.node_id()].to_string(),
    })?;
    Ok(())
  }
}
