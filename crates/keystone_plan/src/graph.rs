//! Dependency graph between resources.
//!
//! An edge `from -> to` records that `from` consumes an output of `to`, so
//! `to` must be created first. The graph is derived from a registry for one
//! run and discarded afterwards.

use indexmap::{IndexMap, IndexSet};
use keystone_core::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// A dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Consuming resource
    pub from: ResourceId,
    /// Producing resource
    pub to: ResourceId,
    /// Attribute of `from` holding the reference
    pub attribute: String,
    /// Output of `to` that is referenced
    pub output: Option<String>,
}

impl Edge {
    /// Create a new edge
    #[must_use]
    pub fn new(from: ResourceId, to: ResourceId, attribute: impl Into<String>) -> Self {
        Self {
            from,
            to,
            attribute: attribute.into(),
            output: None,
        }
    }

    /// Set the referenced output
    #[must_use]
    pub fn with_output(mut self, output: Option<String>) -> Self {
        self.output = output;
        self
    }
}

/// Directed graph of resource dependencies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    /// Nodes in insertion order
    nodes: IndexSet<ResourceId>,
    /// Edges in insertion order, at most one per (from, to) pair
    edges: Vec<Edge>,
    /// Dependencies per node, in edge insertion order
    #[serde(skip)]
    dependencies: IndexMap<ResourceId, IndexSet<ResourceId>>,
}

impl DependencyGraph {
    /// Create an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; returns false if it was already present
    pub fn add_node(&mut self, id: ResourceId) -> bool {
        self.dependencies.entry(id.clone()).or_default();
        self.nodes.insert(id)
    }

    /// Add an edge, adding missing endpoints as nodes.
    ///
    /// Returns false if an edge between the same pair already exists; the
    /// first edge is kept.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        self.add_node(edge.from.clone());
        self.add_node(edge.to.clone());
        let deps = self.dependencies.entry(edge.from.clone()).or_default();
        if !deps.insert(edge.to.clone()) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Resources `id` depends on
    pub fn dependencies<'a>(
        &'a self,
        id: &ResourceId,
    ) -> impl Iterator<Item = &'a ResourceId> + use<'a> {
        self.dependencies.get(id).into_iter().flatten()
    }

    /// Resources depending on `id`
    #[must_use]
    pub fn dependents(&self, id: &ResourceId) -> Vec<&ResourceId> {
        self.edges
            .iter()
            .filter(|e| &e.to == id)
            .map(|e| &e.from)
            .collect()
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceId> {
        self.nodes.iter()
    }

    /// Edges in insertion order
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Get total node count
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get total edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check if graph is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Topological order, dependencies first.
    ///
    /// Kahn's algorithm; among nodes that are ready at the same time the
    /// earliest inserted goes first. On a cyclic graph returns the nodes that
    /// could not be ordered.
    ///
    /// # Errors
    ///
    /// Returns the unordered remainder if the graph has a cycle
    pub fn topological_order(&self) -> Result<Vec<ResourceId>, Vec<ResourceId>> {
        let mut pending: Vec<usize> = self
            .nodes
            .iter()
            .map(|id| self.dependencies(id).count())
            .collect();
        let mut ready: BTreeSet<usize> = pending
            .iter()
            .enumerate()
            .filter(|(_, n)| **n == 0)
            .map(|(i, _)| i)
            .collect();

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            if let (Some(from), Some(to)) =
                (self.nodes.get_index_of(&edge.from), self.nodes.get_index_of(&edge.to))
            {
                dependents[to].push(from);
            }
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(next) = ready.pop_first() {
            order.push(next);
            for &dependent in &dependents[next] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() == self.nodes.len() {
            Ok(order.into_iter().map(|i| self.nodes[i].clone()).collect())
        } else {
            let placed: BTreeSet<usize> = order.into_iter().collect();
            Err(self
                .nodes
                .iter()
                .enumerate()
                .filter(|(i, _)| !placed.contains(i))
                .map(|(_, id)| id.clone())
                .collect())
        }
    }

    /// Render as Graphviz DOT, edges pointing from consumer to producer
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph keystone {\n    rankdir = \"RL\";\n");
        for node in &self.nodes {
            let _ = writeln!(out, "    \"{}\";", node);
        }
        for edge in &self.edges {
            let _ = writeln!(
                out,
                "    \"{}\" -> \"{}\" [label = \"{}\"];",
                edge.from, edge.to, edge.attribute
            );
        }
        out.push_str("}\n");
        out
    }
}
