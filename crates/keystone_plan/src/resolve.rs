//! Reference resolution.
//!
//! Turns the reference-typed attributes of registered resources into
//! dependency edges. Only attributes the schema marks as references are
//! inspected; a literal string elsewhere that happens to look like
//! `kind.name.attr` stays a literal. Values in reference-typed attributes
//! that are not references at all are skipped here and reported by the
//! completeness check, after the cycle check has run.

use crate::error::{PlanError, PlanResult};
use crate::graph::{DependencyGraph, Edge};
use crate::registry::{Resource, ResourceRegistry};
use keystone_core::{CoreError, Reference, ResourceKind, Value, ValueKind};
use tracing::debug;

/// Resolver building the working dependency graph for one run
pub struct Resolver<'r, 'c> {
    registry: &'r ResourceRegistry<'c>,
    graph: DependencyGraph,
}

impl<'r, 'c> Resolver<'r, 'c> {
    /// Create a resolver; every registered resource becomes a node
    #[must_use]
    pub fn new(registry: &'r ResourceRegistry<'c>) -> Self {
        let mut graph = DependencyGraph::new();
        for resource in registry.all() {
            graph.add_node(resource.id.clone());
        }
        Self { registry, graph }
    }

    /// Resolve every reference held by `resource`, appending one edge per
    /// distinct target. Returns the number of edges added.
    ///
    /// # Errors
    ///
    /// Returns `DanglingReference` if a target resource or output does not
    /// exist
    pub fn resolve(&mut self, resource: &Resource) -> PlanResult<usize> {
        let Some(schema) = self.registry.schema(resource.kind()) else {
            return Err(CoreError::UnknownKind {
                kind: resource.kind().to_string(),
            }
            .into());
        };

        let mut added = 0;
        for (attribute, value) in &resource.attributes {
            let Some(attr_schema) = schema.attribute(attribute) else {
                continue;
            };
            let candidates: Vec<&Value> = match (attr_schema.kind, value) {
                (ValueKind::Reference, v) => vec![v],
                (ValueKind::ReferenceList, Value::List(items)) => items.iter().collect(),
                _ => continue,
            };

            for candidate in candidates {
                let Some(edge) = self.resolve_value(resource, attribute, candidate)? else {
                    continue;
                };
                debug!(from = %edge.from, to = %edge.to, attribute = %attribute, "resolved reference");
                if self.graph.add_edge(edge) {
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    /// Resolve every registered resource in insertion order and return the
    /// finished graph
    ///
    /// # Errors
    ///
    /// Returns the first resolution error
    pub fn resolve_all(mut self) -> PlanResult<DependencyGraph> {
        let registry = self.registry;
        for resource in registry.all() {
            self.resolve(resource)?;
        }
        Ok(self.graph)
    }

    /// Working graph so far
    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Consume the resolver, returning the working graph
    #[must_use]
    pub fn into_graph(self) -> DependencyGraph {
        self.graph
    }

    /// Edge for one value, or `None` if the value is not a reference
    fn resolve_value(
        &self,
        resource: &Resource,
        attribute: &str,
        value: &Value,
    ) -> PlanResult<Option<Edge>> {
        let Some((kind, name, output)) = value
            .as_reference_expr()
            .and_then(|expr| Reference::split(expr).ok())
        else {
            return Ok(None);
        };

        let dangling = |output: Option<&str>| PlanError::DanglingReference {
            from: resource.id.clone(),
            attribute: attribute.to_string(),
            target: format!("{}.{}", kind, name),
            output: output.map(str::to_string),
        };

        let kind: ResourceKind = kind.parse().map_err(|_| dangling(None))?;
        let target = self
            .registry
            .lookup(kind, name)
            .map_err(|_| dangling(None))?;

        if let Some(output) = output {
            let exposed = self
                .registry
                .schema(kind)
                .is_some_and(|schema| schema.exposes(output));
            if !exposed {
                return Err(dangling(Some(output)));
            }
        }

        Ok(Some(
            Edge::new(resource.id.clone(), target.id.clone(), attribute)
                .with_output(output.map(str::to_string)),
        ))
    }
}
