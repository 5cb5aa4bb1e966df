//! Graph validator.
//!
//! Runs the cycle check and then the completeness check, stopping at the
//! first violation, and on success returns the creation order.

use crate::error::{Incompleteness, PlanError, PlanResult};
use crate::graph::DependencyGraph;
use crate::registry::{Resource, ResourceRegistry};
use indexmap::IndexMap;
use keystone_core::{CoreError, ResourceId};

/// DFS mark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not reached yet
    White,
    /// On the current DFS path
    Grey,
    /// Fully explored
    Black,
}

/// Validator for dependency graphs
#[derive(Debug, Clone, Default)]
pub struct Validator {
    /// Reject attributes the schema does not declare
    pub strict_attributes: bool,
}

impl Validator {
    /// Create a new validator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether undeclared attributes are rejected
    #[must_use]
    pub fn with_strict_attributes(mut self, strict: bool) -> Self {
        self.strict_attributes = strict;
        self
    }

    /// Validate a graph against the registry it was derived from
    ///
    /// # Errors
    ///
    /// Returns `CyclicDependency` or `IncompleteResource` (or
    /// `UndeclaredAttribute` in strict mode) for the first violation found
    pub fn validate(
        &self,
        registry: &ResourceRegistry<'_>,
        graph: &DependencyGraph,
    ) -> PlanResult<Vec<ResourceId>> {
        self.check_cycles(graph)?;
        self.check_completeness(registry)?;

        graph
            .topological_order()
            .map_err(|path| PlanError::CyclicDependency { path })
    }

    /// Three-colour DFS over dependency edges. The walk keeps its own
    /// stack, so chain length is bounded by memory rather than call depth.
    ///
    /// # Errors
    ///
    /// Returns `CyclicDependency` with the members of the first cycle found
    pub fn check_cycles(&self, graph: &DependencyGraph) -> PlanResult<()> {
        let mut colors: IndexMap<&ResourceId, Color> =
            graph.nodes().map(|id| (id, Color::White)).collect();

        for id in graph.nodes() {
            if colors.get(id) == Some(&Color::White) {
                if let Some(cycle) = visit(id, graph, &mut colors) {
                    return Err(PlanError::CyclicDependency { path: cycle });
                }
            }
        }
        Ok(())
    }

    /// Required-attribute completeness
    ///
    /// # Errors
    ///
    /// Returns `IncompleteResource` for the first missing or mismatched
    /// attribute in registry order
    pub fn check_completeness(&self, registry: &ResourceRegistry<'_>) -> PlanResult<()> {
        for resource in registry.all() {
            self.check_resource(registry, resource)?;
        }
        Ok(())
    }

    fn check_resource(&self, registry: &ResourceRegistry<'_>, resource: &Resource) -> PlanResult<()> {
        let schema = registry
            .schema(resource.kind())
            .ok_or_else(|| CoreError::UnknownKind {
                kind: resource.kind().to_string(),
            })?;

        for (name, attr) in schema.required_attributes() {
            if resource.attribute(name).is_none() {
                return Err(PlanError::IncompleteResource {
                    id: resource.id.clone(),
                    attribute: name.to_string(),
                    problem: Incompleteness::Missing { expected: attr.kind },
                });
            }
        }

        for (name, value) in &resource.attributes {
            match schema.attribute(name) {
                Some(attr) if !value.satisfies(attr.kind) => {
                    return Err(PlanError::IncompleteResource {
                        id: resource.id.clone(),
                        attribute: name.clone(),
                        problem: Incompleteness::Mismatch {
                            expected: attr.kind,
                            found: value.to_string(),
                        },
                    });
                }
                None if self.strict_attributes => {
                    return Err(PlanError::UndeclaredAttribute {
                        id: resource.id.clone(),
                        attribute: name.clone(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Iterative DFS from `root`; each frame holds a node and its remaining
/// dependencies, so the frame stack is the current path.
fn visit<'g>(
    root: &'g ResourceId,
    graph: &'g DependencyGraph,
    colors: &mut IndexMap<&'g ResourceId, Color>,
) -> Option<Vec<ResourceId>> {
    colors.insert(root, Color::Grey);
    let mut stack = vec![(root, graph.dependencies(root))];

    while let Some((id, deps)) = stack.last_mut() {
        let Some(dep) = deps.next() else {
            colors.insert(*id, Color::Black);
            stack.pop();
            continue;
        };
        match colors.get(dep).copied().unwrap_or(Color::White) {
            Color::Grey => {
                let start = stack.iter().position(|(p, _)| *p == dep).unwrap_or(0);
                return Some(stack[start..].iter().map(|(p, _)| (*p).clone()).collect());
            }
            Color::White => {
                colors.insert(dep, Color::Grey);
                stack.push((dep, graph.dependencies(dep)));
            }
            Color::Black => {}
        }
    }
    None
}
