//! Planner: one isolated validation run.
//!
//! Each call to [`Planner::plan`] builds its own registry and graph, so
//! runs never share state and the same declaration always yields the same
//! plan or the same error.

use crate::config::RunConfig;
use crate::decl::{Declaration, ProviderConfig};
use crate::error::{PlanError, PlanResult};
use crate::graph::{DependencyGraph, Edge};
use crate::registry::ResourceRegistry;
use crate::resolve::Resolver;
use crate::schema::SchemaCatalog;
use crate::validate::Validator;
use keystone_core::{ResourceId, RunId};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Run that produced this plan
    pub run_id: RunId,
    /// Provider settings in effect
    pub provider: ProviderConfig,
    /// Creation order, dependencies first
    pub create_order: Vec<ResourceId>,
    /// Dependency edges in resolution order
    pub edges: Vec<Edge>,
}

impl Plan {
    /// Deletion order: the creation order reversed
    #[must_use]
    pub fn destroy_order(&self) -> Vec<ResourceId> {
        self.create_order.iter().rev().cloned().collect()
    }

    /// Rebuild the dependency graph, nodes in creation order
    #[must_use]
    pub fn graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for id in &self.create_order {
            graph.add_node(id.clone());
        }
        for edge in &self.edges {
            graph.add_edge(edge.clone());
        }
        graph
    }
}

/// Planner running validation passes
pub struct Planner<'c> {
    config: RunConfig,
    catalog: &'c SchemaCatalog,
}

impl Planner<'static> {
    /// Create a planner over the built-in schema catalog
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self::with_catalog(config, SchemaCatalog::builtin())
    }
}

impl<'c> Planner<'c> {
    /// Create a planner over a custom schema catalog
    #[must_use]
    pub fn with_catalog(config: RunConfig, catalog: &'c SchemaCatalog) -> Self {
        Self { config, catalog }
    }

    /// Run configuration
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Register, resolve and validate a declaration
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage; nothing is retried
    pub fn plan(&self, decl: &Declaration) -> PlanResult<Plan> {
        let run_id = RunId::new();
        let span = info_span!("plan", run = %run_id);
        let _enter = span.enter();

        let limit = self.config.max_resources;
        if limit > 0 && decl.resources.len() > limit {
            return Err(PlanError::TooManyResources {
                count: decl.resources.len(),
                limit,
            });
        }

        let provider = self.config.effective_provider(decl.provider.as_ref());
        if provider.region.is_none() {
            debug!(provider = %provider.name, "no region configured");
        }

        let mut registry = ResourceRegistry::new(self.catalog);
        for resource in &decl.resources {
            registry.register(resource.kind, &resource.name, resource.attributes.clone())?;
        }

        let result = Resolver::new(&registry).resolve_all().and_then(|graph| {
            Validator::new()
                .with_strict_attributes(self.config.strict_attributes)
                .validate(&registry, &graph)
                .map(|order| (order, graph))
        });
        let (create_order, graph) = match result {
            Ok(ok) => ok,
            Err(e) => {
                warn!(code = e.code(), "validation failed: {}", e);
                return Err(e);
            }
        };

        info!(
            resources = create_order.len(),
            edges = graph.edge_count(),
            "declaration is valid"
        );
        Ok(Plan {
            run_id,
            provider,
            create_order,
            edges: graph.edges().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::ResourceDecl;
    use keystone_core::{ResourceKind, Value};
    use proptest::prelude::*;

    const PRODUCT_API: &str = include_str!("../../../demos/product_api.ks");

    fn expr(s: &str) -> Value {
        Value::Expression(s.to_string())
    }

    fn product_declaration() -> Declaration {
        Declaration::new()
            .with_resource(
                ResourceDecl::new(ResourceKind::Table, "product_table")
                    .with("hash_key", Value::String("product_id".into())),
            )
            .with_resource(ResourceDecl::new(ResourceKind::Role, "ProductLambdaRole"))
            .with_resource(
                ResourceDecl::new(ResourceKind::Function, "CreateProductHandler")
                    .with("role", expr("role.ProductLambdaRole.arn"))
                    .with("table", expr("table.product_table.name")),
            )
    }

    fn position(order: &[ResourceId], kind: ResourceKind, name: &str) -> usize {
        let id = ResourceId::new(kind, name);
        order.iter().position(|o| *o == id).unwrap()
    }

    #[test]
    fn test_product_scenario_is_valid() {
        let plan = Planner::new(RunConfig::new()).plan(&product_declaration()).unwrap();
        let order = &plan.create_order;
        assert_eq!(order.len(), 3);
        let function = position(order, ResourceKind::Function, "CreateProductHandler");
        assert!(position(order, ResourceKind::Table, "product_table") < function);
        assert!(position(order, ResourceKind::Role, "ProductLambdaRole") < function);
        assert_eq!(plan.destroy_order()[0].kind, ResourceKind::Function);
        assert_eq!(plan.graph().edge_count(), 2);
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let mut decl = product_declaration();
        decl.resources[2]
            .attributes
            .insert("depends_on".to_string(), Value::List(vec![expr("function.CreateProductHandler.arn")]));

        let err = Planner::new(RunConfig::new()).plan(&decl).unwrap_err();
        assert_eq!(
            err,
            PlanError::CyclicDependency {
                path: vec![ResourceId::new(ResourceKind::Function, "CreateProductHandler")]
            }
        );
    }

    #[test]
    fn test_two_resource_cycle_adjacent() {
        let decl = Declaration::new()
            .with_resource(
                ResourceDecl::new(ResourceKind::Role, "a")
                    .with("depends_on", Value::List(vec![expr("role.b")])),
            )
            .with_resource(
                ResourceDecl::new(ResourceKind::Role, "b")
                    .with("depends_on", Value::List(vec![expr("role.a")])),
            );
        match Planner::new(RunConfig::new()).plan(&decl).unwrap_err() {
            PlanError::CyclicDependency { path } => {
                let a = ResourceId::new(ResourceKind::Role, "a");
                let b = ResourceId::new(ResourceKind::Role, "b");
                let i = path.iter().position(|p| *p == a).unwrap();
                let j = path.iter().position(|p| *p == b).unwrap();
                assert_eq!(i.abs_diff(j), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_reported_before_mistyped_reference() {
        let decl = Declaration::new()
            .with_resource(
                ResourceDecl::new(ResourceKind::Role, "a")
                    .with("depends_on", Value::List(vec![expr("role.b")])),
            )
            .with_resource(
                ResourceDecl::new(ResourceKind::Role, "b")
                    .with("depends_on", Value::List(vec![expr("role.a")])),
            )
            .with_resource(ResourceDecl::new(ResourceKind::Function, "f").with("role", Value::Bool(true)));
        let planner = Planner::new(RunConfig::new());
        assert!(matches!(
            planner.plan(&decl).unwrap_err(),
            PlanError::CyclicDependency { .. }
        ));

        let acyclic = Declaration::new()
            .with_resource(ResourceDecl::new(ResourceKind::Function, "f").with("role", Value::Bool(true)));
        assert!(matches!(
            planner.plan(&acyclic).unwrap_err(),
            PlanError::IncompleteResource { ref attribute, .. } if attribute == "role"
        ));
    }

    #[test]
    fn test_long_dependency_chain() {
        let mut decl = Declaration::new();
        for i in (0..50_000).rev() {
            let mut role = ResourceDecl::new(ResourceKind::Role, format!("r{}", i));
            if i > 0 {
                role = role.with("depends_on", Value::List(vec![expr(&format!("role.r{}", i - 1))]));
            }
            decl = decl.with_resource(role);
        }

        let plan = Planner::new(RunConfig::new()).plan(&decl).unwrap();
        assert_eq!(plan.create_order.len(), 50_000);
        assert_eq!(plan.create_order[0], ResourceId::new(ResourceKind::Role, "r0"));
        assert_eq!(plan.create_order[49_999], ResourceId::new(ResourceKind::Role, "r49999"));
    }

    #[test]
    fn test_invoke_permission_with_arn_template() {
        let decl = product_declaration()
            .with_resource(ResourceDecl::new(ResourceKind::RestApi, "api").with("name", Value::String("api".into())))
            .with_resource(
                ResourceDecl::new(ResourceKind::Permission, "invoke")
                    .with("function_name", expr("function.CreateProductHandler.function_name"))
                    .with("action", Value::String("lambda:InvokeFunction".into()))
                    .with("principal", Value::String("apigateway.amazonaws.com".into()))
                    .with("source_arn", Value::String("${rest_api.api.execution_arn}/*/*".into())),
            );
        let plan = Planner::new(RunConfig::new().with_strict_attributes(true))
            .plan(&decl)
            .unwrap();
        assert_eq!(plan.create_order.len(), 5);
    }

    #[test]
    fn test_dangling_reference_names_target() {
        let mut decl = product_declaration();
        decl.resources[2]
            .attributes
            .insert("role".to_string(), expr("role.OtherRole.arn"));
        let err = Planner::new(RunConfig::new()).plan(&decl).unwrap_err();
        assert!(matches!(
            err,
            PlanError::DanglingReference { ref target, .. } if target == "role.OtherRole"
        ));
    }

    #[test]
    fn test_duplicate_resource() {
        let decl = product_declaration()
            .with_resource(ResourceDecl::new(ResourceKind::Role, "ProductLambdaRole"));
        let err = Planner::new(RunConfig::new()).plan(&decl).unwrap_err();
        assert!(matches!(err, PlanError::DuplicateResource { .. }));
    }

    #[test]
    fn test_max_resources() {
        let err = Planner::new(RunConfig::new().with_max_resources(2))
            .plan(&product_declaration())
            .unwrap_err();
        assert_eq!(err, PlanError::TooManyResources { count: 3, limit: 2 });
    }

    #[test]
    fn test_independent_runs() {
        let planner = Planner::new(RunConfig::new().with_region("us-west-2"));
        let first = planner.plan(&product_declaration()).unwrap();
        let second = planner.plan(&product_declaration()).unwrap();
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(first.create_order, second.create_order);
        assert_eq!(first.edges, second.edges);
        assert_eq!(first.provider.region.as_deref(), Some("us-west-2"));
    }

    #[test]
    fn test_product_api_demo() {
        let decl = Declaration::parse(PRODUCT_API).unwrap();
        let plan = Planner::new(RunConfig::new().with_strict_attributes(true))
            .plan(&decl)
            .unwrap();

        assert_eq!(plan.create_order.len(), decl.resources.len());
        assert_eq!(plan.provider.region.as_deref(), Some("us-east-1"));
        let order = &plan.create_order;
        for edge in &plan.edges {
            let from = order.iter().position(|o| *o == edge.from).unwrap();
            let to = order.iter().position(|o| *o == edge.to).unwrap();
            assert!(to < from, "{} must precede {}", edge.to, edge.from);
        }
        assert!(
            position(order, ResourceKind::Integration, "CreateProductIntegration")
                < position(order, ResourceKind::Deployment, "ProductApiDeployment")
        );
    }

    proptest! {
        // Resource i may only reference resources with a lower index.
        #[test]
        fn prop_plan_is_deterministic(
            links in proptest::collection::vec(proptest::collection::vec(0usize..16, 0..4), 1..16)
        ) {
            let mut decl = Declaration::new();
            for (i, targets) in links.iter().enumerate() {
                let deps: Vec<Value> = targets
                    .iter()
                    .filter(|t| **t < i)
                    .map(|t| expr(&format!("role.r{}", t)))
                    .collect();
                decl = decl.with_resource(
                    ResourceDecl::new(ResourceKind::Role, format!("r{}", i))
                        .with("depends_on", Value::List(deps)),
                );
            }

            let planner = Planner::new(RunConfig::new());
            let first = planner.plan(&decl).unwrap();
            let second = planner.plan(&decl).unwrap();
            prop_assert_eq!(&first.create_order, &second.create_order);
            prop_assert_eq!(first.create_order.len(), links.len());
            for edge in &first.edges {
                let from = first.create_order.iter().position(|o| *o == edge.from).unwrap();
                let to = first.create_order.iter().position(|o| *o == edge.to).unwrap();
                prop_assert!(to < from);
            }
        }

        #[test]
        fn prop_errors_are_deterministic(missing in "[a-z]{1,8}") {
            let decl = product_declaration().with_resource(
                ResourceDecl::new(ResourceKind::Policy, "p")
                    .with("role", expr(&format!("role.missing_{}.id", missing)))
                    .with("policy", Value::String("{}".into())),
            );
            let planner = Planner::new(RunConfig::new());
            let first = planner.plan(&decl).unwrap_err();
            let second = planner.plan(&decl).unwrap_err();
            prop_assert_eq!(first.diagnostic(), second.diagnostic());
        }
    }
}
