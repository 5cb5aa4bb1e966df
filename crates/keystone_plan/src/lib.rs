//! KEYSTONE Planner
//!
//! Validates declarative infrastructure before it reaches a provisioning
//! engine: registers typed resources, resolves the references between
//! them into a dependency graph, rejects cycles and incomplete resources,
//! and produces a deterministic creation order.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod decl;
pub mod dsl;
pub mod error;
pub mod graph;
pub mod planner;
pub mod registry;
pub mod resolve;
pub mod schema;
pub mod validate;

pub use config::RunConfig;
pub use decl::{Declaration, ProviderConfig, ResourceDecl};
pub use error::{Diagnostic, Incompleteness, PlanError, PlanResult};
pub use graph::{DependencyGraph, Edge};
pub use planner::{Plan, Planner};
pub use registry::{Resource, ResourceRegistry};
pub use resolve::Resolver;
pub use schema::{AttributeSchema, ResourceSchema, SchemaCatalog, DEPENDS_ON};
pub use validate::Validator;
