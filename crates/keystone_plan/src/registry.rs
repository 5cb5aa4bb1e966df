//! Resource registry.
//!
//! The registry owns every resource of one validation run. Insertion order
//! is kept because it decides tie-breaking in the topological sort and the
//! order diagnostics are found in.

use crate::error::{PlanError, PlanResult};
use crate::schema::{ResourceSchema, SchemaCatalog};
use indexmap::IndexMap;
use keystone_core::{CoreError, ResourceId, ResourceKind, Value};
use serde::{Deserialize, Serialize};

/// A declared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// (kind, name)
    pub id: ResourceId,
    /// Attributes in declaration order
    pub attributes: IndexMap<String, Value>,
}

impl Resource {
    /// Create a resource
    #[must_use]
    pub fn new(id: ResourceId, attributes: IndexMap<String, Value>) -> Self {
        Self { id, attributes }
    }

    /// Resource kind
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.id.kind
    }

    /// Get an attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Registry of resources for a single run
pub struct ResourceRegistry<'c> {
    catalog: &'c SchemaCatalog,
    resources: IndexMap<ResourceId, Resource>,
}

impl<'c> ResourceRegistry<'c> {
    /// Create an empty registry over a schema catalog
    #[must_use]
    pub fn new(catalog: &'c SchemaCatalog) -> Self {
        Self {
            catalog,
            resources: IndexMap::new(),
        }
    }

    /// Register a resource
    ///
    /// # Errors
    ///
    /// Returns `DuplicateResource` if (kind, name) is already registered and
    /// `UnknownKind` if the catalog has no schema for `kind`
    pub fn register(
        &mut self,
        kind: ResourceKind,
        name: &str,
        attributes: IndexMap<String, Value>,
    ) -> PlanResult<&Resource> {
        if self.catalog.get(kind).is_none() {
            return Err(CoreError::UnknownKind {
                kind: kind.to_string(),
            }
            .into());
        }
        let id = ResourceId::parse(kind, name)?;
        if self.resources.contains_key(&id) {
            return Err(PlanError::DuplicateResource { id });
        }

        let resource: &Resource = self
            .resources
            .entry(id.clone())
            .or_insert(Resource::new(id, attributes));
        Ok(resource)
    }

    /// Look up a resource
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` if (kind, name) is not registered
    pub fn lookup(&self, kind: ResourceKind, name: &str) -> PlanResult<&Resource> {
        let id = ResourceId::new(kind, name);
        match self.resources.get(&id) {
            Some(resource) => Ok(resource),
            None => Err(PlanError::UnknownResource { id }),
        }
    }

    /// All resources in insertion order.
    ///
    /// The iterator borrows the registry and may be cloned or requested
    /// again to restart from the first resource.
    pub fn all(&self) -> impl Iterator<Item = &Resource> + Clone + '_ {
        self.resources.values()
    }

    /// Schema for a kind
    #[must_use]
    pub fn schema(&self, kind: ResourceKind) -> Option<&'c ResourceSchema> {
        self.catalog.get(kind)
    }

    /// Schema catalog in use
    #[must_use]
    pub fn catalog(&self) -> &'c SchemaCatalog {
        self.catalog
    }

    /// Whether (kind, name) is registered
    #[must_use]
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.resources.contains_key(id)
    }

    /// Number of registered resources
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
