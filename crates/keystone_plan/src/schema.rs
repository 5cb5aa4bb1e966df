//! Resource schemas.
//!
//! A schema fixes, per kind, which attributes a resource accepts, which of
//! them are required, what kind of value each expects, and which outputs
//! other resources may reference. The built-in catalog covers every
//! [`ResourceKind`] and is immutable once built.

use indexmap::{IndexMap, IndexSet};
use keystone_core::{ResourceKind, ValueKind};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Name of the meta-attribute every kind accepts for explicit ordering
pub const DEPENDS_ON: &str = "depends_on";

/// Schema for a single attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSchema {
    /// Expected value kind
    pub kind: ValueKind,
    /// Whether the attribute must be present
    pub required: bool,
}

impl AttributeSchema {
    /// Whether values of this attribute are read as references
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, ValueKind::Reference | ValueKind::ReferenceList)
    }
}

/// Schema for a resource kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSchema {
    /// Kind described
    pub kind: ResourceKind,
    /// Accepted attributes in declaration order
    pub attributes: IndexMap<String, AttributeSchema>,
    /// Outputs other resources may reference
    pub outputs: IndexSet<String>,
}

impl ResourceSchema {
    /// Create a schema accepting only `depends_on` and exposing `id`
    #[must_use]
    pub fn new(kind: ResourceKind) -> Self {
        let mut schema = Self {
            kind,
            attributes: IndexMap::new(),
            outputs: IndexSet::new(),
        };
        schema.attributes.insert(
            DEPENDS_ON.to_string(),
            AttributeSchema {
                kind: ValueKind::ReferenceList,
                required: false,
            },
        );
        schema.outputs.insert("id".to_string());
        schema
    }

    /// Declare a required attribute
    #[must_use]
    pub fn required(mut self, name: &str, kind: ValueKind) -> Self {
        self.attributes
            .insert(name.to_string(), AttributeSchema { kind, required: true });
        self
    }

    /// Declare an optional attribute
    #[must_use]
    pub fn optional(mut self, name: &str, kind: ValueKind) -> Self {
        self.attributes
            .insert(name.to_string(), AttributeSchema { kind, required: false });
        self
    }

    /// Declare referenceable outputs
    #[must_use]
    pub fn outputs(mut self, names: &[&str]) -> Self {
        self.outputs.extend(names.iter().map(|n| (*n).to_string()));
        self
    }

    /// Get an attribute schema
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.get(name)
    }

    /// Whether `name` is a reference-typed attribute
    #[must_use]
    pub fn is_reference(&self, name: &str) -> bool {
        self.attribute(name).is_some_and(AttributeSchema::is_reference)
    }

    /// Whether `output` may be referenced
    #[must_use]
    pub fn exposes(&self, output: &str) -> bool {
        self.outputs.contains(output)
    }

    /// Required attributes in declaration order
    pub fn required_attributes(&self) -> impl Iterator<Item = (&str, &AttributeSchema)> {
        self.attributes
            .iter()
            .filter(|(_, a)| a.required)
            .map(|(n, a)| (n.as_str(), a))
    }
}

/// Set of schemas, one per kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    schemas: IndexMap<ResourceKind, ResourceSchema>,
}

static BUILTIN: Lazy<SchemaCatalog> = Lazy::new(SchemaCatalog::aws);

impl SchemaCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in catalog
    #[must_use]
    pub fn builtin() -> &'static SchemaCatalog {
        &BUILTIN
    }

    /// Add or replace a schema
    #[must_use]
    pub fn with_schema(mut self, schema: ResourceSchema) -> Self {
        self.schemas.insert(schema.kind, schema);
        self
    }

    /// Get the schema for a kind
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> Option<&ResourceSchema> {
        self.schemas.get(&kind)
    }

    /// Iterate schemas in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &ResourceSchema> {
        self.schemas.values()
    }

    /// Number of kinds covered
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    fn aws() -> Self {
        use ValueKind::{Boolean, Number, Reference, String};

        Self::new()
            .with_schema(
                ResourceSchema::new(ResourceKind::Table)
                    .required("hash_key", String)
                    .optional("name", String)
                    .optional("range_key", String)
                    .optional("billing_mode", String)
                    .optional("read_capacity", Number)
                    .optional("write_capacity", Number)
                    .optional("stream_enabled", Boolean)
                    .optional("stream_view_type", String)
                    .outputs(&["arn", "name", "stream_arn"]),
            )
            .with_schema(
                ResourceSchema::new(ResourceKind::RestApi)
                    .required("name", String)
                    .optional("description", String)
                    .outputs(&["arn", "root_resource_id", "execution_arn"]),
            )
            .with_schema(
                ResourceSchema::new(ResourceKind::Method)
                    .required("rest_api_id", Reference)
                    .required("resource_id", Reference)
                    .required("http_method", String)
                    .required("authorization", String)
                    .optional("api_key_required", Boolean)
                    .outputs(&["http_method", "resource_id"]),
            )
            .with_schema(
                ResourceSchema::new(ResourceKind::Integration)
                    .required("rest_api_id", Reference)
                    .required("resource_id", Reference)
                    .required("http_method", Reference)
                    .required("type", String)
                    .required("uri", Reference)
                    .optional("integration_http_method", String)
                    .optional("timeout_milliseconds", Number),
            )
            .with_schema(
                ResourceSchema::new(ResourceKind::Permission)
                    .required("function_name", Reference)
                    .required("action", String)
                    .required("principal", String)
                    .optional("statement_id", String)
                    .optional("source_arn", String),
            )
            .with_schema(
                ResourceSchema::new(ResourceKind::Deployment)
                    .required("rest_api_id", Reference)
                    .optional("stage_name", String)
                    .optional("description", String)
                    .outputs(&["invoke_url", "execution_arn"]),
            )
            .with_schema(
                ResourceSchema::new(ResourceKind::Role)
                    .optional("name", String)
                    .optional("assume_role_policy", String)
                    .optional("description", String)
                    .outputs(&["arn", "name", "unique_id"]),
            )
            .with_schema(
                ResourceSchema::new(ResourceKind::Policy)
                    .required("role", Reference)
                    .required("policy", String)
                    .optional("name", String)
                    .outputs(&["name"]),
            )
            .with_schema(
                ResourceSchema::new(ResourceKind::Function)
                    .required("role", Reference)
                    .optional("table", Reference)
                    .optional("function_name", String)
                    .optional("handler", String)
                    .optional("runtime", String)
                    .optional("filename", String)
                    .optional("source_code_hash", String)
                    .optional("memory_size", Number)
                    .optional("timeout", Number)
                    .optional("publish", Boolean)
                    .outputs(&["arn", "invoke_arn", "function_name", "qualified_arn", "version"]),
            )
            .with_schema(
                ResourceSchema::new(ResourceKind::LoadBalancer)
                    .required("name", String)
                    .optional("internal", Boolean)
                    .optional("load_balancer_type", String)
                    .optional("idle_timeout", Number)
                    .optional("enable_deletion_protection", Boolean)
                    .optional("access_logs_bucket", Reference)
                    .outputs(&["arn", "arn_suffix", "dns_name", "zone_id"]),
            )
            .with_schema(
                ResourceSchema::new(ResourceKind::Bucket)
                    .required("bucket", String)
                    .optional("acl", String)
                    .optional("force_destroy", Boolean)
                    .outputs(&["arn", "bucket", "bucket_domain_name", "region"]),
            )
    }
}
