//! Declarations: the parsed input of a validation run.
//!
//! A declaration is an optional provider block plus an ordered list of
//! resource declarations. It can be read from the text syntax (see
//! [`crate::dsl`]) or from JSON.

use crate::dsl;
use crate::error::{PlanError, PlanResult};
use indexmap::IndexMap;
use keystone_core::{CoreError, CoreResult, ResourceKind, Value};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Provider configuration passed into a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name
    pub name: String,
    /// Target region
    pub region: Option<String>,
    /// Credentials profile
    pub profile: Option<String>,
    /// Other provider settings, kept verbatim
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub settings: IndexMap<String, Value>,
}

impl ProviderConfig {
    /// Create a provider config with no settings
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: None,
            profile: None,
            settings: IndexMap::new(),
        }
    }

    /// Set region
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set profile
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new("aws")
    }
}

/// A single resource declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDecl {
    /// Resource kind
    pub kind: ResourceKind,
    /// Logical name
    pub name: String,
    /// Attributes in declaration order
    pub attributes: IndexMap<String, Value>,
}

impl ResourceDecl {
    /// Create a declaration with no attributes
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            attributes: IndexMap::new(),
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn with(mut self, attribute: &str, value: Value) -> Self {
        self.attributes.insert(attribute.to_string(), value);
        self
    }
}

/// Parsed declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    /// Provider block, if declared
    pub provider: Option<ProviderConfig>,
    /// Resources in declaration order
    pub resources: Vec<ResourceDecl>,
}

impl Declaration {
    /// Create an empty declaration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource
    #[must_use]
    pub fn with_resource(mut self, resource: ResourceDecl) -> Self {
        self.resources.push(resource);
        self
    }

    /// Set the provider block
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Parse the text syntax
    ///
    /// # Errors
    ///
    /// Returns `ParseError` with the offending line
    pub fn parse(input: &str) -> CoreResult<Self> {
        dsl::parse(input)
    }

    /// Parse a JSON declaration
    ///
    /// # Errors
    ///
    /// Returns `InvalidEncoding` if the JSON is malformed or uses a value
    /// shape with no attribute equivalent
    pub fn from_json(input: &str) -> CoreResult<Self> {
        let wire: JsonDeclaration = serde_json::from_str(input)?;
        let provider = wire.provider.map(|p| ProviderConfig {
            name: p.name,
            region: p.region,
            profile: p.profile,
            settings: IndexMap::new(),
        });
        let resources = wire
            .resources
            .into_iter()
            .map(|r| {
                let attributes = r
                    .attributes
                    .into_iter()
                    .map(|(k, v)| json_value(&k, v).map(|v| (k, v)))
                    .collect::<CoreResult<IndexMap<_, _>>>()?;
                Ok(ResourceDecl {
                    kind: r.kind,
                    name: r.name,
                    attributes,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { provider, resources })
    }

    /// Read a declaration from disk; `.json` files are read as JSON and
    /// everything else as the text syntax
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and a core error if it does
    /// not parse
    pub fn load(path: impl AsRef<Path>) -> PlanResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| PlanError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let decl = if is_json {
            Self::from_json(&input)?
        } else {
            Self::parse(&input)?
        };
        Ok(decl)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonDeclaration {
    #[serde(default)]
    provider: Option<JsonProvider>,
    #[serde(default)]
    resources: Vec<JsonResource>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonProvider {
    #[serde(default = "default_provider_name")]
    name: String,
    region: Option<String>,
    profile: Option<String>,
}

fn default_provider_name() -> String {
    "aws".to_string()
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonResource {
    kind: ResourceKind,
    name: String,
    #[serde(default)]
    attributes: IndexMap<String, serde_json::Value>,
}

fn json_value(attribute: &str, value: serde_json::Value) -> CoreResult<Value> {
    use serde_json::Value as Json;

    match value {
        Json::String(s) => Ok(Value::String(s)),
        Json::Number(n) => Ok(Value::Number(n)),
        Json::Bool(b) => Ok(Value::Bool(b)),
        Json::Array(items) => items
            .into_iter()
            .map(|item| json_value(attribute, item))
            .collect::<CoreResult<Vec<_>>>()
            .map(Value::List),
        Json::Object(mut map) if map.len() == 1 => match map.remove("ref") {
            Some(Json::String(expr)) => Ok(Value::Expression(expr)),
            _ => Err(unsupported(attribute)),
        },
        _ => Err(unsupported(attribute)),
    }
}

fn unsupported(attribute: &str) -> CoreError {
    CoreError::InvalidEncoding {
        message: format!(
            "attribute `{}`: expected string, number, boolean, array or {{\"ref\": ...}}",
            attribute
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PRODUCT_JSON: &str = r#"{
        "provider": { "region": "us-east-1" },
        "resources": [
            { "kind": "table", "name": "product_table",
              "attributes": { "hash_key": "product_id", "read_capacity": 5 } },
            { "kind": "aws_iam_role", "name": "ProductLambdaRole" },
            { "kind": "function", "name": "CreateProductHandler",
              "attributes": {
                  "role": { "ref": "role.ProductLambdaRole.arn" },
                  "table": "table.product_table.name",
                  "depends_on": [{ "ref": "table.product_table" }]
              } }
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let decl = Declaration::from_json(PRODUCT_JSON).unwrap();
        let provider = decl.provider.unwrap();
        assert_eq!(provider.name, "aws");
        assert_eq!(provider.region.as_deref(), Some("us-east-1"));
        assert_eq!(decl.resources.len(), 3);
        assert_eq!(decl.resources[1].kind, ResourceKind::Role);

        let function = &decl.resources[2];
        assert_eq!(
            function.attributes.get("role"),
            Some(&Value::Expression("role.ProductLambdaRole.arn".into()))
        );
        assert_eq!(
            function.attributes.get("table"),
            Some(&Value::String("table.product_table.name".into()))
        );
        assert!(matches!(function.attributes.get("depends_on"), Some(Value::List(items)) if items.len() == 1));
    }

    #[test]
    fn test_from_json_rejects_null() {
        let err = Declaration::from_json(
            r#"{ "resources": [ { "kind": "role", "name": "r", "attributes": { "name": null } } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidEncoding { ref message } if message.contains("`name`")));
    }

    #[test]
    fn test_from_json_unknown_kind() {
        let err = Declaration::from_json(r#"{ "resources": [ { "kind": "vpc", "name": "main" } ] }"#)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidEncoding { .. }));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("stack.json");
        std::fs::File::create(&json_path)
            .unwrap()
            .write_all(PRODUCT_JSON.as_bytes())
            .unwrap();
        assert_eq!(Declaration::load(&json_path).unwrap().resources.len(), 3);

        let text_path = dir.path().join("stack.ks");
        std::fs::write(&text_path, "resource \"role\" \"r\" {}\n").unwrap();
        assert_eq!(Declaration::load(&text_path).unwrap().resources.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Declaration::load(dir.path().join("absent.ks")).unwrap_err();
        assert!(matches!(err, PlanError::Io { .. }));
    }

    #[test]
    fn test_builders() {
        let decl = Declaration::new()
            .with_provider(ProviderConfig::default().with_region("eu-west-1"))
            .with_resource(ResourceDecl::new(ResourceKind::Bucket, "b").with("bucket", Value::String("b".into())));
        assert_eq!(decl.resources[0].attributes.len(), 1);
        assert_eq!(decl.provider.unwrap().region.as_deref(), Some("eu-west-1"));
    }
}
