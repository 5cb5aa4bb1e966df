//! Reference expressions.
//!
//! A reference names another resource, `kind.name`, optionally followed by
//! one of that resource's output attributes, `kind.name.attribute`. The
//! expression may be wrapped in interpolation braces, `${kind.name.attr}`.

use crate::error::{CoreError, CoreResult};
use crate::id::ResourceId;
use crate::kind::ResourceKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<kind>[A-Za-z_][A-Za-z0-9_-]*)\.(?P<name>[A-Za-z_][A-Za-z0-9_-]*)(?:\.(?P<attr>[A-Za-z_][A-Za-z0-9_]*))?$",
    )
    .expect("reference pattern is valid")
});

/// A parsed reference to another resource or one of its outputs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Referenced resource
    pub target: ResourceId,
    /// Referenced output attribute, if any
    pub attribute: Option<String>,
}

impl Reference {
    /// Create a reference to a whole resource
    #[must_use]
    pub fn to_resource(target: ResourceId) -> Self {
        Self {
            target,
            attribute: None,
        }
    }

    /// Create a reference to an output attribute
    #[must_use]
    pub fn to_attribute(target: ResourceId, attribute: impl Into<String>) -> Self {
        Self {
            target,
            attribute: Some(attribute.into()),
        }
    }

    /// Split an expression into its `kind`, `name` and optional attribute
    /// segments without interpreting the kind.
    ///
    /// # Errors
    ///
    /// Returns error if the expression is not a two- or three-part path
    pub fn split(expr: &str) -> CoreResult<(&str, &str, Option<&str>)> {
        let inner = unwrap_interpolation(expr.trim());
        let caps = REFERENCE
            .captures(inner)
            .ok_or_else(|| CoreError::MalformedReference {
                expr: expr.to_string(),
                reason: "expected `kind.name` or `kind.name.attribute`".to_string(),
            })?;
        // Named groups `kind` and `name` always participate in a match.
        let kind = caps.name("kind").map_or("", |m| m.as_str());
        let name = caps.name("name").map_or("", |m| m.as_str());
        let attr = caps.name("attr").map(|m| m.as_str());
        Ok((kind, name, attr))
    }

    /// Parse a reference expression
    ///
    /// # Errors
    ///
    /// Returns `MalformedReference` if the syntax is wrong and `UnknownKind`
    /// if the first segment is not a known resource kind
    pub fn parse(expr: &str) -> CoreResult<Self> {
        let (kind, name, attr) = Self::split(expr)?;
        let kind: ResourceKind = kind.parse()?;
        Ok(Self {
            target: ResourceId::new(kind, name),
            attribute: attr.map(str::to_string),
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attr) => write!(f, "{}.{}", self.target, attr),
            None => write!(f, "{}", self.target),
        }
    }
}

fn unwrap_interpolation(expr: &str) -> &str {
    expr.strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .map_or(expr, str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_attribute() {
        let r = Reference::parse("role.ProductLambdaRole.arn").unwrap();
        assert_eq!(r.target, ResourceId::new(ResourceKind::Role, "ProductLambdaRole"));
        assert_eq!(r.attribute.as_deref(), Some("arn"));
    }

    #[test]
    fn test_parse_without_attribute() {
        let r = Reference::parse("table.product_table").unwrap();
        assert_eq!(r, Reference::to_resource(ResourceId::new(ResourceKind::Table, "product_table")));
    }

    #[test]
    fn test_parse_interpolated_provider_type() {
        let r = Reference::parse("${ aws_lambda_function.CreateProductHandler.invoke_arn }").unwrap();
        assert_eq!(r.target.kind, ResourceKind::Function);
        assert_eq!(r.attribute.as_deref(), Some("invoke_arn"));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            Reference::parse("role"),
            Err(CoreError::MalformedReference { .. })
        ));
        assert!(matches!(
            Reference::parse("a.b.c.d"),
            Err(CoreError::MalformedReference { .. })
        ));
        assert!(matches!(
            Reference::parse("arn:aws:iam::aws:policy/AWSLambdaExecute"),
            Err(CoreError::MalformedReference { .. })
        ));
    }

    #[test]
    fn test_parse_unknown_kind() {
        assert!(matches!(
            Reference::parse("vpc.main.id"),
            Err(CoreError::UnknownKind { .. })
        ));
        let (kind, name, attr) = Reference::split("vpc.main.id").unwrap();
        assert_eq!((kind, name, attr), ("vpc", "main", Some("id")));
    }

    #[test]
    fn test_display() {
        let r = Reference::to_attribute(ResourceId::new(ResourceKind::Table, "t"), "name");
        assert_eq!(r.to_string(), "table.t.name");
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_display_parses_back(
            kind in proptest::sample::select(ResourceKind::ALL.to_vec()),
            name in "[A-Za-z_][A-Za-z0-9_-]{0,12}",
            attribute in proptest::option::of("[a-z_][a-z0-9_]{0,8}"),
            interpolated in any::<bool>(),
        ) {
            let target = ResourceId::new(kind, name);
            let reference = match attribute {
                Some(attr) => Reference::to_attribute(target, attr),
                None => Reference::to_resource(target),
            };
            let text = if interpolated {
                format!("${{{}}}", reference)
            } else {
                reference.to_string()
            };
            prop_assert_eq!(Reference::parse(&text).unwrap(), reference);
        }

        #[test]
        fn prop_split_never_panics(expr in "\\PC{0,32}") {
            let _ = Reference::split(&expr);
        }
    }
}
