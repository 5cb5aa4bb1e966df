//! Resource kinds known to KEYSTONE.
//!
//! The set is closed: every kind has a schema in the planner's catalog.
//! Each kind accepts three spellings in declarations: the short snake_case
//! name, a hyphenated short name, and the provider type name.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a declared infrastructure resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// DynamoDB table
    #[serde(alias = "aws_dynamodb_table")]
    Table,
    /// API Gateway REST API
    #[serde(alias = "rest-api", alias = "aws_api_gateway_rest_api")]
    RestApi,
    /// API Gateway method on a resource path
    #[serde(alias = "aws_api_gateway_method")]
    Method,
    /// API Gateway integration of a method with a backend
    #[serde(alias = "aws_api_gateway_integration")]
    Integration,
    /// Lambda invoke permission
    #[serde(alias = "aws_lambda_permission")]
    Permission,
    /// API Gateway deployment
    #[serde(alias = "aws_api_gateway_deployment")]
    Deployment,
    /// IAM role
    #[serde(alias = "aws_iam_role")]
    Role,
    /// IAM inline role policy
    #[serde(alias = "aws_iam_role_policy")]
    Policy,
    /// Lambda function
    #[serde(alias = "aws_lambda_function")]
    Function,
    /// Application load balancer
    #[serde(alias = "load-balancer", alias = "aws_lb")]
    LoadBalancer,
    /// S3 bucket
    #[serde(alias = "aws_s3_bucket")]
    Bucket,
}

impl ResourceKind {
    /// Every kind, in catalog order
    pub const ALL: [ResourceKind; 11] = [
        Self::Table,
        Self::RestApi,
        Self::Method,
        Self::Integration,
        Self::Permission,
        Self::Deployment,
        Self::Role,
        Self::Policy,
        Self::Function,
        Self::LoadBalancer,
        Self::Bucket,
    ];

    /// Short name used in reference expressions
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::RestApi => "rest_api",
            Self::Method => "method",
            Self::Integration => "integration",
            Self::Permission => "permission",
            Self::Deployment => "deployment",
            Self::Role => "role",
            Self::Policy => "policy",
            Self::Function => "function",
            Self::LoadBalancer => "load_balancer",
            Self::Bucket => "bucket",
        }
    }

    /// Provider resource type this kind maps to
    #[must_use]
    pub const fn provider_type(&self) -> &'static str {
        match self {
            Self::Table => "aws_dynamodb_table",
            Self::RestApi => "aws_api_gateway_rest_api",
            Self::Method => "aws_api_gateway_method",
            Self::Integration => "aws_api_gateway_integration",
            Self::Permission => "aws_lambda_permission",
            Self::Deployment => "aws_api_gateway_deployment",
            Self::Role => "aws_iam_role",
            Self::Policy => "aws_iam_role_policy",
            Self::Function => "aws_lambda_function",
            Self::LoadBalancer => "aws_lb",
            Self::Bucket => "aws_s3_bucket",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized || k.provider_type() == s)
            .ok_or_else(|| CoreError::UnknownKind {
                kind: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_name() {
        assert_eq!("table".parse::<ResourceKind>().unwrap(), ResourceKind::Table);
        assert_eq!(
            "load_balancer".parse::<ResourceKind>().unwrap(),
            ResourceKind::LoadBalancer
        );
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("rest-api".parse::<ResourceKind>().unwrap(), ResourceKind::RestApi);
        assert_eq!(
            "aws_lambda_function".parse::<ResourceKind>().unwrap(),
            ResourceKind::Function
        );
        assert_eq!("aws_lb".parse::<ResourceKind>().unwrap(), ResourceKind::LoadBalancer);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "aws_vpc".parse::<ResourceKind>().unwrap_err();
        assert_eq!(
            err,
            CoreError::UnknownKind {
                kind: "aws_vpc".to_string()
            }
        );
    }

    #[test]
    fn test_display_roundtrips_through_from_str() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.to_string().parse::<ResourceKind>().unwrap(), kind);
            assert_eq!(kind.provider_type().parse::<ResourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_serde_alias() {
        let kind: ResourceKind = serde_json::from_str("\"aws_iam_role\"").unwrap();
        assert_eq!(kind, ResourceKind::Role);
        assert_eq!(serde_json::to_string(&ResourceKind::RestApi).unwrap(), "\"rest_api\"");
    }
}
