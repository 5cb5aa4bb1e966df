//! Planning errors and the structured diagnostics built from them.
//!
//! Every error aborts the run it occurs in. None is retried and none is
//! reported as a warning.

use keystone_core::{CoreError, ResourceId, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Planner result type
pub type PlanResult<T> = Result<T, PlanError>;

/// What is wrong with a required or declared attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum Incompleteness {
    /// Required attribute is absent
    Missing {
        /// Kind the schema expects
        expected: ValueKind,
    },
    /// Attribute is present with a value of the wrong kind
    Mismatch {
        /// Kind the schema expects
        expected: ValueKind,
        /// Rendering of the value found
        found: String,
    },
}

impl fmt::Display for Incompleteness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { expected } => write!(f, "missing required {}", expected),
            Self::Mismatch { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
        }
    }
}

/// Planner error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// (kind, name) registered twice
    #[error("Duplicate resource: {id}")]
    DuplicateResource {
        /// Resource id
        id: ResourceId,
    },

    /// Lookup miss
    #[error("Unknown resource: {id}")]
    UnknownResource {
        /// Resource id
        id: ResourceId,
    },

    /// Reference to a resource or output that does not exist
    #[error("Dangling reference in {from} attribute `{attribute}`: {}", dangling_target(.target, .output.as_deref()))]
    DanglingReference {
        /// Resource holding the reference
        from: ResourceId,
        /// Attribute holding the reference
        attribute: String,
        /// Referenced `kind.name`
        target: String,
        /// Referenced output attribute, if the target exists but lacks it
        output: Option<String>,
    },

    /// Dependency cycle; each member listed once in traversal order
    #[error("Cyclic dependency: {}", cycle_path(.path))]
    CyclicDependency {
        /// Cycle members
        path: Vec<ResourceId>,
    },

    /// Required attribute missing or of the wrong kind
    #[error("Incomplete resource {id}: attribute `{attribute}` {problem}")]
    IncompleteResource {
        /// Resource id
        id: ResourceId,
        /// Attribute name
        attribute: String,
        /// What is wrong
        problem: Incompleteness,
    },

    /// Attribute the schema does not declare (strict mode)
    #[error("Undeclared attribute `{attribute}` on {id}")]
    UndeclaredAttribute {
        /// Resource id
        id: ResourceId,
        /// Attribute name
        attribute: String,
    },

    /// Declaration larger than the configured limit
    #[error("Declaration has {count} resources, limit is {limit}")]
    TooManyResources {
        /// Resources declared
        count: usize,
        /// Configured limit
        limit: usize,
    },

    /// Declaration could not be read
    #[error("Failed to read {path}: {message}")]
    Io {
        /// File path
        path: String,
        /// OS error message
        message: String,
    },

    /// Parse or encoding failure
    #[error(transparent)]
    Core(#[from] CoreError),
}

fn dangling_target(target: &str, output: Option<&str>) -> String {
    match output {
        Some(output) => format!("{} has no output `{}`", target, output),
        None => format!("{} does not exist", target),
    }
}

fn cycle_path(path: &[ResourceId]) -> String {
    let mut parts: Vec<String> = path.iter().map(ToString::to_string).collect();
    if let Some(first) = parts.first().cloned() {
        parts.push(first);
    }
    parts.join(" -> ")
}

impl PlanError {
    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateResource { .. } => "duplicate_resource",
            Self::UnknownResource { .. } => "unknown_resource",
            Self::DanglingReference { .. } => "dangling_reference",
            Self::CyclicDependency { .. } => "cyclic_dependency",
            Self::IncompleteResource { .. } => "incomplete_resource",
            Self::UndeclaredAttribute { .. } => "undeclared_attribute",
            Self::TooManyResources { .. } => "too_many_resources",
            Self::Io { .. } => "io",
            Self::Core(CoreError::ParseError { .. }) => "parse",
            Self::Core(CoreError::UnknownKind { .. }) => "unknown_kind",
            Self::Core(CoreError::InvalidId { .. }) => "invalid_id",
            Self::Core(_) => "invalid_input",
        }
    }

    /// Whether this error describes a malformed declaration rather than
    /// unreadable input
    #[must_use]
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::Io { .. }
                | Self::Core(CoreError::ParseError { .. } | CoreError::InvalidEncoding { .. })
        )
    }

    /// Resource the error points at, if any
    #[must_use]
    pub fn resource(&self) -> Option<&ResourceId> {
        match self {
            Self::DuplicateResource { id }
            | Self::UnknownResource { id }
            | Self::IncompleteResource { id, .. }
            | Self::UndeclaredAttribute { id, .. } => Some(id),
            Self::DanglingReference { from, .. } => Some(from),
            Self::CyclicDependency { path } => path.first(),
            _ => None,
        }
    }

    /// Attribute the error points at, if any
    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::DanglingReference { attribute, .. }
            | Self::IncompleteResource { attribute, .. }
            | Self::UndeclaredAttribute { attribute, .. } => Some(attribute),
            _ => None,
        }
    }

    /// Build the structured diagnostic for this error
    #[must_use]
    pub fn diagnostic(&self) -> Diagnostic {
        let cycle = match self {
            Self::CyclicDependency { path } => path.iter().map(ToString::to_string).collect(),
            _ => Vec::new(),
        };
        Diagnostic {
            code: self.code().to_string(),
            resource: self.resource().map(ToString::to_string),
            attribute: self.attribute().map(str::to_string),
            message: self.to_string(),
            cycle,
        }
    }
}

/// Structured diagnostic surfaced to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Error code, see [`PlanError::code`]
    pub code: String,
    /// Offending resource as `kind.name`
    pub resource: Option<String>,
    /// Offending attribute
    pub attribute: Option<String>,
    /// Human-readable message
    pub message: String,
    /// Cycle members for `cyclic_dependency`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cycle: Vec<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}", self.code, self.message)
    }
}
