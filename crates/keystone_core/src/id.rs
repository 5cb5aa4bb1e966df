//! Identifiers for KEYSTONE entities.
//!
//! Resources are identified by their (kind, logical name) pair. Runs carry a
//! random UUID so diagnostics from independent runs can be told apart.

use crate::error::{CoreError, CoreResult};
use crate::kind::ResourceKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resource identifier - (kind, logical name), unique within a graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    /// Resource kind
    pub kind: ResourceKind,
    /// Logical name
    pub name: String,
}

impl ResourceId {
    /// Create a new resource id
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Create a resource id, checking the logical name
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or contains characters that would
    /// make it unreachable from a reference expression
    pub fn parse(kind: ResourceKind, name: &str) -> CoreResult<Self> {
        if name.is_empty() {
            return Err(CoreError::InvalidId {
                reason: format!("empty name for {} resource", kind),
            });
        }
        let valid = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid || name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(CoreError::InvalidId {
                reason: format!("`{}` is not a valid logical name", name),
            });
        }
        Ok(Self::new(kind, name))
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// Run identifier - identifies a single validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run_{}", self.0)
    }
}
