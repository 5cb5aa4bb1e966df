//! Run configuration.

use crate::decl::ProviderConfig;
use serde::{Deserialize, Serialize};

/// Configuration for one validation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Region overriding the declaration's provider block
    pub region: Option<String>,
    /// Profile overriding the declaration's provider block
    pub profile: Option<String>,
    /// Reject attributes the schema does not declare
    pub strict_attributes: bool,
    /// Maximum number of resources (0 = no limit)
    pub max_resources: usize,
}

impl RunConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set region override
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set profile override
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Set whether undeclared attributes are rejected
    #[must_use]
    pub fn with_strict_attributes(mut self, strict: bool) -> Self {
        self.strict_attributes = strict;
        self
    }

    /// Set maximum resource count
    #[must_use]
    pub fn with_max_resources(mut self, max: usize) -> Self {
        self.max_resources = max;
        self
    }

    /// Provider settings in effect: the declared block (or the default
    /// provider) with this config's overrides applied
    #[must_use]
    pub fn effective_provider(&self, declared: Option<&ProviderConfig>) -> ProviderConfig {
        let mut provider = declared.cloned().unwrap_or_default();
        if let Some(region) = &self.region {
            provider.region = Some(region.clone());
        }
        if let Some(profile) = &self.profile {
            provider.profile = Some(profile.clone());
        }
        provider
    }
}
