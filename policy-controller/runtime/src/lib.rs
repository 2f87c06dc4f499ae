pub use tenancy_policy_controller_core as core;
pub use tenancy_policy_controller_k8s_api as k8s;
pub use tenancy_policy_controller_k8s_index as index;

mod admission;
mod args;
mod events;
mod metrics;

pub use self::args::Args;

use std::sync::Arc;

/// Resolves namespaces against the tenant index.
#[derive(Clone, Debug)]
struct TenantDiscover(index::tenant::SharedIndex);

/// Reads cluster exclusions from the configuration index.
#[derive(Clone, Debug)]
struct ExclusionsDiscover(index::configuration::SharedIndex);

impl TenantDiscover {
    pub fn new(index: index::tenant::SharedIndex) -> Self {
        Self(index)
    }
}

impl ExclusionsDiscover {
    pub fn new(index: index::configuration::SharedIndex) -> Self {
        Self(index)
    }
}

#[async_trait::async_trait]
impl core::DiscoverTenants for TenantDiscover {
    async fn tenants_for_namespace(
        &self,
        namespace: &str,
    ) -> anyhow::Result<Vec<Arc<core::Tenant>>> {
        Ok(self.0.read().tenants_for_namespace(namespace))
    }
}

#[async_trait::async_trait]
impl core::ReadExclusions for ExclusionsDiscover {
    async fn current_exclusions(&self) -> anyhow::Result<Arc<core::ClusterExclusions>> {
        Ok(self.0.read().exclusions())
    }
}
