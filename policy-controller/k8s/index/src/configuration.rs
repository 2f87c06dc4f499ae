use parking_lot::RwLock;
use std::sync::Arc;
use tenancy_policy_controller_core::ClusterExclusions;
use tenancy_policy_controller_k8s_api::{ResourceExt, TenancyConfiguration};
use tracing::{debug, info};

pub type SharedIndex = Arc<RwLock<Index>>;

/// Tracks the cluster exclusions of the one `TenancyConfiguration` this
/// controller is configured to read. Other configurations are ignored.
///
/// When the configuration does not exist, nobody is excluded.
#[derive(Debug)]
pub struct Index {
    name: String,
    exclusions: Arc<ClusterExclusions>,
}

// === impl Index ===

impl Index {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exclusions: Default::default(),
        }
    }

    pub fn shared(name: impl Into<String>) -> SharedIndex {
        Arc::new(RwLock::new(Self::new(name)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exclusions(&self) -> Arc<ClusterExclusions> {
        self.exclusions.clone()
    }
}

impl kubert::index::IndexClusterResource<TenancyConfiguration> for Index {
    fn apply(&mut self, config: TenancyConfiguration) {
        let name = config.name_unchecked();
        if name != self.name {
            debug!(configuration = %name, "Ignoring configuration");
            return;
        }

        let exclusions = config.spec.excluded_users.into_iter().collect::<ClusterExclusions>();
        info!(configuration = %name, excluded = exclusions.len(), "Updated cluster exclusions");
        self.exclusions = Arc::new(exclusions);
    }

    fn delete(&mut self, name: String) {
        if name == self.name {
            info!(configuration = %name, "Configuration deleted; clearing cluster exclusions");
            self.exclusions = Default::default();
        }
    }
}
