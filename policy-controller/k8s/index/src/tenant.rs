use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use std::{collections::BTreeSet, sync::Arc};
use tenancy_policy_controller_core::{AllowedRegistries, Identity, Tenant};
use tenancy_policy_controller_k8s_api::{self as k8s, OwnerKind, ResourceExt};
use tracing::{debug, warn};

pub mod metrics;

#[cfg(test)]
mod tests;

pub type SharedIndex = Arc<RwLock<Index>>;

/// Holds every tenant by name along with the namespaces each one claims.
#[derive(Debug, Default)]
pub struct Index {
    tenants: HashMap<String, Arc<Tenant>>,

    /// Tenant names claiming each namespace. Names are ordered so that
    /// conflicting claims always resolve the same way.
    namespaces: HashMap<String, BTreeSet<String>>,
}

// === impl Index ===

impl Index {
    pub fn shared() -> SharedIndex {
        Arc::new(RwLock::new(Self::default()))
    }

    /// Returns the tenants claiming `namespace`, ordered by name.
    pub fn tenants_for_namespace(&self, namespace: &str) -> Vec<Arc<Tenant>> {
        let Some(names) = self.namespaces.get(namespace) else {
            return Vec::new();
        };
        names
            .iter()
            .filter_map(|name| self.tenants.get(name).cloned())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Tenant>> {
        self.tenants.get(name)
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    /// The number of namespaces claimed by at least one tenant.
    pub fn bound_namespaces(&self) -> usize {
        self.namespaces.len()
    }

    /// The number of namespaces claimed by more than one tenant.
    pub fn conflicting_namespaces(&self) -> usize {
        self.namespaces
            .values()
            .filter(|names| names.len() > 1)
            .count()
    }

    fn bind(&mut self, tenant: &Tenant) {
        for ns in &tenant.namespaces {
            let names = self.namespaces.entry(ns.clone()).or_default();
            names.insert(tenant.name.clone());
            if names.len() > 1 {
                warn!(namespace = %ns, tenants = ?names, "Namespace is claimed by multiple tenants");
            }
        }
    }

    fn unbind(&mut self, tenant: &Tenant) {
        for ns in &tenant.namespaces {
            if let Some(names) = self.namespaces.get_mut(ns) {
                names.remove(&tenant.name);
                if names.is_empty() {
                    self.namespaces.remove(ns);
                }
            }
        }
    }
}

impl kubert::index::IndexClusterResource<k8s::Tenant> for Index {
    fn apply(&mut self, resource: k8s::Tenant) {
        let tenant = Arc::new(tenant_from_resource(resource));
        debug!(tenant = %tenant.name, namespaces = tenant.namespaces.len(), "Indexing tenant");

        if let Some(prior) = self.tenants.remove(&tenant.name) {
            self.unbind(&prior);
        }
        self.bind(&tenant);
        self.tenants.insert(tenant.name.clone(), tenant);
    }

    fn delete(&mut self, name: String) {
        if let Some(tenant) = self.tenants.remove(&name) {
            debug!(tenant = %name, "Removing tenant");
            self.unbind(&tenant);
        }
    }
}

fn tenant_from_resource(resource: k8s::Tenant) -> Tenant {
    let mut tenant = Tenant::new(resource.name_unchecked());
    tenant.uid = resource.uid();
    tenant.namespaces = resource.namespaces().map(str::to_string).collect();

    let k8s::Tenant { spec, .. } = resource;
    tenant.owners = spec
        .owners
        .into_iter()
        .map(|owner| match owner.kind {
            OwnerKind::User => Identity::user(owner.name),
            OwnerKind::Group => Identity::group(owner.name),
            OwnerKind::ServiceAccount => Identity::service_account(owner.name),
        })
        .collect();

    tenant.container_registries = spec.container_registries.map(|registries| {
        let (allowed, errors) =
            AllowedRegistries::compile(registries.allowed, &registries.allowed_patterns);
        for error in errors {
            // The pattern never matches, so its registries stay forbidden.
            warn!(tenant = %tenant.name, %error, "Ignoring invalid registry pattern");
        }
        allowed
    });

    tenant
}
