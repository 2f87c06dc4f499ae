use crate::{identity::Identity, registry::AllowedRegistries};
use std::collections::BTreeSet;

/// A tenant's policy, as seen by the admission path.
#[derive(Clone, Debug)]
pub struct Tenant {
    pub name: String,
    pub uid: Option<String>,

    /// Identities that administer the tenant, in declaration order.
    pub owners: Vec<Identity>,

    /// When unset, the tenant places no constraint on registries.
    pub container_registries: Option<AllowedRegistries>,

    /// Namespaces currently bound to the tenant.
    pub namespaces: BTreeSet<String>,
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uid: None,
            owners: Vec::new(),
            container_registries: None,
            namespaces: BTreeSet::new(),
        }
    }

    pub fn is_owner(&self, identity: &Identity) -> bool {
        self.owners.iter().any(|o| o == identity)
    }
}
