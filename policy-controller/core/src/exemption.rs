use crate::{identity::Requester, tenant::Tenant};
use std::{collections::BTreeSet, fmt};

/// Identity names that are exempt from all tenant policy, cluster-wide.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterExclusions(BTreeSet<String>);

/// The reason a requester bypasses a tenant's policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Exemption {
    /// The requester, or one of its groups, owns the tenant.
    Owner,

    /// The requester is listed in the cluster-wide exclusions.
    ClusterExcluded,
}

/// Determines whether `requester` is exempt from `tenant`'s policy.
///
/// Tenant ownership is checked before cluster exclusions.
pub fn check(
    requester: &Requester,
    tenant: &Tenant,
    exclusions: &ClusterExclusions,
) -> Option<Exemption> {
    if requester.identities().any(|id| tenant.is_owner(&id)) {
        return Some(Exemption::Owner);
    }

    if exclusions.contains(requester.name()) {
        return Some(Exemption::ClusterExcluded);
    }

    None
}

pub fn is_exempt(requester: &Requester, tenant: &Tenant, exclusions: &ClusterExclusions) -> bool {
    check(requester, tenant, exclusions).is_some()
}

// === impl ClusterExclusions ===

impl ClusterExclusions {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<S: Into<String>> FromIterator<S> for ClusterExclusions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Exemption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Owner => "tenant owner",
            Self::ClusterExcluded => "cluster exclusion",
        })
    }
}
