use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Groups a set of namespaces under shared owners and shared constraints.
#[derive(Clone, Debug, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "tenancy.io",
    version = "v1beta1",
    kind = "Tenant",
    status = "TenantStatus",
    printcolumn = r#"{"name":"Namespaces","type":"integer","jsonPath":".status.size"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TenantSpec {
    /// Identities that manage the tenant. Owners are never subject to the
    /// tenant's own constraints.
    #[serde(default)]
    pub owners: Vec<OwnerSpec>,

    /// Restricts the registries that workloads in the tenant may pull from.
    pub container_registries: Option<AllowedRegistriesSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantStatus {
    /// Namespaces currently bound to the tenant.
    #[serde(default)]
    pub namespaces: Vec<String>,

    #[serde(default)]
    pub size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub struct OwnerSpec {
    pub kind: OwnerKind,
    pub name: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum OwnerKind {
    User,
    Group,
    ServiceAccount,
}

/// An allow-list of container registries.
///
/// A registry is allowed when it equals one of `allowed` or matches one of
/// `allowedPatterns`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllowedRegistriesSpec {
    #[serde(default)]
    pub allowed: Vec<String>,

    #[serde(default)]
    pub allowed_patterns: Vec<String>,
}

impl Tenant {
    /// Returns the namespaces bound to this tenant, as reported in its status.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.status
            .iter()
            .flat_map(|status| status.namespaces.iter().map(String::as_str))
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "User",
            Self::Group => "Group",
            Self::ServiceAccount => "ServiceAccount",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserializes_tenant() {
        let tenant: Tenant = serde_json::from_value(serde_json::json!({
            "apiVersion": "tenancy.io/v1beta1",
            "kind": "Tenant",
            "metadata": { "name": "awesome" },
            "spec": {
                "owners": [{
                    "kind": "ServiceAccount",
                    "name": "system:serviceaccount:gitops-namespace:excluded-service-account",
                }],
                "containerRegistries": {
                    "allowed": ["docker.io"],
                    "allowedPatterns": ["^.*\\.internal\\.example\\.com$"],
                },
            },
            "status": {
                "namespaces": ["awesome-dev", "awesome-prod"],
                "size": 2,
            },
        }))
        .expect("tenant must deserialize");

        assert_eq!(tenant.spec.owners[0].kind, OwnerKind::ServiceAccount);
        assert_eq!(
            tenant.spec.container_registries,
            Some(AllowedRegistriesSpec {
                allowed: vec!["docker.io".to_string()],
                allowed_patterns: vec!["^.*\\.internal\\.example\\.com$".to_string()],
            })
        );
        assert_eq!(
            tenant.namespaces().collect::<Vec<_>>(),
            vec!["awesome-dev", "awesome-prod"]
        );
    }

    #[test]
    fn tenant_is_cluster_scoped() {
        let tenant = Tenant::new(
            "awesome",
            TenantSpec {
                owners: vec![],
                container_registries: None,
            },
        );
        assert_eq!(Tenant::group(&()), crate::API_GROUP);
        assert!(tenant.meta().namespace.is_none());
        assert_eq!(tenant.namespaces().count(), 0);
    }
}
