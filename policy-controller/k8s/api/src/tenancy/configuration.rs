use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cluster-wide settings for tenant policy enforcement.
///
/// The controller reads a single instance, selected by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(group = "tenancy.io", version = "v1beta1", kind = "TenancyConfiguration")]
#[serde(rename_all = "camelCase")]
pub struct TenancyConfigurationSpec {
    /// Users that are exempt from all tenant policy, in every tenant.
    #[serde(default)]
    pub excluded_users: Vec<String>,
}
