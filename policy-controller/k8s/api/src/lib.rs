#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod tenancy;

pub use self::tenancy::{
    configuration::{TenancyConfiguration, TenancyConfigurationSpec},
    tenant::{AllowedRegistriesSpec, OwnerKind, OwnerSpec, Tenant, TenantSpec, TenantStatus},
};
pub use k8s_openapi::{
    api::{
        self,
        authentication::v1::UserInfo,
        core::v1::{Container, EphemeralContainer, ObjectReference, Pod, PodSpec},
    },
    apimachinery,
};
pub use kube::{
    api::{ObjectMeta, ResourceExt},
    runtime::watcher,
    Client, Resource,
};

/// The API group of the tenancy custom resources.
pub const API_GROUP: &str = "tenancy.io";
