#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod dispatch;
mod error;
pub mod exemption;
mod identity;
pub mod policy;
pub mod registry;
mod request;
mod tenant;

pub use self::{
    dispatch::{
        Context, Decision, DiscoverTenants, Dispatcher, Handler, PolicyEvent, PublishEvent,
        ReadExclusions, Severity, TenantHandler, TenantRef,
    },
    error::Error,
    exemption::{ClusterExclusions, Exemption},
    identity::{Identity, IdentityKind, Requester},
    policy::{Constraint, Constraints, Policy, Violation},
    registry::{AllowedRegistries, ContainerRegistries},
    request::{GroupKind, Operation, Request},
    tenant::Tenant,
};

pub const POLICY_CONTROLLER_NAME: &str = "tenancy.io/policy-controller";
