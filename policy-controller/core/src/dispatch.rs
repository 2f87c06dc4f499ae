//! Routes admission requests to per-kind handlers and runs tenant policy.
//!
//! A [`TenantHandler`] decides each request in a single pass:
//!
//! ```text
//! decode -> resolve tenant -> check exemption -> evaluate policy -> decide
//!              |                   |                  |
//!          no tenant            exempt          violation: deny + event
//!              `---> NoOpinion <---'
//! ```
//!
//! The dispatcher holds no mutable state. Tenants and cluster exclusions are
//! read through the [`DiscoverTenants`] and [`ReadExclusions`] collaborators
//! once per decision.

use crate::{
    exemption::{self, ClusterExclusions},
    policy::{Policy, Violation},
    request::{GroupKind, Operation, Request},
    tenant::Tenant,
    Error,
};
use ahash::AHashMap as HashMap;
use std::sync::Arc;
use tracing::{debug, warn};


/// The outcome of an admission request.
#[derive(Debug)]
pub enum Decision {
    /// The engine has no objection. Treated as an allow.
    NoOpinion,

    /// The request is explicitly allowed.
    ///
    /// [`TenantHandler`] never returns this; it answers [`Decision::NoOpinion`]
    /// for compliant requests. Handlers that grant requests outright (for
    /// example, a kind that is always admitted for a tenant) return it, and
    /// it is reported separately in the decision metrics.
    Allowed,

    /// The request violates policy.
    Denied(String),

    /// The engine failed to reach a decision.
    Errored(Error),
}

/// Looks up the tenants that claim a namespace.
#[async_trait::async_trait]
pub trait DiscoverTenants: Send + Sync {
    /// Returns every tenant claiming `namespace`, ordered by tenant name.
    async fn tenants_for_namespace(&self, namespace: &str) -> anyhow::Result<Vec<Arc<Tenant>>>;
}

/// Reads the current cluster-wide exclusions.
#[async_trait::async_trait]
pub trait ReadExclusions: Send + Sync {
    async fn current_exclusions(&self) -> anyhow::Result<Arc<ClusterExclusions>>;
}

/// Publishes observability events. Publishing never fails from the caller's
/// point of view.
pub trait PublishEvent: Send + Sync {
    fn publish(&self, event: PolicyEvent);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyEvent {
    /// The tenant whose policy was applied.
    pub tenant: TenantRef,
    pub severity: Severity,
    pub reason: &'static str,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantRef {
    pub name: String,
    pub uid: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
}

/// Handles admission requests for one kind of object.
///
/// Operations a handler does not override have no opinion.
#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    async fn on_create(&self, _req: &Request) -> Decision {
        Decision::NoOpinion
    }

    async fn on_update(&self, _req: &Request) -> Decision {
        Decision::NoOpinion
    }

    async fn on_delete(&self, _req: &Request) -> Decision {
        Decision::NoOpinion
    }
}

/// Collaborators shared by all tenant handlers.
#[derive(Clone)]
pub struct Context {
    tenants: Arc<dyn DiscoverTenants>,
    exclusions: Arc<dyn ReadExclusions>,
    events: Arc<dyn PublishEvent>,
}

/// Applies a tenant [`Policy`] to requests in tenant namespaces.
pub struct TenantHandler<P> {
    policy: P,
    cx: Context,
}

/// Maps object kinds to their handlers.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<GroupKind, Arc<dyn Handler>>,
}

// === impl Decision ===

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::NoOpinion | Self::Allowed)
    }

    /// A stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoOpinion => "no_opinion",
            Self::Allowed => "allowed",
            Self::Denied(_) => "denied",
            Self::Errored(_) => "errored",
        }
    }
}

// === impl Context ===

impl Context {
    pub fn new(
        tenants: impl DiscoverTenants + 'static,
        exclusions: impl ReadExclusions + 'static,
        events: impl PublishEvent + 'static,
    ) -> Self {
        Self {
            tenants: Arc::new(tenants),
            exclusions: Arc::new(exclusions),
            events: Arc::new(events),
        }
    }

    /// Resolves the tenant owning `namespace`.
    ///
    /// A namespace should be claimed by at most one tenant. If several claim
    /// it, the first (by name) is used.
    pub async fn resolve_tenant(&self, namespace: &str) -> anyhow::Result<Option<Arc<Tenant>>> {
        let tenants = self.tenants.tenants_for_namespace(namespace).await?;
        if tenants.len() > 1 {
            let names = tenants.iter().map(|t| t.name.as_str()).collect::<Vec<_>>();
            warn!(%namespace, tenants = ?names, "Namespace is claimed by multiple tenants; using the first");
        }
        Ok(tenants.into_iter().next())
    }
}

// === impl TenantHandler ===

impl<P: Policy> TenantHandler<P> {
    pub fn new(policy: P, cx: Context) -> Self {
        Self { policy, cx }
    }

    async fn admit(&self, op: Operation, req: &Request) -> Decision {
        if !self.policy.has_opinion(op) {
            return Decision::NoOpinion;
        }

        let object = match req.decode::<P::Object>() {
            Ok(object) => object,
            Err(error) => return Decision::Errored(error),
        };

        // Cluster-scoped objects never belong to a tenant.
        let Some(namespace) = req.namespace.as_deref().filter(|ns| !ns.is_empty()) else {
            return Decision::NoOpinion;
        };

        let tenant = match self.cx.resolve_tenant(namespace).await {
            Ok(Some(tenant)) => tenant,
            Ok(None) => {
                debug!(%namespace, "Namespace does not belong to a tenant");
                return Decision::NoOpinion;
            }
            Err(source) => {
                return Decision::Errored(Error::Resolve {
                    namespace: namespace.to_string(),
                    user: req.requester.name().to_string(),
                    source,
                })
            }
        };

        let exclusions = match self.cx.exclusions.current_exclusions().await {
            Ok(exclusions) => exclusions,
            Err(source) => {
                return Decision::Errored(Error::Exclusions {
                    namespace: namespace.to_string(),
                    tenant: tenant.name.clone(),
                    source,
                })
            }
        };

        if let Some(exemption) = exemption::check(&req.requester, &tenant, &exclusions) {
            debug!(tenant = %tenant.name, %exemption, "Requester is exempt from tenant policy");
            return Decision::NoOpinion;
        }

        let Some(Violation { reason, message }) = self.policy.evaluate(&object, &tenant) else {
            return Decision::NoOpinion;
        };

        debug!(tenant = %tenant.name, %reason, "Policy violated");
        self.cx.events.publish(PolicyEvent {
            tenant: TenantRef {
                name: tenant.name.clone(),
                uid: tenant.uid.clone(),
            },
            severity: Severity::Warning,
            reason,
            message: format!(
                "{} {namespace}/{} requested by {}: {message}",
                req.kind.kind, req.name, req.requester,
            ),
        });
        Decision::Denied(message)
    }
}

#[async_trait::async_trait]
impl<P: Policy> Handler for TenantHandler<P> {
    async fn on_create(&self, req: &Request) -> Decision {
        self.admit(Operation::Create, req).await
    }

    async fn on_update(&self, req: &Request) -> Decision {
        self.admit(Operation::Update, req).await
    }

    async fn on_delete(&self, req: &Request) -> Decision {
        self.admit(Operation::Delete, req).await
    }
}

// === impl Dispatcher ===

impl Dispatcher {
    /// Registers `handler` for objects of `kind`, replacing any prior handler.
    pub fn register(mut self, kind: GroupKind, handler: impl Handler + 'static) -> Self {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = &GroupKind> {
        self.handlers.keys()
    }

    /// Routes `req` to its kind's handler according to its operation.
    pub async fn dispatch(&self, req: &Request) -> Decision {
        match req.operation {
            Operation::Create => self.on_create(req).await,
            Operation::Update => self.on_update(req).await,
            Operation::Delete => self.on_delete(req).await,
            Operation::Connect => Decision::NoOpinion,
        }
    }

    pub async fn on_create(&self, req: &Request) -> Decision {
        match self.handler(&req.kind) {
            Ok(handler) => handler.on_create(req).await,
            Err(error) => Decision::Errored(error),
        }
    }

    pub async fn on_update(&self, req: &Request) -> Decision {
        match self.handler(&req.kind) {
            Ok(handler) => handler.on_update(req).await,
            Err(error) => Decision::Errored(error),
        }
    }

    pub async fn on_delete(&self, req: &Request) -> Decision {
        match self.handler(&req.kind) {
            Ok(handler) => handler.on_delete(req).await,
            Err(error) => Decision::Errored(error),
        }
    }

    fn handler(&self, kind: &GroupKind) -> Result<&Arc<dyn Handler>, Error> {
        self.handlers
            .get(kind)
            .ok_or_else(|| Error::Unsupported { kind: kind.clone() })
    }
}
