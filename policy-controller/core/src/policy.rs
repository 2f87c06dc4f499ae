use crate::{request::Operation, tenant::Tenant};
use serde::de::DeserializeOwned;
use std::{fmt, marker::PhantomData};

/// Describes why an object is not admissible for a tenant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// A short, machine-readable reason, used as the event reason.
    pub reason: &'static str,

    /// A human-readable explanation naming the offending value.
    pub message: String,
}

/// A single, independently configurable dimension of tenant policy.
pub trait Constraint<O>: Send + Sync {
    /// Returns the first violation found in `object`, if any.
    ///
    /// Dimensions the tenant has not configured never report a violation.
    fn check(&self, object: &O, tenant: &Tenant) -> Option<Violation>;
}

/// Evaluates objects of a single kind against a tenant's policy.
pub trait Policy: Send + Sync + 'static {
    type Object: DeserializeOwned + Send + Sync;

    /// Indicates whether the policy evaluates requests for `op` at all.
    fn has_opinion(&self, op: Operation) -> bool;

    fn evaluate(&self, object: &Self::Object, tenant: &Tenant) -> Option<Violation>;
}

/// A policy composed of constraints, checked in order.
///
/// Evaluation stops at the first violation.
pub struct Constraints<O> {
    operations: Vec<Operation>,
    constraints: Vec<Box<dyn Constraint<O>>>,
    _object: PhantomData<fn() -> O>,
}

// === impl Constraints ===

impl<O> Constraints<O> {
    /// Creates an empty policy that evaluates requests for `operations`.
    pub fn on(operations: impl IntoIterator<Item = Operation>) -> Self {
        Self {
            operations: operations.into_iter().collect(),
            constraints: Vec::new(),
            _object: PhantomData,
        }
    }

    pub fn push(mut self, constraint: impl Constraint<O> + 'static) -> Self {
        self.constraints.push(Box::new(constraint));
        self
    }
}

impl<O> Policy for Constraints<O>
where
    O: DeserializeOwned + Send + Sync + 'static,
{
    type Object = O;

    fn has_opinion(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    fn evaluate(&self, object: &O, tenant: &Tenant) -> Option<Violation> {
        self.constraints
            .iter()
            .find_map(|constraint| constraint.check(object, tenant))
    }
}

impl<O> fmt::Debug for Constraints<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraints")
            .field("operations", &self.operations)
            .field("constraints", &self.constraints.len())
            .finish()
    }
}
