use crate::request::GroupKind;
use std::time::Duration;
use thiserror::Error;

/// Failures that prevent the engine from reaching a decision.
///
/// These are never policy denials: a request that fails with an `Error` is
/// reported as errored, not as disallowed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to decode {kind}: {source}")]
    Decode {
        kind: GroupKind,
        source: serde_json::Error,
    },

    #[error("admission request for {kind} is missing its object")]
    MissingObject { kind: GroupKind },

    #[error("failed to resolve the tenant of namespace {namespace} for {user}: {source}")]
    Resolve {
        namespace: String,
        user: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to read cluster exclusions for tenant {tenant} (namespace {namespace}): {source}")]
    Exclusions {
        namespace: String,
        tenant: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unsupported resource type: {kind}")]
    Unsupported { kind: GroupKind },

    #[error("admission decision timed out after {0:?}")]
    Timeout(Duration),
}
