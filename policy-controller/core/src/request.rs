use crate::{identity::Requester, Error};
use serde::de::DeserializeOwned;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Connect,
}

/// Identifies a kind of object, independent of API version.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

/// A single attempted mutation, as seen by the dispatcher.
#[derive(Clone, Debug)]
pub struct Request {
    pub uid: String,
    pub kind: GroupKind,

    /// Unset for cluster-scoped objects.
    pub namespace: Option<String>,
    pub name: String,
    pub operation: Operation,

    /// The object as submitted. Unset for deletions.
    pub object: Option<serde_json::Value>,
    pub requester: Requester,
}

// === impl GroupKind ===

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
        }
    }

    /// Builds the group-kind of a typed resource.
    pub fn of<T>() -> Self
    where
        T: tenancy_policy_controller_k8s_api::Resource,
        T::DynamicType: Default,
    {
        let dt = Default::default();
        Self::new(T::group(&dt), T::kind(&dt))
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            return f.write_str(&self.kind);
        }
        write!(f, "{}.{}", self.kind, self.group)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
        })
    }
}

// === impl Request ===

impl Request {
    /// Decodes the submitted object as `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let object = self.object.as_ref().ok_or_else(|| Error::MissingObject {
            kind: self.kind.clone(),
        })?;
        T::deserialize(object).map_err(|source| Error::Decode {
            kind: self.kind.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenancy_policy_controller_k8s_api::Pod;

    fn mk_request(object: Option<serde_json::Value>) -> Request {
        Request {
            uid: "uid".to_string(),
            kind: GroupKind::of::<Pod>(),
            namespace: Some("ns".to_string()),
            name: "pod".to_string(),
            operation: Operation::Create,
            object,
            requester: Requester::from_user_info("alice", vec![]),
        }
    }

    #[test]
    fn decodes_objects() {
        let req = mk_request(Some(serde_json::json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": { "name": "pod", "namespace": "ns" },
            "spec": { "containers": [{ "name": "app", "image": "nginx" }] },
        })));
        let pod = req.decode::<Pod>().expect("pod must decode");
        assert_eq!(pod.spec.unwrap().containers[0].image.as_deref(), Some("nginx"));
    }

    #[test]
    fn decode_errors() {
        let req = mk_request(None);
        assert!(matches!(req.decode::<Pod>(), Err(Error::MissingObject { .. })));

        let req = mk_request(Some(serde_json::json!({ "spec": { "containers": "nope" } })));
        assert!(matches!(req.decode::<Pod>(), Err(Error::Decode { .. })));
    }

    #[test]
    fn display_group_kind() {
        assert_eq!(GroupKind::of::<Pod>().to_string(), "Pod");
        assert_eq!(GroupKind::new("apps", "Deployment").to_string(), "Deployment.apps");
    }
}
