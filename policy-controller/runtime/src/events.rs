use crate::{
    core::{PolicyEvent, PublishEvent, Severity},
    k8s::{self, ObjectReference, Resource},
};
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::{debug, warn};

/// Records policy events as Kubernetes events regarding the tenant.
///
/// Events are sent from a background task so that admission responses never
/// wait on the API server.
#[derive(Clone)]
pub struct EventRecorder {
    recorder: Recorder,
}

// === impl EventRecorder ===

impl EventRecorder {
    pub fn new(client: k8s::Client, controller: String) -> Self {
        let reporter = Reporter {
            controller,
            instance: std::env::var("HOSTNAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

impl PublishEvent for EventRecorder {
    fn publish(&self, event: PolicyEvent) {
        let recorder = self.recorder.clone();
        tokio::spawn(async move {
            let regarding = tenant_ref(&event);
            let ev = Event {
                type_: match event.severity {
                    Severity::Normal => EventType::Normal,
                    Severity::Warning => EventType::Warning,
                },
                reason: event.reason.to_string(),
                note: Some(event.message),
                action: "Admit".to_string(),
                secondary: None,
            };
            match recorder.publish(&ev, &regarding).await {
                Ok(()) => debug!(tenant = ?regarding.name, reason = %ev.reason, "Published event"),
                Err(error) => {
                    warn!(tenant = ?regarding.name, reason = %ev.reason, %error, "Failed to publish event")
                }
            }
        });
    }
}

fn tenant_ref(event: &PolicyEvent) -> ObjectReference {
    ObjectReference {
        api_version: Some(k8s::Tenant::api_version(&()).into_owned()),
        kind: Some(k8s::Tenant::kind(&()).into_owned()),
        name: Some(event.tenant.name.clone()),
        uid: event.tenant.uid.clone(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TenantRef;
    use crate::core::registry::FORBIDDEN_CONTAINER_REGISTRY;
    use pretty_assertions::assert_eq;

    #[test]
    fn events_regard_the_tenant() {
        let event = PolicyEvent {
            tenant: TenantRef {
                name: "awesome".to_string(),
                uid: Some("awesome-uid".to_string()),
            },
            severity: Severity::Warning,
            reason: FORBIDDEN_CONTAINER_REGISTRY,
            message: "denied".to_string(),
        };
        assert_eq!(
            tenant_ref(&event),
            ObjectReference {
                api_version: Some("tenancy.io/v1beta1".to_string()),
                kind: Some("Tenant".to_string()),
                name: Some("awesome".to_string()),
                uid: Some("awesome-uid".to_string()),
                ..Default::default()
            }
        );
    }
}
