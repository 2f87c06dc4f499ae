use crate::core::{Decision, GroupKind, Operation};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

#[derive(Clone, Debug, Default)]
pub struct AdmissionMetrics {
    decisions: Family<DecisionLabels, Counter>,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct DecisionLabels {
    kind: String,
    operation: String,
    decision: &'static str,
}

// === impl AdmissionMetrics ===

impl AdmissionMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let decisions = Family::<DecisionLabels, Counter>::default();
        reg.register(
            "decisions",
            "Total number of admission decisions",
            decisions.clone(),
        );
        Self { decisions }
    }

    pub fn observe(&self, kind: &GroupKind, operation: Operation, decision: &Decision) {
        self.decisions
            .get_or_create(&DecisionLabels {
                kind: kind.to_string(),
                operation: operation.to_string(),
                decision: decision.as_str(),
            })
            .inc();
    }

    #[cfg(test)]
    pub fn count(&self, kind: &GroupKind, operation: Operation, decision: &'static str) -> u64 {
        self.decisions
            .get_or_create(&DecisionLabels {
                kind: kind.to_string(),
                operation: operation.to_string(),
                decision,
            })
            .get()
    }
}
