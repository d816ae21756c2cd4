use crate::target::Targets;
use policy_engine_core::{
    AdminPolicy, AllowedResult, BaselinePolicy, Direction, DirectionResult, Flow,
    NamespacedPolicy, PolicyKind,
};

/// An immutable view of all policies, against which flows are evaluated.
///
/// Snapshots are never modified once built; changes to the policy set produce a new snapshot.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    generation: u64,
    ingress: Tiers,
    egress: Tiers,
}

/// Targets for each tier, in a single direction.
#[derive(Clone, Debug, Default)]
struct Tiers {
    admin: Targets,
    namespaced: Targets,
    baseline: Targets,
}

// === impl Snapshot ===

impl Snapshot {
    /// Groups the rules of all policies into targets by subject.
    pub fn build<'p>(
        admin: impl IntoIterator<Item = &'p AdminPolicy>,
        namespaced: impl IntoIterator<Item = &'p NamespacedPolicy>,
        baseline: impl IntoIterator<Item = &'p BaselinePolicy>,
    ) -> Self {
        let mut snapshot = Self::default();

        for policy in admin {
            for direction in [Direction::Ingress, Direction::Egress] {
                snapshot.tiers_mut(direction).admin.insert(
                    PolicyKind::Admin,
                    policy.priority,
                    &policy.name,
                    &policy.subject,
                    policy.rules(direction),
                );
            }
        }

        for policy in namespaced {
            let subject = policy.subject();
            let name = format!("{}/{}", policy.namespace, policy.name);
            for direction in [Direction::Ingress, Direction::Egress] {
                // Policies only isolate pods in the directions they govern.
                if let Some(rules) = policy.rules(direction) {
                    snapshot.tiers_mut(direction).namespaced.insert(
                        PolicyKind::Namespaced,
                        0,
                        &name,
                        &subject,
                        rules,
                    );
                }
            }
        }

        for policy in baseline {
            for direction in [Direction::Ingress, Direction::Egress] {
                snapshot.tiers_mut(direction).baseline.insert(
                    PolicyKind::Baseline,
                    policy.priority,
                    &policy.name,
                    &policy.subject,
                    policy.rules(direction),
                );
            }
        }

        tracing::debug!(
            ingress.admin = snapshot.ingress.admin.len(),
            ingress.namespaced = snapshot.ingress.namespaced.len(),
            ingress.baseline = snapshot.ingress.baseline.len(),
            egress.admin = snapshot.egress.admin.len(),
            egress.namespaced = snapshot.egress.namespaced.len(),
            egress.baseline = snapshot.egress.baseline.len(),
            "Built snapshot targets"
        );
        snapshot
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Identifies the snapshot among those published by an index. Increases with each change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Decides whether the flow is allowed. Both directions are evaluated independently.
    pub fn evaluate(&self, flow: &Flow) -> AllowedResult {
        AllowedResult {
            ingress: self.evaluate_direction(flow, Direction::Ingress),
            egress: self.evaluate_direction(flow, Direction::Egress),
        }
    }

    pub fn evaluate_direction(&self, flow: &Flow, direction: Direction) -> DirectionResult {
        let tiers = self.tiers(direction);
        let mut effects = Vec::new();
        tiers.admin.effects(flow, direction, &mut effects);
        tiers.namespaced.effects(flow, direction, &mut effects);
        tiers.baseline.effects(flow, direction, &mut effects);

        let result = DirectionResult::new(direction, effects);
        tracing::trace!(
            %direction,
            effects = result.effects().len(),
            allowed = result.is_allowed(),
            flow = %result.flow(),
            "Evaluated"
        );
        result
    }

    fn tiers(&self, direction: Direction) -> &Tiers {
        match direction {
            Direction::Ingress => &self.ingress,
            Direction::Egress => &self.egress,
        }
    }

    fn tiers_mut(&mut self, direction: Direction) -> &mut Tiers {
        match direction {
            Direction::Ingress => &mut self.ingress,
            Direction::Egress => &mut self.egress,
        }
    }
}
