use crate::{
    admin_network_policy::{egress_rule, ingress_rule, subject},
    Index,
};
use anyhow::{Context, Result};
use policy_engine_core::{Action, BaselinePolicy};
use policy_engine_k8s_api::{
    policy::{self as api, BaselineAdminNetworkPolicyAction},
    ResourceExt,
};

impl kubert::index::IndexClusterResource<api::BaselineAdminNetworkPolicy> for Index {
    fn apply(&mut self, policy: api::BaselineAdminNetworkPolicy) {
        let name = policy.name_any();
        if let Err(error) = self.apply_baseline_admin_network_policy(policy) {
            tracing::warn!(%name, %error, "Failed to apply BaselineAdminNetworkPolicy");
        }
    }

    fn delete(&mut self, name: String) {
        self.delete_baseline_admin_network_policy(&name);
    }
}

/// Converts a `BaselineAdminNetworkPolicy` resource into a baseline policy.
///
/// Baseline policies have no priority field; the converted policy has priority 0.
pub fn convert(policy: api::BaselineAdminNetworkPolicy) -> Result<BaselinePolicy> {
    let name = policy
        .metadata
        .name
        .context("BaselineAdminNetworkPolicy must have a name")?;
    let spec = policy.spec;

    let ingress = spec
        .ingress
        .into_iter()
        .enumerate()
        .map(|(idx, rule)| {
            ingress_rule(
                &name,
                idx,
                rule.name,
                baseline_action(rule.action),
                rule.from,
                rule.ports,
            )
        })
        .collect();
    let egress = spec
        .egress
        .into_iter()
        .enumerate()
        .map(|(idx, rule)| {
            egress_rule(
                &name,
                idx,
                rule.name,
                baseline_action(rule.action),
                rule.to,
                rule.ports,
            )
        })
        .collect();

    Ok(BaselinePolicy {
        subject: subject(&name, spec.subject),
        name,
        priority: 0,
        ingress,
        egress,
    })
}

fn baseline_action(action: BaselineAdminNetworkPolicyAction) -> Action {
    match action {
        BaselineAdminNetworkPolicyAction::Allow => Action::Allow,
        BaselineAdminNetworkPolicyAction::Deny => Action::Deny,
    }
}
