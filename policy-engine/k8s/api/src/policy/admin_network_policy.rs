use super::{
    rule::{EgressRule, IngressRule},
    subject::Subject,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A cluster-scoped policy evaluated before namespaced `NetworkPolicy` resources.
#[derive(Clone, Debug, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "policy.networking.k8s.io",
    version = "v1alpha1",
    kind = "AdminNetworkPolicy",
    shortname = "anp"
)]
#[serde(rename_all = "camelCase")]
pub struct AdminNetworkPolicySpec {
    /// Lower values take precedence. Must be within `0..=1000`.
    pub priority: i32,
    pub subject: Subject,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<IngressRule<AdminNetworkPolicyAction>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<EgressRule<AdminNetworkPolicyAction>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum AdminNetworkPolicyAction {
    Allow,
    Deny,
    /// Skips the remaining admin policies and delegates to namespaced and baseline policies.
    Pass,
}
