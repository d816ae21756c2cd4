use super::{
    rule::{EgressRule, IngressRule},
    subject::Subject,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A cluster-scoped policy evaluated after namespaced `NetworkPolicy` resources.
///
/// Only a single instance, named `default`, is admitted per cluster.
#[derive(Clone, Debug, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "policy.networking.k8s.io",
    version = "v1alpha1",
    kind = "BaselineAdminNetworkPolicy",
    shortname = "banp"
)]
#[serde(rename_all = "camelCase")]
pub struct BaselineAdminNetworkPolicySpec {
    pub subject: Subject,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<IngressRule<BaselineAdminNetworkPolicyAction>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<EgressRule<BaselineAdminNetworkPolicyAction>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum BaselineAdminNetworkPolicyAction {
    Allow,
    Deny,
}

impl BaselineAdminNetworkPolicy {
    /// The only name a baseline policy may have.
    pub const NAME: &'static str = "default";
}
