pub mod admin_network_policy;
pub mod baseline_admin_network_policy;
pub mod network;
pub mod peer;
pub mod port;
pub mod rule;
pub mod subject;

pub use self::{
    admin_network_policy::{AdminNetworkPolicy, AdminNetworkPolicyAction, AdminNetworkPolicySpec},
    baseline_admin_network_policy::{
        BaselineAdminNetworkPolicy, BaselineAdminNetworkPolicyAction,
        BaselineAdminNetworkPolicySpec,
    },
    network::{Cidr, CidrParseError},
    peer::{EgressPeer, IngressPeer},
    port::{Port, PortNumber, PortRange, Protocol, UnknownProtocol},
    rule::{EgressRule, IngressRule},
    subject::{NamespacedPod, Subject},
};
pub use k8s_openapi::api::networking::v1::{
    IPBlock, NetworkPolicy, NetworkPolicyEgressRule, NetworkPolicyIngressRule, NetworkPolicyPeer,
    NetworkPolicyPort, NetworkPolicySpec,
};
