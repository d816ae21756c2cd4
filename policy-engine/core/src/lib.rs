//! The policy model and decision logic shared by the engine's index and runtime.
//!
//! Policies are modeled as `Subject`s owning ordered `Rule`s. A `Flow` is evaluated one direction
//! at a time: each rule of each policy whose subject selects the flow's local endpoint yields an
//! `Effect`, and the effects of all three tiers are collapsed by the resolver into a
//! `DirectionResult`:
//!
//! ```text
//! [ Admin ] --Pass--> [ Namespaced ] --no policy--> [ Baseline ] --no match--> allow
//! ```

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod domain_match;
pub mod effect;
pub mod endpoint;
mod network_match;
pub mod peer;
pub mod policy;
pub mod port;
pub mod resolve;
pub mod rule;
pub mod subject;

pub use self::{
    domain_match::{DomainMatch, InvalidDomainName},
    effect::{AllowedResult, DirectionResult, Effect, Verdict},
    endpoint::{ContainerPort, Endpoint, External, Flow, Namespace, Node, Workload},
    network_match::NetworkMatch,
    peer::Peer,
    policy::{Action, AdminPolicy, BaselinePolicy, Direction, NamespacedPolicy, PolicyKind, Rule},
    port::{PortMatch, PortTarget},
    subject::Subject,
};
pub use ipnet::{IpNet, Ipv4Net, Ipv6Net};
pub use policy_engine_k8s_api::{
    labels::{Labels, Selector},
    policy::Protocol,
};
