//! Policy Engine Runtime
//!
//! Combines admission, indexing and evaluation behind a single `Engine` handle. Admin and baseline
//! policies are validated before they reach the index; flows are evaluated against the most
//! recently published snapshot without blocking updates.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use policy_engine_core as core;
pub use policy_engine_k8s_api as k8s;
pub use policy_engine_k8s_index as index;

mod admission;
mod args;
pub mod validation;


pub use self::{
    admission::{Admission, Validate},
    args::{Args, LogFormat},
};
use self::{
    core::{AllowedResult, Endpoint, Flow, IpNet},
    k8s::{
        policy::{AdminNetworkPolicy, BaselineAdminNetworkPolicy, NetworkPolicy},
        ResourceExt,
    },
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;

/// Admits policies into a shared index and evaluates flows against it.
///
/// Clones share the same index.
#[derive(Clone, Debug)]
pub struct Engine {
    index: index::SharedIndex,
    reader: index::SnapshotReader,

    /// Unset when admission is disabled.
    admission: Option<Admission>,
    cluster_networks: Arc<[IpNet]>,
}

// === impl Engine ===

impl Engine {
    pub fn new(cluster_networks: Vec<IpNet>, admission: bool) -> Self {
        let (reader, index) = index::Index::shared();
        Self {
            index,
            reader,
            admission: admission.then(Admission::default),
            cluster_networks: cluster_networks.into(),
        }
    }

    pub fn reader(&self) -> index::SnapshotReader {
        self.reader.clone()
    }

    pub fn apply_admin_network_policy(&self, policy: AdminNetworkPolicy) -> Result<()> {
        let name = policy.name_any();
        if let Some(admission) = self.admission.as_ref() {
            admission
                .validate(&name, &policy.spec)
                .with_context(|| format!("AdminNetworkPolicy {name} rejected"))?;
        }
        self.index.write().apply_admin_network_policy(policy)
    }

    pub fn delete_admin_network_policy(&self, name: &str) {
        self.index.write().delete_admin_network_policy(name);
    }

    pub fn apply_baseline_admin_network_policy(
        &self,
        policy: BaselineAdminNetworkPolicy,
    ) -> Result<()> {
        let name = policy.name_any();
        if let Some(admission) = self.admission.as_ref() {
            admission
                .validate(&name, &policy.spec)
                .with_context(|| format!("BaselineAdminNetworkPolicy {name} rejected"))?;
        }
        self.index.write().apply_baseline_admin_network_policy(policy)
    }

    pub fn delete_baseline_admin_network_policy(&self, name: &str) {
        self.index.write().delete_baseline_admin_network_policy(name);
    }

    pub fn apply_network_policy(&self, policy: NetworkPolicy) -> Result<()> {
        self.index.write().apply_network_policy(policy)
    }

    pub fn delete_network_policy(&self, namespace: &str, name: &str) {
        self.index.write().delete_network_policy(namespace, name);
    }

    /// Evaluates a flow against the current policies.
    ///
    /// External endpoints with in-cluster addresses are still evaluated, but are noted since
    /// they escape the policies that apply to the pod or node at that address.
    pub fn evaluate(&self, flow: &Flow) -> AllowedResult {
        for endpoint in [&flow.source, &flow.destination] {
            if let Endpoint::External(ext) = endpoint {
                if self.cluster_networks.iter().any(|net| net.contains(&ext.ip)) {
                    warn!(ip = %ext.ip, "External endpoint is within the cluster networks");
                }
            }
        }
        self.reader.evaluate(flow)
    }
}
