use crate::{
    admin_network_policy, baseline_admin_network_policy, network_policy,
    shared::{self, SnapshotReader},
    snapshot::Snapshot,
};
use ahash::AHashMap as HashMap;
use anyhow::{ensure, Result};
use parking_lot::RwLock;
use policy_engine_core::{AdminPolicy, BaselinePolicy, NamespacedPolicy};
use policy_engine_k8s_api::policy::{
    AdminNetworkPolicy, BaselineAdminNetworkPolicy, NetworkPolicy,
};
use std::{collections::hash_map::Entry, sync::Arc};
use tracing::{debug, instrument, trace};

pub type SharedIndex = Arc<RwLock<Index>>;

/// Holds all admitted policies. Owned and updated by a single task that processes resource
/// events, publishing a new snapshot to readers on each change.
#[derive(Debug)]
pub struct Index {
    admin: HashMap<String, AdminPolicy>,

    /// Namespaced policies, by namespace and then by name.
    namespaced: HashMap<String, HashMap<String, NamespacedPolicy>>,

    /// The singleton baseline policy.
    baseline: Option<BaselinePolicy>,

    generation: u64,
    writer: shared::Writer,
    reader: SnapshotReader,
}

// === impl Index ===

impl Index {
    pub fn shared() -> (SnapshotReader, SharedIndex) {
        let (writer, reader) = shared::pair();
        let index = Self {
            admin: HashMap::default(),
            namespaced: HashMap::default(),
            baseline: None,
            generation: 0,
            writer,
            reader: reader.clone(),
        };
        (reader, Arc::new(RwLock::new(index)))
    }

    /// Returns a handle that evaluates flows against the most recently published snapshot.
    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    #[instrument(skip_all, fields(name = ?policy.metadata.name))]
    pub fn apply_admin_network_policy(&mut self, policy: AdminNetworkPolicy) -> Result<()> {
        let policy = admin_network_policy::convert(policy)?;
        match self.admin.entry(policy.name.clone()) {
            Entry::Occupied(entry) if *entry.get() == policy => {
                trace!("Unchanged");
                return Ok(());
            }
            Entry::Occupied(mut entry) => {
                debug!(priority = policy.priority, "Updating");
                entry.insert(policy);
            }
            Entry::Vacant(entry) => {
                debug!(priority = policy.priority, "Adding");
                entry.insert(policy);
            }
        }
        self.publish();
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn delete_admin_network_policy(&mut self, name: &str) {
        if self.admin.remove(name).is_some() {
            debug!("Deleted");
            self.publish();
        }
    }

    /// Applies the baseline policy. Only the policy named `default` is admitted.
    #[instrument(skip_all, fields(name = ?policy.metadata.name))]
    pub fn apply_baseline_admin_network_policy(
        &mut self,
        policy: BaselineAdminNetworkPolicy,
    ) -> Result<()> {
        let policy = baseline_admin_network_policy::convert(policy)?;
        ensure!(
            policy.name == BaselineAdminNetworkPolicy::NAME,
            "BaselineAdminNetworkPolicy must be named {:?}",
            BaselineAdminNetworkPolicy::NAME
        );
        if self.baseline.as_ref() == Some(&policy) {
            trace!("Unchanged");
            return Ok(());
        }
        debug!("Applying");
        self.baseline = Some(policy);
        self.publish();
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn delete_baseline_admin_network_policy(&mut self, name: &str) {
        if self.baseline.as_ref().is_some_and(|p| p.name == name) {
            debug!("Deleted");
            self.baseline = None;
            self.publish();
        }
    }

    #[instrument(
        skip_all,
        fields(ns = ?policy.metadata.namespace, name = ?policy.metadata.name)
    )]
    pub fn apply_network_policy(&mut self, policy: NetworkPolicy) -> Result<()> {
        let policy = network_policy::convert(policy)?;
        let by_name = self.namespaced.entry(policy.namespace.clone()).or_default();
        match by_name.entry(policy.name.clone()) {
            Entry::Occupied(entry) if *entry.get() == policy => {
                trace!("Unchanged");
                return Ok(());
            }
            Entry::Occupied(mut entry) => {
                debug!("Updating");
                entry.insert(policy);
            }
            Entry::Vacant(entry) => {
                debug!("Adding");
                entry.insert(policy);
            }
        }
        self.publish();
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn delete_network_policy(&mut self, namespace: &str, name: &str) {
        if let Entry::Occupied(mut entry) = self.namespaced.entry(namespace.to_string()) {
            if entry.get_mut().remove(name).is_none() {
                return;
            }
            if entry.get().is_empty() {
                entry.remove();
            }
            debug!("Deleted");
            self.publish();
        }
    }

    /// Builds a snapshot of the current policies and installs it for readers.
    fn publish(&mut self) {
        self.generation += 1;
        let snapshot = Snapshot::build(
            self.admin.values(),
            self.namespaced.values().flat_map(|by_name| by_name.values()),
            self.baseline.iter(),
        )
        .with_generation(self.generation);
        self.writer.publish(snapshot);
    }
}
