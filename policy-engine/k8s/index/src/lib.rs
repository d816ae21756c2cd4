//! Policy Engine Index
//!
//! The index holds every admitted policy resource and publishes immutable snapshots that flows are
//! evaluated against. It indexes the following cluster resources:
//!
//! - Each `AdminNetworkPolicy` selects a subject and orders its rules by priority, ahead of all
//!   namespaced policies.
//! - Each `NetworkPolicy` isolates the pods it selects in its own namespace, allowing only the
//!   traffic its rules describe.
//! - The singleton `BaselineAdminNetworkPolicy`, named `default`, applies to traffic that no other
//!   tier decided.
//!
//! ```text
//! [ AdminNetworkPolicy ] -> [ NetworkPolicy ] -> [ BaselineAdminNetworkPolicy ]
//! ```
//!
//! Resources are converted into the engine's policy model as they are applied. Each change rebuilds
//! a `Snapshot`, in which rules are grouped into targets by subject, and atomically publishes it
//! to readers. Readers never block the writer and always observe a whole snapshot.
//!
//! Conversion fails closed: a subject that cannot be interpreted selects nothing, and a peer or
//! port that cannot be interpreted never allows traffic (but denies or passes everything).

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod admin_network_policy;
mod baseline_admin_network_policy;
mod index;
mod network_policy;
mod shared;
mod snapshot;
mod target;
pub mod workload;


pub use self::{
    admin_network_policy::convert as convert_admin_network_policy,
    baseline_admin_network_policy::convert as convert_baseline_admin_network_policy,
    index::{Index, SharedIndex},
    network_policy::convert as convert_network_policy,
    shared::SnapshotReader,
    snapshot::Snapshot,
};
