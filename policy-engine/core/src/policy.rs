use crate::{peer::Peer, port::PortMatch, subject::Subject};
use policy_engine_k8s_api::{labels::Selector, NAMESPACE_NAME_LABEL};
use std::fmt;

/// The tier a policy is evaluated in. Tiers are ordered by precedence.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolicyKind {
    Admin,
    Namespaced,
    Baseline,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Allow,
    Deny,
    /// Ends evaluation of the admin tier and delegates to the following tiers.
    Pass,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Ingress,
    Egress,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub name: Option<String>,
    pub action: Action,

    /// Peers are ORed. A rule without peers matches no traffic.
    pub peers: Vec<Peer>,

    /// Ports are ORed. When unset, the rule applies to all ports.
    pub ports: Option<Vec<PortMatch>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminPolicy {
    pub name: String,
    pub priority: i32,
    pub subject: Subject,
    pub ingress: Vec<Rule>,
    pub egress: Vec<Rule>,
}

/// A namespaced network policy. Its rules may only allow traffic; selecting a pod isolates it in
/// each direction the policy governs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespacedPolicy {
    pub namespace: String,
    pub name: String,
    pub pod_selector: Selector,

    /// Unset when the policy does not govern ingress traffic.
    pub ingress: Option<Vec<Rule>>,

    /// Unset when the policy does not govern egress traffic.
    pub egress: Option<Vec<Rule>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaselinePolicy {
    pub name: String,
    pub priority: i32,
    pub subject: Subject,
    pub ingress: Vec<Rule>,
    pub egress: Vec<Rule>,
}

// === impl PolicyKind ===

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => "Admin".fmt(f),
            Self::Namespaced => "NP".fmt(f),
            Self::Baseline => "BANP".fmt(f),
        }
    }
}

// === impl Action ===

impl Action {
    /// Returns true if a clause that cannot be interpreted should match traffic for this action.
    ///
    /// Unknown clauses never widen access: they never allow, but deny (or pass) everything.
    #[inline]
    pub(crate) fn matches_unknown(&self) -> bool {
        !matches!(self, Self::Allow)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => "Allow".fmt(f),
            Self::Deny => "Deny".fmt(f),
            Self::Pass => "Pass".fmt(f),
        }
    }
}

// === impl Direction ===

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingress => "ingress".fmt(f),
            Self::Egress => "egress".fmt(f),
        }
    }
}

// === impl AdminPolicy ===

impl AdminPolicy {
    pub fn rules(&self, direction: Direction) -> &[Rule] {
        match direction {
            Direction::Ingress => &self.ingress,
            Direction::Egress => &self.egress,
        }
    }
}

// === impl BaselinePolicy ===

impl BaselinePolicy {
    pub fn rules(&self, direction: Direction) -> &[Rule] {
        match direction {
            Direction::Ingress => &self.ingress,
            Direction::Egress => &self.egress,
        }
    }
}

// === impl NamespacedPolicy ===

impl NamespacedPolicy {
    /// The pods selected by this policy: pods matching its selector in its own namespace.
    pub fn subject(&self) -> Subject {
        Subject::Pods {
            namespaces: namespace_name_selector(&self.namespace),
            pods: self.pod_selector.clone(),
        }
    }

    /// Returns the policy's rules for the direction, or `None` if it does not govern it.
    pub fn rules(&self, direction: Direction) -> Option<&[Rule]> {
        match direction {
            Direction::Ingress => self.ingress.as_deref(),
            Direction::Egress => self.egress.as_deref(),
        }
    }
}

/// Selects the namespace with the given name.
pub fn namespace_name_selector(namespace: &str) -> Selector {
    Some((NAMESPACE_NAME_LABEL.to_string(), namespace.to_string()))
        .into_iter()
        .collect()
}
