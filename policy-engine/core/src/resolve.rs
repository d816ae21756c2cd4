//! Collapses the effects of all tiers into a single decision for one direction of a flow.
//!
//! ```text
//! START
//!   | first admin effect that matched, by (priority, policy, rule)
//!   v
//! ADMIN -- Allow/Deny --> done
//!   | Pass or no match
//!   v
//! NAMESPACED -- any Allow --> allow
//!   | selected but no Allow --> deny
//!   | not selected
//!   v
//! BASELINE -- Allow/Deny --> done
//!   | no match
//!   v
//! DEFAULT allow
//! ```

use crate::{
    effect::{Effect, Verdict},
    policy::PolicyKind,
};
use std::fmt;
use tracing::{debug, trace};

/// A tier's contribution to the trace of a decision.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub tier: Tier,
    pub verdict: Verdict,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tier {
    Policy(PolicyKind),
    /// No tier decided; traffic is allowed.
    Default,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Resolution {
    pub(crate) steps: Vec<Step>,
    pub(crate) allowed: bool,

    /// The index of the deciding effect.
    pub(crate) decided_by: Option<usize>,
}

/// Resolves effects that are already sorted by precedence.
pub(crate) fn resolve(effects: &[Effect]) -> Resolution {
    let mut steps = Vec::with_capacity(3);

    let of_kind = |kind: PolicyKind| {
        effects
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.kind == kind)
    };

    // Admin policies: the first matching rule decides, unless it passes.
    if let Some((idx, effect)) = of_kind(PolicyKind::Admin).find(|(_, e)| e.is_match()) {
        log_priority_tie(effect, of_kind(PolicyKind::Admin).map(|(_, e)| e));
        steps.push(Step::new(PolicyKind::Admin, effect.verdict));
        match effect.verdict {
            Verdict::Allow | Verdict::Deny => {
                return Resolution::decided(steps, effect.verdict, idx);
            }
            Verdict::Pass | Verdict::None => {
                trace!(policy = %effect.policy, "Passed to namespaced policies");
            }
        }
    }

    // Namespaced policies: allow-lists that isolate the pods they select.
    let mut namespaced = of_kind(PolicyKind::Namespaced).peekable();
    if let Some(&(first, _)) = namespaced.peek() {
        let (idx, verdict) = match namespaced.find(|(_, e)| e.verdict == Verdict::Allow) {
            Some((idx, _)) => (idx, Verdict::Allow),
            None => (first, Verdict::Deny),
        };
        steps.push(Step::new(PolicyKind::Namespaced, verdict));
        return Resolution::decided(steps, verdict, idx);
    }

    // Baseline policies: the first matching rule decides. Baseline policies cannot pass.
    let baseline = of_kind(PolicyKind::Baseline).find(|(_, e)| match e.verdict {
        Verdict::Allow | Verdict::Deny => true,
        Verdict::Pass => {
            debug!(policy = %e.policy, rule = ?e.rule_index, "Ignoring pass in baseline policy");
            false
        }
        Verdict::None => false,
    });
    if let Some((idx, effect)) = baseline {
        steps.push(Step::new(PolicyKind::Baseline, effect.verdict));
        return Resolution::decided(steps, effect.verdict, idx);
    }

    steps.push(Step {
        tier: Tier::Default,
        verdict: Verdict::Allow,
    });
    Resolution {
        steps,
        allowed: true,
        decided_by: None,
    }
}

/// Policies of equal priority have no defined order; they are ordered by name. Note when this
/// choice changes the outcome.
fn log_priority_tie<'a>(winner: &Effect, admin: impl Iterator<Item = &'a Effect>) {
    for other in admin {
        if other.priority > winner.priority {
            return;
        }
        if other.is_match() && other.policy != winner.policy && other.verdict != winner.verdict {
            debug!(
                priority = winner.priority,
                chosen = %winner.policy,
                other = %other.policy,
                "Admin policies with equal priority disagree"
            );
            return;
        }
    }
}

// === impl Resolution ===

impl Resolution {
    fn decided(steps: Vec<Step>, verdict: Verdict, idx: usize) -> Self {
        Self {
            steps,
            allowed: verdict == Verdict::Allow,
            decided_by: Some(idx),
        }
    }
}

// === impl Step ===

impl Step {
    fn new(kind: PolicyKind, verdict: Verdict) -> Self {
        Self {
            tier: Tier::Policy(kind),
            verdict,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.tier, self.verdict)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Policy(kind) => kind.fmt(f),
            Self::Default => "Default".fmt(f),
        }
    }
}
