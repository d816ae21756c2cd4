use crate::{
    policy::{Action, Direction, PolicyKind},
    resolve::{self, Resolution, Step},
};
use std::fmt;

/// The outcome of evaluating one rule against a flow.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    Allow,
    Deny,
    Pass,
    /// The rule did not match.
    None,
}

/// A single rule's contribution to a decision.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Effect {
    pub kind: PolicyKind,
    pub verdict: Verdict,

    /// The policy's priority. Namespaced policies have no priority and always use zero.
    pub priority: i32,

    /// The rule's position within its policy. Unset for the isolation marker a namespaced policy
    /// without rules contributes.
    pub rule_index: Option<usize>,
    pub policy: String,
    pub rule_name: Option<String>,
}

/// The decision for one direction of a flow, along with every effect that contributed to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectionResult {
    direction: Direction,
    effects: Vec<Effect>,
    resolution: Resolution,
}

/// The decision for a flow. A flow is allowed only if both directions allow it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowedResult {
    pub ingress: DirectionResult,
    pub egress: DirectionResult,
}

// === impl Verdict ===

impl From<Action> for Verdict {
    fn from(action: Action) -> Self {
        match action {
            Action::Allow => Self::Allow,
            Action::Deny => Self::Deny,
            Action::Pass => Self::Pass,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => "Allow".fmt(f),
            Self::Deny => "Deny".fmt(f),
            Self::Pass => "Pass".fmt(f),
            Self::None => "None".fmt(f),
        }
    }
}

// === impl Effect ===

impl Effect {
    #[inline]
    pub fn is_match(&self) -> bool {
        self.verdict != Verdict::None
    }

    /// Effects are ordered by tier, then priority, then policy name, then rule index.
    ///
    /// The policy name breaks ties between policies of equal priority.
    fn precedence(&self) -> (PolicyKind, i32, &str, Option<usize>) {
        (self.kind, self.priority, self.policy.as_str(), self.rule_index)
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.kind, self.policy, self.verdict)?;
        if let Some(idx) = self.rule_index {
            write!(f, " (rule {}", idx)?;
            if let Some(name) = self.rule_name.as_deref() {
                write!(f, " {:?}", name)?;
            }
            f.write_str(")")?;
        }
        if self.kind != PolicyKind::Namespaced {
            write!(f, " priority={}", self.priority)?;
        }
        Ok(())
    }
}

// === impl DirectionResult ===

impl DirectionResult {
    /// Resolves the effects collected for one direction of a flow.
    pub fn new(direction: Direction, mut effects: Vec<Effect>) -> Self {
        effects.sort_by(|a, b| a.precedence().cmp(&b.precedence()));
        let resolution = resolve::resolve(&effects);
        Self {
            direction,
            effects,
            resolution,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// All effects, ordered by precedence.
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn is_allowed(&self) -> bool {
        self.resolution.allowed
    }

    /// The effect that decided the result, if a policy decided it.
    pub fn decided_by(&self) -> Option<&Effect> {
        self.resolution.decided_by.map(|i| &self.effects[i])
    }

    /// The tiers visited on the way to the decision.
    pub fn steps(&self) -> &[Step] {
        &self.resolution.steps
    }

    /// A human-readable trace of the decision, e.g. `[Admin] Pass -> [NP] Allow`.
    pub fn flow(&self) -> String {
        self.resolution
            .steps
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

// === impl AllowedResult ===

impl AllowedResult {
    pub fn is_allowed(&self) -> bool {
        self.ingress.is_allowed() && self.egress.is_allowed()
    }
}

impl fmt::Display for AllowedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ingress: {}; egress: {}",
            self.ingress.flow(),
            self.egress.flow()
        )
    }
}
