use ahash::AHashMap as HashMap;
use policy_engine_core::{
    Direction, Effect, Endpoint, Flow, PolicyKind, PortTarget, Rule, Subject, Verdict,
};

/// Indexes the targets of one tier in one direction by subject key.
#[derive(Clone, Debug, Default)]
pub(crate) struct Targets {
    by_subject: HashMap<String, Target>,
}

/// The rules of all policies in a tier that select the same pods.
#[derive(Clone, Debug)]
struct Target {
    subject: Subject,

    /// Ordered by priority, then policy name, then each rule's index within its policy.
    rules: Vec<TargetRule>,
}

/// A rule along with the policy it came from.
#[derive(Clone, Debug)]
struct TargetRule {
    kind: PolicyKind,
    priority: i32,
    policy: String,
    index: Option<usize>,

    /// Unset for a namespaced policy that isolates its subject without allowing any traffic.
    rule: Option<Rule>,
}

// === impl Targets ===

impl Targets {
    /// Adds a policy's rules to the target for its subject, creating the target if needed.
    ///
    /// A namespaced policy without rules is still recorded, since selecting a pod isolates it.
    pub(crate) fn insert(
        &mut self,
        kind: PolicyKind,
        priority: i32,
        policy: &str,
        subject: &Subject,
        rules: &[Rule],
    ) {
        if *subject == Subject::Unknown {
            tracing::debug!(%kind, %policy, "Subject selects nothing");
            return;
        }

        let target = self
            .by_subject
            .entry(subject.key())
            .or_insert_with(|| Target {
                subject: subject.clone(),
                rules: vec![],
            });

        if rules.is_empty() && kind == PolicyKind::Namespaced {
            target.rules.push(TargetRule {
                kind,
                priority,
                policy: policy.to_string(),
                index: None,
                rule: None,
            });
        }
        target
            .rules
            .extend(rules.iter().enumerate().map(|(idx, rule)| TargetRule {
                kind,
                priority,
                policy: policy.to_string(),
                index: Some(idx),
                rule: Some(rule.clone()),
            }));
        target.rules.sort_by(|a, b| {
            (a.priority, &a.policy, a.index).cmp(&(b.priority, &b.policy, b.index))
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.by_subject.len()
    }

    /// Collects an effect for every rule of every target whose subject selects the flow's local
    /// endpoint in this direction.
    pub(crate) fn effects(&self, flow: &Flow, direction: Direction, effects: &mut Vec<Effect>) {
        let local = flow.local(direction);
        let remote = flow.remote(direction);
        let port = PortTarget::from(flow);
        for target in self.by_subject.values() {
            if !target.subject.selects(local) {
                continue;
            }
            tracing::trace!(subject = %target.subject, %direction, "Selected");
            effects.extend(target.rules.iter().map(|r| r.effect(remote, &port)));
        }
    }
}

// === impl TargetRule ===

impl TargetRule {
    fn effect(&self, remote: &Endpoint, port: &PortTarget<'_>) -> Effect {
        let verdict = match self.rule.as_ref() {
            Some(rule) => rule.verdict(remote, port),
            None => Verdict::None,
        };
        Effect {
            kind: self.kind,
            verdict,
            priority: self.priority,
            rule_index: self.index,
            policy: self.policy.clone(),
            rule_name: self.rule.as_ref().and_then(|r| r.name.clone()),
        }
    }
}
