use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

#[derive(Clone, Debug, Eq, Default)]
pub struct Labels(Arc<Map>);

pub type Map = BTreeMap<String, String>;

pub type Expressions = Vec<Expression>;

#[derive(
    Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema,
)]
pub struct Expression {
    key: String,
    operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<BTreeSet<String>>,
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema,
)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

/// Selects a set of labeled objects (namespaces, pods or nodes).
///
/// An empty selector selects everything. Whether a selector is *present* at all is modeled by the
/// containing type (i.e. as an `Option<Selector>`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_labels: Option<Map>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_expressions: Option<Expressions>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("unsupported label selector operator {operator:?} for key {key:?}")]
    UnknownOperator { key: String, operator: String },
}

// === Selector ===

impl Selector {
    pub fn from_expressions(exprs: Expressions) -> Self {
        Self {
            match_labels: None,
            match_expressions: Some(exprs),
        }
    }

    pub fn from_map(map: Map) -> Self {
        Self {
            match_labels: Some(map),
            match_expressions: None,
        }
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        for expr in self.match_expressions.iter().flatten() {
            if !expr.matches(labels.as_ref()) {
                return false;
            }
        }

        if let Some(match_labels) = self.match_labels.as_ref() {
            for (k, v) in match_labels.iter() {
                if labels.0.get(k) != Some(v) {
                    return false;
                }
            }
        }

        true
    }

    /// Returns the selector's requirements in canonical form: `matchLabels` entries are folded
    /// into single-valued `In` expressions and all requirements are sorted and deduplicated.
    ///
    /// Two selectors with equal requirements select exactly the same objects.
    pub fn requirements(&self) -> BTreeSet<Expression> {
        let labels = self.match_labels.iter().flatten().map(|(k, v)| Expression {
            key: k.clone(),
            operator: Operator::In,
            values: Some(Some(v.clone()).into_iter().collect()),
        });
        self.match_expressions
            .iter()
            .flatten()
            .cloned()
            .chain(labels)
            .collect()
    }

    /// A stable textual form of the selector, suitable for use as a map key.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for expr in self.requirements() {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            expr.fmt(f)?;
        }
        Ok(())
    }
}

impl TryFrom<&LabelSelector> for Selector {
    type Error = SelectorError;

    fn try_from(selector: &LabelSelector) -> Result<Self, Self::Error> {
        let match_expressions = selector
            .match_expressions
            .as_ref()
            .map(|exprs| {
                exprs
                    .iter()
                    .map(Expression::try_from)
                    .collect::<Result<Expressions, _>>()
            })
            .transpose()?;
        Ok(Self {
            match_labels: selector.match_labels.clone(),
            match_expressions,
        })
    }
}

impl std::iter::FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Selector {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        Self::from_map(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl std::iter::FromIterator<Expression> for Selector {
    fn from_iter<T: IntoIterator<Item = Expression>>(iter: T) -> Self {
        Self::from_expressions(iter.into_iter().collect())
    }
}

// === Labels ===

impl Labels {
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl From<Map> for Labels {
    #[inline]
    fn from(labels: Map) -> Self {
        Self(Arc::new(labels))
    }
}

impl From<Option<Map>> for Labels {
    #[inline]
    fn from(labels: Option<Map>) -> Self {
        labels.unwrap_or_default().into()
    }
}

impl AsRef<Map> for Labels {
    #[inline]
    fn as_ref(&self) -> &Map {
        self.0.as_ref()
    }
}

impl<T: AsRef<Map>> std::cmp::PartialEq<T> for Labels {
    #[inline]
    fn eq(&self, t: &T) -> bool {
        self.0.as_ref().eq(t.as_ref())
    }
}

impl std::iter::FromIterator<(String, String)> for Labels {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Labels {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

// === Expression ===

impl Expression {
    pub fn new(
        key: impl Into<String>,
        operator: Operator,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let values = match operator {
            Operator::In | Operator::NotIn => {
                Some(values.into_iter().map(Into::into).collect())
            }
            Operator::Exists | Operator::DoesNotExist => None,
        };
        Self {
            key: key.into(),
            operator,
            values,
        }
    }

    pub fn exists(key: impl Into<String>) -> Self {
        Self::new(key, Operator::Exists, None::<String>)
    }

    pub fn does_not_exist(key: impl Into<String>) -> Self {
        Self::new(key, Operator::DoesNotExist, None::<String>)
    }

    fn matches(&self, labels: &Map) -> bool {
        let contains = |v: &String| self.values.as_ref().is_some_and(|vs| vs.contains(v));
        match self.operator {
            Operator::In => labels.get(&self.key).is_some_and(contains),
            Operator::NotIn => !labels.get(&self.key).is_some_and(contains),
            Operator::Exists => labels.contains_key(&self.key),
            Operator::DoesNotExist => !labels.contains_key(&self.key),
        }
    }
}

impl TryFrom<&LabelSelectorRequirement> for Expression {
    type Error = SelectorError;

    fn try_from(req: &LabelSelectorRequirement) -> Result<Self, Self::Error> {
        let operator = match req.operator.as_str() {
            "In" => Operator::In,
            "NotIn" => Operator::NotIn,
            "Exists" => Operator::Exists,
            "DoesNotExist" => Operator::DoesNotExist,
            op => {
                return Err(SelectorError::UnknownOperator {
                    key: req.key.clone(),
                    operator: op.to_string(),
                })
            }
        };
        Ok(Self::new(
            req.key.clone(),
            operator,
            req.values.iter().flatten().cloned(),
        ))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = || {
            self.values
                .iter()
                .flatten()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(",")
        };
        match self.operator {
            Operator::In if self.values.as_ref().is_some_and(|v| v.len() == 1) => {
                write!(f, "{}={}", self.key, values())
            }
            Operator::In => write!(f, "{} in ({})", self.key, values()),
            Operator::NotIn => write!(f, "{} notin ({})", self.key, values()),
            Operator::Exists => f.write_str(&self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;
    use std::iter::FromIterator;

    #[test]
    fn test_matches() {
        for (selector, labels, matches, msg) in &[
            (Selector::default(), Labels::default(), true, "empty match"),
            (
                Selector::from_iter(Some(("foo", "bar"))),
                Labels::from_iter(Some(("foo", "bar"))),
                true,
                "exact label match",
            ),
            (
                Selector::from_iter(Some(("foo", "bar"))),
                Labels::from_iter(vec![("foo", "bar"), ("bah", "baz")]),
                true,
                "sufficient label match",
            ),
            (
                Selector::from_iter(Some(("foo", "bar"))),
                Labels::from_iter(Some(("foo", "Bar"))),
                false,
                "case-sensitive value",
            ),
            (
                Selector::from_iter(Some(Expression::new("foo", Operator::In, ["bar"]))),
                Labels::from_iter(vec![("foo", "bar"), ("bah", "baz")]),
                true,
                "in match",
            ),
            (
                Selector::from_iter(Some(Expression::new("foo", Operator::NotIn, ["bar"]))),
                Labels::from_iter(vec![("foo", "bar")]),
                false,
                "not-in excludes",
            ),
            (
                Selector::from_iter(Some(Expression::new("foo", Operator::NotIn, ["bar"]))),
                Labels::from_iter(vec![("bah", "baz")]),
                true,
                "not-in matches missing key",
            ),
            (
                Selector::from_iter(Some(Expression::exists("foo"))),
                Labels::from_iter(vec![("foo", "")]),
                true,
                "exists",
            ),
            (
                Selector::from_iter(Some(Expression::does_not_exist("foo"))),
                Labels::from_iter(vec![("foo", "bar")]),
                false,
                "does not exist",
            ),
        ] {
            assert_eq!(selector.matches(labels), *matches, "{}", msg);
        }
    }

    #[test]
    fn canonical_form_folds_match_labels() {
        let a = Selector::from_iter(vec![("b", "2"), ("a", "1")]);
        let b = Selector::from_iter(vec![
            Expression::new("a", Operator::In, ["1"]),
            Expression::new("b", Operator::In, ["2"]),
        ]);
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), "a=1,b=2");
        assert_eq!(Selector::default().canonical(), "");

        let c = Selector::from_iter(vec![
            Expression::does_not_exist("z"),
            Expression::new("k", Operator::NotIn, ["y", "x"]),
            Expression::exists("e"),
        ]);
        assert_eq!(c.canonical(), "e,k notin (x,y),!z");
    }

    #[test]
    fn converts_label_selector() {
        let selector = LabelSelector {
            match_labels: Some(btreemap! { "app".to_string() => "web".to_string() }),
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "tier".to_string(),
                operator: "Exists".to_string(),
                values: None,
            }]),
        };
        let selector = Selector::try_from(&selector).expect("selector must convert");
        assert!(selector.matches(&Labels::from_iter(vec![("app", "web"), ("tier", "fe")])));
        assert!(!selector.matches(&Labels::from_iter(vec![("app", "web")])));

        let bad = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "tier".to_string(),
                operator: "Gt".to_string(),
                values: None,
            }]),
        };
        assert_eq!(
            Selector::try_from(&bad),
            Err(SelectorError::UnknownOperator {
                key: "tier".to_string(),
                operator: "Gt".to_string(),
            })
        );
    }
}
