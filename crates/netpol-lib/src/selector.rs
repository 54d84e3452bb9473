//! Kubernetes label selectors
//!
//! Provides the selector value types found on NetworkPolicies and peers,
//! and a compiler that validates a selector once and yields a pure matcher:
//! - `matchLabels` equality terms (implicit AND)
//! - `matchExpressions` set terms (`In`, `NotIn`, `Exists`, `DoesNotExist`)

use crate::error::SelectorError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Label set attached to a namespace or pod candidate
pub type Labels = BTreeMap<String, String>;

/// A label selector as written in a resource spec
///
/// A selector with no terms at all selects every label set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: Labels,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<LabelSelectorRequirement>,
}

/// A single set-based term of a selector
///
/// The operator is kept verbatim so that an unknown operator surfaces as a
/// compile error instead of being dropped on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelectorRequirement {
    pub key: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl LabelSelector {
    /// Selector with no terms (selects everything)
    pub fn everything() -> Self {
        Self::default()
    }

    /// Selector built from equality terms only
    pub fn from_labels<K, V>(labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            match_labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            match_expressions: Vec::new(),
        }
    }

    /// Append a set-based term
    pub fn with_expression(
        mut self,
        key: impl Into<String>,
        operator: impl Into<String>,
        values: &[&str],
    ) -> Self {
        self.match_expressions.push(LabelSelectorRequirement {
            key: key.into(),
            operator: operator.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        });
        self
    }

    /// True when the selector carries no terms
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions.is_empty()
    }

    /// Validate the selector and turn it into a matcher
    pub fn compile(&self) -> Result<CompiledSelector, SelectorError> {
        let requirements = self
            .match_expressions
            .iter()
            .map(Requirement::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompiledSelector {
            match_labels: self
                .match_labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            requirements,
        })
    }

    /// Compile and match in one step
    pub fn matches(&self, labels: &Labels) -> Result<bool, SelectorError> {
        Ok(self.compile()?.matches(labels))
    }
}

/// Selector slot on a network policy peer
///
/// `Absent` leaves the dimension unconstrained, which is different from a
/// present selector with no terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<LabelSelector>", into = "Option<LabelSelector>")]
pub enum SelectorSlot {
    #[default]
    Absent,
    Present(LabelSelector),
}

impl SelectorSlot {
    pub fn is_present(&self) -> bool {
        matches!(self, SelectorSlot::Present(_))
    }
}

impl From<Option<LabelSelector>> for SelectorSlot {
    fn from(value: Option<LabelSelector>) -> Self {
        match value {
            Some(selector) => SelectorSlot::Present(selector),
            None => SelectorSlot::Absent,
        }
    }
}

impl From<SelectorSlot> for Option<LabelSelector> {
    fn from(value: SelectorSlot) -> Self {
        match value {
            SelectorSlot::Present(selector) => Some(selector),
            SelectorSlot::Absent => None,
        }
    }
}

/// Set-based selector operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

impl std::str::FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "In" => Ok(Operator::In),
            "NotIn" => Ok(Operator::NotIn),
            "Exists" => Ok(Operator::Exists),
            "DoesNotExist" => Ok(Operator::DoesNotExist),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
struct Requirement {
    key: String,
    operator: Operator,
    values: BTreeSet<String>,
}

impl Requirement {
    fn compile(raw: &LabelSelectorRequirement) -> Result<Self, SelectorError> {
        let operator: Operator =
            raw.operator
                .parse()
                .map_err(|_| SelectorError::UnknownOperator {
                    key: raw.key.clone(),
                    operator: raw.operator.clone(),
                })?;

        match operator {
            Operator::In | Operator::NotIn if raw.values.is_empty() => {
                return Err(SelectorError::EmptyValues {
                    key: raw.key.clone(),
                    operator: raw.operator.clone(),
                });
            }
            Operator::Exists | Operator::DoesNotExist if !raw.values.is_empty() => {
                return Err(SelectorError::UnexpectedValues {
                    key: raw.key.clone(),
                    operator: raw.operator.clone(),
                });
            }
            _ => {}
        }

        Ok(Self {
            key: raw.key.clone(),
            operator,
            values: raw.values.iter().cloned().collect(),
        })
    }

    fn matches(&self, labels: &Labels) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            Operator::In => value.is_some_and(|v| self.values.contains(v)),
            Operator::NotIn => value.map_or(true, |v| !self.values.contains(v)),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }
}

/// A validated selector, ready to be evaluated against label sets
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    match_labels: Vec<(String, String)>,
    requirements: Vec<Requirement>,
}

impl CompiledSelector {
    /// Check whether the label set satisfies every term of the selector
    pub fn matches(&self, labels: &Labels) -> bool {
        self.match_labels
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
            && self.requirements.iter().all(|r| r.matches(labels))
    }
}
