use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canonical value a field resolved to during translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedValue {
    Text(String),
    /// Canonical value of the chosen option
    Choice(String),
    /// Canonical values of the options left checked
    Checked(Vec<String>),
}

impl ResolvedValue {
    fn matches(&self, expected: &str) -> bool {
        match self {
            ResolvedValue::Text(text) => text == expected,
            ResolvedValue::Choice(choice) => choice == expected,
            ResolvedValue::Checked(checked) => checked.iter().any(|c| c == expected),
        }
    }

    fn is_set(&self) -> bool {
        match self {
            ResolvedValue::Text(text) => !text.is_empty(),
            ResolvedValue::Choice(_) => true,
            ResolvedValue::Checked(checked) => !checked.is_empty(),
        }
    }
}

/// Resolved values seen so far, keyed by full field key.
pub type ResolvedValues = BTreeMap<String, ResolvedValue>;

/// Predicate over other fields' resolved values.
///
/// A field whose condition is false is neither filled nor required. Keys that
/// have not resolved (absent, or themselves skipped) never satisfy a
/// positive condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum Condition {
    /// The field resolved to `value` (for checkboxes: `value` is checked)
    Equals { key: String, value: String },
    OneOf { key: String, values: Vec<String> },
    IsSet { key: String },
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
}

impl Condition {
    pub fn equals(key: &str, value: &str) -> Self {
        Condition::Equals {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn one_of(key: &str, values: &[&str]) -> Self {
        Condition::OneOf {
            key: key.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn evaluate(&self, resolved: &ResolvedValues) -> bool {
        match self {
            Condition::Equals { key, value } => {
                resolved.get(key).is_some_and(|v| v.matches(value))
            }
            Condition::OneOf { key, values } => resolved
                .get(key)
                .is_some_and(|v| values.iter().any(|candidate| v.matches(candidate))),
            Condition::IsSet { key } => resolved.get(key).is_some_and(|v| v.is_set()),
            Condition::All { conditions } => conditions.iter().all(|c| c.evaluate(resolved)),
            Condition::Any { conditions } => conditions.iter().any(|c| c.evaluate(resolved)),
            Condition::Not { condition } => !condition.evaluate(resolved),
        }
    }

    /// Every field key the predicate reads.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys.dedup();
        keys
    }

    fn collect_keys<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Equals { key, .. }
            | Condition::OneOf { key, .. }
            | Condition::IsSet { key } => out.push(key),
            Condition::All { conditions } | Condition::Any { conditions } => {
                for c in conditions {
                    c.collect_keys(out);
                }
            }
            Condition::Not { condition } => condition.collect_keys(out),
        }
    }

    /// (key, value) assignments that together make the predicate true,
    /// applied in order. Empty when no such set exists without negation.
    pub fn triggers(&self) -> Vec<(&str, &str)> {
        match self {
            Condition::Equals { key, value } => vec![(key.as_str(), value.as_str())],
            Condition::OneOf { key, values } => values
                .first()
                .map(|v| vec![(key.as_str(), v.as_str())])
                .unwrap_or_default(),
            Condition::All { conditions } => {
                let mut triggers = Vec::new();
                for condition in conditions {
                    let part = condition.triggers();
                    if part.is_empty() {
                        return Vec::new();
                    }
                    triggers.extend(part);
                }
                triggers
            }
            Condition::Any { conditions } => conditions
                .iter()
                .map(|c| c.triggers())
                .find(|t| !t.is_empty())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Human-readable form used in the complete template.
    pub fn describe(&self) -> String {
        match self {
            Condition::Equals { key, value } => format!("{} = {}", key, value),
            Condition::OneOf { key, values } => format!("{} in [{}]", key, values.join(", ")),
            Condition::IsSet { key } => format!("{} is set", key),
            Condition::All { conditions } => join_described(conditions, " and "),
            Condition::Any { conditions } => join_described(conditions, " or "),
            Condition::Not { condition } => format!("not ({})", condition.describe()),
        }
    }
}

fn join_described(conditions: &[Condition], separator: &str) -> String {
    conditions
        .iter()
        .map(|c| format!("({})", c.describe()))
        .collect::<Vec<_>>()
        .join(separator)
}
