use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;

use crate::error::ValidationError;
use crate::schema::condition::ResolvedValue;
use crate::schema::field_model::{FieldDescriptor, FieldKind, FieldOption};
use crate::translate::assignment::{CheckState, FormValue};

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})\.(\d{2})\.(\d{4})$").expect("valid date regex"));

// ============================================================================
// Presence
// ============================================================================

/// `null` and blank strings count as absent.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

pub fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| is_present(v))
}

// ============================================================================
// Scalars
// ============================================================================

/// Trimmed text; numbers are accepted and rendered in decimal.
pub fn text_value(key: &str, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(_) => Err(ValidationError::invalid(key, "expected text, got a boolean")),
        Value::Array(_) => Err(ValidationError::invalid(key, "expected text, got a list")),
        Value::Object(_) => Err(ValidationError::invalid(key, "expected text, got an object")),
        Value::Null => Err(ValidationError::invalid(key, "expected text, got null")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParts {
    pub day: String,
    pub month: String,
    pub year: String,
}

impl DateParts {
    pub fn formatted(&self) -> String {
        format!("{}.{}.{}", self.day, self.month, self.year)
    }

    pub fn part(&self, name: &str) -> Option<&str> {
        match name {
            "day" => Some(&self.day),
            "month" => Some(&self.month),
            "year" => Some(&self.year),
            _ => None,
        }
    }
}

/// Strict `DD.MM.YYYY`, and a real calendar date.
pub fn parse_date(key: &str, raw: &str) -> Result<DateParts, ValidationError> {
    let raw = raw.trim();
    let bad = || ValidationError::BadDate {
        key: key.to_string(),
        value: raw.to_string(),
    };
    let caps = DATE_RE.captures(raw).ok_or_else(bad)?;
    let (day, month, year) = (&caps[1], &caps[2], &caps[3]);

    let valid = match (day.parse(), month.parse(), year.parse()) {
        (Ok(d), Ok(m), Ok(y)) => NaiveDate::from_ymd_opt(y, m, d).is_some(),
        _ => false,
    };
    if !valid {
        return Err(bad());
    }

    Ok(DateParts {
        day: day.to_string(),
        month: month.to_string(),
        year: year.to_string(),
    })
}

// ============================================================================
// Enumerations
// ============================================================================

/// Exact canonical value, exact on-form label, then the same two
/// case-insensitively. No partial matching.
pub fn resolve_option<'o>(
    key: &str,
    options: &'o [FieldOption],
    raw: &str,
) -> Result<&'o FieldOption, ValidationError> {
    let wanted = raw.trim();
    let folded = wanted.to_lowercase();

    options
        .iter()
        .find(|o| o.value == wanted)
        .or_else(|| options.iter().find(|o| o.label == wanted))
        .or_else(|| options.iter().find(|o| o.value.to_lowercase() == folded))
        .or_else(|| options.iter().find(|o| o.label.to_lowercase() == folded))
        .ok_or_else(|| ValidationError::NoMatchingOption {
            key: key.to_string(),
            value: wanted.to_string(),
            allowed: options.iter().map(|o| o.value.clone()).collect(),
        })
}

/// A boolean (single-option checkbox), one option, or a list of options.
/// Options not named end up unchecked.
pub fn resolve_checks(
    key: &str,
    options: &[FieldOption],
    raw: &Value,
) -> Result<Vec<CheckState>, ValidationError> {
    let selected: Vec<&FieldOption> = match raw {
        Value::Bool(flag) => {
            if options.len() != 1 {
                return Err(ValidationError::invalid(
                    key,
                    "true/false only applies to a single checkbox, name the options instead",
                ));
            }
            if *flag { options.iter().collect() } else { Vec::new() }
        }
        Value::String(s) => vec![resolve_option(key, options, s)?],
        Value::Array(items) => {
            let mut picked = Vec::new();
            for item in items {
                let label = match item {
                    Value::String(s) => s,
                    _ => return Err(ValidationError::invalid(key, "checkbox list entries must be text")),
                };
                let option = resolve_option(key, options, label)?;
                if !picked.contains(&option) {
                    picked.push(option);
                }
            }
            picked
        }
        _ => {
            return Err(ValidationError::invalid(
                key,
                "expected true/false, an option, or a list of options",
            ));
        }
    };

    Ok(options
        .iter()
        .map(|option| CheckState {
            option: option.clone(),
            checked: selected.contains(&option),
        })
        .collect())
}

// ============================================================================
// Leaf normalisation
// ============================================================================

/// Normalise a present raw value for a leaf field. Returns the form-native
/// value and the canonical value later `depends_on` checks read.
pub fn normalize_leaf(
    field: &FieldDescriptor,
    raw: &Value,
) -> Result<(FormValue, ResolvedValue), ValidationError> {
    let key = field.key.as_str();
    match &field.kind {
        FieldKind::Text => {
            let text = text_value(key, raw)?;
            Ok((FormValue::Text(text.clone()), ResolvedValue::Text(text)))
        }
        FieldKind::Date => {
            let text = text_value(key, raw)?;
            let parts = parse_date(key, &text)?;
            let formatted = parts.formatted();
            Ok((FormValue::Text(formatted.clone()), ResolvedValue::Text(formatted)))
        }
        FieldKind::Select { options } | FieldKind::Radio { options } => {
            let text = text_value(key, raw)?;
            let option = resolve_option(key, options, &text)?;
            Ok((
                FormValue::Choice(option.clone()),
                ResolvedValue::Choice(option.value.clone()),
            ))
        }
        FieldKind::Checkbox { options } => {
            let states = resolve_checks(key, options, raw)?;
            let checked = states
                .iter()
                .filter(|s| s.checked)
                .map(|s| s.option.value.clone())
                .collect();
            Ok((FormValue::Checks(states), ResolvedValue::Checked(checked)))
        }
        FieldKind::Composite { .. } => Err(ValidationError::invalid(
            key,
            "composite fields are resolved through their children",
        )),
    }
}
