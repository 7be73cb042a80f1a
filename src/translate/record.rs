use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::schema::field_model::{FieldDescriptor, FieldSchema};

/// Caller-supplied applicant data, English keys, not necessarily complete.
///
/// Dotted keys (`home_address.city`) are expanded into nested objects and
/// merged with any nested object given for the same parent. Keys starting
/// with `_` are metadata and dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicantRecord {
    entries: Map<String, Value>,
}

impl ApplicantRecord {
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Ok(ApplicantRecord {
                entries: expand(map, "")?,
            }),
            _ => Err(ValidationError::NotAnObject),
        }
    }

    pub fn entries(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve aliases to canonical keys and reject names the schema does
    /// not declare, at any nesting level.
    pub fn bind(&self, schema: &FieldSchema) -> Result<FieldValues, ValidationError> {
        let mut binder = Binder::default();
        let mut values = BTreeMap::new();

        for (name, value) in &self.entries {
            let Some(field) = schema.resolve(name) else {
                push_leaf_paths(&mut binder.unknown, name, value);
                continue;
            };
            let bound = binder.bind_value(field, name, value);
            if values.insert(field.key.clone(), bound).is_some() {
                binder.conflict(&field.key);
            }
        }

        binder.finish()?;
        Ok(FieldValues(values))
    }
}

/// Record or defaults values keyed by canonical top-level field key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues(BTreeMap<String, Value>);

impl FieldValues {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

#[derive(Default)]
struct Binder {
    unknown: Vec<String>,
    first_conflict: Option<String>,
}

impl Binder {
    fn bind_value(&mut self, field: &FieldDescriptor, path: &str, value: &Value) -> Value {
        let Value::Object(object) = value else {
            return value.clone();
        };
        if !field.is_composite() {
            // leaf given an object: normalisation reports the shape error
            return value.clone();
        }

        let mut children = Map::new();
        for (name, child_value) in object {
            let child_path = format!("{}.{}", path, name);
            let Some(child) = field.child(name) else {
                self.unknown.push(child_path);
                continue;
            };
            let bound = self.bind_value(child, &child_path, child_value);
            if children.insert(child.local_name().to_string(), bound).is_some() {
                self.conflict(&child.key);
            }
        }
        Value::Object(children)
    }

    fn conflict(&mut self, key: &str) {
        if self.first_conflict.is_none() {
            self.first_conflict = Some(key.to_string());
        }
    }

    fn finish(mut self) -> Result<(), ValidationError> {
        if !self.unknown.is_empty() {
            self.unknown.sort();
            self.unknown.dedup();
            return Err(ValidationError::UnknownKeys { keys: self.unknown });
        }
        match self.first_conflict {
            Some(key) => Err(ValidationError::ConflictingKeys { key }),
            None => Ok(()),
        }
    }
}

/// An unknown name whose value is an object (usually an expanded dotted key)
/// is reported by its full leaf paths, as the caller wrote them.
fn push_leaf_paths(out: &mut Vec<String>, path: &str, value: &Value) {
    match value {
        Value::Object(object) if !object.is_empty() => {
            for (name, child) in object {
                push_leaf_paths(out, &format!("{}.{}", path, name), child);
            }
        }
        _ => out.push(path.to_string()),
    }
}

/// Expand dotted keys and drop metadata keys, recursively.
fn expand(map: Map<String, Value>, prefix: &str) -> Result<Map<String, Value>, ValidationError> {
    let mut out = Map::new();
    for (raw_key, value) in map {
        if raw_key.starts_with('_') {
            continue;
        }
        let segments: Vec<&str> = raw_key.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ValidationError::invalid(
                &join_path(prefix, &raw_key),
                "empty segment in dotted key",
            ));
        }
        let value = match value {
            Value::Object(inner) => Value::Object(expand(inner, &join_path(prefix, &raw_key))?),
            other => other,
        };
        insert_path(&mut out, &segments, value, prefix)?;
    }
    Ok(out)
}

fn insert_path(
    target: &mut Map<String, Value>,
    segments: &[&str],
    value: Value,
    prefix: &str,
) -> Result<(), ValidationError> {
    let (head, rest) = match segments {
        [head, rest @ ..] => (*head, rest),
        [] => return Ok(()),
    };
    let path = join_path(prefix, head);

    if rest.is_empty() {
        return match target.get_mut(head) {
            None => {
                target.insert(head.to_string(), value);
                Ok(())
            }
            Some(Value::Object(existing)) => match value {
                Value::Object(incoming) => merge(existing, incoming, &path),
                _ => Err(ValidationError::ConflictingKeys { key: path }),
            },
            Some(_) => Err(ValidationError::ConflictingKeys { key: path }),
        };
    }

    let slot = target
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match slot {
        Value::Object(inner) => insert_path(inner, rest, value, &path),
        _ => Err(ValidationError::ConflictingKeys { key: path }),
    }
}

fn merge(
    existing: &mut Map<String, Value>,
    incoming: Map<String, Value>,
    prefix: &str,
) -> Result<(), ValidationError> {
    for (key, value) in incoming {
        insert_path(existing, &[key.as_str()], value, prefix)?;
    }
    Ok(())
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}
