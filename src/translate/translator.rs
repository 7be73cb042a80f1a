use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::schema::catalog::DefaultsCatalog;
use crate::schema::condition::{ResolvedValue, ResolvedValues};
use crate::schema::field_model::{CompositeShape, FieldDescriptor, FieldKind, FieldSchema};
use crate::translate::assignment::{Assignment, FormValue};
use crate::translate::normalize::{normalize_leaf, parse_date, present, text_value};
use crate::translate::record::ApplicantRecord;

/// Turns an English-keyed applicant record into an ordered list of
/// form-native assignments. Pure: no browser, no I/O.
pub struct FieldTranslator<'a> {
    schema: &'a FieldSchema,
    defaults: &'a DefaultsCatalog,
}

impl<'a> FieldTranslator<'a> {
    pub fn new(schema: &'a FieldSchema, defaults: &'a DefaultsCatalog) -> Self {
        FieldTranslator { schema, defaults }
    }

    pub fn translate_value(&self, raw: Value) -> Result<Vec<Assignment>, ValidationError> {
        let record = ApplicantRecord::from_value(raw)?;
        self.translate(&record)
    }

    /// Assignments come out in schema page order, then declaration order;
    /// composite children follow their declared child order. Unknown keys
    /// fail the whole translation before any value is looked at.
    pub fn translate(&self, record: &ApplicantRecord) -> Result<Vec<Assignment>, ValidationError> {
        let supplied = record.bind(self.schema)?;

        let mut resolution = Resolution::default();
        for field in self.schema.fields() {
            self.resolve_field(
                field,
                supplied.get(&field.key),
                self.defaults.get(&field.key),
                &mut resolution,
            )?;
        }

        tracing::debug!(
            assignments = resolution.assignments.len(),
            supplied = supplied.len(),
            "record translated"
        );
        Ok(resolution.assignments)
    }

    fn resolve_field(
        &self,
        field: &FieldDescriptor,
        supplied: Option<&Value>,
        default: Option<&Value>,
        resolution: &mut Resolution,
    ) -> Result<(), ValidationError> {
        if let Some(condition) = &field.depends_on {
            if !condition.evaluate(&resolution.resolved) {
                tracing::trace!(key = %field.key, "dependency not met, skipping");
                return Ok(());
            }
        }

        match &field.kind {
            FieldKind::Composite {
                shape: CompositeShape::Date,
                children,
            } => self.resolve_date_composite(field, children, supplied, default, resolution),
            FieldKind::Composite {
                shape: CompositeShape::Group,
                children,
            } => self.resolve_group(field, children, supplied, default, resolution),
            _ => {
                let Some(raw) = present(supplied).or(present(default)) else {
                    return Ok(());
                };
                let (value, canonical) = normalize_leaf(field, raw)?;
                resolution.push(field, value, canonical);
                Ok(())
            }
        }
    }

    /// Whole-date string, or an object with every one of day/month/year.
    fn resolve_date_composite(
        &self,
        field: &FieldDescriptor,
        children: &[FieldDescriptor],
        supplied: Option<&Value>,
        default: Option<&Value>,
        resolution: &mut Resolution,
    ) -> Result<(), ValidationError> {
        let key = field.key.as_str();
        let Some(raw) = present(supplied).or(present(default)) else {
            return Ok(());
        };

        let parts = match raw {
            Value::String(text) => parse_date(key, text)?,
            Value::Object(object) => {
                let mut missing = Vec::new();
                let mut texts = Vec::new();
                for name in ["day", "month", "year"] {
                    match present(object.get(name)) {
                        Some(v) => texts.push(text_value(&format!("{}.{}", key, name), v)?),
                        None => missing.push(name.to_string()),
                    }
                }
                if !missing.is_empty() {
                    return Err(ValidationError::IncompleteComposite {
                        key: key.to_string(),
                        missing,
                    });
                }
                parse_date(key, &texts.join("."))?
            }
            _ => {
                return Err(ValidationError::invalid(
                    key,
                    "expected a DD.MM.YYYY string or an object with day, month, year",
                ));
            }
        };

        resolution
            .resolved
            .insert(key.to_string(), ResolvedValue::Text(parts.formatted()));
        for child in children {
            let Some(part) = parts.part(child.local_name()) else {
                continue;
            };
            resolution.push(
                child,
                FormValue::Text(part.to_string()),
                ResolvedValue::Text(part.to_string()),
            );
        }
        Ok(())
    }

    /// Children resolve independently (record, then defaults); once any
    /// child has a value, every required child must.
    fn resolve_group(
        &self,
        field: &FieldDescriptor,
        children: &[FieldDescriptor],
        supplied: Option<&Value>,
        default: Option<&Value>,
        resolution: &mut Resolution,
    ) -> Result<(), ValidationError> {
        let supplied = object_or_absent(&field.key, supplied)?;
        let default = object_or_absent(&field.key, default)?;

        let child_values: Vec<(Option<&Value>, Option<&Value>)> = children
            .iter()
            .map(|child| {
                let name = child.local_name();
                (
                    supplied.and_then(|o| o.get(name)),
                    default.and_then(|o| o.get(name)),
                )
            })
            .collect();

        let mut any_present = false;
        let mut missing = Vec::new();
        for (child, (own, fallback)) in children.iter().zip(&child_values) {
            let has_value = present(*own).or(present(*fallback)).is_some();
            if has_value {
                any_present = true;
            } else if !child.optional && child.depends_on.is_none() {
                missing.push(child.local_name().to_string());
            }
        }

        if !any_present {
            return Ok(());
        }
        if !missing.is_empty() {
            return Err(ValidationError::IncompleteComposite {
                key: field.key.clone(),
                missing,
            });
        }

        for (child, (own, fallback)) in children.iter().zip(child_values) {
            self.resolve_field(child, own, fallback, resolution)?;
        }
        Ok(())
    }
}

fn object_or_absent<'v>(
    key: &str,
    value: Option<&'v Value>,
) -> Result<Option<&'v Map<String, Value>>, ValidationError> {
    match present(value) {
        None => Ok(None),
        Some(Value::Object(object)) => Ok(Some(object)),
        Some(_) => Err(ValidationError::invalid(
            key,
            "expected an object with the field's parts",
        )),
    }
}

#[derive(Default)]
struct Resolution {
    resolved: ResolvedValues,
    assignments: Vec<Assignment>,
}

impl Resolution {
    fn push(&mut self, field: &FieldDescriptor, value: FormValue, canonical: ResolvedValue) {
        self.resolved.insert(field.key.clone(), canonical);
        self.assignments.push(Assignment {
            field: field.clone(),
            value,
        });
    }
}
