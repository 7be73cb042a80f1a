use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{ArtifactError, ValidationError};
use crate::schema::field_model::{CompositeShape, FieldDescriptor, FieldKind, FieldSchema, FieldType};
use crate::translate::record::{ApplicantRecord, FieldValues};

// ============================================================================
// Artifact I/O
// ============================================================================

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = fs::read_to_string(path).map_err(|e| ArtifactError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| ArtifactError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ArtifactError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| ArtifactError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, json + "\n").map_err(|e| ArtifactError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load a committed schema and check its invariants.
pub fn load_schema(path: &Path) -> Result<FieldSchema, ArtifactError> {
    let schema: FieldSchema = read_json(path)?;
    schema.validate()?;
    if !schema.fingerprint.is_empty() && schema.fingerprint != schema.compute_fingerprint() {
        tracing::warn!(
            path = %path.display(),
            "schema fingerprint does not match its content (edited by hand?)"
        );
    }
    Ok(schema)
}

// ============================================================================
// Defaults
// ============================================================================

/// Values applied when the record leaves a field absent. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultsCatalog {
    values: FieldValues,
}

impl DefaultsCatalog {
    pub fn empty() -> Self {
        DefaultsCatalog::default()
    }

    /// Same key rules as an applicant record: aliases, dotted keys and
    /// `_` metadata are accepted, unknown keys are not.
    pub fn from_value(value: Value, schema: &FieldSchema) -> Result<Self, ValidationError> {
        let record = ApplicantRecord::from_value(value)?;
        Ok(DefaultsCatalog {
            values: record.bind(schema)?,
        })
    }

    pub fn load(path: &Path, schema: &FieldSchema) -> Result<Self, ArtifactError> {
        let value: Value = read_json(path)?;
        Ok(DefaultsCatalog::from_value(value, schema)?)
    }

    /// Defaults every VIDEX application shares, restricted to keys the
    /// schema declares.
    pub fn builtin(schema: &FieldSchema) -> Self {
        let values = builtin_defaults()
            .into_iter()
            .filter(|(key, _)| schema.resolve(key).is_some())
            .collect::<Map<_, _>>();
        DefaultsCatalog::from_value(Value::Object(values), schema).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "built-in defaults do not bind to the schema, using none");
            DefaultsCatalog::empty()
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_value(&self) -> Value {
        self.values.to_value()
    }

    /// Default for any key, including dotted composite children.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split('.');
        let mut current = self.values.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

fn builtin_defaults() -> Map<String, Value> {
    let defaults = json!({
        "passport_type": "Ordinary passport",
        "number_of_entries": "Single entry",
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

// ============================================================================
// Complete template
// ============================================================================

/// One row of the complete template: everything a caller needs to supply
/// a value for `key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub key: String,
    pub page: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteTemplate {
    pub form_url: String,
    pub map_version: String,
    pub fingerprint: String,
    pub fields: Vec<TemplateEntry>,
}

impl CompleteTemplate {
    pub fn build(schema: &FieldSchema, defaults: &DefaultsCatalog) -> Self {
        let mut fields = Vec::new();
        for page in &schema.pages {
            for field in &page.fields {
                push_entries(&mut fields, &page.name, field, defaults);
            }
        }
        CompleteTemplate {
            form_url: schema.form_url.clone(),
            map_version: schema.map_version.clone(),
            fingerprint: schema.fingerprint.clone(),
            fields,
        }
    }

    pub fn entry(&self, key: &str) -> Option<&TemplateEntry> {
        self.fields.iter().find(|e| e.key == key)
    }
}

fn push_entries(
    out: &mut Vec<TemplateEntry>,
    page: &str,
    field: &FieldDescriptor,
    defaults: &DefaultsCatalog,
) {
    let format = match &field.kind {
        FieldKind::Date
        | FieldKind::Composite {
            shape: CompositeShape::Date,
            ..
        } => Some("DD.MM.YYYY".to_string()),
        FieldKind::Composite {
            shape: CompositeShape::Group,
            children,
        } => Some(format!(
            "object with {}",
            children
                .iter()
                .map(|c| c.local_name())
                .collect::<Vec<_>>()
                .join(", ")
        )),
        FieldKind::Checkbox { options } if options.len() > 1 => {
            Some("one option or a list of options".to_string())
        }
        FieldKind::Checkbox { .. } => Some("true / false".to_string()),
        _ => None,
    };

    out.push(TemplateEntry {
        key: field.key.clone(),
        page: page.to_string(),
        field_type: field.field_type(),
        label: field.label.clone(),
        description: field.description.clone(),
        aliases: field.aliases.clone(),
        format,
        allowed: field.options().iter().map(|o| o.value.clone()).collect(),
        default: defaults.lookup(&field.key).cloned(),
        depends_on: field.depends_on.as_ref().map(|c| c.describe()),
        optional: field.optional,
    });

    // Date triplets are supplied as one value; their children are not keys
    // a caller fills individually.
    if let FieldKind::Composite {
        shape: CompositeShape::Group,
        children,
    } = &field.kind
    {
        for child in children {
            push_entries(out, page, child, defaults);
        }
    }
}

// ============================================================================
// Fill-in skeleton
// ============================================================================

const SKELETON_INSTRUCTIONS: &str = "Fill in the values you need and delete the rest. \
Dates are DD.MM.YYYY; enumerated fields take one of the allowed values from \
complete_template.json. Keys starting with '_' are ignored.";

/// An applicant record with every key present, pre-filled from defaults.
pub fn skeleton(schema: &FieldSchema, defaults: &DefaultsCatalog) -> Value {
    let mut record = Map::new();
    record.insert("_instructions".to_string(), Value::String(SKELETON_INSTRUCTIONS.into()));
    for field in schema.fields() {
        record.insert(field.key.clone(), skeleton_value(field, defaults));
    }
    Value::Object(record)
}

fn skeleton_value(field: &FieldDescriptor, defaults: &DefaultsCatalog) -> Value {
    match &field.kind {
        FieldKind::Composite {
            shape: CompositeShape::Group,
            children,
        } => Value::Object(
            children
                .iter()
                .map(|c| (c.local_name().to_string(), skeleton_value(c, defaults)))
                .collect(),
        ),
        _ => {
            if let Some(default) = defaults.lookup(&field.key) {
                return default.clone();
            }
            match &field.kind {
                FieldKind::Checkbox { options } if options.len() > 1 => Value::Array(Vec::new()),
                FieldKind::Checkbox { .. } => Value::Bool(false),
                _ => Value::String(String::new()),
            }
        }
    }
}
