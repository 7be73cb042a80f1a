use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::ArtifactError;
use crate::schema::condition::Condition;

// ============================================================================
// Locators and options
// ============================================================================

/// CSS selector the browser driver resolves to exactly one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(pub String);

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator(selector.into())
    }

    /// Attribute selector form, safe for ids containing `.` or `:`.
    pub fn by_id(id: &str) -> Self {
        Locator(format!("[id=\"{}\"]", escape_attr(id)))
    }

    /// One member of a radio/checkbox group that shares a `name`.
    pub fn by_name_value(tag: &str, name: &str, value: &str) -> Self {
        Locator(format!(
            "{}[name=\"{}\"][value=\"{}\"]",
            tag,
            escape_attr(name),
            escape_attr(value)
        ))
    }

    pub fn by_name(tag: &str, name: &str) -> Self {
        Locator(format!("{}[name=\"{}\"]", tag, escape_attr(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn escape_attr(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// One choice of an enumerated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Canonical English value callers supply
    pub value: String,
    /// Exact text shown on the form
    pub label: String,
    /// DOM `value` attribute, when the widget exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// The option's own input (radio and checkbox groups)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<Locator>,
}

// ============================================================================
// Field descriptors
// ============================================================================

/// Flat discriminant of [`FieldKind`], used by the template and plan output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Date,
    Select,
    Radio,
    Checkbox,
    Composite,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Composite => "composite",
        }
    }
}

/// How a composite's children are supplied and completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeShape {
    /// Day / month / year widgets fed from one `DD.MM.YYYY` value
    Date,
    /// A fieldset of independent inputs (addresses)
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    /// A single input that takes `DD.MM.YYYY`
    Date,
    Select {
        options: Vec<FieldOption>,
    },
    Radio {
        options: Vec<FieldOption>,
    },
    Checkbox {
        options: Vec<FieldOption>,
    },
    Composite {
        shape: CompositeShape,
        children: Vec<FieldDescriptor>,
    },
}

/// One logical form field, addressed by a stable English key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Dotted for composite children (`home_address.city`)
    pub key: String,
    /// Index of the owning [`SchemaPage`]
    pub page: usize,
    /// German on-form label this field was matched by
    pub label: String,
    /// Absent on composites; every leaf carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<Locator>,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl FieldDescriptor {
    pub fn field_type(&self) -> FieldType {
        match &self.kind {
            FieldKind::Text => FieldType::Text,
            FieldKind::Date => FieldType::Date,
            FieldKind::Select { .. } => FieldType::Select,
            FieldKind::Radio { .. } => FieldType::Radio,
            FieldKind::Checkbox { .. } => FieldType::Checkbox,
            FieldKind::Composite { .. } => FieldType::Composite,
        }
    }

    pub fn options(&self) -> &[FieldOption] {
        match &self.kind {
            FieldKind::Select { options }
            | FieldKind::Radio { options }
            | FieldKind::Checkbox { options } => options,
            _ => &[],
        }
    }

    pub fn children(&self) -> &[FieldDescriptor] {
        match &self.kind {
            FieldKind::Composite { children, .. } => children,
            _ => &[],
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, FieldKind::Composite { .. })
    }

    /// Last segment of the dotted key.
    pub fn local_name(&self) -> &str {
        self.key.rsplit('.').next().unwrap_or(&self.key)
    }

    pub fn answers_to(&self, name: &str) -> bool {
        self.key == name || self.aliases.iter().any(|a| a == name)
    }

    /// Child matched by its local name or one of its aliases.
    pub fn child(&self, name: &str) -> Option<&FieldDescriptor> {
        self.children()
            .iter()
            .find(|c| c.local_name() == name || c.aliases.iter().any(|a| a == name))
    }

    /// Leaves beneath (or equal to) this descriptor, in declaration order.
    pub fn leaves(&self) -> Vec<&FieldDescriptor> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    /// First locator at or under this descriptor.
    pub fn first_locator(&self) -> Option<&Locator> {
        self.leaves().into_iter().find_map(|l| l.locator.as_ref())
    }
}

fn collect_leaves<'a>(field: &'a FieldDescriptor, out: &mut Vec<&'a FieldDescriptor>) {
    match &field.kind {
        FieldKind::Composite { children, .. } => {
            for child in children {
                collect_leaves(child, out);
            }
        }
        _ => out.push(field),
    }
}

// ============================================================================
// Schema
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaPage {
    pub index: usize,
    /// Stable English name (`personal`, `contact`, ...)
    pub name: String,
    /// German tab caption used to open the page
    pub title: String,
    /// Widget whose readiness means the page is interactive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready: Option<Locator>,
    pub fields: Vec<FieldDescriptor>,
}

/// Buttons clicked, in order, to render the filled form to PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintAction {
    pub labels: Vec<String>,
}

/// The committed, read-only description of the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub form_url: String,
    pub map_version: String,
    #[serde(default)]
    pub fingerprint: String,
    pub pages: Vec<SchemaPage>,
    pub print: PrintAction,
}

impl FieldSchema {
    pub fn page(&self, index: usize) -> Option<&SchemaPage> {
        self.pages.get(index)
    }

    /// Top-level descriptors in page order, then declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.pages.iter().flat_map(|p| p.fields.iter())
    }

    /// Top-level descriptor addressed by key or alias.
    pub fn resolve(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().find(|f| f.answers_to(name))
    }

    /// Any descriptor, including composite children, by full dotted key.
    pub fn find(&self, key: &str) -> Option<&FieldDescriptor> {
        fn walk<'a>(fields: &'a [FieldDescriptor], key: &str) -> Option<&'a FieldDescriptor> {
            for field in fields {
                if field.key == key {
                    return Some(field);
                }
                if let Some(found) = walk(field.children(), key) {
                    return Some(found);
                }
            }
            None
        }
        self.pages.iter().find_map(|p| walk(&p.fields, key))
    }

    pub fn leaf_count(&self) -> usize {
        self.fields().map(|f| f.leaves().len()).sum()
    }

    /// SHA-1 over the map version and the serialized pages.
    pub fn compute_fingerprint(&self) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.map_version.as_bytes());
        hasher.update(self.form_url.as_bytes());
        if let Ok(pages) = serde_json::to_vec(&self.pages) {
            hasher.update(&pages);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn with_fingerprint(mut self) -> Self {
        self.fingerprint = self.compute_fingerprint();
        self
    }

    /// Structural invariants a loaded or freshly generated schema must hold.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut declared: HashSet<&str> = HashSet::new();

        for (position, page) in self.pages.iter().enumerate() {
            if page.index != position {
                return Err(invariant(format!(
                    "page '{}' has index {} at position {}",
                    page.name, page.index, position
                )));
            }
            for field in &page.fields {
                if field.key.contains('.') {
                    return Err(invariant(format!(
                        "top-level key '{}' must not be dotted",
                        field.key
                    )));
                }
                check_field(field, page.index, &mut seen, &mut declared)?;
            }
        }
        Ok(())
    }
}

fn invariant(message: String) -> ArtifactError {
    ArtifactError::Invariant(message)
}

fn check_field<'a>(
    field: &'a FieldDescriptor,
    page: usize,
    seen: &mut HashSet<&'a str>,
    declared: &mut HashSet<&'a str>,
) -> Result<(), ArtifactError> {
    if field.page != page {
        return Err(invariant(format!(
            "'{}' claims page {} but sits on page {}",
            field.key, field.page, page
        )));
    }
    if !seen.insert(&field.key) {
        return Err(invariant(format!("duplicate key '{}'", field.key)));
    }
    // child aliases are local to their composite
    let top_level = !field.key.contains('.');
    for alias in field.aliases.iter().filter(|_| top_level) {
        if !seen.insert(alias) {
            return Err(invariant(format!(
                "alias '{}' of '{}' collides with another name",
                alias, field.key
            )));
        }
    }
    if let Some(condition) = &field.depends_on {
        for key in condition.keys() {
            if !declared.contains(key) {
                return Err(invariant(format!(
                    "'{}' depends on '{}', which is not declared before it",
                    field.key, key
                )));
            }
        }
    }

    match &field.kind {
        FieldKind::Composite { shape, children } => {
            if children.is_empty() {
                return Err(invariant(format!("composite '{}' has no children", field.key)));
            }
            let prefix = format!("{}.", field.key);
            for child in children {
                if !child.key.starts_with(&prefix) {
                    return Err(invariant(format!(
                        "child '{}' is not namespaced under '{}'",
                        child.key, field.key
                    )));
                }
            }
            if *shape == CompositeShape::Date {
                let mut names: Vec<&str> = children.iter().map(|c| c.local_name()).collect();
                names.sort_unstable();
                if names != ["day", "month", "year"] {
                    return Err(invariant(format!(
                        "date composite '{}' needs exactly day, month and year children",
                        field.key
                    )));
                }
            }
            for child in children {
                check_field(child, page, seen, declared)?;
            }
        }
        _ => {
            if field.locator.is_none() {
                return Err(invariant(format!("leaf '{}' has no locator", field.key)));
            }
            if matches!(
                field.kind,
                FieldKind::Select { .. } | FieldKind::Radio { .. } | FieldKind::Checkbox { .. }
            ) && field.options().is_empty()
            {
                return Err(invariant(format!("'{}' offers no options", field.key)));
            }
        }
    }

    declared.insert(&field.key);
    Ok(())
}
