use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::browser::driver::FormBrowser;
use crate::error::{ArtifactError, SchemaGenerationError};
use crate::schema::catalog::{CompleteTemplate, DefaultsCatalog, write_json};
use crate::schema::field_model::{
    CompositeShape, FieldDescriptor, FieldKind, FieldOption, FieldSchema, FieldType, Locator,
    PrintAction, SchemaPage,
};
use crate::schema::form_map::{FormMap, MapEntry, MapPage};
use crate::scraper::widget::{
    Candidate, ScrapedOption, ScrapedWidget, WidgetKind, classify_widget, clean_label,
    collect_candidates, locator_for, normalize_label,
};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceKind;

pub const SCHEMA_FILE: &str = "field_schema.json";
pub const TEMPLATE_FILE: &str = "complete_template.json";

/// Value a lone checkbox is addressed by.
pub const CHECKED_VALUE: &str = "Yes";

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Pause after applying a trigger value while revealing dependents
    pub settle_ms: u64,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions { settle_ms: 300 }
    }
}

/// Schema plus the complete template derived from it.
#[derive(Debug, Clone)]
pub struct GeneratedArtifacts {
    pub schema: FieldSchema,
    pub template: CompleteTemplate,
}

impl GeneratedArtifacts {
    /// Write `field_schema.json` and `complete_template.json` into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, ArtifactError> {
        let schema_path = dir.join(SCHEMA_FILE);
        let template_path = dir.join(TEMPLATE_FILE);
        write_json(&schema_path, &self.schema)?;
        write_json(&template_path, &self.template)?;
        Ok(vec![schema_path, template_path])
    }
}

/// Derives the field schema by walking the live form with the form map.
///
/// Runs offline, never on the request path. Every map entry must be found;
/// a missing label or option aborts the run naming the page and label.
pub struct SchemaGenerator<'a> {
    map: &'a FormMap,
    options: GeneratorOptions,
    tracer: Option<&'a TraceLogger>,
}

impl<'a> SchemaGenerator<'a> {
    pub fn new(map: &'a FormMap, options: GeneratorOptions) -> Self {
        SchemaGenerator {
            map,
            options,
            tracer: None,
        }
    }

    pub fn with_tracer(mut self, tracer: &'a TraceLogger) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Scan the form, then build the template against `defaults` (the raw
    /// defaults catalog; the built-in defaults when `None`).
    pub fn generate<B: FormBrowser>(
        &self,
        browser: &mut B,
        defaults: Option<Value>,
    ) -> Result<GeneratedArtifacts, SchemaGenerationError> {
        let schema = self.scan(browser)?;
        let defaults = match defaults {
            Some(raw) => DefaultsCatalog::from_value(raw, &schema).map_err(ArtifactError::from)?,
            None => DefaultsCatalog::builtin(&schema),
        };
        let template = CompleteTemplate::build(&schema, &defaults);
        Ok(GeneratedArtifacts { schema, template })
    }

    /// Walk every page of the map and match its entries against the DOM.
    pub fn scan<B: FormBrowser>(&self, browser: &mut B) -> Result<FieldSchema, SchemaGenerationError> {
        if let Some(duplicate) = self.map.duplicate_keys().into_iter().next() {
            return Err(SchemaGenerationError::DuplicateKey(duplicate));
        }

        tracing::info!(url = %self.map.form_url, version = %self.map.version, "generating field schema");
        browser.navigate(&self.map.form_url)?;

        let mut pages: Vec<SchemaPage> = Vec::new();
        for (index, map_page) in self.map.pages.iter().enumerate() {
            browser.open_page(map_page.title)?;
            let mut scan = PageScan::new(browser.extract_widgets()?);
            tracing::info!(page = map_page.title, candidates = scan.candidates.len(), "scanning page");

            let mut fields: Vec<FieldDescriptor> = Vec::new();
            for entry in &map_page.entries {
                let field = match self.match_entry(index, map_page, entry, &scan)? {
                    Some(field) => field,
                    None => self.reveal_and_match(browser, index, map_page, entry, &pages, &fields, &mut scan)?,
                };
                scan.consume(&field);
                self.trace_match(map_page, &field);
                fields.push(field);
            }

            let ready = fields
                .iter()
                .filter(|f| f.depends_on.is_none())
                .find_map(|f| f.first_locator().cloned());
            pages.push(SchemaPage {
                index,
                name: map_page.name.to_string(),
                title: map_page.title.to_string(),
                ready,
                fields,
            });
        }

        let schema = FieldSchema {
            form_url: self.map.form_url.clone(),
            map_version: self.map.version.clone(),
            fingerprint: String::new(),
            pages,
            print: PrintAction {
                labels: self.map.print_labels.clone(),
            },
        };
        schema.validate()?;
        let schema = schema.with_fingerprint();
        tracing::info!(
            fields = schema.leaf_count(),
            fingerprint = %schema.fingerprint,
            "field schema generated"
        );
        Ok(schema)
    }

    // ========================================================================
    // Matching
    // ========================================================================

    fn match_entry(
        &self,
        index: usize,
        page: &MapPage,
        entry: &MapEntry,
        scan: &PageScan,
    ) -> Result<Option<FieldDescriptor>, SchemaGenerationError> {
        let kind = if entry.is_group() {
            let legend = normalize_label(entry.label);
            let mut children = Vec::new();
            for child in &entry.children {
                let Some(widget) = scan.find_widget(child.label, Some(&legend)) else {
                    return Ok(None);
                };
                let key = format!("{}.{}", entry.key, child.key);
                children.push(self.leaf_from_widget(index, page, child, key, widget)?);
            }
            let mut names: Vec<&str> = children.iter().map(|c| c.local_name()).collect();
            names.sort_unstable();
            let shape = if names == ["day", "month", "year"] {
                CompositeShape::Date
            } else {
                CompositeShape::Group
            };
            FieldKind::Composite { shape, children }
        } else if let Some(group) = scan.find_group(entry.label) {
            return self
                .options_field(index, page, entry, group)
                .map(Some);
        } else if let Some(widget) = scan.find_widget(entry.label, None) {
            return self
                .leaf_from_widget(index, page, entry, entry.key.to_string(), widget)
                .map(Some);
        } else {
            return Ok(None);
        };

        Ok(Some(descriptor(index, entry, entry.key.to_string(), None, kind)))
    }

    /// A radio group or multi-checkbox group under one legend.
    fn options_field(
        &self,
        index: usize,
        page: &MapPage,
        entry: &MapEntry,
        group: &Candidate,
    ) -> Result<FieldDescriptor, SchemaGenerationError> {
        let scraped = group
            .widgets
            .iter()
            .map(|w| {
                let label = clean_label(w.label.as_deref().unwrap_or_default());
                FieldOption {
                    value: label.clone(),
                    label,
                    code: w.value.clone(),
                    locator: locator_for(w),
                }
            })
            .collect();
        let options = translate_options(page, entry, scraped)?;
        let locator = group.locator();
        let kind = match group.kind {
            WidgetKind::Radio => FieldKind::Radio { options },
            _ => FieldKind::Checkbox { options },
        };
        if locator.is_none() {
            return Err(missing_label(page, entry.label));
        }
        Ok(descriptor(index, entry, entry.key.to_string(), locator, kind))
    }

    fn leaf_from_widget(
        &self,
        index: usize,
        page: &MapPage,
        entry: &MapEntry,
        key: String,
        widget: &ScrapedWidget,
    ) -> Result<FieldDescriptor, SchemaGenerationError> {
        let locator = locator_for(widget).ok_or_else(|| missing_label(page, entry.label))?;
        let kind = match classify_widget(widget) {
            WidgetKind::Text if entry.date => FieldKind::Date,
            WidgetKind::Text => FieldKind::Text,
            WidgetKind::Date => FieldKind::Date,
            WidgetKind::Select => FieldKind::Select {
                options: translate_options(page, entry, select_options(&widget.options))?,
            },
            WidgetKind::Checkbox | WidgetKind::Radio => {
                let single = FieldOption {
                    value: CHECKED_VALUE.to_string(),
                    label: clean_label(widget.label.as_deref().unwrap_or(entry.label)),
                    code: widget.value.clone(),
                    locator: Some(locator.clone()),
                };
                FieldKind::Checkbox {
                    options: vec![single],
                }
            }
            WidgetKind::Other => return Err(missing_label(page, entry.label)),
        };
        Ok(descriptor(index, entry, key, Some(locator), kind))
    }

    // ========================================================================
    // Dependent reveal
    // ========================================================================

    /// The entry is conditionally hidden: apply the value its condition
    /// waits for, re-scan, and try once more.
    #[allow(clippy::too_many_arguments)]
    fn reveal_and_match<B: FormBrowser>(
        &self,
        browser: &mut B,
        index: usize,
        page: &MapPage,
        entry: &MapEntry,
        earlier_pages: &[SchemaPage],
        current_fields: &[FieldDescriptor],
        scan: &mut PageScan,
    ) -> Result<FieldDescriptor, SchemaGenerationError> {
        let missing = || missing_label(page, entry.label);

        let triggers = entry
            .depends_on
            .as_ref()
            .map(|c| c.triggers())
            .unwrap_or_default();
        if triggers.is_empty() {
            return Err(missing());
        }

        for &(trigger_key, trigger_value) in &triggers {
            let trigger = earlier_pages
                .iter()
                .flat_map(|p| p.fields.iter())
                .chain(current_fields.iter())
                .find(|f| f.key == trigger_key)
                .ok_or_else(missing)?;

            let trigger_title = earlier_pages
                .get(trigger.page)
                .map(|p| p.title.as_str())
                .unwrap_or(page.title);
            let other_page = trigger.page != index;

            if other_page {
                browser.open_page(trigger_title)?;
            }
            if !apply_trigger(browser, trigger, trigger_value)? {
                return Err(missing());
            }
            browser.settle(self.options.settle_ms)?;
            if other_page {
                browser.open_page(page.title)?;
            }
        }

        scan.refresh(browser.extract_widgets()?);
        let detail = triggers
            .iter()
            .map(|(key, value)| format!("{} = {}", key, value))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::debug!(key = entry.key, triggers = %detail, "revealed dependent field");
        if let Some(tracer) = self.tracer {
            tracer.log(
                &tracer
                    .event(TraceKind::DependentRevealed)
                    .with_page(page.title)
                    .with_key(entry.key)
                    .with_detail(detail),
            );
        }

        self.match_entry(index, page, entry, scan)?.ok_or_else(missing)
    }

    fn trace_match(&self, page: &MapPage, field: &FieldDescriptor) {
        tracing::debug!(page = page.title, key = %field.key, kind = field.field_type().as_str(), "matched");
        if let Some(tracer) = self.tracer {
            tracer.log(
                &tracer
                    .event(TraceKind::FieldMatched)
                    .with_page(page.title)
                    .with_key(&field.key)
                    .with_widget(field.field_type().as_str()),
            );
        }
    }
}

/// Put `value` into the trigger widget. Returns false when the trigger
/// cannot take that value.
fn apply_trigger<B: FormBrowser>(
    browser: &mut B,
    trigger: &FieldDescriptor,
    value: &str,
) -> Result<bool, SchemaGenerationError> {
    let Some(locator) = trigger.locator.as_ref() else {
        return Ok(false);
    };
    match trigger.field_type() {
        FieldType::Text | FieldType::Date => browser.fill(locator, value)?,
        FieldType::Select => {
            let Some(option) = trigger.options().iter().find(|o| o.value == value) else {
                return Ok(false);
            };
            browser.select_option(locator, option)?;
        }
        FieldType::Radio | FieldType::Checkbox => {
            let Some(option) = trigger.options().iter().find(|o| o.value == value) else {
                return Ok(false);
            };
            browser.set_checked(option.locator.as_ref().unwrap_or(locator), true)?;
        }
        FieldType::Composite => return Ok(false),
    }
    Ok(true)
}

// ============================================================================
// Helpers
// ============================================================================

fn descriptor(
    index: usize,
    entry: &MapEntry,
    key: String,
    locator: Option<Locator>,
    kind: FieldKind,
) -> FieldDescriptor {
    FieldDescriptor {
        key,
        page: index,
        label: entry.label.to_string(),
        locator,
        kind,
        depends_on: entry.depends_on.clone(),
        aliases: entry.aliases.iter().map(|a| a.to_string()).collect(),
        optional: entry.optional,
        description: entry.description.to_string(),
    }
}

fn missing_label(page: &MapPage, label: &str) -> SchemaGenerationError {
    SchemaGenerationError::MissingLabel {
        page: page.title.to_string(),
        label: label.to_string(),
    }
}

/// Dropdown options minus the empty placeholder entry.
fn select_options(scraped: &[ScrapedOption]) -> Vec<FieldOption> {
    scraped
        .iter()
        .filter(|o| !o.value.trim().is_empty() && !o.label.trim().is_empty())
        .map(|o| {
            let label = o.label.trim().to_string();
            FieldOption {
                value: label.clone(),
                label,
                code: Some(o.value.clone()),
                locator: None,
            }
        })
        .collect()
}

/// Replace on-form text with canonical English values. Every required
/// translation must be offered; soft ones apply where present.
fn translate_options(
    page: &MapPage,
    entry: &MapEntry,
    mut options: Vec<FieldOption>,
) -> Result<Vec<FieldOption>, SchemaGenerationError> {
    for (canonical, on_form) in entry.options {
        let wanted = normalize_label(on_form);
        let option = options
            .iter_mut()
            .find(|o| normalize_label(&o.label) == wanted)
            .ok_or_else(|| SchemaGenerationError::MissingOption {
                page: page.title.to_string(),
                label: entry.label.to_string(),
                option: on_form.to_string(),
            })?;
        option.value = canonical.to_string();
    }
    for (canonical, on_form) in entry.soft_options {
        let wanted = normalize_label(on_form);
        if let Some(option) = options.iter_mut().find(|o| normalize_label(&o.label) == wanted) {
            option.value = canonical.to_string();
        }
    }
    Ok(options)
}

// ============================================================================
// Page scan state
// ============================================================================

/// Candidates on the current page plus the widgets already claimed by a
/// field, so two entries never bind to the same element.
struct PageScan {
    candidates: Vec<Candidate>,
    used: HashSet<Locator>,
}

impl PageScan {
    fn new(widgets: Vec<ScrapedWidget>) -> Self {
        PageScan {
            candidates: collect_candidates(&widgets),
            used: HashSet::new(),
        }
    }

    fn refresh(&mut self, widgets: Vec<ScrapedWidget>) {
        self.candidates = collect_candidates(&widgets);
    }

    fn is_used(&self, widget: &ScrapedWidget) -> bool {
        locator_for(widget).is_some_and(|l| self.used.contains(&l))
    }

    fn find_group(&self, legend: &str) -> Option<&Candidate> {
        let wanted = normalize_label(legend);
        self.candidates.iter().find(|c| {
            matches!(c.kind, WidgetKind::Radio | WidgetKind::Checkbox)
                && c.group.as_deref() == Some(wanted.as_str())
                && !c.widgets.iter().any(|w| self.is_used(w))
        })
    }

    /// An unclaimed, non-radio widget by its own label, optionally within
    /// a fieldset legend (already normalised).
    fn find_widget(&self, label: &str, legend: Option<&str>) -> Option<&ScrapedWidget> {
        let wanted = normalize_label(label);
        self.candidates
            .iter()
            .filter(|c| legend.is_none_or(|l| c.group.as_deref() == Some(l)))
            .flat_map(|c| c.widgets.iter())
            .find(|w| {
                classify_widget(w) != WidgetKind::Radio
                    && w.label.as_deref().map(normalize_label).as_deref() == Some(wanted.as_str())
                    && !self.is_used(w)
            })
    }

    fn consume(&mut self, field: &FieldDescriptor) {
        for leaf in field.leaves() {
            if let Some(locator) = &leaf.locator {
                self.used.insert(locator.clone());
            }
            for option in leaf.options() {
                if let Some(locator) = &option.locator {
                    self.used.insert(locator.clone());
                }
            }
        }
    }
}
