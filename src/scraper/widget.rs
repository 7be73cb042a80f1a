use serde::{Deserialize, Serialize};

use crate::schema::field_model::Locator;

/// One interactive element as reported by the driver's `extract` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedWidget {
    pub tag: String,
    #[serde(rename = "type", default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    /// Resolved label text (`<label for>`, wrapping label, aria-label)
    #[serde(default)]
    pub label: Option<String>,
    /// Legend of the enclosing fieldset, if any
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    #[serde(default)]
    pub options: Vec<ScrapedOption>,
}

fn visible_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Text,
    Date,
    Select,
    Radio,
    Checkbox,
    /// Buttons, hidden inputs and anything not fillable
    Other,
}

/// Widget kind from tag, `type` and date placeholders.
pub fn classify_widget(widget: &ScrapedWidget) -> WidgetKind {
    let tag = widget.tag.to_lowercase();
    let input_type = widget
        .input_type
        .as_deref()
        .unwrap_or("text")
        .to_lowercase();

    match tag.as_str() {
        "select" => WidgetKind::Select,
        "textarea" => WidgetKind::Text,
        "input" => match input_type.as_str() {
            "radio" => WidgetKind::Radio,
            "checkbox" => WidgetKind::Checkbox,
            "date" => WidgetKind::Date,
            "hidden" | "submit" | "button" | "reset" | "image" | "file" => WidgetKind::Other,
            _ if has_date_placeholder(widget) => WidgetKind::Date,
            _ => WidgetKind::Text,
        },
        _ => WidgetKind::Other,
    }
}

fn has_date_placeholder(widget: &ScrapedWidget) -> bool {
    widget.placeholder.as_deref().is_some_and(|p| {
        let p = p.to_uppercase();
        p.contains("TT.MM.JJJJ") || p.contains("DD.MM.YYYY")
    })
}

/// Label text as displayed: required-markers, trailing colons and extra
/// whitespace removed.
pub fn clean_label(raw: &str) -> String {
    raw.replace(['*', '\u{a0}'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(':')
        .trim()
        .to_string()
}

/// [`clean_label`], lower-cased: the form used for matching.
pub fn normalize_label(raw: &str) -> String {
    clean_label(raw).to_lowercase()
}

/// Stable selector for a widget: its id, else name (+ value for grouped
/// inputs). `None` when the element has neither.
pub fn locator_for(widget: &ScrapedWidget) -> Option<Locator> {
    if let Some(id) = widget.id.as_deref().filter(|id| !id.is_empty()) {
        return Some(Locator::by_id(id));
    }
    let name = widget.name.as_deref().filter(|n| !n.is_empty())?;
    let tag = widget.tag.to_lowercase();
    match (classify_widget(widget), widget.value.as_deref()) {
        (WidgetKind::Radio | WidgetKind::Checkbox, Some(value)) => {
            Some(Locator::by_name_value(&tag, name, value))
        }
        _ => Some(Locator::by_name(&tag, name)),
    }
}

// ============================================================================
// Candidates
// ============================================================================

/// A labelled unit the form map can match: a single input, or a radio /
/// checkbox group under one legend.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Normalised label of the first widget
    pub label: String,
    /// Normalised legend of the enclosing fieldset
    pub group: Option<String>,
    pub kind: WidgetKind,
    pub widgets: Vec<ScrapedWidget>,
}

impl Candidate {
    pub fn locator(&self) -> Option<Locator> {
        self.widgets.first().and_then(locator_for)
    }

    pub fn is_option_group(&self) -> bool {
        matches!(self.kind, WidgetKind::Radio | WidgetKind::Checkbox) && self.widgets.len() > 1
    }
}

/// Group the page's widgets into candidates, preserving document order.
///
/// Radios always group by legend (falling back to `name`). Checkboxes group
/// when several share a legend; a lone checkbox stands for itself.
pub fn collect_candidates(widgets: &[ScrapedWidget]) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();

    for widget in widgets.iter().filter(|w| w.visible) {
        let kind = classify_widget(widget);
        if kind == WidgetKind::Other {
            continue;
        }
        let own_label = widget.label.as_deref().map(normalize_label).unwrap_or_default();
        let legend = widget.group.as_deref().map(normalize_label);

        if matches!(kind, WidgetKind::Radio | WidgetKind::Checkbox) {
            let group_key = legend
                .clone()
                .or_else(|| widget.name.as_deref().map(normalize_label));
            if let Some(group_key) = group_key {
                let existing = candidates
                    .iter_mut()
                    .find(|c| c.kind == kind && c.group.as_deref() == Some(group_key.as_str()));
                if let Some(existing) = existing {
                    existing.widgets.push(widget.clone());
                    continue;
                }
                candidates.push(Candidate {
                    label: own_label,
                    group: Some(group_key),
                    kind,
                    widgets: vec![widget.clone()],
                });
                continue;
            }
        }

        candidates.push(Candidate {
            label: own_label,
            group: legend,
            kind,
            widgets: vec![widget.clone()],
        });
    }

    candidates
}
