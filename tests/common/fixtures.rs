use std::collections::HashMap;

use serde_json::Value;
use videx_autofill::schema::catalog::DefaultsCatalog;
use videx_autofill::schema::field_model::{
    FieldDescriptor, FieldKind, FieldOption, FieldSchema, Locator, PrintAction, SchemaPage,
};
use videx_autofill::schema::form_map::{FormMap, MapEntry};
use videx_autofill::scraper::generator::{GeneratorOptions, SchemaGenerator};

use crate::common::fake_browser::{FakeBrowser, FakePage, FakeWidget, Reveal};

pub const EXAMPLE_APPLICANT: &str = include_str!("../../demos/example_applicant.json");

pub fn example_record() -> Value {
    serde_json::from_str(EXAMPLE_APPLICANT).unwrap()
}

// =========================================================================
// Fake VIDEX form
// =========================================================================

const COUNTRY_LABELS: &[&str] = &[
    "Deutschland",
    "Frankreich",
    "Vereinigtes Königreich",
    "Indien",
    "Türkei",
];

const RADIO_KEYS: &[&str] = &["gender", "reference_type"];
const CHECKBOX_GROUP_KEYS: &[&str] = &["cost_coverage", "means_of_support"];
const LONE_CHECKBOX_KEYS: &[&str] = &["eu_family_member", "residence_permit", "fingerprints_collected"];

/// A DOM shaped the way the VIDEX form renders the form map: one tab per
/// page, fieldsets for composites, dependent inputs hidden until their
/// trigger holds the right value.
pub fn videx_pages() -> Vec<FakePage> {
    let map = FormMap::videx();
    let mut reveals: HashMap<(String, String), Reveal> = HashMap::new();

    map.pages
        .iter()
        .map(|page| {
            let mut widgets = Vec::new();
            for entry in &page.entries {
                let mut built = entry_widgets(entry, &mut reveals);
                // The DOM reacts to the trigger nearest the field, which is the
                // last one in a conjunction.
                let nearest = entry.depends_on.as_ref().and_then(|c| {
                    c.triggers()
                        .into_iter()
                        .rev()
                        .find_map(|(key, value)| reveals.get(&(key.to_string(), value.to_string())).cloned())
                });
                if let Some(reveal) = nearest {
                    built = built.into_iter().map(|w| w.revealed_by(reveal.clone())).collect();
                }
                widgets.extend(built);
            }
            FakePage::new(page.title, widgets)
        })
        .collect()
}

fn entry_widgets(entry: &MapEntry, reveals: &mut HashMap<(String, String), Reveal>) -> Vec<FakeWidget> {
    let key = entry.key;

    if entry.is_group() {
        return entry
            .children
            .iter()
            .map(|child| {
                let id = format!("{}_{}", key, child.key);
                let widget = if child.soft_options.is_empty() {
                    FakeWidget::text(&id, child.label)
                } else {
                    FakeWidget::select(&id, child.label, COUNTRY_LABELS)
                };
                widget.in_group(entry.label)
            })
            .collect();
    }

    if !entry.options.is_empty() {
        let input_type = if RADIO_KEYS.contains(&key) {
            Some("radio")
        } else if CHECKBOX_GROUP_KEYS.contains(&key) {
            Some("checkbox")
        } else {
            None
        };

        return match input_type {
            Some(input_type) => entry
                .options
                .iter()
                .enumerate()
                .map(|(i, (canonical, german))| {
                    let widget = FakeWidget::choice(input_type, key, i, german).in_group(entry.label);
                    reveals.insert(
                        (key.to_string(), canonical.to_string()),
                        Reveal::Checked {
                            selector: widget.selector(),
                        },
                    );
                    widget
                })
                .collect(),
            None => {
                let labels: Vec<&str> = entry.options.iter().map(|(_, german)| *german).collect();
                let widget = FakeWidget::select(key, entry.label, &labels);
                for (canonical, german) in entry.options {
                    reveals.insert(
                        (key.to_string(), canonical.to_string()),
                        Reveal::Value {
                            selector: widget.selector(),
                            value: german.to_string(),
                        },
                    );
                }
                vec![widget]
            }
        };
    }

    let widget = if !entry.soft_options.is_empty() {
        FakeWidget::select(key, entry.label, COUNTRY_LABELS)
    } else if entry.date {
        FakeWidget::date(key, entry.label)
    } else if LONE_CHECKBOX_KEYS.contains(&key) {
        FakeWidget::checkbox(key, entry.label)
    } else {
        FakeWidget::text(key, entry.label)
    };
    vec![widget]
}

/// Schema produced by scanning [`videx_pages`].
pub fn videx_schema() -> FieldSchema {
    let map = FormMap::videx();
    let mut browser = FakeBrowser::new(videx_pages());
    SchemaGenerator::new(&map, GeneratorOptions::default())
        .scan(&mut browser)
        .expect("fake VIDEX form should scan cleanly")
}

pub fn videx_defaults(schema: &FieldSchema) -> DefaultsCatalog {
    DefaultsCatalog::builtin(schema)
}

// =========================================================================
// Two-page travel form
// =========================================================================

pub const TRAVEL_TITLE: &str = "Reise";
pub const COSTS_TITLE: &str = "Kosten";

pub fn sel(id: &str) -> String {
    Locator::by_id(id).0
}

/// `tour_operator` is only shown while the purpose is Tourismus, but the
/// schema does not know that.
pub fn travel_pages() -> Vec<FakePage> {
    vec![
        FakePage::new(
            TRAVEL_TITLE,
            vec![
                FakeWidget::select("purpose", "Reisezweck", &["Tourismus", "Sonstiges"]),
                FakeWidget::text("tour_operator", "Reiseveranstalter").revealed_by(Reveal::Value {
                    selector: sel("purpose"),
                    value: "Tourismus".into(),
                }),
                FakeWidget::text("note", "Bemerkung"),
            ],
        ),
        FakePage::new(COSTS_TITLE, vec![FakeWidget::text("sponsor", "Kostenträger")]),
    ]
}

fn leaf(key: &str, page: usize, label: &str, kind: FieldKind) -> FieldDescriptor {
    FieldDescriptor {
        key: key.to_string(),
        page,
        label: label.to_string(),
        locator: Some(Locator::by_id(key)),
        kind,
        depends_on: None,
        aliases: Vec::new(),
        optional: false,
        description: String::new(),
    }
}

pub fn option(value: &str, label: &str) -> FieldOption {
    FieldOption {
        value: value.to_string(),
        label: label.to_string(),
        code: None,
        locator: None,
    }
}

pub fn travel_schema() -> FieldSchema {
    let purpose = leaf(
        "purpose",
        0,
        "Reisezweck",
        FieldKind::Select {
            options: vec![option("Tourism", "Tourismus"), option("Other", "Sonstiges")],
        },
    );
    FieldSchema {
        form_url: "https://form.test/videx".to_string(),
        map_version: "test".to_string(),
        fingerprint: String::new(),
        pages: vec![
            SchemaPage {
                index: 0,
                name: "travel".to_string(),
                title: TRAVEL_TITLE.to_string(),
                ready: Some(Locator::by_id("purpose")),
                fields: vec![
                    purpose,
                    leaf("tour_operator", 0, "Reiseveranstalter", FieldKind::Text),
                    leaf("note", 0, "Bemerkung", FieldKind::Text),
                ],
            },
            SchemaPage {
                index: 1,
                name: "costs".to_string(),
                title: COSTS_TITLE.to_string(),
                ready: Some(Locator::by_id("sponsor")),
                fields: vec![leaf("sponsor", 1, "Kostenträger", FieldKind::Text)],
            },
        ],
        print: PrintAction {
            labels: vec!["Weiter".to_string(), "PDF herunterladen".to_string()],
        },
    }
    .with_fingerprint()
}
