use std::path::Path;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use videx_autofill::error::{ArtifactError, ValidationError};
use videx_autofill::schema::catalog::{
    CompleteTemplate, DefaultsCatalog, load_schema, read_json, skeleton, write_json,
};
use videx_autofill::schema::field_model::FieldType;
use videx_autofill::translate::assignment::FormValue;
use videx_autofill::translate::translator::FieldTranslator;

use crate::common::fixtures::{travel_schema, videx_defaults, videx_schema};

mod common;

// =========================================================================
// Schema artifact
// =========================================================================

#[test]
fn test_schema_survives_write_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("field_schema.json");
    let schema = videx_schema();

    write_json(&path, &schema).unwrap();
    let loaded = load_schema(&path).unwrap();

    assert_eq!(loaded, schema);
    assert_eq!(loaded.compute_fingerprint(), schema.fingerprint);
}

#[test]
fn test_load_schema_missing_file_is_io_error() {
    let err = load_schema(Path::new("no/such/field_schema.json")).unwrap_err();
    assert!(matches!(err, ArtifactError::Io { .. }));
}

#[test]
fn test_load_schema_malformed_json_is_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("field_schema.json");
    std::fs::write(&path, "{ \"form_url\": ").unwrap();

    let err = load_schema(&path).unwrap_err();
    assert!(matches!(err, ArtifactError::Json { .. }));
}

#[test]
fn test_load_schema_rejects_broken_invariants() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("field_schema.json");
    let mut schema = travel_schema();
    schema.pages[1].fields[0].page = 0;
    write_json(&path, &schema).unwrap();

    let err = load_schema(&path).unwrap_err();
    assert!(matches!(err, ArtifactError::Invariant(ref msg) if msg.contains("sponsor")));
}

#[test]
fn test_schema_rejects_dependency_on_later_field() {
    let mut schema = travel_schema();
    schema.pages[0].fields[0].depends_on = Some(
        videx_autofill::schema::condition::Condition::equals("sponsor", "ACME"),
    );

    assert!(matches!(schema.validate(), Err(ArtifactError::Invariant(_))));
}

#[test]
fn test_fingerprint_tracks_content() {
    let schema = travel_schema();
    let mut changed = schema.clone();
    changed.pages[0].fields[2].label = "Anmerkung".into();

    assert_ne!(changed.compute_fingerprint(), schema.fingerprint);
}

// =========================================================================
// Defaults catalog
// =========================================================================

#[test]
fn test_shipped_defaults_load_against_schema() {
    let schema = videx_schema();
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("artifacts/defaults.json");

    let defaults = DefaultsCatalog::load(&path, &schema).unwrap();

    assert_eq!(defaults.len(), 4);
    assert_eq!(defaults.get("cost_coverage"), Some(&json!("Applicant")));
    assert_eq!(defaults.get("_instructions"), None);
}

#[test]
fn test_defaults_accept_aliases_and_dotted_keys() {
    let schema = videx_schema();
    let defaults = DefaultsCatalog::from_value(
        json!({ "entries": "Multiple entries", "home_address.country": "Germany" }),
        &schema,
    )
    .unwrap();

    assert_eq!(defaults.get("number_of_entries"), Some(&json!("Multiple entries")));
    assert_eq!(defaults.lookup("home_address.country"), Some(&json!("Germany")));
    assert_eq!(defaults.lookup("home_address.city"), None);
}

#[test]
fn test_defaults_with_unknown_key_are_rejected() {
    let schema = videx_schema();
    let err = DefaultsCatalog::from_value(json!({ "visa_colour": "green" }), &schema).unwrap_err();
    assert_eq!(
        err,
        ValidationError::UnknownKeys {
            keys: vec!["visa_colour".into()]
        }
    );
}

#[test]
fn test_builtin_defaults_skip_keys_the_schema_lacks() {
    assert!(DefaultsCatalog::builtin(&travel_schema()).is_empty());
    assert_eq!(DefaultsCatalog::builtin(&videx_schema()).len(), 2);
}

#[test]
fn test_builtin_defaults_fall_back_to_empty_when_binding_fails() {
    let mut schema = travel_schema();
    // both built-in keys now name the same field
    schema.pages[0].fields[2].aliases = vec!["passport_type".into(), "number_of_entries".into()];

    assert!(DefaultsCatalog::from_value(
        json!({ "passport_type": "a", "number_of_entries": "b" }),
        &schema
    )
    .is_err());
    assert!(DefaultsCatalog::builtin(&schema).is_empty());
}

#[test]
fn test_group_default_fills_missing_child() {
    let schema = videx_schema();
    let defaults =
        DefaultsCatalog::from_value(json!({ "home_address": { "country": "Germany" } }), &schema)
            .unwrap();
    let record = json!({
        "home_address": {
            "street": "Hauptstraße",
            "house_number": "5",
            "postal_code": "10115",
            "city": "Berlin",
        }
    });

    let assignments = FieldTranslator::new(&schema, &defaults)
        .translate_value(record)
        .unwrap();
    let country = assignments
        .iter()
        .find(|a| a.key() == "home_address.country")
        .unwrap();
    assert!(matches!(&country.value, FormValue::Choice(o) if o.label == "Deutschland"));
}

// =========================================================================
// Template and skeleton
// =========================================================================

#[test]
fn test_template_lists_every_fillable_key() {
    let schema = videx_schema();
    let template = CompleteTemplate::build(&schema, &videx_defaults(&schema));

    let gender = template.entry("gender").unwrap();
    assert_eq!(gender.field_type, FieldType::Radio);
    assert_eq!(gender.page, "personal");
    assert_eq!(gender.aliases, vec!["sex"]);
    assert_eq!(gender.allowed, vec!["Male", "Female", "Diverse"]);

    let address = template.entry("home_address").unwrap();
    assert_eq!(
        address.format.as_deref(),
        Some("object with street, house_number, additional, postal_code, city, country")
    );
    assert!(template.entry("home_address.additional").unwrap().optional);
    assert_eq!(
        template.entry("means_of_support").unwrap().format.as_deref(),
        Some("one option or a list of options")
    );
    assert_eq!(
        template.entry("eu_family_member").unwrap().format.as_deref(),
        Some("true / false")
    );
}

#[test]
fn test_template_serializes_type_field() {
    let schema = videx_schema();
    let template = CompleteTemplate::build(&schema, &DefaultsCatalog::empty());
    let value = serde_json::to_value(&template).unwrap();

    let first = &value["fields"][0];
    assert_eq!(first["key"], "surname");
    assert_eq!(first["type"], "text");
    assert!(first.get("default").is_none());
}

#[test]
fn test_skeleton_has_every_key_prefilled_from_defaults() {
    let schema = videx_schema();
    let record = skeleton(&schema, &videx_defaults(&schema));

    assert!(record["_instructions"].is_string());
    for field in schema.fields() {
        assert!(record.get(&field.key).is_some(), "missing {}", field.key);
    }
    assert_eq!(record["passport_type"], "Ordinary passport");
    assert_eq!(record["date_of_birth"], "");
    assert_eq!(record["home_address"]["city"], "");
    assert_eq!(record["means_of_support"], json!([]));
    assert_eq!(record["fingerprints_collected"], json!(false));
}

#[test]
fn test_untouched_skeleton_translates() {
    let schema = videx_schema();
    let defaults = videx_defaults(&schema);
    let record = skeleton(&schema, &defaults);

    let assignments = FieldTranslator::new(&schema, &defaults)
        .translate_value(record)
        .unwrap();

    for assignment in &assignments {
        match &assignment.value {
            FormValue::Checks(states) => assert!(states.iter().all(|s| !s.checked)),
            FormValue::Choice(_) => assert!(defaults.get(assignment.key()).is_some()),
            FormValue::Text(text) => panic!("unexpected text {} = {}", assignment.key(), text),
        }
    }
}

#[test]
fn test_skeleton_written_as_json_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("applicant.json");
    let schema = videx_schema();
    let record = skeleton(&schema, &DefaultsCatalog::empty());

    write_json(&path, &record).unwrap();
    let back: Value = read_json(&path).unwrap();
    assert_eq!(back, record);
}
