use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::browser::driver::{BrowserLauncher, FormBrowser};
use crate::browser::limiter::CancelToken;
use crate::browser::session::NodeLauncher;
use crate::cli::config::{AppConfig, build_filler_options, build_session_options};
use crate::error::{ArtifactError, FormError};
use crate::schema::catalog::{DefaultsCatalog, load_schema, read_json, skeleton, write_json};
use crate::schema::field_model::FieldSchema;
use crate::schema::form_map::FormMap;
use crate::scraper::generator::{GeneratorOptions, SchemaGenerator};
use crate::service::FillService;
use crate::trace::logger::TraceLogger;
use crate::translate::translator::FieldTranslator;

// ============================================================================
// generate subcommand
// ============================================================================

pub fn cmd_generate(config: &AppConfig, output_dir: &str, verbose: u8) -> Result<(), FormError> {
    let map = FormMap::videx().with_url(&config.form.url);
    let tracer = build_tracer(config);
    let options = GeneratorOptions {
        settle_ms: config.timeouts.settle_ms,
    };
    let defaults = match &config.artifacts.defaults {
        Some(path) => Some(read_json::<Value>(Path::new(path))?),
        None => None,
    };

    if verbose > 0 {
        eprintln!("Scanning {} (form map {})...", map.form_url, map.version);
    }

    let launcher = NodeLauncher::new(build_session_options(config));
    let mut session = launcher.launch(&CancelToken::new())?;
    let generated = SchemaGenerator::new(&map, options)
        .with_tracer(&tracer)
        .generate(&mut session, defaults);
    if let Err(e) = session.close() {
        tracing::warn!(error = %e, "browser session did not close cleanly");
    }
    let generated = generated?;

    let written = generated.write_to(Path::new(output_dir))?;
    for path in &written {
        if verbose > 0 {
            eprintln!("  Wrote: {}", path.display());
        }
    }

    println!(
        "Generated schema with {} fields on {} pages (fingerprint {}) in {}/",
        generated.schema.leaf_count(),
        generated.schema.pages.len(),
        generated.schema.fingerprint,
        output_dir
    );
    Ok(())
}

// ============================================================================
// template subcommand
// ============================================================================

pub fn cmd_template(config: &AppConfig, output: Option<&str>) -> Result<(), FormError> {
    let schema = load_schema(Path::new(&config.artifacts.schema))?;
    let defaults = load_defaults(config, &schema)?;
    let record = skeleton(&schema, &defaults);

    match output {
        Some(path) => {
            write_json(Path::new(path), &record)?;
            println!("Wrote applicant template to {}", path);
        }
        None => println!("{}", to_pretty(&record)?),
    }
    Ok(())
}

// ============================================================================
// plan subcommand
// ============================================================================

/// Translate without a browser and print one line per assignment.
pub fn cmd_plan(config: &AppConfig, data: &str) -> Result<(), FormError> {
    let schema = load_schema(Path::new(&config.artifacts.schema))?;
    let defaults = load_defaults(config, &schema)?;
    let record: Value = read_json(Path::new(data))?;

    let assignments = FieldTranslator::new(&schema, &defaults).translate_value(record)?;

    let mut current_page = None;
    for assignment in &assignments {
        if current_page != Some(assignment.page()) {
            current_page = Some(assignment.page());
            let title = schema
                .page(assignment.page())
                .map(|p| p.title.as_str())
                .unwrap_or("?");
            println!("[{}] {}", assignment.page() + 1, title);
        }
        println!(
            "  {:<36} {:<9} {}",
            assignment.key(),
            assignment.field.field_type().as_str(),
            assignment.display_value()
        );
    }
    println!("{} assignments", assignments.len());
    Ok(())
}

// ============================================================================
// fill subcommand
// ============================================================================

pub fn cmd_fill(config: &AppConfig, data: &str, output: Option<&str>, verbose: u8) -> Result<PathBuf, FormError> {
    let schema = load_schema(Path::new(&config.artifacts.schema))?;
    let defaults = load_defaults(config, &schema)?;
    let record: Value = read_json(Path::new(data))?;

    let out_path = match output {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(pdf_file_name(&record)),
    };

    let service = FillService::new(
        Arc::new(schema),
        Arc::new(defaults),
        NodeLauncher::new(build_session_options(config)),
        config.service.max_sessions,
    )
    .with_options(build_filler_options(config))
    .with_tracer(Arc::new(build_tracer(config)));

    if verbose > 0 {
        eprintln!("Filling {} ...", service.schema().form_url);
    }

    let outcome = service.fill_record(record, &CancelToken::new())?;
    std::fs::write(&out_path, &outcome.pdf).map_err(|e| ArtifactError::Io {
        path: out_path.clone(),
        source: e,
    })?;

    if !outcome.skipped.is_empty() {
        eprintln!("Skipped (hidden by earlier answers): {}", outcome.skipped.join(", "));
    }
    println!(
        "Wrote {} ({} bytes, {} fields filled)",
        out_path.display(),
        outcome.pdf.len(),
        outcome.applied.len()
    );
    Ok(out_path)
}

// ============================================================================
// Helpers
// ============================================================================

/// Configured defaults catalog, or the built-in one when none is configured.
pub fn load_defaults(config: &AppConfig, schema: &FieldSchema) -> Result<DefaultsCatalog, ArtifactError> {
    match &config.artifacts.defaults {
        Some(path) => DefaultsCatalog::load(Path::new(path), schema),
        None => Ok(DefaultsCatalog::builtin(schema)),
    }
}

fn build_tracer(config: &AppConfig) -> TraceLogger {
    match &config.trace.path {
        Some(path) => TraceLogger::new(Path::new(path)),
        None => TraceLogger::disabled(),
    }
}

fn to_pretty(value: &Value) -> Result<String, ArtifactError> {
    serde_json::to_string_pretty(value).map_err(|e| ArtifactError::Json {
        path: PathBuf::from("-"),
        source: e,
    })
}

/// `videx_<first_name>_<surname>.pdf`, falling back to `videx_application.pdf`.
pub fn pdf_file_name(record: &Value) -> String {
    let part = |key: &str| {
        record
            .get(key)
            .and_then(Value::as_str)
            .map(sanitize_filename)
            .filter(|s| !s.trim_matches('_').is_empty())
    };
    match (part("first_name"), part("surname")) {
        (Some(first), Some(last)) => format!("videx_{}_{}.pdf", first, last),
        (None, Some(name)) | (Some(name), None) => format!("videx_{}.pdf", name),
        (None, None) => "videx_application.pdf".to_string(),
    }
}

/// Sanitize a name into a safe filename.
pub fn sanitize_filename(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .to_lowercase()
}
