use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::browser::driver::BrowserLauncher;
use crate::browser::limiter::{CancelToken, SessionLimiter};
use crate::error::FormError;
use crate::filler::filler::{FillOutcome, FillerOptions, FormFiller};
use crate::schema::catalog::DefaultsCatalog;
use crate::schema::field_model::FieldSchema;
use crate::trace::logger::TraceLogger;
use crate::translate::assignment::Assignment;
use crate::translate::translator::FieldTranslator;

/// Serves fill requests against one loaded schema.
///
/// Schema and defaults are read-only and shared by every request. Each
/// request translates its record first, then waits for a session slot and
/// fills through its own browser session.
pub struct FillService<L: BrowserLauncher> {
    schema: Arc<FieldSchema>,
    defaults: Arc<DefaultsCatalog>,
    limiter: SessionLimiter,
    launcher: L,
    options: FillerOptions,
    tracer: Arc<TraceLogger>,
}

/// Snapshot for a health check.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub form_url: String,
    pub map_version: String,
    pub fingerprint: String,
    pub fields: usize,
    pub defaults: usize,
    pub max_sessions: usize,
    pub available_sessions: usize,
}

impl<L: BrowserLauncher> FillService<L> {
    pub fn new(
        schema: Arc<FieldSchema>,
        defaults: Arc<DefaultsCatalog>,
        launcher: L,
        max_sessions: usize,
    ) -> Self {
        FillService {
            schema,
            defaults,
            limiter: SessionLimiter::new(max_sessions),
            launcher,
            options: FillerOptions::default(),
            tracer: Arc::new(TraceLogger::disabled()),
        }
    }

    pub fn with_options(mut self, options: FillerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_tracer(mut self, tracer: Arc<TraceLogger>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn defaults(&self) -> &DefaultsCatalog {
        &self.defaults
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            form_url: self.schema.form_url.clone(),
            map_version: self.schema.map_version.clone(),
            fingerprint: self.schema.fingerprint.clone(),
            fields: self.schema.leaf_count(),
            defaults: self.defaults.len(),
            max_sessions: self.limiter.max(),
            available_sessions: self.limiter.available(),
        }
    }

    /// Translate a raw record without touching a browser.
    pub fn plan(&self, record: Value) -> Result<Vec<Assignment>, FormError> {
        let translator = FieldTranslator::new(&self.schema, &self.defaults);
        Ok(translator.translate_value(record)?)
    }

    /// Translate, wait for a session slot, fill and render.
    ///
    /// Validation failures return before a slot is taken. Cancelling `cancel`
    /// aborts both the wait for a slot and an in-flight fill.
    pub fn fill_record(&self, record: Value, cancel: &CancelToken) -> Result<FillOutcome, FormError> {
        let assignments = self.plan(record)?;
        tracing::info!(assignments = assignments.len(), "record translated");

        let _permit = self.limiter.acquire(cancel)?;
        let filler = FormFiller::new(&self.options).with_tracer(&self.tracer);
        let outcome = filler.fill(&self.launcher, &self.schema, &assignments, cancel)?;
        Ok(outcome)
    }

    /// [`fill_record`](Self::fill_record), keeping only the document.
    pub fn fill_pdf(&self, record: Value, cancel: &CancelToken) -> Result<Vec<u8>, FormError> {
        self.fill_record(record, cancel).map(|outcome| outcome.pdf)
    }
}
