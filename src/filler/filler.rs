use std::path::PathBuf;

use chrono::Utc;

use crate::browser::driver::{BrowserLauncher, FormBrowser, WidgetState};
use crate::browser::limiter::CancelToken;
use crate::error::AutomationError;
use crate::filler::context::FillContext;
use crate::filler::plan::{FillPlan, PageStep};
use crate::schema::field_model::{FieldSchema, FieldType, Locator};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::{TraceEvent, TraceKind};
use crate::translate::assignment::{Assignment, FormValue};

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Clone)]
pub struct FillerOptions {
    /// Bounded wait for each widget to become interactive
    pub widget_timeout_ms: u64,
    /// Pause after each applied assignment
    pub settle_ms: u64,
    pub pdf_timeout_ms: u64,
    /// Where failure screenshots go; none taken when unset
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for FillerOptions {
    fn default() -> Self {
        FillerOptions {
            widget_timeout_ms: 10_000,
            settle_ms: 300,
            pdf_timeout_ms: 30_000,
            screenshot_dir: None,
        }
    }
}

/// Result of a successful fill.
#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub pdf: Vec<u8>,
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

/// Replays assignments into one browser session and renders the PDF.
pub struct FormFiller<'a> {
    options: &'a FillerOptions,
    tracer: Option<&'a TraceLogger>,
}

impl<'a> FormFiller<'a> {
    pub fn new(options: &'a FillerOptions) -> Self {
        FormFiller {
            options,
            tracer: None,
        }
    }

    pub fn with_tracer(mut self, tracer: &'a TraceLogger) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Open a session, fill, render, and close the session on every path.
    pub fn fill<L: BrowserLauncher>(
        &self,
        launcher: &L,
        schema: &FieldSchema,
        assignments: &[Assignment],
        cancel: &CancelToken,
    ) -> Result<FillOutcome, AutomationError> {
        let plan = FillPlan::build(schema, assignments)?;
        cancel.check()?;

        let mut session = launcher.launch(cancel)?;
        self.trace(TraceKind::SessionOpened, |e| e);

        let result = self.fill_session(&mut session, schema, &plan, cancel);
        if let Err(e) = &result {
            self.capture_failure(&mut session, e);
        }

        if let Err(e) = session.close() {
            tracing::warn!(error = %e, "browser session did not close cleanly");
        }
        self.trace(TraceKind::SessionClosed, |e| e);
        result
    }

    /// Fill through an already open session. The caller owns the session.
    pub fn fill_session<B: FormBrowser>(
        &self,
        browser: &mut B,
        schema: &FieldSchema,
        plan: &FillPlan<'_>,
        cancel: &CancelToken,
    ) -> Result<FillOutcome, AutomationError> {
        let mut ctx = FillContext::new();

        browser.navigate(&schema.form_url)?;

        for step in &plan.steps {
            cancel.check()?;
            self.enter_page(browser, step, &mut ctx)?;

            for assignment in &step.assignments {
                cancel.check()?;
                self.apply_one(browser, assignment, &mut ctx)?;
            }
        }

        cancel.check()?;
        let pdf = browser.print_pdf(&schema.print.labels, self.options.pdf_timeout_ms)?;
        if pdf.is_empty() {
            return Err(AutomationError::PdfGeneration("rendered document is empty".into()));
        }
        if !pdf.starts_with(PDF_MAGIC) {
            return Err(AutomationError::PdfGeneration(
                "rendered document is not a PDF".into(),
            ));
        }

        tracing::info!(
            bytes = pdf.len(),
            applied = ctx.applied.len(),
            skipped = ctx.skipped.len(),
            "form rendered to PDF"
        );
        self.trace(TraceKind::PdfRendered, |e| e.with_bytes(pdf.len()));

        Ok(FillOutcome {
            pdf,
            applied: ctx.applied,
            skipped: ctx.skipped,
        })
    }

    fn enter_page<B: FormBrowser>(
        &self,
        browser: &mut B,
        step: &PageStep<'_>,
        ctx: &mut FillContext,
    ) -> Result<(), AutomationError> {
        let title = step.page.title.as_str();
        ctx.enter_page(title);

        browser.open_page(title).map_err(|e| match e {
            AutomationError::Protocol { error, .. } => {
                tracing::warn!(page = title, %error, "page did not open");
                AutomationError::PageUnavailable {
                    page: title.to_string(),
                }
            }
            other => other,
        })?;

        if let Some(ready) = &step.page.ready {
            let state = browser.wait_for(ready, self.options.widget_timeout_ms)?;
            if state != WidgetState::Ready {
                return Err(AutomationError::PageUnavailable {
                    page: title.to_string(),
                });
            }
        }

        tracing::info!(page = title, assignments = step.assignments.len(), "filling page");
        self.trace(TraceKind::PageEntered, |e| e.with_page(title));
        Ok(())
    }

    /// Wait for the widget, then write the value. A widget that is hidden
    /// or disabled after an earlier choice on the same page is skipped.
    fn apply_one<B: FormBrowser>(
        &self,
        browser: &mut B,
        assignment: &Assignment,
        ctx: &mut FillContext,
    ) -> Result<(), AutomationError> {
        let key = assignment.key();
        let page = ctx.page_name().to_string();
        let not_found = || AutomationError::WidgetNotFound {
            key: key.to_string(),
            page: page.clone(),
        };
        let locator = assignment.field.locator.as_ref().ok_or_else(not_found)?;

        let state = browser.wait_for(locator, self.options.widget_timeout_ms)?;
        match state {
            WidgetState::Ready => {}
            WidgetState::Hidden | WidgetState::Disabled if ctx.interacted_on_page() => {
                tracing::warn!(key, page = %page, ?state, "target not interactable after earlier choice, skipping");
                self.trace(TraceKind::Skipped, |e| {
                    e.with_page(&page)
                        .with_key(key)
                        .with_detail(format!("{:?}", state))
                });
                ctx.record_skipped(key);
                return Ok(());
            }
            _ => return Err(not_found()),
        }

        self.write_value(browser, assignment, locator).map_err(|e| match e {
            AutomationError::Protocol { command, error } => {
                tracing::warn!(key, %command, %error, "driver rejected value");
                not_found()
            }
            other => other,
        })?;
        browser.settle(self.options.settle_ms)?;

        tracing::debug!(key, widget = assignment.field.field_type().as_str(), "applied");
        self.trace(TraceKind::Applied, |e| {
            e.with_page(&page)
                .with_key(key)
                .with_widget(assignment.field.field_type().as_str())
        });
        ctx.record_applied(key);
        Ok(())
    }

    fn write_value<B: FormBrowser>(
        &self,
        browser: &mut B,
        assignment: &Assignment,
        locator: &Locator,
    ) -> Result<(), AutomationError> {
        match &assignment.value {
            FormValue::Text(text) => browser.fill(locator, text),
            FormValue::Choice(option) => match assignment.field.field_type() {
                FieldType::Radio => {
                    browser.set_checked(option.locator.as_ref().unwrap_or(locator), true)
                }
                _ => browser.select_option(locator, option),
            },
            FormValue::Checks(states) => {
                for state in states {
                    let target = state.option.locator.as_ref().unwrap_or(locator);
                    browser.set_checked(target, state.checked)?;
                }
                Ok(())
            }
        }
    }

    fn capture_failure<B: FormBrowser>(&self, browser: &mut B, error: &AutomationError) {
        self.trace(TraceKind::Failed, |e| e.with_detail(error));

        let Some(dir) = &self.options.screenshot_dir else {
            return;
        };
        if matches!(
            error,
            AutomationError::Timeout { .. } | AutomationError::SessionIo(_) | AutomationError::Cancelled
        ) {
            // session is gone, wedged, or no longer wanted
            return;
        }
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot create screenshot directory");
            return;
        }
        let path = dir.join(format!("fill_error_{}.png", Utc::now().format("%Y%m%d_%H%M%S%.3f")));
        match browser.screenshot(&path) {
            Ok(()) => tracing::info!(path = %path.display(), "failure screenshot saved"),
            Err(e) => tracing::warn!(error = %e, "failure screenshot not taken"),
        }
    }

    fn trace(&self, kind: TraceKind, build: impl FnOnce(TraceEvent) -> TraceEvent) {
        if let Some(tracer) = self.tracer {
            tracer.log(&build(tracer.event(kind)));
        }
    }
}
