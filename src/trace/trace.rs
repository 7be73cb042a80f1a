use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened. One JSON line per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    SessionOpened,
    PageEntered,
    FieldMatched,
    DependentRevealed,
    Applied,
    Skipped,
    PdfRendered,
    Failed,
    SessionClosed,
}

/// A fill or generation trace record. Carries field keys and widget types,
/// never applicant values.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub timestamp: DateTime<Utc>,
    pub step: u64,
    pub kind: TraceKind,

    pub page: Option<String>,
    pub key: Option<String>,
    pub widget: Option<String>,

    pub detail: Option<String>,
    pub bytes: Option<usize>,
}

impl TraceEvent {
    pub fn now(step: u64, kind: TraceKind) -> Self {
        Self {
            timestamp: Utc::now(),
            step,
            kind,
            page: None,
            key: None,
            widget: None,
            detail: None,
            bytes: None,
        }
    }

    pub fn with_page(mut self, page: impl ToString) -> Self {
        self.page = Some(page.to_string());
        self
    }

    pub fn with_key(mut self, key: impl ToString) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn with_widget(mut self, widget: impl ToString) -> Self {
        self.widget = Some(widget.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    pub fn with_bytes(mut self, bytes: usize) -> Self {
        self.bytes = Some(bytes);
        self
    }
}
