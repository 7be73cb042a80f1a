use serde::{Deserialize, Serialize};

use crate::browser::driver::WidgetState;
use crate::scraper::widget::ScrapedWidget;

/// Request sent to form_driver.js over stdin (one JSON line).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum BrowserRequest {
    Navigate {
        url: String,
        timeout_ms: u64,
    },
    OpenPage {
        title: String,
        timeout_ms: u64,
    },
    WaitFor {
        selector: String,
        timeout_ms: u64,
    },
    Extract {
        timeout_ms: u64,
    },
    Fill {
        selector: String,
        value: String,
        timeout_ms: u64,
    },
    Select {
        selector: String,
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        timeout_ms: u64,
    },
    SetChecked {
        selector: String,
        checked: bool,
        timeout_ms: u64,
    },
    Settle {
        duration_ms: u64,
    },
    Screenshot {
        path: String,
        timeout_ms: u64,
    },
    PrintPdf {
        labels: Vec<String>,
        timeout_ms: u64,
    },
    Quit,
}

impl BrowserRequest {
    /// Wire name of the command, used in error reports.
    pub fn command(&self) -> &'static str {
        match self {
            BrowserRequest::Navigate { .. } => "navigate",
            BrowserRequest::OpenPage { .. } => "open_page",
            BrowserRequest::WaitFor { .. } => "wait_for",
            BrowserRequest::Extract { .. } => "extract",
            BrowserRequest::Fill { .. } => "fill",
            BrowserRequest::Select { .. } => "select",
            BrowserRequest::SetChecked { .. } => "set_checked",
            BrowserRequest::Settle { .. } => "settle",
            BrowserRequest::Screenshot { .. } => "screenshot",
            BrowserRequest::PrintPdf { .. } => "print_pdf",
            BrowserRequest::Quit => "quit",
        }
    }

    /// Time the driver itself may spend on the command. The driver answers
    /// within this budget, with `timeout: true` if its own wait ran out.
    pub fn budget_ms(&self) -> u64 {
        match self {
            BrowserRequest::Navigate { timeout_ms, .. }
            | BrowserRequest::OpenPage { timeout_ms, .. }
            | BrowserRequest::WaitFor { timeout_ms, .. }
            | BrowserRequest::Extract { timeout_ms }
            | BrowserRequest::Fill { timeout_ms, .. }
            | BrowserRequest::Select { timeout_ms, .. }
            | BrowserRequest::SetChecked { timeout_ms, .. }
            | BrowserRequest::Screenshot { timeout_ms, .. }
            | BrowserRequest::PrintPdf { timeout_ms, .. } => *timeout_ms,
            BrowserRequest::Settle { duration_ms } => *duration_ms,
            BrowserRequest::Quit => 0,
        }
    }
}

/// Response received from form_driver.js over stdout (one JSON line).
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Set on the startup line only
    #[serde(default)]
    pub ready: Option<bool>,
    /// The driver's own wait elapsed
    #[serde(default)]
    pub timeout: bool,
    #[serde(default)]
    pub state: Option<WidgetState>,
    #[serde(default)]
    pub widgets: Option<Vec<ScrapedWidget>>,
    #[serde(default)]
    pub pdf_base64: Option<String>,
}
