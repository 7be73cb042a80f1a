use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::browser::limiter::CancelToken;
use crate::error::AutomationError;
use crate::schema::field_model::{FieldOption, Locator};
use crate::scraper::widget::ScrapedWidget;

/// What a bounded wait found at a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetState {
    /// Visible and enabled
    Ready,
    /// Attached but not visible
    Hidden,
    /// Visible but disabled or read-only
    Disabled,
    /// Not in the DOM
    Missing,
}

/// Browser operations the generator and filler need.
///
/// Implemented by [`BrowserSession`](crate::browser::session::BrowserSession)
/// over the Node.js driver, and by in-memory fakes in tests.
pub trait FormBrowser {
    fn navigate(&mut self, url: &str) -> Result<(), AutomationError>;

    /// Switch to the form page whose tab caption is `title`.
    fn open_page(&mut self, title: &str) -> Result<(), AutomationError>;

    /// Wait up to `timeout_ms` for the element to become ready; returns the
    /// last observed state instead of failing when it does not.
    fn wait_for(&mut self, locator: &Locator, timeout_ms: u64) -> Result<WidgetState, AutomationError>;

    fn extract_widgets(&mut self) -> Result<Vec<ScrapedWidget>, AutomationError>;

    fn fill(&mut self, locator: &Locator, value: &str) -> Result<(), AutomationError>;

    fn select_option(&mut self, locator: &Locator, option: &FieldOption) -> Result<(), AutomationError>;

    fn set_checked(&mut self, locator: &Locator, checked: bool) -> Result<(), AutomationError>;

    /// Let client-side scripts react to the last interaction.
    fn settle(&mut self, duration_ms: u64) -> Result<(), AutomationError>;

    fn screenshot(&mut self, path: &Path) -> Result<(), AutomationError>;

    /// Click through `labels` and return the rendered document.
    fn print_pdf(&mut self, labels: &[String], timeout_ms: u64) -> Result<Vec<u8>, AutomationError>;

    /// Release the browser. Must be safe to call more than once.
    fn close(&mut self) -> Result<(), AutomationError>;
}

/// Opens one isolated browser session per call.
pub trait BrowserLauncher: Send + Sync {
    type Session: FormBrowser;

    /// The session aborts any in-flight command once `cancel` trips.
    fn launch(&self, cancel: &CancelToken) -> Result<Self::Session, AutomationError>;
}
