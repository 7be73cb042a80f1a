use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use videx_autofill::browser::driver::{BrowserLauncher, FormBrowser, WidgetState};
use videx_autofill::browser::limiter::CancelToken;
use videx_autofill::error::AutomationError;
use videx_autofill::schema::field_model::{FieldOption, Locator};
use videx_autofill::scraper::widget::{ScrapedOption, ScrapedWidget, locator_for};

pub const FAKE_PDF: &[u8] = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\n%%EOF\n";

// =========================================================================
// Widgets and pages
// =========================================================================

/// When a conditionally shown widget becomes visible.
#[derive(Debug, Clone, PartialEq)]
pub enum Reveal {
    /// The select or input at `selector` holds `value` (selects: option label)
    Value { selector: String, value: String },
    /// The checkbox or radio at `selector` is checked
    Checked { selector: String },
}

#[derive(Debug, Clone)]
pub struct FakeWidget {
    pub scraped: ScrapedWidget,
    pub reveal: Option<Reveal>,
    pub disabled: bool,
}

fn scraped(tag: &str, input_type: Option<&str>, id: &str, label: &str) -> ScrapedWidget {
    ScrapedWidget {
        tag: tag.to_string(),
        input_type: input_type.map(str::to_string),
        id: Some(id.to_string()),
        name: Some(id.to_string()),
        value: None,
        label: Some(label.to_string()),
        group: None,
        placeholder: None,
        visible: true,
        options: Vec::new(),
    }
}

impl FakeWidget {
    pub fn text(id: &str, label: &str) -> Self {
        FakeWidget {
            scraped: scraped("input", Some("text"), id, label),
            reveal: None,
            disabled: false,
        }
    }

    pub fn date(id: &str, label: &str) -> Self {
        let mut widget = FakeWidget::text(id, label);
        widget.scraped.placeholder = Some("TT.MM.JJJJ".to_string());
        widget
    }

    /// Dropdown with an empty placeholder entry followed by `labels`.
    pub fn select(id: &str, label: &str, labels: &[&str]) -> Self {
        let mut widget = FakeWidget::text(id, label);
        widget.scraped.tag = "select".to_string();
        widget.scraped.input_type = None;
        widget.scraped.options = std::iter::once(ScrapedOption {
            value: String::new(),
            label: "Bitte wählen".to_string(),
        })
        .chain(labels.iter().enumerate().map(|(i, l)| ScrapedOption {
            value: format!("{}", i + 1),
            label: l.to_string(),
        }))
        .collect();
        widget
    }

    pub fn checkbox(id: &str, label: &str) -> Self {
        let mut widget = FakeWidget::text(id, label);
        widget.scraped.input_type = Some("checkbox".to_string());
        widget
    }

    /// One member of a radio or checkbox group sharing `name`.
    pub fn choice(input_type: &str, name: &str, index: usize, label: &str) -> Self {
        let mut widget = FakeWidget::text(&format!("{}_{}", name, index), label);
        widget.scraped.input_type = Some(input_type.to_string());
        widget.scraped.name = Some(name.to_string());
        widget.scraped.value = Some(index.to_string());
        widget
    }

    pub fn in_group(mut self, legend: &str) -> Self {
        self.scraped.group = Some(legend.to_string());
        self
    }

    pub fn revealed_by(mut self, reveal: Reveal) -> Self {
        self.reveal = Some(reveal);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.scraped.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn selector(&self) -> String {
        locator_for(&self.scraped).map(|l| l.0).unwrap_or_default()
    }

    fn is_radio(&self) -> bool {
        self.scraped.input_type.as_deref() == Some("radio")
    }
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub title: String,
    pub widgets: Vec<FakeWidget>,
}

impl FakePage {
    pub fn new(title: &str, widgets: Vec<FakeWidget>) -> Self {
        FakePage {
            title: title.to_string(),
            widgets,
        }
    }
}

/// Everything a fake session was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(String),
    OpenPage(String),
    Fill(String, String),
    Select(String, String),
    Check(String, bool),
    Screenshot,
    PrintPdf(Vec<String>),
    Close,
}

pub type ActionLog = Arc<Mutex<Vec<Action>>>;

#[derive(Debug, Default)]
pub struct SessionCounter {
    live: AtomicUsize,
    peak: AtomicUsize,
}

impl SessionCounter {
    fn opened(&self) {
        let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn closed(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

// =========================================================================
// FakeBrowser
// =========================================================================

/// In-memory form: pages of widgets with conditional visibility.
pub struct FakeBrowser {
    pages: Vec<FakePage>,
    current: Option<usize>,
    values: HashMap<String, String>,
    checked: HashMap<String, bool>,
    pdf: Vec<u8>,
    pdf_delay: Duration,
    reject_fill: Option<String>,
    log: ActionLog,
    counter: Option<Arc<SessionCounter>>,
    closed: bool,
}

impl FakeBrowser {
    pub fn new(pages: Vec<FakePage>) -> Self {
        FakeBrowser {
            pages,
            current: None,
            values: HashMap::new(),
            checked: HashMap::new(),
            pdf: FAKE_PDF.to_vec(),
            pdf_delay: Duration::ZERO,
            reject_fill: None,
            log: Arc::new(Mutex::new(Vec::new())),
            counter: None,
            closed: false,
        }
    }

    pub fn with_pdf(mut self, pdf: &[u8]) -> Self {
        self.pdf = pdf.to_vec();
        self
    }

    pub fn actions(&self) -> Vec<Action> {
        self.log.lock().unwrap().clone()
    }

    pub fn value_of(&self, selector: &str) -> Option<&str> {
        self.values.get(selector).map(String::as_str)
    }

    pub fn is_checked(&self, selector: &str) -> bool {
        self.checked.get(selector).copied().unwrap_or(false)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn record(&self, action: Action) {
        self.log.lock().unwrap().push(action);
    }

    fn widget(&self, selector: &str) -> Option<&FakeWidget> {
        let page = self.pages.get(self.current?)?;
        page.widgets.iter().find(|w| w.selector() == selector)
    }

    fn is_visible(&self, widget: &FakeWidget) -> bool {
        if !widget.scraped.visible {
            return false;
        }
        match &widget.reveal {
            None => true,
            Some(Reveal::Value { selector, value }) => self.values.get(selector) == Some(value),
            Some(Reveal::Checked { selector }) => self.is_checked(selector),
        }
    }

    fn interactable(&self, locator: &Locator, command: &str) -> Result<&FakeWidget, AutomationError> {
        let widget = self.widget(locator.as_str()).ok_or_else(|| AutomationError::Protocol {
            command: command.to_string(),
            error: format!("no element matches {}", locator),
        })?;
        if !self.is_visible(widget) || widget.disabled {
            return Err(AutomationError::Protocol {
                command: command.to_string(),
                error: format!("element {} is not interactable", locator),
            });
        }
        Ok(widget)
    }
}

impl FormBrowser for FakeBrowser {
    fn navigate(&mut self, url: &str) -> Result<(), AutomationError> {
        self.record(Action::Navigate(url.to_string()));
        self.current = if self.pages.is_empty() { None } else { Some(0) };
        Ok(())
    }

    fn open_page(&mut self, title: &str) -> Result<(), AutomationError> {
        self.record(Action::OpenPage(title.to_string()));
        let index = self
            .pages
            .iter()
            .position(|p| p.title == title)
            .ok_or_else(|| AutomationError::Protocol {
                command: "open_page".into(),
                error: format!("no tab captioned '{}'", title),
            })?;
        self.current = Some(index);
        Ok(())
    }

    fn wait_for(&mut self, locator: &Locator, _timeout_ms: u64) -> Result<WidgetState, AutomationError> {
        Ok(match self.widget(locator.as_str()) {
            None => WidgetState::Missing,
            Some(w) if !self.is_visible(w) => WidgetState::Hidden,
            Some(w) if w.disabled => WidgetState::Disabled,
            Some(_) => WidgetState::Ready,
        })
    }

    fn extract_widgets(&mut self) -> Result<Vec<ScrapedWidget>, AutomationError> {
        let Some(page) = self.current.and_then(|i| self.pages.get(i)) else {
            return Ok(Vec::new());
        };
        Ok(page
            .widgets
            .iter()
            .map(|w| {
                let mut scraped = w.scraped.clone();
                scraped.visible = self.is_visible(w);
                scraped
            })
            .collect())
    }

    fn fill(&mut self, locator: &Locator, value: &str) -> Result<(), AutomationError> {
        self.interactable(locator, "fill")?;
        if self.reject_fill.as_deref() == Some(locator.as_str()) {
            return Err(AutomationError::Protocol {
                command: "fill".into(),
                error: "input rejected the value".into(),
            });
        }
        self.values.insert(locator.0.clone(), value.to_string());
        self.record(Action::Fill(locator.0.clone(), value.to_string()));
        Ok(())
    }

    fn select_option(&mut self, locator: &Locator, option: &FieldOption) -> Result<(), AutomationError> {
        let widget = self.interactable(locator, "select")?;
        if !widget.scraped.options.iter().any(|o| o.label == option.label) {
            return Err(AutomationError::Protocol {
                command: "select".into(),
                error: format!("option '{}' not offered", option.label),
            });
        }
        self.values.insert(locator.0.clone(), option.label.clone());
        self.record(Action::Select(locator.0.clone(), option.label.clone()));
        Ok(())
    }

    fn set_checked(&mut self, locator: &Locator, checked: bool) -> Result<(), AutomationError> {
        let widget = self.interactable(locator, "set_checked")?;
        if widget.is_radio() && checked {
            let name = widget.scraped.name.clone();
            let siblings: Vec<String> = self.pages[self.current.unwrap_or(0)]
                .widgets
                .iter()
                .filter(|w| w.is_radio() && w.scraped.name == name)
                .map(FakeWidget::selector)
                .collect();
            for sibling in siblings {
                self.checked.insert(sibling, false);
            }
        }
        self.checked.insert(locator.0.clone(), checked);
        self.record(Action::Check(locator.0.clone(), checked));
        Ok(())
    }

    fn settle(&mut self, _duration_ms: u64) -> Result<(), AutomationError> {
        Ok(())
    }

    fn screenshot(&mut self, _path: &Path) -> Result<(), AutomationError> {
        self.record(Action::Screenshot);
        Ok(())
    }

    fn print_pdf(&mut self, labels: &[String], _timeout_ms: u64) -> Result<Vec<u8>, AutomationError> {
        self.record(Action::PrintPdf(labels.to_vec()));
        if !self.pdf_delay.is_zero() {
            thread::sleep(self.pdf_delay);
        }
        Ok(self.pdf.clone())
    }

    fn close(&mut self) -> Result<(), AutomationError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.record(Action::Close);
        if let Some(counter) = &self.counter {
            counter.closed();
        }
        Ok(())
    }
}

// =========================================================================
// FakeLauncher
// =========================================================================

/// Hands out a fresh [`FakeBrowser`] over the same pages per launch.
pub struct FakeLauncher {
    pages: Vec<FakePage>,
    pdf: Vec<u8>,
    pdf_delay: Duration,
    reject_fill: Option<String>,
    pub counter: Arc<SessionCounter>,
    launched: Mutex<Vec<ActionLog>>,
}

impl FakeLauncher {
    pub fn new(pages: Vec<FakePage>) -> Self {
        FakeLauncher {
            pages,
            pdf: FAKE_PDF.to_vec(),
            pdf_delay: Duration::ZERO,
            reject_fill: None,
            counter: Arc::new(SessionCounter::default()),
            launched: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pdf(mut self, pdf: &[u8]) -> Self {
        self.pdf = pdf.to_vec();
        self
    }

    /// Each session holds the PDF step for `ms`, keeping its slot busy.
    pub fn with_pdf_delay(mut self, ms: u64) -> Self {
        self.pdf_delay = Duration::from_millis(ms);
        self
    }

    pub fn rejecting_fill(mut self, selector: &str) -> Self {
        self.reject_fill = Some(selector.to_string());
        self
    }

    pub fn launch_count(&self) -> usize {
        self.launched.lock().unwrap().len()
    }

    pub fn actions(&self, session: usize) -> Vec<Action> {
        self.launched.lock().unwrap()[session].lock().unwrap().clone()
    }
}

impl BrowserLauncher for FakeLauncher {
    type Session = FakeBrowser;

    fn launch(&self, _cancel: &CancelToken) -> Result<FakeBrowser, AutomationError> {
        let mut browser = FakeBrowser::new(self.pages.clone()).with_pdf(&self.pdf);
        browser.pdf_delay = self.pdf_delay;
        browser.reject_fill = self.reject_fill.clone();
        browser.counter = Some(self.counter.clone());
        self.counter.opened();
        self.launched.lock().unwrap().push(browser.log.clone());
        Ok(browser)
    }
}
