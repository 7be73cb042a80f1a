/// Tracks progress of one fill.
#[derive(Debug, Clone, Default)]
pub struct FillContext {
    /// Title of the page being filled
    pub current_page: Option<String>,

    /// Keys written to the form, in order
    pub applied: Vec<String>,

    /// Keys whose widget was hidden or disabled by an earlier choice
    pub skipped: Vec<String>,

    /// Assignments applied on the current page so far
    page_applied: usize,
}

impl FillContext {
    pub fn new() -> Self {
        FillContext::default()
    }

    pub fn enter_page(&mut self, title: &str) {
        self.current_page = Some(title.to_string());
        self.page_applied = 0;
    }

    pub fn record_applied(&mut self, key: &str) {
        self.applied.push(key.to_string());
        self.page_applied += 1;
    }

    pub fn record_skipped(&mut self, key: &str) {
        self.skipped.push(key.to_string());
    }

    /// Whether an earlier assignment on this page could have hidden a widget.
    pub fn interacted_on_page(&self) -> bool {
        self.page_applied > 0
    }

    pub fn page_name(&self) -> &str {
        self.current_page.as_deref().unwrap_or("(form)")
    }
}
