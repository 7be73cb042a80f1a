use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::browser::driver::{BrowserLauncher, FormBrowser, WidgetState};
use crate::browser::limiter::{CANCEL_POLL, CancelToken};
use crate::browser::protocol::{BrowserRequest, BrowserResponse};
use crate::error::AutomationError;
use crate::schema::field_model::{FieldOption, Locator};
use crate::scraper::widget::ScrapedWidget;

/// How to start the Node.js driver and how long to wait on it.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub node: String,
    pub driver_script: PathBuf,
    pub headless: bool,
    pub slow_mo_ms: u64,
    pub navigation_timeout_ms: u64,
    /// Driver-side budget for one widget action, extract or screenshot
    pub action_timeout_ms: u64,
    /// Allowed on top of a command's own budget before the session is
    /// considered hung
    pub response_grace_ms: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            node: "node".to_string(),
            driver_script: PathBuf::from("node/form_driver.js"),
            headless: true,
            slow_mo_ms: 0,
            navigation_timeout_ms: 60_000,
            action_timeout_ms: 10_000,
            response_grace_ms: 5_000,
        }
    }
}

const QUIT_WAIT: Duration = Duration::from_secs(3);

/// A browser session backed by form_driver.js.
///
/// Launches a long-lived Node.js process that keeps one Chromium context
/// open. Commands are sent as NDJSON over stdin, responses read from stdout
/// by a reader thread so every wait is bounded. A tripped cancel token kills
/// the process mid-command. Dropping the session always releases the process.
pub struct BrowserSession {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<std::io::Result<String>>,
    options: SessionOptions,
    cancel: CancelToken,
    closed: bool,
}

impl BrowserSession {
    /// Spawn form_driver.js and wait for its ready line.
    pub fn launch(options: &SessionOptions, cancel: &CancelToken) -> Result<Self, AutomationError> {
        let script = options.driver_script.display().to_string();
        let mut child = Command::new(&options.node)
            .arg(&options.driver_script)
            .env("VIDEX_HEADLESS", if options.headless { "1" } else { "0" })
            .env("VIDEX_SLOW_MO_MS", options.slow_mo_ms.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AutomationError::SubprocessSpawn {
                script: script.clone(),
                source: e,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            AutomationError::SessionIo(format!("Failed to capture stdin of {}", script))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            AutomationError::SessionIo(format!("Failed to capture stdout of {}", script))
        })?;

        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        if let Some(stderr) = child.stderr.take() {
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    tracing::debug!(target: "form_driver", "{}", line);
                }
            });
        }

        let mut session = BrowserSession {
            child,
            stdin,
            lines,
            options: options.clone(),
            cancel: cancel.clone(),
            closed: false,
        };

        let ready = session.read_response("launch", options.navigation_timeout_ms)?;
        if !ready.ok || ready.ready != Some(true) {
            return Err(AutomationError::Protocol {
                command: "launch".into(),
                error: ready
                    .error
                    .unwrap_or_else(|| format!("Did not receive ready signal from {}", script)),
            });
        }

        tracing::info!(pid = session.child.id(), "browser session opened");
        Ok(session)
    }

    /// Read the next JSON line, skipping anything that is not a response.
    fn read_response(&mut self, command: &str, timeout_ms: u64) -> Result<BrowserResponse, AutomationError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let line = match self.lines.recv_timeout(remaining.min(CANCEL_POLL)) {
                Ok(Ok(line)) => line,
                Ok(Err(e)) => {
                    return Err(AutomationError::SessionIo(format!(
                        "Failed to read from form_driver.js stdout: {}",
                        e
                    )));
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.cancel.is_cancelled() {
                        tracing::info!(command, "cancelled while waiting on the driver");
                        self.abandon();
                        return Err(AutomationError::Cancelled);
                    }
                    if Instant::now() < deadline {
                        continue;
                    }
                    // state unknown after a missed deadline
                    self.abandon();
                    return Err(AutomationError::Timeout {
                        command: command.to_string(),
                        timeout_ms,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.closed = true;
                    return Err(AutomationError::SessionIo(
                        "form_driver.js exited (stdout closed)".into(),
                    ));
                }
            };

            let line = line.trim();
            if !line.starts_with('{') {
                if !line.is_empty() {
                    tracing::debug!(target: "form_driver", "stdout: {}", line);
                }
                continue;
            }

            return serde_json::from_str(line).map_err(|e| AutomationError::Json {
                context: format!("form_driver.js response to '{}'", command),
                source: e,
            });
        }
    }

    /// Send a request and read the response.
    fn send(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, AutomationError> {
        if self.closed {
            return Err(AutomationError::SessionIo("Browser session already closed".into()));
        }

        let json = serde_json::to_string(request).map_err(|e| AutomationError::Json {
            context: "BrowserRequest".into(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json).map_err(|e| {
            AutomationError::SessionIo(format!("Failed to write to form_driver.js stdin: {}", e))
        })?;
        self.stdin.flush().map_err(|e| {
            AutomationError::SessionIo(format!("Failed to flush form_driver.js stdin: {}", e))
        })?;

        let timeout_ms = request.budget_ms() + self.options.response_grace_ms;
        self.read_response(request.command(), timeout_ms)
    }

    /// Send a request and verify it succeeded.
    fn send_ok(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, AutomationError> {
        self.cancel.check()?;
        let response = self.send(request)?;
        if response.ok {
            return Ok(response);
        }
        if response.timeout {
            return Err(AutomationError::Timeout {
                command: request.command().into(),
                timeout_ms: request.budget_ms(),
            });
        }
        Err(AutomationError::Protocol {
            command: request.command().into(),
            error: response.error.unwrap_or_else(|| "Unknown error".into()),
        })
    }

    fn abandon(&mut self) {
        tracing::warn!(pid = self.child.id(), "killing unresponsive browser session");
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.closed = true;
    }

    /// Ask the driver to close the browser, then make sure the process is gone.
    pub fn quit(&mut self) -> Result<(), AutomationError> {
        if self.closed {
            return Ok(());
        }
        // Best-effort: the process may already be gone
        let _ = self.send(&BrowserRequest::Quit);
        self.closed = true;

        let deadline = Instant::now() + QUIT_WAIT;
        while Instant::now() < deadline {
            match self.child.try_wait() {
                Ok(Some(_)) => {
                    tracing::info!("browser session closed");
                    return Ok(());
                }
                Ok(None) => thread::sleep(Duration::from_millis(50)),
                Err(_) => break,
            }
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
        tracing::info!("browser session killed after quit timeout");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FormBrowser for BrowserSession {
    fn navigate(&mut self, url: &str) -> Result<(), AutomationError> {
        let request = BrowserRequest::Navigate {
            url: url.to_string(),
            timeout_ms: self.options.navigation_timeout_ms,
        };
        self.send_ok(&request)?;
        Ok(())
    }

    fn open_page(&mut self, title: &str) -> Result<(), AutomationError> {
        let request = BrowserRequest::OpenPage {
            title: title.to_string(),
            timeout_ms: self.options.navigation_timeout_ms,
        };
        self.send_ok(&request)?;
        Ok(())
    }

    fn wait_for(&mut self, locator: &Locator, timeout_ms: u64) -> Result<WidgetState, AutomationError> {
        let request = BrowserRequest::WaitFor {
            selector: locator.to_string(),
            timeout_ms,
        };
        let response = self.send_ok(&request)?;
        Ok(response.state.unwrap_or(WidgetState::Missing))
    }

    fn extract_widgets(&mut self) -> Result<Vec<ScrapedWidget>, AutomationError> {
        let request = BrowserRequest::Extract {
            timeout_ms: self.options.action_timeout_ms,
        };
        let response = self.send_ok(&request)?;
        response.widgets.ok_or_else(|| AutomationError::Protocol {
            command: "extract".into(),
            error: "No widgets in extract response".into(),
        })
    }

    fn fill(&mut self, locator: &Locator, value: &str) -> Result<(), AutomationError> {
        let request = BrowserRequest::Fill {
            selector: locator.to_string(),
            value: value.to_string(),
            timeout_ms: self.options.action_timeout_ms,
        };
        self.send_ok(&request)?;
        Ok(())
    }

    fn select_option(&mut self, locator: &Locator, option: &FieldOption) -> Result<(), AutomationError> {
        let request = BrowserRequest::Select {
            selector: locator.to_string(),
            label: option.label.clone(),
            value: option.code.clone(),
            timeout_ms: self.options.action_timeout_ms,
        };
        self.send_ok(&request)?;
        Ok(())
    }

    fn set_checked(&mut self, locator: &Locator, checked: bool) -> Result<(), AutomationError> {
        let request = BrowserRequest::SetChecked {
            selector: locator.to_string(),
            checked,
            timeout_ms: self.options.action_timeout_ms,
        };
        self.send_ok(&request)?;
        Ok(())
    }

    fn settle(&mut self, duration_ms: u64) -> Result<(), AutomationError> {
        self.send_ok(&BrowserRequest::Settle { duration_ms })?;
        Ok(())
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), AutomationError> {
        let request = BrowserRequest::Screenshot {
            path: path.display().to_string(),
            timeout_ms: self.options.action_timeout_ms,
        };
        self.send_ok(&request)?;
        Ok(())
    }

    fn print_pdf(&mut self, labels: &[String], timeout_ms: u64) -> Result<Vec<u8>, AutomationError> {
        let request = BrowserRequest::PrintPdf {
            labels: labels.to_vec(),
            timeout_ms,
        };
        let response = self.send_ok(&request)?;
        let encoded = response
            .pdf_base64
            .ok_or_else(|| AutomationError::PdfGeneration("driver returned no document".into()))?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| AutomationError::PdfGeneration(format!("invalid base64 payload: {}", e)))
    }

    fn close(&mut self) -> Result<(), AutomationError> {
        self.quit()
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Best-effort cleanup
        let _ = self.quit();
    }
}

/// Launches one [`BrowserSession`] per fill.
#[derive(Debug, Clone, Default)]
pub struct NodeLauncher {
    options: SessionOptions,
}

impl NodeLauncher {
    pub fn new(options: SessionOptions) -> Self {
        NodeLauncher { options }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }
}

impl BrowserLauncher for NodeLauncher {
    type Session = BrowserSession;

    fn launch(&self, cancel: &CancelToken) -> Result<BrowserSession, AutomationError> {
        BrowserSession::launch(&self.options, cancel)
    }
}
