use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use serde_json::json;

use videx_autofill::browser::driver::{FormBrowser, WidgetState};
use videx_autofill::browser::limiter::CancelToken;
use videx_autofill::browser::protocol::{BrowserRequest, BrowserResponse};
use videx_autofill::browser::session::{BrowserSession, SessionOptions};
use videx_autofill::error::AutomationError;
use videx_autofill::schema::field_model::Locator;

// =========================================================================
// Wire format
// =========================================================================

#[test]
fn test_request_serializes_with_command_tag() {
    let request = BrowserRequest::WaitFor {
        selector: Locator::by_id("surname").0,
        timeout_ms: 10_000,
    };
    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        json!({ "cmd": "wait_for", "selector": "[id=\"surname\"]", "timeout_ms": 10000 })
    );
    assert_eq!(
        serde_json::to_value(BrowserRequest::Quit).unwrap(),
        json!({ "cmd": "quit" })
    );
}

#[test]
fn test_select_omits_missing_value_code() {
    let request = BrowserRequest::Select {
        selector: "[id=\"gender\"]".into(),
        label: "männlich".into(),
        value: None,
        timeout_ms: 10_000,
    };
    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        json!({ "cmd": "select", "selector": "[id=\"gender\"]", "label": "männlich", "timeout_ms": 10000 })
    );
}

#[test]
fn test_every_driver_wait_carries_its_budget() {
    let print = BrowserRequest::PrintPdf {
        labels: vec!["PDF herunterladen".into()],
        timeout_ms: 30_000,
    };
    assert_eq!(print.command(), "print_pdf");
    assert_eq!(print.budget_ms(), 30_000);
    assert_eq!(BrowserRequest::Settle { duration_ms: 300 }.budget_ms(), 300);

    let actions = [
        BrowserRequest::Extract { timeout_ms: 10_000 },
        BrowserRequest::Fill {
            selector: "[id=\"surname\"]".into(),
            value: "Smith".into(),
            timeout_ms: 10_000,
        },
        BrowserRequest::SetChecked {
            selector: "[id=\"eu_family_member\"]".into(),
            checked: true,
            timeout_ms: 10_000,
        },
        BrowserRequest::Screenshot {
            path: "fail.png".into(),
            timeout_ms: 10_000,
        },
    ];
    for request in &actions {
        assert_eq!(request.budget_ms(), 10_000, "{}", request.command());
        assert_eq!(serde_json::to_value(request).unwrap()["timeout_ms"], 10_000);
    }
    assert_eq!(BrowserRequest::Quit.budget_ms(), 0);
}

#[test]
fn test_response_defaults_missing_fields() {
    let response: BrowserResponse = serde_json::from_str(r#"{"ok":true,"state":"disabled"}"#).unwrap();
    assert!(response.ok);
    assert!(!response.timeout);
    assert_eq!(response.state, Some(WidgetState::Disabled));
    assert!(response.widgets.is_none());
}

#[test]
fn test_extract_response_parses_widgets() {
    let raw = r#"{"ok":true,"widgets":[
        {"tag":"input","type":"text","id":"surname","label":"Familienname *"},
        {"tag":"select","id":"gender","label":"Geschlecht","visible":false,
         "options":[{"value":"","label":"Bitte wählen"},{"value":"1","label":"männlich"}]}
    ]}"#;
    let response: BrowserResponse = serde_json::from_str(raw).unwrap();
    let widgets = response.widgets.unwrap();

    assert_eq!(widgets.len(), 2);
    assert_eq!(widgets[0].input_type.as_deref(), Some("text"));
    assert!(widgets[0].visible);
    assert!(!widgets[1].visible);
    assert_eq!(widgets[1].options[1].label, "männlich");
}

// =========================================================================
// Session against a scripted driver
// =========================================================================

/// Answers the NDJSON protocol the way form_driver.js does, without a browser.
const STUB_DRIVER: &str = r#"
echo "starting stub driver"
echo '{"ok":true,"ready":true}'
while IFS= read -r line; do
  case "$line" in
    *'"cmd":"quit"'*) echo '{"ok":true}'; exit 0 ;;
    *'"cmd":"wait_for"'*) echo '{"ok":true,"state":"hidden"}' ;;
    *'"cmd":"open_page"'*) echo '{"ok":false,"error":"no tab captioned that way"}' ;;
    *'"cmd":"fill"'*) echo '{"ok":false,"timeout":true,"error":"waiting for selector"}' ;;
    *'"cmd":"print_pdf"'*) echo '{"ok":true,"pdf_base64":"JVBERi0xLjcK"}' ;;
    *'"cmd":"settle"'*) sleep 5 ;;
    *'"cmd":"set_checked"'*) sleep 1; echo '{"ok":true}' ;;
    *'"cmd":"navigate"'*'"url":"https://slow.test'*) sleep 30; echo '{"ok":true}' ;;
    *) echo 'noise before the answer'; echo '{"ok":true}' ;;
  esac
done
"#;

fn stub_options(dir: &Path, script: &str) -> SessionOptions {
    let path: PathBuf = dir.join("driver.sh");
    std::fs::write(&path, script).unwrap();
    SessionOptions {
        node: "sh".into(),
        driver_script: path,
        navigation_timeout_ms: 2_000,
        response_grace_ms: 500,
        ..SessionOptions::default()
    }
}

#[cfg(unix)]
#[test]
fn test_session_speaks_ndjson() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = BrowserSession::launch(&stub_options(dir.path(), STUB_DRIVER), &CancelToken::new()).unwrap();

    session.navigate("https://form.test/videx").unwrap();
    assert_eq!(
        session.wait_for(&Locator::by_id("surname"), 100).unwrap(),
        WidgetState::Hidden
    );
    let pdf = session.print_pdf(&["PDF herunterladen".into()], 1_000).unwrap();
    assert_eq!(pdf, b"%PDF-1.7\n");

    session.close().unwrap();
    assert!(session.is_closed());
    session.close().unwrap();
}

#[cfg(unix)]
#[test]
fn test_session_maps_driver_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = BrowserSession::launch(&stub_options(dir.path(), STUB_DRIVER), &CancelToken::new()).unwrap();

    let err = session.open_page("Referenz").unwrap_err();
    assert!(matches!(
        err,
        AutomationError::Protocol { ref command, ref error } if command == "open_page" && error.contains("no tab")
    ));

    let err = session.fill(&Locator::by_id("surname"), "Smith").unwrap_err();
    assert!(matches!(err, AutomationError::Timeout { ref command, .. } if command == "fill"));
}

#[cfg(unix)]
#[test]
fn test_unresponsive_driver_times_out_and_is_abandoned() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = BrowserSession::launch(&stub_options(dir.path(), STUB_DRIVER), &CancelToken::new()).unwrap();

    let err = session.settle(0).unwrap_err();
    assert!(matches!(err, AutomationError::Timeout { ref command, timeout_ms: 500 } if command == "settle"));
    assert!(session.is_closed());

    let err = session.navigate("https://form.test/videx").unwrap_err();
    assert!(matches!(err, AutomationError::SessionIo(_)));
}

#[cfg(unix)]
#[test]
fn test_slow_widget_action_gets_the_action_budget() {
    let dir = tempfile::tempdir().unwrap();
    let options = SessionOptions {
        action_timeout_ms: 2_000,
        ..stub_options(dir.path(), STUB_DRIVER)
    };
    let mut session = BrowserSession::launch(&options, &CancelToken::new()).unwrap();

    // one second exceeds the grace alone but not budget + grace
    session.set_checked(&Locator::by_id("eu_family_member"), true).unwrap();
    assert!(!session.is_closed());
    session.close().unwrap();
}

#[cfg(unix)]
#[test]
fn test_cancel_aborts_command_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let options = SessionOptions {
        navigation_timeout_ms: 20_000,
        ..stub_options(dir.path(), STUB_DRIVER)
    };
    let cancel = CancelToken::new();
    let mut session = BrowserSession::launch(&options, &cancel).unwrap();

    let started = Instant::now();
    let err = thread::scope(|s| {
        s.spawn(|| {
            thread::sleep(Duration::from_millis(200));
            cancel.cancel();
        });
        session.navigate("https://slow.test/videx").unwrap_err()
    });

    assert!(matches!(err, AutomationError::Cancelled), "got {:?}", err);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(session.is_closed());
}

#[cfg(unix)]
#[test]
fn test_cancelled_session_refuses_new_commands() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancelToken::new();
    let mut session = BrowserSession::launch(&stub_options(dir.path(), STUB_DRIVER), &cancel).unwrap();

    cancel.cancel();
    let err = session.navigate("https://form.test/videx").unwrap_err();
    assert!(matches!(err, AutomationError::Cancelled));
    session.close().unwrap();
    assert!(session.is_closed());
}

#[cfg(unix)]
#[test]
fn test_driver_without_ready_line_fails_launch() {
    let dir = tempfile::tempdir().unwrap();
    let options = stub_options(dir.path(), r#"echo '{"ok":false,"error":"chromium missing"}'"#);

    match BrowserSession::launch(&options, &CancelToken::new()) {
        Err(AutomationError::Protocol { command, error }) => {
            assert_eq!(command, "launch");
            assert_eq!(error, "chromium missing");
        }
        Err(other) => panic!("expected Protocol, got {:?}", other),
        Ok(_) => panic!("launch should fail"),
    }
}

#[test]
fn test_missing_interpreter_is_spawn_error() {
    let options = SessionOptions {
        node: "/nonexistent/videx-node".into(),
        ..SessionOptions::default()
    };
    match BrowserSession::launch(&options, &CancelToken::new()) {
        Err(AutomationError::SubprocessSpawn { script, .. }) => {
            assert_eq!(script, "node/form_driver.js");
        }
        Err(other) => panic!("expected SubprocessSpawn, got {:?}", other),
        Ok(_) => panic!("launch should fail"),
    }
}
