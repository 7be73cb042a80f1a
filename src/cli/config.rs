use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::browser::session::SessionOptions;
use crate::filler::filler::FillerOptions;
use crate::schema::form_map::VIDEX_FORM_URL;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "videx-autofill",
    version,
    about = "Fill the VIDEX Schengen visa form from an applicant record and save the PDF"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: videx-autofill.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the live form and write field_schema.json and complete_template.json
    Generate {
        /// Output directory for the generated artifacts
        #[arg(short, long, default_value = "artifacts")]
        output_dir: String,
    },

    /// Write a fill-in applicant record with every key and its default
    Template {
        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Translate a record and print the assignments without opening a browser
    Plan {
        /// Applicant record (JSON)
        #[arg(long)]
        data: String,
    },

    /// Translate a record, fill the form and save the PDF
    Fill {
        /// Applicant record (JSON)
        #[arg(long)]
        data: String,

        /// Output PDF path (default: videx_<first_name>_<surname>.pdf)
        #[arg(short, long)]
        output: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

pub const DEFAULT_CONFIG_FILE: &str = "videx-autofill.yaml";

/// Optional YAML config file: `videx-autofill.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub form: FormConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub screenshots: ScreenshotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    #[serde(default = "default_form_url")]
    pub url: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            url: default_form_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_node")]
    pub node: String,

    #[serde(default = "default_driver_script")]
    pub driver_script: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default)]
    pub slow_mo_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            node: default_node(),
            driver_script: default_driver_script(),
            headless: true,
            slow_mo_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_navigation_ms")]
    pub navigation_ms: u64,

    #[serde(default = "default_widget_ms")]
    pub widget_ms: u64,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default = "default_pdf_ms")]
    pub pdf_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: default_navigation_ms(),
            widget_ms: default_widget_ms(),
            settle_ms: default_settle_ms(),
            pdf_ms: default_pdf_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_schema_path")]
    pub schema: String,

    /// Defaults catalog; built-in defaults are used when unset
    pub defaults: Option<String>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            schema: default_schema_path(),
            defaults: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceConfig {
    /// JSONL trace file; tracing to file is off when unset
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    /// Directory for failure screenshots; none taken when unset
    pub dir: Option<String>,
}

// Serde default helpers
fn default_form_url() -> String { VIDEX_FORM_URL.to_string() }
fn default_node() -> String { "node".to_string() }
fn default_driver_script() -> String { "node/form_driver.js".to_string() }
fn default_true() -> bool { true }
fn default_navigation_ms() -> u64 { 60_000 }
fn default_widget_ms() -> u64 { 10_000 }
fn default_settle_ms() -> u64 { 300 }
fn default_pdf_ms() -> u64 { 30_000 }
fn default_max_sessions() -> usize { 2 }
fn default_schema_path() -> String { "artifacts/field_schema.json".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => match serde_yaml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = config_path, error = %e, "malformed config file, using defaults");
                AppConfig::default()
            }
        },
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders
// ============================================================================

pub fn build_session_options(config: &AppConfig) -> SessionOptions {
    SessionOptions {
        node: config.browser.node.clone(),
        driver_script: PathBuf::from(&config.browser.driver_script),
        headless: config.browser.headless,
        slow_mo_ms: config.browser.slow_mo_ms,
        navigation_timeout_ms: config.timeouts.navigation_ms,
        action_timeout_ms: config.timeouts.widget_ms,
        ..SessionOptions::default()
    }
}

pub fn build_filler_options(config: &AppConfig) -> FillerOptions {
    FillerOptions {
        widget_timeout_ms: config.timeouts.widget_ms,
        settle_ms: config.timeouts.settle_ms,
        pdf_timeout_ms: config.timeouts.pdf_ms,
        screenshot_dir: config.screenshots.dir.as_ref().map(PathBuf::from),
    }
}
