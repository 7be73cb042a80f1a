use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// Validation: caller-supplied record is malformed
// ============================================================================

/// Raised by the translator before any browser session is opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Record keys (full dotted paths) that match no field in the schema
    #[error("Unknown field key(s): {}", .keys.join(", "))]
    UnknownKeys { keys: Vec<String> },

    /// Date not in the documented DD.MM.YYYY format (or not a calendar date)
    #[error("Field '{key}': '{value}' is not a date in DD.MM.YYYY format")]
    BadDate { key: String, value: String },

    /// Enumerated value matched none of the field's options
    #[error("Field '{key}': '{value}' is not one of the allowed options [{}]", .allowed.join(", "))]
    NoMatchingOption {
        key: String,
        value: String,
        allowed: Vec<String>,
    },

    /// Composite field supplied with some, but not all, required children
    #[error("Field '{key}' is incomplete, missing: {}", .missing.join(", "))]
    IncompleteComposite { key: String, missing: Vec<String> },

    /// Value has the wrong JSON shape for the field
    #[error("Field '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// The same field was supplied under two names (key and alias, or dotted and nested)
    #[error("Field '{key}' supplied more than once")]
    ConflictingKeys { key: String },

    /// The record itself is not a JSON object
    #[error("Applicant record must be a JSON object")]
    NotAnObject,
}

impl ValidationError {
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Automation: live form did not behave as the schema expects
// ============================================================================

#[derive(Debug, Error)]
pub enum AutomationError {
    /// Node.js driver failed to spawn
    #[error("Failed to spawn {script} (is Node.js installed?): {source}")]
    SubprocessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Pipe to/from the driver broke
    #[error("Browser session I/O failed: {0}")]
    SessionIo(String),

    /// Driver answered a command with ok=false or an unexpected payload
    #[error("Browser command '{command}' failed: {error}")]
    Protocol { command: String, error: String },

    /// A bounded wait elapsed
    #[error("Browser command '{command}' timed out after {timeout_ms} ms")]
    Timeout { command: String, timeout_ms: u64 },

    /// Target widget missing or not interactable within the bounded wait
    #[error("Widget for field '{key}' not found or not interactable on page '{page}'")]
    WidgetNotFound { key: String, page: String },

    /// A form page could not be opened or never became interactive
    #[error("Form page '{page}' is unavailable")]
    PageUnavailable { page: String },

    /// The print action produced no usable document
    #[error("PDF generation failed: {0}")]
    PdfGeneration(String),

    /// The caller cancelled the request
    #[error("Fill cancelled")]
    Cancelled,

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// Schema generation: offline regeneration hit form drift
// ============================================================================

#[derive(Debug, Error)]
pub enum SchemaGenerationError {
    /// An expected German label is not on the page: the form map needs updating
    #[error("Label '{label}' not found on page '{page}'")]
    MissingLabel { page: String, label: String },

    /// A translated option label is not offered by the widget any more
    #[error("Option '{option}' not offered by '{label}' on page '{page}'")]
    MissingOption {
        page: String,
        label: String,
        option: String,
    },

    #[error("Form map declares key '{0}' more than once")]
    DuplicateKey(String),

    #[error(transparent)]
    Automation(#[from] AutomationError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

// ============================================================================
// Offline artifacts (schema, defaults, template)
// ============================================================================

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Field schema is inconsistent: {0}")]
    Invariant(String),

    #[error("Defaults catalog is invalid: {0}")]
    Defaults(#[from] ValidationError),
}

// ============================================================================
// Crate-level error
// ============================================================================

/// Coarse category a request boundary maps to a status or exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Automation,
    SchemaGeneration,
    Artifact,
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Invalid applicant record: {0}")]
    Validation(#[from] ValidationError),

    #[error("Form automation failed: {0}")]
    Automation(#[from] AutomationError),

    #[error("Schema generation failed: {0}")]
    SchemaGeneration(#[from] SchemaGenerationError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl FormError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormError::Validation(_) => ErrorKind::Validation,
            FormError::Automation(_) => ErrorKind::Automation,
            FormError::SchemaGeneration(_) => ErrorKind::SchemaGeneration,
            FormError::Artifact(_) => ErrorKind::Artifact,
        }
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Validation => 2,
            ErrorKind::Automation => 3,
            ErrorKind::SchemaGeneration => 4,
            ErrorKind::Artifact => 1,
        }
    }
}
