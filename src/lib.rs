//! Fills the VIDEX Schengen short-stay visa form from an English-keyed
//! applicant record and returns the PDF the form renders.
//!
//! The offline [`scraper`] walks the live form with the hand-maintained
//! [`schema::form_map`] and commits a [`schema::field_model::FieldSchema`].
//! At request time [`translate`] resolves a record against that schema and
//! the defaults catalog, and [`filler`] replays the resulting assignments
//! through one browser session per request.

pub mod browser;
pub mod cli;
pub mod error;
pub mod filler;
pub mod schema;
pub mod scraper;
pub mod service;
pub mod trace;
pub mod translate;

pub use error::{AutomationError, ErrorKind, FormError, SchemaGenerationError, ValidationError};
pub use service::FillService;
