//! Inspection Core: report model, checklist template and schema enforcement
//!
//! Everything an unreliable producer (a hosted LLM) hands back passes through
//! [`enforce_schema`] before it can touch a report, and through
//! [`validate_report`] before it can be persisted.

pub mod data_model;
pub mod error;
pub mod field_path;
pub mod schema;
pub mod status;
pub mod validation;

pub use data_model::{timestamp_format, ComponentEntry, ComponentResult, InspectionReport, ReportHeader, Zone};
pub use error::InspectError;
pub use field_path::FieldPath;
pub use schema::{enforce_schema, report_template, report_template_at, unknown_keys};
pub use status::Status;
pub use validation::{normalize_statuses, validate_report, ValidationError, Violation};

/// Number of reports returned by a history lookup.
pub const HISTORY_LIMIT: usize = 10;
