//! Inspection Store: report persistence and retrieval
//!
//! ```text
//! payload ─→ enforce_schema ─→ validate_report ─→ ReportStore::insert
//!                                    │
//!                              Outcome::Failure (validation), nothing written
//! ```
//!
//! [`ReportService`] is the boundary callers (agents, HTTP handlers) talk to.
//! It never lets an error escape: every operation returns an [`Outcome`]
//! whose failure kind distinguishes validation, not-found and backend errors.

pub mod service;
pub mod sqlite;

pub use service::{FailureKind, History, Outcome, ReportError, ReportService, SaveReceipt, UpdateReceipt};
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use inspect_core::InspectionReport;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored document is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("report not found: {0}")]
    NotFound(String),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type Result<T> = core::result::Result<T, StoreError>;

/// A persisted report together with its opaque document id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: String,
    #[serde(flatten)]
    pub report: InspectionReport,
}

/// One document per inspection, keyed by a generated id.
///
/// Implementations only move whole documents; sanitizing, validation and
/// field-level updates happen in [`ReportService`].
pub trait ReportStore: Send + Sync {
    /// Write a new document and return its generated id.
    fn insert(&self, report: &InspectionReport) -> Result<String>;

    fn get(&self, id: &str) -> Result<Option<StoredReport>>;

    /// Overwrite an existing document.
    fn replace(&self, id: &str, report: &InspectionReport) -> Result<()>;

    /// Most recent documents for a serial number, newest first.
    fn recent_by_serial(&self, serial_number: &str, limit: usize) -> Result<Vec<StoredReport>>;

    /// Ids of every document whose serial number and timestamp match exactly.
    fn ids_by_key(&self, serial_number: &str, timestamp: &DateTime<Utc>) -> Result<Vec<String>>;
}
