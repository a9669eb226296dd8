//! Report service: save, history and update over any [`ReportStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use inspect_core::{
    enforce_schema, report_template, timestamp_format, unknown_keys, validate_report, FieldPath,
    InspectError, ValidationError, HISTORY_LIMIT,
};
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::{ReportStore, StoreError, StoredReport};

// ============================================================================
// Errors and outcomes
// ============================================================================

/// Which of the three failure classes an operation hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    NotFound,
    Backend,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::NotFound => "not_found",
            FailureKind::Backend => "backend",
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Backend(#[from] StoreError),
}

impl ReportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ReportError::Validation(_) => FailureKind::Validation,
            ReportError::NotFound(_) => FailureKind::NotFound,
            ReportError::Backend(_) => FailureKind::Backend,
        }
    }
}

impl From<InspectError> for ReportError {
    fn from(err: InspectError) -> Self {
        match err {
            InspectError::Validation(v) => ReportError::Validation(v),
            InspectError::InvalidPath { ref path, .. } => {
                ReportError::Validation(ValidationError::single(path.clone(), err.to_string()))
            }
            InspectError::ImmutableField(ref path) => {
                ReportError::Validation(ValidationError::single(path.clone(), err.to_string()))
            }
        }
    }
}

/// Tagged result handed to agents and HTTP clients.
///
/// Serializes as `{"success": true, ...data}` or
/// `{"success": false, "error": "...", "kind": "validation"}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure { kind: FailureKind, error: String },
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure { error, .. } => Some(error),
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn into_result(self) -> Result<T, (FailureKind, String)> {
        match self {
            Outcome::Success(data) => Ok(data),
            Outcome::Failure { kind, error } => Err((kind, error)),
        }
    }
}

impl<T> From<Result<T, ReportError>> for Outcome<T> {
    fn from(result: Result<T, ReportError>) -> Self {
        match result {
            Ok(data) => Outcome::Success(data),
            Err(err) => Outcome::Failure {
                kind: err.kind(),
                error: err.to_string(),
            },
        }
    }
}

#[derive(Serialize)]
struct SuccessRepr<'a, T> {
    success: bool,
    #[serde(flatten)]
    data: &'a T,
}

#[derive(Serialize)]
struct FailureRepr<'a> {
    success: bool,
    error: &'a str,
    kind: FailureKind,
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Outcome::Success(data) => SuccessRepr {
                success: true,
                data,
            }
            .serialize(serializer),
            Outcome::Failure { kind, error } => FailureRepr {
                success: false,
                error,
                kind: *kind,
            }
            .serialize(serializer),
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveReceipt {
    pub report_id: String,
    pub serial_number: String,
    /// Canonical timestamp string; pass it back verbatim to `update`.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct History {
    pub reports: Vec<StoredReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateReceipt {
    pub report_id: String,
    pub updated_fields: Vec<String>,
}

// ============================================================================
// Service
// ============================================================================

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ReportStore>,
}

impl ReportService {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }

    /// Sanitize, validate and persist a new report.
    ///
    /// The payload is masked against a fresh template first, so a draft with
    /// extra keys or missing components still produces a complete document.
    /// Nothing is written when validation fails.
    pub fn save(&self, payload: &Value) -> Outcome<SaveReceipt> {
        self.try_save(payload).into()
    }

    fn try_save(&self, payload: &Value) -> Result<SaveReceipt, ReportError> {
        let template = report_template();

        let dropped = unknown_keys(payload, &template);
        if !dropped.is_empty() {
            tracing::warn!(keys = ?dropped, "Dropping keys not present in the report template");
        }

        let clean = enforce_schema(payload, &template);
        let report = validate_report(&clean).map_err(|err| {
            tracing::warn!(reason = %err, "Report rejected");
            err
        })?;

        let serial_number = report.serial_number().unwrap_or_default();
        let existing = self.store.ids_by_key(serial_number, &report.header.timestamp)?;
        if !existing.is_empty() {
            let timestamp = timestamp_format::format(&report.header.timestamp);
            tracing::warn!(serial_number, timestamp = %timestamp, "Duplicate report rejected");
            return Err(ValidationError::single(
                "header.timestamp",
                format!(
                    "Report already exists for serial_number '{}' and timestamp '{}'",
                    serial_number, timestamp
                ),
            )
            .into());
        }

        let id = self.store.insert(&report).map_err(|err| {
            tracing::error!(error = %err, "Failed to write report");
            err
        })?;

        let receipt = SaveReceipt {
            report_id: id,
            serial_number: report.serial_number().unwrap_or_default().to_string(),
            timestamp: timestamp_format::format(&report.header.timestamp),
        };
        tracing::info!(
            report_id = %receipt.report_id,
            serial_number = %receipt.serial_number,
            primary_status = %report.primary_status,
            "Report saved"
        );
        Ok(receipt)
    }

    /// Up to [`HISTORY_LIMIT`] reports for a serial number, newest first.
    /// An unknown serial number yields an empty list, not an error.
    pub fn history(&self, serial_number: &str) -> Outcome<History> {
        let serial_number = serial_number.trim();
        let result = self
            .store
            .recent_by_serial(serial_number, HISTORY_LIMIT)
            .map(|reports| {
                tracing::debug!(serial_number, count = reports.len(), "History fetched");
                History { reports }
            })
            .map_err(ReportError::from);
        result.into()
    }

    /// The most recent report for a serial number.
    pub fn latest(&self, serial_number: &str) -> Outcome<StoredReport> {
        let serial_number = serial_number.trim();
        let result = self
            .store
            .recent_by_serial(serial_number, 1)
            .map_err(ReportError::from)
            .and_then(|mut reports| {
                reports.pop().ok_or_else(|| {
                    ReportError::NotFound(format!(
                        "No reports found for serial_number '{}'",
                        serial_number
                    ))
                })
            });
        result.into()
    }

    /// Overwrite individual fields of the report identified by
    /// `(serial_number, timestamp)`.
    ///
    /// Every path is checked before anything is applied, and the patched
    /// document must still pass save-time validation.
    pub fn update(
        &self,
        serial_number: &str,
        timestamp: &str,
        updates: &BTreeMap<String, Value>,
    ) -> Outcome<UpdateReceipt> {
        self.try_update(serial_number.trim(), timestamp.trim(), updates)
            .into()
    }

    fn try_update(
        &self,
        serial_number: &str,
        timestamp: &str,
        updates: &BTreeMap<String, Value>,
    ) -> Result<UpdateReceipt, ReportError> {
        let not_found = |matches: usize| {
            let detail = if matches > 1 {
                format!("{} reports match", matches)
            } else {
                "no report matches".to_string()
            };
            ReportError::NotFound(format!(
                "Report not found for serial_number '{}' and timestamp '{}' ({})",
                serial_number, timestamp, detail
            ))
        };

        // An unparseable timestamp cannot match any stored report.
        let Ok(instant) = timestamp_format::parse(timestamp) else {
            return Err(not_found(0));
        };

        let ids = self.store.ids_by_key(serial_number, &instant)?;
        let [id] = ids.as_slice() else {
            tracing::warn!(serial_number, timestamp, matches = ids.len(), "Update target not unique");
            return Err(not_found(ids.len()));
        };

        if updates.is_empty() {
            return Err(ValidationError::single("updates", "No field updates given").into());
        }

        let template = report_template();
        let paths = updates
            .keys()
            .map(|raw| -> Result<FieldPath, InspectError> {
                let path: FieldPath = raw.parse()?;
                path.check_against(&template)?;
                Ok(path)
            })
            .collect::<Result<Vec<_>, InspectError>>()?;

        let stored = self.store.get(id)?.ok_or_else(|| not_found(0))?;
        let mut doc = stored.report.to_value();
        for (path, value) in paths.iter().zip(updates.values()) {
            path.apply(&mut doc, value.clone())?;
        }

        let patched = validate_report(&doc)?;
        self.store.replace(id, &patched)?;

        let updated_fields: Vec<String> = paths.iter().map(ToString::to_string).collect();
        tracing::info!(report_id = %id, fields = ?updated_fields, "Report updated");
        Ok(UpdateReceipt {
            report_id: id.clone(),
            updated_fields,
        })
    }
}
