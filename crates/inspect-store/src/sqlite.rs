//! SQLite-backed report store.
//!
//! One row per report. The JSON document is the source of truth; the
//! `serial_number`, `timestamp`, `date` and `primary_status` columns are
//! copies kept for indexing.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use inspect_core::{timestamp_format, InspectionReport};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::{ReportStore, Result, StoreError, StoredReport};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS inspection_reports (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    id              TEXT NOT NULL UNIQUE,
    serial_number   TEXT NOT NULL,
    timestamp       TEXT NOT NULL,
    date            TEXT NOT NULL,
    primary_status  TEXT NOT NULL,
    body            TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_reports_serial_ts
    ON inspection_reports (serial_number, timestamp);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file. `":memory:"` gives a private
    /// in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "Opened report database");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Total number of stored reports.
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM inspection_reports", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn decode(id: String, body: String) -> Result<StoredReport> {
    let report: InspectionReport = serde_json::from_str(&body)?;
    Ok(StoredReport { id, report })
}

impl ReportStore for SqliteStore {
    fn insert(&self, report: &InspectionReport) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let body = serde_json::to_string(report)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO inspection_reports
                (id, serial_number, timestamp, date, primary_status, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                report.serial_number().unwrap_or_default(),
                timestamp_format::format(&report.header.timestamp),
                report.header.date.format("%Y-%m-%d").to_string(),
                report.primary_status.as_str(),
                body,
            ],
        )?;
        Ok(id)
    }

    fn get(&self, id: &str) -> Result<Option<StoredReport>> {
        let conn = self.conn()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT id, body FROM inspection_reports WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        row.map(|(id, body)| decode(id, body)).transpose()
    }

    fn replace(&self, id: &str, report: &InspectionReport) -> Result<()> {
        let body = serde_json::to_string(report)?;
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE inspection_reports
             SET date = ?2, primary_status = ?3, body = ?4
             WHERE id = ?1",
            params![
                id,
                report.header.date.format("%Y-%m-%d").to_string(),
                report.primary_status.as_str(),
                body,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn recent_by_serial(&self, serial_number: &str, limit: usize) -> Result<Vec<StoredReport>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, body FROM inspection_reports
             WHERE serial_number = ?1
             ORDER BY timestamp DESC, seq DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![serial_number, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut reports = Vec::new();
        for row in rows {
            let (id, body) = row?;
            reports.push(decode(id, body)?);
        }
        Ok(reports)
    }

    fn ids_by_key(&self, serial_number: &str, timestamp: &DateTime<Utc>) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id FROM inspection_reports
             WHERE serial_number = ?1 AND timestamp = ?2
             ORDER BY seq",
        )?;
        let ids = stmt
            .query_map(
                params![serial_number, timestamp_format::format(timestamp)],
                |row| row.get::<_, String>(0),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspect_core::{report_template_at, validate_report};
    use serde_json::json;
    use chrono::TimeZone;

    fn report(serial: &str, ts: DateTime<Utc>) -> InspectionReport {
        let mut doc = report_template_at(ts);
        doc["header"]["serial_number"] = json!(serial);
        doc["primary_status"] = json!("GREEN");
        doc["general_comments"] = json!("ok");
        validate_report(&doc).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let store = SqliteStore::open_in_memory().unwrap();
        let original = report("1234", at(9));
        let id = store.insert(&original).unwrap();

        let stored = store.get(&id).unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.report, original);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_recent_orders_newest_first_and_limits() {
        let store = SqliteStore::open_in_memory().unwrap();
        for hour in [3, 9, 1, 7] {
            store.insert(&report("1234", at(hour))).unwrap();
        }
        store.insert(&report("5678", at(12))).unwrap();

        let recent = store.recent_by_serial("1234", 3).unwrap();
        let hours: Vec<String> = recent
            .iter()
            .map(|r| r.report.header.timestamp.format("%H").to_string())
            .collect();
        assert_eq!(hours, vec!["09", "07", "03"]);
    }

    #[test]
    fn test_ids_by_key_is_exact() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert(&report("1234", at(9))).unwrap();

        assert_eq!(store.ids_by_key("1234", &at(9)).unwrap(), vec![id]);
        assert!(store.ids_by_key("1234", &at(10)).unwrap().is_empty());
        assert!(store.ids_by_key("12345", &at(9)).unwrap().is_empty());
    }

    #[test]
    fn test_replace_missing_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.replace("nope", &report("1234", at(9))).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
