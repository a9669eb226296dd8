//! Data Model: InspectionReport, ReportHeader, ComponentResult, Zone
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::schema;
use crate::status::Status;

/// Top-level inspection area. Declaration order is the walk-around order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Zone {
    Ground,
    Engine,
    CabExterior,
    CabInterior,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::Ground, Zone::Engine, Zone::CabExterior, Zone::CabInterior];

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Ground => "GROUND",
            Zone::Engine => "ENGINE",
            Zone::CabExterior => "CAB_EXTERIOR",
            Zone::CabInterior => "CAB_INTERIOR",
        }
    }

    /// Display name ("Cab Exterior").
    pub fn title(&self) -> &'static str {
        match self {
            Zone::Ground => "Ground",
            Zone::Engine => "Engine",
            Zone::CabExterior => "Cab Exterior",
            Zone::CabInterior => "Cab Interior",
        }
    }

    /// Component keys of this zone, in checklist order.
    pub fn component_keys(&self) -> &'static [&'static str] {
        match self {
            Zone::Ground => schema::GROUND_KEYS,
            Zone::Engine => schema::ENGINE_KEYS,
            Zone::CabExterior => schema::CAB_EXTERIOR_KEYS,
            Zone::CabInterior => schema::CAB_INTERIOR_KEYS,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Zone::ALL
            .into_iter()
            .find(|z| z.as_str() == s)
            .ok_or_else(|| format!("Unknown zone '{}'", s))
    }
}

/// Result recorded for one inspectable component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub status: Status,
    pub comments: String,
}

impl Default for ComponentResult {
    fn default() -> Self {
        Self {
            status: Status::Green,
            comments: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportHeader {
    /// Machine serial number (lookup key together with `timestamp`)
    pub serial_number: Option<String>,
    /// Technician name
    pub inspector: Option<String>,
    /// Calendar date of the inspection (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Creation instant, fixed-width so stored strings sort lexicographically
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Utc>,
    /// Service meter hours
    pub machine_hours: u64,
}

/// A finalized inspection. Every instance carries every component key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionReport {
    pub header: ReportHeader,
    pub sections: BTreeMap<Zone, BTreeMap<String, ComponentResult>>,
    pub general_comments: String,
    pub primary_status: Status,
}

/// A component entry visited in checklist order.
#[derive(Debug, Clone, Copy)]
pub struct ComponentEntry<'a> {
    pub zone: Zone,
    pub key: &'static str,
    pub result: &'a ComponentResult,
}

impl InspectionReport {
    pub fn serial_number(&self) -> Option<&str> {
        self.header.serial_number.as_deref()
    }

    pub fn component(&self, zone: Zone, key: &str) -> Option<&ComponentResult> {
        self.sections.get(&zone).and_then(|s| s.get(key))
    }

    /// All components in walk-around order (zone order, then checklist order).
    pub fn components(&self) -> impl Iterator<Item = ComponentEntry<'_>> + '_ {
        Zone::ALL.into_iter().flat_map(move |zone| {
            zone.component_keys().iter().filter_map(move |key| {
                self.component(zone, key).map(|result| ComponentEntry {
                    zone,
                    key: *key,
                    result,
                })
            })
        })
    }

    /// Components that are not GREEN, most severe first.
    pub fn flagged(&self) -> Vec<ComponentEntry<'_>> {
        let mut flagged: Vec<_> = self
            .components()
            .filter(|c| c.result.status != Status::Green)
            .collect();
        flagged.sort_by(|a, b| b.result.status.cmp(&a.result.status));
        flagged
    }

    pub fn to_value(&self) -> serde_json::Value {
        // A report is plain data; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Fixed-width RFC 3339 timestamps with microsecond precision.
pub mod timestamp_format {
    use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

    /// Current instant truncated to the stored precision.
    pub fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.format(FORMAT).to_string()
    }

    /// Accepts RFC 3339 with any offset, or a naive ISO-8601 instant taken as UTC.
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        let raw = raw.trim();
        match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => Ok(dt.with_timezone(&Utc).trunc_subsecs(6)),
            Err(rfc_err) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc().trunc_subsecs(6))
                .map_err(|_| rfc_err),
        }
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}
