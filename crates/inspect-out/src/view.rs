//! Template-facing view of a report.
use chrono::{DateTime, Utc};
use inspect_core::{ComponentEntry, InspectionReport, Status};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub header: HeaderView,
    pub zones: Vec<ZoneView>,
    /// Non-green components, most severe first
    pub flagged: Vec<ComponentView>,
    pub passed: Vec<ComponentView>,
    pub counts: StatusCounts,
    pub primary_status: Status,
    pub general_comments: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeaderView {
    pub serial_number: Option<String>,
    pub inspector: Option<String>,
    pub date: String,
    pub machine_hours: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneView {
    pub name: &'static str,
    pub title: &'static str,
    pub components: Vec<ComponentView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentView {
    pub zone_title: &'static str,
    pub key: &'static str,
    pub status: Status,
    pub comments: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub pass: usize,
    pub monitor: usize,
    pub fail: usize,
}

impl From<ComponentEntry<'_>> for ComponentView {
    fn from(entry: ComponentEntry<'_>) -> Self {
        Self {
            zone_title: entry.zone.title(),
            key: entry.key,
            status: entry.result.status,
            comments: entry.result.comments.clone(),
        }
    }
}

impl ReportView {
    pub fn new(report: &InspectionReport, generated_at: DateTime<Utc>) -> Self {
        let mut counts = StatusCounts::default();
        for entry in report.components() {
            match entry.result.status {
                Status::Green => counts.pass += 1,
                Status::Yellow => counts.monitor += 1,
                Status::Red => counts.fail += 1,
            }
        }

        let zones = inspect_core::Zone::ALL
            .into_iter()
            .map(|zone| ZoneView {
                name: zone.as_str(),
                title: zone.title(),
                components: report
                    .components()
                    .filter(|c| c.zone == zone)
                    .map(ComponentView::from)
                    .collect(),
            })
            .collect();

        Self {
            header: HeaderView {
                serial_number: report.header.serial_number.clone(),
                inspector: report.header.inspector.clone(),
                date: report.header.date.format("%Y-%m-%d").to_string(),
                machine_hours: report.header.machine_hours,
            },
            zones,
            flagged: report.flagged().into_iter().map(ComponentView::from).collect(),
            passed: report
                .components()
                .filter(|c| c.result.status == Status::Green)
                .map(ComponentView::from)
                .collect(),
            counts,
            primary_status: report.primary_status,
            general_comments: report.general_comments.clone(),
            generated_at: generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}
