//! Inspection Out: renders finished inspection reports for people
//!
//! A typed [`InspectionReport`] is flattened into a [`ReportView`] and run
//! through one of the Handlebars templates from the templates file:
//! `report_html` for a standalone document, `report_text` for an executive
//! summary. Statuses are always shown as PASS / MONITOR / FAIL.
//!
//! # Example
//!
//! ```ignore
//! use inspect_out::{ExportFormat, ReportExporter};
//!
//! let exporter = ReportExporter::embedded()?;
//! let html = exporter.render(&report, ExportFormat::Html)?;
//! ```

pub mod renderer;
pub mod templates;
pub mod view;

pub use renderer::TemplateRenderer;
pub use templates::{TemplatesFile, EMBEDDED_TEMPLATES};
pub use view::ReportView;

use chrono::{DateTime, Utc};
use inspect_core::InspectionReport;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during rendering
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template load failed: {0}")]
    Template(String),
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),
    #[error("Render failed: {0}")]
    Render(String),
    #[error("Unsupported export format '{0}': expected html or text")]
    Format(String),
}

/// Output document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Html,
    Text,
}

impl ExportFormat {
    pub fn template_name(&self) -> &'static str {
        match self {
            ExportFormat::Html => "report_html",
            ExportFormat::Text => "report_text",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Html => "text/html; charset=utf-8",
            ExportFormat::Text => "text/plain; charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(ExportFormat::Html),
            "text" | "txt" | "plain" => Ok(ExportFormat::Text),
            other => Err(RenderError::Format(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Html => f.write_str("html"),
            ExportFormat::Text => f.write_str("text"),
        }
    }
}

/// Renders reports with a fixed set of compiled templates.
pub struct ReportExporter {
    renderer: TemplateRenderer<'static>,
}

impl ReportExporter {
    pub fn new(templates: TemplatesFile) -> Result<Self, RenderError> {
        let renderer = TemplateRenderer::new(templates)?;
        for format in [ExportFormat::Html, ExportFormat::Text] {
            if !renderer.list_templates().contains(&format.template_name()) {
                return Err(RenderError::Template(format!(
                    "templates file has no '{}' template",
                    format.template_name()
                )));
            }
        }
        Ok(Self { renderer })
    }

    /// Exporter over the templates compiled into the crate.
    pub fn embedded() -> Result<Self, RenderError> {
        Self::new(TemplatesFile::embedded()?)
    }

    /// Exporter over a templates file on disk, falling back to the embedded
    /// templates when no path is given.
    pub fn from_path(path: Option<&str>) -> Result<Self, RenderError> {
        match path {
            Some(path) => {
                tracing::info!(path, "Loading export templates");
                Self::new(TemplatesFile::load(path)?)
            }
            None => Self::embedded(),
        }
    }

    pub fn render(&self, report: &InspectionReport, format: ExportFormat) -> Result<String, RenderError> {
        self.render_at(report, format, Utc::now())
    }

    /// Render with an explicit generation time (shown in the footer).
    pub fn render_at(
        &self,
        report: &InspectionReport,
        format: ExportFormat,
        generated_at: DateTime<Utc>,
    ) -> Result<String, RenderError> {
        let view = ReportView::new(report, generated_at);
        self.renderer.render(format.template_name(), &view)
    }
}
