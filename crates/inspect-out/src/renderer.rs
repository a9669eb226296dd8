//! Template rendering for report export.
//!
//! Uses Handlebars with custom helpers:
//! - status_label: GREEN/YELLOW/RED to PASS/MONITOR/FAIL
//! - title_case: snake_case key to display title
//! - truncate: Truncate string to max length
//! - default: Fallback for null or empty values
//!
//! Helpers return values through `call_inner`, so their output goes through
//! the same escaping as plain expressions.

use std::str::FromStr;

use handlebars::{
    no_escape, Context, Handlebars, Helper, HelperDef, RenderContext,
    RenderError as HandlebarsError, ScopedJson,
};
use inspect_core::Status;
use serde::Serialize;
use serde_json::Value;

use crate::templates::{EscapeMode, TemplatesFile};
use crate::RenderError;

/// Compiled renderer with registered helpers
pub struct TemplateRenderer<'a> {
    escaped: Handlebars<'a>,
    plain: Handlebars<'a>,
    templates: TemplatesFile,
}

impl<'a> TemplateRenderer<'a> {
    /// Create a new renderer from a templates file. Every template is
    /// compiled up front so syntax errors surface at startup.
    pub fn new(templates: TemplatesFile) -> Result<Self, RenderError> {
        let mut escaped = registry();
        let mut plain = registry();
        plain.register_escape_fn(no_escape);

        for (name, template) in &templates.templates {
            let target = match template.escape {
                EscapeMode::Html => &mut escaped,
                EscapeMode::None => &mut plain,
            };
            target
                .register_template_string(name, &template.template)
                .map_err(|e| RenderError::Template(format!("Template '{}': {}", name, e)))?;
        }

        Ok(TemplateRenderer {
            escaped,
            plain,
            templates,
        })
    }

    /// Render a named template with data
    pub fn render<T: Serialize>(&self, template_name: &str, data: &T) -> Result<String, RenderError> {
        let template = self
            .templates
            .get(template_name)
            .ok_or_else(|| RenderError::UnknownTemplate(template_name.to_string()))?;
        let registry = match template.escape {
            EscapeMode::Html => &self.escaped,
            EscapeMode::None => &self.plain,
        };
        registry
            .render(template_name, data)
            .map_err(|e| RenderError::Render(e.to_string()))
    }

    /// List available template names
    pub fn list_templates(&self) -> Vec<&str> {
        self.templates.list_templates()
    }
}

fn registry<'a>() -> Handlebars<'a> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    handlebars.register_helper("status_label", Box::new(StatusLabelHelper));
    handlebars.register_helper("title_case", Box::new(TitleCaseHelper));
    handlebars.register_helper("truncate", Box::new(TruncateHelper));
    handlebars.register_helper("default", Box::new(DefaultHelper));
    handlebars
}

// ============================================================================
// Custom Helpers
// ============================================================================

fn param_str<'h>(h: &'h Helper<'_>, idx: usize) -> Option<&'h str> {
    h.param(idx).and_then(|v| v.value().as_str())
}

/// External label for a status; raw GREEN/YELLOW/RED never reach a document.
struct StatusLabelHelper;

impl HelperDef for StatusLabelHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, HandlebarsError> {
        let label = param_str(h, 0)
            .and_then(|raw| Status::from_str(raw).ok())
            .map(|status| status.external_label())
            .unwrap_or("N/A");
        Ok(ScopedJson::Derived(Value::String(label.to_string())))
    }
}

/// "tires_wheels_stem_caps_lug_nuts" -> "Tires Wheels Stem Caps Lug Nuts"
struct TitleCaseHelper;

impl HelperDef for TitleCaseHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, HandlebarsError> {
        let text = param_str(h, 0).unwrap_or("");
        Ok(ScopedJson::Derived(Value::String(title_case(text))))
    }
}

pub(crate) fn title_case(text: &str) -> String {
    text.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Truncate a string to max length (in characters) with ellipsis
struct TruncateHelper;

impl HelperDef for TruncateHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, HandlebarsError> {
        let text = param_str(h, 0).unwrap_or("");
        let max_len = h
            .param(1)
            .and_then(|v| v.value().as_u64())
            .unwrap_or(100) as usize;

        let truncated = match text.char_indices().nth(max_len) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        };
        Ok(ScopedJson::Derived(Value::String(truncated)))
    }
}

/// Default value helper
struct DefaultHelper;

impl HelperDef for DefaultHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, HandlebarsError> {
        let fallback = param_str(h, 1).unwrap_or("");
        let value = match h.param(0).map(|v| v.value()) {
            Some(Value::Null) | None => fallback.to_string(),
            Some(Value::String(s)) if s.trim().is_empty() => fallback.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        Ok(ScopedJson::Derived(Value::String(value)))
    }
}
