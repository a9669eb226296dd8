//! Checklist template and structural schema enforcement.
//!
//! The template is the trusted, complete default shape of a report. Anything a
//! generative model hands back is masked against it with [`enforce_schema`]:
//!
//! ```text
//! payload (untrusted)     template (trusted)        output
//! { header: {...},        { header: {...},          { header: {...},
//!   sections: {...},  ->    sections: {...},   ->     sections: {...},
//!   bogus: 1 }              general_comments,         general_comments,
//!                           primary_status }          primary_status }
//! ```

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::data_model::{timestamp_format, Zone};
use crate::status::Status;

pub const GROUND_KEYS: &[&str] = &[
    "tires_wheels_stem_caps_lug_nuts",
    "bucket_cutting_edge_moldboard",
    "bucket_cylinders_lines_hoses",
    "loader_frame_arms",
    "underneath_machine",
    "transmission_transfer_case",
    "steps_handholds",
    "fuel_tank",
    "differential_final_drive_oil",
    "air_tank",
    "axles_brakes_seals",
    "hydraulic_tank",
    "transmission_oil",
    "lights_front_rear",
    "battery_compartment",
    "def_tank",
    "overall_machine",
];

pub const ENGINE_KEYS: &[&str] = &[
    "engine_oil",
    "engine_coolant",
    "radiator",
    "all_hoses_and_lines",
    "fuel_filters_water_separator",
    "all_belts",
    "air_filter",
    "overall_engine_compartment",
];

pub const CAB_EXTERIOR_KEYS: &[&str] = &[
    "handholds",
    "rops",
    "fire_extinguisher",
    "windshield_windows",
    "wipers_washers",
    "doors",
];

pub const CAB_INTERIOR_KEYS: &[&str] = &[
    "seat",
    "seat_belt_mounting",
    "horn_alarm_lights",
    "mirrors",
    "cab_air_filter",
    "gauges_indicators_switches",
    "overall_cab_interior",
];

/// Fresh report template stamped with the current date and instant.
pub fn report_template() -> Value {
    report_template_at(timestamp_format::now())
}

/// Report template stamped with `now`.
///
/// Components default to GREEN with an empty comment; `primary_status`
/// defaults to null so a report cannot be saved until it is stated.
pub fn report_template_at(now: DateTime<Utc>) -> Value {
    let sections: Map<String, Value> = Zone::ALL
        .into_iter()
        .map(|zone| (zone.as_str().to_string(), empty_section(zone)))
        .collect();

    json!({
        "header": {
            "serial_number": null,
            "inspector": null,
            "date": now.date_naive().format("%Y-%m-%d").to_string(),
            "timestamp": timestamp_format::format(&now),
            "machine_hours": 0,
        },
        "sections": sections,
        "general_comments": "",
        "primary_status": null,
    })
}

fn empty_section(zone: Zone) -> Value {
    let components: Map<String, Value> = zone
        .component_keys()
        .iter()
        .map(|key| {
            (
                key.to_string(),
                json!({ "status": Status::Green.as_str(), "comments": "" }),
            )
        })
        .collect();
    Value::Object(components)
}

/// Mask an untrusted payload against a trusted template.
///
/// Returns a copy of `template` where every key also present in `payload`
/// takes the payload's value. Recursion happens only when both sides are
/// mappings; a non-mapping payload keeps the whole template subtree. Keys the
/// template does not know are dropped at every depth. Leaf values are taken
/// as-is without type coercion, except that a mapping or array cannot replace
/// a leaf (the default is kept), so the output key set always equals the
/// template's.
pub fn enforce_schema(payload: &Value, template: &Value) -> Value {
    let (Value::Object(defaults), Value::Object(untrusted)) = (template, payload) else {
        return template.clone();
    };

    let masked: Map<String, Value> = defaults
        .iter()
        .map(|(key, default)| {
            let value = match untrusted.get(key) {
                None => default.clone(),
                Some(candidate) if default.is_object() => enforce_schema(candidate, default),
                Some(candidate) if is_leaf(candidate) => candidate.clone(),
                Some(_) => default.clone(),
            };
            (key.clone(), value)
        })
        .collect();

    Value::Object(masked)
}

fn is_leaf(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

/// Dotted paths of payload keys the template does not define.
///
/// Used for logging what a model hallucinated; [`enforce_schema`] drops them.
pub fn unknown_keys(payload: &Value, template: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_unknown(payload, template, "", &mut found);
    found
}

fn collect_unknown(payload: &Value, template: &Value, prefix: &str, found: &mut Vec<String>) {
    let (Value::Object(untrusted), Value::Object(defaults)) = (payload, template) else {
        return;
    };
    for (key, value) in untrusted {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match defaults.get(key) {
            None => found.push(path),
            Some(default) => collect_unknown(value, default, &path, found),
        }
    }
}
