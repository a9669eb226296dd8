//! Status taxonomy: GREEN/YELLOW/RED internally, PASS/MONITOR/FAIL externally.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tri-state health indicator for a component or a whole report.
///
/// Variants are declared in increasing severity so `Ord` ranks
/// `Green < Yellow < Red` and `max()` yields the worst status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Green,
    Yellow,
    Red,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Green, Status::Yellow, Status::Red];

    /// Internal (persisted) representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Green => "GREEN",
            Status::Yellow => "YELLOW",
            Status::Red => "RED",
        }
    }

    /// Label used in human-facing documents. This table is fixed 1:1.
    pub fn external_label(&self) -> &'static str {
        match self {
            Status::Green => "PASS",
            Status::Yellow => "MONITOR",
            Status::Red => "FAIL",
        }
    }

    /// Map a spoken phrase onto a status.
    ///
    /// Pass/Good/OK map to GREEN, Monitor/Seeping/Worn to YELLOW and
    /// Fail/Broken/Leaking to RED. Returns `None` when the phrase is ambiguous,
    /// in which case the technician has to be asked again.
    pub fn from_phrase(phrase: &str) -> Option<Status> {
        let lowered = phrase.to_ascii_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let hit = |vocab: &[&str]| words.iter().any(|w| vocab.contains(w));

        match (hit(GREEN_WORDS), hit(YELLOW_WORDS), hit(RED_WORDS)) {
            (true, false, false) => Some(Status::Green),
            (false, true, false) => Some(Status::Yellow),
            (false, false, true) => Some(Status::Red),
            _ => Status::from_str(phrase.trim()).ok(),
        }
    }
}

const GREEN_WORDS: &[&str] = &["pass", "passed", "good", "ok", "okay", "fine", "green"];
const YELLOW_WORDS: &[&str] = &["monitor", "seeping", "seep", "worn", "wear", "yellow"];
const RED_WORDS: &[&str] = &["fail", "failed", "broken", "leaking", "leak", "red"];

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    /// Strict parse of the internal representation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GREEN" => Ok(Status::Green),
            "YELLOW" => Ok(Status::Yellow),
            "RED" => Ok(Status::Red),
            other => Err(format!(
                "Invalid status '{}': expected GREEN, YELLOW or RED",
                other
            )),
        }
    }
}
