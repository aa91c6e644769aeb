//! Session headcount status as reported by a session relay.
//!
//! Relays report either a bare descriptive string (`"3 users"`) or a
//! structured record carrying an explicit count, a description and a colour
//! tag for the lobby list. On the wire the two shapes are distinguished by
//! JSON type alone, so the enum is untagged.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Text shown for a session whose relay has not described it yet.
pub const STARTING_DESCRIPTION: &str = "starting ...";

/// Structured status payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StructuredStatus {
    /// Number of users inside the session. Optional on the wire; a report
    /// without it is rejected by the directory.
    #[serde(default)]
    pub count: Option<u32>,
    /// Human-readable description shown in the session list.
    #[serde(default)]
    pub description: String,
    /// Colour tag used by the list renderer.
    #[serde(default)]
    pub color: Option<String>,
}

/// Status of a session's users, as last reported by its relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export, export_to = "bindings/")]
pub enum UsersStatus {
    /// Free-form text whose leading integer, if any, is the headcount.
    Simple(String),
    /// Explicit count, description and colour.
    Structured(StructuredStatus),
}

impl Default for UsersStatus {
    fn default() -> Self {
        Self::Simple(String::new())
    }
}

impl UsersStatus {
    /// Build a structured status.
    pub fn structured(count: u32, description: impl Into<String>, color: Option<String>) -> Self {
        Self::Structured(StructuredStatus {
            count: Some(count),
            description: description.into(),
            color,
        })
    }

    /// Extract the numeric headcount regardless of shape.
    ///
    /// For [`UsersStatus::Simple`] the count is the run of ASCII digits at
    /// the start of the (left-trimmed) text, so `"3 users"` yields 3 and
    /// `"waiting"` yields `None`.
    pub fn count(&self) -> Option<u32> {
        match self {
            Self::Structured(status) => status.count,
            Self::Simple(text) => leading_integer(text),
        }
    }

    /// Description text, empty if the relay sent none.
    pub fn description(&self) -> &str {
        match self {
            Self::Structured(status) => &status.description,
            Self::Simple(text) => text,
        }
    }

    /// Text to render in the session list.
    pub fn display_text(&self) -> &str {
        let description = self.description();
        if description.is_empty() {
            STARTING_DESCRIPTION
        } else {
            description
        }
    }

    /// Colour tag, if the relay supplied one.
    pub fn color(&self) -> Option<&str> {
        match self {
            Self::Structured(status) => status.color.as_deref(),
            Self::Simple(_) => None,
        }
    }
}

fn leading_integer(text: &str) -> Option<u32> {
    let trimmed = text.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed.get(..end).and_then(|digits| digits.parse().ok())
}
