//! Core domain enums
//!
//! These map 1:1 onto the values persisted in PostgreSQL and published on the
//! broker, so the string forms are part of the external contract.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a ride.
///
/// Transitions are monotone: `active → ending → completed`. The coordinator
/// is the only writer of this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    Active,
    Ending,
    Completed,
}

impl RideStatus {
    /// Database / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Active => "active",
            RideStatus::Ending => "ending",
            RideStatus::Completed => "completed",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(RideStatus::Active),
            "ending" => Some(RideStatus::Ending),
            "completed" => Some(RideStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drowsiness classification produced by the stream processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum DrowsinessStatus {
    Awake,
    Drowsy,
    Microsleep,
}

impl DrowsinessStatus {
    /// Wire label (`AWAKE`, `DROWSY`, `MICROSLEEP`).
    pub fn label(&self) -> &'static str {
        match self {
            DrowsinessStatus::Awake => "AWAKE",
            DrowsinessStatus::Drowsy => "DROWSY",
            DrowsinessStatus::Microsleep => "MICROSLEEP",
        }
    }

    /// Whether this status triggers rider feedback and an event log entry.
    pub fn is_alert(&self) -> bool {
        !matches!(self, DrowsinessStatus::Awake)
    }
}

impl std::fmt::Display for DrowsinessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Severity bucket assigned to a detected impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum CrashSeverity {
    Mild,
    Moderate,
    Severe,
}

impl CrashSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrashSeverity::Mild => "mild",
            CrashSeverity::Moderate => "moderate",
            CrashSeverity::Severe => "severe",
        }
    }
}

impl std::fmt::Display for CrashSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
