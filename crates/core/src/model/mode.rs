use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown recovery mode: {0}")]
pub struct ParseModeError(String);

//
// ─── RECOVERY MODE ────────────────────────────────────────────────────────────
//

/// How far a plan has been relaxed after missed days.
///
/// Variants are ordered by severity. A plan only ever moves towards
/// `MinimumViableProgress`; completions do not move it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum RecoveryMode {
    #[default]
    #[serde(rename = "Normal Recovery")]
    NormalRecovery,
    #[serde(rename = "Adjusted Recovery")]
    AdjustedRecovery,
    #[serde(rename = "Minimum Viable Progress")]
    MinimumViableProgress,
}

impl RecoveryMode {
    /// Human-readable label, also used as the persisted representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryMode::NormalRecovery => "Normal Recovery",
            RecoveryMode::AdjustedRecovery => "Adjusted Recovery",
            RecoveryMode::MinimumViableProgress => "Minimum Viable Progress",
        }
    }

    /// Returns the more severe of `self` and `other`.
    #[must_use]
    pub fn escalate_to(self, other: RecoveryMode) -> RecoveryMode {
        self.max(other)
    }
}

impl fmt::Display for RecoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecoveryMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Normal Recovery" => Ok(Self::NormalRecovery),
            "Adjusted Recovery" => Ok(Self::AdjustedRecovery),
            "Minimum Viable Progress" => Ok(Self::MinimumViableProgress),
            other => Err(ParseModeError(other.to_owned())),
        }
    }
}
