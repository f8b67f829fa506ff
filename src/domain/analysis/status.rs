//! SystemStatus enum - the overall health verdict of an analysis.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Overall health of the analysed system, best to worst.
///
/// Parsing is exact: the five capitalised literals are the only accepted
/// spellings. Case variants are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemStatus {
    Excellent,
    Good,
    Satisfactory,
    Bad,
    Awful,
}

impl SystemStatus {
    /// All statuses in order from best to worst.
    pub const ALL: [SystemStatus; 5] = [
        SystemStatus::Excellent,
        SystemStatus::Good,
        SystemStatus::Satisfactory,
        SystemStatus::Bad,
        SystemStatus::Awful,
    ];

    /// Returns the wire literal for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemStatus::Excellent => "Excellent",
            SystemStatus::Good => "Good",
            SystemStatus::Satisfactory => "Satisfactory",
            SystemStatus::Bad => "Bad",
            SystemStatus::Awful => "Awful",
        }
    }

    /// Returns true if the status calls for operator attention.
    pub fn needs_attention(&self) -> bool {
        matches!(self, SystemStatus::Bad | SystemStatus::Awful)
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned when a string is not one of the five status literals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown system status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for SystemStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SystemStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
