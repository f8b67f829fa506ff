//! The structured analysis returned by a model, and its validation.
//!
//! Models return free-form JSON, so decoding happens in two steps:
//! [`RawAnalysis`] accepts anything shaped roughly right (every field
//! optional), and [`RawAnalysis::validate`] turns it into an [`Analysis`]
//! whose invariants hold.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use super::status::SystemStatus;

/// Scalar or string metric values keyed by metric name.
pub type Metrics = BTreeMap<String, Value>;

/// A validated log analysis.
///
/// Issue, warning and recommendation lists preserve the order the model
/// produced them in. All collections are present, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub system_status: SystemStatus,
    pub summary: String,
    pub critical_issues: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub metrics: Metrics,
}

impl Analysis {
    /// Total number of reported issues and warnings.
    pub fn finding_count(&self) -> usize {
        self.critical_issues.len() + self.warnings.len()
    }
}

/// Errors raised when a decoded analysis violates the schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing systemStatus")]
    MissingStatus,

    #[error("invalid systemStatus '{0}': expected one of Excellent, Good, Satisfactory, Bad, Awful")]
    InvalidStatus(String),

    #[error("missing summary")]
    MissingSummary,
}

/// Analysis as decoded from model JSON, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalysis {
    #[serde(default)]
    pub system_status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub critical_issues: Option<Vec<String>>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
    #[serde(default)]
    pub recommendations: Option<Vec<String>>,
    #[serde(default)]
    pub metrics: Option<Metrics>,
}

impl RawAnalysis {
    /// Checks required fields and produces a validated [`Analysis`].
    ///
    /// Absent collections become empty only once the required-field
    /// checks have passed.
    pub fn validate(self) -> Result<Analysis, ValidationError> {
        let status = match self.system_status.as_deref() {
            None | Some("") => return Err(ValidationError::MissingStatus),
            Some(raw) => raw
                .parse::<SystemStatus>()
                .map_err(|_| ValidationError::InvalidStatus(raw.to_string()))?,
        };

        let summary = match self.summary {
            Some(summary) if !summary.is_empty() => summary,
            _ => return Err(ValidationError::MissingSummary),
        };

        Ok(Analysis {
            system_status: status,
            summary,
            critical_issues: self.critical_issues.unwrap_or_default(),
            warnings: self.warnings.unwrap_or_default(),
            recommendations: self.recommendations.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
        })
    }
}
