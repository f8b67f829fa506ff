//! Response module - turns raw model text into a validated [`Analysis`].
//!
//! The pipeline is: extract the first balanced JSON object, reject it if it
//! exceeds [`MAX_JSON_SIZE`], repair invalid escapes, decode, validate.
//! None of these failures are transient; callers surface them directly.

mod escape;
mod extractor;

pub use escape::repair_escapes;
pub use extractor::extract_json_object;

use thiserror::Error;

use crate::domain::analysis::{Analysis, RawAnalysis, ValidationError};

/// Maximum size of extracted JSON accepted for decoding (1 MiB).
pub const MAX_JSON_SIZE: usize = 1024 * 1024;

/// Content failures in a model response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("no JSON object found in model response")]
    NoJsonObject,

    #[error("extracted JSON is {size} bytes, exceeding the {max} byte limit")]
    TooLarge { size: usize, max: usize },

    #[error("failed to decode analysis JSON: {0}")]
    Decode(String),

    #[error("analysis failed validation: {0}")]
    Validation(#[from] ValidationError),
}

/// Parses model output into a validated analysis.
pub fn parse_analysis(text: &str) -> Result<Analysis, ResponseError> {
    let json = extract_json_object(text).ok_or(ResponseError::NoJsonObject)?;

    if json.len() > MAX_JSON_SIZE {
        return Err(ResponseError::TooLarge {
            size: json.len(),
            max: MAX_JSON_SIZE,
        });
    }

    let repaired = repair_escapes(json);
    let raw: RawAnalysis =
        serde_json::from_str(&repaired).map_err(|e| ResponseError::Decode(e.to_string()))?;

    Ok(raw.validate()?)
}
