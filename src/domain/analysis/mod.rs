//! Analysis module - the validated result of a log analysis and its cost.
//!
//! - `status` - the five-level [`SystemStatus`] verdict
//! - `report` - [`Analysis`], its raw decoded form and validation
//! - `stats` - token usage, pricing tables and per-call [`Stats`]

mod report;
mod stats;
mod status;

pub use report::{Analysis, Metrics, RawAnalysis, ValidationError};
pub use stats::{Pricing, Stats, TokenUsage};
pub use status::{SystemStatus, UnknownStatus};
