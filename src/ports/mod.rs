//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## AI Ports
//!
//! - `AIProvider` - Log analysis against an LLM backend
//! - `ConnectionProbe` - Reachability and model availability for local backends

mod ai_provider;

pub use ai_provider::{AIError, AIProvider, AnalysisOutcome, ConnectionProbe, ModelInfo};
