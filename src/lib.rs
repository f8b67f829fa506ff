//! Logwarden - LLM-backed log analysis
//!
//! This crate sanitizes untrusted log content, sends it to a cloud or local
//! language model and turns the model's free-form answer into a validated
//! health report with token and cost accounting.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
