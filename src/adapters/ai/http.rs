//! HTTP plumbing shared by the provider adapters.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::{Client, Response};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::domain::analysis::{Pricing, Stats, TokenUsage};
use crate::domain::response::parse_analysis;
use crate::domain::sanitizer::error_snippet;
use crate::ports::{AIError, AnalysisOutcome};

/// Builds a client whose default timeout matches the adapter's.
pub(crate) fn build_client(timeout: Duration) -> Result<Client, AIError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AIError::Configuration(e.to_string()))
}

/// Maps a transport failure to an [`AIError`].
pub(crate) fn map_send_error(e: reqwest::Error, timeout: Duration) -> AIError {
    if e.is_timeout() {
        AIError::Timeout {
            timeout_secs: timeout.as_secs(),
        }
    } else if e.is_connect() {
        AIError::network(format!("Connection failed: {}", e.without_url()))
    } else {
        AIError::network(e.without_url().to_string())
    }
}

/// Reads the body of a successful response, or turns a non-success status
/// into [`AIError::Api`].
pub(crate) async fn read_body(
    provider: &'static str,
    response: Response,
    timeout: Duration,
) -> Result<String, AIError> {
    let status = response.status();

    if status.is_success() {
        return response.text().await.map_err(|e| map_send_error(e, timeout));
    }

    let error_body = response.text().await.unwrap_or_default();
    let (error_type, message) = parse_error_body(&error_body);

    Err(AIError::Api {
        provider,
        status: status.as_u16(),
        error_type,
        message: error_snippet(&message),
    })
}

/// Races `future` against the cancellation token.
pub(crate) async fn with_cancel<T, F>(cancel: &CancellationToken, future: F) -> Result<T, AIError>
where
    F: Future<Output = Result<T, AIError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AIError::Cancelled),
        result = future => result,
    }
}

/// Runs model text through extraction and validation, then accounts usage.
pub(crate) fn finish(
    provider: &'static str,
    model: &str,
    text: &str,
    usage: TokenUsage,
    pricing: &Pricing,
    started: Instant,
) -> Result<AnalysisOutcome, AIError> {
    if text.trim().is_empty() {
        return Err(AIError::EmptyContent);
    }

    tracing::debug!(response_bytes = text.len(), "parsing model response");
    let analysis = parse_analysis(text).map_err(|e| {
        tracing::warn!(error = %e, "model response rejected");
        AIError::from(e)
    })?;

    let stats = Stats::compute(usage, pricing, started.elapsed(), provider, model);
    tracing::info!(
        status = %analysis.system_status,
        input_tokens = stats.input_tokens,
        output_tokens = stats.output_tokens,
        total_tokens = stats.total_tokens(),
        cache_creation_tokens = stats.cache_creation_tokens,
        cache_read_tokens = stats.cache_read_tokens,
        cost_usd = stats.cost_usd,
        duration_seconds = stats.duration_seconds,
        "analysis complete"
    );

    Ok(AnalysisOutcome { analysis, stats })
}

/// Pulls `(type, message)` out of the error envelopes the backends use:
/// `{"error":{"type":..,"message":..}}` or `{"error":".."}`.
fn parse_error_body(body: &str) -> (Option<String>, String) {
    #[derive(Deserialize)]
    struct Envelope {
        error: ErrorField,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorField {
        Detailed {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
        },
        Plain(String),
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(Envelope {
            error: ErrorField::Detailed { error_type, message },
        }) => (error_type, message.unwrap_or_else(|| body.to_string())),
        Ok(Envelope {
            error: ErrorField::Plain(message),
        }) => (None, message),
        Err(_) => (None, body.to_string()),
    }
}
