//! # Engine HTTP Client
//!
//! [`ExecutionEngine`] implementation over the engine's HTTP job API:
//!
//! - `POST {base_url}/prompt` with `{"prompt": <document>, "client_id": <id>}`,
//!   answered by `{"prompt_id": "<job id>", ...}`
//! - `GET {base_url}/history/{job_id}`, answered by `{}` while the job is
//!   unknown or in flight, then `{"<job id>": {"status": {...}}}`

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::engine::{CompletionOutcome, ExecutionEngine, JobHandle, SubmitError};
use crate::config::EngineConfig;
use crate::error::{BatcherError, BatcherResult};
use crate::expansion::Document;

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    prompt_id: Option<String>,
}

/// HTTP client for the external execution engine
#[derive(Clone)]
pub struct EngineClient {
    client: Client,
    config: EngineConfig,
    base_url: Url,
}

impl std::fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineClient")
            .field("base_url", &self.base_url.as_str())
            .field("submit_timeout_ms", &self.config.submit_timeout_ms)
            .field("poll_interval_ms", &self.config.poll_interval_ms)
            .finish()
    }
}

impl EngineClient {
    pub fn new(config: EngineConfig) -> BatcherResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            BatcherError::ConfigurationError(format!("Invalid engine base URL: {e}"))
        })?;

        let client = Client::builder()
            .user_agent(format!("batcher/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                BatcherError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?;

        info!(
            base_url = %config.base_url,
            submit_timeout_ms = config.submit_timeout_ms,
            completion_timeout_ms = config.completion_timeout_ms,
            "Created engine client"
        );

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fresh client-session id, `<prefix>-<8 hex chars>`
    pub fn generate_client_id(&self) -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("{}-{}", self.config.client_id_prefix, &hex[..8])
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// One status query; `Ok(None)` while the job has no terminal status
    async fn query_status(&self, job_id: &str) -> Result<Option<CompletionOutcome>, String> {
        let response = self
            .client
            .get(self.endpoint(&format!("history/{job_id}")))
            .timeout(self.config.poll_request_timeout())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let history: Value = response.json().await.map_err(|e| e.to_string())?;
        Ok(interpret_history(&history, job_id))
    }
}

/// Read a terminal outcome out of a history document, if it holds one
///
/// `completed: true` wins over the status string, matching the engine's own
/// precedence.
pub fn interpret_history(history: &Value, job_id: &str) -> Option<CompletionOutcome> {
    let status = history.get(job_id)?.get("status")?;

    if status.get("completed").and_then(Value::as_bool) == Some(true) {
        return Some(CompletionOutcome::Completed);
    }

    if status.get("status_str").and_then(Value::as_str) == Some("error") {
        let reason = status
            .get("messages")
            .and_then(Value::as_array)
            .and_then(|messages| {
                messages.iter().rev().find_map(|message| {
                    let kind = message.get(0).and_then(Value::as_str)?;
                    (kind == "execution_error").then(|| {
                        message
                            .get(1)
                            .and_then(|detail| detail.get("exception_message"))
                            .and_then(Value::as_str)
                            .unwrap_or("execution_error")
                            .to_string()
                    })
                })
            })
            .unwrap_or_else(|| "Engine reported an execution error".to_string());
        return Some(CompletionOutcome::Failed(reason));
    }

    None
}

#[async_trait]
impl ExecutionEngine for EngineClient {
    #[instrument(skip(self, document), fields(nodes = document.len()))]
    async fn submit(&self, document: &Document) -> Result<JobHandle, SubmitError> {
        let client_id = self.generate_client_id();
        let body = json!({
            "prompt": document,
            "client_id": client_id,
        });

        let response = self
            .client
            .post(self.endpoint("prompt"))
            .timeout(self.config.submit_timeout())
            .json(&body)
            .send()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = %status, body = %body, "Engine rejected submission");
            return Err(SubmitError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| SubmitError::MalformedResponse(e.to_string()))?;

        match parsed.prompt_id {
            Some(job_id) if !job_id.is_empty() => {
                debug!(job_id = %job_id, client_id = %client_id, "📤 Submitted job");
                Ok(JobHandle::new(job_id, client_id))
            }
            _ => Err(SubmitError::MalformedResponse(
                "response carried no prompt_id".to_string(),
            )),
        }
    }

    #[instrument(skip(self), fields(job_id = %handle.job_id))]
    async fn await_completion(&self, handle: &JobHandle, timeout: Duration) -> CompletionOutcome {
        let started = Instant::now();
        let interval = self.config.poll_interval();

        loop {
            match self.query_status(&handle.job_id).await {
                Ok(Some(outcome)) => {
                    debug!(outcome = ?outcome, elapsed_ms = started.elapsed().as_millis() as u64, "Job reached terminal status");
                    return outcome;
                }
                Ok(None) => {}
                Err(error) => debug!(error = %error, "Status query failed, will retry"),
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                warn!(timeout_ms = timeout.as_millis() as u64, "⚠️ Job did not finish in time");
                return CompletionOutcome::TimedOut;
            }

            tokio::time::sleep(interval.min(timeout - elapsed)).await;
        }
    }
}
