//! HTTP client for the semantic oracle server.
//!
//! Stateless prompt-in, text-out. Transport and auth failures surface as
//! `EngineError::Oracle` so the core can degrade to its deterministic
//! paths; the content of a response is never interpreted here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use runclub_core::oracle::MatchOracle;
use runclub_core::{EngineError, EngineResult};

const MAX_TOKENS: u32 = 1024;
const TEMPERATURE: f32 = 0.1;

pub struct OracleClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct QueryResponse {
    response: String,
}

impl OracleClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> OracleClient {
        OracleClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Liveness probe, used by the `check` command.
    pub async fn health(&self) -> Result<()> {
        self.http
            .get(format!("{}/health", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .context("Failed to reach oracle server")?
            .error_for_status()
            .context("Oracle health check failed")?;
        Ok(())
    }
}

impl MatchOracle for OracleClient {
    async fn complete(&self, system: &str, user: &str) -> EngineResult<String> {
        // The server takes one prompt string; the system framing leads.
        let prompt = format!("{system}\n\n{user}");
        let request = QueryRequest {
            prompt: &prompt,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .http
            .post(format!("{}/query", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::Oracle(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Oracle(format!("server returned {status}")));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Oracle(format!("malformed response envelope: {e}")))?;

        tracing::debug!(chars = body.response.len(), "oracle responded");
        Ok(body.response)
    }
}
