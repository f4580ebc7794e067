use anyhow::Result;
use reqwest::Client;
use serde_json::Value;

use super::types::*;
use crate::config::{Config, Credentials};
use crate::retry::{retry, CallError, RetryPolicy};

/// Client for the switch JSON-RPC command API
pub struct EapiClient {
    client: Client,
    https: bool,
    policy: RetryPolicy,
}

impl EapiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(!config.eapi_verify_tls)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            https: config.eapi_https,
            policy: config.retry_policy(),
        })
    }

    fn endpoint(&self, host: &str) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}/command-api", scheme, host)
    }

    /// Run show commands on `host`, one JSON result per command.
    pub async fn run_cmds(
        &self,
        host: &str,
        credentials: &Credentials,
        cmds: &[String],
    ) -> Result<Vec<Value>, CallError> {
        let label = format!("runCmds on {}", host);
        retry(&self.policy, &label, || self.run_cmds_once(host, credentials, cmds)).await
    }

    async fn run_cmds_once(
        &self,
        host: &str,
        credentials: &Credentials,
        cmds: &[String],
    ) -> Result<Vec<Value>, CallError> {
        tracing::debug!("{} <- {:?}", host, cmds);
        let request = RunCmdsRequest::new(uuid::Uuid::new_v4().to_string(), cmds);

        let resp = self
            .client
            .post(self.endpoint(host))
            .basic_auth(&credentials.username, Some(&credentials.password))
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CallError::from_status(status, &body));
        }

        let response: RunCmdsResponse = resp
            .json()
            .await
            .map_err(|e| CallError::Fatal(format!("undecodable runCmds reply from {}: {}", host, e)))?;

        into_results(response, cmds.len())
    }
}

/// Unwrap a runCmds reply, insisting on one result per command sent.
pub fn into_results(response: RunCmdsResponse, expected: usize) -> Result<Vec<Value>, CallError> {
    if let Some(err) = response.error {
        let data = err.data.map(|d| format!(" ({})", d)).unwrap_or_default();
        return Err(CallError::Fatal(format!(
            "runCmds error {}: {}{}",
            err.code, err.message, data
        )));
    }

    let results = response
        .result
        .ok_or_else(|| CallError::Fatal("runCmds reply has neither result nor error".to_string()))?;

    if results.len() != expected {
        return Err(CallError::Fatal(format!(
            "runCmds returned {} results for {} commands",
            results.len(),
            expected
        )));
    }

    Ok(results)
}
