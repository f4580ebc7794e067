use anyhow::Result;
use reqwest::Client;

use super::types::*;
use crate::config::Config;
use crate::retry::{retry, CallError, RetryPolicy};

/// Provisioning-service REST client
pub struct CvpClient {
    base_url: String,
    token: String,
    client: Client,
    policy: RetryPolicy,
}

impl CvpClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(!config.eapi_verify_tls)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            base_url: config.cvp_url.trim_end_matches('/').to_string(),
            token: config.cvp_token.clone(),
            client,
            policy: config.retry_policy(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/cvpservice{}", self.base_url, path)
    }

    /// Look up a device by its system MAC
    pub async fn get_net_element(&self, system_mac: &str) -> Result<NetElement, CallError> {
        let url = self.api_url(&format!(
            "/provisioning/getNetElementById.do?netElementId={}",
            system_mac
        ));
        let label = format!("getNetElementById {}", system_mac);
        retry(&self.policy, &label, || self.get_json(&url)).await
    }

    async fn get_json(&self, url: &str) -> Result<NetElement, CallError> {
        let mut req = self.client.get(url).header("Accept", "application/json");
        if !self.token.is_empty() {
            req = req.bearer_auth(&self.token);
        }
        let resp = req.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CallError::from_status(status, &body));
        }

        let body = resp.text().await?;
        parse_net_element(&body)
    }
}

/// Decode a net element reply, surfacing the API's in-band error bodies.
pub fn parse_net_element(body: &str) -> Result<NetElement, CallError> {
    if let Ok(err) = serde_json::from_str::<CvpErrorBody>(body) {
        return Err(CallError::Fatal(format!(
            "provisioning API error {}: {}",
            err.error_code, err.error_message
        )));
    }
    serde_json::from_str(body)
        .map_err(|e| CallError::Fatal(format!("undecodable net element: {}", e)))
}
