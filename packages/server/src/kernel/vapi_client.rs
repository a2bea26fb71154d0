use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{BaseVoiceSdk, VoiceCall};

/// Vapi API client for voice assistant calls
pub struct VapiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

/// Vapi create-call request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCallRequest<'a> {
    assistant_id: &'a str,
}

/// Vapi call resource (only the fields we read)
#[derive(Debug, Deserialize)]
struct CallResponse {
    id: String,
}

impl VapiClient {
    /// Create a new Vapi client
    pub fn new(api_key: String, base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl BaseVoiceSdk for VapiClient {
    async fn start_session(&self, assistant_id: &str) -> Result<VoiceCall> {
        let response = self
            .client
            .post(format!("{}/call/web", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&CreateCallRequest { assistant_id })
            .send()
            .await
            .context("Failed to send Vapi create call request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Vapi API error {}: {}", status, body);
        }

        let call: CallResponse = response
            .json()
            .await
            .context("Failed to parse Vapi call response")?;

        Ok(VoiceCall {
            id: call.id,
            assistant_id: assistant_id.to_string(),
        })
    }

    async fn stop_session(&self, call_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/call/{}", self.base_url, call_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Failed to send Vapi stop call request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Vapi API error {}: {}", status, body);
        }

        Ok(())
    }
}
