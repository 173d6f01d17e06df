use super::error::IssuerError;
use crate::realtime::{ClientSecret, SessionRequest};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

/// HTTP client for the provider's credential-minting endpoint
pub struct ProviderClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProviderClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build provider HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn client_secrets_url(&self) -> String {
        format!("{}/realtime/client_secrets", self.base_url)
    }

    /// Exchange the long-lived `api_key` for an ephemeral client secret.
    ///
    /// Exactly one outbound call per invocation; no retries.
    pub async fn mint_client_secret(
        &self,
        api_key: &str,
        request: &SessionRequest,
    ) -> Result<ClientSecret, IssuerError> {
        let url = self.client_secrets_url();
        info!(
            "Requesting client secret from {} (model={})",
            url, request.session.model
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(IssuerError::Upstream {
                status: status.as_u16(),
                details,
            });
        }

        let body = response.text().await?;
        let secret: ClientSecret = serde_json::from_str(&body)
            .map_err(|e| IssuerError::MalformedResponse(e.to_string()))?;

        info!("Client secret minted (expires_at={:?})", secret.expires_at);

        Ok(secret)
    }
}
