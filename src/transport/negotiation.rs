use super::Negotiator;
use crate::realtime::SessionCredential;
use anyhow::{bail, Context, Result};
use reqwest::header::CONTENT_TYPE;
use tracing::{error, info};

/// Posts the SDP offer to the provider's realtime calls endpoint
pub struct HttpNegotiator {
    http: reqwest::Client,
    calls_url: String,
}

impl HttpNegotiator {
    pub fn new(calls_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            calls_url: calls_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl Negotiator for HttpNegotiator {
    async fn exchange(&self, credential: &SessionCredential, offer: &str) -> Result<String> {
        info!(
            "Sending SDP offer to {} (model={})",
            self.calls_url, credential.model
        );

        let response = self
            .http
            .post(&self.calls_url)
            .bearer_auth(&credential.ephemeral_key)
            .header(CONTENT_TYPE, "application/sdp")
            .body(offer.to_string())
            .send()
            .await
            .context("Failed to reach realtime calls endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            error!("SDP exchange rejected ({}): {}", status, details);
            bail!("SDP exchange returned {}", status);
        }

        response
            .text()
            .await
            .context("Failed to read SDP answer")
    }
}
