use crate::realtime::SessionCredential;
use anyhow::{bail, Context, Result};
use tracing::info;

/// Where the session obtains its short-lived credential
#[async_trait::async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch(&self) -> Result<SessionCredential>;
}

/// Fetches credentials from the issuer's `POST /api/session`
pub struct HttpCredentialSource {
    http: reqwest::Client,
    url: String,
}

impl HttpCredentialSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl CredentialSource for HttpCredentialSource {
    async fn fetch(&self) -> Result<SessionCredential> {
        info!("Requesting session credential from {}", self.url);

        let response = self
            .http
            .post(&self.url)
            .send()
            .await
            .context("Failed to reach credential issuer")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Credential issuer returned {}", status);
        }

        let credential: SessionCredential = response
            .json()
            .await
            .context("Malformed credential response")?;

        Ok(credential)
    }
}
