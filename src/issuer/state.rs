use super::provider::ProviderClient;
use crate::config::ProviderConfig;
use crate::profile::{self, Profile};
use anyhow::Result;
use std::sync::Arc;

/// Shared, immutable state for issuer handlers
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<ProviderClient>,

    /// Model, voice and the secret's environment variable name
    pub settings: Arc<ProviderConfig>,

    /// System instructions, generated once from the profile
    pub instructions: Arc<str>,
}

impl AppState {
    pub fn new(settings: ProviderConfig, profile: &Profile) -> Result<Self> {
        let provider = ProviderClient::new(&settings.base_url)?;

        Ok(Self {
            provider: Arc::new(provider),
            settings: Arc::new(settings),
            instructions: profile::instructions(profile).into(),
        })
    }

    /// Provider secret, read from the environment at request time
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.settings.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
