use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub provider: ProviderConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "voice-interview".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Realtime provider settings used by the credential issuer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API root, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    /// Realtime model the minted credential authorizes
    pub model: String,

    /// Synthesized voice
    pub voice: String,

    /// Name of the environment variable holding the provider secret.
    /// The secret itself is read per request and never stored in config.
    pub api_key_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-realtime".to_string(),
            voice: "echo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Settings for the console session client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Credential issuer endpoint
    pub session_url: String,

    /// Provider endpoint accepting the SDP offer
    pub calls_url: String,

    /// Bounded wait for the peer transport to report connected
    pub connect_timeout_secs: u64,

    /// STUN/TURN URLs handed to the peer connection
    pub ice_servers: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session_url: "http://127.0.0.1:3000/api/session".to_string(),
            calls_url: "https://api.openai.com/v1/realtime/calls".to_string(),
            connect_timeout_secs: 15,
            ice_servers: vec!["stun:stun.l.google.com:19302".to_string()],
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Config {
    /// Load from `path` (extension optional) with `VOICE__SECTION__KEY` overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("VOICE").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }
}
