use crate::config::ClientConfig;
use crate::profile::Profile;
use std::time::Duration;

/// Configuration for a session controller
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bounded wait for the transport to report connected
    pub connect_timeout: Duration,

    /// Speaker label for assistant transcript lines
    pub assistant_name: String,
}

impl SessionConfig {
    pub fn from_client(client: &ClientConfig, profile: &Profile) -> Self {
        Self {
            connect_timeout: client.connect_timeout(),
            assistant_name: profile.name.to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            assistant_name: Profile::DEFAULT.name.to_string(),
        }
    }
}
