//! Runtime settings resolved from the command line and the environment.

use std::net::SocketAddr;
use std::time::Duration;

use eventsync_core::config::AdminConfig;
use eventsync_core::processors::{RetryPolicy, TriggerProcessing};
use eventsync_core::sink::SinkSettings;

use super::ConfigError;

/// Everything the server needs besides the service description.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub listen: SocketAddr,
    pub processing: TriggerProcessing,
    /// Deadline of one trigger cycle, ingestion included.
    pub trigger_timeout: Duration,
    pub publish_retry: RetryPolicy,
    pub sink: SinkSettings,
    /// `None` leaves the admin endpoints open.
    pub admin: Option<AdminConfig>,
    pub permissive_cors: bool,
}

/// Build the admin configuration. Plaintext secrets are hashed; an empty
/// secret disables authentication.
pub fn admin_config(secret: Option<&str>) -> Result<Option<AdminConfig>, ConfigError> {
    match secret.map(str::trim).filter(|s| !s.is_empty()) {
        Some(secret) => AdminConfig::from_secret(secret)
            .map(Some)
            .map_err(|e| ConfigError::HashError(e.to_string())),
        None => Ok(None),
    }
}

/// Publish retry policy for a number of attempts, the first one included.
pub fn publish_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts: attempts.max(1),
        ..RetryPolicy::default()
    }
}
