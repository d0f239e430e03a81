use paircore::ReconnectPolicy;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_EVENTS_URL: &str = "ws://localhost:5000";

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(75);
const QR_RETRY_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct PairingConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_base_url: String,
    /// Pairing-events WebSocket endpoint.
    pub events_url: String,
    pub keepalive_interval: Duration,
    /// Delay between QR fetches while the server answers 404.
    pub qr_retry_interval: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            events_url: DEFAULT_EVENTS_URL.to_string(),
            keepalive_interval: KEEPALIVE_INTERVAL,
            qr_retry_interval: QR_RETRY_INTERVAL,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl PairingConfig {
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_events_url(mut self, url: impl Into<String>) -> Self {
        self.events_url = url.into();
        self
    }

    /// Joins `path` onto the API base URL.
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PairingConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:5000");
        assert_eq!(config.events_url, "ws://localhost:5000");
        assert_eq!(config.keepalive_interval, Duration::from_secs(75));
        assert_eq!(config.qr_retry_interval, Duration::from_secs(5));
        assert_eq!(config.reconnect.max_attempts, 10);
    }

    #[test]
    fn test_api_url_joins_without_double_slash() {
        let config = PairingConfig::default().with_api_base_url("http://crm.local:8069/");
        assert_eq!(
            config.api_url("/api/qr/51987654321"),
            "http://crm.local:8069/api/qr/51987654321"
        );
    }
}
