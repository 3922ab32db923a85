//! Connection settings.

use std::fmt;
use std::sync::Arc;

use sensordash_core::DEFAULT_HISTORY_CAPACITY;
use sensordash_ws_protocol::SUBSCRIBE_ALL;

use crate::backoff::ReconnectPolicy;
use crate::error::ConfigError;
use crate::token::{EnvToken, TokenSource};

/// Endpoint used when nothing else is configured.
pub const DEFAULT_WS_URL: &str = "ws://localhost:3001";

/// Environment variable holding the endpoint URL.
pub const WS_URL_ENV: &str = "SENSORDASH_WS_URL";

/// Environment variable holding the bearer token.
pub const TOKEN_ENV: &str = "SENSORDASH_TOKEN";

/// Settings for a [`SensorConnection`](crate::SensorConnection).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use sensordash_ws_client::{ReconnectPolicy, SensorClientConfig};
///
/// let config = SensorClientConfig::new("ws://dashboard.local:3001")
///     .unwrap()
///     .with_token(Some("secret".to_string()))
///     .with_reconnect(ReconnectPolicy::Exponential {
///         initial: Duration::from_millis(500),
///         max: Duration::from_secs(30),
///     })
///     .with_history_capacity(300);
/// assert_eq!(config.url(), "ws://dashboard.local:3001");
/// ```
#[derive(Clone)]
pub struct SensorClientConfig {
    /// WebSocket endpoint (default: `ws://localhost:3001`).
    url: String,
    /// Token sent on every open (default: none, sent as `null`).
    token: Arc<dyn TokenSource>,
    /// Topic pattern subscribed on open and applied to inbound frames (default: `#`).
    subscribe_pattern: String,
    /// Delay policy between attempts (default: fixed 5 s).
    reconnect: ReconnectPolicy,
    /// Consecutive failed attempts before giving up (0 = unlimited, default: 0).
    max_reconnect_attempts: usize,
    /// Samples kept per sensor value type (default: 100, 0 disables).
    history_capacity: usize,
}

impl SensorClientConfig {
    /// Settings for `url` with all defaults.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        validate_url(&url)?;
        Ok(Self {
            url,
            token: Arc::new(None::<String>),
            subscribe_pattern: SUBSCRIBE_ALL.to_string(),
            reconnect: ReconnectPolicy::default(),
            max_reconnect_attempts: 0,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        })
    }

    /// Endpoint from `SENSORDASH_WS_URL`, token read from `SENSORDASH_TOKEN`
    /// at every open.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var(WS_URL_ENV)
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_WS_URL.to_string());
        Ok(Self::new(url)?.with_token_source(EnvToken::new(TOKEN_ENV)))
    }

    /// Use a fixed token.
    pub fn with_token(self, token: Option<String>) -> Self {
        self.with_token_source(token)
    }

    pub fn with_token_source(mut self, source: impl TokenSource + 'static) -> Self {
        self.token = Arc::new(source);
        self
    }

    /// Restrict the subscription, e.g. `"user/c1/#"`.
    pub fn with_subscribe_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.subscribe_pattern = pattern.into();
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, max: usize) -> Self {
        self.max_reconnect_attempts = max;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> Option<String> {
        self.token.token()
    }

    pub fn subscribe_pattern(&self) -> &str {
        &self.subscribe_pattern
    }

    pub fn reconnect(&self) -> ReconnectPolicy {
        self.reconnect
    }

    pub fn max_reconnect_attempts(&self) -> usize {
        self.max_reconnect_attempts
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }
}

impl Default for SensorClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            token: Arc::new(None::<String>),
            subscribe_pattern: SUBSCRIBE_ALL.to_string(),
            reconnect: ReconnectPolicy::default(),
            max_reconnect_attempts: 0,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl fmt::Debug for SensorClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorClientConfig")
            .field("url", &self.url)
            .field("subscribe_pattern", &self.subscribe_pattern)
            .field("reconnect", &self.reconnect)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("history_capacity", &self.history_capacity)
            .finish_non_exhaustive()
    }
}

fn validate_url(url: &str) -> Result<(), ConfigError> {
    let rest = url
        .strip_prefix("ws://")
        .or_else(|| url.strip_prefix("wss://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(ConfigError::InvalidUrl(url.to_string())),
    }
}
