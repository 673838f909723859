//! Configuration for the synchronization core.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::errors::{SyncError, SyncResult};

/// Top-level configuration for the synchronization engine.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote API settings.
    pub api: ApiConfig,
    /// Background polling settings.
    pub poll: PollConfig,
    /// Mention resolver settings.
    pub mention: MentionConfig,
}

impl SyncConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> SyncResult<()> {
        Url::parse(&self.api.base_url)?;

        if self.api.request_timeout.is_zero() {
            return Err(SyncError::InvalidConfig(
                "api.request_timeout must be > 0".to_string(),
            ));
        }

        if self.poll.documents_interval.is_zero() {
            return Err(SyncError::InvalidConfig(
                "poll.documents_interval must be > 0".to_string(),
            ));
        }

        if self.poll.generated_interval.is_zero() {
            return Err(SyncError::InvalidConfig(
                "poll.generated_interval must be > 0".to_string(),
            ));
        }

        if self.mention.max_span_chars == 0 {
            return Err(SyncError::InvalidConfig(
                "mention.max_span_chars must be > 0".to_string(),
            ));
        }

        if self.mention.trigger.is_whitespace() {
            return Err(SyncError::InvalidConfig(
                "mention.trigger must not be whitespace".to_string(),
            ));
        }

        Ok(())
    }

    /// Set the remote API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.api.request_timeout = timeout;
        self
    }

    /// Set both polling intervals.
    #[must_use]
    pub const fn with_poll_intervals(mut self, documents: Duration, generated: Duration) -> Self {
        self.poll.documents_interval = documents;
        self.poll.generated_interval = generated;
        self
    }

    /// Enable or disable background polling.
    #[must_use]
    pub const fn with_polling(mut self, enabled: bool) -> Self {
        self.poll.enabled = enabled;
        self
    }
}

/// Remote API transport settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the remote agent API.
    pub base_url: String,
    /// Request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("colloquy-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Background polling settings.
///
/// Generated files poll at a finer interval than uploaded documents since
/// generation is the primary asynchronous side effect users wait on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Whether background polling is enabled.
    pub enabled: bool,
    /// Interval between uploaded-document list refreshes.
    #[serde(with = "duration_serde")]
    pub documents_interval: Duration,
    /// Interval between generated-file list refreshes.
    #[serde(with = "duration_serde")]
    pub generated_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            documents_interval: Duration::from_secs(15),
            generated_interval: Duration::from_secs(5),
        }
    }
}

/// Mention resolver settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MentionConfig {
    /// Character that opens a mention.
    pub trigger: char,
    /// Maximum length, in characters, of the span from the trigger to the
    /// cursor for the mention to stay active.
    pub max_span_chars: usize,
}

impl Default for MentionConfig {
    fn default() -> Self {
        Self {
            trigger: '@',
            max_span_chars: 48,
        }
    }
}

/// Serde module for `Duration` serialization as integer seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.poll.enabled);
        assert_eq!(config.mention.trigger, '@');
        assert_eq!(config.mention.max_span_chars, 48);
    }

    #[test]
    fn test_config_builder() {
        let config = SyncConfig::new()
            .with_base_url("http://agent.internal:9000")
            .with_poll_intervals(Duration::from_secs(30), Duration::from_secs(10))
            .with_polling(false);

        assert_eq!(config.api.base_url, "http://agent.internal:9000");
        assert_eq!(config.poll.documents_interval, Duration::from_secs(30));
        assert!(!config.poll.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = SyncConfig::new().with_base_url("not a url");
        assert!(matches!(config.validate(), Err(SyncError::Url(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config =
            SyncConfig::new().with_poll_intervals(Duration::ZERO, Duration::from_secs(5));
        assert!(matches!(
            config.validate(),
            Err(SyncError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_durations_round_trip_as_seconds() {
        let config = SyncConfig::default();
        let json = serde_json::to_string(&config).unwrap_or_default();
        assert!(json.contains("\"documents_interval\":15"));
        let back: SyncConfig = serde_json::from_str(&json).unwrap_or_default();
        assert_eq!(back.poll.generated_interval, Duration::from_secs(5));
    }
}
