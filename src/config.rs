//! Capture engine configuration
//!
//! All delays and the caption endpoint pattern are tunable, with defaults
//! matching the behavior observed to work well on the host player. Overrides
//! can be loaded from a TOML snippet.

use serde::Deserialize;
use std::time::Duration;

/// Tunable parameters for the capture engine
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// How long to wait for a natural caption fetch before trying the
    /// UI fallback
    pub fallback_delay_ms: u64,
    /// How long after an extension-initiated toggle before the original
    /// caption state is restored
    pub restore_delay_ms: u64,
    /// Extra wait when captions were already enabled at fallback time,
    /// before forcing a toggle cycle
    pub already_on_grace_ms: u64,
    /// Interval between polls for the caption button
    pub button_poll_interval_ms: u64,
    /// Maximum number of button polls before giving up
    pub button_poll_max_attempts: u32,
    /// Debounce window after a detected navigation before committing to
    /// the new video
    pub navigation_settle_ms: u64,
    /// Spacing between the off and on clicks of a forced toggle cycle
    pub toggle_retry_delay_ms: u64,
    /// Window within which a button mutation is attributed to our own
    /// click rather than the user
    pub extension_toggle_window_ms: u64,
    /// Substring identifying caption-delivery responses
    pub caption_endpoint_marker: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fallback_delay_ms: 2500,
            restore_delay_ms: 1000,
            already_on_grace_ms: 1000,
            button_poll_interval_ms: 100,
            button_poll_max_attempts: 30,
            navigation_settle_ms: 1500,
            toggle_retry_delay_ms: 500,
            extension_toggle_window_ms: 200,
            caption_endpoint_marker: "youtube.com/api/timedtext".to_string(),
        }
    }
}

impl CaptureConfig {
    /// Parse a config from a TOML snippet, falling back to defaults for
    /// any field not present
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    pub fn restore_delay(&self) -> Duration {
        Duration::from_millis(self.restore_delay_ms)
    }

    pub fn already_on_grace(&self) -> Duration {
        Duration::from_millis(self.already_on_grace_ms)
    }

    pub fn button_poll_interval(&self) -> Duration {
        Duration::from_millis(self.button_poll_interval_ms)
    }

    pub fn navigation_settle(&self) -> Duration {
        Duration::from_millis(self.navigation_settle_ms)
    }

    pub fn toggle_retry_delay(&self) -> Duration {
        Duration::from_millis(self.toggle_retry_delay_ms)
    }

    pub fn extension_toggle_window(&self) -> Duration {
        Duration::from_millis(self.extension_toggle_window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_expected_timings() {
        let config = CaptureConfig::default();
        assert_eq!(config.fallback_delay_ms, 2500);
        assert_eq!(config.restore_delay_ms, 1000);
        assert_eq!(config.button_poll_max_attempts, 30);
        assert_eq!(config.navigation_settle_ms, 1500);
        assert_eq!(config.extension_toggle_window_ms, 200);
        assert_eq!(config.caption_endpoint_marker, "youtube.com/api/timedtext");
    }

    #[test]
    fn partial_toml_override_keeps_defaults() {
        let config = CaptureConfig::from_toml("fallback_delay_ms = 100").unwrap();
        assert_eq!(config.fallback_delay_ms, 100);
        assert_eq!(config.restore_delay_ms, 1000);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(CaptureConfig::from_toml("fallback_delay_ms = \"soon\"").is_err());
    }
}
