//! Caption control access
//!
//! The caption toggle lives in the host page, so all access goes through
//! the [`PlayerSurface`] trait the embedding environment implements. The
//! helpers here never panic on a missing or half-mounted control: absence
//! is an answer, not an error.

use crate::config::CaptureConfig;
use std::sync::Arc;
use tracing::{debug, info};

/// A point-in-time read of the caption toggle control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSnapshot {
    /// Tooltip text on the control; mentions "unavailable" when the video
    /// has no captions
    pub tooltip_title: String,
    /// Whether the control reports captions enabled
    pub pressed: bool,
}

/// Descriptive metadata scraped from the watch page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub author: String,
    pub video_id: String,
}

/// Everything the engine needs from the host page. Implementations must
/// swallow their own DOM failures: a control that cannot be read is
/// reported as absent, and a click that cannot land returns `false`.
pub trait PlayerSurface: Send + Sync {
    /// Read the caption toggle, or `None` if it is not (yet) mounted
    fn caption_button(&self) -> Option<ButtonSnapshot>;

    /// Synthesize a click on the caption toggle; `false` if the control
    /// vanished before the click could land
    fn click_caption_button(&self) -> bool;

    /// The page's current location
    fn current_url(&self) -> String;

    /// Move playback to the given position
    fn seek_to(&self, seconds: f64);

    /// Title/author/id for the current video, best effort
    fn metadata(&self) -> VideoMetadata;
}

/// Whether captions can be enabled at all for the current video, judged
/// from the control's tooltip text
pub fn is_available(button: &ButtonSnapshot) -> bool {
    !button.tooltip_title.to_lowercase().contains("unavailable")
}

/// Current caption state as a tri-state: `None` when the control is absent
pub fn caption_state(surface: &dyn PlayerSurface) -> Option<bool> {
    surface.caption_button().map(|button| button.pressed)
}

/// Poll for the caption button at a fixed interval until it appears or the
/// attempt budget runs out. The control mounts late and asynchronously, so
/// a bounded wait is the only way to tell "not yet" from "not at all".
pub async fn wait_for_button(
    surface: &Arc<dyn PlayerSurface>,
    config: &CaptureConfig,
    max_attempts: u32,
) -> Option<ButtonSnapshot> {
    for attempt in 0..max_attempts {
        if let Some(button) = surface.caption_button() {
            debug!("Caption button found after {} attempts", attempt + 1);
            return Some(button);
        }
        tokio::time::sleep(config.button_poll_interval()).await;
    }
    info!("Caption button not found after {} attempts", max_attempts);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSurface;

    #[test]
    fn tooltip_decides_availability() {
        let available = ButtonSnapshot {
            tooltip_title: "Subtitles/closed captions (c)".to_string(),
            pressed: false,
        };
        let unavailable = ButtonSnapshot {
            tooltip_title: "Subtitles/closed captions unavailable".to_string(),
            pressed: false,
        };
        let shouting = ButtonSnapshot {
            tooltip_title: "CAPTIONS UNAVAILABLE".to_string(),
            pressed: false,
        };
        assert!(is_available(&available));
        assert!(!is_available(&unavailable));
        assert!(!is_available(&shouting));
    }

    #[test]
    fn caption_state_is_tri_state() {
        let surface = FakeSurface::new();
        surface.remove_button();
        assert_eq!(caption_state(&surface), None);

        surface.mount_button(false);
        assert_eq!(caption_state(&surface), Some(false));

        surface.mount_button(true);
        assert_eq!(caption_state(&surface), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_stops_as_soon_as_button_mounts() {
        let surface = Arc::new(FakeSurface::new());
        surface.mount_button(false);
        let dyn_surface: Arc<dyn PlayerSurface> = surface;

        let config = CaptureConfig::default();
        let button = wait_for_button(&dyn_surface, &config, 30).await;
        assert!(button.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_gives_up_after_budget() {
        let surface = Arc::new(FakeSurface::new());
        surface.remove_button();
        let dyn_surface: Arc<dyn PlayerSurface> = surface;

        let config = CaptureConfig::default();
        let button = wait_for_button(&dyn_surface, &config, 5).await;
        assert!(button.is_none());
    }
}
