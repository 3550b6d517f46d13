//! Navigation detection
//!
//! Single-page-app video transitions reach the engine through two
//! independent signals: the host-emitted "navigation finished" event, and
//! observation of the page URL changing (which covers hosts that do not
//! emit the event). Both funnel into the engine's shared settle debounce,
//! so a burst of rapid transitions commits only the last stable video.

use crate::captions::PlayerSurface;
use crate::fallback::CaptureEngine;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Feeds the two navigation signals into the capture engine
pub struct NavigationWatcher {
    engine: CaptureEngine,
    surface: Arc<dyn PlayerSurface>,
    last_url: Mutex<Option<String>>,
}

impl NavigationWatcher {
    pub fn new(engine: CaptureEngine, surface: Arc<dyn PlayerSurface>) -> Self {
        Self {
            engine,
            surface,
            last_url: Mutex::new(None),
        }
    }

    /// Arm the engine for the video already on screen at startup. Runs
    /// through the same settle delay as a navigation, giving the player
    /// time to finish mounting.
    pub fn initialize_for_current_video(&self) {
        let url = self.surface.current_url();
        if let Ok(mut last) = self.last_url.lock() {
            *last = Some(url.clone());
        }
        debug!("Initial page is {}", url);
        self.engine.on_possible_navigation(&url);
    }

    /// Signal 1: the host emitted its navigation-finished event
    pub fn on_navigation_finished(&self) {
        let url = self.surface.current_url();
        if let Ok(mut last) = self.last_url.lock() {
            *last = Some(url.clone());
        }
        debug!("Navigation finished at {}", url);
        self.engine.on_possible_navigation(&url);
    }

    /// Signal 2: the host's URL observer ticked. Only a genuine change
    /// since the last observation is forwarded, so this can be called as
    /// often as the host likes.
    pub fn on_location_tick(&self) {
        let url = self.surface.current_url();
        {
            let Ok(mut last) = self.last_url.lock() else {
                return;
            };
            if last.as_deref() == Some(url.as_str()) {
                return;
            }
            *last = Some(url.clone());
        }
        debug!("URL change observed: {}", url);
        self.engine.on_possible_navigation(&url);
    }
}
