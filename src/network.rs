//! Network observation
//!
//! The engine never issues caption requests itself; it watches the ones
//! the player already makes. The host registers a [`ResponseObserver`]
//! with whatever HTTP layer it has (a fetch wrapper, a client middleware)
//! and forwards every completed response. Observation must never alter
//! the response or its timing, and nothing that goes wrong here may leak
//! back into the host's request path: bad payloads are logged and
//! dropped, and the next caption response gets a fresh chance.

use crate::fallback::CaptureEngine;
use crate::session::video_id_from_url;
use crate::transcript::Transcript;
use tracing::{debug, warn};

/// Installed by the host into its HTTP layer; called once per completed
/// response with the request URL and the response body
pub trait ResponseObserver: Send + Sync {
    fn on_response(&self, url: &str, body: &str);
}

/// The caption-endpoint observer: matches caption-delivery URLs, decodes
/// the payload, and reports the capture to the engine
pub struct TimedTextTap {
    engine: CaptureEngine,
}

impl TimedTextTap {
    pub fn new(engine: CaptureEngine) -> Self {
        Self { engine }
    }
}

impl ResponseObserver for TimedTextTap {
    fn on_response(&self, url: &str, body: &str) {
        if !url.contains(&self.engine.config().caption_endpoint_marker) {
            return;
        }
        debug!("Caption endpoint response observed: {}", url);

        let Some(video_id) = video_id_from_url(url) else {
            warn!("Caption response carries no video id, skipping: {}", url);
            return;
        };
        match Transcript::from_json(body) {
            Ok(transcript) => self.engine.on_transcript_captured(&video_id, transcript),
            Err(e) => warn!("Failed to decode caption payload for {}: {}", video_id, e),
        }
    }
}
