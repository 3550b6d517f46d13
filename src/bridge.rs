//! Extension boundary messages
//!
//! Wire shapes for the two message boundaries: captured transcripts going
//! out to the persistence collaborator, and popup requests coming in for
//! caption-availability checks and timestamp seeks. Field names match the
//! wire exactly (`videoId`, `captionsUnavailable`), so these types
//! round-trip against the existing message schema.

use crate::captions::{self, PlayerSurface};
use crate::config::CaptureConfig;
use crate::transcript::Transcript;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Metadata attached to every capture publication
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPayload {
    pub title: String,
    pub author: String,
    pub video_id: String,
}

/// A captured transcript crossing the persistence boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename = "TRANSCRIPT_CAPTURED", rename_all = "camelCase")]
pub struct CaptureMessage {
    pub video_id: String,
    pub transcript: Transcript,
    pub metadata: MetadataPayload,
}

/// Requests the popup sends to the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PageRequest {
    #[serde(rename = "CHECK_CAPTIONS")]
    CheckCaptions,
    #[serde(rename = "NAVIGATE_TO_TIMESTAMP")]
    NavigateToTimestamp { timestamp: f64 },
}

/// Responses back to the popup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageResponse {
    #[serde(rename_all = "camelCase")]
    CaptionsStatus { captions_unavailable: bool },
    Ack { success: bool },
}

/// The capture-to-persistence channel. Implementations may fail (a torn
/// down host context, a full disk); the engine logs the failure and drops
/// the one message rather than letting it propagate.
pub trait TranscriptSink: Send + Sync {
    fn publish(&self, message: &CaptureMessage) -> anyhow::Result<()>;
}

/// Serves popup requests against the live page
pub struct PageBridge {
    surface: Arc<dyn PlayerSurface>,
    config: CaptureConfig,
}

impl PageBridge {
    pub fn new(surface: Arc<dyn PlayerSurface>, config: CaptureConfig) -> Self {
        Self { surface, config }
    }

    pub async fn handle(&self, request: PageRequest) -> PageResponse {
        match request {
            PageRequest::CheckCaptions => PageResponse::CaptionsStatus {
                captions_unavailable: self.captions_unavailable().await,
            },
            PageRequest::NavigateToTimestamp { timestamp } => {
                info!("Seeking playback to {}s", timestamp);
                self.surface.seek_to(timestamp);
                PageResponse::Ack { success: true }
            }
        }
    }

    /// Poll for the caption button for up to the configured budget. If it
    /// never mounts, captions are reported unavailable.
    async fn captions_unavailable(&self) -> bool {
        let button = captions::wait_for_button(
            &self.surface,
            &self.config,
            self.config.button_poll_max_attempts,
        )
        .await;
        match button {
            Some(button) => !captions::is_available(&button),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{init_test_logging, FakeSurface};

    fn bridge(surface: Arc<FakeSurface>) -> PageBridge {
        init_test_logging();
        PageBridge::new(surface, CaptureConfig::default())
    }

    #[test]
    fn capture_message_matches_the_wire() {
        let message = CaptureMessage {
            video_id: "abc123".to_string(),
            transcript: Transcript::default(),
            metadata: MetadataPayload {
                title: "A title".to_string(),
                author: "An author".to_string(),
                video_id: "abc123".to_string(),
            },
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "TRANSCRIPT_CAPTURED");
        assert_eq!(json["videoId"], "abc123");
        assert_eq!(json["metadata"]["videoId"], "abc123");
        assert_eq!(json["metadata"]["title"], "A title");
    }

    #[test]
    fn page_requests_decode_from_the_wire() {
        let check: PageRequest = serde_json::from_str(r#"{"type":"CHECK_CAPTIONS"}"#).unwrap();
        assert_eq!(check, PageRequest::CheckCaptions);

        let seek: PageRequest =
            serde_json::from_str(r#"{"type":"NAVIGATE_TO_TIMESTAMP","timestamp":42.5}"#).unwrap();
        assert_eq!(seek, PageRequest::NavigateToTimestamp { timestamp: 42.5 });
    }

    #[test]
    fn responses_encode_with_wire_field_names() {
        let status = PageResponse::CaptionsStatus {
            captions_unavailable: true,
        };
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            r#"{"captionsUnavailable":true}"#
        );
        assert_eq!(
            serde_json::to_string(&PageResponse::Ack { success: true }).unwrap(),
            r#"{"success":true}"#
        );
    }

    #[tokio::test(start_paused = true)]
    async fn check_captions_reports_available_button() {
        let surface = Arc::new(FakeSurface::new());
        surface.mount_button(false);
        let bridge = bridge(surface);
        assert_eq!(
            bridge.handle(PageRequest::CheckCaptions).await,
            PageResponse::CaptionsStatus {
                captions_unavailable: false
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn check_captions_defaults_to_unavailable_when_button_never_mounts() {
        let surface = Arc::new(FakeSurface::new());
        surface.remove_button();
        let bridge = bridge(surface);
        assert_eq!(
            bridge.handle(PageRequest::CheckCaptions).await,
            PageResponse::CaptionsStatus {
                captions_unavailable: true
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_tooltip_reports_unavailable() {
        let surface = Arc::new(FakeSurface::new());
        surface.mount_button(false);
        surface.set_tooltip("Subtitles/closed captions unavailable");
        let bridge = bridge(surface);
        assert_eq!(
            bridge.handle(PageRequest::CheckCaptions).await,
            PageResponse::CaptionsStatus {
                captions_unavailable: true
            }
        );
    }

    #[tokio::test]
    async fn navigate_request_seeks_and_acks() {
        let surface = Arc::new(FakeSurface::new());
        let bridge = bridge(surface.clone());
        let response = bridge
            .handle(PageRequest::NavigateToTimestamp { timestamp: 95.0 })
            .await;
        assert_eq!(response, PageResponse::Ack { success: true });
        assert_eq!(surface.seeks(), vec![95.0]);
    }
}
