//! Passive closed-caption transcript capture, storage and search.
//!
//! capscribe watches a video page's own caption traffic, captures the
//! transcript of whatever the user is watching, persists it locally, and
//! lets the accumulated corpus be searched later with playback jumping to
//! the matching timestamp.
//!
//! The embedding host (a browser extension's page context, or anything
//! with an HTTP layer and a player UI) provides three things:
//!
//! - a [`captions::PlayerSurface`]: access to the caption toggle, the
//!   location URL, playback seeking and page metadata;
//! - response forwarding into a [`network::ResponseObserver`] (the
//!   [`network::TimedTextTap`]) so caption deliveries are seen as they
//!   happen, unmodified;
//! - its navigation signals, fed to a [`navigation::NavigationWatcher`].
//!
//! The [`fallback::CaptureEngine`] in the middle waits for a natural
//! caption fetch, and when none comes, briefly toggles captions on to
//! force one, restoring the user's original setting afterwards. The
//! user's own caption clicks always win over the engine's.
//!
//! ```no_run
//! use capscribe::captions::{ButtonSnapshot, PlayerSurface, VideoMetadata};
//! use capscribe::{
//!     CaptureConfig, CaptureEngine, NavigationWatcher, StoreSink, TimedTextTap,
//!     TranscriptStore,
//! };
//! use std::sync::Arc;
//!
//! struct HostPage;
//!
//! impl PlayerSurface for HostPage {
//!     fn caption_button(&self) -> Option<ButtonSnapshot> {
//!         None // read the real control here
//!     }
//!     fn click_caption_button(&self) -> bool {
//!         false
//!     }
//!     fn current_url(&self) -> String {
//!         String::new()
//!     }
//!     fn seek_to(&self, _seconds: f64) {}
//!     fn metadata(&self) -> VideoMetadata {
//!         VideoMetadata::default()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let surface: Arc<dyn PlayerSurface> = Arc::new(HostPage);
//!     let store = TranscriptStore::open_default().expect("storage dir");
//!     let engine = CaptureEngine::new(
//!         surface.clone(),
//!         Arc::new(StoreSink::new(store)),
//!         CaptureConfig::default(),
//!     );
//!
//!     // Install the tap into the host's HTTP layer, then feed navigation
//!     // signals to the watcher.
//!     let _tap = TimedTextTap::new(engine.clone());
//!     let watcher = NavigationWatcher::new(engine, surface);
//!     watcher.initialize_for_current_video();
//! }
//! ```

pub mod bridge;
pub mod captions;
pub mod config;
pub mod fallback;
pub mod navigation;
pub mod network;
pub mod search;
pub mod session;
pub mod store;
pub mod transcript;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::{CaptureMessage, MetadataPayload, PageBridge, PageRequest, PageResponse, TranscriptSink};
pub use config::CaptureConfig;
pub use fallback::{AbortReason, CaptureEngine, CaptureEvent};
pub use navigation::NavigationWatcher;
pub use network::{ResponseObserver, TimedTextTap};
pub use search::{find_matches, search_transcripts, SearchMatch, VideoMatches};
pub use session::{video_id_from_url, Phase};
pub use store::{StoreSink, StoredTranscript, TranscriptStore};
pub use transcript::{CaptionEvent, CaptionSegment, Transcript};
