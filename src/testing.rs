//! Shared test doubles
//!
//! A scriptable [`PlayerSurface`] standing in for the host page, plus
//! sink doubles for the persistence boundary.

use crate::bridge::{CaptureMessage, TranscriptSink};
use crate::captions::{ButtonSnapshot, PlayerSurface, VideoMetadata};
use crate::fallback::CaptureEvent;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

const DEFAULT_TOOLTIP: &str = "Subtitles/closed captions (c)";

/// A fake host page: the caption button can be mounted, removed and
/// toggled from the test, clicks are counted, seeks recorded
pub(crate) struct FakeSurface {
    button: Mutex<Option<ButtonSnapshot>>,
    clicks: AtomicUsize,
    url: Mutex<String>,
    seeks: Mutex<Vec<f64>>,
    metadata: Mutex<VideoMetadata>,
}

impl FakeSurface {
    pub(crate) fn new() -> Self {
        Self {
            button: Mutex::new(None),
            clicks: AtomicUsize::new(0),
            url: Mutex::new("https://www.youtube.com/watch?v=abc123".to_string()),
            seeks: Mutex::new(Vec::new()),
            metadata: Mutex::new(VideoMetadata {
                title: "A video".to_string(),
                author: "An author".to_string(),
                video_id: "abc123".to_string(),
            }),
        }
    }

    pub(crate) fn mount_button(&self, pressed: bool) {
        *self.button.lock().unwrap() = Some(ButtonSnapshot {
            tooltip_title: DEFAULT_TOOLTIP.to_string(),
            pressed,
        });
    }

    pub(crate) fn remove_button(&self) {
        *self.button.lock().unwrap() = None;
    }

    pub(crate) fn set_tooltip(&self, tooltip: &str) {
        if let Some(button) = self.button.lock().unwrap().as_mut() {
            button.tooltip_title = tooltip.to_string();
        }
    }

    pub(crate) fn set_pressed(&self, pressed: bool) {
        if let Some(button) = self.button.lock().unwrap().as_mut() {
            button.pressed = pressed;
        }
    }

    pub(crate) fn pressed(&self) -> bool {
        self.button
            .lock()
            .unwrap()
            .as_ref()
            .map(|b| b.pressed)
            .unwrap_or(false)
    }

    pub(crate) fn click_count(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }

    pub(crate) fn set_url(&self, url: &str) {
        *self.url.lock().unwrap() = url.to_string();
    }

    pub(crate) fn seeks(&self) -> Vec<f64> {
        self.seeks.lock().unwrap().clone()
    }
}

impl PlayerSurface for FakeSurface {
    fn caption_button(&self) -> Option<ButtonSnapshot> {
        self.button.lock().unwrap().clone()
    }

    fn click_caption_button(&self) -> bool {
        let mut button = self.button.lock().unwrap();
        match button.as_mut() {
            Some(button) => {
                button.pressed = !button.pressed;
                self.clicks.fetch_add(1, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    fn current_url(&self) -> String {
        self.url.lock().unwrap().clone()
    }

    fn seek_to(&self, seconds: f64) {
        self.seeks.lock().unwrap().push(seconds);
    }

    fn metadata(&self) -> VideoMetadata {
        self.metadata.lock().unwrap().clone()
    }
}

/// Collects everything published across the persistence boundary
#[derive(Default)]
pub(crate) struct CollectingSink {
    messages: Mutex<Vec<CaptureMessage>>,
}

impl CollectingSink {
    pub(crate) fn published(&self) -> Vec<CaptureMessage> {
        self.messages.lock().unwrap().clone()
    }
}

impl TranscriptSink for CollectingSink {
    fn publish(&self, message: &CaptureMessage) -> anyhow::Result<()> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A sink whose channel is always gone, like a torn-down host context
pub(crate) struct FailingSink;

impl TranscriptSink for FailingSink {
    fn publish(&self, _message: &CaptureMessage) -> anyhow::Result<()> {
        anyhow::bail!("extension context invalidated")
    }
}

/// Pull every event already delivered on a broadcast receiver
pub(crate) fn drain(rx: &mut broadcast::Receiver<CaptureEvent>) -> Vec<CaptureEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub(crate) fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
