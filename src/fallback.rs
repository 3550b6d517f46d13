//! Capture orchestration
//!
//! `CaptureEngine` coordinates the whole per-video capture cycle: waiting
//! for the player to fetch captions on its own, forcing a fetch through the
//! caption toggle when it does not, and putting the control back the way
//! the user had it afterwards. All waits are spawned timer tasks owned by
//! the session's exclusive slots, so a navigation reset can cancel anything
//! outstanding in one place.
//!
//! Observers can follow the orchestration through a broadcast channel of
//! [`CaptureEvent`]s.

use crate::bridge::{CaptureMessage, MetadataPayload, TranscriptSink};
use crate::captions::{self, PlayerSurface};
use crate::config::CaptureConfig;
use crate::session::{video_id_from_url, Phase, PhaseEvent, SessionState};
use crate::transcript::Transcript;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Why a fallback attempt ended without touching the caption control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The caption button never mounted within the polling budget
    ButtonNotFound,
    /// The control reports captions unavailable for this video
    CaptionsUnavailable,
}

/// Observable orchestration milestones
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// A navigation settled and the engine re-armed for a new video
    NavigationCommitted { video_id: String },
    /// A caption payload was captured off the wire
    TranscriptCaptured { video_id: String },
    /// The natural-capture wait elapsed and a fallback attempt began
    FallbackStarted,
    /// The attempt ended before any click
    FallbackAborted { reason: AbortReason },
    /// Captions were already on; a forced off/on cycle started
    ToggleCycleStarted,
    /// The original caption state was restored (`clicked` says whether a
    /// click was needed)
    RestorationComplete { clicked: bool },
    /// Restoration was skipped because the user changed captions themselves
    RestorationSkipped,
    /// A caption toggle outside the attribution window was seen while a
    /// fallback was pending
    UserOverrideDetected,
    /// The attempt ran to completion without ever seeing a capture
    FallbackExhausted,
}

struct EngineInner {
    config: CaptureConfig,
    surface: Arc<dyn PlayerSurface>,
    sink: Arc<dyn TranscriptSink>,
    state: Mutex<SessionState>,
    events: broadcast::Sender<CaptureEvent>,
}

/// The capture orchestrator. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct CaptureEngine {
    inner: Arc<EngineInner>,
}

impl CaptureEngine {
    pub fn new(
        surface: Arc<dyn PlayerSurface>,
        sink: Arc<dyn TranscriptSink>,
        config: CaptureConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            inner: Arc::new(EngineInner {
                config,
                surface,
                sink,
                state: Mutex::new(SessionState::default()),
                events,
            }),
        }
    }

    /// Subscribe to orchestration events
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.inner.events.subscribe()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.inner.config
    }

    /// Current phase, for diagnostics
    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    /// Whether the current video's transcript has been captured
    pub fn transcript_captured(&self) -> bool {
        self.state().transcript_captured
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Session mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn emit(&self, event: CaptureEvent) {
        let _ = self.inner.events.send(event);
    }

    /// A navigation signal observed the given URL. Video changes debounce
    /// through the settle timer; the latest id observed during the window
    /// wins and earlier ones are discarded.
    pub fn on_possible_navigation(&self, url: &str) {
        let Some(video_id) = video_id_from_url(url) else {
            debug!("Not a watch URL, ignoring: {}", url);
            return;
        };

        let mut state = self.state();
        if state.current_video_id.as_deref() == Some(video_id.as_str()) {
            // Back on the tracked video. Any pending settle will compare
            // against this and skip the earlier change.
            state.pending_video_id = Some(video_id);
            return;
        }

        debug!(
            "Video change to {} observed, settling for {} ms",
            video_id, self.inner.config.navigation_settle_ms
        );
        state.pending_video_id = Some(video_id);
        let engine = self.clone();
        let delay = self.inner.config.navigation_settle();
        state.navigation_timer.arm(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.commit_pending_navigation();
        }));
    }

    /// Settle timer fired: commit the latest observed video id, unless it
    /// drifted back to the one already tracked.
    fn commit_pending_navigation(&self) {
        let (pending, current) = {
            let mut state = self.state();
            (state.pending_video_id.take(), state.current_video_id.clone())
        };
        match pending {
            Some(id) if current.as_deref() != Some(id.as_str()) => self.on_video_committed(&id),
            Some(id) => debug!("Video settled back on {}, nothing to do", id),
            None => debug!("Settle fired with no pending video"),
        }
    }

    /// Reset the session for a new video and arm the natural-capture wait.
    /// This is the universal cancellation point: every outstanding timer
    /// dies here before the new id is installed.
    pub fn on_video_committed(&self, video_id: &str) {
        info!("Video changed to {}", video_id);
        {
            let mut state = self.state();
            // Aborting the settle timer from inside its own task is fine:
            // the abort only lands at an await point and this path has none.
            state.reset();
            state.current_video_id = Some(video_id.to_string());
            state.pending_video_id = None;
            state.apply(PhaseEvent::VideoCommitted);

            let engine = self.clone();
            let delay = self.inner.config.fallback_delay();
            state.fallback_timer.arm(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                engine.run_fallback_attempt().await;
            }));
        }
        debug!(
            "Scheduled fallback check in {} ms",
            self.inner.config.fallback_delay_ms
        );
        self.emit(CaptureEvent::NavigationCommitted {
            video_id: video_id.to_string(),
        });
    }

    /// The fallback timer fired. Runs the whole attempt in one task (the
    /// occupant of the fallback slot), so cancelling that slot stops the
    /// attempt wherever it is.
    async fn run_fallback_attempt(&self) {
        {
            let mut state = self.state();
            if state.transcript_captured {
                debug!("Transcript already captured, skipping fallback");
                return;
            }
            if state.fallback_in_progress() {
                debug!("Fallback already in progress");
                return;
            }
            if state.apply(PhaseEvent::FallbackDue) != Phase::AttemptingFallback {
                return;
            }
        }
        info!(
            "No capture after {} ms, attempting caption toggle fallback",
            self.inner.config.fallback_delay_ms
        );
        self.emit(CaptureEvent::FallbackStarted);

        let button = captions::wait_for_button(
            &self.inner.surface,
            &self.inner.config,
            self.inner.config.button_poll_max_attempts,
        )
        .await;

        let Some(button) = button else {
            self.abort_fallback(AbortReason::ButtonNotFound);
            return;
        };
        if !captions::is_available(&button) {
            self.abort_fallback(AbortReason::CaptionsUnavailable);
            return;
        }

        // Record the user's preference once, before any click of ours.
        let originally_on = button.pressed;
        {
            let mut state = self.state();
            if state.original_caption_state.is_none() {
                state.original_caption_state = Some(originally_on);
            }
        }
        info!("Original caption state: {}", originally_on);

        if originally_on {
            // Captions are on, so a caption fetch should already be in
            // flight. Give it a grace window, then force a fresh fetch
            // with one off/on cycle. One cycle only: if that does not
            // produce a payload the attempt is exhausted.
            info!("Captions already enabled, waiting for natural capture");
            tokio::time::sleep(self.inner.config.already_on_grace()).await;
            {
                let mut state = self.state();
                if state.transcript_captured || !state.fallback_in_progress() {
                    return;
                }
                if state.apply(PhaseEvent::ToggleStarted) != Phase::Toggling {
                    return;
                }
            }
            info!("Still no capture, toggling captions off and on");
            self.emit(CaptureEvent::ToggleCycleStarted);
            self.click_caption_button();
            tokio::time::sleep(self.inner.config.toggle_retry_delay()).await;
            if !self.state().fallback_in_progress() {
                return;
            }
            self.click_caption_button();
        } else {
            info!("Enabling captions to force a caption fetch");
            self.click_caption_button();
        }

        self.arm_restoration();
    }

    fn abort_fallback(&self, reason: AbortReason) {
        info!("Aborting fallback: {:?}", reason);
        self.state().apply(PhaseEvent::FallbackAborted);
        self.emit(CaptureEvent::FallbackAborted { reason });
    }

    /// Click the caption control on the engine's behalf, stamping the
    /// click so the mutation it causes is attributed to us rather than
    /// the user.
    fn click_caption_button(&self) {
        // Stamp before the click: the host may deliver the resulting
        // mutation before the click call returns.
        self.state().last_extension_toggle = Some(Instant::now());
        if !self.inner.surface.click_caption_button() {
            warn!("Caption control vanished before click could land");
        }
    }

    fn arm_restoration(&self) {
        let mut state = self.state();
        if state.apply(PhaseEvent::RestorationArmed) != Phase::Restoring {
            return;
        }
        let engine = self.clone();
        let delay = self.inner.config.restore_delay();
        state.restore_timer.arm(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.finish_restoration();
        }));
        debug!(
            "Scheduled caption state restoration in {} ms",
            self.inner.config.restore_delay_ms
        );
    }

    /// Put the caption control back the way the user had it, once per
    /// attempt. Runs from the restoration timer, or immediately when a
    /// capture lands mid-fallback.
    fn finish_restoration(&self) {
        let (user_changed, original, captured) = {
            let state = self.state();
            if !state.fallback_in_progress() {
                debug!("No fallback pending, nothing to restore");
                return;
            }
            (
                state.user_changed_captions,
                state.original_caption_state,
                state.transcript_captured,
            )
        };

        if user_changed {
            info!("User changed captions during fallback, leaving their choice");
            let mut state = self.state();
            state.user_changed_captions = false;
            state.apply(PhaseEvent::RestorationDone);
            drop(state);
            self.emit(CaptureEvent::RestorationSkipped);
            return;
        }

        let mut clicked = false;
        if let Some(original) = original {
            match captions::caption_state(self.inner.surface.as_ref()) {
                Some(current) if current != original => {
                    info!("Restoring caption state to {}", original);
                    self.click_caption_button();
                    clicked = true;
                }
                Some(_) => debug!("Caption state already matches original"),
                None => warn!("Cannot restore caption state, control not found"),
            }
        }

        self.state().apply(PhaseEvent::RestorationDone);
        self.emit(CaptureEvent::RestorationComplete { clicked });
        if !captured {
            info!("Fallback ran to completion without a capture");
            self.emit(CaptureEvent::FallbackExhausted);
        }
    }

    /// A caption payload was observed on the wire. Cancels any pending
    /// fallback work, short-circuits a pending restoration, and publishes
    /// the transcript across the persistence boundary.
    pub fn on_transcript_captured(&self, video_id: &str, transcript: Transcript) {
        info!("Transcript captured for video {}", video_id);
        let restore_now = {
            let mut state = self.state();
            state.transcript_captured = true;
            state.fallback_timer.cancel();
            let was_fallback = state.fallback_in_progress();
            if was_fallback {
                state.restore_timer.cancel();
            }
            state.apply(PhaseEvent::CaptureObserved);
            was_fallback
        };

        self.emit(CaptureEvent::TranscriptCaptured {
            video_id: video_id.to_string(),
        });
        self.publish(video_id, transcript);

        if restore_now {
            debug!("Fallback was active, restoring caption state now");
            self.finish_restoration();
        }
    }

    /// Hand the capture to the persistence collaborator. A dead channel
    /// costs us this publication, never the capture itself.
    fn publish(&self, video_id: &str, transcript: Transcript) {
        let metadata = self.inner.surface.metadata();
        let message = CaptureMessage {
            video_id: video_id.to_string(),
            transcript,
            metadata: MetadataPayload {
                title: metadata.title.trim().to_string(),
                author: metadata.author.trim().to_string(),
                video_id: metadata.video_id,
            },
        };
        if let Err(e) = self.inner.sink.publish(&message) {
            warn!("Failed to publish captured transcript: {}", e);
        }
    }

    /// The host's attribute observer saw the caption control toggle.
    /// Mutations within the attribution window of our own click are ours;
    /// anything else while a fallback is pending is the user, and their
    /// choice wins: restoration is cancelled and not retried. The window
    /// is a heuristic, so rapid consecutive user toggles can be
    /// misattributed; best effort, not a guarantee.
    pub fn on_button_mutation(&self, pressed: bool) {
        let mut state = self.state();
        if !state.fallback_in_progress() {
            return;
        }
        let ours = state
            .last_extension_toggle
            .is_some_and(|at| at.elapsed() <= self.inner.config.extension_toggle_window());
        if ours {
            debug!("Caption mutation attributed to our own click");
            return;
        }

        info!(
            "User toggled captions to {} during fallback, standing down",
            pressed
        );
        state.user_changed_captions = true;
        state.restore_timer.cancel();
        state.fallback_timer.cancel();
        state.apply(PhaseEvent::UserOverride);
        drop(state);
        self.emit(CaptureEvent::UserOverrideDetected);
    }
}
