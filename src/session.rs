//! Per-page capture session state
//!
//! One `SessionState` exists per tracked page. It owns the three exclusive
//! timer slots and the capture phase machine, and is reset wholesale every
//! time a navigation commits to a new video. All mutation goes through the
//! engine holding it behind a mutex; nothing here is a hidden global.

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Where the capture cycle for the current video stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No video tracked, or the previous cycle fully resolved
    Idle,
    /// Waiting for the player to fetch captions on its own
    WaitingNatural,
    /// Captions arrived without any intervention
    Captured,
    /// Fallback underway: polling for the caption button
    AttemptingFallback,
    /// Forcing a fresh caption fetch with an off/on toggle cycle
    Toggling,
    /// Waiting to put the caption control back the way the user had it
    Restoring,
}

/// Inputs to the phase machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// A navigation committed to a new video
    VideoCommitted,
    /// A caption payload was captured off the wire
    CaptureObserved,
    /// The natural-capture wait elapsed without a capture
    FallbackDue,
    /// The fallback attempt hit a terminal condition (no button,
    /// captions unavailable)
    FallbackAborted,
    /// The forced toggle cycle began
    ToggleStarted,
    /// A restoration timer was armed after an extension click
    RestorationArmed,
    /// Restoration ran (or was found unnecessary)
    RestorationDone,
    /// A caption toggle not attributable to the extension was observed
    UserOverride,
}

impl Phase {
    /// The single transition function. Pairs not listed are no-ops that
    /// keep the current phase, so a stale timer firing out of turn can
    /// never wedge the machine.
    pub fn transition(self, event: PhaseEvent) -> Phase {
        use Phase::*;
        use PhaseEvent::*;
        match (self, event) {
            (_, VideoCommitted) => WaitingNatural,
            (WaitingNatural, CaptureObserved) => Captured,
            (WaitingNatural, FallbackDue) => AttemptingFallback,
            (AttemptingFallback, FallbackAborted) => Idle,
            (AttemptingFallback, ToggleStarted) => Toggling,
            (AttemptingFallback | Toggling, RestorationArmed) => Restoring,
            (AttemptingFallback | Toggling | Restoring, CaptureObserved) => Restoring,
            (Restoring, RestorationDone) => Idle,
            (AttemptingFallback | Toggling | Restoring, UserOverride) => Idle,
            (phase, _) => phase,
        }
    }

    /// True while a fallback attempt owns the caption control
    pub fn fallback_in_progress(self) -> bool {
        matches!(
            self,
            Phase::AttemptingFallback | Phase::Toggling | Phase::Restoring
        )
    }
}

/// An exclusive slot for one pending timer task. Arming the slot aborts
/// whatever occupied it before, so duplicate or stale firings of the same
/// concern cannot coexist.
#[derive(Debug, Default)]
pub struct TimerSlot {
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    /// Install a new timer task, cancelling any previous occupant
    pub fn arm(&mut self, handle: JoinHandle<()>) {
        self.cancel();
        self.handle = Some(handle);
    }

    /// Abort the pending timer, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether a timer task is still outstanding
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Mutable capture state for the page, reset on every committed navigation
#[derive(Debug, Default)]
pub struct SessionState {
    /// Identity of the video currently tracked
    pub current_video_id: Option<String>,
    /// Latest video id observed by a navigation signal, not yet committed
    pub pending_video_id: Option<String>,
    /// Where the capture cycle stands
    pub phase: Phase,
    /// Whether capture has completed for this video
    pub transcript_captured: bool,
    /// Caption on/off state observed before any extension click; `None`
    /// until a fallback attempt records it
    pub original_caption_state: Option<bool>,
    /// Set when a button mutation was seen outside the extension
    /// attribution window while a fallback was pending
    pub user_changed_captions: bool,
    /// When the extension last clicked the caption control
    pub last_extension_toggle: Option<Instant>,
    /// Timer driving the natural-capture wait, the already-on grace
    /// window, and the toggle spacing (sequential phases of one concern)
    pub fallback_timer: TimerSlot,
    /// Timer driving restoration of the original caption state
    pub restore_timer: TimerSlot,
    /// Debounce timer for pending navigations
    pub navigation_timer: TimerSlot,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

impl SessionState {
    /// Apply a phase event, returning the phase it produced
    pub fn apply(&mut self, event: PhaseEvent) -> Phase {
        let next = self.phase.transition(event);
        if next != self.phase {
            debug!("Phase {:?} -> {:?} on {:?}", self.phase, next, event);
            self.phase = next;
        }
        next
    }

    /// Cancel every outstanding timer and clear all per-video fields.
    /// The universal cancellation point: runs before each new video id
    /// is installed.
    pub fn reset(&mut self) {
        self.fallback_timer.cancel();
        self.restore_timer.cancel();
        self.navigation_timer.cancel();
        self.phase = Phase::Idle;
        self.transcript_captured = false;
        self.original_caption_state = None;
        self.user_changed_captions = false;
        self.last_extension_toggle = None;
    }

    /// Whether a fallback attempt currently owns the caption control
    pub fn fallback_in_progress(&self) -> bool {
        self.phase.fallback_in_progress()
    }
}

/// Extract the video id from a watch-page URL (`v` query parameter).
/// Returns `None` for non-URLs, URLs without the parameter, or an empty
/// value.
pub fn video_id_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}
