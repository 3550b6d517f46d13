//! Caption-data wire shape
//!
//! The player delivers captions as JSON with a top-level `events` array;
//! each event carries a start offset in milliseconds and a list of text
//! segments. Both `events` and `segs` can be absent, and segments can lack
//! their `utf8` field. Decoding tolerates all of those shapes.

use serde::{Deserialize, Serialize};

/// A full caption payload as delivered by the caption endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<CaptionEvent>>,
}

/// One timed caption event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionEvent {
    #[serde(rename = "tStartMs", default)]
    pub t_start_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segs: Option<Vec<CaptionSegment>>,
}

/// One text segment within an event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionSegment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utf8: Option<String>,
}

impl Transcript {
    /// Decode a transcript from a raw response body
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Iterate events, treating a missing `events` array as empty
    pub fn events(&self) -> impl Iterator<Item = &CaptionEvent> {
        self.events.iter().flatten()
    }

    /// Whether the payload carries any events at all
    pub fn is_empty(&self) -> bool {
        self.events.as_ref().map_or(true, |e| e.is_empty())
    }
}

impl CaptionEvent {
    /// Concatenated text of all segments in this event
    pub fn text(&self) -> String {
        self.segs
            .iter()
            .flatten()
            .filter_map(|seg| seg.utf8.as_deref())
            .collect()
    }
}
