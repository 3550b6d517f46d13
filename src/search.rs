//! Transcript search
//!
//! Substring search across captured transcripts: per-event matching inside
//! one transcript, corpus search across everything stored, and the text
//! helpers the results page needs (sentence-bounded context, `<mark>`
//! highlighting, timestamp formatting). Matching is case-insensitive
//! containment; anything fancier is out of scope.

use crate::store::StoredTranscript;
use crate::transcript::Transcript;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;

/// One matching caption event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// Event start offset in milliseconds
    pub timestamp_ms: u64,
    /// Concatenated segment text of the event
    pub text: String,
    /// Start offset in whole seconds, for seek links
    pub time_seconds: u64,
}

/// All matches within one stored video
#[derive(Debug, Clone, Serialize)]
pub struct VideoMatches {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub url: String,
    pub matches: Vec<SearchMatch>,
}

/// Find every caption event whose text contains the query, preserving
/// transcript order. Missing `events` or `segs` yield no matches.
pub fn find_matches(transcript: &Transcript, query: &str) -> Vec<SearchMatch> {
    let needle = query.to_lowercase();
    transcript
        .events()
        .filter_map(|event| {
            let text = event.text();
            if text.to_lowercase().contains(&needle) {
                Some(SearchMatch {
                    timestamp_ms: event.t_start_ms,
                    text,
                    time_seconds: event.t_start_ms / 1000,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Search the whole stored corpus. Videos with no matches are omitted; a
/// blank query matches nothing.
pub fn search_transcripts(videos: &[StoredTranscript], query: &str) -> Vec<VideoMatches> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    videos
        .iter()
        .filter_map(|video| {
            let matches = find_matches(&video.transcript, query);
            if matches.is_empty() {
                None
            } else {
                Some(VideoMatches {
                    video_id: video.video_id.clone(),
                    title: video.title.clone(),
                    author: video.author.clone(),
                    url: video.url.clone(),
                    matches,
                })
            }
        })
        .collect()
}

/// Sentence boundaries: terminal punctuation followed by whitespace or
/// end of text
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[.!?]+(\s+|$)").expect("sentence pattern is valid")
});

/// Case-insensitive matcher for a literal query
fn query_matcher(query: &str) -> Option<Regex> {
    if query.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Trim a matched event's text down to the sentence containing the first
/// query occurrence plus one neighbor on each side. Falls back to the
/// full text when the query or a sentence boundary cannot be located.
pub fn extract_context(text: &str, query: &str) -> String {
    let Some(matcher) = query_matcher(query) else {
        return text.to_string();
    };
    let Some(found) = matcher.find(text) else {
        return text.to_string();
    };

    // Sentence spans over the original text.
    let mut sentences: Vec<(usize, usize)> = Vec::new();
    let mut last = 0;
    for end in SENTENCE_END.find_iter(text) {
        sentences.push((last, end.end()));
        last = end.end();
    }
    if last < text.len() {
        sentences.push((last, text.len()));
    }
    if sentences.is_empty() {
        return text.to_string();
    }

    let Some(hit) = sentences
        .iter()
        .position(|&(start, end)| found.start() >= start && found.start() < end)
    else {
        return text.to_string();
    };

    let from = hit.saturating_sub(1);
    let to = (hit + 1).min(sentences.len() - 1);
    sentences[from..=to]
        .iter()
        .map(|&(start, end)| text[start..end].trim())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Escape text for embedding in HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// HTML-escape the text and wrap every query occurrence in `<mark>`.
/// Highlighting runs over the escaped text with an escaped query, so the
/// two stay aligned even when the query contains markup characters.
pub fn highlight_html(text: &str, query: &str) -> String {
    let escaped_text = escape_html(text);
    let escaped_query = escape_html(query);
    let Some(matcher) = query_matcher(&escaped_query) else {
        return escaped_text;
    };
    matcher
        .replace_all(&escaped_text, "<mark>$0</mark>")
        .into_owned()
}

/// Render a millisecond offset as `m:ss`
pub fn format_time(milliseconds: u64) -> String {
    let seconds = milliseconds / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Watch link that starts playback at the match
pub fn match_link(video_url: &str, time_seconds: u64) -> String {
    format!("{}&t={}s", video_url, time_seconds)
}

/// One-line summary of a result set, e.g. "Found 3 matches in 2 videos"
pub fn summary_line(results: &[VideoMatches]) -> String {
    let total: usize = results.iter().map(|r| r.matches.len()).sum();
    format!(
        "Found {} match{} in {} video{}",
        total,
        if total == 1 { "" } else { "es" },
        results.len(),
        if results.len() == 1 { "" } else { "s" },
    )
}
