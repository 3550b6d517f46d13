//! Transcript persistence
//!
//! Stores one JSON record per video id under a configurable directory,
//! overwriting any earlier capture of the same video. The record keeps
//! the transcript verbatim and adds the watch URL, the capture timestamp,
//! and whatever title/author metadata the page offered.

use crate::bridge::{CaptureMessage, TranscriptSink};
use crate::transcript::Transcript;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// A persisted capture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTranscript {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub url: String,
    /// Capture time, epoch milliseconds
    pub timestamp: i64,
    pub transcript: Transcript,
}

/// Storage errors with contextual information
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Could not determine a storage directory")]
    NoStorageDir,

    #[error("Video id is not usable as a file name: {0:?}")]
    InvalidVideoId(String),

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode or decode a record: {0}")]
    Codec(#[from] serde_json::Error),
}

/// File-backed transcript store, one JSON record per video
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    /// Open a store rooted at the given directory (created on first save)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The default store location under the user's local data directory
    pub fn default_location() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join("Capscribe").join("transcripts"))
    }

    /// Open a store at the default location
    pub fn open_default() -> Result<Self, StoreError> {
        Self::default_location()
            .map(Self::new)
            .ok_or(StoreError::NoStorageDir)
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| StoreError::CreateDirectory {
                path: self.dir.clone(),
                source: e,
            })?;
            info!("Created transcript store directory: {:?}", self.dir);
        }
        Ok(())
    }

    /// Video ids become file names, so only the id alphabet is accepted
    fn path_for(&self, video_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !video_id.is_empty()
            && video_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidVideoId(video_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", video_id)))
    }

    /// Persist a capture, overwriting any earlier record for the video.
    /// Returns the path of the written record.
    pub fn save(&self, message: &CaptureMessage) -> Result<PathBuf, StoreError> {
        self.ensure_dir()?;
        let path = self.path_for(&message.video_id)?;

        let record = StoredTranscript {
            video_id: message.video_id.clone(),
            title: non_empty_or(&message.metadata.title, "Unknown Title"),
            author: non_empty_or(&message.metadata.author, "Unknown Author"),
            url: format!("https://www.youtube.com/watch?v={}", message.video_id),
            timestamp: chrono::Utc::now().timestamp_millis(),
            transcript: message.transcript.clone(),
        };

        let contents = serde_json::to_string(&record)?;
        fs::write(&path, contents).map_err(|e| StoreError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!("Saved transcript for video {}", message.video_id);
        Ok(path)
    }

    /// Load one video's record, `None` if it was never captured
    pub fn load(&self, video_id: &str) -> Result<Option<StoredTranscript>, StoreError> {
        let path = self.path_for(video_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).map_err(|e| StoreError::ReadFile {
            path: path.clone(),
            source: e,
        })?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Load every stored record. Files that fail to decode are skipped
    /// with a warning; one corrupt record must not hide the rest.
    pub fn load_all(&self) -> Result<Vec<StoredTranscript>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::ReadFile {
            path: self.dir.clone(),
            source: e,
        })?;

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    warn!("Skipping unreadable record {:?}: {}", path, e);
                    continue;
                }
            };
            match serde_json::from_str(&contents) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping corrupt record {:?}: {}", path, e),
            }
        }
        // Stable order for callers.
        records.sort_by(|a: &StoredTranscript, b: &StoredTranscript| {
            a.video_id.cmp(&b.video_id)
        });
        Ok(records)
    }
}

/// Wires the engine's publication boundary straight into a local store
pub struct StoreSink {
    store: TranscriptStore,
}

impl StoreSink {
    pub fn new(store: TranscriptStore) -> Self {
        Self { store }
    }
}

impl TranscriptSink for StoreSink {
    fn publish(&self, message: &CaptureMessage) -> anyhow::Result<()> {
        self.store.save(message)?;
        Ok(())
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MetadataPayload;

    fn message(video_id: &str, title: &str) -> CaptureMessage {
        CaptureMessage {
            video_id: video_id.to_string(),
            transcript: Transcript::from_json(
                r#"{"events":[{"tStartMs":1000,"segs":[{"utf8":"hello"}]}]}"#,
            )
            .unwrap(),
            metadata: MetadataPayload {
                title: title.to_string(),
                author: "Author".to_string(),
                video_id: video_id.to_string(),
            },
        }
    }

    #[test]
    fn saves_and_loads_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path());

        store.save(&message("abc123", "A video")).unwrap();
        let record = store.load("abc123").unwrap().unwrap();
        assert_eq!(record.video_id, "abc123");
        assert_eq!(record.title, "A video");
        assert_eq!(record.url, "https://www.youtube.com/watch?v=abc123");
        assert!(record.timestamp > 0);
        assert_eq!(record.transcript.events().count(), 1);
    }

    #[test]
    fn resave_overwrites_and_keeps_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path());

        store.save(&message("abc123", "Old title")).unwrap();
        store.save(&message("abc123", "New title")).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "New title");
    }

    #[test]
    fn blank_metadata_gets_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path());

        let mut msg = message("abc123", "   ");
        msg.metadata.author = String::new();
        store.save(&msg).unwrap();

        let record = store.load("abc123").unwrap().unwrap();
        assert_eq!(record.title, "Unknown Title");
        assert_eq!(record.author, "Unknown Author");
    }

    #[test]
    fn missing_video_is_none_and_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path().join("never-created"));
        assert!(store.load("abc123").unwrap().is_none());
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn rejects_ids_that_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path());
        let err = store.save(&message("../evil", "t")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidVideoId(_)));
        assert!(matches!(
            store.load("").unwrap_err(),
            StoreError::InvalidVideoId(_)
        ));
    }

    #[test]
    fn corrupt_records_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path());
        store.save(&message("good1", "ok")).unwrap();
        std::fs::write(dir.path().join("bad.json"), "not json").unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].video_id, "good1");
    }

    #[test]
    fn store_sink_publishes_into_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let sink = StoreSink::new(TranscriptStore::new(dir.path()));
        sink.publish(&message("abc123", "via sink")).unwrap();

        let store = TranscriptStore::new(dir.path());
        assert_eq!(store.load_all().unwrap().len(), 1);
    }
}
