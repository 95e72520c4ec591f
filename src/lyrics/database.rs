//! Local transcript cache.
//!
//! A JSON file mapping `artist|title` to the raw transcript a provider
//! returned, so repeated searches skip the network. Raw text is stored and
//! re-parsed on retrieval; the parser is cheap and this keeps the cache
//! independent of parser changes.
//!
//! ```text
//! Search ──▶ Cache check ── hit ──▶ Parse
//!                │ miss
//!                ▼
//!          Provider fetch ──▶ Store in cache
//! ```

use crate::lyrics::parse::parse_transcript;
use crate::lyrics::types::{LyricsError, Transcript};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Whether the stored transcript carried timing when it was cached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptFormat {
    Synced,
    Plain,
}

/// Database entry for a single track's transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub artist: String,
    pub title: String,
    /// Provider that produced the transcript
    pub provider: String,
    pub format: TranscriptFormat,
    pub raw: String,
}

/// In-memory database structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TranscriptDatabase {
    entries: HashMap<String, TranscriptEntry>,
}

impl TranscriptDatabase {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Lowercase, trimmed, inner whitespace collapsed.
    fn normalize(s: &str) -> String {
        s.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    fn cache_key(artist: &str, title: &str) -> String {
        format!("{}|{}", Self::normalize(artist), Self::normalize(title))
    }

    pub fn get(&self, artist: &str, title: &str) -> Option<&TranscriptEntry> {
        self.entries.get(&Self::cache_key(artist, title))
    }

    /// Overwrites an existing entry with the same key.
    pub fn insert(&mut self, artist: &str, title: &str, provider: &str, raw: String) {
        let format = if parse_transcript(&raw).is_synced() {
            TranscriptFormat::Synced
        } else {
            TranscriptFormat::Plain
        };
        let entry = TranscriptEntry {
            artist: artist.to_string(),
            title: title.to_string(),
            provider: provider.to_string(),
            format,
            raw,
        };
        self.entries.insert(Self::cache_key(artist, title), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// File I/O
// ============================================================================

/// Loads the database from a JSON file.
///
/// Returns a new empty database if the file doesn't exist or is invalid.
pub async fn load_database(path: &Path) -> TranscriptDatabase {
    match load_database_inner(path).await {
        Ok(db) => {
            tracing::info!(
                path = %path.display(),
                entries = db.len(),
                "Loaded transcript cache"
            );
            db
        }
        Err(LyricsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "Creating new transcript cache");
            TranscriptDatabase::new()
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to load transcript cache, using empty cache"
            );
            TranscriptDatabase::new()
        }
    }
}

async fn load_database_inner(path: &Path) -> Result<TranscriptDatabase, LyricsError> {
    let contents = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

/// Saves the database to a JSON file, creating parent directories.
pub async fn save_database(db: &TranscriptDatabase, path: &Path) -> Result<(), LyricsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(db)?;
    let mut file = fs::File::create(path).await?;
    file.write_all(json.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// A database bound to the file it persists to.
#[derive(Debug)]
pub struct TranscriptCache {
    db: TranscriptDatabase,
    path: PathBuf,
}

impl TranscriptCache {
    pub async fn open(path: PathBuf) -> Self {
        let db = load_database(&path).await;
        Self { db, path }
    }

    /// Cached transcript for the track, parsed.
    pub fn lookup(&self, artist: &str, title: &str) -> Option<(Transcript, String)> {
        let entry = self.db.get(artist, title)?;
        tracing::debug!(artist, title, provider = %entry.provider, "Transcript cache hit");
        Some((parse_transcript(&entry.raw), entry.provider.clone()))
    }

    /// Store a transcript and persist. Save failures are logged, not returned.
    pub async fn store(&mut self, artist: &str, title: &str, provider: &str, raw: String) {
        self.db.insert(artist, title, provider, raw);
        if let Err(e) = save_database(&self.db, &self.path).await {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to save transcript cache"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_ignore_case_and_spacing() {
        let mut db = TranscriptDatabase::new();
        db.insert("The  Band", " Song ", "gemini", "[00:01.00] hi".into());
        let entry = db.get("the band", "SONG").unwrap();
        assert_eq!(entry.format, TranscriptFormat::Synced);
        assert_eq!(entry.provider, "gemini");
        assert!(db.get("the band", "other").is_none());
    }

    #[test]
    fn plain_transcripts_are_marked() {
        let mut db = TranscriptDatabase::new();
        db.insert("a", "t", "lrclib", "PLAIN_TEXT: words".into());
        assert_eq!(db.get("a", "t").unwrap().format, TranscriptFormat::Plain);
    }

    #[tokio::test]
    async fn cache_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let mut cache = TranscriptCache::open(path.clone()).await;
        assert!(cache.lookup("Artist", "Title").is_none());
        cache
            .store("Artist", "Title", "gemini", "[00:02.00] two\n[00:01.00] one".into())
            .await;

        let cache = TranscriptCache::open(path).await;
        let (transcript, provider) = cache.lookup("artist", "title").unwrap();
        assert_eq!(provider, "gemini");
        let texts: Vec<&str> = transcript.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_database(&path).await.is_empty());
    }
}
