//! Best-effort track guessing from local audio filenames.
//!
//! Nothing in the sync engine depends on this; it only pre-fills the
//! artist/title of a search.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "m4a", "wav", "opus", "aac"];

static TRACK_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[\s.-]+").expect("track number regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedTrack {
    pub title: String,
    pub artist: String,
    pub path: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Guess `(title, artist)` from a filename such as `"01. Artist - Title.mp3"`.
///
/// `Artist - Title` is split on the first ` - `; later separators stay in the
/// title. Without a separator, `Artist/Title` is tried, and failing that the
/// whole stem is the title. Returns `None` when no title survives.
pub fn guess_from_filename(name: &str) -> Option<DetectedTrack> {
    let stem = strip_extension(name.trim());

    let (artist, title) = if let Some((artist, title)) = stem.split_once(" - ") {
        (artist.trim(), title.trim())
    } else if let Some((artist, title)) = stem.split_once('/') {
        (artist.trim(), title.trim())
    } else {
        (UNKNOWN_ARTIST, stem.trim())
    };

    let title = TRACK_NUMBER_RE.replace(title, "").trim().to_string();
    let mut artist = TRACK_NUMBER_RE.replace(artist, "").trim().to_string();
    if title.is_empty() {
        return None;
    }
    if artist.is_empty() {
        artist = UNKNOWN_ARTIST.to_string();
    }
    Some(DetectedTrack {
        title,
        artist,
        path: None,
    })
}

/// Pick the most recently modified audio file in `dir` and guess its track.
pub fn detect_latest(dir: &Path) -> Result<Option<DetectedTrack>, DetectError> {
    if !dir.is_dir() {
        return Err(DetectError::NotADirectory(dir.to_path_buf()));
    }

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !is_audio_file(&path) {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable file");
                continue;
            }
        };
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    let Some((_, path)) = newest else {
        return Ok(None);
    };
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(None);
    };
    let track = guess_from_filename(name).map(|t| DetectedTrack {
        path: Some(path.clone()),
        ..t
    });
    if let Some(t) = &track {
        tracing::info!(
            artist = %t.artist,
            title = %t.title,
            path = %path.display(),
            "Detected track"
        );
    }
    Ok(track)
}

fn is_audio_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| AUDIO_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(e)))
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 && !name[idx + 1..].contains(['/', ' ']) => &name[..idx],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::Duration;

    fn pair(name: &str) -> Option<(String, String)> {
        guess_from_filename(name).map(|t| (t.artist, t.title))
    }

    #[test]
    fn splits_artist_and_title() {
        assert_eq!(
            pair("Queen - Bohemian Rhapsody.mp3"),
            Some(("Queen".into(), "Bohemian Rhapsody".into()))
        );
    }

    #[test]
    fn extra_separators_stay_in_title() {
        assert_eq!(
            pair("Artist - Song - Live.flac"),
            Some(("Artist".into(), "Song - Live".into()))
        );
    }

    #[test]
    fn strips_track_numbers() {
        assert_eq!(
            pair("01. Artist - 02 - Title.ogg"),
            Some(("Artist".into(), "Title".into()))
        );
        assert_eq!(pair("07 Title.mp3"), Some((UNKNOWN_ARTIST.into(), "Title".into())));
    }

    #[test]
    fn slash_separator_and_unknown_artist() {
        assert_eq!(pair("Band/Tune.wav"), Some(("Band".into(), "Tune".into())));
        assert_eq!(pair("Lonely.m4a"), Some((UNKNOWN_ARTIST.into(), "Lonely".into())));
        assert_eq!(pair(".mp3"), Some((UNKNOWN_ARTIST.into(), ".mp3".into())));
        assert_eq!(pair("Artist - .mp3"), None);
    }

    #[test]
    fn detect_latest_picks_newest_audio_file() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("Old Band - Old Song.mp3");
        let new = dir.path().join("New Band - New Song.flac");
        File::create(&old).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();
        File::create(&new).unwrap();

        let past = SystemTime::now() - Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let track = detect_latest(dir.path()).unwrap().unwrap();
        assert_eq!(track.artist, "New Band");
        assert_eq!(track.title, "New Song");
        assert_eq!(track.path.as_deref(), Some(new.as_path()));
    }

    #[test]
    fn detect_latest_handles_empty_and_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), "x").unwrap();
        assert_eq!(detect_latest(dir.path()).unwrap(), None);
        assert!(matches!(
            detect_latest(&dir.path().join("missing")),
            Err(DetectError::NotADirectory(_))
        ));
    }
}
