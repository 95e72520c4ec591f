// state.rs: Song metadata and the snapshot sent to display surfaces

use crate::lyrics::parse::LYRICS_UNAVAILABLE;
use crate::lyrics::{LyricLine, Transcript};
use crate::sync::Synchronizer;
use std::sync::Arc;

/// Track length assumed when the transcript carries no timing.
pub const DEFAULT_DURATION: f64 = 300.0;

/// Seconds of tail kept after the last timed line.
pub const DURATION_MARGIN: f64 = 5.0;

/// The track a session is playing lyrics for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Song {
    pub title: String,
    pub artist: String,
    pub duration: f64,
}

impl Song {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        transcript: &Transcript,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            duration: duration_for(transcript),
        }
    }
}

/// Duration policy: last line rounded up plus a margin, or the default when
/// nothing is timed.
pub fn duration_for(transcript: &Transcript) -> f64 {
    match transcript.lines().last() {
        Some(last) if transcript.is_synced() => last.time.ceil() + DURATION_MARGIN,
        _ => DEFAULT_DURATION,
    }
}

/// Represents a UI update for lyrics and player state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub lines: Arc<Vec<LyricLine>>,
    pub index: Option<usize>,
    pub position: f64,
    pub duration: f64,
    pub playing: bool,
    pub unsynced: Option<String>,
    pub err: Option<String>,
    pub title: String,
    pub artist: String,
    /// A transcript fetch is in flight.
    pub loading: bool,
    pub version: u64, // Incremented on any state change
}

impl Update {
    pub fn current_text(&self) -> Option<&str> {
        self.index
            .and_then(|i| self.lines.get(i))
            .map(|l| l.text.as_str())
    }
}

/// Everything the session loop owns for the active song.
#[derive(Debug, Default)]
pub struct SessionState {
    pub song: Option<Song>,
    pub sync: Synchronizer,
    pub unsynced: Option<String>,
    pub err: Option<String>,
    pub loading: bool,
    pub version: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&mut self) {
        self.version += 1;
    }

    /// Drop the current song and transcript; the clock goes back to zero.
    pub fn clear(&mut self) {
        self.song = None;
        self.sync.reset();
        self.sync.set_lines(Arc::default(), 0.0);
        self.unsynced = None;
        self.err = None;
        self.loading = false;
        self.bump();
    }

    /// Install a freshly parsed transcript with a fresh clock.
    pub fn load(&mut self, song: Song, transcript: Transcript) {
        self.unsynced = if transcript.is_synced() {
            None
        } else {
            let text = transcript.plain_text();
            if text.trim().is_empty() {
                Some(LYRICS_UNAVAILABLE.to_string())
            } else {
                Some(text)
            }
        };
        self.sync = Synchronizer::new(Arc::new(transcript.into_lines()), song.duration);
        self.song = Some(song);
        self.err = None;
        self.loading = false;
        self.bump();
    }

    pub fn snapshot(&self) -> Update {
        let playback = self.sync.playback();
        let (title, artist) = self
            .song
            .as_ref()
            .map(|s| (s.title.clone(), s.artist.clone()))
            .unwrap_or_default();
        Update {
            lines: self.sync.lines().clone(),
            index: playback.current_line_index,
            position: playback.current_time,
            duration: self.sync.duration(),
            playing: playback.is_playing(),
            unsynced: self.unsynced.clone(),
            err: self.err.clone(),
            title,
            artist,
            loading: self.loading,
            version: self.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::parse_transcript;

    #[test]
    fn duration_follows_last_line() {
        let t = parse_transcript("[00:01.00] a\n[03:20.40] b");
        assert_eq!(duration_for(&t), 201.0 + DURATION_MARGIN);
    }

    #[test]
    fn untimed_transcripts_use_default_duration() {
        assert_eq!(duration_for(&parse_transcript("hello")), DEFAULT_DURATION);
        assert_eq!(duration_for(&parse_transcript("[00:01.00]  ")), DEFAULT_DURATION);
    }

    #[test]
    fn load_builds_fresh_clock_and_snapshot() {
        let mut state = SessionState::new();
        state.sync.play();
        let transcript = parse_transcript("[00:00.00] one\n[00:02.00] two");
        let song = Song::new("Title", "Artist", &transcript);
        state.load(song, transcript);

        let upd = state.snapshot();
        assert_eq!(upd.lines.len(), 2);
        assert_eq!(upd.index, Some(0));
        assert_eq!(upd.current_text(), Some("one"));
        assert!(!upd.playing);
        assert_eq!(upd.position, 0.0);
        assert_eq!(upd.duration, 7.0);
        assert_eq!(upd.title, "Title");
        assert!(upd.unsynced.is_none());
    }

    #[test]
    fn unsynced_transcripts_are_kept_as_text() {
        let mut state = SessionState::new();
        let transcript = parse_transcript("PLAIN_TEXT: la la");
        state.load(Song::new("t", "a", &transcript), transcript);
        let upd = state.snapshot();
        assert!(upd.lines.is_empty());
        assert_eq!(upd.index, None);
        assert_eq!(upd.unsynced.as_deref(), Some("la la"));
    }

    #[test]
    fn untagged_verses_are_shown_when_tagged_lines_are_empty() {
        let mut state = SessionState::new();
        let transcript = parse_transcript("Verse about the sea\n[00:01.00]\nChorus of the waves");
        state.load(Song::new("t", "a", &transcript), transcript);
        let upd = state.snapshot();
        assert!(upd.lines.is_empty());
        assert_eq!(upd.index, None);
        let text = upd.unsynced.unwrap();
        assert!(text.contains("Verse about the sea"));
        assert!(text.contains("Chorus of the waves"));
    }

    #[test]
    fn empty_synced_transcript_shows_placeholder() {
        let mut state = SessionState::new();
        let transcript = Transcript::Synced(Vec::new());
        state.load(Song::new("t", "a", &transcript), transcript);
        assert_eq!(state.snapshot().unsynced.as_deref(), Some(LYRICS_UNAVAILABLE));
    }

    #[test]
    fn clear_bumps_version() {
        let mut state = SessionState::new();
        let v = state.version;
        state.clear();
        assert!(state.version > v);
        assert!(state.song.is_none());
    }
}
