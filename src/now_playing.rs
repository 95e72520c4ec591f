//! Now-playing notifications.
//!
//! A `NowPlayingSession` is created when a song starts and dropped when it
//! ends (reset, new search, shutdown). While alive it forwards title, artist
//! and the active lyric line to a `NowPlaying` sink whenever that changes;
//! dropping it clears the sink.

use crate::lyrics::LyricLine;
use crate::state::Song;
use crate::sync::PlaybackState;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Lyric text longer than this is cut (by grapheme) before it is sent.
pub const MAX_LYRIC_GRAPHEMES: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlayingInfo {
    pub title: String,
    pub artist: String,
    pub playing: bool,
    pub lyric: Option<String>,
}

impl NowPlayingInfo {
    /// Notification body: `artist • lyric`, or just the artist.
    pub fn body(&self) -> String {
        match &self.lyric {
            Some(lyric) => format!("{} \u{2022} {}", self.artist, lyric),
            None => self.artist.clone(),
        }
    }
}

/// Receiver of now-playing state (a media session, a status bar, a log).
pub trait NowPlaying: Send + Sync {
    fn update(&self, info: &NowPlayingInfo);
    fn clear(&self);
}

/// Sink that writes now-playing changes to the log.
#[derive(Debug, Default)]
pub struct TracingNowPlaying;

impl NowPlaying for TracingNowPlaying {
    fn update(&self, info: &NowPlayingInfo) {
        tracing::info!(
            title = %info.title,
            playing = info.playing,
            body = %info.body(),
            "Now playing"
        );
    }

    fn clear(&self) {
        tracing::info!("Now playing cleared");
    }
}

pub struct NowPlayingSession {
    sink: Arc<dyn NowPlaying>,
    title: String,
    artist: String,
    last: Option<NowPlayingInfo>,
}

impl NowPlayingSession {
    pub fn begin(sink: Arc<dyn NowPlaying>, song: &Song) -> Self {
        Self {
            sink,
            title: song.title.clone(),
            artist: song.artist.clone(),
            last: None,
        }
    }

    /// Push the current state to the sink if it differs from what was last
    /// sent. Returns whether a notification went out.
    pub fn refresh(&mut self, playback: &PlaybackState, lines: &[LyricLine]) -> bool {
        let lyric = if playback.is_playing() {
            playback
                .current_line_index
                .and_then(|i| lines.get(i))
                .map(|l| truncate_graphemes(&l.text, MAX_LYRIC_GRAPHEMES))
        } else {
            None
        };
        let info = NowPlayingInfo {
            title: self.title.clone(),
            artist: self.artist.clone(),
            playing: playback.is_playing(),
            lyric,
        };
        if self.last.as_ref() == Some(&info) {
            return false;
        }
        self.sink.update(&info);
        self.last = Some(info);
        true
    }
}

impl Drop for NowPlayingSession {
    fn drop(&mut self) {
        self.sink.clear();
    }
}

fn truncate_graphemes(text: &str, max: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max).collect();
    if graphemes.next().is_some() {
        format!("{}\u{2026}", head)
    } else {
        head
    }
}
