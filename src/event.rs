use crate::lyrics::database::TranscriptCache;
use crate::lyrics::parse::{to_lrc, LYRICS_UNAVAILABLE};
use crate::lyrics::providers::{self, Provider, ProviderSettings};
use crate::lyrics::{parse_transcript, LyricsError, Transcript};
use crate::now_playing::{NowPlaying, NowPlayingSession};
use crate::state::{SessionState, Song, Update};
use crate::sync::SyncChange;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Requests from a display surface to the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search { artist: String, title: String },
    /// Re-issue the last search (after a fetch error).
    Retry,
    Play,
    Pause,
    Toggle,
    SeekTo(f64),
    SeekBy(f64),
    /// Rewind to the start and pause; the transcript is kept.
    Reset,
    /// Drop the current song entirely.
    Clear,
    Shutdown,
}

/// Result of a transcript fetch, tagged with the search it belongs to.
#[derive(Debug)]
pub struct FetchOutcome {
    pub generation: u64,
    pub artist: String,
    pub title: String,
    pub result: Result<FetchedTranscript, LyricsError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTranscript {
    pub transcript: Transcript,
    /// Provider name, `None` when no provider had anything.
    pub provider: Option<String>,
}

/// Everything a fetch task needs, shared between searches.
#[derive(Debug)]
pub struct FetchContext {
    pub providers: Vec<Provider>,
    pub settings: ProviderSettings,
    pub cache: Option<Mutex<TranscriptCache>>,
}

/// Try the cache, then each provider in order.
///
/// Network errors and unconfigured providers fall through to the next
/// provider; any other error stops the chain. When every provider failed the
/// last error is returned so the user can retry; when at least one provider
/// answered "nothing found" the placeholder transcript is returned instead.
pub async fn fetch_transcript_chain(
    ctx: &FetchContext,
    artist: &str,
    title: &str,
) -> Result<FetchedTranscript, LyricsError> {
    if let Some(cache) = &ctx.cache
        && let Some((transcript, provider)) = cache.lock().await.lookup(artist, title)
    {
        return Ok(FetchedTranscript {
            transcript,
            provider: Some(provider),
        });
    }

    let mut last_err: Option<LyricsError> = None;
    let mut answered = false;

    for provider in &ctx.providers {
        match providers::fetch_transcript(*provider, &ctx.settings, artist, title).await {
            Ok(Some(raw)) => {
                let transcript = parse_transcript(&raw);
                tracing::info!(
                    provider = provider.name(),
                    synced = transcript.is_synced(),
                    lines = transcript.lines().len(),
                    "Fetched transcript"
                );
                if let Some(cache) = &ctx.cache
                    && *provider != Provider::File
                {
                    // Synced transcripts are cached in normalized, sorted form.
                    let stored = if transcript.is_synced() {
                        to_lrc(transcript.lines())
                    } else {
                        raw
                    };
                    cache
                        .lock()
                        .await
                        .store(artist, title, provider.name(), stored)
                        .await;
                }
                return Ok(FetchedTranscript {
                    transcript,
                    provider: Some(provider.name().to_string()),
                });
            }
            Ok(None) => {
                tracing::debug!(provider = provider.name(), "No transcript from provider");
                answered = true;
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    provider = provider.name(),
                    error = %e,
                    "Provider failed, trying next"
                );
                last_err = Some(e);
            }
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "Provider error");
                return Err(e);
            }
        }
    }

    match last_err {
        Some(e) if !answered => Err(e),
        _ => Ok(FetchedTranscript {
            transcript: Transcript::Unsynced(LYRICS_UNAVAILABLE.to_string()),
            provider: None,
        }),
    }
}

/// User-facing text for a failed fetch.
pub fn fetch_error_message(err: &LyricsError) -> String {
    format!("Could not fetch lyrics: {}. Press Enter to retry.", err)
}

/// Sends snapshots, skipping ones identical to the last sent.
pub struct UpdateSender {
    tx: mpsc::Sender<Update>,
    last_key: Option<(u64, u64)>,
}

impl UpdateSender {
    pub fn new(tx: mpsc::Sender<Update>) -> Self {
        Self { tx, last_key: None }
    }

    /// Returns false once the receiver is gone.
    pub async fn send(&mut self, state: &SessionState, force: bool) -> bool {
        // Whole seconds are part of the key so the time display keeps moving.
        let key = (state.version, state.sync.current_time().floor() as u64);
        if !force && self.last_key == Some(key) {
            return true;
        }
        if self.tx.send(state.snapshot()).await.is_err() {
            return false;
        }
        self.last_key = Some(key);
        true
    }
}

/// The session: playback state plus the bookkeeping around searches.
pub struct Session {
    pub state: SessionState,
    ctx: Arc<FetchContext>,
    fetch_tx: mpsc::Sender<FetchOutcome>,
    sink: Arc<dyn NowPlaying>,
    now_playing: Option<NowPlayingSession>,
    generation: u64,
    last_search: Option<(String, String)>,
    autoplay: bool,
}

impl Session {
    pub fn new(
        ctx: Arc<FetchContext>,
        fetch_tx: mpsc::Sender<FetchOutcome>,
        sink: Arc<dyn NowPlaying>,
        autoplay: bool,
    ) -> Self {
        Self {
            state: SessionState::new(),
            ctx,
            fetch_tx,
            sink,
            now_playing: None,
            generation: 0,
            last_search: None,
            autoplay,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Apply a command. Returns `true` when the caller should resume the tick
    /// driver (playback just started).
    pub fn handle_command(&mut self, cmd: Command) -> bool {
        let was_playing = self.state.sync.is_playing();
        match cmd {
            Command::Search { artist, title } => {
                self.start_search(artist, title);
                return false;
            }
            Command::Retry => {
                if let Some((artist, title)) = self.last_search.clone() {
                    self.start_search(artist, title);
                }
                return false;
            }
            Command::Clear => {
                self.generation += 1;
                self.now_playing = None;
                self.state.clear();
                return false;
            }
            Command::Play => {
                // Nothing to play until a song is loaded.
                if self.state.song.is_some() {
                    self.apply(|s| s.play());
                }
            }
            Command::Pause => self.apply(|s| s.pause()),
            Command::Toggle => {
                if self.state.song.is_some() {
                    self.apply(|s| s.toggle());
                }
            }
            Command::SeekTo(t) => self.apply(|s| s.seek(t)),
            Command::SeekBy(dt) => self.apply(|s| s.seek_by(dt)),
            Command::Reset => {
                self.apply(|s| s.reset());
                // A rewound song starts a fresh now-playing session on play.
                self.now_playing = None;
            }
            Command::Shutdown => {
                self.now_playing = None;
                return false;
            }
        }
        !was_playing && self.state.sync.is_playing()
    }

    /// Advance the clock. Returns whether anything visible changed.
    pub fn handle_tick(&mut self, delta: f64) -> bool {
        let before = self.state.sync.current_time().floor();
        let change = self.state.sync.tick(delta);
        if change.index_changed {
            tracing::debug!(
                index = self.state.sync.playback().current_line_index_raw(),
                time = self.state.sync.current_time(),
                line = self.state.sync.current_line().map(|l| l.text.as_str()),
                "Line changed"
            );
        }
        if change.any() {
            self.state.bump();
            self.refresh_now_playing();
        }
        change.any() || self.state.sync.current_time().floor() != before
    }

    /// Install a fetch result unless a newer search superseded it. Returns
    /// `true` when playback started.
    pub fn handle_fetch(&mut self, outcome: FetchOutcome) -> bool {
        if outcome.generation != self.generation {
            tracing::debug!(
                stale = outcome.generation,
                current = self.generation,
                title = %outcome.title,
                "Dropping superseded transcript"
            );
            return false;
        }
        match outcome.result {
            Ok(fetched) => {
                let song = Song::new(outcome.title, outcome.artist, &fetched.transcript);
                tracing::info!(
                    title = %song.title,
                    artist = %song.artist,
                    duration = song.duration,
                    provider = fetched.provider.as_deref().unwrap_or("none"),
                    "Loaded transcript"
                );
                self.now_playing = None;
                self.state.load(song, fetched.transcript);
                if self.autoplay {
                    self.state.sync.play();
                }
                self.refresh_now_playing();
                self.state.sync.is_playing()
            }
            Err(e) => {
                tracing::warn!(error = %e, title = %outcome.title, "Transcript fetch failed");
                self.state.loading = false;
                self.state.err = Some(fetch_error_message(&e));
                self.state.bump();
                false
            }
        }
    }

    fn start_search(&mut self, artist: String, title: String) {
        // Last search wins: older in-flight fetches are ignored on arrival.
        self.generation += 1;
        self.now_playing = None;
        self.state.clear();
        self.state.loading = true;
        self.last_search = Some((artist.clone(), title.clone()));
        tracing::info!(%artist, %title, generation = self.generation, "Searching transcript");

        let generation = self.generation;
        let ctx = self.ctx.clone();
        let fetch_tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = fetch_transcript_chain(&ctx, &artist, &title).await;
            let _ = fetch_tx
                .send(FetchOutcome {
                    generation,
                    artist,
                    title,
                    result,
                })
                .await;
        });
    }

    fn apply(&mut self, op: impl FnOnce(&mut crate::sync::Synchronizer) -> SyncChange) {
        let change = op(&mut self.state.sync);
        // Seeks move the clock even when the index stays put.
        self.state.bump();
        if change.any() {
            self.refresh_now_playing();
        }
    }

    /// Forward playback changes to the now-playing session, starting one
    /// when a loaded song begins playing.
    fn refresh_now_playing(&mut self) {
        let playback = self.state.sync.playback();
        if self.now_playing.is_none() {
            match &self.state.song {
                Some(song) if playback.is_playing() => {
                    self.now_playing = Some(NowPlayingSession::begin(self.sink.clone(), song));
                }
                _ => return,
            }
        }
        if let Some(np) = &mut self.now_playing {
            np.refresh(&playback, self.state.sync.lines());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::now_playing::testing::{Notice, RecordingNowPlaying};

    fn context(
        lyrics_file: Option<std::path::PathBuf>,
        providers: Vec<Provider>,
    ) -> Arc<FetchContext> {
        Arc::new(FetchContext {
            providers,
            settings: ProviderSettings {
                lyrics_file,
                ..Default::default()
            },
            cache: None,
        })
    }

    fn outcome(generation: u64, raw: &str) -> FetchOutcome {
        FetchOutcome {
            generation,
            artist: "Artist".into(),
            title: "Title".into(),
            result: Ok(FetchedTranscript {
                transcript: parse_transcript(raw),
                provider: Some("file".into()),
            }),
        }
    }

    fn session(sink: Arc<RecordingNowPlaying>) -> (Session, mpsc::Receiver<FetchOutcome>) {
        let (fetch_tx, fetch_rx) = mpsc::channel(4);
        let session = Session::new(context(None, Vec::new()), fetch_tx, sink, true);
        (session, fetch_rx)
    }

    #[tokio::test]
    async fn file_provider_feeds_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.lrc");
        std::fs::write(&path, "[00:01.00] hi").unwrap();
        let ctx = context(Some(path), vec![Provider::Gemini, Provider::File]);
        let fetched = fetch_transcript_chain(&ctx, "a", "t").await.unwrap();
        assert!(fetched.transcript.is_synced());
        assert_eq!(fetched.provider.as_deref(), Some("file"));
    }

    #[tokio::test]
    async fn unconfigured_chain_reports_last_error() {
        let ctx = context(None, vec![Provider::Gemini, Provider::File]);
        let err = fetch_transcript_chain(&ctx, "a", "t").await.unwrap_err();
        assert!(matches!(err, LyricsError::NotConfigured("file")));
        assert!(fetch_error_message(&err).contains("retry"));
    }

    #[tokio::test]
    async fn empty_answer_gives_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.lrc");
        std::fs::write(&path, "\n").unwrap();
        let ctx = context(Some(path), vec![Provider::File]);
        let fetched = fetch_transcript_chain(&ctx, "a", "t").await.unwrap();
        assert_eq!(
            fetched.transcript,
            Transcript::Unsynced(LYRICS_UNAVAILABLE.into())
        );
        assert_eq!(fetched.provider, None);
    }

    #[tokio::test]
    async fn search_spawns_fetch_with_current_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.lrc");
        std::fs::write(&path, "[00:00.50] hi").unwrap();
        let (fetch_tx, mut fetch_rx) = mpsc::channel(4);
        let sink = Arc::new(RecordingNowPlaying::default());
        let ctx = context(Some(path), vec![Provider::File]);
        let mut session = Session::new(ctx, fetch_tx, sink, true);

        session.handle_command(Command::Search {
            artist: "A".into(),
            title: "T".into(),
        });
        assert!(session.state.loading);
        let outcome = fetch_rx.recv().await.unwrap();
        assert_eq!(outcome.generation, session.generation());
        assert!(session.handle_fetch(outcome));
        assert!(!session.state.loading);
        assert_eq!(session.state.sync.lines().len(), 1);
    }

    #[tokio::test]
    async fn stale_fetch_results_are_ignored() {
        let sink = Arc::new(RecordingNowPlaying::default());
        let (mut session, _rx) = session(sink);
        session.handle_command(Command::Search {
            artist: "A".into(),
            title: "Old".into(),
        });
        session.handle_command(Command::Search {
            artist: "A".into(),
            title: "New".into(),
        });
        let current = session.generation();

        assert!(!session.handle_fetch(outcome(current - 1, "[00:00.00] old")));
        assert!(session.state.song.is_none());
        assert!(session.state.loading);

        assert!(session.handle_fetch(outcome(current, "[00:00.00] new")));
        assert_eq!(session.state.sync.lines()[0].text, "new");
    }

    #[tokio::test]
    async fn fetch_error_is_surfaced() {
        let sink = Arc::new(RecordingNowPlaying::default());
        let (mut session, _rx) = session(sink);
        session.handle_command(Command::Search {
            artist: "A".into(),
            title: "T".into(),
        });
        let failed = FetchOutcome {
            generation: session.generation(),
            artist: "A".into(),
            title: "T".into(),
            result: Err(LyricsError::Api("quota".into())),
        };
        assert!(!session.handle_fetch(failed));
        let upd = session.state.snapshot();
        assert!(upd.err.as_deref().is_some_and(|e| e.contains("quota")));
        assert!(!upd.loading);
    }

    #[tokio::test]
    async fn play_is_gated_on_a_loaded_song() {
        let sink = Arc::new(RecordingNowPlaying::default());
        let (mut session, _rx) = session(sink);
        assert!(!session.handle_command(Command::Play));
        assert!(!session.state.sync.is_playing());
    }

    #[tokio::test]
    async fn ticks_drive_lines_and_now_playing() {
        let sink = Arc::new(RecordingNowPlaying::default());
        let (mut session, _rx) = session(sink.clone());
        assert!(session.handle_fetch(outcome(0, "[00:00.00] one\n[00:00.30] two")));
        for _ in 0..3 {
            session.handle_tick(0.1);
        }
        assert_eq!(session.state.sync.current_line_index(), Some(1));

        session.handle_command(Command::Pause);
        session.handle_command(Command::Clear);
        let notices = sink.take();
        let lyrics: Vec<Option<String>> = notices
            .iter()
            .map(|n| match n {
                Notice::Update(info) => info.lyric.clone(),
                Notice::Clear => Some("<clear>".into()),
            })
            .collect();
        assert_eq!(
            lyrics,
            vec![
                Some("one".into()),
                Some("two".into()),
                None,
                Some("<clear>".into())
            ]
        );
    }

    #[tokio::test]
    async fn reset_ends_the_now_playing_session() {
        let sink = Arc::new(RecordingNowPlaying::default());
        let (mut session, _rx) = session(sink.clone());
        session.handle_fetch(outcome(0, "[00:00.00] one\n[00:01.00] two"));
        session.handle_tick(1.0);
        sink.take();

        session.handle_command(Command::Reset);
        assert_eq!(sink.take().last(), Some(&Notice::Clear));

        assert!(session.handle_command(Command::Play));
        match sink.take().as_slice() {
            [Notice::Update(info)] => assert_eq!(info.lyric.as_deref(), Some("one")),
            other => panic!("unexpected notices: {:?}", other),
        }
    }

    #[tokio::test]
    async fn seek_and_reset_commands() {
        let sink = Arc::new(RecordingNowPlaying::default());
        let (mut session, _rx) = session(sink);
        session.handle_fetch(outcome(0, "[00:00.00] a\n[00:02.00] b\n[00:05.50] c"));
        session.handle_command(Command::SeekTo(3.0));
        assert_eq!(session.state.sync.current_line_index(), Some(1));
        session.handle_command(Command::SeekBy(100.0));
        assert_eq!(session.state.sync.current_time(), session.state.sync.duration());
        session.handle_command(Command::Reset);
        assert_eq!(session.state.sync.current_time(), 0.0);
        assert!(!session.state.sync.is_playing());
        assert!(session.handle_command(Command::Toggle));
    }
}
