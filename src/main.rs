mod detect;
mod event;
mod lyrics;
mod now_playing;
mod pool;
mod state;
mod sync;
mod text_utils;
mod timer;
mod ui;

use crate::event::{Command, FetchContext};
use crate::lyrics::database::TranscriptCache;
use crate::lyrics::providers::{gemini, Provider, ProviderSettings};
use crate::now_playing::TracingNowPlaying;
use crate::pool::SessionConfig;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing_subscriber::EnvFilter;

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Artist of the song to show lyrics for
    #[arg(long)]
    pub artist: Option<String>,
    /// Title of the song to show lyrics for
    #[arg(long)]
    pub title: Option<String>,
    /// Guess artist/title from the newest audio file in this directory
    #[arg(long, value_name = "DIR")]
    pub detect_dir: Option<PathBuf>,
    /// Local .lrc or plain-text transcript used by the `file` provider
    #[arg(long, value_name = "PATH")]
    pub lyrics_file: Option<PathBuf>,
    /// Comma-separated list of lyric providers in preferred order (e.g. "gemini,lrclib").
    /// If empty, the LYRIC_PROVIDERS env var will be used as a fallback.
    #[arg(long, value_delimiter = ',')]
    pub providers: Vec<String>,
    /// API key for the gemini provider
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// Model used by the gemini provider
    #[arg(long, default_value = gemini::DEFAULT_MODEL)]
    pub model: String,
    /// Path to local transcript cache (optional)
    #[arg(long, env = "KARAOKE_DATABASE")]
    pub database: Option<PathBuf>,
    /// Playback clock tick in milliseconds
    #[arg(long, default_value_t = 100)]
    pub tick_ms: u64,
    /// Start in car mode (high contrast, fewer context lines)
    #[arg(long)]
    pub car: bool,
    /// Pipe current lyric line to stdout (default is modern UI)
    #[arg(long)]
    pub pipe: bool,
    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug_log: bool,
    /// Wait for space instead of starting playback when lyrics load.
    /// Pipe mode has no keys, so it always plays.
    #[arg(long, conflicts_with = "pipe")]
    pub no_autoplay: bool,
}

const DEFAULT_PROVIDERS: &[&str] = &["gemini", "lrclib"];

fn providers_from_env_if_empty(cli: &mut Config) {
    if cli.providers.is_empty()
        && let Ok(s) = std::env::var("LYRIC_PROVIDERS")
    {
        cli.providers = split_provider_list(&s);
    }
    if cli.providers.is_empty() {
        cli.providers = DEFAULT_PROVIDERS.iter().map(|p| p.to_string()).collect();
    }
}

fn split_provider_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Parse provider names, dropping unknown ones with a warning.
fn resolve_providers(names: &[String]) -> Vec<Provider> {
    names
        .iter()
        .filter_map(|name| match name.parse::<Provider>() {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring provider");
                None
            }
        })
        .collect()
}

/// Artist and title from the flags, else from the detection directory.
fn resolve_track(cfg: &Config) -> Option<(String, String)> {
    if let Some(title) = cfg.title.as_deref().filter(|t| !t.trim().is_empty()) {
        let artist = cfg
            .artist
            .clone()
            .unwrap_or_else(|| detect::UNKNOWN_ARTIST.to_string());
        return Some((artist, title.to_string()));
    }
    let dir = cfg.detect_dir.as_deref()?;
    match detect::detect_latest(dir) {
        Ok(Some(track)) => {
            tracing::debug!(path = ?track.path, "Using detected track");
            Some((track.artist, track.title))
        }
        Ok(None) => {
            tracing::warn!(dir = %dir.display(), "No audio files found");
            None
        }
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Track detection failed");
            None
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut cfg = Config::parse();
    providers_from_env_if_empty(&mut cfg);
    init_tracing(cfg.debug_log);

    let cache = match &cfg.database {
        Some(path) => Some(Mutex::new(TranscriptCache::open(path.clone()).await)),
        None => None,
    };
    let fetch = Arc::new(FetchContext {
        providers: resolve_providers(&cfg.providers),
        settings: ProviderSettings {
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            lyrics_file: cfg.lyrics_file.clone(),
        },
        cache,
    });
    if fetch.providers.is_empty() {
        return Err("no usable lyric providers configured".into());
    }

    let (update_tx, update_rx) = mpsc::channel(32);
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let session = tokio::spawn(pool::listen(
        update_tx,
        cmd_rx,
        SessionConfig {
            fetch,
            tick: Duration::from_millis(cfg.tick_ms),
            autoplay: !cfg.no_autoplay,
            sink: Arc::new(TracingNowPlaying),
        },
    ));

    let have_track = match resolve_track(&cfg) {
        Some((artist, title)) => {
            cmd_tx.send(Command::Search { artist, title }).await?;
            true
        }
        None if cfg.pipe => {
            return Err("no track given: pass --title (and --artist) or --detect-dir".into());
        }
        None => false,
    };

    let result = if cfg.pipe {
        crate::ui::pipe::display_lyrics_pipe(update_rx).await
    } else {
        // Without a track the UI starts at the search prompt.
        crate::ui::modern::display_lyrics_modern(update_rx, cmd_tx.clone(), cfg.car, !have_track)
            .await
    };

    let _ = cmd_tx.send(Command::Shutdown).await;
    let _ = session.await;

    // Print error if any, for better diagnostics
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("karaokecar").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_flags_parse() {
        let cfg = parse(&[
            "--artist",
            "Band",
            "--title",
            "Song",
            "--providers",
            "lrclib,file",
            "--tick-ms",
            "50",
            "--car",
        ]);
        assert_eq!(cfg.providers, vec!["lrclib", "file"]);
        assert_eq!(cfg.tick_ms, 50);
        assert!(cfg.car);
        assert!(!cfg.pipe);
        assert_eq!(resolve_track(&cfg), Some(("Band".into(), "Song".into())));
    }

    #[test]
    fn provider_lists_are_normalized() {
        assert_eq!(split_provider_list(" Gemini, ,LRCLIB "), vec!["gemini", "lrclib"]);
        let providers = resolve_providers(&["lrclib".into(), "nope".into(), "file".into()]);
        assert_eq!(providers, vec![Provider::Lrclib, Provider::File]);
    }

    #[test]
    fn pipe_mode_rejects_no_autoplay() {
        let args = ["karaokecar", "--title", "Song", "--pipe", "--no-autoplay"];
        let err = Config::try_parse_from(args).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        assert!(parse(&["--title", "Song", "--no-autoplay"]).no_autoplay);
    }

    #[test]
    fn title_without_artist_uses_placeholder() {
        let cfg = parse(&["--title", "Song"]);
        assert_eq!(
            resolve_track(&cfg),
            Some((detect::UNKNOWN_ARTIST.into(), "Song".into()))
        );
    }

    #[test]
    fn track_detected_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("02. Band - Song.mp3"), b"").unwrap();
        let dir_arg = dir.path().to_str().unwrap();
        let cfg = parse(&["--detect-dir", dir_arg]);
        assert_eq!(resolve_track(&cfg), Some(("Band".into(), "Song".into())));
    }
}
