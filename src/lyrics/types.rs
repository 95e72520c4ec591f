use once_cell::sync::Lazy;
use reqwest::Client;
use thiserror::Error;

// Shared HTTP client with reasonable defaults for timeouts
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("KaraokeCar/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap_or_default()
});

/// Provider result: the raw transcript text, or `None` when the provider had
/// nothing for this track.
pub type ProviderResult = Result<Option<String>, LyricsError>;

/// A single timed lyric line. `time` is in seconds from the start of the track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricLine {
    pub time: f64,
    pub text: String,
}

impl LyricLine {
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
        }
    }
}

/// A parsed transcript: either timed lines sorted by time, or plain text.
#[derive(Debug, Clone, PartialEq)]
pub enum Transcript {
    Synced(Vec<LyricLine>),
    Unsynced(String),
}

impl Transcript {
    /// Timed lines, empty for unsynced transcripts.
    pub fn lines(&self) -> &[LyricLine] {
        match self {
            Transcript::Synced(lines) => lines,
            Transcript::Unsynced(_) => &[],
        }
    }

    /// True only when there is at least one timed line. An empty `Synced`
    /// sequence behaves like an unsynced transcript.
    pub fn is_synced(&self) -> bool {
        matches!(self, Transcript::Synced(lines) if !lines.is_empty())
    }

    /// Text to show when no line can be highlighted.
    pub fn plain_text(&self) -> String {
        match self {
            Transcript::Unsynced(raw) => raw.clone(),
            Transcript::Synced(lines) => lines
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn into_lines(self) -> Vec<LyricLine> {
        match self {
            Transcript::Synced(lines) => lines,
            Transcript::Unsynced(_) => Vec::new(),
        }
    }
}

#[derive(Error, Debug)]
pub enum LyricsError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} provider is not configured")]
    NotConfigured(&'static str),
}

impl LyricsError {
    /// Transient errors let the provider chain fall through to the next source.
    pub fn is_transient(&self) -> bool {
        matches!(self, LyricsError::Network(_) | LyricsError::NotConfigured(_))
    }
}

pub(crate) fn http_client() -> &'static Client {
    &HTTP_CLIENT
}
