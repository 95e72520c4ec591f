pub mod file;
pub mod gemini;
pub mod lrclib;

use crate::lyrics::types::{LyricsError, ProviderResult};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub use file::read_transcript_file;
pub use gemini::fetch_transcript_from_gemini;
pub use lrclib::fetch_transcript_from_lrclib;

/// Transcript sources, tried in the configured order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Lrclib,
    File,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Lrclib => "lrclib",
            Provider::File => "file",
        }
    }
}

/// A provider name that matches no known source.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "lrclib" => Ok(Provider::Lrclib),
            "file" => Ok(Provider::File),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Settings shared by all providers.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub lyrics_file: Option<PathBuf>,
}

/// Fetch a raw transcript from one provider.
pub async fn fetch_transcript(
    provider: Provider,
    settings: &ProviderSettings,
    artist: &str,
    title: &str,
) -> ProviderResult {
    match provider {
        Provider::Gemini => {
            let Some(key) = settings.api_key.as_deref().filter(|k| !k.is_empty()) else {
                return Err(LyricsError::NotConfigured("gemini"));
            };
            fetch_transcript_from_gemini(key, &settings.model, artist, title).await
        }
        Provider::Lrclib => fetch_transcript_from_lrclib(artist, title).await,
        Provider::File => match &settings.lyrics_file {
            Some(path) => read_transcript_file(path).await,
            None => Err(LyricsError::NotConfigured("file")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_round_trip() {
        for p in [Provider::Gemini, Provider::Lrclib, Provider::File] {
            assert_eq!(p.name().parse::<Provider>().unwrap(), p);
        }
        assert_eq!(" LRCLIB ".parse::<Provider>().unwrap(), Provider::Lrclib);
        assert_eq!(
            "Spotify".parse::<Provider>(),
            Err(UnknownProvider("spotify".into()))
        );
        assert_eq!(
            UnknownProvider("spotify".into()).to_string(),
            "unknown provider: spotify"
        );
    }

    #[tokio::test]
    async fn unconfigured_providers_are_reported() {
        let settings = ProviderSettings::default();
        let err = fetch_transcript(Provider::Gemini, &settings, "a", "t")
            .await
            .unwrap_err();
        assert!(matches!(err, LyricsError::NotConfigured("gemini")));
        let err = fetch_transcript(Provider::File, &settings, "a", "t")
            .await
            .unwrap_err();
        assert!(matches!(err, LyricsError::NotConfigured("file")));
    }
}
