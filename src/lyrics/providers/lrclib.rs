use serde::Deserialize;

use crate::lyrics::parse::PLAIN_TEXT_MARKER;
use crate::lyrics::types::{http_client, LyricsError, ProviderResult};

#[derive(Deserialize)]
#[allow(non_snake_case)]
struct LrcLibResponse {
    syncedLyrics: Option<String>,
    plainLyrics: Option<String>,
    #[serde(default)]
    instrumental: bool,
}

/// Fetch a transcript from the lrclib.net community database.
///
/// Synced LRC is preferred; plain lyrics are returned behind the plain-text
/// marker so the parser classifies them as unsynced.
pub async fn fetch_transcript_from_lrclib(artist: &str, title: &str) -> ProviderResult {
    let url = build_lrclib_url(artist, title);

    let resp = http_client().get(&url).send().await?;

    // 404 means no lyrics found - not an error
    if resp.status().as_u16() == 404 {
        return Ok(None);
    }

    if !resp.status().is_success() {
        return Err(LyricsError::Api(format!("lrclib: HTTP {}", resp.status())));
    }

    let response: LrcLibResponse = resp.json().await?;
    Ok(transcript_from_response(response))
}

fn transcript_from_response(response: LrcLibResponse) -> Option<String> {
    if response.instrumental {
        return Some(format!("{} [Instrumental]", PLAIN_TEXT_MARKER));
    }
    match (response.syncedLyrics, response.plainLyrics) {
        (Some(synced), _) if !synced.trim().is_empty() => Some(synced),
        (_, Some(plain)) if !plain.trim().is_empty() => {
            Some(format!("{}\n{}", PLAIN_TEXT_MARKER, plain))
        }
        _ => None,
    }
}

/// Build lrclib API URL with query parameters.
fn build_lrclib_url(artist: &str, title: &str) -> String {
    format!(
        "https://lrclib.net/api/get?artist_name={}&track_name={}",
        urlencoding::encode(artist),
        urlencoding::encode(title)
    )
}
