use serde::Serialize;
use serde_json::Value;

use crate::lyrics::types::{http_client, LyricsError, ProviderResult};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Ask the generative-text API for an LRC transcript of the song.
///
/// The model is instructed to answer with `[mm:ss.xx] text` lines, or with
/// plain lyrics behind the `PLAIN_TEXT:` marker when it has no timing. Its
/// answer is returned verbatim; classification is the parser's job.
pub async fn fetch_transcript_from_gemini(
    api_key: &str,
    model: &str,
    artist: &str,
    title: &str,
) -> ProviderResult {
    let model = if model.is_empty() { DEFAULT_MODEL } else { model };
    let url = format!(
        "{}/{}:generateContent?key={}",
        API_BASE,
        urlencoding::encode(model),
        urlencoding::encode(api_key)
    );
    let prompt = build_prompt(title, artist);
    let body = GenerateRequest {
        contents: vec![Content {
            parts: vec![Part { text: &prompt }],
        }],
    };

    tracing::debug!(model, artist, title, "Requesting transcript from gemini");
    let resp = http_client().post(&url).json(&body).send().await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let detail = resp
            .json::<Value>()
            .await
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_default();
        return Err(LyricsError::Api(format!("gemini: HTTP {} {}", status, detail)));
    }

    let json: Value = resp.json().await?;
    Ok(extract_text(&json))
}

/// Prompt asking for LRC with a plain-text fallback.
pub fn build_prompt(title: &str, artist: &str) -> String {
    format!(
        "Generate synchronized lyrics in LRC format for the song \"{title}\" by \"{artist}\".\n\
         The format for each line must be exactly [mm:ss.xx] followed by the lyric text.\n\
         For example: [00:23.45] This is a sample lyric line.\n\n\
         If you cannot find synchronized lyrics, provide the full plain text lyrics \
         without any timestamps.\n\
         Start the plain text with a marker like \"PLAIN_TEXT:\"."
    )
}

/// Concatenate the text parts of the first candidate.
fn extract_text(json: &Value) -> Option<String> {
    let parts = json.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.trim().is_empty() { None } else { Some(text) }
}
