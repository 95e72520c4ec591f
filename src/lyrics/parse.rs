use crate::lyrics::types::{LyricLine, Transcript};
use once_cell::sync::Lazy;
use regex::Regex;

/// Marker a provider may put in front of an untimed transcript.
pub const PLAIN_TEXT_MARKER: &str = "PLAIN_TEXT:";

/// Substituted when a transcript carries no text at all.
pub const LYRICS_UNAVAILABLE: &str = "Lyrics unavailable.";

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d{2,}):(\d{2})\.(\d{2,3})\]").expect("timestamp regex is valid")
});

/// Parse a raw LRC-style transcript.
///
/// Each line contributes at most one `LyricLine`, keyed by the first
/// `[MM:SS.ff]` / `[MM:SS.fff]` tag found in it. Lines without a tag, or whose
/// text is empty once the tag is removed, are skipped. When no timed line
/// survives, the whole input is returned as `Transcript::Unsynced` so untagged
/// text is still shown.
pub fn parse_transcript(raw: &str) -> Transcript {
    let mut lines = Vec::new();

    for line in raw.lines() {
        let Some(cap) = TIMESTAMP_RE.captures(line) else {
            continue;
        };
        let Some(time) = time_from_captures(&cap) else {
            continue;
        };
        let text = TIMESTAMP_RE.replacen(line, 1, "");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        lines.push(LyricLine::new(time, text));
    }

    if lines.is_empty() {
        let plain = strip_plain_marker(raw.trim()).trim();
        if plain.is_empty() {
            return Transcript::Unsynced(LYRICS_UNAVAILABLE.to_string());
        }
        return Transcript::Unsynced(plain.to_string());
    }

    // `sort_by` is stable, so equal timestamps keep their source order.
    lines.sort_by(|a, b| a.time.total_cmp(&b.time));
    Transcript::Synced(lines)
}

/// Parse a single `[MM:SS.xx]` tag (surrounding text is ignored) into seconds.
pub fn parse_timestamp(tag: &str) -> Option<f64> {
    TIMESTAMP_RE
        .captures(tag)
        .and_then(|cap| time_from_captures(&cap))
}

/// Remove a leading plain-text marker, if any.
pub fn strip_plain_marker(raw: &str) -> &str {
    raw.strip_prefix(PLAIN_TEXT_MARKER).unwrap_or(raw)
}

fn time_from_captures(cap: &regex::Captures<'_>) -> Option<f64> {
    let minutes: u64 = cap.get(1)?.as_str().parse().ok()?;
    let seconds: u64 = cap.get(2)?.as_str().parse().ok()?;
    // The fraction is a decimal fraction: ".45" is 450 ms, not 45 ms.
    let frac = cap.get(3)?.as_str();
    let millis: u64 = format!("{:0<3}", frac).parse().ok()?;
    let total_ms = minutes.checked_mul(60_000)?.checked_add(seconds * 1000 + millis)?;
    // Dividing the exact millisecond count keeps e.g. 125450 ms == 125.45.
    Some(total_ms as f64 / 1000.0)
}

/// Render timed lines back into LRC text, one `[mm:ss.cc] text` per line.
/// Times with millisecond precision get a three-digit fraction.
pub fn to_lrc(lines: &[LyricLine]) -> String {
    let mut out = String::new();
    for line in lines {
        let ms = (line.time.max(0.0) * 1000.0).round() as u64;
        let minutes = ms / 60_000;
        let seconds = (ms % 60_000) / 1000;
        let frac = ms % 1000;
        let tag = if frac % 10 == 0 {
            format!("[{:02}:{:02}.{:02}]", minutes, seconds, frac / 10)
        } else {
            format!("[{:02}:{:02}.{:03}]", minutes, seconds, frac)
        };
        out.push_str(&format!("{} {}\n", tag, line.text));
    }
    out
}
