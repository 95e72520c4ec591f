//! Small formatting helpers shared by the display surfaces.

/// Trait for types that identify a track, used to detect song changes.
pub trait AsTrackId {
    /// Returns (artist, title).
    fn as_track_id(&self) -> (String, String);
}

impl AsTrackId for crate::state::Update {
    fn as_track_id(&self) -> (String, String) {
        (self.artist.clone(), self.title.clone())
    }
}

pub fn track_id<T: AsTrackId>(t: &T) -> (String, String) {
    t.as_track_id()
}

/// `mm:ss`, truncating fractional seconds. Bad input renders as `00:00`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// `position / duration` status text.
pub fn format_progress(position: f64, duration: f64) -> String {
    format!("{} / {}", format_time(position), format_time(duration))
}
