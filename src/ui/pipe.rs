use crate::state::Update;
use std::io::Write;
use tokio::sync::mpsc;

/// Whether pipe mode keeps reading updates.
#[derive(Debug, PartialEq)]
enum PipeStep {
    Continue,
    Done,
}

/// Tracks what has been printed so every line change prints exactly once.
#[derive(Default)]
struct PipeState {
    last_track_id: Option<(String, String)>,
    last_line_idx: Option<usize>,
    printed_unsynced: bool,
}

impl PipeState {
    /// Write whatever `upd` adds to the output.
    fn handle<W: Write>(
        &mut self,
        upd: &Update,
        out: &mut W,
    ) -> Result<PipeStep, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(err) = &upd.err {
            return Err(err.clone().into());
        }

        let track_id = crate::ui::track_id(upd);
        if self.last_track_id.as_ref() != Some(&track_id) {
            self.last_track_id = Some(track_id);
            self.last_line_idx = None;
            self.printed_unsynced = false;
        }

        if let Some(text) = &upd.unsynced {
            if !self.printed_unsynced {
                writeln!(out, "{}", text)?;
                self.printed_unsynced = true;
            }
            return Ok(PipeStep::Done);
        }

        if upd.index != self.last_line_idx {
            if let Some(line) = upd.current_text() {
                writeln!(out, "{}", line)?;
                out.flush()?;
            }
            self.last_line_idx = upd.index;
        }

        let finished = !upd.lines.is_empty()
            && !upd.playing
            && upd.duration > 0.0
            && upd.position >= upd.duration;
        Ok(if finished { PipeStep::Done } else { PipeStep::Continue })
    }
}

/// Print lyric lines to stdout as they become current (for scripting).
/// Returns once the song ends or the session stops; fetch errors are returned.
pub async fn display_lyrics_pipe(
    mut rx: mpsc::Receiver<Update>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut state = PipeState::default();
    let mut stdout = std::io::stdout();
    while let Some(upd) = rx.recv().await {
        if state.handle(&upd, &mut stdout)? == PipeStep::Done {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::LyricLine;
    use std::sync::Arc;

    fn update(
        lines: &Arc<Vec<LyricLine>>,
        index: Option<usize>,
        position: f64,
        playing: bool,
    ) -> Update {
        Update {
            lines: lines.clone(),
            index,
            position,
            duration: 7.0,
            playing,
            title: "T".into(),
            artist: "A".into(),
            ..Default::default()
        }
    }

    #[test]
    fn prints_each_line_once() {
        let lines = Arc::new(vec![LyricLine::new(1.0, "one"), LyricLine::new(2.0, "two")]);
        let mut state = PipeState::default();
        let mut out = Vec::new();
        for (idx, pos) in [(None, 0.0), (Some(0), 1.0), (Some(0), 1.5), (Some(1), 2.0)] {
            assert_eq!(
                state.handle(&update(&lines, idx, pos, true), &mut out).unwrap(),
                PipeStep::Continue
            );
        }
        let step = state.handle(&update(&lines, Some(1), 7.0, false), &mut out).unwrap();
        assert_eq!(step, PipeStep::Done);
        assert_eq!(String::from_utf8(out).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn unsynced_text_prints_and_finishes() {
        let mut state = PipeState::default();
        let mut out = Vec::new();
        let upd = Update {
            unsynced: Some("plain words".into()),
            ..Default::default()
        };
        assert_eq!(state.handle(&upd, &mut out).unwrap(), PipeStep::Done);
        assert_eq!(String::from_utf8(out).unwrap(), "plain words\n");
    }

    #[test]
    fn errors_stop_pipe_mode() {
        let mut state = PipeState::default();
        let upd = Update {
            err: Some("Could not fetch lyrics".into()),
            ..Default::default()
        };
        let err = state.handle(&upd, &mut Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "Could not fetch lyrics");
    }
}
