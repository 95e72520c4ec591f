use crate::lyrics::LyricLine;
use crate::state::Update;
use crate::text_utils::{wrap_paragraphs, wrap_text};
use crate::ui::styles::LyricStyles;
use crate::ui::util::format_progress;
use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use std::error::Error;

/// Shown in place of the current line before the first lyric starts.
pub const INTRO_MARKER: &str = "\u{266a}";

/// Context lines kept around the current lyric in car mode.
pub const CAR_CONTEXT_LINES: usize = 2;

/// Wrapped lyric blocks cached per terminal width.
pub type WrappedCache = Option<(usize, Vec<Vec<String>>)>;

/// Draw the UI: lyrics (or a message) centered, status line at the bottom.
///
/// `scroll` is the first row of a message taller than the screen; it is
/// clamped here. `status_override` (a prompt or toast) replaces the status line.
pub fn draw_ui_with_cache<B: Backend>(
    terminal: &mut Terminal<B>,
    update: &Option<Update>,
    wrapped_cache: &mut WrappedCache,
    scroll: &mut usize,
    styles: &LyricStyles,
    car_mode: bool,
    status_override: Option<&str>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    terminal
        .draw(|f| {
            let [body, status] =
                Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(f.area());
            let w = body.width as usize;
            let h = body.height as usize;

            let visible = match update {
                Some(upd) => match message_lines(upd, w, styles) {
                    Some(lines) => scroll_window(lines, h, scroll),
                    None => {
                        let blocks = cached_blocks(wrapped_cache, &upd.lines, w);
                        let limit = if car_mode {
                            visible_height_for_car(blocks, upd.index, h)
                        } else {
                            h
                        };
                        gather_visible_lines(upd.index, blocks, limit, styles).into_vec()
                    }
                },
                None => Vec::new(),
            };

            let top_padding = h.saturating_sub(visible.len()) / 2;
            let render_area = Rect {
                x: body.x,
                y: body.y + top_padding as u16,
                width: body.width,
                height: (visible.len() as u16).min(body.height),
            };
            f.render_widget(
                Paragraph::new(visible).alignment(Alignment::Center),
                render_area,
            );

            let status_text = match (status_override, update) {
                (Some(t), _) => t.to_string(),
                (None, Some(upd)) => status_line(upd),
                (None, None) => String::new(),
            };
            f.render_widget(
                Paragraph::new(Line::styled(status_text, styles.status))
                    .alignment(Alignment::Center),
                status,
            );
        })
        .map_err(|e| Box::new(e) as Box<dyn Error + Send + Sync>)?;
    Ok(())
}

/// Wrap lyric lines for the given width, reusing the cache when it fits.
fn cached_blocks<'c>(
    cache: &'c mut WrappedCache,
    lines: &[LyricLine],
    w: usize,
) -> &'c [Vec<String>] {
    let stale = !matches!(
        cache,
        Some((width, blocks)) if *width == w && blocks.len() == lines.len()
    );
    if stale {
        let blocks = lines.iter().map(|l| wrap_text(&l.text, w)).collect();
        *cache = Some((w, blocks));
    }
    cache.as_ref().map(|(_, b)| b.as_slice()).unwrap_or(&[])
}

/// The `h` rows of `lines` starting at `*scroll`. The offset is clamped so the
/// last row never rises above the bottom of the screen.
pub fn scroll_window<'a>(lines: Vec<Line<'a>>, h: usize, scroll: &mut usize) -> Vec<Line<'a>> {
    *scroll = (*scroll).min(lines.len().saturating_sub(h));
    lines.into_iter().skip(*scroll).take(h).collect()
}

/// Height budget in car mode: the current block plus a few lines of context.
fn visible_height_for_car(blocks: &[Vec<String>], index: Option<usize>, h: usize) -> usize {
    let current = index.and_then(|i| blocks.get(i)).map_or(1, Vec::len);
    (current + 2 * CAR_CONTEXT_LINES).min(h)
}

/// Status line: `title - artist   mm:ss / mm:ss   [playing]`.
pub fn status_line(upd: &Update) -> String {
    if upd.title.is_empty() {
        return String::new();
    }
    let state = if upd.playing { "\u{25b6}" } else { "\u{23f8}" };
    format!(
        "{} - {}   {}   {}",
        upd.title,
        upd.artist,
        format_progress(upd.position, upd.duration),
        state
    )
}

/// Non-lyric content: errors, loading, unsynced text, or the idle prompt.
/// `None` means the synced lyric view should be drawn.
pub fn message_lines<'a>(upd: &Update, w: usize, styles: &LyricStyles) -> Option<Vec<Line<'a>>> {
    let styled = |text: &str, style: Style| -> Vec<Line<'a>> {
        wrap_paragraphs(text, w)
            .into_iter()
            .map(|l| Line::from(Span::styled(l, style)))
            .collect()
    };

    if let Some(err) = &upd.err {
        return Some(styled(err, styles.error));
    }
    if upd.loading {
        return Some(styled("Searching for lyrics\u{2026}", styles.status));
    }
    if let Some(text) = &upd.unsynced {
        let mut lines = styled(&format!("{} - {}", upd.title, upd.artist), styles.current);
        lines.push(Line::from(""));
        lines.extend(styled(text, styles.after));
        return Some(lines);
    }
    if upd.lines.is_empty() {
        return Some(styled(
            "Waiting for a song. Press / to search.",
            styles.status,
        ));
    }
    None
}

/// A collection of styled text lines ready for rendering.
pub struct VisibleLines<'a> {
    pub before: Vec<Line<'a>>,
    pub current: Vec<Line<'a>>,
    pub after: Vec<Line<'a>>,
}

impl<'a> VisibleLines<'a> {
    pub fn into_vec(self) -> Vec<Line<'a>> {
        [self.before, self.current, self.after].concat()
    }
}

/// Collects the styled lines that should appear *before* block `end`.
pub fn collect_before_lines<'a>(
    end: usize,
    wrapped_blocks: &[Vec<String>],
    mut lines_needed: usize,
    style: Style,
) -> Vec<Line<'a>> {
    let mut before = Vec::new();
    let mut i = end;
    while i > 0 && lines_needed > 0 {
        i -= 1;
        let block = &wrapped_blocks[i];
        let take = block.len().min(lines_needed);
        let start = block.len() - take;
        let lines = block[start..]
            .iter()
            .map(|line| Line::from(Span::styled(line.clone(), style)));
        before.splice(0..0, lines);
        lines_needed -= take;
    }
    before
}

/// Collects the styled lines starting at block `start`.
pub fn collect_after_lines<'a>(
    start: usize,
    wrapped_blocks: &[Vec<String>],
    mut lines_needed: usize,
    style: Style,
) -> Vec<Line<'a>> {
    let mut after = Vec::new();
    let mut j = start;
    while j < wrapped_blocks.len() && lines_needed > 0 {
        let block = &wrapped_blocks[j];
        let take = block.len().min(lines_needed);
        after.extend(
            block[..take]
                .iter()
                .map(|line| Line::from(Span::styled(line.clone(), style))),
        );
        lines_needed -= take;
        j += 1;
    }
    after
}

/// Pick the lines around the current lyric that fit in `h` rows. Before the
/// first line starts, an intro marker takes the current slot.
pub fn gather_visible_lines<'a>(
    index: Option<usize>,
    wrapped_blocks: &[Vec<String>],
    h: usize,
    styles: &LyricStyles,
) -> VisibleLines<'a> {
    let active = index.and_then(|i| wrapped_blocks.get(i).map(|b| (i, b)));
    let (current_block, after_start) = match active {
        Some((i, block)) => (block.clone(), i + 1),
        None => (vec![INTRO_MARKER.to_string()], 0),
    };
    let before_end = index.unwrap_or(0);

    let current: Vec<Line<'a>> = current_block
        .iter()
        .map(|line| Line::from(Span::styled(line.clone(), styles.current)))
        .collect();

    if current.len() >= h {
        return VisibleLines {
            before: Vec::new(),
            current: current.into_iter().take(h.max(1)).collect(),
            after: Vec::new(),
        };
    }

    let context_lines = h - current.len();
    let lines_needed_before = context_lines / 2;
    let lines_needed_after = context_lines - lines_needed_before;

    VisibleLines {
        before: collect_before_lines(
            before_end,
            wrapped_blocks,
            lines_needed_before,
            styles.before,
        ),
        current,
        after: collect_after_lines(after_start, wrapped_blocks, lines_needed_after, styles.after),
    }
}
