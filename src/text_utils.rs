// src/text_utils.rs
// Text layout helpers for the terminal views

/// Wrap text to a given width, breaking at word boundaries.
///
/// Words longer than the width are split. Blank input yields one empty line
/// so a lyric block never collapses to zero rows.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let lines: Vec<String> = textwrap::wrap(text.trim(), width)
        .into_iter()
        .map(|l| l.into_owned())
        .collect();
    if lines.is_empty() {
        vec![String::new()]
    } else {
        lines
    }
}

/// Wrap every paragraph of a multi-line text, keeping blank lines.
pub fn wrap_paragraphs(text: &str, width: usize) -> Vec<String> {
    text.lines().flat_map(|line| wrap_text(line, width)).collect()
}
