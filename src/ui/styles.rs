use ratatui::style::{Color, Modifier, Style};

pub struct LyricStyles {
    pub before: Style,
    pub current: Style,
    pub after: Style,
    pub status: Style,
    pub error: Style,
}

impl LyricStyles {
    /// High-contrast palette for reading at a glance: a bright current line,
    /// everything else dimmed.
    pub fn car() -> Self {
        Self {
            before: Style::default().fg(Color::DarkGray),
            current: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            after: Style::default().fg(Color::DarkGray),
            status: Style::default().fg(Color::DarkGray),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        }
    }

    pub fn for_mode(car: bool) -> Self {
        if car { Self::car() } else { Self::default() }
    }
}

impl Default for LyricStyles {
    fn default() -> Self {
        Self {
            before: Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
            current: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            after: Style::default(),
            status: Style::default().add_modifier(Modifier::DIM),
            error: Style::default().fg(Color::Red),
        }
    }
}
