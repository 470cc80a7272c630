use std::fmt::Display;

use console::{style, Color, StyledObject};

type Styled = StyledObject<String>;

/// Shade of a value that reports progress or an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Pending,
    Done,
    Failed,
}

impl Tone {
    pub fn from_ok(ok: bool) -> Self {
        if ok {
            Self::Done
        } else {
            Self::Failed
        }
    }

    fn color(self) -> Color {
        match self {
            Self::Pending => Color::Yellow,
            Self::Done => Color::Green,
            Self::Failed => Color::Red,
        }
    }
}

fn paint(text: impl Display) -> Styled {
    style(text.to_string())
}

pub fn toned(text: impl Display, tone: Tone) -> Styled {
    paint(text).fg(tone.color()).bright()
}

/// Field names in front of a value.
pub fn label(text: impl Display) -> Styled {
    paint(text).dim()
}

pub fn emphasis(text: impl Display) -> Styled {
    paint(text).bright()
}

pub fn accent(text: impl Display) -> Styled {
    paint(text).cyan()
}

pub fn title(text: impl Display) -> Styled {
    paint(text).magenta().bold()
}
