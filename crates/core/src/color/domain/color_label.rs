use std::fmt;

/// Discrete color outcome. Renders lowercase so it slots into bin keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorLabel {
    White,
    Black,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Brown,
    Unknown,
}

impl ColorLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorLabel::White => "white",
            ColorLabel::Black => "black",
            ColorLabel::Red => "red",
            ColorLabel::Orange => "orange",
            ColorLabel::Yellow => "yellow",
            ColorLabel::Green => "green",
            ColorLabel::Blue => "blue",
            ColorLabel::Purple => "purple",
            ColorLabel::Brown => "brown",
            ColorLabel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
