use colored::{Color, ColoredString, Colorize};

/// A parsed style string such as `"bold green"`, `"on red"` or `"italic #7b2f8e"`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextStyle {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
    pub reverse: bool,
    pub strikethrough: bool,
}

impl TextStyle {
    /// Parse a space separated style description
    ///
    /// Unknown words are ignored so a typo in the config degrades to plain text.
    pub fn parse(spec: &str) -> Self {
        let mut style = Self::default();
        let mut words = spec.split_whitespace();

        while let Some(word) = words.next() {
            match word.to_ascii_lowercase().as_str() {
                "bold" => style.bold = true,
                "dim" => style.dim = true,
                "italic" => style.italic = true,
                "underline" => style.underline = true,
                "reverse" => style.reverse = true,
                "strike" | "strikethrough" => style.strikethrough = true,
                "on" => style.bg = words.next().and_then(parse_color),
                other => {
                    if let Some(color) = parse_color(other) {
                        style.fg = Some(color);
                    }
                }
            }
        }

        style
    }

    /// Apply the style to a piece of text
    pub fn paint(&self, text: impl AsRef<str>) -> ColoredString {
        let mut out = text.as_ref().normal();
        if let Some(fg) = self.fg {
            out = out.color(fg);
        }
        if let Some(bg) = self.bg {
            out = out.on_color(bg);
        }
        if self.bold {
            out = out.bold();
        }
        if self.dim {
            out = out.dimmed();
        }
        if self.italic {
            out = out.italic();
        }
        if self.underline {
            out = out.underline();
        }
        if self.reverse {
            out = out.reversed();
        }
        if self.strikethrough {
            out = out.strikethrough();
        }
        out
    }
}

/// Shorthand for `TextStyle::parse(spec).paint(text)`
pub fn paint(spec: &str, text: impl AsRef<str>) -> ColoredString {
    TextStyle::parse(spec).paint(text)
}

/// Parse a colour name or `#rrggbb` hex value
pub fn parse_color(word: &str) -> Option<Color> {
    if let Some(hex) = word.strip_prefix('#') {
        return parse_hex(hex).map(|(r, g, b)| Color::TrueColor { r, g, b });
    }
    word.replace('_', " ").parse::<Color>().ok()
}

/// Parse `rrggbb` into its components
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}
