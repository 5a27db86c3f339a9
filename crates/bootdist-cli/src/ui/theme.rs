//! Status glyphs and size formatting

use crossterm::style::{Color, StyledContent, Stylize};

/// An icon and the color it is printed in.
#[derive(Debug, Clone, Copy)]
pub struct Glyph {
    pub icon: &'static str,
    pub color: Color,
}

impl Glyph {
    const fn new(icon: &'static str, color: Color) -> Self {
        Self { icon, color }
    }

    pub fn styled(self) -> StyledContent<&'static str> {
        self.icon.with(self.color)
    }
}

/// Glyphs for each kind of reporter line.
#[derive(Debug, Clone)]
pub struct Theme {
    pub section: Glyph,
    pub produced: Glyph,
    pub info: Glyph,
    pub success: Glyph,
    pub warning: Glyph,
    /// Color of secondary detail such as sizes.
    pub muted: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            section: Glyph::new("●", Color::Cyan),
            produced: Glyph::new("+", Color::Green),
            info: Glyph::new("ℹ", Color::DarkGrey),
            success: Glyph::new("✓", Color::Green),
            warning: Glyph::new("⚠", Color::Yellow),
            muted: Color::DarkGrey,
        }
    }
}

/// Human-readable byte count, one decimal above 1 KiB.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
        assert_eq!(format_size(2048 * 1024 * 1024 * 1024), "2048.0 GB");
    }
}
