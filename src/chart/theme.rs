#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::figure::{Backdrop, Color};

/// Read-only dashboard palette handed to the composer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct ChartTheme {
    pub background: Color,
    pub card: Color,
    pub text: Color,
    pub primary: Color,
    pub secondary: Color,
    pub success: Color,
    pub danger: Color,
    pub warning: Color,
    pub grid: Color,
    /// Colors cycled through by price overlays.
    pub overlay_palette: Vec<Color>,
}

impl Default for ChartTheme {
    fn default() -> Self {
        Self {
            background: Color::rgb(0x12, 0x12, 0x12),
            card: Color::rgb(0x1E, 0x1E, 0x1E),
            text: Color::rgb(0xE0, 0xE0, 0xE0),
            primary: Color::rgb(0x3B, 0x82, 0xF6),
            secondary: Color::rgb(0x6B, 0x72, 0x80),
            success: Color::rgb(0x10, 0xB9, 0x81),
            danger: Color::rgb(0xEF, 0x44, 0x44),
            warning: Color::rgb(0xF5, 0x9E, 0x0B),
            grid: Color::rgb(0xFF, 0xFF, 0xFF).with_alpha(0.1),
            overlay_palette: vec![
                Color::rgb(0xA7, 0x8B, 0xFA),
                Color::rgb(0x22, 0xD3, 0xEE),
                Color::rgb(0xF4, 0x72, 0xB6),
                Color::rgb(0xFA, 0xCC, 0x15),
            ],
        }
    }
}

impl ChartTheme {
    /// Sets the color of rising sessions.
    pub fn success(mut self, color: Color) -> Self {
        self.success = color;
        self
    }

    /// Sets the color of falling sessions.
    pub fn danger(mut self, color: Color) -> Self {
        self.danger = color;
        self
    }

    /// Sets the color of drawings and notices.
    pub fn warning(mut self, color: Color) -> Self {
        self.warning = color;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn overlay_palette(mut self, palette: Vec<Color>) -> Self {
        self.overlay_palette = palette;
        self
    }

    /// Overlay color for the `index`-th overlay, falling back to `primary`.
    pub fn overlay_color(&self, index: usize) -> Color {
        match self.overlay_palette.len() {
            0 => self.primary,
            len => self.overlay_palette[index % len],
        }
    }

    pub(crate) fn backdrop(&self) -> Backdrop {
        Backdrop {
            background: self.background,
            text: self.text,
            grid: self.grid,
        }
    }

    #[cfg(feature = "serde")]
    /// Reads a theme from a JSON file. Missing fields keep their default.
    pub fn from_file(filepath: std::path::PathBuf) -> crate::errors::Result<Self> {
        use crate::errors::Error;
        use std::{fs::File, io::BufReader};

        let file = File::open(filepath)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(Error::from)
    }
}
