//! Bounded pool of display colors handed out to live tracks.
//!
//! Colors are drawn from the head of a FIFO queue and returned to its tail,
//! so a freshly released color is the last one to be reused.

use crate::error::TrackError;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/*----------------------------------------------------------------------------
Color
----------------------------------------------------------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLUE: Color = Color::rgb(0x00, 0x00, 0xFF);
    pub const RED: Color = Color::rgb(0xFF, 0x00, 0x00);
    pub const GREEN: Color = Color::rgb(0x00, 0xFF, 0x00);
    pub const YELLOW: Color = Color::rgb(0xFF, 0xFF, 0x00);
    pub const CYAN: Color = Color::rgb(0x00, 0xFF, 0xFF);
    pub const MAGENTA: Color = Color::rgb(0xFF, 0x00, 0xFF);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = TrackError;

    /// Parses `#RRGGBB` (the leading `#` is optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TrackError::InvalidPalette(format!(
                "expected #RRGGBB, got {s:?}"
            )));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| {
                TrackError::InvalidPalette(format!("{s:?}: {e}"))
            })
        };
        Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = TrackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

pub const DEFAULT_COLORS: [Color; 15] = [
    Color::BLUE,
    Color::RED,
    Color::GREEN,
    Color::YELLOW,
    Color::CYAN,
    Color::MAGENTA,
    Color::WHITE,
    Color::rgb(0x55, 0xFF, 0x55),
    Color::rgb(0xFF, 0xA5, 0x00),
    Color::rgb(0xFF, 0x88, 0x88),
    Color::rgb(0xAA, 0xAA, 0xFF),
    Color::rgb(0xFF, 0xFF, 0xAA),
    Color::rgb(0x55, 0xAA, 0xAA),
    Color::rgb(0xAA, 0x33, 0xAA),
    Color::rgb(0x0D, 0x00, 0x68),
];

/*----------------------------------------------------------------------------
ColorPalette
----------------------------------------------------------------------------*/

#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<Color>,
    available: VecDeque<Color>,
}

impl ColorPalette {
    /// Create a palette with every color available, in the given order.
    ///
    /// Fails when `colors` is empty or contains duplicates, since either
    /// would break the one-color-per-live-track guarantee.
    pub fn new(colors: &[Color]) -> Result<Self, TrackError> {
        if colors.is_empty() {
            return Err(TrackError::InvalidPalette(
                "palette must hold at least one color".to_string(),
            ));
        }
        for (i, color) in colors.iter().enumerate() {
            if colors[..i].contains(color) {
                return Err(TrackError::InvalidPalette(format!(
                    "duplicate color {color}"
                )));
            }
        }

        Ok(Self {
            colors: colors.to_vec(),
            available: colors.iter().copied().collect(),
        })
    }

    /// Number of colors, i.e. the maximum number of live tracks.
    pub fn capacity(&self) -> usize {
        self.colors.len()
    }

    pub fn available(&self) -> usize {
        self.available.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.available.is_empty()
    }

    pub fn is_available(&self, color: &Color) -> bool {
        self.available.contains(color)
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Take the next free color, or `None` when every color is assigned.
    pub fn acquire(&mut self) -> Option<Color> {
        self.available.pop_front()
    }

    /// Hand a color back to the pool.
    pub fn release(&mut self, color: Color) -> Result<(), TrackError> {
        if !self.colors.contains(&color) {
            return Err(TrackError::ForeignColor(color));
        }
        if self.available.contains(&color) {
            return Err(TrackError::DoubleRelease(color));
        }
        self.available.push_back(color);
        Ok(())
    }

    /// Mark every color available again, in palette order.
    pub fn reset(&mut self) {
        self.available = self.colors.iter().copied().collect();
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.to_vec(),
            available: DEFAULT_COLORS.iter().copied().collect(),
        }
    }
}
