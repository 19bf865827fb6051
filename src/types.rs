//! Shared value types for the text effect engine.
//!
//! This module defines the appearance primitives that flow between the
//! engine and the renderer:
//! - `Color` / `NamedColor`: what an effect author configures
//! - `GraphicalEffect`: the terminal modes + colour a character is drawn with
//! - `Cell`: one slot of the composed canvas

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Colours
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Named(NamedColor),
    /// xterm-256 palette index.
    Ansi(u8),
    Rgb { r: u8, g: u8, b: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl NamedColor {
    fn rgb(self) -> (u8, u8, u8) {
        match self {
            NamedColor::Black => (0, 0, 0),
            NamedColor::Red => (205, 0, 0),
            NamedColor::Green => (0, 205, 0),
            NamedColor::Yellow => (205, 205, 0),
            NamedColor::Blue => (0, 0, 238),
            NamedColor::Magenta => (205, 0, 205),
            NamedColor::Cyan => (0, 205, 205),
            NamedColor::White => (229, 229, 229),
        }
    }
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb { r, g, b }
    }

    /// Resolve to an RGB triple. Palette indices follow the standard xterm
    /// layout: 16 system colours, a 6x6x6 cube, then a 24 step grey ramp.
    pub fn to_rgb(self) -> (u8, u8, u8) {
        match self {
            Color::Rgb { r, g, b } => (r, g, b),
            Color::Named(named) => named.rgb(),
            Color::Ansi(index) => ansi_to_rgb(index),
        }
    }
}

fn ansi_to_rgb(index: u8) -> (u8, u8, u8) {
    const SYSTEM: [(u8, u8, u8); 16] = [
        (0, 0, 0),
        (205, 0, 0),
        (0, 205, 0),
        (205, 205, 0),
        (0, 0, 238),
        (205, 0, 205),
        (0, 205, 205),
        (229, 229, 229),
        (127, 127, 127),
        (255, 0, 0),
        (0, 255, 0),
        (255, 255, 0),
        (92, 92, 255),
        (255, 0, 255),
        (0, 255, 255),
        (255, 255, 255),
    ];
    match index {
        0..=15 => SYSTEM[index as usize],
        16..=231 => {
            let i = index - 16;
            let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            (level(i / 36), level((i / 6) % 6), level(i % 6))
        }
        _ => {
            let v = 8 + (index - 232) * 10;
            (v, v, v)
        }
    }
}

// ---------------------------------------------------------------------------
// Graphical effect
// ---------------------------------------------------------------------------

fn is_false(b: &bool) -> bool {
    !*b
}

/// Terminal graphic modes plus an optional foreground colour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphicalEffect {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub dim: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub blink: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reverse: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strike: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl GraphicalEffect {
    pub fn with_color(color: Color) -> Self {
        GraphicalEffect {
            color: Some(color),
            ..Default::default()
        }
    }

    pub fn disable_modes(&mut self) {
        let color = self.color.take();
        *self = GraphicalEffect {
            color,
            ..Default::default()
        };
    }

    pub fn is_default(&self) -> bool {
        *self == GraphicalEffect::default()
    }
}

// ---------------------------------------------------------------------------
// Canvas cell
// ---------------------------------------------------------------------------

/// One column of a composed frame. A wide symbol owns the cell it was drawn
/// at; the column to its right holds an empty continuation symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub symbol: String,
    pub effect: GraphicalEffect,
}

impl Cell {
    pub fn continuation(effect: GraphicalEffect) -> Self {
        Cell {
            symbol: String::new(),
            effect,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.symbol == " " && self.effect.is_default()
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            symbol: " ".to_string(),
            effect: GraphicalEffect::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_cube_and_grey_ramp() {
        assert_eq!(Color::Ansi(16).to_rgb(), (0, 0, 0));
        assert_eq!(Color::Ansi(231).to_rgb(), (255, 255, 255));
        assert_eq!(Color::Ansi(232).to_rgb(), (8, 8, 8));
        assert_eq!(Color::Ansi(9).to_rgb(), (255, 0, 0));
    }

    #[test]
    fn test_color_deserializes_all_forms() {
        let colors: Vec<Color> =
            serde_json::from_str(r#"["cyan", 34, {"r": 1, "g": 2, "b": 3}]"#).unwrap();
        assert_eq!(
            colors,
            vec![
                Color::Named(NamedColor::Cyan),
                Color::Ansi(34),
                Color::rgb(1, 2, 3)
            ]
        );
    }

    #[test]
    fn test_disable_modes_keeps_color() {
        let mut effect = GraphicalEffect {
            bold: true,
            strike: true,
            color: Some(Color::Ansi(3)),
            ..Default::default()
        };
        effect.disable_modes();
        assert_eq!(effect, GraphicalEffect::with_color(Color::Ansi(3)));
    }

    #[test]
    fn test_default_cell_is_blank() {
        assert!(Cell::default().is_blank());
        assert!(!Cell::continuation(GraphicalEffect::default()).is_blank());
    }
}
