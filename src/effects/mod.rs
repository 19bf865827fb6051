//! Concrete effects built on the engine.
//!
//! Each effect scripts scenes and paths onto the characters of a
//! [`Terminal`], then yields frames as an [`Iterator`] driven by its own
//! phase state machine. [`EffectKind`] is the registry the CLI resolves
//! effect names through.

pub mod decrypt;
pub mod rings;
pub mod scattered;
pub mod verticalslice;

pub use decrypt::{Decrypt, DecryptConfig};
pub use rings::{Rings, RingsConfig};
pub use scattered::{Scattered, ScatteredConfig};
pub use verticalslice::{VerticalSlice, VerticalSliceConfig};

use serde::de::DeserializeOwned;

use crate::engine::terminal::Terminal;
use crate::error::{EngineError, EngineResult};
use crate::gradient::{Gradient, GradientDirection};
use crate::types::Color;

/// A running effect: one composed canvas per item.
pub type Frames = Box<dyn Iterator<Item = String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Decrypt,
    Rings,
    Scattered,
    VerticalSlice,
}

impl EffectKind {
    pub const ALL: [EffectKind; 4] = [
        EffectKind::Decrypt,
        EffectKind::Rings,
        EffectKind::Scattered,
        EffectKind::VerticalSlice,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Decrypt => "decrypt",
            EffectKind::Rings => "rings",
            EffectKind::Scattered => "scattered",
            EffectKind::VerticalSlice => "verticalslice",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            EffectKind::Decrypt => "Movie style text decryption.",
            EffectKind::Rings => "Characters are dispersed and form into spinning rings.",
            EffectKind::Scattered => "Move the characters into place from random starting locations.",
            EffectKind::VerticalSlice => {
                "Slice the input in half vertically and slide it into place from opposite directions."
            }
        }
    }

    /// Build the effect over `terminal`. `config` is the effect's JSON
    /// config object; missing fields take their defaults.
    pub fn build(self, terminal: Terminal, config: Option<serde_json::Value>) -> EngineResult<Frames> {
        Ok(match self {
            EffectKind::Decrypt => Box::new(Decrypt::new(terminal, parse_config(config)?)?),
            EffectKind::Rings => Box::new(Rings::new(terminal, parse_config(config)?)?),
            EffectKind::Scattered => Box::new(Scattered::new(terminal, parse_config(config)?)?),
            EffectKind::VerticalSlice => {
                Box::new(VerticalSlice::new(terminal, parse_config(config)?)?)
            }
        })
    }
}

fn parse_config<T: DeserializeOwned + Default>(value: Option<serde_json::Value>) -> EngineResult<T> {
    match value {
        None => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| EngineError::InvalidConfig {
            message: e.to_string(),
        }),
    }
}

/// Colour of every character, indexed by id, taken from a gradient laid
/// across the canvas at the character's input coordinate.
fn final_colors(
    terminal: &Terminal,
    stops: &[Color],
    steps: usize,
    direction: GradientDirection,
) -> EngineResult<Vec<Color>> {
    let gradient = Gradient::new(stops, steps)?;
    let canvas = terminal.canvas();
    let mapping = gradient.build_coordinate_color_mapping(canvas.top(), canvas.right(), direction);
    Ok(terminal
        .characters()
        .iter()
        .map(|c| {
            mapping
                .get(&c.input_coord())
                .copied()
                .unwrap_or_else(|| gradient.color_at_fraction(1.0))
        })
        .collect())
}
