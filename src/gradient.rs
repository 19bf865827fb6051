//! Colour gradients.
//!
//! A gradient is a precomputed spectrum of RGB colours: `steps` colours
//! between each pair of stops plus the final stop. Effects index into the
//! spectrum by fraction or map it across the canvas.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::geometry::{find_length_of_line, Coord};
use crate::types::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientDirection {
    #[default]
    Vertical,
    Horizontal,
    Diagonal,
    Radial,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    spectrum: Vec<Color>,
}

impl Gradient {
    pub fn new(stops: &[Color], steps: usize) -> EngineResult<Self> {
        if stops.is_empty() || steps == 0 {
            return Err(EngineError::EmptyGradient);
        }
        if stops.len() == 1 {
            return Ok(Gradient {
                spectrum: vec![stops[0]],
            });
        }

        let mut spectrum = Vec::with_capacity((stops.len() - 1) * steps + 1);
        for pair in stops.windows(2) {
            let (start, end) = (pair[0].to_rgb(), pair[1].to_rgb());
            for step in 0..steps {
                let t = step as f64 / steps as f64;
                spectrum.push(Color::rgb(
                    blend(start.0, end.0, t),
                    blend(start.1, end.1, t),
                    blend(start.2, end.2, t),
                ));
            }
        }
        let (r, g, b) = stops[stops.len() - 1].to_rgb();
        spectrum.push(Color::rgb(r, g, b));
        Ok(Gradient { spectrum })
    }

    pub fn spectrum(&self) -> &[Color] {
        &self.spectrum
    }

    /// Colour at `fraction` of the way through the spectrum.
    pub fn color_at_fraction(&self, fraction: f64) -> Color {
        let last = self.spectrum.len() - 1;
        let index = (fraction.clamp(0.0, 1.0) * last as f64).round() as usize;
        self.spectrum[index.min(last)]
    }

    /// Colour for every coordinate of a `right` x `top` canvas. Vertical
    /// gradients run bottom to top, horizontal ones left to right.
    pub fn build_coordinate_color_mapping(
        &self,
        top: i32,
        right: i32,
        direction: GradientDirection,
    ) -> HashMap<Coord, Color> {
        let top = top.max(1);
        let right = right.max(1);
        let fraction_of = |value: i32, max: i32| {
            if max <= 1 {
                1.0
            } else {
                (value - 1) as f64 / (max - 1) as f64
            }
        };
        let center = Coord::new(right / 2 + 1, top / 2 + 1);
        let max_distance = find_length_of_line(Coord::new(1, 1), center, true).max(1.0);

        let mut mapping = HashMap::with_capacity((top * right) as usize);
        for row in 1..=top {
            for column in 1..=right {
                let coord = Coord::new(column, row);
                let fraction = match direction {
                    GradientDirection::Vertical => fraction_of(row, top),
                    GradientDirection::Horizontal => fraction_of(column, right),
                    GradientDirection::Diagonal => fraction_of(row + column - 1, top + right - 1),
                    GradientDirection::Radial => {
                        find_length_of_line(coord, center, true) / max_distance
                    }
                };
                mapping.insert(coord, self.color_at_fraction(fraction));
            }
        }
        mapping
    }
}

fn blend(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}
