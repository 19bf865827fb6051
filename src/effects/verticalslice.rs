//! Vertical slice: the input is cut down the middle. Left halves slide down
//! from the top of the canvas and right halves rise from the bottom, one
//! row pair per frame, pairing each row's left half with the right half of
//! the mirrored row.

use std::collections::VecDeque;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::easing::Easing;
use crate::engine::character::CharacterId;
use crate::engine::motion::PathId;
use crate::engine::terminal::Terminal;
use crate::engine::BaseEffectIterator;
use crate::error::{EngineError, EngineResult};
use crate::geometry::Coord;
use crate::gradient::Gradient;
use crate::types::{Color, GraphicalEffect};

const HOME: &str = "home";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerticalSliceConfig {
    /// Applied from bottom to top.
    pub final_gradient_stops: Vec<Color>,
    pub final_gradient_steps: usize,
    pub movement_speed: f64,
    pub easing: Easing,
}

impl Default for VerticalSliceConfig {
    fn default() -> Self {
        VerticalSliceConfig {
            final_gradient_stops: vec![
                Color::rgb(0x8a, 0x00, 0x8a),
                Color::rgb(0x00, 0xd1, 0xff),
                Color::rgb(0xff, 0xff, 0xff),
            ],
            final_gradient_steps: 12,
            movement_speed: 0.5,
            easing: Easing::InOutExpo,
        }
    }
}

impl VerticalSliceConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.movement_speed.is_finite() || self.movement_speed <= 0.0 {
            return Err(EngineError::InvalidConfig {
                message: format!("movement_speed must be greater than 0, got {}", self.movement_speed),
            });
        }
        Ok(())
    }
}

pub struct VerticalSlice {
    engine: BaseEffectIterator,
    new_rows: VecDeque<Vec<CharacterId>>,
}

impl VerticalSlice {
    pub fn new(mut terminal: Terminal, config: VerticalSliceConfig) -> EngineResult<Self> {
        config.validate()?;
        let gradient = Gradient::new(&config.final_gradient_stops, config.final_gradient_steps)?;
        let canvas = *terminal.canvas();

        for character in terminal.characters_mut() {
            let fraction = character.input_coord().row as f64 / canvas.top() as f64;
            let effect = GraphicalEffect::with_color(gradient.color_at_fraction(fraction));
            let symbol = character.input_symbol().to_string();
            character.set_appearance(symbol, effect.clone());
            character.final_graphical_effect = effect;
        }

        let rows = terminal.rows_bottom_to_top();
        let mut new_rows = VecDeque::with_capacity(rows.len());
        if !rows.is_empty() {
            let mut lengths = Vec::with_capacity(rows.len());
            for row in &rows {
                let mut length = 0;
                for &id in row {
                    length = length.max(terminal.character(id)?.input_coord().column);
                }
                lengths.push(length);
            }
            let mid_point = lengths.iter().sum::<i32>() / lengths.len() as i32 / 2;

            for (index, row) in rows.iter().enumerate() {
                let opposite = &rows[rows.len() - 1 - index];
                let mut new_row = Vec::new();
                for &id in row {
                    let column = terminal.character(id)?.input_coord().column;
                    if column <= mid_point {
                        slide_in(&mut terminal, id, config.movement_speed, config.easing, canvas.top())?;
                        new_row.push(id);
                    }
                }
                for &id in opposite {
                    let column = terminal.character(id)?.input_coord().column;
                    if column > mid_point {
                        slide_in(&mut terminal, id, config.movement_speed, config.easing, canvas.bottom())?;
                        new_row.push(id);
                    }
                }
                new_rows.push_back(new_row);
            }
            debug!("verticalslice: {} rows split at column {mid_point}", rows.len());
        }

        Ok(VerticalSlice {
            engine: BaseEffectIterator::new(terminal),
            new_rows,
        })
    }

    pub fn terminal(&self) -> &Terminal {
        self.engine.terminal()
    }
}

/// Start `id` on `start_row` in its own column with a path back home.
fn slide_in(
    terminal: &mut Terminal,
    id: CharacterId,
    speed: f64,
    easing: Easing,
    start_row: i32,
) -> EngineResult<()> {
    let character = terminal.character_mut(id)?;
    let home = character.input_coord();
    character.motion.set_coordinate(Coord::new(home.column, start_row));
    character
        .motion
        .new_path(Some(HOME), speed, Some(easing))?
        .new_waypoint(home);
    character.activate_path(&PathId::new(HOME))
}

impl Iterator for VerticalSlice {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.new_rows.is_empty() && !self.engine.has_active() {
            return None;
        }
        if let Some(row) = self.new_rows.pop_front() {
            for id in row {
                if let Err(err) = self.engine.terminal_mut().set_character_visibility(id, true) {
                    warn!("verticalslice: {err}");
                }
                self.engine.add_active(id);
            }
        }
        Some(self.engine.update().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::terminal::TerminalConfig;

    fn slice(input: &str) -> VerticalSlice {
        VerticalSlice::new(
            Terminal::new(input, TerminalConfig::default()),
            VerticalSliceConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_halves_start_on_opposite_edges() {
        let slice = slice("abcd\nefgh\nijkl");
        let characters = slice.terminal().characters();
        // mid point is column 2: a, b start at the top, c, d at the bottom.
        assert_eq!(characters[0].current_coord(), Coord::new(1, 3));
        assert_eq!(characters[3].current_coord(), Coord::new(4, 1));
        assert_eq!(slice.new_rows.len(), 3);
        assert!(slice.new_rows.iter().all(|row| row.len() == 4));
    }

    #[test]
    fn test_rows_are_revealed_one_per_frame() {
        let mut slice = slice("ab\ncd");
        slice.next();
        let visible = slice.terminal().characters().iter().filter(|c| c.is_visible()).count();
        assert_eq!(visible, 2);
        slice.next();
        assert!(slice.terminal().characters().iter().all(|c| c.is_visible()));
    }

    #[test]
    fn test_settles_home() {
        let mut slice = slice("abcd\nefgh\nijkl");
        assert!(slice.by_ref().take(1_000).count() < 1_000);
        for character in slice.terminal().characters() {
            assert_eq!(character.current_coord(), character.input_coord());
            assert_eq!(character.symbol(), character.input_symbol());
        }
    }

    #[test]
    fn test_empty_input_yields_no_frames() {
        let mut slice = slice("");
        assert!(slice.next().is_none());
    }
}
