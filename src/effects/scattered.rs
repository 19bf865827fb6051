//! Scattered: every character starts at a random spot on the canvas and
//! eases into place.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::easing::Easing;
use crate::engine::motion::PathId;
use crate::engine::terminal::Terminal;
use crate::engine::BaseEffectIterator;
use crate::error::{EngineError, EngineResult};
use crate::geometry::Coord;

const HOME: &str = "home";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatteredConfig {
    /// Cells per tick; with easing this sets the number of steps.
    pub movement_speed: f64,
    pub easing: Easing,
}

impl Default for ScatteredConfig {
    fn default() -> Self {
        ScatteredConfig {
            movement_speed: 0.5,
            easing: Easing::InOutBack,
        }
    }
}

impl ScatteredConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.movement_speed.is_finite() || self.movement_speed <= 0.0 {
            return Err(EngineError::InvalidConfig {
                message: format!("movement_speed must be greater than 0, got {}", self.movement_speed),
            });
        }
        Ok(())
    }
}

pub struct Scattered {
    engine: BaseEffectIterator,
}

impl Scattered {
    pub fn new(mut terminal: Terminal, config: ScatteredConfig) -> EngineResult<Self> {
        config.validate()?;
        let canvas = *terminal.canvas();
        let mut rng = rand::thread_rng();
        let mut ids = Vec::new();
        for character in terminal.characters_mut() {
            let start = if canvas.right() < 2 || canvas.top() < 2 {
                Coord::new(1, 1)
            } else {
                Coord::new(
                    rng.gen_range(1..canvas.right()),
                    rng.gen_range(1..canvas.top()),
                )
            };
            character.motion.set_coordinate(start);
            let input_coord = character.input_coord();
            character
                .motion
                .new_path(Some(HOME), config.movement_speed, Some(config.easing))?
                .new_waypoint(input_coord);
            character.activate_path(&PathId::new(HOME))?;
            character.set_visible(true);
            ids.push(character.id());
        }
        debug!("scattered: {} characters", ids.len());

        let mut engine = BaseEffectIterator::new(terminal);
        engine.replace_active(ids);
        Ok(Scattered { engine })
    }

    pub fn terminal(&self) -> &Terminal {
        self.engine.terminal()
    }
}

impl Iterator for Scattered {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if !self.engine.has_active() {
            return None;
        }
        Some(self.engine.update().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::terminal::TerminalConfig;

    #[test]
    fn test_characters_start_on_canvas_and_end_home() {
        let mut scattered = Scattered::new(
            Terminal::new("hello\nworld", TerminalConfig::default()),
            ScatteredConfig::default(),
        )
        .unwrap();
        let canvas = *scattered.terminal().canvas();
        for character in scattered.terminal().characters() {
            assert!(canvas.coord_is_in_canvas(character.current_coord()));
            assert!(character.motion.active_path().is_some());
        }
        let last = scattered.by_ref().take(1_000).last().unwrap();
        assert_eq!(last, "hello\nworld");
        assert!(scattered.next().is_none());
    }

    #[test]
    fn test_tiny_canvas_starts_at_origin() {
        let scattered = Scattered::new(
            Terminal::new("a", TerminalConfig::default()),
            ScatteredConfig::default(),
        )
        .unwrap();
        assert_eq!(scattered.terminal().characters()[0].current_coord(), Coord::new(1, 1));
    }

    #[test]
    fn test_zero_speed_is_rejected() {
        let config = ScatteredConfig {
            movement_speed: 0.0,
            ..ScatteredConfig::default()
        };
        assert!(Scattered::new(Terminal::new("a", TerminalConfig::default()), config).is_err());
    }
}
