//! Engine — the per-character simulation and the frame loop that drives it.
//!
//! Effects script scenes and paths on the characters of a [`Terminal`] and
//! then pull frames from a [`BaseEffectIterator`]. Every call to
//! [`BaseEffectIterator::update`] is one tick: each active character moves
//! and animates once, settled characters leave the active set, and the
//! canvas is composed into one frame string.
//!
//! The engine never deals with terminal I/O.

pub mod animation;
pub mod character;
pub mod events;
pub mod motion;
pub mod terminal;

use log::trace;

use crate::renderer::Renderer;
use character::CharacterId;
use terminal::Terminal;

pub struct BaseEffectIterator {
    terminal: Terminal,
    active: Vec<CharacterId>,
    /// Membership of `active`, indexed by character id.
    is_active: Vec<bool>,
    frame: String,
}

impl BaseEffectIterator {
    pub fn new(terminal: Terminal) -> Self {
        BaseEffectIterator {
            is_active: vec![false; terminal.characters().len()],
            terminal,
            active: Vec::new(),
            frame: String::new(),
        }
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal {
        &mut self.terminal
    }

    /// Active characters in insertion order.
    pub fn active_characters(&self) -> &[CharacterId] {
        &self.active
    }

    pub fn has_active(&self) -> bool {
        !self.active.is_empty()
    }

    /// Append `id` to the active set. Already active characters keep their
    /// place; ids outside the terminal are ignored.
    pub fn add_active(&mut self, id: CharacterId) {
        if let Some(flag) = self.is_active.get_mut(id.0) {
            if !*flag {
                *flag = true;
                self.active.push(id);
            }
        }
    }

    pub fn replace_active(&mut self, ids: impl IntoIterator<Item = CharacterId>) {
        for id in self.active.drain(..) {
            self.is_active[id.0] = false;
        }
        for id in ids {
            self.add_active(id);
        }
    }

    /// Advance every active character by one tick and compose the frame.
    pub fn update(&mut self) -> &str {
        let characters = self.terminal.characters_mut();
        for id in &self.active {
            if let Some(character) = characters.get_mut(id.0) {
                character.tick();
            }
        }
        let before = self.active.len();
        let is_active = &mut self.is_active;
        self.active.retain(|id| {
            let keep = characters
                .get(id.0)
                .is_some_and(|character| !character.animation_completed());
            if !keep {
                is_active[id.0] = false;
            }
            keep
        });
        if self.active.len() != before {
            trace!(
                "{} character(s) settled, {} active",
                before - self.active.len(),
                self.active.len()
            );
        }
        self.frame = Renderer::render(&self.terminal, &self.active);
        &self.frame
    }

    /// The most recently composed frame.
    pub fn frame(&self) -> &str {
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::animation::SceneId;
    use crate::geometry::Coord;
    use crate::types::GraphicalEffect;
    use terminal::TerminalConfig;

    fn engine(input: &str) -> BaseEffectIterator {
        BaseEffectIterator::new(Terminal::new(input, TerminalConfig::default()))
    }

    fn add_scene(engine: &mut BaseEffectIterator, id: CharacterId, symbol: &str, duration: usize) -> SceneId {
        let character = engine.terminal_mut().character_mut(id).unwrap();
        let scene = character.animation.new_scene(None, false);
        scene.add_frame(symbol, duration, GraphicalEffect::default()).unwrap();
        scene.id().clone()
    }

    #[test]
    fn test_add_active_dedupes_and_keeps_order() {
        let mut engine = engine("abc");
        engine.add_active(CharacterId(2));
        engine.add_active(CharacterId(0));
        engine.add_active(CharacterId(2));
        assert_eq!(engine.active_characters(), &[CharacterId(2), CharacterId(0)]);
    }

    #[test]
    fn test_replace_active_resets_membership() {
        let mut engine = engine("abc");
        engine.add_active(CharacterId(0));
        engine.add_active(CharacterId(1));
        engine.replace_active([CharacterId(2), CharacterId(1), CharacterId(2)]);
        assert_eq!(engine.active_characters(), &[CharacterId(2), CharacterId(1)]);
        engine.add_active(CharacterId(0));
        engine.add_active(CharacterId(7));
        assert_eq!(
            engine.active_characters(),
            &[CharacterId(2), CharacterId(1), CharacterId(0)]
        );
    }

    #[test]
    fn test_settled_character_can_be_reactivated() {
        let mut engine = engine("a");
        let scene = add_scene(&mut engine, CharacterId(0), "#", 1);
        engine.add_active(CharacterId(0));
        engine.update();
        engine.update();
        assert!(!engine.has_active());

        let character = engine.terminal_mut().character_mut(CharacterId(0)).unwrap();
        character.set_visible(true);
        character.activate_scene(&scene).unwrap();
        engine.add_active(CharacterId(0));
        assert_eq!(engine.active_characters(), &[CharacterId(0)]);
    }

    #[test]
    fn test_update_removes_settled_characters() {
        let mut engine = engine("ab");
        for id in [CharacterId(0), CharacterId(1)] {
            let scene = add_scene(&mut engine, id, "#", if id.0 == 0 { 1 } else { 3 });
            let character = engine.terminal_mut().character_mut(id).unwrap();
            character.set_visible(true);
            character.activate_scene(&scene).unwrap();
            engine.add_active(id);
        }
        assert_eq!(engine.update(), "##");
        assert_eq!(engine.update(), "a#");
        assert_eq!(engine.active_characters(), &[CharacterId(1)]);
        engine.update();
        engine.update();
        assert_eq!(engine.frame(), "ab");
        assert!(!engine.has_active());
    }

    #[test]
    fn test_later_active_character_draws_on_top() {
        for (order, expected) in [([1, 0], "  x"), ([0, 1], "  y")] {
            let mut engine = engine("xyz");
            for id in order {
                let character = engine.terminal_mut().character_mut(CharacterId(id)).unwrap();
                character.set_visible(true);
                character.motion.set_coordinate(Coord::new(3, 1));
                engine.add_active(CharacterId(id));
            }
            for _ in 0..3 {
                assert_eq!(engine.update(), expected);
            }
        }
    }

    #[test]
    fn test_invisible_characters_are_not_drawn() {
        let mut engine = engine("ab\ncd");
        engine
            .terminal_mut()
            .set_character_visibility(CharacterId(3), true)
            .unwrap();
        assert_eq!(engine.update(), "\n d");
    }
}
