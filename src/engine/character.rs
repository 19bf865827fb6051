//! `EffectCharacter`: one input character and everything an effect drives.
//!
//! The character ties its motion, its animation and its event rules
//! together. A tick steps motion first, then animation, and dispatches the
//! completion events either of them raised.

use std::collections::VecDeque;

use log::{trace, warn};

use crate::error::{EngineError, EngineResult};
use crate::geometry::Coord;
use crate::types::GraphicalEffect;

use super::animation::{Animation, AnimationStep, SceneId};
use super::events::{Action, Event, EventHandler};
use super::motion::{Motion, PathId};

/// Index of a character in its terminal, stable for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharacterId(pub usize);

#[derive(Debug, Clone)]
pub struct EffectCharacter {
    id: CharacterId,
    input_symbol: String,
    input_coord: Coord,
    is_wide: bool,
    symbol: String,
    graphical_effect: GraphicalEffect,
    /// Shown once the active scene runs out of frames, instead of the input symbol.
    pub alternate_symbol: String,
    pub use_alternate_symbol: bool,
    /// Held after the active scene runs out of frames.
    pub final_graphical_effect: GraphicalEffect,
    pub animation: Animation,
    pub motion: Motion,
    event_handler: EventHandler,
    /// Events raised by actions while a dispatch is running.
    pending_events: VecDeque<Event>,
    dispatching: bool,
    visible: bool,
}

impl EffectCharacter {
    pub fn new(id: CharacterId, symbol: impl Into<String>, input_coord: Coord, is_wide: bool) -> Self {
        let symbol = symbol.into();
        EffectCharacter {
            id,
            input_symbol: symbol.clone(),
            input_coord,
            is_wide,
            alternate_symbol: symbol.clone(),
            use_alternate_symbol: false,
            symbol,
            graphical_effect: GraphicalEffect::default(),
            final_graphical_effect: GraphicalEffect::default(),
            animation: Animation::default(),
            motion: Motion::new(input_coord),
            event_handler: EventHandler::default(),
            pending_events: VecDeque::new(),
            dispatching: false,
            visible: false,
        }
    }

    pub fn id(&self) -> CharacterId {
        self.id
    }

    pub fn input_symbol(&self) -> &str {
        &self.input_symbol
    }

    pub fn input_coord(&self) -> Coord {
        self.input_coord
    }

    pub fn is_wide(&self) -> bool {
        self.is_wide
    }

    /// Symbol currently rendered.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn graphical_effect(&self) -> &GraphicalEffect {
        &self.graphical_effect
    }

    pub fn current_coord(&self) -> Coord {
        self.motion.current_coord()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Show `symbol` with `effect` until a scene says otherwise.
    pub fn set_appearance(&mut self, symbol: impl Into<String>, effect: GraphicalEffect) {
        self.symbol = symbol.into();
        self.graphical_effect = effect;
    }

    pub fn event_handler(&self) -> &EventHandler {
        &self.event_handler
    }

    // -----------------------------------------------------------------------
    // Activation
    // -----------------------------------------------------------------------

    pub fn activate_scene(&mut self, id: &SceneId) -> EngineResult<()> {
        self.animation.activate_scene(id)?;
        self.handle_event(Event::SceneActivated(id.clone()));
        Ok(())
    }

    pub fn deactivate_scene(&mut self, id: &SceneId) {
        self.animation.deactivate_scene(id);
    }

    pub fn activate_path(&mut self, id: &PathId) -> EngineResult<()> {
        self.motion.activate_path(id)?;
        self.handle_event(Event::PathActivated(id.clone()));
        Ok(())
    }

    pub fn deactivate_path(&mut self, id: &PathId) {
        self.motion.deactivate_path(id);
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Register `action` to run whenever `event` fires. Both the source and
    /// the target must already be registered; a target path must have
    /// waypoints.
    pub fn register_event(&mut self, event: Event, action: Action) -> EngineResult<()> {
        match &event {
            Event::SceneActivated(id) | Event::SceneComplete(id) => {
                self.animation.scene(id)?;
            }
            Event::PathActivated(id) | Event::PathComplete(id) => {
                self.motion.path(id)?;
            }
        }
        match &action {
            Action::ActivateScene(id) => {
                if self.animation.scene(id)?.frames().is_empty() {
                    return Err(EngineError::EmptyScene { id: id.to_string() });
                }
            }
            Action::DeactivateScene(id) => {
                self.animation.scene(id)?;
            }
            Action::ActivatePath(id) => {
                if self.motion.path(id)?.waypoints().is_empty() {
                    return Err(EngineError::EmptyPath { id: id.to_string() });
                }
            }
            Action::DeactivatePath(id) => {
                self.motion.path(id)?;
            }
            Action::Callback(_) => {}
        }
        self.event_handler.register(event, action);
        Ok(())
    }

    /// Follow `paths` one after another; with `looping` the last path hands
    /// back to the first.
    pub fn chain_paths(&mut self, paths: &[PathId], looping: bool) -> EngineResult<()> {
        for pair in paths.windows(2) {
            self.register_event(
                Event::PathComplete(pair[0].clone()),
                Action::ActivatePath(pair[1].clone()),
            )?;
        }
        if looping {
            if let (Some(last), Some(first)) = (paths.last(), paths.first()) {
                self.register_event(
                    Event::PathComplete(last.clone()),
                    Action::ActivatePath(first.clone()),
                )?;
            }
        }
        Ok(())
    }

    /// Run the rules for `event`. Events raised by those rules are queued and
    /// run after them, each at most once per dispatch, so rules that
    /// activate their own source cannot recurse.
    fn handle_event(&mut self, event: Event) {
        self.pending_events.push_back(event);
        if self.dispatching {
            return;
        }
        self.dispatching = true;
        let mut fired: Vec<Event> = Vec::new();
        while let Some(event) = self.pending_events.pop_front() {
            if fired.contains(&event) {
                trace!("character {}: {event:?} already fired", self.id.0);
                continue;
            }
            self.run_actions(&event);
            fired.push(event);
        }
        self.dispatching = false;
    }

    fn run_actions(&mut self, event: &Event) {
        let actions = self.event_handler.actions_for(event).to_vec();
        if actions.is_empty() {
            return;
        }
        trace!("character {}: {event:?} fires {} action(s)", self.id.0, actions.len());
        for action in actions {
            let result = match action {
                Action::ActivateScene(id) => self.activate_scene(&id),
                Action::DeactivateScene(id) => {
                    self.deactivate_scene(&id);
                    Ok(())
                }
                Action::ActivatePath(id) => self.activate_path(&id),
                Action::DeactivatePath(id) => {
                    self.deactivate_path(&id);
                    Ok(())
                }
                Action::Callback(callback) => {
                    callback.call(self);
                    Ok(())
                }
            };
            if let Err(err) = result {
                warn!("character {}: action for {event:?} failed: {err}", self.id.0);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Per-tick stepping
    // -----------------------------------------------------------------------

    /// Move one step along the active path.
    pub fn step_motion(&mut self) {
        if let Some(path) = self.motion.step() {
            self.handle_event(Event::PathComplete(path));
        }
    }

    /// Advance the active scene by one tick and publish what it shows.
    pub fn step_animation(&mut self) {
        match self.animation.step() {
            AnimationStep::Idle => {}
            AnimationStep::Frame { symbol, effect } => {
                self.symbol = symbol;
                self.graphical_effect = effect;
            }
            AnimationStep::Completed(scene) => {
                self.symbol = if self.use_alternate_symbol {
                    self.alternate_symbol.clone()
                } else {
                    self.input_symbol.clone()
                };
                self.graphical_effect = self.final_graphical_effect.clone();
                self.handle_event(Event::SceneComplete(scene));
            }
        }
    }

    pub fn tick(&mut self) {
        self.step_motion();
        self.step_animation();
    }

    /// Settled at home with nothing left to play. A character whose effect
    /// leaves it away from its input coordinate must be sent home by a path
    /// before this can hold.
    pub fn animation_completed(&self) -> bool {
        self.motion.previous_coord() == self.input_coord
            && self.motion.movement_complete()
            && self.animation.active_scene_is_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::Callback;

    fn character() -> EffectCharacter {
        EffectCharacter::new(CharacterId(0), "A", Coord::new(5, 5), false)
    }

    fn add_scene(character: &mut EffectCharacter, id: &str, durations: &[usize]) -> SceneId {
        let scene = character.animation.new_scene(Some(id), false);
        for (i, duration) in durations.iter().enumerate() {
            scene
                .add_frame(format!("{id}{i}"), *duration, GraphicalEffect::default())
                .unwrap();
        }
        scene.id().clone()
    }

    #[test]
    fn test_scene_timing_then_input_symbol() {
        let mut c = character();
        let id = add_scene(&mut c, "s", &[2, 3]);
        c.activate_scene(&id).unwrap();
        let shown: Vec<String> = (0..8)
            .map(|_| {
                c.tick();
                c.symbol().to_string()
            })
            .collect();
        assert_eq!(shown, ["s0", "s0", "s1", "s1", "s1", "A", "A", "A"]);
    }

    #[test]
    fn test_alternate_symbol_and_final_effect() {
        let mut c = character();
        let id = add_scene(&mut c, "s", &[1]);
        c.alternate_symbol = "Z".into();
        c.use_alternate_symbol = true;
        c.final_graphical_effect.bold = true;
        c.activate_scene(&id).unwrap();
        c.tick();
        c.tick();
        assert_eq!(c.symbol(), "Z");
        assert!(c.graphical_effect().bold);
    }

    #[test]
    fn test_completion_gated_by_non_looping_scene() {
        let mut c = character();
        let id = add_scene(&mut c, "s", &[3]);
        c.activate_scene(&id).unwrap();
        c.tick();
        assert_eq!(c.motion.previous_coord(), c.input_coord());
        assert!(!c.animation_completed());
        c.tick();
        c.tick();
        assert!(!c.animation_completed());
        c.tick();
        assert!(c.animation_completed());
    }

    #[test]
    fn test_looping_scene_does_not_block_completion() {
        let mut c = character();
        let scene = c.animation.new_scene(Some("loop"), true);
        scene.add_frame("*", 2, GraphicalEffect::default()).unwrap();
        let id = scene.id().clone();
        c.activate_scene(&id).unwrap();
        c.tick();
        assert!(c.animation_completed());
    }

    #[test]
    fn test_away_from_home_is_not_complete() {
        let mut c = character();
        c.motion.set_coordinate(Coord::new(1, 1));
        c.tick();
        assert!(!c.animation_completed());
        let home = c.motion.new_path(Some("home"), 1.0, None).unwrap();
        home.new_waypoint(Coord::new(5, 5));
        let home = home.id().clone();
        c.activate_path(&home).unwrap();
        for _ in 0..4 {
            c.tick();
        }
        assert_eq!(c.current_coord(), Coord::new(5, 5));
        assert!(!c.animation_completed());
        c.tick();
        assert!(c.animation_completed());
    }

    #[test]
    fn test_scene_complete_activates_path_next_tick() {
        let mut c = character();
        let scene = add_scene(&mut c, "s", &[1]);
        let path = c.motion.new_path(Some("p"), 1.0, None).unwrap();
        path.new_waypoint(Coord::new(9, 5));
        let path = path.id().clone();
        c.register_event(
            Event::SceneComplete(scene.clone()),
            Action::ActivatePath(path.clone()),
        )
        .unwrap();
        c.activate_scene(&scene).unwrap();

        c.tick();
        assert!(c.motion.active_path().is_none());
        c.tick();
        assert_eq!(c.motion.active_path().map(|p| p.id()), Some(&path));
        assert_eq!(c.current_coord(), Coord::new(5, 5));
        c.tick();
        assert_eq!(c.current_coord(), Coord::new(6, 5));
    }

    #[test]
    fn test_scene_chain_and_callback() {
        let mut c = character();
        let first = add_scene(&mut c, "a", &[1]);
        let second = add_scene(&mut c, "b", &[1]);
        c.set_visible(true);
        c.register_event(
            Event::SceneComplete(first.clone()),
            Action::ActivateScene(second.clone()),
        )
        .unwrap();
        c.register_event(
            Event::SceneComplete(second.clone()),
            Action::Callback(Callback::new(|c| c.set_visible(false))),
        )
        .unwrap();
        c.activate_scene(&first).unwrap();
        c.tick();
        assert_eq!(c.symbol(), "a0");
        c.tick();
        assert_eq!(c.symbol(), "A");
        assert_eq!(c.animation.active_scene().map(|s| s.id()), Some(&second));
        c.tick();
        assert_eq!(c.symbol(), "b0");
        assert!(c.is_visible());
        c.tick();
        assert!(!c.is_visible());
    }

    #[test]
    fn test_chain_paths_loop() {
        let mut c = character();
        let mut ids = Vec::new();
        for (name, coord) in [("0", Coord::new(6, 5)), ("1", Coord::new(5, 5))] {
            let path = c.motion.new_path(Some(name), 1.0, None).unwrap();
            path.new_waypoint(coord);
            ids.push(path.id().clone());
        }
        c.chain_paths(&ids, true).unwrap();
        assert_eq!(c.event_handler().rule_count(), 2);
        c.activate_path(&ids[0]).unwrap();
        let mut coords = Vec::new();
        for _ in 0..4 {
            c.tick();
            coords.push(c.current_coord());
        }
        assert_eq!(
            coords,
            vec![Coord::new(6, 5), Coord::new(5, 5), Coord::new(6, 5), Coord::new(5, 5)]
        );
        assert!(c.motion.active_path().is_some());
    }

    #[test]
    fn test_self_activating_rules_fire_once() {
        let mut c = character();
        let a = add_scene(&mut c, "a", &[1]);
        let b = add_scene(&mut c, "b", &[1]);
        c.register_event(Event::SceneActivated(a.clone()), Action::ActivateScene(a.clone()))
            .unwrap();
        c.register_event(Event::SceneActivated(a.clone()), Action::ActivateScene(b.clone()))
            .unwrap();
        c.register_event(Event::SceneActivated(b.clone()), Action::ActivateScene(a.clone()))
            .unwrap();
        c.activate_scene(&a).unwrap();
        assert_eq!(c.animation.active_scene().map(|s| s.id()), Some(&a));
        c.tick();
        assert_eq!(c.symbol(), "a0");
    }

    #[test]
    fn test_callback_activation_runs_its_rules() {
        let mut c = character();
        let scene = add_scene(&mut c, "s", &[1]);
        let path = c.motion.new_path(Some("p"), 1.0, None).unwrap();
        path.new_waypoint(Coord::new(9, 5));
        let path = path.id().clone();
        let target = scene.clone();
        c.register_event(
            Event::PathActivated(path.clone()),
            Action::Callback(Callback::new(move |c| {
                let _ = c.activate_scene(&target);
            })),
        )
        .unwrap();
        c.register_event(
            Event::SceneActivated(scene.clone()),
            Action::Callback(Callback::new(|c| c.set_visible(true))),
        )
        .unwrap();
        c.activate_path(&path).unwrap();
        assert_eq!(c.animation.active_scene().map(|s| s.id()), Some(&scene));
        assert!(c.is_visible());
    }

    #[test]
    fn test_register_event_rejects_unknown_ids() {
        let mut c = character();
        let scene = add_scene(&mut c, "s", &[1]);
        assert_eq!(
            c.register_event(
                Event::SceneComplete(scene.clone()),
                Action::ActivatePath(PathId::new("nope"))
            ),
            Err(EngineError::UnknownPath { id: "nope".into() })
        );
        assert_eq!(
            c.register_event(
                Event::PathComplete(PathId::new("nope")),
                Action::ActivateScene(scene)
            ),
            Err(EngineError::UnknownPath { id: "nope".into() })
        );
    }
}
