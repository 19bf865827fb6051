//! Rings: characters disperse, then condense into concentric rings that
//! spin in alternating directions, cycling a few times before every
//! character returns home. Characters that do not fit on a ring fly off
//! the canvas and come back for the finale.

use std::collections::HashMap;

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::easing::Easing;
use crate::engine::animation::SceneId;
use crate::engine::character::{CharacterId, EffectCharacter};
use crate::engine::events::{Action, Callback, Event};
use crate::engine::motion::PathId;
use crate::engine::terminal::Terminal;
use crate::engine::BaseEffectIterator;
use crate::error::{EngineError, EngineResult};
use crate::geometry::{find_coords_in_rect, find_coords_on_circle, Coord};
use crate::gradient::{Gradient, GradientDirection};
use crate::types::{Color, GraphicalEffect};

use super::final_colors;

const GRADIENT: &str = "gradient";
const DISPERSE: &str = "disperse";
const HOME: &str = "home";
const EXTERNAL: &str = "external";
const FIRST_RING_PATH: &str = "0";
const INITIAL_PHASE_TICKS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RingsConfig {
    pub ring_colors: Vec<Color>,
    pub final_gradient_stops: Vec<Color>,
    pub final_gradient_steps: usize,
    pub final_gradient_direction: GradientDirection,
    /// Distance between rings as a fraction of the shorter canvas side.
    pub ring_gap: f64,
    /// Frames spent spinning per cycle.
    pub spin_duration: usize,
    /// Range the speed of each ring is drawn from.
    pub spin_speed: (f64, f64),
    /// Frames spent dispersed between spins.
    pub disperse_duration: usize,
    pub spin_disperse_cycles: usize,
}

impl Default for RingsConfig {
    fn default() -> Self {
        let palette = vec![
            Color::rgb(0xab, 0x48, 0xff),
            Color::rgb(0xe7, 0xb2, 0xb2),
            Color::rgb(0xff, 0xfe, 0xbd),
        ];
        RingsConfig {
            ring_colors: palette.clone(),
            final_gradient_stops: palette,
            final_gradient_steps: 12,
            final_gradient_direction: GradientDirection::Vertical,
            ring_gap: 0.1,
            spin_duration: 200,
            spin_speed: (0.25, 1.0),
            disperse_duration: 200,
            spin_disperse_cycles: 3,
        }
    }
}

impl RingsConfig {
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |message: &str| -> EngineResult<()> {
            Err(EngineError::InvalidConfig {
                message: message.to_string(),
            })
        };
        if self.ring_colors.is_empty() {
            return invalid("ring_colors must not be empty");
        }
        if !self.ring_gap.is_finite() || self.ring_gap <= 0.0 {
            return invalid("ring_gap must be greater than 0");
        }
        let (low, high) = self.spin_speed;
        if !low.is_finite() || !high.is_finite() || low <= 0.0 || low > high {
            return invalid("spin_speed must be an increasing range of speeds above 0");
        }
        if self.spin_disperse_cycles == 0 {
            return invalid("spin_disperse_cycles must be at least 1");
        }
        Ok(())
    }
}

struct Ring {
    coords: Vec<Coord>,
    color: Color,
    gap: i32,
    rotation_speed: f64,
    characters: Vec<CharacterId>,
    /// Ring path each character resumes after condensing.
    last_ring_path: HashMap<CharacterId, PathId>,
}

impl Ring {
    /// Give `character` one single-waypoint path per ring coordinate,
    /// starting at its slot and chained into a loop around the ring. The
    /// ring colour is held while spinning and the final colour while
    /// dispersed.
    fn add_character(
        &mut self,
        character: &mut EffectCharacter,
        clockwise: bool,
        final_color: Color,
    ) -> EngineResult<()> {
        let symbol = character.input_symbol().to_string();
        let to_ring = Gradient::new(&[final_color, self.color], 8)?;
        character
            .animation
            .new_scene(Some(GRADIENT), false)
            .apply_gradient_to_symbols(&to_ring, &symbol, 5)?;
        let from_ring = Gradient::new(&[self.color, final_color], 8)?;
        character
            .animation
            .new_scene(Some(DISPERSE), false)
            .apply_gradient_to_symbols(&from_ring, &symbol, 16)?;
        let ring_effect = GraphicalEffect::with_color(self.color);
        character.register_event(
            Event::SceneActivated(SceneId::new(GRADIENT)),
            Action::Callback(Callback::new(move |c| {
                c.final_graphical_effect = ring_effect.clone();
            })),
        )?;
        let final_effect = GraphicalEffect::with_color(final_color);
        character.register_event(
            Event::SceneActivated(SceneId::new(DISPERSE)),
            Action::Callback(Callback::new(move |c| {
                c.final_graphical_effect = final_effect.clone();
            })),
        )?;

        let mut coords = self.coords.clone();
        if clockwise {
            coords.reverse();
        }
        let start = self.characters.len() % coords.len().max(1);
        coords.rotate_left(start);
        let mut ring_paths = Vec::with_capacity(coords.len());
        for (index, coord) in coords.into_iter().enumerate() {
            let path = character
                .motion
                .new_path(Some(&index.to_string()), self.rotation_speed, None)?;
            path.new_waypoint(coord);
            ring_paths.push(path.id().clone());
        }
        character.chain_paths(&ring_paths, true)?;

        self.last_ring_path
            .insert(character.id(), PathId::new(FIRST_RING_PATH));
        self.characters.push(character.id());
        Ok(())
    }

    /// Looping path wandering between random cells near `origin`.
    fn make_disperse_path(&self, character: &mut EffectCharacter, origin: Coord) -> EngineResult<PathId> {
        let candidates = find_coords_in_rect(origin, self.gap);
        let mut rng = rand::thread_rng();
        character.motion.remove_path(&PathId::new(DISPERSE));
        let path = character.motion.new_path(Some(DISPERSE), 0.1, None)?;
        path.set_looping(true);
        for _ in 0..5 {
            if let Some(coord) = candidates.choose(&mut rng) {
                path.new_waypoint(*coord);
            }
        }
        Ok(path.id().clone())
    }

    fn disperse(&mut self, terminal: &mut Terminal) -> EngineResult<()> {
        for &id in &self.characters {
            let character = terminal.character_mut(id)?;
            let last = character
                .motion
                .active_path()
                .map(|path| path.id().clone())
                .unwrap_or_else(|| PathId::new(FIRST_RING_PATH));
            self.last_ring_path.insert(id, last);
            let origin = character.current_coord();
            let disperse = self.make_disperse_path(character, origin)?;
            character.activate_path(&disperse)?;
            character.activate_scene(&SceneId::new(DISPERSE))?;
        }
        Ok(())
    }

    fn spin(&self, terminal: &mut Terminal) -> EngineResult<()> {
        for &id in &self.characters {
            let character = terminal.character_mut(id)?;
            let ring_path = self
                .last_ring_path
                .get(&id)
                .cloned()
                .unwrap_or_else(|| PathId::new(FIRST_RING_PATH));
            let Some(slot) = character.motion.path(&ring_path)?.waypoints().first().map(|w| w.coord) else {
                continue;
            };
            let condense = character.motion.new_path(None, 0.1, None)?;
            condense.new_waypoint(slot);
            let condense = condense.id().clone();
            character.register_event(
                Event::PathComplete(condense.clone()),
                Action::ActivatePath(ring_path),
            )?;
            character.activate_path(&condense)?;
            character.activate_scene(&SceneId::new(GRADIENT))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Disperse,
    Spin,
    Final,
    Complete,
}

pub struct Rings {
    engine: BaseEffectIterator,
    rings: Vec<Ring>,
    non_ring: Vec<CharacterId>,
    phase: Phase,
    initial_disperse_complete: bool,
    initial_remaining: usize,
    spin_remaining: usize,
    disperse_remaining: usize,
    cycles_remaining: usize,
    spin_duration: usize,
    disperse_duration: usize,
}

impl Rings {
    pub fn new(mut terminal: Terminal, config: RingsConfig) -> EngineResult<Self> {
        config.validate()?;
        let colors = final_colors(
            &terminal,
            &config.final_gradient_stops,
            config.final_gradient_steps,
            config.final_gradient_direction,
        )?;
        let canvas = *terminal.canvas();
        let gap = ((canvas.top().min(canvas.right()) as f64 * config.ring_gap).round() as i32).max(1);
        let mut rng = rand::thread_rng();

        let mut pending = Vec::new();
        for character in terminal.characters_mut() {
            let effect = GraphicalEffect::with_color(colors[character.id().0]);
            let symbol = character.input_symbol().to_string();
            character.set_appearance(symbol, effect.clone());
            character.final_graphical_effect = effect;
            let input_coord = character.input_coord();
            character
                .motion
                .new_path(Some(HOME), 0.8, Some(Easing::OutQuad))?
                .new_waypoint(input_coord);
            character.set_visible(true);
            pending.push(character.id());
        }
        pending.shuffle(&mut rng);

        let mut rings = Vec::new();
        let (low, high) = config.spin_speed;
        let max_radius = canvas.right().max(canvas.top());
        for radius in (1..max_radius).step_by(gap as usize) {
            let coords = find_coords_on_circle(canvas.center(), radius, 7 * radius as usize, true);
            let inside = coords.iter().filter(|c| canvas.coord_is_in_canvas(**c)).count();
            if coords.is_empty() || (inside as f64) / (coords.len() as f64) < 0.25 {
                break;
            }
            rings.push(Ring {
                coords,
                color: config.ring_colors[rings.len() % config.ring_colors.len()],
                gap,
                rotation_speed: rng.gen_range(low..=high),
                characters: Vec::new(),
                last_ring_path: HashMap::new(),
            });
        }

        for (index, ring) in rings.iter_mut().enumerate() {
            for _ in 0..ring.coords.len() {
                let Some(id) = pending.pop() else {
                    break;
                };
                let character = terminal.character_mut(id)?;
                ring.add_character(character, index % 2 == 1, colors[id.0])?;
            }
        }
        debug!(
            "rings: {} rings, {} characters left off the rings",
            rings.len(),
            pending.len()
        );

        for &id in &pending {
            let outside = canvas.random_coord(true);
            let character = terminal.character_mut(id)?;
            character
                .motion
                .new_path(Some(EXTERNAL), 0.8, Some(Easing::OutSine))?
                .new_waypoint(outside);
            character.register_event(
                Event::PathComplete(PathId::new(EXTERNAL)),
                Action::Callback(Callback::new(|c| c.set_visible(false))),
            )?;
        }

        Ok(Rings {
            engine: BaseEffectIterator::new(terminal),
            rings,
            non_ring: pending,
            phase: Phase::Start,
            initial_disperse_complete: false,
            initial_remaining: INITIAL_PHASE_TICKS,
            spin_remaining: config.spin_duration,
            disperse_remaining: config.disperse_duration,
            cycles_remaining: config.spin_disperse_cycles,
            spin_duration: config.spin_duration,
            disperse_duration: config.disperse_duration,
        })
    }

    pub fn terminal(&self) -> &Terminal {
        self.engine.terminal()
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    /// Ring characters drift from their ring slot into a dispersed cloud;
    /// the rest fly off the canvas.
    fn initial_disperse(&mut self) -> EngineResult<()> {
        for ring in &self.rings {
            for &id in &ring.characters {
                let character = self.engine.terminal_mut().character_mut(id)?;
                let slot = character
                    .motion
                    .path(&PathId::new(FIRST_RING_PATH))?
                    .waypoints()
                    .first()
                    .map(|w| w.coord)
                    .unwrap_or_else(|| character.input_coord());
                let disperse = ring.make_disperse_path(character, slot)?;
                let entry = character
                    .motion
                    .path(&disperse)?
                    .waypoints()
                    .first()
                    .map(|w| w.coord)
                    .unwrap_or(slot);
                let initial = character.motion.new_path(None, 0.3, Some(Easing::OutCubic))?;
                initial.new_waypoint(entry);
                let initial = initial.id().clone();
                character.register_event(Event::PathComplete(initial.clone()), Action::ActivatePath(disperse))?;
                character.activate_scene(&SceneId::new(DISPERSE))?;
                character.activate_path(&initial)?;
                self.engine.add_active(id);
            }
        }
        for &id in &self.non_ring {
            let character = self.engine.terminal_mut().character_mut(id)?;
            character.activate_path(&PathId::new(EXTERNAL))?;
            self.engine.add_active(id);
        }
        Ok(())
    }

    fn start_spin(&mut self) -> EngineResult<()> {
        for ring in &self.rings {
            ring.spin(self.engine.terminal_mut())?;
        }
        Ok(())
    }

    fn start_disperse(&mut self) -> EngineResult<()> {
        for ring in &mut self.rings {
            ring.disperse(self.engine.terminal_mut())?;
        }
        Ok(())
    }

    fn start_final(&mut self) -> EngineResult<()> {
        let ids: Vec<CharacterId> = self.engine.terminal().character_ids().collect();
        for id in ids {
            let character = self.engine.terminal_mut().character_mut(id)?;
            character.set_visible(true);
            character.activate_path(&PathId::new(HOME))?;
            if !character.motion.has_path(EXTERNAL) {
                character.activate_scene(&SceneId::new(DISPERSE))?;
            }
            self.engine.add_active(id);
        }
        Ok(())
    }

    fn advance_phase(&mut self) -> EngineResult<()> {
        match self.phase {
            Phase::Start => {
                if self.initial_remaining == 0 {
                    debug!("rings: disperse");
                    self.phase = Phase::Disperse;
                } else {
                    self.initial_remaining -= 1;
                }
            }
            Phase::Disperse => {
                if !self.initial_disperse_complete {
                    self.initial_disperse_complete = true;
                    self.initial_disperse()?;
                } else if self.disperse_remaining == 0 {
                    debug!("rings: spin, {} cycles left", self.cycles_remaining);
                    self.phase = Phase::Spin;
                    self.cycles_remaining = self.cycles_remaining.saturating_sub(1);
                    self.spin_remaining = self.spin_duration;
                    self.start_spin()?;
                } else {
                    self.disperse_remaining -= 1;
                }
            }
            Phase::Spin => {
                if self.spin_remaining > 0 {
                    self.spin_remaining -= 1;
                } else if self.cycles_remaining == 0 {
                    debug!("rings: final");
                    self.phase = Phase::Final;
                    self.start_final()?;
                } else {
                    debug!("rings: disperse");
                    self.disperse_remaining = self.disperse_duration;
                    self.start_disperse()?;
                    self.phase = Phase::Disperse;
                }
            }
            Phase::Final => {
                if !self.engine.has_active() {
                    debug!("rings: complete");
                    self.phase = Phase::Complete;
                }
            }
            Phase::Complete => {}
        }
        Ok(())
    }
}

impl Iterator for Rings {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.phase == Phase::Complete {
            return None;
        }
        if let Err(err) = self.advance_phase() {
            warn!("rings: {err}");
        }
        Some(self.engine.update().to_string())
    }
}
