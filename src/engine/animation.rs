//! Scenes: timed sequences of symbols and graphical effects for one character.
//!
//! A character keeps a registry of named scenes and plays at most one of them
//! at a time. Each tick the active scene shows its current frame and counts
//! the tick against that frame's duration; once the duration is used up the
//! scene moves its cursor on at the start of the following tick. Looping
//! scenes wrap the cursor back to the first frame, the others run off the
//! end and report completion.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use log::trace;

use crate::error::{EngineError, EngineResult};
use crate::gradient::Gradient;
use crate::types::GraphicalEffect;

/// Handle of a scene inside one character's registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        SceneId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrame {
    pub symbol: String,
    pub duration: usize,
    pub effect: GraphicalEffect,
    frames_played: usize,
}

impl AnimationFrame {
    pub fn frames_played(&self) -> usize {
        self.frames_played
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    id: SceneId,
    frames: Vec<AnimationFrame>,
    cursor: usize,
    is_looping: bool,
}

impl Scene {
    pub fn new(id: SceneId, is_looping: bool) -> Self {
        Scene {
            id,
            frames: Vec::new(),
            cursor: 0,
            is_looping,
        }
    }

    pub fn id(&self) -> &SceneId {
        &self.id
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    pub fn add_frame(
        &mut self,
        symbol: impl Into<String>,
        duration: usize,
        effect: GraphicalEffect,
    ) -> EngineResult<&mut Self> {
        if duration == 0 {
            return Err(EngineError::InvalidDuration { duration });
        }
        self.frames.push(AnimationFrame {
            symbol: symbol.into(),
            duration,
            effect,
            frames_played: 0,
        });
        Ok(self)
    }

    /// One frame of `symbol` per gradient colour, each shown for `duration`.
    pub fn apply_gradient_to_symbols(
        &mut self,
        gradient: &Gradient,
        symbol: &str,
        duration: usize,
    ) -> EngineResult<&mut Self> {
        for color in gradient.spectrum() {
            self.add_frame(symbol, duration, GraphicalEffect::with_color(*color))?;
        }
        Ok(self)
    }

    pub fn current_frame(&self) -> Option<&AnimationFrame> {
        self.frames.get(self.cursor)
    }

    /// True once a non-looping scene has shown every frame for its duration.
    pub fn is_exhausted(&self) -> bool {
        !self.is_looping && self.cursor >= self.frames.len()
    }

    fn reset(&mut self) {
        self.cursor = 0;
        for frame in &mut self.frames {
            frame.frames_played = 0;
        }
    }

    /// Advance one tick and return the frame to show, or `None` when the
    /// scene has run out of frames.
    fn step(&mut self) -> Option<&AnimationFrame> {
        let len = self.frames.len();
        if let Some(frame) = self.frames.get_mut(self.cursor) {
            if frame.frames_played >= frame.duration {
                frame.frames_played = 0;
                self.cursor += 1;
                if self.is_looping && self.cursor == len {
                    self.cursor = 0;
                }
            }
        }
        let frame = self.frames.get_mut(self.cursor)?;
        frame.frames_played += 1;
        Some(&*frame)
    }
}

/// Outcome of one animation tick.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationStep {
    /// No scene is active; the character keeps its appearance.
    Idle,
    Frame {
        symbol: String,
        effect: GraphicalEffect,
    },
    /// The active scene ran out of frames this tick and was deactivated.
    Completed(SceneId),
}

/// Scene registry of one character.
#[derive(Debug, Clone, Default)]
pub struct Animation {
    scenes: HashMap<SceneId, Scene>,
    active_scene: Option<SceneId>,
}

impl Animation {
    /// Register a new empty scene. Without an id the first unused decimal
    /// number is taken. An existing scene with the same id is replaced.
    pub fn new_scene(&mut self, id: Option<&str>, is_looping: bool) -> &mut Scene {
        let id = match id {
            Some(id) => SceneId::new(id),
            None => {
                let mut n = 0usize;
                while self.scenes.contains_key(&SceneId::new(n.to_string())) {
                    n += 1;
                }
                SceneId::new(n.to_string())
            }
        };
        let scene = Scene::new(id.clone(), is_looping);
        match self.scenes.entry(id) {
            Entry::Occupied(mut entry) => {
                entry.insert(scene);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(scene),
        }
    }

    pub fn query_scene(&self, id: &str) -> EngineResult<SceneId> {
        let id = SceneId::new(id);
        if self.scenes.contains_key(&id) {
            Ok(id)
        } else {
            Err(EngineError::UnknownScene { id: id.0 })
        }
    }

    pub fn scene(&self, id: &SceneId) -> EngineResult<&Scene> {
        self.scenes.get(id).ok_or_else(|| EngineError::UnknownScene {
            id: id.to_string(),
        })
    }

    pub fn scene_mut(&mut self, id: &SceneId) -> EngineResult<&mut Scene> {
        self.scenes.get_mut(id).ok_or_else(|| EngineError::UnknownScene {
            id: id.to_string(),
        })
    }

    pub fn active_scene(&self) -> Option<&Scene> {
        self.active_scene.as_ref().and_then(|id| self.scenes.get(id))
    }

    /// Restart `id` from its first frame and make it the active scene.
    pub fn activate_scene(&mut self, id: &SceneId) -> EngineResult<()> {
        let scene = self.scene_mut(id)?;
        if scene.frames.is_empty() {
            return Err(EngineError::EmptyScene { id: id.to_string() });
        }
        scene.reset();
        trace!("activate scene {id}");
        self.active_scene = Some(id.clone());
        Ok(())
    }

    /// Deactivate `id` if it is the active scene.
    pub fn deactivate_scene(&mut self, id: &SceneId) {
        if self.active_scene.as_ref() == Some(id) {
            self.active_scene = None;
        }
    }

    /// Complete when nothing is playing or the playing scene loops forever.
    pub fn active_scene_is_complete(&self) -> bool {
        match self.active_scene() {
            None => true,
            Some(scene) => scene.is_looping || scene.is_exhausted(),
        }
    }

    pub(crate) fn step(&mut self) -> AnimationStep {
        let Some(id) = self.active_scene.clone() else {
            return AnimationStep::Idle;
        };
        let Some(scene) = self.scenes.get_mut(&id) else {
            self.active_scene = None;
            return AnimationStep::Idle;
        };
        match scene.step() {
            Some(frame) => AnimationStep::Frame {
                symbol: frame.symbol.clone(),
                effect: frame.effect.clone(),
            },
            None => {
                self.active_scene = None;
                AnimationStep::Completed(id)
            }
        }
    }
}
