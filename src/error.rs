//! Errors raised while an effect builds its scenes and paths.
//!
//! Every variant is an authoring mistake in an effect (or its config).
//! Running out of frames or waypoints is normal termination and never
//! appears here.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("animation frame duration must be at least 1, got {duration}")]
    InvalidDuration { duration: usize },

    #[error("scene '{id}' is not registered")]
    UnknownScene { id: String },

    #[error("scene '{id}' has no frames")]
    EmptyScene { id: String },

    #[error("path '{id}' is not registered")]
    UnknownPath { id: String },

    #[error("path '{id}' has no waypoints")]
    EmptyPath { id: String },

    #[error("speed must be a finite number greater than 0, got {speed}")]
    InvalidSpeed { speed: f64 },

    #[error("gradient needs at least one colour stop and one step")]
    EmptyGradient,

    #[error("character {id} does not exist")]
    UnknownCharacter { id: usize },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
