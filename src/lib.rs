pub mod config;
pub mod easing;
pub mod effects;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod gradient;
pub mod player;
pub mod renderer;
pub mod types;
