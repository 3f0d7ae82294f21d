//! HiveBound: a vertical-climb platformer exposed as a step/reset
//! environment for reinforcement learning, with an optional Bevy viewer.

pub mod camera;
pub mod config;
pub mod env;
pub mod error;
pub mod geometry;
pub mod guard;
pub mod map;
pub mod physics;
pub mod player;
pub mod render;
pub mod rollout;
pub mod viewer;

pub use config::HiveConfig;
pub use env::{HiveEnv, Info, Observation, ResetOptions, StepResult};
pub use error::HiveError;
pub use map::LevelMap;
pub use player::Action;
