//! Step/reset environment around the HiveBound simulation.
//!
//! [`HiveEnv`] owns the player, the guards, the level and the camera and
//! advances them one fixed tick per [`step`](HiveEnv::step). Rendering is
//! optional and never feeds back into the simulation.

use bevy::log::{debug, info, warn};
use bevy::math::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng as _, SeedableRng};
use serde_json::json;

use crate::camera::Camera;
use crate::config::{DetectionPolicy, HiveConfig, ObservationMode};
use crate::error::HiveError;
use crate::guard::Guard;
use crate::map::LevelMap;
use crate::player::{Action, Player};
use crate::render::{self, RenderSurface, Scene};

pub type Observation = Vec<f32>;

/// Extensible key-value info returned by `reset` and `step`.
pub type Info = serde_json::Map<String, serde_json::Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub info: Info,
}

impl StepResult {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResetOptions {
    /// Respawn here instead of the level's checkpoint.
    pub checkpoint: Option<Vec2>,
}

/// Discrete action space with `n` actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionSpace {
    pub n: usize,
}

/// Box observation space: `shape` values, each in `low..=high`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObservationSpace {
    pub low: f32,
    pub high: f32,
    pub shape: usize,
}

/// Lifecycle state of an episode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EpisodeState {
    /// Before the first reset.
    #[default]
    Idle,
    Running,
    /// Reached the goal (or was caught under `DetectionPolicy::Terminate`).
    Done,
    /// Stalled for longer than the stagnation budget.
    Truncated,
}

impl EpisodeState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Truncated)
    }
}

pub struct HiveEnv {
    config: HiveConfig,
    map: LevelMap,
    player: Player,
    guards: Vec<Guard>,
    camera: Camera,
    state: EpisodeState,
    tick: u64,
    episode: u32,
    best_height: f32,
    last_improvement_tick: u64,
    detections: u32,
    rng: SmallRng,
    closed: bool,
}

impl HiveEnv {
    pub fn new(map: LevelMap, config: HiveConfig) -> Result<Self, HiveError> {
        config.validate()?;
        let player = Player::new(config.player.clone(), map.spawn, map.checkpoint);
        let guards = map
            .guards
            .iter()
            .map(|spawn| Guard::spawn(spawn, &config.guard))
            .collect();
        let camera = Camera::new(config.camera.clone());
        let best_height = player.center().y;
        Ok(Self {
            config,
            map,
            player,
            guards,
            camera,
            state: EpisodeState::Idle,
            tick: 0,
            episode: 0,
            best_height,
            last_improvement_tick: 0,
            detections: 0,
            rng: SmallRng::seed_from_u64(0),
            closed: false,
        })
    }

    /// Loads the map named by `config.map_path`. A bad map is fatal.
    pub fn from_config(config: HiveConfig) -> Result<Self, HiveError> {
        let map = LevelMap::load(&config.map_path)?;
        Self::new(map, config)
    }

    pub fn config(&self) -> &HiveConfig {
        &self.config
    }

    pub fn map(&self) -> &LevelMap {
        &self.map
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn guards(&self) -> &[Guard] {
        &self.guards
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    /// Steps taken in the current episode.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn episode(&self) -> u32 {
        self.episode
    }

    pub fn detections(&self) -> u32 {
        self.detections
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn action_space(&self) -> ActionSpace {
        ActionSpace { n: Action::COUNT }
    }

    pub fn observation_space(&self) -> ObservationSpace {
        let shape = match self.config.env.observation {
            ObservationMode::PlayerCenter => 2,
            ObservationMode::Full => 2 + 4 * (self.map.rects.len() + self.guards.len()),
        };
        ObservationSpace {
            low: 0.0,
            high: self.map.size.x.max(self.map.size.y),
            shape,
        }
    }

    /// Uniform random action from the RNG seeded by the last `reset`.
    pub fn sample_action(&mut self) -> Action {
        Action::ALL[self.rng.gen_range(0..Action::COUNT)]
    }

    /// Puts the player back on the checkpoint and restarts the episode
    /// bookkeeping. The map and guard configuration are untouched.
    pub fn reset(&mut self, seed: Option<u64>, options: Option<ResetOptions>) -> (Observation, Info) {
        if let Some(seed) = seed {
            self.rng = SmallRng::seed_from_u64(seed);
        }
        let options = options.unwrap_or_default();
        let checkpoint = options.checkpoint.unwrap_or(self.map.checkpoint);
        self.player.set_checkpoint(checkpoint);
        self.player.jump_to_checkpoint();
        for guard in &mut self.guards {
            guard.reset();
        }
        self.camera.reset();

        self.tick = 0;
        self.best_height = self.player.center().y;
        self.last_improvement_tick = 0;
        self.detections = 0;
        self.episode = self.episode.saturating_add(1);
        self.state = EpisodeState::Running;
        debug!("[HiveBound] Episode {} reset (seed {:?})", self.episode, seed);

        let mut info = Info::new();
        info.insert("episode".into(), json!(self.episode));
        info.insert("seed".into(), json!(seed));
        (self.observation(), info)
    }

    pub fn step(&mut self, action: impl Into<Action>) -> StepResult {
        let action = action.into();
        match self.state {
            EpisodeState::Idle => {
                warn!("[HiveBound] step() before reset(); resetting first");
                self.reset(None, None);
            }
            state if state.is_terminal() => {
                debug!("[HiveBound] step() on a finished episode ({:?}); continuing", state);
            }
            _ => {}
        }
        let dt = self.config.dt();

        self.player.apply_action(action);
        self.player.update(&self.map.rects, dt);

        for guard in &mut self.guards {
            guard.update(dt);
        }
        let detected = self
            .guards
            .iter()
            .any(|guard| guard.detect_target(&self.player.rect));
        if detected {
            self.detections = self.detections.saturating_add(1);
            debug!(
                "[HiveBound] Player spotted at {:?}; back to checkpoint",
                self.player.rect.position()
            );
            self.player.jump_to_checkpoint();
        }

        let checkpoint_reached = !detected && self.touch_checkpoints();

        let respawned = self.map.has_left(&self.player.rect);
        if respawned {
            self.player.jump_to_checkpoint();
        }

        self.tick += 1;
        let observation = self.observation();
        let center = self.player.center();

        let mut reward = -center.y;
        if detected {
            reward -= self.config.env.detection_penalty;
        }

        let caught = detected && self.config.env.detection == DetectionPolicy::Terminate;
        let terminated = self.player.rect.y < self.config.env.goal_y || caught;

        if center.y < self.best_height {
            self.best_height = center.y;
            self.last_improvement_tick = self.tick;
        }
        let stalled = self.tick - self.last_improvement_tick > self.stagnation_budget_ticks();
        let truncated = !terminated && stalled;

        self.state = if terminated {
            EpisodeState::Done
        } else if truncated {
            EpisodeState::Truncated
        } else {
            EpisodeState::Running
        };

        let mut info = Info::new();
        info.insert("step".into(), json!(self.tick));
        info.insert("episode".into(), json!(self.episode));
        info.insert("detected".into(), json!(detected));
        info.insert("respawned".into(), json!(respawned));
        info.insert("checkpoint_reached".into(), json!(checkpoint_reached));

        if terminated || truncated {
            debug!(
                "[HiveBound] Episode {} ended after {} steps (terminated: {}, truncated: {})",
                self.episode, self.tick, terminated, truncated
            );
            if self.config.env.auto_reset {
                self.reset(None, None);
            }
        }

        StepResult {
            observation,
            reward,
            terminated,
            truncated,
            info,
        }
    }

    /// Updates the camera and draws a frame. Has no effect on the episode.
    pub fn render(&mut self, surface: &mut dyn RenderSurface) {
        if self.closed {
            return;
        }
        self.camera
            .update(self.player.rect.position(), self.player.intents());
        render::draw_scene(
            &Scene {
                map: &self.map,
                guards: &self.guards,
                player: &self.player,
                camera: &self.camera,
            },
            surface,
        );
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        info!(
            "[HiveBound] Environment closed after {} episode(s)",
            self.episode
        );
    }

    fn stagnation_budget_ticks(&self) -> u64 {
        (self.config.env.stagnation_budget * self.config.tick_hz).round() as u64
    }

    /// Moves the checkpoint into any zone the player touches. Returns true
    /// when the checkpoint changed.
    fn touch_checkpoints(&mut self) -> bool {
        let Some(zone) = self
            .map
            .checkpoints
            .iter()
            .find(|zone| zone.overlaps(&self.player.rect))
        else {
            return false;
        };
        let target = Vec2::new(zone.x, zone.bottom() - self.player.rect.h);
        if target == self.player.checkpoint {
            return false;
        }
        self.player.set_checkpoint(target);
        info!("[HiveBound] Checkpoint moved to {:?}", target);
        true
    }

    fn observation(&self) -> Observation {
        let center = self.player.center();
        match self.config.env.observation {
            ObservationMode::PlayerCenter => vec![center.x, center.y],
            ObservationMode::Full => {
                let mut obs = Vec::with_capacity(self.observation_space().shape);
                obs.extend([center.x, center.y]);
                for rect in &self.map.rects {
                    obs.extend(rect.to_array());
                }
                for guard in &self.guards {
                    obs.extend(guard.rect.to_array());
                }
                obs
            }
        }
    }
}
