use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::CameraConfig;
use crate::error::ConfigError;

pub const CONFIG_ENV_VAR: &str = "HIVEBOUND_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "hivebound.json";

/// Player physics constants. Units are pixels and seconds; y grows downward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub width: f32,
    pub height: f32,
    pub move_speed: f32,
    pub jump_velocity: f32,
    pub gravity: f32,
    pub fast_fall_multiplier: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            width: 32.0,
            height: 32.0,
            move_speed: 150.0,
            jump_velocity: 520.0,
            gravity: 1400.0,
            fast_fall_multiplier: 2.0,
        }
    }
}

/// Defaults for guard spawn records that leave a value out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub width: f32,
    pub height: f32,
    pub speed: f32,
    pub patrol_distance: f32,
    pub detection_range: f32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            width: 32.0,
            height: 32.0,
            speed: 30.0,
            patrol_distance: 120.0,
            detection_range: 200.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationMode {
    /// Player center only: `[cx, cy]`.
    #[default]
    PlayerCenter,
    /// Player center, then every map rect, then every guard rect, flattened.
    Full,
}

/// What a guard sighting does to the episode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPolicy {
    /// Teleport to the checkpoint and keep the episode running.
    #[default]
    Respawn,
    /// Teleport to the checkpoint and end the episode as terminated.
    Terminate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// The episode terminates once the player's top edge is above this y.
    pub goal_y: f32,
    /// Seconds without a new best height before the episode is truncated.
    pub stagnation_budget: f32,
    pub observation: ObservationMode,
    pub detection: DetectionPolicy,
    /// Subtracted from the reward on a tick with a detection.
    pub detection_penalty: f32,
    /// Reset internally when an episode ends. The step that ended it still
    /// returns the pre-reset observation.
    pub auto_reset: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            goal_y: 50.0,
            stagnation_budget: 8.0,
            observation: ObservationMode::PlayerCenter,
            detection: DetectionPolicy::Respawn,
            detection_penalty: 0.0,
            auto_reset: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: f32,
    pub height: f32,
    pub background_color: [f32; 3],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "HiveBound".to_string(),
            width: 600.0,
            height: 600.0,
            background_color: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HiveConfig {
    pub map_path: String,
    /// Logical simulation rate. One `step` advances `1 / tick_hz` seconds.
    pub tick_hz: f32,
    pub player: PlayerConfig,
    pub guard: GuardConfig,
    pub camera: CameraConfig,
    pub env: EnvConfig,
    pub window: WindowConfig,
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            map_path: "assets/map/map.json".to_string(),
            tick_hz: 30.0,
            player: PlayerConfig::default(),
            guard: GuardConfig::default(),
            camera: CameraConfig::default(),
            env: EnvConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

impl HiveConfig {
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_hz
    }

    /// Strict load: a missing or malformed file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Startup load: `$HIVEBOUND_CONFIG` or `hivebound.json`. A missing file
    /// yields defaults; a broken one is reported and replaced by defaults.
    /// Runs before any log subscriber exists, so it prints directly.
    pub fn load_startup() -> Self {
        let path = std::env::var(CONFIG_ENV_VAR)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        if !Path::new(&path).exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                println!("[HiveBound] Loaded config from {}", path);
                config
            }
            Err(e) => {
                eprintln!("[HiveBound] Ignoring config {}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_hz.is_finite() && self.tick_hz > 0.0) {
            return Err(ConfigError::Invalid {
                field: "tick_hz",
                message: format!("must be > 0, got {}", self.tick_hz),
            });
        }
        if !(self.env.stagnation_budget > 0.0) {
            return Err(ConfigError::Invalid {
                field: "env.stagnation_budget",
                message: format!("must be > 0, got {}", self.env.stagnation_budget),
            });
        }
        if self.camera.smoothing < 1.0 {
            return Err(ConfigError::Invalid {
                field: "camera.smoothing",
                message: format!("must be >= 1, got {}", self.camera.smoothing),
            });
        }
        if !(self.player.width > 0.0 && self.player.height > 0.0) {
            return Err(ConfigError::Invalid {
                field: "player",
                message: "width and height must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
