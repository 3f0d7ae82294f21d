use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::player::Intents;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    #[default]
    Follow,
    /// Pans with the held movement intents instead of tracking the player.
    Free,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub mode: CameraMode,
    /// Size of the game surface in world pixels.
    pub viewport: [f32; 2],
    /// Larger is slower; each frame closes `1 / smoothing` of the gap.
    pub smoothing: f32,
    /// The followed point sits at `viewport.y / vertical_anchor` from the top.
    pub vertical_anchor: f32,
    /// Free-mode pan per frame.
    pub free_step: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            mode: CameraMode::Follow,
            viewport: [300.0, 300.0],
            smoothing: 10.0,
            vertical_anchor: 1.5,
            free_step: 5.0,
        }
    }
}

/// Render-only view transform. Nothing in the simulation reads it.
#[derive(Clone, Debug)]
pub struct Camera {
    pub offset: Vec2,
    config: CameraConfig,
}

impl Camera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            offset: Vec2::ZERO,
            config,
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn viewport(&self) -> Vec2 {
        Vec2::from_array(self.config.viewport)
    }

    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
    }

    fn anchor(&self) -> Vec2 {
        let viewport = self.viewport();
        Vec2::new(viewport.x / 2.0, viewport.y / self.config.vertical_anchor)
    }

    /// One frame of camera motion toward `target` (follow mode) or along
    /// `intents` (free mode).
    pub fn update(&mut self, target: Vec2, intents: Intents) {
        match self.config.mode {
            CameraMode::Follow => {
                let smoothing = self.config.smoothing.max(1.0);
                self.offset += (target - self.offset - self.anchor()) / smoothing;
            }
            CameraMode::Free => {
                let step = self.config.free_step;
                if intents.left {
                    self.offset.x -= step;
                }
                if intents.right {
                    self.offset.x += step;
                }
                if intents.up {
                    self.offset.y -= step;
                }
                if intents.down {
                    self.offset.y += step;
                }
            }
        }
    }

    pub fn world_to_screen(&self, rect: &Rect) -> Rect {
        rect.translated(-self.offset)
    }

    pub fn world_to_screen_point(&self, p: Vec2) -> Vec2 {
        p - self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_converges_on_anchored_target() {
        let mut camera = Camera::new(CameraConfig::default());
        let target = Vec2::new(100.0, 1768.0);
        for _ in 0..300 {
            camera.update(target, Intents::default());
        }
        let expected = target - Vec2::new(150.0, 200.0);
        assert!((camera.offset - expected).length() < 0.01);
        let on_screen = camera.world_to_screen_point(target);
        assert!((on_screen - Vec2::new(150.0, 200.0)).length() < 0.01);
    }

    #[test]
    fn follow_moves_a_tenth_of_the_gap() {
        let mut camera = Camera::new(CameraConfig::default());
        camera.update(Vec2::new(250.0, 300.0), Intents::default());
        assert_eq!(camera.offset, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn free_mode_pans_with_intents_and_ignores_target() {
        let mut camera = Camera::new(CameraConfig {
            mode: CameraMode::Free,
            ..Default::default()
        });
        let intents = Intents {
            right: true,
            up: true,
            ..Default::default()
        };
        camera.update(Vec2::new(1000.0, 1000.0), intents);
        camera.update(Vec2::new(1000.0, 1000.0), intents);
        assert_eq!(camera.offset, Vec2::new(10.0, -10.0));
        camera.reset();
        assert_eq!(camera.offset, Vec2::ZERO);
    }
}
