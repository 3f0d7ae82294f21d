use bevy::math::Vec2;

use crate::camera::Camera;
use crate::geometry::Rect;
use crate::guard::Guard;
use crate::map::LevelMap;
use crate::player::Player;

/// sRGB with alpha, each channel in `0.0..=1.0`.
pub type Rgba = [f32; 4];

pub const BACKGROUND: Rgba = [0.0, 0.0, 0.0, 1.0];
pub const OBSTACLE: Rgba = [0.35, 0.32, 0.28, 1.0];
pub const CHECKPOINT_ZONE: Rgba = [0.2, 0.8, 0.3, 0.25];
pub const GUARD: Rgba = [0.85, 0.2, 0.15, 1.0];
pub const GUARD_VISION: Rgba = [1.0, 0.9, 0.4, 0.3];
pub const PLAYER: Rgba = [0.2, 0.4, 0.9, 1.0];

/// Below this y the screen starts fading to white as the player nears home.
pub const HOME_FADE_START: f32 = 250.0;

/// Drawing sink supplied by the presentation layer. Coordinates are surface
/// pixels, origin top-left, y down.
pub trait RenderSurface {
    fn size(&self) -> Vec2;
    fn clear(&mut self, color: Rgba);
    fn fill_rect(&mut self, rect: Rect, color: Rgba);
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear(Rgba),
    FillRect(Rect, Rgba),
}

/// Surface that records draw calls instead of rasterizing them.
#[derive(Clone, Debug, Default)]
pub struct FrameRecorder {
    pub size: Vec2,
    pub commands: Vec<DrawCommand>,
}

impl FrameRecorder {
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            commands: Vec::new(),
        }
    }

    pub fn rects_with_color(&self, color: Rgba) -> impl Iterator<Item = &Rect> + '_ {
        self.commands.iter().filter_map(move |cmd| match cmd {
            DrawCommand::FillRect(rect, c) if *c == color => Some(rect),
            _ => None,
        })
    }
}

impl RenderSurface for FrameRecorder {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn clear(&mut self, color: Rgba) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        self.commands.push(DrawCommand::FillRect(rect, color));
    }
}

/// Borrowed view of everything a frame shows.
pub struct Scene<'a> {
    pub map: &'a LevelMap,
    pub guards: &'a [Guard],
    pub player: &'a Player,
    pub camera: &'a Camera,
}

/// Draws map, checkpoints, guards with their vision boxes, the player and
/// the home fade, scaled from the camera viewport to the surface.
pub fn draw_scene(scene: &Scene<'_>, surface: &mut dyn RenderSurface) {
    let viewport = scene.camera.viewport();
    let projector = Projector {
        camera: scene.camera,
        scale: surface.size() / viewport,
        screen: Rect::new(0.0, 0.0, viewport.x, viewport.y),
    };

    surface.clear(BACKGROUND);
    for rect in &scene.map.rects {
        projector.blit(surface, rect, OBSTACLE);
    }
    for zone in &scene.map.checkpoints {
        projector.blit(surface, zone, CHECKPOINT_ZONE);
    }
    for guard in scene.guards {
        projector.blit(surface, &guard.detection_rect(), GUARD_VISION);
        projector.blit(surface, &guard.rect, GUARD);
    }
    projector.blit(surface, &scene.player.rect, PLAYER);

    let y = scene.player.rect.y;
    if y <= HOME_FADE_START {
        let alpha = ((255.0 - y) / 255.0).clamp(0.0, 1.0);
        let size = surface.size();
        surface.fill_rect(Rect::new(0.0, 0.0, size.x, size.y), [1.0, 1.0, 1.0, alpha]);
    }
}

struct Projector<'a> {
    camera: &'a Camera,
    scale: Vec2,
    screen: Rect,
}

impl Projector<'_> {
    /// World rect to surface pixels; skipped when outside the viewport.
    fn blit(&self, surface: &mut dyn RenderSurface, world: &Rect, color: Rgba) {
        let view = self.camera.world_to_screen(world);
        if !view.overlaps(&self.screen) {
            return;
        }
        let scaled = Rect::new(
            view.x * self.scale.x,
            view.y * self.scale.y,
            view.w * self.scale.x,
            view.h * self.scale.y,
        );
        surface.fill_rect(scaled, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraConfig;
    use crate::config::{GuardConfig, PlayerConfig};

    fn scene_parts() -> (LevelMap, Vec<Guard>, Player, Camera) {
        let map = LevelMap::test_level();
        let guards = map
            .guards
            .iter()
            .map(|g| Guard::spawn(g, &GuardConfig::default()))
            .collect();
        let player = Player::new(PlayerConfig::default(), map.spawn, map.checkpoint);
        let mut camera = Camera::new(CameraConfig::default());
        camera.offset = player.rect.position() - Vec2::new(150.0, 200.0);
        (map, guards, player, camera)
    }

    #[test]
    fn draws_player_at_scaled_screen_position() {
        let (map, guards, player, camera) = scene_parts();
        let mut frame = FrameRecorder::new(Vec2::new(600.0, 600.0));
        draw_scene(
            &Scene {
                map: &map,
                guards: &guards,
                player: &player,
                camera: &camera,
            },
            &mut frame,
        );
        assert_eq!(frame.commands.first(), Some(&DrawCommand::Clear(BACKGROUND)));
        let players: Vec<&Rect> = frame.rects_with_color(PLAYER).collect();
        assert_eq!(players, [&Rect::new(300.0, 400.0, 64.0, 64.0)]);
    }

    #[test]
    fn culls_offscreen_geometry() {
        let (map, guards, player, camera) = scene_parts();
        let mut frame = FrameRecorder::new(Vec2::new(300.0, 300.0));
        draw_scene(
            &Scene {
                map: &map,
                guards: &guards,
                player: &player,
                camera: &camera,
            },
            &mut frame,
        );
        let drawn = frame.rects_with_color(OBSTACLE).count();
        assert!(drawn > 0 && drawn < map.rects.len());
        assert_eq!(frame.rects_with_color(GUARD).count(), 0);
    }

    #[test]
    fn home_fade_covers_surface_near_top() {
        let (map, guards, mut player, mut camera) = scene_parts();
        player.rect.y = 100.0;
        camera.offset = Vec2::ZERO;
        let mut frame = FrameRecorder::new(Vec2::new(300.0, 300.0));
        draw_scene(
            &Scene {
                map: &map,
                guards: &guards,
                player: &player,
                camera: &camera,
            },
            &mut frame,
        );
        let last = frame.commands.last().cloned();
        let alpha = (255.0 - 100.0) / 255.0;
        assert_eq!(
            last,
            Some(DrawCommand::FillRect(
                Rect::new(0.0, 0.0, 300.0, 300.0),
                [1.0, 1.0, 1.0, alpha]
            ))
        );
    }
}
