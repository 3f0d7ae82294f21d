//! Windowed presentation of a [`Simulation`]: fixed-rate stepping driven
//! by the keyboard or a random policy, drawn with gizmos.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::geometry::Rect;
use crate::player::Action;
use crate::render::{DrawCommand, FrameRecorder, Rgba};
use crate::rollout::{EpisodeTracker, Simulation};

/// Who picks the action each tick.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Policy {
    #[default]
    Keyboard,
    Random,
}

/// Last rendered frame, in window pixels with y down.
#[derive(Resource, Default)]
pub struct Frame(pub FrameRecorder);

pub struct ViewerPlugin {
    pub policy: Policy,
    pub seed: Option<u64>,
}

#[derive(Resource)]
struct ViewerSeed(Option<u64>);

impl Plugin for ViewerPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.policy)
            .insert_resource(ViewerSeed(self.seed))
            .init_resource::<Frame>()
            .init_resource::<EpisodeTracker>()
            .add_systems(Startup, (spawn_camera, start_episode))
            .add_systems(FixedUpdate, step_simulation)
            .add_systems(Update, (render_simulation, draw_frame).chain())
            .add_systems(Last, close_on_exit);
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

fn start_episode(
    mut sim: ResMut<Simulation>,
    seed: Res<ViewerSeed>,
    mut tracker: ResMut<EpisodeTracker>,
) {
    sim.reset(seed.0, None);
    tracker.begin(sim.episode());
    info!("[HiveBound] Viewer started (episode {})", sim.episode());
}

/// Jump wins over movement, and left wins over right.
pub fn action_from_keys(keyboard: &ButtonInput<KeyCode>) -> Action {
    let any = |keys: &[KeyCode]| keys.iter().any(|k| keyboard.pressed(*k));
    if any(&[KeyCode::Space, KeyCode::KeyW, KeyCode::ArrowUp]) {
        Action::Up
    } else if any(&[KeyCode::KeyA, KeyCode::ArrowLeft]) {
        Action::Left
    } else if any(&[KeyCode::KeyD, KeyCode::ArrowRight]) {
        Action::Right
    } else if any(&[KeyCode::KeyS, KeyCode::ArrowDown]) {
        Action::Down
    } else {
        Action::None
    }
}

fn step_simulation(
    mut sim: ResMut<Simulation>,
    policy: Res<Policy>,
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    mut tracker: ResMut<EpisodeTracker>,
) {
    if sim.is_closed() {
        return;
    }
    let action = match *policy {
        Policy::Keyboard => keyboard.map(|k| action_from_keys(&k)).unwrap_or_default(),
        Policy::Random => sim.sample_action(),
    };
    let result = sim.step(action);
    let Some(summary) = tracker.record(&result) else {
        return;
    };
    info!(
        "[HiveBound] Episode {} over after {} steps (return {:.1}, terminated {}, truncated {})",
        summary.episode, summary.steps, summary.total_reward, summary.terminated, summary.truncated
    );
    if !sim.config().env.auto_reset {
        sim.reset(None, None);
    }
    tracker.begin(sim.episode());
}

fn render_simulation(
    mut sim: ResMut<Simulation>,
    mut frame: ResMut<Frame>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    frame.0 = FrameRecorder::new(Vec2::new(window.width(), window.height()));
    sim.render(&mut frame.0);
}

fn draw_frame(frame: Res<Frame>, mut gizmos: Gizmos, mut clear: ResMut<ClearColor>) {
    let surface = frame.0.size;
    let mut background: Option<Rgba> = None;
    for command in &frame.0.commands {
        match command {
            DrawCommand::Clear(color) => background = Some(*color),
            DrawCommand::FillRect(rect, color) if covers(rect, surface) => {
                if let Some(bg) = background.as_mut() {
                    *bg = blend(*bg, *color);
                }
            }
            DrawCommand::FillRect(rect, color) => {
                let (center, size) = to_world(rect, surface);
                gizmos.rect_2d(center, size, to_color(*color));
            }
        }
    }
    if let Some(bg) = background {
        clear.0 = to_color(bg);
    }
}

fn close_on_exit(mut exits: EventReader<AppExit>, mut sim: ResMut<Simulation>) {
    if exits.read().next().is_some() {
        sim.close();
    }
}

fn covers(rect: &Rect, surface: Vec2) -> bool {
    rect.x <= 0.0 && rect.y <= 0.0 && rect.right() >= surface.x && rect.bottom() >= surface.y
}

/// Surface pixels (top-left origin, y down) to a Bevy 2D center and size
/// for a camera at the origin.
fn to_world(rect: &Rect, surface: Vec2) -> (Vec2, Vec2) {
    let center = rect.center();
    (
        Vec2::new(center.x - surface.x / 2.0, surface.y / 2.0 - center.y),
        rect.size(),
    )
}

/// `over` composited onto an opaque `base`.
fn blend(base: Rgba, over: Rgba) -> Rgba {
    let a = over[3];
    [
        base[0] + (over[0] - base[0]) * a,
        base[1] + (over[1] - base[1]) * a,
        base[2] + (over[2] - base[2]) * a,
        1.0,
    ]
}

fn to_color(c: Rgba) -> Color {
    Color::srgba(c[0], c[1], c[2], c[3])
}
