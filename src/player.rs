use bevy::math::Vec2;

use crate::config::PlayerConfig;
use crate::geometry::Rect;
use crate::physics::{self, MotionParams};

/// Discrete control action. Indices follow the training interface:
/// 0 = up (jump), 1 = left, 2 = down, 3 = right, 4 = none.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Up,
    Left,
    Down,
    Right,
    #[default]
    None,
}

impl Action {
    pub const COUNT: usize = 5;
    pub const ALL: [Action; Self::COUNT] = [
        Action::Up,
        Action::Left,
        Action::Down,
        Action::Right,
        Action::None,
    ];

    /// Out-of-range indices are a no-op rather than an error.
    pub fn from_index(index: i64) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or(Action::None)
    }

    pub fn index(self) -> usize {
        match self {
            Action::Up => 0,
            Action::Left => 1,
            Action::Down => 2,
            Action::Right => 3,
            Action::None => 4,
        }
    }
}

impl From<i64> for Action {
    fn from(index: i64) -> Self {
        Self::from_index(index)
    }
}

/// Movement intents currently held, one flag per direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Intents {
    pub up: bool,
    pub left: bool,
    pub down: bool,
    pub right: bool,
}

impl Intents {
    pub fn from_action(action: Action) -> Self {
        Self {
            up: action == Action::Up,
            left: action == Action::Left,
            down: action == Action::Down,
            right: action == Action::Right,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Support {
    Grounded,
    Airborne,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    Idle,
    MovingLeft,
    MovingRight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerState {
    pub support: Support,
    pub motion: Motion,
}

/// What happened during one [`Player::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerTick {
    pub jumped: bool,
    pub landed: bool,
    pub hit_ceiling: bool,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub rect: Rect,
    pub velocity: Vec2,
    pub checkpoint: Vec2,
    pub grounded: bool,
    intents: Intents,
    config: PlayerConfig,
}

impl Player {
    pub fn new(config: PlayerConfig, spawn: Vec2, checkpoint: Vec2) -> Self {
        Self {
            rect: Rect::new(spawn.x, spawn.y, config.width, config.height),
            velocity: Vec2::ZERO,
            checkpoint,
            grounded: false,
            intents: Intents::default(),
            config,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn intents(&self) -> Intents {
        self.intents
    }

    pub fn center(&self) -> Vec2 {
        self.rect.center()
    }

    pub fn state(&self) -> PlayerState {
        let support = if self.grounded {
            Support::Grounded
        } else {
            Support::Airborne
        };
        let motion = if self.intents.left {
            Motion::MovingLeft
        } else if self.intents.right {
            Motion::MovingRight
        } else {
            Motion::Idle
        };
        PlayerState { support, motion }
    }

    /// Replaces the held intents with the ones `action` stands for. Left and
    /// right are mutually exclusive by construction.
    pub fn apply_action(&mut self, action: Action) {
        self.intents = Intents::from_action(action);
    }

    pub fn update(&mut self, obstacles: &[Rect], dt: f32) -> PlayerTick {
        let mut tick = PlayerTick::default();
        self.grounded = physics::is_grounded(&self.rect, obstacles);

        self.velocity.x = physics::horizontal_velocity(
            self.intents.left,
            self.intents.right,
            self.config.move_speed,
        );
        tick.jumped = physics::try_jump(
            self.grounded,
            self.intents.up,
            self.config.jump_velocity,
            &mut self.velocity.y,
        );
        if tick.jumped {
            self.grounded = false;
        }

        let multiplier = if self.intents.down && !self.grounded {
            self.config.fast_fall_multiplier
        } else {
            1.0
        };
        physics::apply_gravity(&mut self.velocity.y, self.config.gravity, multiplier, dt);

        let was_grounded = self.grounded;
        let out = physics::resolve_motion(
            obstacles,
            MotionParams {
                rect: self.rect,
                velocity: self.velocity,
                dt,
            },
        );
        self.rect = out.rect;
        self.velocity = out.velocity;
        self.grounded = out.landed || physics::is_grounded(&self.rect, obstacles);
        tick.landed = self.grounded && !was_grounded;
        tick.hit_ceiling = out.hit_ceiling;
        tick
    }

    pub fn set_checkpoint(&mut self, checkpoint: Vec2) {
        self.checkpoint = checkpoint;
    }

    /// Teleports to the checkpoint with zero velocity and no held intents.
    pub fn jump_to_checkpoint(&mut self) {
        self.rect.set_position(self.checkpoint);
        self.velocity = Vec2::ZERO;
        self.intents = Intents::default();
        self.grounded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 30.0;

    fn floor() -> Rect {
        Rect::new(0.0, 1800.0, 300.0, 40.0)
    }

    fn grounded_player() -> Player {
        Player::new(
            PlayerConfig::default(),
            Vec2::new(100.0, 1768.0),
            Vec2::new(100.0, 1736.0),
        )
    }

    #[test]
    fn action_indices_round_trip_and_out_of_range_is_none() {
        for action in Action::ALL {
            assert_eq!(Action::from_index(action.index() as i64), action);
        }
        assert_eq!(Action::from_index(5), Action::None);
        assert_eq!(Action::from_index(-1), Action::None);
    }

    #[test]
    fn left_and_right_are_exclusive() {
        let mut player = grounded_player();
        player.apply_action(Action::Left);
        assert_eq!(player.state().motion, Motion::MovingLeft);
        player.apply_action(Action::Right);
        assert!(!player.intents().left);
        assert_eq!(player.state().motion, Motion::MovingRight);
        player.apply_action(Action::None);
        assert_eq!(player.intents(), Intents::default());
    }

    #[test]
    fn jump_requires_ground() {
        let obstacles = [floor()];
        let mut player = grounded_player();
        player.apply_action(Action::Up);
        let tick = player.update(&obstacles, DT);
        assert!(tick.jumped);
        assert!(player.rect.y < 1768.0);
        assert_eq!(player.state().support, Support::Airborne);

        let vy_before = player.velocity.y;
        let tick = player.update(&obstacles, DT);
        assert!(!tick.jumped);
        assert!(player.velocity.y > vy_before);
    }

    #[test]
    fn resting_on_floor_stays_grounded() {
        let obstacles = [floor()];
        let mut player = grounded_player();
        for _ in 0..10 {
            player.apply_action(Action::None);
            player.update(&obstacles, DT);
        }
        assert_eq!(player.rect.y, 1768.0);
        assert!(player.grounded);
        assert_eq!(player.velocity, Vec2::ZERO);
    }

    #[test]
    fn falls_and_lands_after_respawn() {
        let obstacles = [floor()];
        let mut player = grounded_player();
        player.jump_to_checkpoint();
        let mut landed = false;
        for _ in 0..30 {
            landed |= player.update(&obstacles, DT).landed;
        }
        assert!(landed);
        assert_eq!(player.rect.bottom(), 1800.0);
    }

    #[test]
    fn checkpoint_restores_exact_position_and_zero_velocity() {
        let mut player = grounded_player();
        player.velocity = Vec2::new(120.0, -300.0);
        player.rect.x = 250.0;
        player.set_checkpoint(Vec2::new(40.0, 900.0));
        player.jump_to_checkpoint();
        assert_eq!(player.rect.position(), Vec2::new(40.0, 900.0));
        assert_eq!(player.velocity, Vec2::ZERO);
    }

    #[test]
    fn moving_right_advances_by_move_speed() {
        let obstacles = [floor()];
        let mut player = grounded_player();
        player.apply_action(Action::Right);
        player.update(&obstacles, DT);
        let expected = 100.0 + PlayerConfig::default().move_speed * DT;
        assert!((player.rect.x - expected).abs() < 1e-3);
    }
}
