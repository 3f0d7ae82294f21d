use bevy::math::Vec2;

use crate::config::GuardConfig;
use crate::geometry::Rect;
use crate::map::GuardSpawn;

/// Guard state machines never chain more transitions than this per tick.
const MAX_TRANSITIONS_PER_TICK: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Away from the origin, toward `origin + patrol_distance`.
    Forward,
    /// Back toward the origin.
    Backward,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PatrolState {
    Waiting { remaining: f32, then: Direction },
    Moving(Direction),
}

#[derive(Clone, Debug)]
pub struct Guard {
    pub id: String,
    pub rect: Rect,
    origin: Vec2,
    patrol_distance: f32,
    delay: f32,
    pause_at_bounds: bool,
    speed: f32,
    detection_range: f32,
    state: PatrolState,
    /// +1.0 when looking toward +x, -1.0 toward -x.
    facing: f32,
}

impl Guard {
    pub fn spawn(spawn: &GuardSpawn, defaults: &GuardConfig) -> Self {
        let rect = Rect::new(
            spawn.pos.x,
            spawn.pos.y - defaults.height,
            defaults.width,
            defaults.height,
        );
        let patrol_distance = spawn.distance.unwrap_or(defaults.patrol_distance);
        let mut guard = Self {
            id: spawn.id.clone(),
            rect,
            origin: rect.position(),
            patrol_distance,
            delay: spawn.delay.max(0.0),
            pause_at_bounds: spawn.pause_at_bounds,
            speed: spawn.speed.unwrap_or(defaults.speed).max(0.0),
            detection_range: spawn.range.unwrap_or(defaults.detection_range).max(0.0),
            state: PatrolState::Moving(Direction::Forward),
            facing: 1.0,
        };
        guard.reset();
        guard
    }

    /// Back to the spawn position, waiting out the initial delay.
    pub fn reset(&mut self) {
        self.rect.set_position(self.origin);
        self.state = PatrolState::Waiting {
            remaining: self.delay,
            then: Direction::Forward,
        };
        self.facing = self.forward_sign();
    }

    pub fn state(&self) -> PatrolState {
        self.state
    }

    pub fn facing(&self) -> f32 {
        self.facing
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Inclusive x-range the guard patrols.
    pub fn patrol_bounds(&self) -> (f32, f32) {
        let end = self.origin.x + self.patrol_distance;
        (self.origin.x.min(end), self.origin.x.max(end))
    }

    fn forward_sign(&self) -> f32 {
        if self.patrol_distance < 0.0 {
            -1.0
        } else {
            1.0
        }
    }

    fn bound(&self, dir: Direction) -> f32 {
        match dir {
            Direction::Forward => self.origin.x + self.patrol_distance,
            Direction::Backward => self.origin.x,
        }
    }

    fn sign(&self, dir: Direction) -> f32 {
        match dir {
            Direction::Forward => self.forward_sign(),
            Direction::Backward => -self.forward_sign(),
        }
    }

    /// Advances the patrol by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let mut budget = dt.max(0.0);
        for _ in 0..MAX_TRANSITIONS_PER_TICK {
            if budget <= 0.0 {
                break;
            }
            match self.state {
                PatrolState::Waiting { remaining, then } => {
                    if remaining > budget {
                        self.state = PatrolState::Waiting {
                            remaining: remaining - budget,
                            then,
                        };
                        budget = 0.0;
                    } else {
                        budget -= remaining.max(0.0);
                        self.state = PatrolState::Moving(then);
                        self.facing = self.sign(then);
                    }
                }
                PatrolState::Moving(dir) => {
                    if self.speed <= 0.0 {
                        break;
                    }
                    self.facing = self.sign(dir);
                    let target = self.bound(dir);
                    let remaining = (target - self.rect.x).abs();
                    let travel = self.speed * budget;
                    if travel < remaining {
                        self.rect.x += self.facing * travel;
                        budget = 0.0;
                    } else {
                        self.rect.x = target;
                        budget -= remaining / self.speed;
                        let next = dir.reversed();
                        self.state = if self.pause_at_bounds {
                            PatrolState::Waiting {
                                remaining: self.delay,
                                then: next,
                            }
                        } else {
                            PatrolState::Moving(next)
                        };
                    }
                }
            }
        }
        let (lo, hi) = self.patrol_bounds();
        self.rect.x = self.rect.x.clamp(lo, hi);
    }

    /// The box the guard can see: `detection_range` long, in front of the
    /// guard along its facing, as tall as the guard.
    pub fn detection_rect(&self) -> Rect {
        let x = if self.facing > 0.0 {
            self.rect.right()
        } else {
            self.rect.left() - self.detection_range
        };
        Rect::new(x, self.rect.y, self.detection_range, self.rect.h)
    }

    /// Per-tick test in world coordinates; no memory between ticks.
    pub fn detect_target(&self, target: &Rect) -> bool {
        self.detection_range > 0.0 && self.detection_rect().overlaps(target)
    }
}
