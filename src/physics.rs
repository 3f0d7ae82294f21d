use bevy::math::Vec2;

use crate::geometry::Rect;

/// Maximum downward velocity to prevent tunneling through floors at extreme speeds.
pub const MAX_FALL_SPEED: f32 = 900.0;

/// Slack used when deciding which side of an obstacle a mover came from.
const CONTACT_EPS: f32 = 0.01;

#[derive(Clone, Copy, Debug)]
pub struct MotionParams {
    pub rect: Rect,
    pub velocity: Vec2,
    pub dt: f32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MotionResult {
    pub rect: Rect,
    pub velocity: Vec2,
    /// Pushed up out of an obstacle below (landing).
    pub landed: bool,
    /// Pushed down out of an obstacle above.
    pub hit_ceiling: bool,
    pub hit_wall: bool,
}

/// Adds one tick of downward acceleration. `multiplier` scales gravity for
/// fast-fall.
pub fn apply_gravity(vy: &mut f32, gravity: f32, multiplier: f32, dt: f32) {
    *vy += gravity * multiplier * dt;
    *vy = vy.min(MAX_FALL_SPEED);
}

pub fn horizontal_velocity(left: bool, right: bool, speed: f32) -> f32 {
    let mut dir = 0.0;
    if left {
        dir -= 1.0;
    }
    if right {
        dir += 1.0;
    }
    dir * speed
}

/// Fires the jump impulse when grounded. Returns whether it fired.
pub fn try_jump(grounded: bool, wants_jump: bool, jump_velocity: f32, vy: &mut f32) -> bool {
    if grounded && wants_jump {
        *vy = -jump_velocity;
        return true;
    }
    false
}

/// Moves `rect` by `velocity * dt`, resolving X then Y against `obstacles`.
///
/// Each pass clamps the mover against the nearest obstacle edge it crossed
/// and zeroes the velocity on that axis. A mover that starts inside an
/// obstacle is pushed out along the shallower axis afterwards.
pub fn resolve_motion(obstacles: &[Rect], params: MotionParams) -> MotionResult {
    let MotionParams { rect, velocity, dt } = params;
    let mut out = MotionResult {
        rect,
        velocity,
        ..Default::default()
    };

    let dx = velocity.x * dt;
    let (x_rect, blocked_x) = sweep_x(obstacles, rect, dx);
    out.rect = x_rect;
    if blocked_x {
        out.velocity.x = 0.0;
        out.hit_wall = true;
    }

    let dy = velocity.y * dt;
    let (y_rect, blocked_y) = sweep_y(obstacles, out.rect, dy);
    out.rect = y_rect;
    if blocked_y {
        if dy > 0.0 {
            out.landed = true;
        } else {
            out.hit_ceiling = true;
        }
        out.velocity.y = 0.0;
    }

    if let Some(push) = depenetrate(obstacles, &mut out.rect) {
        if push.y < 0.0 {
            out.landed = true;
            out.velocity.y = out.velocity.y.min(0.0);
        } else if push.y > 0.0 {
            out.velocity.y = out.velocity.y.max(0.0);
        }
        if push.x != 0.0 {
            out.velocity.x = 0.0;
        }
    }

    out
}

fn sweep_x(obstacles: &[Rect], rect: Rect, dx: f32) -> (Rect, bool) {
    let mut moved = rect.translated(Vec2::new(dx, 0.0));
    let mut blocked = false;
    if dx == 0.0 {
        return (moved, blocked);
    }
    for obs in obstacles {
        if !moved.overlaps(obs) {
            continue;
        }
        if dx > 0.0 && rect.right() <= obs.left() + CONTACT_EPS {
            moved.x = moved.x.min(obs.left() - moved.w);
            blocked = true;
        } else if dx < 0.0 && rect.left() >= obs.right() - CONTACT_EPS {
            moved.x = moved.x.max(obs.right());
            blocked = true;
        }
    }
    (moved, blocked)
}

fn sweep_y(obstacles: &[Rect], rect: Rect, dy: f32) -> (Rect, bool) {
    let mut moved = rect.translated(Vec2::new(0.0, dy));
    let mut blocked = false;
    if dy == 0.0 {
        return (moved, blocked);
    }
    for obs in obstacles {
        if !moved.overlaps(obs) {
            continue;
        }
        if dy > 0.0 && rect.bottom() <= obs.top() + CONTACT_EPS {
            moved.y = moved.y.min(obs.top() - moved.h);
            blocked = true;
        } else if dy < 0.0 && rect.top() >= obs.bottom() - CONTACT_EPS {
            moved.y = moved.y.max(obs.bottom());
            blocked = true;
        }
    }
    (moved, blocked)
}

/// Minimum-translation push-out for a rect already inside obstacles.
/// Returns the total displacement applied, if any.
fn depenetrate(obstacles: &[Rect], rect: &mut Rect) -> Option<Vec2> {
    let mut total = Vec2::ZERO;
    for obs in obstacles {
        let depth = rect.overlap_depth(obs);
        if depth == Vec2::ZERO {
            continue;
        }
        let center = rect.center();
        let obs_center = obs.center();
        let push = if depth.x < depth.y {
            let dir = if center.x < obs_center.x { -1.0 } else { 1.0 };
            Vec2::new(dir * depth.x, 0.0)
        } else {
            let dir = if center.y < obs_center.y { -1.0 } else { 1.0 };
            Vec2::new(0.0, dir * depth.y)
        };
        *rect = rect.translated(push);
        total += push;
    }
    (total != Vec2::ZERO).then_some(total)
}

/// True when an obstacle sits directly under the rect's feet.
pub fn is_grounded(rect: &Rect, obstacles: &[Rect]) -> bool {
    let probe = Rect::new(rect.x + 1.0, rect.bottom(), (rect.w - 2.0).max(1.0), 1.0);
    obstacles.iter().any(|obs| probe.overlaps(obs))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 30.0;

    fn step(obstacles: &[Rect], rect: Rect, velocity: Vec2) -> MotionResult {
        resolve_motion(obstacles, MotionParams { rect, velocity, dt: DT })
    }

    #[test]
    fn resolve_motion_stops_at_wall() {
        let wall = Rect::new(50.0, 0.0, 10.0, 100.0);
        let out = step(&[wall], Rect::new(10.0, 10.0, 32.0, 32.0), Vec2::new(1200.0, 0.0));
        assert_eq!(out.rect.right(), 50.0);
        assert_eq!(out.velocity.x, 0.0);
        assert!(out.hit_wall);
        assert!(!out.rect.overlaps(&wall));
    }

    #[test]
    fn resolve_motion_lands_on_floor() {
        let floor = Rect::new(0.0, 100.0, 300.0, 20.0);
        let out = step(&[floor], Rect::new(10.0, 60.0, 32.0, 32.0), Vec2::new(0.0, 600.0));
        assert_eq!(out.rect.bottom(), 100.0);
        assert!(out.landed);
        assert_eq!(out.velocity.y, 0.0);
        assert!(is_grounded(&out.rect, &[floor]));
    }

    #[test]
    fn resolve_motion_bumps_ceiling() {
        let ceiling = Rect::new(0.0, 0.0, 300.0, 20.0);
        let out = step(&[ceiling], Rect::new(10.0, 30.0, 32.0, 32.0), Vec2::new(0.0, -900.0));
        assert_eq!(out.rect.top(), 20.0);
        assert!(out.hit_ceiling);
        assert!(!out.landed);
    }

    #[test]
    fn diagonal_move_into_corner_does_not_snag() {
        let floor = Rect::new(0.0, 100.0, 300.0, 20.0);
        let start = Rect::new(10.0, 100.0 - 32.0, 32.0, 32.0);
        let out = step(&[floor], start, Vec2::new(150.0, 300.0));
        assert!(out.rect.x > start.x);
        assert_eq!(out.rect.bottom(), 100.0);
        assert_eq!(out.velocity.x, 150.0);
    }

    #[test]
    fn never_overlaps_after_resolution() {
        let obstacles = [
            Rect::new(0.0, 200.0, 300.0, 20.0),
            Rect::new(120.0, 120.0, 40.0, 80.0),
            Rect::new(40.0, 60.0, 60.0, 10.0),
        ];
        let starts = [
            Rect::new(60.0, 150.0, 32.0, 32.0),
            Rect::new(170.0, 100.0, 32.0, 32.0),
            Rect::new(50.0, 80.0, 32.0, 32.0),
        ];
        let velocities = [
            Vec2::new(900.0, 0.0),
            Vec2::new(-900.0, 900.0),
            Vec2::new(0.0, -900.0),
            Vec2::new(450.0, 900.0),
            Vec2::new(-150.0, -300.0),
        ];
        for start in starts {
            for v in velocities {
                let out = step(&obstacles, start, v);
                for obs in &obstacles {
                    assert!(!out.rect.overlaps(obs), "{start:?} {v:?} overlaps {obs:?}");
                }
            }
        }
    }

    #[test]
    fn embedded_rect_is_pushed_out_along_shallow_axis() {
        let floor = Rect::new(0.0, 100.0, 300.0, 20.0);
        let out = step(&[floor], Rect::new(10.0, 72.0, 32.0, 32.0), Vec2::ZERO);
        assert_eq!(out.rect.bottom(), 100.0);
        assert!(out.landed);
    }

    #[test]
    fn gravity_is_capped() {
        let mut vy = MAX_FALL_SPEED - 1.0;
        apply_gravity(&mut vy, 1400.0, 1.0, DT);
        assert_eq!(vy, MAX_FALL_SPEED);
    }

    #[test]
    fn jump_only_fires_when_grounded() {
        let mut vy = 0.0;
        assert!(!try_jump(false, true, 500.0, &mut vy));
        assert_eq!(vy, 0.0);
        assert!(try_jump(true, true, 500.0, &mut vy));
        assert_eq!(vy, -500.0);
    }
}
