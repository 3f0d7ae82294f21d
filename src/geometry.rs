use bevy::math::Vec2;

/// Axis-aligned rectangle in world pixels. The origin is the top-left
/// corner and y grows downward, matching the level image.
#[derive(Clone, Copy, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn set_position(&mut self, pos: Vec2) {
        self.x = pos.x;
        self.y = pos.y;
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.w, self.h)
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Penetration depth along each axis, zero when not overlapping.
    pub fn overlap_depth(&self, other: &Rect) -> Vec2 {
        if !self.overlaps(other) {
            return Vec2::ZERO;
        }
        let dx = self.right().min(other.right()) - self.left().max(other.left());
        let dy = self.bottom().min(other.bottom()) - self.top().max(other.top());
        Vec2::new(dx, dy)
    }

    pub fn is_valid(&self) -> bool {
        self.w > 0.0 && self.h > 0.0 && self.x.is_finite() && self.y.is_finite()
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.w, self.h]
    }
}

impl From<[f32; 4]> for Rect {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&b.translated(Vec2::new(-0.5, 0.0))));
    }

    #[test]
    fn overlap_depth_reports_both_axes() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(7.0, 4.0, 10.0, 10.0);
        assert_eq!(a.overlap_depth(&b), Vec2::new(3.0, 6.0));
        assert_eq!(a.overlap_depth(&Rect::new(50.0, 50.0, 1.0, 1.0)), Vec2::ZERO);
    }

    #[test]
    fn center_uses_half_extents() {
        let r = Rect::new(100.0, 1768.0, 32.0, 32.0);
        assert_eq!(r.center(), Vec2::new(116.0, 1784.0));
        assert_eq!(Rect::from([1.0, 2.0, 3.0, 4.0]).to_array(), [1.0, 2.0, 3.0, 4.0]);
    }
}
