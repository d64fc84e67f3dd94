//! Collision math shared by the mini-game engines.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance_sq(self, other: Vec2) -> f64 {
        let d = self - other;
        d.x * d.x + d.y * d.y
    }

    /// Unit vector, or zero for a zero-length input
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len <= f64::EPSILON {
            Vec2::ZERO
        } else {
            Vec2::new(self.x / len, self.y / len)
        }
    }

    pub fn perpendicular(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size centred on `center`
    pub fn centered(center: Vec2, width: f64, height: f64) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    /// Strict interior test
    pub fn contains(&self, p: Vec2) -> bool {
        p.x > self.x && p.x < self.x + self.width && p.y > self.y && p.y < self.y + self.height
    }

    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(self.x, self.x + self.width),
            p.y.clamp(self.y, self.y + self.height),
        )
    }

    pub fn overlaps_circle(&self, center: Vec2, radius: f64) -> bool {
        center.distance_sq(self.closest_point(center)) < radius * radius
    }
}

pub fn circles_overlap(a: Vec2, ra: f64, b: Vec2, rb: f64) -> bool {
    let reach = ra + rb;
    a.distance_sq(b) < reach * reach
}

/// Keep a circle fully inside a `width` x `height` field
pub fn clamp_to_field(p: Vec2, radius: f64, width: f64, height: f64) -> Vec2 {
    Vec2::new(
        p.x.clamp(radius, width - radius),
        p.y.clamp(radius, height - radius),
    )
}

/// Move a circle by `delta`, sliding along whichever axis is still free when
/// an obstacle blocks the full move. Returns the new centre.
pub fn slide_move(
    from: Vec2,
    delta: Vec2,
    radius: f64,
    obstacles: &[Rect],
    field: (f64, f64),
) -> Vec2 {
    let blocked = |p: Vec2| obstacles.iter().any(|r| r.overlaps_circle(p, radius));
    let target = clamp_to_field(from + delta, radius, field.0, field.1);

    let candidates = [
        target,
        Vec2::new(target.x, from.y),
        Vec2::new(from.x, target.y),
    ];
    candidates
        .into_iter()
        .find(|p| !blocked(*p))
        .unwrap_or(from)
}
