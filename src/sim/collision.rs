//! Collision detection and response for axis-aligned geometry
//!
//! Coordinates are canvas-style: +x right, +y down, so a rectangle's top edge
//! is its smallest y.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (top-left origin)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
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

    /// Rectangle centered on `center` with half extents `half`
    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self::new(center.x - half.x, center.y - half.y, half.x * 2.0, half.y * 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.w * 0.5, self.h * 0.5)
    }

    /// Closest point on (or in) the rectangle to `p`
    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(self.x, self.right()), p.y.clamp(self.y, self.bottom()))
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        overlaps(self.x, self.y, self.w, self.h, other.x, other.y, other.w, other.h)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub const fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.center, Vec2::splat(self.radius))
    }
}

/// AABB overlap with half-open edges: touching rectangles do not overlap
#[allow(clippy::too_many_arguments)]
#[inline]
pub fn overlaps(ax: f32, ay: f32, aw: f32, ah: f32, bx: f32, by: f32, bw: f32, bh: f32) -> bool {
    ax < bx + bw && ax + aw > bx && ay < by + bh && ay + ah > by
}

/// Strict circle overlap (touching circles do not overlap)
#[inline]
pub fn circles_overlap(a: Circle, b: Circle) -> bool {
    let r = a.radius + b.radius;
    a.center.distance_squared(b.center) < r * r
}

/// Result of a circle-rectangle contact test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Closest point on the rectangle
    pub point: Vec2,
    /// Separating axis, pointing from the rectangle toward the circle
    pub normal: Vec2,
    /// Overlap along the separating axis
    pub penetration: f32,
}

/// Detect circle-rectangle overlap and pick the separating axis.
///
/// The axis with the smaller overlap wins. A center inside the rectangle
/// always separates upward through the top edge.
pub fn circle_rect_contact(circle: Circle, rect: &Rect) -> Option<Contact> {
    let point = rect.clamp_point(circle.center);
    let d = circle.center - point;
    let dist_sq = d.length_squared();
    if dist_sq >= circle.radius * circle.radius {
        return None;
    }

    if d == Vec2::ZERO {
        return Some(Contact {
            point: Vec2::new(circle.center.x, rect.y),
            normal: Vec2::NEG_Y,
            penetration: circle.center.y - rect.y + circle.radius,
        });
    }

    let overlap_x = circle.radius - d.x.abs();
    let overlap_y = circle.radius - d.y.abs();
    if overlap_x < overlap_y {
        let sign = if d.x >= 0.0 { 1.0 } else { -1.0 };
        Some(Contact {
            point,
            normal: Vec2::new(sign, 0.0),
            penetration: overlap_x,
        })
    } else {
        let sign = if d.y >= 0.0 { 1.0 } else { -1.0 };
        Some(Contact {
            point,
            normal: Vec2::new(0.0, sign),
            penetration: overlap_y,
        })
    }
}

/// Push a circle out of a rectangle and point its velocity away.
///
/// Mutates `pos` and `vel` on contact. The velocity component along the
/// separating axis keeps its magnitude and takes the normal's sign.
pub fn resolve_circle_rect(pos: &mut Vec2, vel: &mut Vec2, radius: f32, rect: &Rect) -> Option<Contact> {
    let contact = circle_rect_contact(Circle::new(*pos, radius), rect)?;
    if contact.normal.x != 0.0 {
        vel.x = vel.x.abs() * contact.normal.x;
        pos.x += contact.normal.x * contact.penetration;
    } else {
        // An inside center carries the full depth to the top edge, landing at top - r
        vel.y = vel.y.abs() * contact.normal.y;
        pos.y += contact.normal.y * contact.penetration;
    }
    Some(contact)
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Keep a circle inside `bounds` on the left, right and top walls.
///
/// Returns true if any wall was hit. The bottom edge is left open so the
/// caller can treat it as a loss line.
pub fn bounce_in_bounds(pos: &mut Vec2, vel: &mut Vec2, radius: f32, bounds: &Rect) -> bool {
    let mut hit = false;
    if pos.x - radius < bounds.x {
        pos.x = bounds.x + radius;
        vel.x = vel.x.abs();
        hit = true;
    } else if pos.x + radius > bounds.right() {
        pos.x = bounds.right() - radius;
        vel.x = -vel.x.abs();
        hit = true;
    }
    if pos.y - radius < bounds.y {
        pos.y = bounds.y + radius;
        vel.y = vel.y.abs();
        hit = true;
    }
    hit
}
