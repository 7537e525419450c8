//! Shape intersection and separation routines
//!
//! Every routine here is pure: it takes shapes by reference or by value and
//! never mutates them. Vehicles, agents, the on-foot player and debris all
//! resolve against static geometry through these functions.
//!
//! Known limitation: the oriented-rect vs box test is a two-sided corner
//! containment check, not a full separating-axis test. Two rectangles whose
//! edges cross without either containing a corner of the other (a thin "plus"
//! configuration) are reported as not overlapping.

use serde::{Deserialize, Serialize};

use crate::util::vec2::Vec2;

/// Axis-aligned rectangle in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Build from top-left corner and size
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + width, y + height),
        }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    #[inline]
    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width() * 0.5, self.height() * 0.5)
    }

    /// Corners in order top-left, top-right, bottom-right, bottom-left
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    /// Strict interior test (points on the boundary are outside)
    #[inline]
    pub fn contains_strict(&self, p: Vec2) -> bool {
        p.x > self.min.x && p.x < self.max.x && p.y > self.min.y && p.y < self.max.y
    }

    #[inline]
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    /// Strict overlap of the two interiors
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec2::new(margin, margin),
            max: self.max + Vec2::new(margin, margin),
        }
    }

    /// Finite coordinates and strictly positive size
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.width() > 0.0 && self.height() > 0.0
    }
}

/// Rectangle rotated about its centre
///
/// `half_extents.x` is half the width (local x axis), `half_extents.y` half
/// the height (local y axis). The local x axis points along `(cos a, sin a)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedRect {
    pub center: Vec2,
    pub half_extents: Vec2,
    pub angle: f32,
}

impl OrientedRect {
    pub fn new(center: Vec2, width: f32, height: f32, angle: f32) -> Self {
        Self {
            center,
            half_extents: Vec2::new(width * 0.5, height * 0.5),
            angle,
        }
    }

    /// World point into the rect's local frame
    #[inline]
    pub fn to_local(&self, p: Vec2) -> Vec2 {
        (p - self.center).unrotate(self.angle)
    }

    /// Local point back into world space
    #[inline]
    pub fn to_world(&self, local: Vec2) -> Vec2 {
        self.center + local.rotate(self.angle)
    }

    pub fn corners(&self) -> [Vec2; 4] {
        let h = self.half_extents;
        [
            self.to_world(Vec2::new(-h.x, -h.y)),
            self.to_world(Vec2::new(h.x, -h.y)),
            self.to_world(Vec2::new(h.x, h.y)),
            self.to_world(Vec2::new(-h.x, h.y)),
        ]
    }

    #[inline]
    pub fn contains_strict(&self, p: Vec2) -> bool {
        let local = self.to_local(p);
        local.x.abs() < self.half_extents.x && local.y.abs() < self.half_extents.y
    }

    /// Tight axis-aligned bounds of the rotated corners
    pub fn bounding_aabb(&self) -> Aabb {
        let corners = self.corners();
        let mut min = corners[0];
        let mut max = corners[0];
        for c in &corners[1..] {
            min = Vec2::new(min.x.min(c.x), min.y.min(c.y));
            max = Vec2::new(max.x.max(c.x), max.y.max(c.y));
        }
        Aabb { min, max }
    }
}

/// Closed set of collider shapes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { center: Vec2, radius: f32 },
    Aabb(Aabb),
    Oriented(OrientedRect),
}

impl Shape {
    #[inline]
    pub fn circle(center: Vec2, radius: f32) -> Self {
        Shape::Circle { center, radius }
    }

    /// Broadphase bounds
    pub fn bounds(&self) -> Aabb {
        match self {
            Shape::Circle { center, radius } => {
                Aabb::from_center(*center, Vec2::new(*radius, *radius))
            }
            Shape::Aabb(rect) => *rect,
            Shape::Oriented(rect) => rect.bounding_aabb(),
        }
    }
}

/// Minimum separating vector for an overlapping pair
///
/// Moving the first shape by `normal * depth` separates it from the second.
/// `contact` is the point on the second shape closest to the first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    pub normal: Vec2,
    pub depth: f32,
    pub contact: Vec2,
}

impl Separation {
    /// Same contact seen from the other shape
    fn flipped(self, contact: Vec2) -> Self {
        Self {
            normal: -self.normal,
            depth: self.depth,
            contact,
        }
    }
}

/// Direction that pushes `point` out of `rect`, with the contact point on it.
///
/// Outside the box this is the closest-point normal. Inside (or on the
/// boundary) it exits through the nearest edge; the returned distance is then
/// negative (the distance to that edge).
pub fn aabb_exit_direction(point: Vec2, rect: &Aabb) -> (Vec2, Vec2, f32) {
    let closest = rect.closest_point(point);
    let delta = point - closest;
    let dist = delta.length();
    if dist > f32::EPSILON {
        return (delta * (1.0 / dist), closest, dist);
    }

    let left = point.x - rect.min.x;
    let right = rect.max.x - point.x;
    let top = point.y - rect.min.y;
    let bottom = rect.max.y - point.y;

    let mut best = (Vec2::new(-1.0, 0.0), Vec2::new(rect.min.x, point.y), left);
    if right < best.2 {
        best = (Vec2::new(1.0, 0.0), Vec2::new(rect.max.x, point.y), right);
    }
    if top < best.2 {
        best = (Vec2::new(0.0, -1.0), Vec2::new(point.x, rect.min.y), top);
    }
    if bottom < best.2 {
        best = (Vec2::new(0.0, 1.0), Vec2::new(point.x, rect.max.y), bottom);
    }
    (best.0, best.1, -best.2)
}

// ============================================================================
// Circle
// ============================================================================

#[inline]
pub fn circle_overlaps_aabb(center: Vec2, radius: f32, rect: &Aabb) -> bool {
    center.distance_sq_to(rect.closest_point(center)) < radius * radius
}

pub fn circle_aabb_separation(center: Vec2, radius: f32, rect: &Aabb) -> Option<Separation> {
    if !circle_overlaps_aabb(center, radius, rect) {
        return None;
    }
    let (normal, contact, signed_dist) = aabb_exit_direction(center, rect);
    Some(Separation {
        normal,
        depth: radius - signed_dist,
        contact,
    })
}

pub fn circle_circle_separation(
    a: Vec2,
    radius_a: f32,
    b: Vec2,
    radius_b: f32,
) -> Option<Separation> {
    let delta = a - b;
    let min_dist = radius_a + radius_b;
    let dist_sq = delta.length_sq();
    if dist_sq >= min_dist * min_dist {
        return None;
    }
    let dist = dist_sq.sqrt();
    // Coincident centres have no stable direction; push along +x
    let normal = delta.normalize_or(Vec2::X);
    Some(Separation {
        normal,
        depth: min_dist - dist,
        contact: b + normal * radius_b,
    })
}

#[inline]
pub fn circle_overlaps_oriented(center: Vec2, radius: f32, rect: &OrientedRect) -> bool {
    let local = rect.to_local(center);
    let clamped = local.clamp(-rect.half_extents, rect.half_extents);
    local.distance_sq_to(clamped) < radius * radius
}

/// Circle against a rotated rect, solved in the rect's frame
pub fn circle_oriented_separation(
    center: Vec2,
    radius: f32,
    rect: &OrientedRect,
) -> Option<Separation> {
    let local = rect.to_local(center);
    let local_box = Aabb::from_center(Vec2::ZERO, rect.half_extents);
    let sep = circle_aabb_separation(local, radius, &local_box)?;
    Some(Separation {
        normal: sep.normal.rotate(rect.angle),
        depth: sep.depth,
        contact: rect.to_world(sep.contact),
    })
}

// ============================================================================
// Rectangles
// ============================================================================

/// Two-sided corner containment test (see module docs for the blind spot)
pub fn oriented_overlaps_aabb(rect: &OrientedRect, aabb: &Aabb) -> bool {
    rect.corners().iter().any(|&c| aabb.contains_strict(c))
        || aabb.corners().iter().any(|&c| rect.contains_strict(c))
}

/// Oriented rect against a box, pushing the rect out along the direction
/// from the box's closest point to the rect centre.
pub fn oriented_aabb_separation(rect: &OrientedRect, aabb: &Aabb) -> Option<Separation> {
    if !oriented_overlaps_aabb(rect, aabb) {
        return None;
    }
    let (normal, contact, _) = aabb_exit_direction(rect.center, aabb);
    Some(Separation {
        normal,
        depth: projected_depth(&rect.corners(), &aabb.corners(), normal),
        contact,
    })
}

pub fn oriented_overlaps_oriented(a: &OrientedRect, b: &OrientedRect) -> bool {
    a.corners().iter().any(|&c| b.contains_strict(c))
        || b.corners().iter().any(|&c| a.contains_strict(c))
}

pub fn oriented_oriented_separation(a: &OrientedRect, b: &OrientedRect) -> Option<Separation> {
    if !oriented_overlaps_oriented(a, b) {
        return None;
    }
    // Push along b's face axis that best matches the centre offset
    let offset = a.center - b.center;
    let local = offset.unrotate(b.angle);
    let local_normal = if local.x.abs() * b.half_extents.y >= local.y.abs() * b.half_extents.x {
        Vec2::new(local.x.signum(), 0.0)
    } else {
        Vec2::new(0.0, local.y.signum())
    };
    let normal = local_normal.rotate(b.angle).normalize_or(Vec2::X);
    let contact = b.to_world(local.clamp(-b.half_extents, b.half_extents));
    Some(Separation {
        normal,
        depth: projected_depth(&a.corners(), &b.corners(), normal),
        contact,
    })
}

fn aabb_aabb_separation(a: &Aabb, b: &Aabb) -> Option<Separation> {
    if !a.intersects(b) {
        return None;
    }
    let push_left = a.max.x - b.min.x;
    let push_right = b.max.x - a.min.x;
    let push_up = a.max.y - b.min.y;
    let push_down = b.max.y - a.min.y;

    let mut best = (Vec2::new(-1.0, 0.0), push_left);
    for candidate in [
        (Vec2::new(1.0, 0.0), push_right),
        (Vec2::new(0.0, -1.0), push_up),
        (Vec2::new(0.0, 1.0), push_down),
    ] {
        if candidate.1 < best.1 {
            best = candidate;
        }
    }
    Some(Separation {
        normal: best.0,
        depth: best.1,
        contact: b.closest_point(a.center()),
    })
}

/// How far `moving` must travel along `normal` to clear `fixed`
fn projected_depth(moving: &[Vec2; 4], fixed: &[Vec2; 4], normal: Vec2) -> f32 {
    let moving_min = moving
        .iter()
        .map(|c| c.dot(normal))
        .fold(f32::INFINITY, f32::min);
    let fixed_max = fixed
        .iter()
        .map(|c| c.dot(normal))
        .fold(f32::NEG_INFINITY, f32::max);
    (fixed_max - moving_min).max(0.0)
}

// ============================================================================
// Segments and line of sight
// ============================================================================

/// Strict counter-clockwise orientation of (a, b, c)
#[inline]
fn ccw(a: Vec2, b: Vec2, c: Vec2) -> bool {
    (c.y - a.y) * (b.x - a.x) > (b.y - a.y) * (c.x - a.x)
}

/// Proper intersection of segments p1-p2 and p3-p4 (collinear overlaps are not reported)
#[inline]
pub fn segment_intersects_segment(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> bool {
    ccw(p1, p3, p4) != ccw(p2, p3, p4) && ccw(p1, p2, p3) != ccw(p1, p2, p4)
}

/// Segment against the four edges of a box
///
/// A segment lying entirely inside the box crosses no edge and is not reported.
pub fn segment_intersects_aabb(a: Vec2, b: Vec2, rect: &Aabb) -> bool {
    let [tl, tr, br, bl] = rect.corners();
    segment_intersects_segment(a, b, tl, tr)
        || segment_intersects_segment(a, b, tr, br)
        || segment_intersects_segment(a, b, br, bl)
        || segment_intersects_segment(a, b, bl, tl)
}

/// True when no blocker crosses the segment between `a` and `b`.
///
/// Endpoints are put in a canonical order first so the answer does not
/// depend on which end is the observer.
pub fn has_line_of_sight<'a, I>(a: Vec2, b: Vec2, blockers: I) -> bool
where
    I: IntoIterator<Item = &'a Aabb>,
{
    let (start, end) = if (a.x, a.y) <= (b.x, b.y) { (a, b) } else { (b, a) };
    !blockers
        .into_iter()
        .any(|rect| segment_intersects_aabb(start, end, rect))
}

// ============================================================================
// Shape dispatch
// ============================================================================

pub fn overlaps(a: &Shape, b: &Shape) -> bool {
    match (a, b) {
        (Shape::Circle { center: ca, radius: ra }, Shape::Circle { center: cb, radius: rb }) => {
            let r = ra + rb;
            ca.distance_sq_to(*cb) < r * r
        }
        (Shape::Circle { center, radius }, Shape::Aabb(rect))
        | (Shape::Aabb(rect), Shape::Circle { center, radius }) => {
            circle_overlaps_aabb(*center, *radius, rect)
        }
        (Shape::Circle { center, radius }, Shape::Oriented(rect))
        | (Shape::Oriented(rect), Shape::Circle { center, radius }) => {
            circle_overlaps_oriented(*center, *radius, rect)
        }
        (Shape::Aabb(x), Shape::Aabb(y)) => x.intersects(y),
        (Shape::Oriented(rect), Shape::Aabb(aabb)) | (Shape::Aabb(aabb), Shape::Oriented(rect)) => {
            oriented_overlaps_aabb(rect, aabb)
        }
        (Shape::Oriented(x), Shape::Oriented(y)) => oriented_overlaps_oriented(x, y),
    }
}

/// Separation that moves `a` out of `b`, or `None` when they do not overlap
pub fn separation(a: &Shape, b: &Shape) -> Option<Separation> {
    match (a, b) {
        (Shape::Circle { center: ca, radius: ra }, Shape::Circle { center: cb, radius: rb }) => {
            circle_circle_separation(*ca, *ra, *cb, *rb)
        }
        (Shape::Circle { center, radius }, Shape::Aabb(rect)) => {
            circle_aabb_separation(*center, *radius, rect)
        }
        (Shape::Aabb(rect), Shape::Circle { center, radius }) => {
            let sep = circle_aabb_separation(*center, *radius, rect)?;
            Some(sep.flipped(*center - sep.normal * *radius))
        }
        (Shape::Circle { center, radius }, Shape::Oriented(rect)) => {
            circle_oriented_separation(*center, *radius, rect)
        }
        (Shape::Oriented(rect), Shape::Circle { center, radius }) => {
            let sep = circle_oriented_separation(*center, *radius, rect)?;
            Some(sep.flipped(*center - sep.normal * *radius))
        }
        (Shape::Aabb(x), Shape::Aabb(y)) => aabb_aabb_separation(x, y),
        (Shape::Oriented(rect), Shape::Aabb(aabb)) => oriented_aabb_separation(rect, aabb),
        (Shape::Aabb(aabb), Shape::Oriented(rect)) => {
            let sep = oriented_aabb_separation(rect, aabb)?;
            Some(sep.flipped(rect.center))
        }
        (Shape::Oriented(x), Shape::Oriented(y)) => oriented_oriented_separation(x, y),
    }
}
