//! Planar-yaw geometry shared by regions, composition and sampling.
//!
//! Every fixture in a scene stands upright: its orientation is a single yaw
//! angle about the world Z axis, while positions remain full 3-D. All
//! rectangle math therefore happens in the XY plane, with the vertical axis
//! handled as an independent interval.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Corner sign pattern, counter-clockwise starting at (+x, +y).
const CORNER_SIGNS: [(f32, f32); 4] = [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)];

/// Rotates `v` about the world Z (up) axis by `yaw` radians.
pub fn rotate_z(v: Vec3, yaw: f32) -> Vec3 {
    let (s, c) = yaw.sin_cos();
    Vec3::new(c * v.x - s * v.y, s * v.x + c * v.y, v.z)
}

/// Rotates a planar vector by `yaw` radians.
pub fn rotate_xy(v: Vec2, yaw: f32) -> Vec2 {
    let (s, c) = yaw.sin_cos();
    Vec2::new(c * v.x - s * v.y, s * v.x + c * v.y)
}

/// A world pose: position plus yaw about the vertical axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World-space position.
    pub pos: Vec3,

    /// Rotation about the world Z axis, in radians.
    pub yaw: f32,
}

impl Pose {
    pub fn new(pos: Vec3, yaw: f32) -> Self {
        Self { pos, yaw }
    }

    /// Maps a point from this pose's local frame into world coordinates.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.pos + rotate_z(local, self.yaw)
    }

    /// Maps a world point into this pose's local frame.
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        rotate_z(world - self.pos, -self.yaw)
    }

    /// The pose of `other` expressed in this pose's frame.
    pub fn rel_pose(&self, other: &Pose) -> Pose {
        Pose {
            pos: self.inverse_transform_point(other.pos),
            yaw: other.yaw - self.yaw,
        }
    }

    /// Maps a pose from this pose's local frame into world coordinates.
    /// Inverse of [`rel_pose`](Self::rel_pose).
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose {
            pos: self.transform_point(local.pos),
            yaw: self.yaw + local.yaw,
        }
    }
}

/// Corners of a rectangle centered at `center` with half-extents `half`,
/// rotated by `yaw`. Counter-clockwise, starting at the (+x, +y) corner.
pub fn footprint_corners(center: Vec2, half: Vec2, yaw: f32) -> [Vec2; 4] {
    CORNER_SIGNS.map(|(sx, sy)| center + rotate_xy(Vec2::new(sx * half.x, sy * half.y), yaw))
}

/// Separating-axis overlap test for two rotated rectangles.
///
/// Touching edges or corners do not count as overlap, so abutting fixtures
/// (a drawer flush against its neighbor) pass.
pub fn rects_overlap(a: &[Vec2; 4], b: &[Vec2; 4]) -> bool {
    // Each rectangle contributes two distinct edge normals as candidate
    // separating axes; a rectangle's other two edges are parallel duplicates.
    let axes = [a[1] - a[0], a[3] - a[0], b[1] - b[0], b[3] - b[0]];
    for edge in axes {
        let axis = Vec2::new(-edge.y, edge.x);
        let (a_min, a_max) = project(a, axis);
        let (b_min, b_max) = project(b, axis);
        if a_max <= b_min || b_max <= a_min {
            return false;
        }
    }
    true
}

fn project(corners: &[Vec2; 4], axis: Vec2) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for c in corners {
        let d = c.dot(axis);
        min = min.min(d);
        max = max.max(d);
    }
    (min, max)
}

/// Distance from point `p` to the segment `a`..`b`.
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// An upright oriented box: center, half-extents and yaw about Z.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UprightBox {
    pub center: Vec3,
    pub half: Vec3,
    pub yaw: f32,
}

impl UprightBox {
    /// The box's horizontal cross-section as a rotated rectangle.
    pub fn footprint(&self) -> [Vec2; 4] {
        footprint_corners(self.center.truncate(), self.half.truncate(), self.yaw)
    }

    /// All eight corners, bottom face first, matching [`footprint`](Self::footprint) order.
    pub fn corners(&self) -> [Vec3; 8] {
        let fp = self.footprint();
        let mut out = [Vec3::ZERO; 8];
        for (i, c) in fp.iter().enumerate() {
            out[i] = c.extend(self.center.z - self.half.z);
            out[i + 4] = c.extend(self.center.z + self.half.z);
        }
        out
    }
}

/// Intersection test for two upright boxes.
///
/// Upright boxes share the world Z axis, so the vertical interval separates
/// independently and the horizontal test reduces to rectangle SAT.
pub fn boxes_intersect(a: &UprightBox, b: &UprightBox) -> bool {
    if (a.center.z - b.center.z).abs() >= a.half.z + b.half.z {
        return false;
    }
    rects_overlap(&a.footprint(), &b.footprint())
}

/// Minimum distance between the corner sets of two upright boxes.
///
/// A coarse proximity measure: zero only when corners coincide, small when
/// the boxes are close. Used for nearest-fixture queries, not for contact.
pub fn corner_distance(a: &UprightBox, b: &UprightBox) -> f32 {
    let mut best = f32::INFINITY;
    for ca in a.corners() {
        for cb in b.corners() {
            best = best.min(ca.distance(cb));
        }
    }
    best
}
