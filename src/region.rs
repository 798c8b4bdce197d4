//! The region model: named box volumes attached to fixtures.
//!
//! A region is an axis-aligned box in its owning fixture's local frame;
//! the fixture's world yaw orients it. Regions drive every containment and
//! placement decision, so their corners are always recomputed from
//! `center ± half_extents` rather than cached, keeping rescaling exact.

use crate::engine::GeometryDescription;
use crate::geom::{Pose, footprint_corners};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Geometry elements whose names start with this prefix become regions.
pub const REGION_PREFIX: &str = "reg_";

/// The region holding a fixture's exterior box, when present.
pub const MAIN_REGION: &str = "main";

/// Fallback exterior region name.
pub const BBOX_REGION: &str = "bbox";

/// A named box volume in the owning fixture's local frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Region name, without the marker prefix.
    pub name: String,

    /// Box center in the fixture's authored frame.
    pub center: Vec3,

    /// Non-negative half-extents along the fixture's local axes.
    pub half_extents: Vec3,
}

impl Region {
    /// Builds a region, clamping half-extents to be non-negative.
    pub fn from_box(name: impl Into<String>, center: Vec3, half_extents: Vec3) -> Self {
        Self {
            name: name.into(),
            center,
            half_extents: half_extents.max(Vec3::ZERO),
        }
    }

    /// Builds a region from an upright cylinder: the radius spans an
    /// equivalent square footprint.
    pub fn from_cylinder(name: impl Into<String>, center: Vec3, radius: f32, height: f32) -> Self {
        Self::from_box(name, center, Vec3::new(radius, radius, height / 2.0))
    }

    /// Minimum corner, `center - half_extents`.
    pub fn p0(&self) -> Vec3 {
        self.center - self.half_extents
    }

    /// Corner offset from [`p0`](Self::p0) by the full extent along local X.
    pub fn px(&self) -> Vec3 {
        self.p0() + Vec3::new(2.0 * self.half_extents.x, 0.0, 0.0)
    }

    /// Corner offset from [`p0`](Self::p0) by the full extent along local Y.
    pub fn py(&self) -> Vec3 {
        self.p0() + Vec3::new(0.0, 2.0 * self.half_extents.y, 0.0)
    }

    /// Corner offset from [`p0`](Self::p0) by the full extent along local Z.
    pub fn pz(&self) -> Vec3 {
        self.p0() + Vec3::new(0.0, 0.0, 2.0 * self.half_extents.z)
    }

    /// Full extent along local X.
    pub fn width(&self) -> f32 {
        2.0 * self.half_extents.x
    }

    /// Full extent along local Y.
    pub fn depth(&self) -> f32 {
        2.0 * self.half_extents.y
    }

    /// Full extent along local Z.
    pub fn height(&self) -> f32 {
        2.0 * self.half_extents.z
    }

    /// Containment test in the fixture's local frame. With `two_d` only the
    /// planar axes are checked.
    pub fn contains_local(&self, point: Vec3, two_d: bool) -> bool {
        point_in_corners(self.p0(), self.px(), self.py(), self.pz(), point, two_d)
    }

    /// Scales center and half-extents component-wise, in place.
    pub fn rescale(&mut self, scale: Vec3) {
        self.center *= scale;
        self.half_extents = (self.half_extents * scale).max(Vec3::ZERO);
    }
}

/// Containment test against a region's reference corners.
///
/// The corners may live in any frame (local or world); the test projects the
/// point onto the three edge vectors leaving `p0` and checks each interval.
/// With `two_d` the vertical check is skipped.
pub fn point_in_corners(p0: Vec3, px: Vec3, py: Vec3, pz: Vec3, point: Vec3, two_d: bool) -> bool {
    let d = point - p0;
    let axes = [px - p0, py - p0, pz - p0];
    let checks = if two_d { 2 } else { 3 };
    axes.iter().take(checks).all(|axis| {
        let t = d.dot(*axis);
        t >= 0.0 && t <= axis.dot(*axis)
    })
}

/// Scans a geometry description for region markers and converts each into a
/// [`Region`], scaled by `scale`.
///
/// Elements without the marker prefix are skipped, as is a marker whose name
/// is empty after the prefix. A description yielding zero regions is valid:
/// the fixture is simply not placeable.
pub fn derive_regions(desc: &GeometryDescription, scale: Vec3) -> BTreeMap<String, Region> {
    let mut regions = BTreeMap::new();
    for element in &desc.elements {
        let Some(name) = element.name.strip_prefix(REGION_PREFIX) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        let half = element.shape.to_bevy_primitive().bounding_half_extents();
        let mut region = Region::from_box(name, element.pos, half);
        region.rescale(scale);
        regions.insert(region.name.clone(), region);
    }
    regions
}

/// Rescales every region in the map, in place. Applied once per rescale
/// event; calling it twice compounds the scale.
pub fn rescale_regions(regions: &mut BTreeMap<String, Region>, scale: Vec3) {
    for region in regions.values_mut() {
        region.rescale(scale);
    }
}

/// The exterior region of a map: `main` if present, else `bbox`.
pub fn primary_region(regions: &BTreeMap<String, Region>) -> Option<&Region> {
    regions.get(MAIN_REGION).or_else(|| regions.get(BBOX_REGION))
}

/// A world-relative view of a region's floor, handed to placement callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResetRegion {
    /// Region name, qualified by the owning fixture where needed.
    pub name: String,

    /// World position of the center of the region's bottom face.
    pub offset: Vec3,

    /// Planar extents along the owning fixture's local axes.
    pub size: Vec2,

    /// Vertical clearance above the floor. `None` for surface regions with
    /// nothing overhead (a counter top).
    pub height: Option<f32>,

    /// World yaw of the owning fixture, orienting `size`.
    pub yaw: f32,
}

impl ResetRegion {
    /// Builds the world view of `region` under the owning fixture's pose.
    pub fn from_region(region: &Region, pose: &Pose) -> Self {
        let bottom = region.center - Vec3::new(0.0, 0.0, region.half_extents.z);
        let height = if region.half_extents.z > 0.0 {
            Some(region.height())
        } else {
            None
        };
        Self {
            name: region.name.clone(),
            offset: pose.transform_point(bottom),
            size: Vec2::new(region.width(), region.depth()),
            height,
            yaw: pose.yaw,
        }
    }

    /// The region floor's world-space corner rectangle.
    pub fn footprint(&self) -> [Vec2; 4] {
        footprint_corners(self.offset.truncate(), self.size / 2.0, self.yaw)
    }

    /// Maps a world point into the region's planar frame, relative to the
    /// floor center.
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        Pose::new(self.offset, self.yaw).inverse_transform_point(world)
    }
}
