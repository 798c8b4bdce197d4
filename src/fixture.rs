//! Fixtures: placeable, possibly articulated scene elements.
//!
//! A fixture couples a world pose with the named regions derived from its
//! geometry and, for articulated kinds, a set of door joints. Kind-specific
//! behavior (which regions host objects, how doors swing) is dispatched by
//! matching on [`FixtureKind`]; there is no inheritance to chase.

use crate::engine::{BodyQuery, ElementShape, GeomElement, GeometryDescription, JointIo};
use crate::error::SamplingError;
use crate::geom::{Pose, UprightBox, corner_distance, point_segment_distance, rotate_z};
use crate::joint::{
    DoorJoint, JointRange, WritePolicy, all_closed, all_open, draw_normalized,
};
use crate::region::{
    BBOX_REGION, MAIN_REGION, Region, ResetRegion, derive_regions, point_in_corners,
    primary_region, rescale_regions,
};
use glam::{Vec2, Vec3};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f32::consts::FRAC_PI_2;

/// Fraction of the swing range a drawer opens to by default. Fully pulled-out
/// drawers collide with whatever stands in front of them.
const DRAWER_PARTIAL_OPEN: f32 = 0.3;

/// Fraction of a drawer's depth the slide travels.
const DRAWER_TRAVEL: f32 = 0.55;

/// Counter regions further than this (fixture frame, meters) from a
/// reference point on either side count as left/right of it.
const SIDE_SPLIT_OFFSET: f32 = 0.30;

/// Corner shrink applied before edge-distance tests, so regions sharing an
/// edge do not tie.
const NEAREST_CORNER_SCALE: f32 = 0.99;

/// The closed set of fixture kinds.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FixtureKind {
    Counter,
    SingleCabinet,
    HingeCabinet,
    OpenCabinet,
    Drawer,
    Microwave,
    Sink,
    Stove,
    Fridge,
    Dishwasher,
    Oven,
    Stack,
    Box,
    Wall,
    Floor,
    Accessory,
}

impl FixtureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::SingleCabinet => "single_cabinet",
            Self::HingeCabinet => "hinge_cabinet",
            Self::OpenCabinet => "open_cabinet",
            Self::Drawer => "drawer",
            Self::Microwave => "microwave",
            Self::Sink => "sink",
            Self::Stove => "stove",
            Self::Fridge => "fridge",
            Self::Dishwasher => "dishwasher",
            Self::Oven => "oven",
            Self::Stack => "stack",
            Self::Box => "box",
            Self::Wall => "wall",
            Self::Floor => "floor",
            Self::Accessory => "accessory",
        }
    }

    /// Full extents used when neither the spec nor the style gives a size.
    pub fn default_size(&self) -> Vec3 {
        match self {
            Self::Counter => Vec3::new(0.6, 0.6, 0.9),
            Self::SingleCabinet => Vec3::new(0.45, 0.35, 0.6),
            Self::HingeCabinet => Vec3::new(0.9, 0.35, 0.6),
            Self::OpenCabinet => Vec3::new(0.9, 0.35, 0.9),
            Self::Drawer => Vec3::new(0.6, 0.5, 0.2),
            Self::Microwave => Vec3::new(0.55, 0.4, 0.33),
            Self::Sink => Vec3::new(0.6, 0.5, 0.3),
            Self::Stove => Vec3::new(0.76, 0.65, 0.92),
            Self::Fridge => Vec3::new(0.9, 0.7, 1.8),
            Self::Dishwasher => Vec3::new(0.6, 0.6, 0.85),
            Self::Oven => Vec3::new(0.76, 0.65, 0.7),
            Self::Stack => Vec3::new(0.6, 0.6, 2.3),
            Self::Box => Vec3::new(0.6, 0.6, 0.1),
            Self::Wall => Vec3::new(3.0, 0.1, 2.5),
            Self::Floor => Vec3::new(4.0, 4.0, 0.05),
            Self::Accessory => Vec3::new(0.2, 0.2, 0.2),
        }
    }

    /// The kind's unit-extent geometry, authored with the origin at the
    /// bottom-face center. Scaling by the fixture size yields the instance
    /// geometry.
    pub fn archetype(&self) -> GeometryDescription {
        let main = GeomElement::new(
            "reg_main",
            Vec3::new(0.0, 0.0, 0.5),
            ElementShape::Box(Vec3::splat(0.5)),
        );
        let mut elements = vec![main];
        match self {
            Self::Counter | Self::Stove => {
                elements.push(GeomElement::new(
                    "reg_top",
                    Vec3::new(0.0, 0.0, 1.0),
                    ElementShape::Box(Vec3::new(0.5, 0.5, 0.0)),
                ));
            }
            Self::SingleCabinet
            | Self::HingeCabinet
            | Self::Drawer
            | Self::Microwave
            | Self::Fridge
            | Self::Dishwasher
            | Self::Oven => {
                // Interior cavity, inset from the walls.
                elements.push(GeomElement::new(
                    "reg_int",
                    Vec3::new(0.0, 0.0, 0.5),
                    ElementShape::Box(Vec3::new(0.45, 0.45, 0.4)),
                ));
            }
            Self::OpenCabinet => {
                for level in 0..3 {
                    let center_z = (level as f32 + 0.5) / 3.0;
                    elements.push(GeomElement::new(
                        format!("reg_level{level}"),
                        Vec3::new(0.0, 0.0, center_z),
                        ElementShape::Box(Vec3::new(0.45, 0.45, 0.14)),
                    ));
                }
            }
            Self::Sink => {
                elements.push(GeomElement::new(
                    "reg_basin",
                    Vec3::new(0.0, 0.0, 0.65),
                    ElementShape::Cylinder {
                        radius: 0.35,
                        height: 0.5,
                    },
                ));
            }
            Self::Accessory => {
                // Accessories are decoration: no regions, not placeable.
                elements.clear();
            }
            Self::Stack | Self::Box | Self::Wall | Self::Floor => {}
        }
        GeometryDescription::new(elements)
    }

    /// Door joints for a fixture of this kind, sized by its full extents.
    ///
    /// Sign conventions are carried in the ranges: a left-hinged door is
    /// authored to swing negative and rests at raw 0, which the normalizer's
    /// mirror rule reads as closed.
    pub fn door_joints(&self, name: &str, size: Vec3, swing: Option<f32>) -> Vec<DoorJoint> {
        let swing = swing.unwrap_or(FRAC_PI_2);
        match self {
            Self::SingleCabinet | Self::Microwave | Self::Dishwasher | Self::Oven => {
                vec![DoorJoint::new(
                    format!("{name}_door_hinge"),
                    JointRange::new(0.0, swing),
                )]
            }
            Self::HingeCabinet | Self::Fridge => vec![
                DoorJoint::new(
                    format!("{name}_door_left_hinge"),
                    JointRange::new(-swing, 0.0),
                ),
                DoorJoint::new(
                    format!("{name}_door_right_hinge"),
                    JointRange::new(0.0, swing),
                ),
            ],
            Self::Drawer => vec![DoorJoint::new(
                format!("{name}_slide"),
                JointRange::new(-DRAWER_TRAVEL * size.y, 0.0),
            )],
            _ => Vec::new(),
        }
    }

    /// How door writes collapse a requested band to one value.
    pub fn door_write_policy(&self) -> WritePolicy {
        match self {
            // Fridge doors are heavy enough to oscillate if thrown open to a
            // random extreme.
            Self::Fridge => WritePolicy::Midpoint,
            _ => WritePolicy::Uniform,
        }
    }

    /// Fraction of the open band used by [`Fixture::open_door`].
    pub fn partial_open_factor(&self) -> f32 {
        match self {
            Self::Drawer => DRAWER_PARTIAL_OPEN,
            _ => 1.0,
        }
    }
}

/// Where, relative to a reference point, reset regions are wanted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationHint {
    #[default]
    Any,
    Nearest,
    Left,
    Right,
    EitherSide,
}

/// Filters applied when enumerating a fixture's reset regions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResetRegionQuery {
    /// Minimum planar extents a region must offer.
    pub min_size: Vec2,

    /// Keep only regions whose absolute floor height lies inside this band.
    /// The reachability filter: shelves above or below it are excluded.
    pub z_bounds: Option<(f32, f32)>,

    pub hint: LocationHint,

    /// World reference point the hint is relative to.
    pub near: Option<Vec3>,

    /// Restrict a shelf fixture to one level.
    pub shelf_level: Option<usize>,
}

impl Default for ResetRegionQuery {
    fn default() -> Self {
        Self {
            min_size: Vec2::ZERO,
            z_bounds: None,
            hint: LocationHint::Any,
            near: None,
            shelf_level: None,
        }
    }
}

impl ResetRegionQuery {
    pub fn with_min_size(mut self, min_size: Vec2) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn with_z_bounds(mut self, lo: f32, hi: f32) -> Self {
        self.z_bounds = Some((lo, hi));
        self
    }

    pub fn with_hint(mut self, hint: LocationHint, near: Vec3) -> Self {
        self.hint = hint;
        self.near = Some(near);
        self
    }
}

/// A placeable, possibly articulated scene element.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fixture {
    pub name: String,

    pub kind: FixtureKind,

    /// World pose of the authored frame.
    pub pose: Pose,

    /// Accumulated scale relative to the archetype.
    pub scale: Vec3,

    /// Exterior full extents, when an exterior region exists.
    pub size: Option<Vec3>,

    /// Vector from the authored origin to the exterior region centroid, in
    /// the authored frame. Keeps "place the exterior center here" and
    /// "place the authored frame here" distinguishable.
    pub origin_offset: Vec3,

    /// Named regions in the authored frame.
    pub regions: BTreeMap<String, Region>,

    /// Door joints, outermost first.
    pub doors: Vec<DoorJoint>,

    /// Styled hinge swing carried so rescaling can rebuild door ranges.
    door_swing: Option<f32>,

    /// Names of fixtures this one contains and repositions with itself.
    pub interior: Vec<String>,
}

impl Fixture {
    /// Instantiates a fixture of `kind` at the given full extents.
    pub fn from_kind(
        name: impl Into<String>,
        kind: FixtureKind,
        size: Vec3,
        door_swing: Option<f32>,
    ) -> Self {
        let name = name.into();
        Self::from_geometry(name, kind, &kind.archetype(), size, door_swing)
    }

    /// Instantiates a fixture from explicit geometry, scaling it so the
    /// exterior region spans `size`.
    pub fn from_geometry(
        name: String,
        kind: FixtureKind,
        geometry: &GeometryDescription,
        size: Vec3,
        door_swing: Option<f32>,
    ) -> Self {
        let unit = derive_regions(geometry, Vec3::ONE);
        let scale = match primary_region(&unit) {
            Some(main) => {
                let extents = 2.0 * main.half_extents;
                Vec3::new(
                    per_axis_factor(size.x, extents.x),
                    per_axis_factor(size.y, extents.y),
                    per_axis_factor(size.z, extents.z),
                )
            }
            None => Vec3::ONE,
        };
        let regions = derive_regions(geometry, scale);
        let (size, origin_offset) = match primary_region(&regions) {
            Some(main) => (Some(2.0 * main.half_extents), main.center),
            None => (None, Vec3::ZERO),
        };
        let doors = kind.door_joints(&name, size.unwrap_or(Vec3::ZERO), door_swing);
        Self {
            name,
            kind,
            pose: Pose::default(),
            scale,
            size,
            origin_offset,
            regions,
            doors,
            door_swing,
            interior: Vec::new(),
        }
    }

    /// Exterior full extent along local X.
    pub fn width(&self) -> Option<f32> {
        self.size.map(|s| s.x)
    }

    /// Exterior full extent along local Y.
    pub fn depth(&self) -> Option<f32> {
        self.size.map(|s| s.y)
    }

    /// Exterior full extent along local Z.
    pub fn height(&self) -> Option<f32> {
        self.size.map(|s| s.z)
    }

    /// World position of the exterior region centroid.
    pub fn origin(&self) -> Vec3 {
        self.pose.transform_point(self.origin_offset)
    }

    /// Places the exterior region centroid at `world`, keeping yaw.
    pub fn set_origin(&mut self, world: Vec3) {
        self.pose.pos = world - rotate_z(self.origin_offset, self.pose.yaw);
    }

    /// Places the authored frame directly.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Rescales the fixture so its exterior spans the given extents.
    ///
    /// Missing components inherit the mean of the provided axes' factors, so
    /// a counter stretched along X thickens its slab proportionally unless
    /// told otherwise. Mutates regions in place; the authored frame and yaw
    /// are unchanged.
    pub fn set_scale_from_size(&mut self, size: [Option<f32>; 3]) {
        let Some(current) = self.size else {
            return;
        };
        let mut factors = [None; 3];
        let current = [current.x, current.y, current.z];
        for axis in 0..3 {
            if let Some(target) = size[axis]
                && current[axis] > 0.0
            {
                factors[axis] = Some(target / current[axis]);
            }
        }
        let given: Vec<f32> = factors.iter().flatten().copied().collect();
        if given.is_empty() {
            return;
        }
        let inherit = given.iter().sum::<f32>() / given.len() as f32;
        let factor = Vec3::new(
            factors[0].unwrap_or(inherit),
            factors[1].unwrap_or(inherit),
            factors[2].unwrap_or(inherit),
        );
        rescale_regions(&mut self.regions, factor);
        self.scale *= factor;
        if let Some(main) = primary_region(&self.regions) {
            self.size = Some(2.0 * main.half_extents);
            self.origin_offset = main.center;
        }
        // Drawer travel depends on depth, so door ranges are rebuilt.
        self.doors = self.kind.door_joints(
            &self.name,
            self.size.unwrap_or(Vec3::ZERO),
            self.door_swing,
        );
    }

    /// The exterior region, `main` falling back to `bbox`.
    pub fn ext_region(&self) -> Option<&Region> {
        primary_region(&self.regions)
    }

    /// The exterior box in world coordinates.
    pub fn exterior_box(&self) -> Option<UprightBox> {
        let main = self.ext_region()?;
        Some(UprightBox {
            center: self.pose.transform_point(main.center),
            half: main.half_extents,
            yaw: self.pose.yaw,
        })
    }

    /// True when the fixture exposes at least one region.
    pub fn has_regions(&self) -> bool {
        !self.regions.is_empty()
    }

    /// Number of shelf levels the fixture exposes.
    pub fn rack_levels(&self) -> usize {
        self.regions
            .keys()
            .filter(|name| name.starts_with("level"))
            .count()
    }

    /// Containment test for a world point against the exterior region.
    pub fn contains_point(&self, world: Vec3, two_d: bool) -> bool {
        let Some(main) = self.ext_region() else {
            return false;
        };
        point_in_corners(
            self.pose.transform_point(main.p0()),
            self.pose.transform_point(main.px()),
            self.pose.transform_point(main.py()),
            self.pose.transform_point(main.pz()),
            world,
            two_d,
        )
    }

    /// Containment test for a named body's current position, queried from
    /// the hosting engine. `None` when the engine does not know the body.
    pub fn contains_body<E: BodyQuery>(&self, body: &str, engine: &E, two_d: bool) -> Option<bool> {
        let (pos, _) = engine.body_pose(body)?;
        Some(self.contains_point(pos, two_d))
    }

    /// True when every corner of `object` lies inside the named region.
    pub fn object_in_region(&self, region: &str, object: &UprightBox, two_d: bool) -> bool {
        let Some(region) = self.regions.get(region) else {
            return false;
        };
        let p0 = self.pose.transform_point(region.p0());
        let px = self.pose.transform_point(region.px());
        let py = self.pose.transform_point(region.py());
        let pz = self.pose.transform_point(region.pz());
        object
            .corners()
            .iter()
            .all(|c| point_in_corners(p0, px, py, pz, *c, two_d))
    }

    /// Minimum exterior corner distance between two fixtures. `None` when
    /// either has no exterior region.
    pub fn distance_to(&self, other: &Fixture) -> Option<f32> {
        Some(corner_distance(
            &self.exterior_box()?,
            &other.exterior_box()?,
        ))
    }

    /// Enumerates reset regions passing `query`, in selection order.
    ///
    /// For `Nearest` the result is sorted by edge distance to the reference
    /// point; otherwise the authored order is kept.
    pub fn reset_regions(&self, query: &ResetRegionQuery) -> Vec<ResetRegion> {
        self.select_regions(self.candidate_regions(query), query)
    }

    /// Kind-dispatched raw candidates, cloned so that scene-level code can
    /// split them around obstructions before selection.
    pub(crate) fn candidate_regions(&self, query: &ResetRegionQuery) -> Vec<Region> {
        let picked: Vec<&Region> = match self.kind {
            FixtureKind::Counter | FixtureKind::Stove => self
                .regions
                .values()
                .filter(|r| r.name.starts_with("top"))
                .collect(),
            FixtureKind::OpenCabinet => self
                .regions
                .values()
                .filter(|r| match query.shelf_level {
                    Some(level) => r.name == format!("level{level}"),
                    None => r.name.starts_with("level"),
                })
                .collect(),
            _ => self
                .regions
                .values()
                .filter(|r| r.name != MAIN_REGION && r.name != BBOX_REGION)
                .collect(),
        };
        picked.into_iter().cloned().collect()
    }

    /// Applies the hint, then converts survivors into world views filtered
    /// by size and reachability.
    pub(crate) fn select_regions(
        &self,
        mut candidates: Vec<Region>,
        query: &ResetRegionQuery,
    ) -> Vec<ResetRegion> {
        if let Some(near) = query.near {
            let near_local = self.pose.inverse_transform_point(near);
            match query.hint {
                LocationHint::Any => {}
                LocationHint::Nearest => {
                    candidates.sort_by(|a, b| {
                        let da = self.edge_distance(a, near_local);
                        let db = self.edge_distance(b, near_local);
                        da.total_cmp(&db)
                    });
                }
                LocationHint::Left => {
                    candidates.retain(|r| r.center.x - near_local.x < -SIDE_SPLIT_OFFSET);
                }
                LocationHint::Right => {
                    candidates.retain(|r| r.center.x - near_local.x > SIDE_SPLIT_OFFSET);
                }
                LocationHint::EitherSide => {
                    candidates.retain(|r| (r.center.x - near_local.x).abs() > SIDE_SPLIT_OFFSET);
                }
            }
        }

        candidates
            .iter()
            .map(|r| ResetRegion::from_region(r, &self.pose))
            .filter(|r| r.size.x >= query.min_size.x && r.size.y >= query.min_size.y)
            .filter(|r| match query.z_bounds {
                Some((lo, hi)) => r.offset.z >= lo && r.offset.z <= hi,
                None => true,
            })
            .collect()
    }

    /// Draws one eligible reset region.
    ///
    /// `Nearest` takes the closest; other hints draw uniformly among what
    /// they left eligible.
    pub fn sample_reset_region<R: Rng>(
        &self,
        query: &ResetRegionQuery,
        rng: &mut R,
    ) -> Result<ResetRegion, SamplingError> {
        let regions = self.reset_regions(query);
        let pick = match query.hint {
            LocationHint::Nearest => regions.first(),
            _ => regions.choose(rng),
        };
        pick.cloned().ok_or_else(|| SamplingError::NoRegion {
            fixture: self.name.clone(),
            width: query.min_size.x,
            depth: query.min_size.y,
        })
    }

    /// Minimum distance from a fixture-frame point to a region's slightly
    /// shrunk edges.
    fn edge_distance(&self, region: &Region, point_local: Vec3) -> f32 {
        let p = point_local.truncate();
        let c = region.center.truncate();
        let h = region.half_extents.truncate() * NEAREST_CORNER_SCALE;
        let corners = [
            c + Vec2::new(h.x, h.y),
            c + Vec2::new(-h.x, h.y),
            c + Vec2::new(-h.x, -h.y),
            c + Vec2::new(h.x, -h.y),
        ];
        (0..4)
            .map(|i| point_segment_distance(p, corners[i], corners[(i + 1) % 4]))
            .fold(f32::INFINITY, f32::min)
    }

    /// Normalized state of every door joint. `None` when the fixture has no
    /// doors or the engine does not know one of them.
    pub fn door_state<E: JointIo>(&self, io: &E) -> Option<Vec<f32>> {
        if self.doors.is_empty() {
            return None;
        }
        self.doors
            .iter()
            .map(|door| io.joint_value(&door.joint).map(|raw| door.range.normalize(raw)))
            .collect()
    }

    /// Writes every door joint to a value in the normalized band `[lo, hi]`.
    ///
    /// Each joint draws independently under the kind's write policy. Returns
    /// the number of joints written.
    pub fn set_door_state<E: JointIo, R: Rng>(
        &self,
        lo: f32,
        hi: f32,
        io: &mut E,
        rng: &mut R,
    ) -> usize {
        let policy = self.kind.door_write_policy();
        let mut written = 0;
        for door in &self.doors {
            let v = draw_normalized(lo, hi, policy, rng);
            if io.set_joint_value(&door.joint, door.range.denormalize(v)) {
                written += 1;
            }
        }
        written
    }

    /// Opens the doors into the upper band, scaled by the kind's partial
    /// factor (drawers stop short of full travel).
    pub fn open_door<E: JointIo, R: Rng>(&self, io: &mut E, rng: &mut R) -> usize {
        let factor = self.kind.partial_open_factor();
        self.set_door_state(0.90 * factor, 1.0 * factor, io, rng)
    }

    /// Drives every door to its rest position.
    pub fn close_door<E: JointIo, R: Rng>(&self, io: &mut E, rng: &mut R) -> usize {
        self.set_door_state(0.0, 0.0, io, rng)
    }

    /// True when every door clears `threshold`. `None` without door state.
    pub fn is_open<E: JointIo>(&self, io: &E, threshold: f32) -> Option<bool> {
        self.door_state(io).map(|v| all_open(&v, threshold))
    }

    /// True when every door is at or below `threshold`. `None` without door
    /// state.
    pub fn is_closed<E: JointIo>(&self, io: &E, threshold: f32) -> Option<bool> {
        self.door_state(io).map(|v| all_closed(&v, threshold))
    }
}

fn per_axis_factor(target: f32, unit: f32) -> f32 {
    if unit > 0.0 { target / unit } else { 1.0 }
}
