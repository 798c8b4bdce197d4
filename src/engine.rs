//! Interfaces to the simulation engine and the asset loader.
//!
//! The crate never talks to a concrete engine. Composition and sampling work
//! on [`GeometryDescription`] values handed in at load time, and articulated
//! state flows through the [`JointIo`] trait. Any engine that can answer
//! these few queries can host a composed scene.

use bevy_math::primitives::{Cuboid, Cylinder};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Queries the current world pose of a named rigid body.
pub trait BodyQuery {
    /// World position and orientation of `body`, or `None` if unknown.
    fn body_pose(&self, body: &str) -> Option<(Vec3, Quat)>;
}

/// Reads and writes named scalar joints.
pub trait JointIo {
    /// Current raw value of `joint`, in its native units.
    fn joint_value(&self, joint: &str) -> Option<f32>;

    /// Writes a raw value to `joint`. Returns `false` if the joint is unknown.
    fn set_joint_value(&mut self, joint: &str, value: f32) -> bool;
}

/// Pairwise contact test between two sets of named collision shapes.
pub trait ContactQuery {
    fn in_contact(&self, a: &[&str], b: &[&str]) -> bool;
}

/// The resolved geometry of one fixture archetype, in its authored frame.
///
/// Produced by the (external) asset loader; elements whose names carry the
/// region marker prefix become [`Region`](crate::region::Region)s when the
/// fixture is instantiated.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GeometryDescription {
    pub elements: Vec<GeomElement>,
}

impl GeometryDescription {
    pub fn new(elements: Vec<GeomElement>) -> Self {
        Self { elements }
    }
}

/// A single named solid in a geometry description.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeomElement {
    /// Authored name. Names starting with `reg_` mark placement regions.
    pub name: String,

    /// Center of the solid in the fixture's authored frame.
    pub pos: Vec3,

    /// The solid itself.
    pub shape: ElementShape,
}

impl GeomElement {
    pub fn new(name: impl Into<String>, pos: Vec3, shape: ElementShape) -> Self {
        Self {
            name: name.into(),
            pos,
            shape,
        }
    }
}

/// Supported solids for geometry elements.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum ElementShape {
    /// A box defined by half-extents (x, y, z).
    Box(Vec3),
    /// An upright cylinder defined by radius and full height.
    Cylinder { radius: f32, height: f32 },
}

/// A type-erased wrapper over the corresponding `bevy_math` primitives.
#[derive(Clone, Copy, Debug)]
pub enum BevyShape {
    Cuboid(Cuboid),
    Cylinder(Cylinder),
}

impl BevyShape {
    /// Half-extents of the shape's upright bounding box.
    ///
    /// A cylinder maps to the square footprint spanned by its radius, which
    /// is how cylindrical solids (sink basins, bins) become rectangular
    /// regions.
    pub fn bounding_half_extents(&self) -> Vec3 {
        match self {
            Self::Cuboid(c) => c.half_size,
            Self::Cylinder(c) => Vec3::new(c.radius, c.radius, c.half_height),
        }
    }
}

impl ElementShape {
    /// Convert to the corresponding `bevy_math` primitive.
    pub fn to_bevy_primitive(self) -> BevyShape {
        match self {
            Self::Box(half_extents) => BevyShape::Cuboid(Cuboid {
                half_size: half_extents,
            }),
            Self::Cylinder { radius, height } => {
                BevyShape::Cylinder(Cylinder::new(radius, height))
            }
        }
    }
}
