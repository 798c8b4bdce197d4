//! Declarative layout and style schema.
//!
//! A layout is a list of fixture groups; each group carries a rigid
//! transform and a list of fixture specs. Positioning is a tagged sum: a
//! spec is absolute, relative to another fixture, or stacked on one, and the
//! parser rejects anything else outright. Styles supply per-kind defaults
//! (sizes, door swings) that specs may omit.

use crate::fixture::FixtureKind;
use glam::{Vec2, Vec3};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A face of a fixture's exterior box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    Front,
    Back,
    Top,
    Bottom,
}

impl Side {
    /// The local axis the side lies on: 0 = X, 1 = Y, 2 = Z.
    pub fn axis(&self) -> usize {
        match self {
            Side::Left | Side::Right => 0,
            Side::Front | Side::Back => 1,
            Side::Top | Side::Bottom => 2,
        }
    }

    /// Direction of the side along its axis. Front is -Y, right is +X.
    pub fn sign(&self) -> f32 {
        match self {
            Side::Right | Side::Back | Side::Top => 1.0,
            Side::Left | Side::Front | Side::Bottom => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
            Side::Front => "front",
            Side::Back => "back",
            Side::Top => "top",
            Side::Bottom => "bottom",
        }
    }
}

/// Flush-face adjustment on an axis the side leaves free.
///
/// `Center` (the default) centers the new fixture on both remaining axes;
/// a face token makes those two faces coincide instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Center,
    Left,
    Right,
    Front,
    Back,
    Top,
    Bottom,
}

impl Alignment {
    /// The axis the alignment constrains, or `None` for `Center`.
    pub fn axis(&self) -> Option<usize> {
        match self {
            Alignment::Center => None,
            Alignment::Left | Alignment::Right => Some(0),
            Alignment::Front | Alignment::Back => Some(1),
            Alignment::Top | Alignment::Bottom => Some(2),
        }
    }

    /// Direction of the aligned face along its axis.
    pub fn sign(&self) -> f32 {
        match self {
            Alignment::Right | Alignment::Back | Alignment::Top => 1.0,
            _ => -1.0,
        }
    }

    /// An alignment may not re-constrain the axis the side already fixes.
    pub fn compatible_with(&self, side: Side) -> bool {
        self.axis() != Some(side.axis())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Center => "center",
            Alignment::Left => "left",
            Alignment::Right => "right",
            Alignment::Front => "front",
            Alignment::Back => "back",
            Alignment::Top => "top",
            Alignment::Bottom => "bottom",
        }
    }
}

/// How a fixture spec is positioned. Exactly one mode per spec, enforced by
/// the schema itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Placement {
    /// Authored-frame pose in the layout frame.
    Absolute {
        #[serde(default)]
        pos: Vec3,
        #[serde(default)]
        yaw: f32,
    },

    /// Flush against a side of another fixture, inheriting its yaw.
    Relative {
        align_to: String,
        side: Side,
        #[serde(default)]
        alignment: Alignment,
        #[serde(default)]
        gap: f32,
    },

    /// Resting on top of another fixture.
    Stacked {
        stack_on: String,
        /// Planar offset in the base fixture's frame. `None` centers the
        /// fixture on the base.
        #[serde(default)]
        pos_xy: Option<Vec2>,
    },
}

/// One component of a size spec: a literal, or another fixture's extent on
/// the same axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeDim {
    Fixed(f32),
    SameAs(String),
}

/// The level table of a stack spec, bottom to top. A level listing two kinds
/// is split side by side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackSpec {
    pub levels: Vec<Vec<FixtureKind>>,

    /// Fraction of the stack height (above the base) given to each level.
    /// Must match `levels` in length and sum to 1.
    pub percentages: Vec<f32>,

    /// Height of the base slab under the bottom level.
    #[serde(default = "default_base_height")]
    pub base_height: f32,
}

fn default_base_height() -> f32 {
    0.1
}

/// One fixture in a layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixtureSpec {
    pub name: String,

    pub kind: FixtureKind,

    /// Full extents per axis. Missing components fall back to the style,
    /// then the kind default; a string names another fixture whose extent on
    /// the same axis is copied.
    #[serde(default)]
    pub size: [Option<SizeDim>; 3],

    /// `None` is only valid for fixtures positioned by their container.
    #[serde(default)]
    pub placement: Option<Placement>,

    /// The fixture this one lives inside (a basin in a counter). The
    /// container repositions it whenever the container moves.
    #[serde(default)]
    pub interior_of: Option<String>,

    /// Present only on [`FixtureKind::Stack`] specs.
    #[serde(default)]
    pub stack: Option<StackSpec>,

    /// Disabled specs are dropped before validation, so a layout can switch
    /// a fixture off without deleting its entry.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl FixtureSpec {
    pub fn new(name: impl Into<String>, kind: FixtureKind) -> Self {
        Self {
            name: name.into(),
            kind,
            size: [None, None, None],
            placement: None,
            interior_of: None,
            stack: None,
            enabled: true,
        }
    }

    pub fn with_size(mut self, size: Vec3) -> Self {
        self.size = [
            Some(SizeDim::Fixed(size.x)),
            Some(SizeDim::Fixed(size.y)),
            Some(SizeDim::Fixed(size.z)),
        ];
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = Some(placement);
        self
    }
}

/// A named group of fixtures sharing one rigid transform.
///
/// The transform rotates each member about `origin` by `z_rot`, then
/// translates by `pos`. Members get the group name suffixed onto their own,
/// so a layout fragment can be instantiated more than once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixtureGroup {
    /// Empty for the anonymous root group: no suffixing, no transform.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub origin: Vec2,

    #[serde(default)]
    pub pos: Vec2,

    #[serde(default)]
    pub z_rot: f32,

    pub fixtures: Vec<FixtureSpec>,
}

impl FixtureGroup {
    pub fn anonymous(fixtures: Vec<FixtureSpec>) -> Self {
        Self {
            name: String::new(),
            origin: Vec2::ZERO,
            pos: Vec2::ZERO,
            z_rot: 0.0,
            fixtures,
        }
    }
}

/// A full scene layout. Group order is meaningful: references resolve
/// front to back.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub groups: Vec<FixtureGroup>,
}

/// Per-kind styling defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KindStyle {
    /// Default full extents when a spec omits its size.
    #[serde(default)]
    pub size: Option<Vec3>,

    /// Size alternatives; one is drawn per scene when non-empty, taking
    /// precedence over `size`.
    #[serde(default)]
    pub size_choices: Vec<Vec3>,

    /// Override for the hinge swing magnitude, in radians.
    #[serde(default)]
    pub door_swing: Option<f32>,
}

/// Style table keyed by fixture kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(default)]
    pub kinds: BTreeMap<FixtureKind, KindStyle>,
}

impl StyleConfig {
    /// The styled size for `kind`, drawing among alternatives when the style
    /// lists several.
    pub fn size_for<R: Rng>(&self, kind: FixtureKind, rng: &mut R) -> Option<Vec3> {
        let style = self.kinds.get(&kind)?;
        if let Some(choice) = style.size_choices.choose(rng) {
            return Some(*choice);
        }
        style.size
    }

    /// The styled hinge swing for `kind`, if any.
    pub fn door_swing_for(&self, kind: FixtureKind) -> Option<f32> {
        self.kinds.get(&kind).and_then(|s| s.door_swing)
    }
}
