//! Normalized joint state.
//!
//! Every articulated degree of freedom (door hinge, drawer slide, rack) is
//! read and written through a value in `[0, 1]`: 0 is the rest/closed
//! configuration, 1 fully open. The mapping absorbs each joint's native
//! numeric range and sign convention, so a left-hinged door authored with a
//! negative swing and a right-hinged door with a positive one both read 1.0
//! when open.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Normalized value at or above which a joint counts as open.
pub const OPEN_THRESHOLD: f32 = 0.90;

/// Normalized value at or below which a joint counts as closed.
pub const CLOSED_THRESHOLD: f32 = 0.005;

/// A joint's native value range. `min` must be strictly below `max`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointRange {
    pub min: f32,
    pub max: f32,
}

impl JointRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Maps a raw joint value into `[0, 1]`.
    ///
    /// The map is linear and clamped. When `min < 0` the result is mirrored
    /// (`1 - v`): joints authored to swing in the negative direction rest at
    /// raw 0, and the mirror makes that rest position read as 0 (closed)
    /// rather than 1.
    pub fn normalize(&self, raw: f32) -> f32 {
        let v = (raw - self.min) / (self.max - self.min);
        let v = if self.min < 0.0 { 1.0 - v } else { v };
        v.clamp(0.0, 1.0)
    }

    /// Maps a normalized value in `[0, 1]` back to the native range.
    ///
    /// Inverse of [`normalize`](Self::normalize), including the mirror for
    /// negative-swing ranges.
    pub fn denormalize(&self, v: f32) -> f32 {
        let v = v.clamp(0.0, 1.0);
        let v = if self.min < 0.0 { 1.0 - v } else { v };
        self.min + v * (self.max - self.min)
    }
}

/// A named engine joint driving one door panel, drawer slide or rack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoorJoint {
    /// Engine joint name.
    pub joint: String,

    /// Native range, sign convention included: a door authored to swing
    /// negative carries a negative-min range.
    pub range: JointRange,
}

impl DoorJoint {
    pub fn new(joint: impl Into<String>, range: JointRange) -> Self {
        Self {
            joint: joint.into(),
            range,
        }
    }
}

/// How a normalized band `[lo, hi]` collapses to the single value written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// A uniform draw within the band.
    #[default]
    Uniform,
    /// The band midpoint. Used for mechanisms prone to oscillation, where a
    /// random extreme can leave the door swinging at episode start.
    Midpoint,
}

/// Picks the normalized value to write for a requested band.
pub fn draw_normalized<R: Rng>(lo: f32, hi: f32, policy: WritePolicy, rng: &mut R) -> f32 {
    let lo = lo.clamp(0.0, 1.0);
    let hi = hi.clamp(0.0, 1.0).max(lo);
    match policy {
        WritePolicy::Midpoint => (lo + hi) / 2.0,
        WritePolicy::Uniform if hi > lo => rng.gen_range(lo..hi),
        WritePolicy::Uniform => lo,
    }
}

/// True when every joint clears the open threshold.
///
/// ALL-joints semantics: a two-door cabinet is open only when both doors are.
pub fn all_open(values: &[f32], threshold: f32) -> bool {
    !values.is_empty() && values.iter().all(|v| *v >= threshold)
}

/// True when every joint is at or below the closed threshold.
pub fn all_closed(values: &[f32], threshold: f32) -> bool {
    !values.is_empty() && values.iter().all(|v| *v <= threshold)
}
