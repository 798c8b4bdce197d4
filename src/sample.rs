//! Uniform placement sampling inside reset regions.
//!
//! The sampler draws candidate poses for an object footprint inside a
//! region, anchored by a per-axis window, and rejects candidates that stick
//! out of the region or collide with already-placed footprints. Rejection
//! keeps the draw logic simple: a rotated footprint's reach depends on its
//! yaw, so containment is cheapest to check after the draw.

use crate::error::SamplingError;
use crate::fixture::{Fixture, LocationHint, ResetRegionQuery};
use crate::geom::{footprint_corners, rects_overlap, rotate_xy};
use crate::region::ResetRegion;
use glam::{Vec2, Vec3};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_4;
use tracing::trace;

/// Default total clearance from region edges, split across both sides.
const DEFAULT_MARGIN: f32 = 0.04;

/// Default candidate draws before giving up on a region.
const DEFAULT_ATTEMPTS: usize = 5;

/// Where the sampling window sits along one region axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Window center as a fraction of the free slack: `-1.0` presses the
    /// window against the low edge, `1.0` against the high edge, `0.0`
    /// centers it. Values outside the range clamp.
    Fraction(f32),

    /// Center the window where the constraint's reference point falls in
    /// the region. Without a reference this behaves like `Fraction(0.0)`.
    MatchReference,
}

impl Default for Anchor {
    fn default() -> Self {
        Self::Fraction(0.0)
    }
}

/// Whether candidates may intersect already-placed footprints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    Allow,
    #[default]
    Avoid,
}

/// Everything a placement draw needs besides the region and the rng.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConstraint {
    /// Planar footprint extents of the object. `None` places a point.
    pub size: Option<Vec2>,

    /// Total edge clearance. A margin at or above a region dimension
    /// collapses that axis to its center line.
    pub margin: f32,

    /// Window anchors along the region's local x and y.
    pub anchor: [Anchor; 2],

    /// Region-frame shift of the window center, clamped to the free slack.
    pub offset: Vec2,

    /// Yaw range relative to the region, drawn uniformly.
    pub rotation: (f32, f32),

    pub overlap: OverlapPolicy,

    /// Candidate draws per call before [`SamplingError::RetriesExhausted`].
    pub attempts: usize,

    /// World point backing [`Anchor::MatchReference`].
    pub reference: Option<Vec3>,
}

impl Default for PlacementConstraint {
    fn default() -> Self {
        Self {
            size: None,
            margin: DEFAULT_MARGIN,
            anchor: [Anchor::default(), Anchor::default()],
            offset: Vec2::ZERO,
            rotation: (-FRAC_PI_4, FRAC_PI_4),
            overlap: OverlapPolicy::default(),
            attempts: DEFAULT_ATTEMPTS,
            reference: None,
        }
    }
}

impl PlacementConstraint {
    pub fn for_footprint(size: Vec2) -> Self {
        Self {
            size: Some(size),
            ..Default::default()
        }
    }

    pub fn with_anchor(mut self, x: Anchor, y: Anchor) -> Self {
        self.anchor = [x, y];
        self
    }

    pub fn with_rotation(mut self, lo: f32, hi: f32) -> Self {
        self.rotation = (lo, hi);
        self
    }

    pub fn with_reference(mut self, reference: Vec3) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// One accepted draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampledPlacement {
    /// World center of the object's bottom face, on the support plane.
    pub pos: Vec3,

    /// World yaw.
    pub yaw: f32,

    /// World footprint rectangle at `pos`.
    pub footprint: [Vec2; 4],

    /// Region that hosted the draw.
    pub region: String,
}

/// Draws object poses inside a fixture's reset regions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementSampler {
    pub constraint: PlacementConstraint,
}

impl PlacementSampler {
    pub fn new(constraint: PlacementConstraint) -> Self {
        Self { constraint }
    }

    /// Samples a pose on `fixture`, in a region matching `query`.
    ///
    /// Regions too small for the footprint plus margin are skipped; with
    /// none left the call fails without consuming randomness. The region
    /// draw honors the query's location hint, then candidates are drawn
    /// until one is accepted or the attempt budget runs out.
    pub fn sample<R: Rng>(
        &self,
        fixture: &Fixture,
        query: &ResetRegionQuery,
        placed: &[[Vec2; 4]],
        rng: &mut R,
    ) -> Result<SampledPlacement, SamplingError> {
        let mut regions = fixture.reset_regions(query);
        regions.retain(|r| self.fits(r));
        let region = match query.hint {
            LocationHint::Nearest => regions.first(),
            _ => regions.choose(rng),
        };
        let Some(region) = region else {
            let required = self.constraint.size.unwrap_or(Vec2::ZERO)
                + Vec2::splat(self.constraint.margin);
            return Err(SamplingError::NoRegion {
                fixture: fixture.name.clone(),
                width: required.x,
                depth: required.y,
            });
        };
        self.sample_in_region(region, placed, rng)
    }

    /// True when the region can host the footprint with full clearance.
    pub fn fits(&self, region: &ResetRegion) -> bool {
        let Some(size) = self.constraint.size else {
            return true;
        };
        let outer = (region.size - Vec2::splat(self.constraint.margin)).max(Vec2::ZERO);
        outer.x >= size.x && outer.y >= size.y
    }

    /// Draws candidates in one region until acceptance.
    pub fn sample_in_region<R: Rng>(
        &self,
        region: &ResetRegion,
        placed: &[[Vec2; 4]],
        rng: &mut R,
    ) -> Result<SampledPlacement, SamplingError> {
        let constraint = &self.constraint;
        let outer_half = (region.size - Vec2::splat(constraint.margin)).max(Vec2::ZERO) / 2.0;
        let s_half = constraint.size.unwrap_or(Vec2::ZERO) / 2.0;
        let inner_half = if constraint.size.is_some() {
            outer_half.min(s_half)
        } else {
            outer_half
        };
        let avail = outer_half - inner_half;

        // Window center from the anchors, then the caller's shift, both
        // bounded by the free slack.
        let mut c0 = Vec2::ZERO;
        for axis in 0..2 {
            let frac = match constraint.anchor[axis] {
                Anchor::Fraction(f) => f.clamp(-1.0, 1.0),
                Anchor::MatchReference => match constraint.reference {
                    Some(point) => {
                        let local = region.to_local(point);
                        if outer_half[axis] > 0.0 {
                            (local[axis] / outer_half[axis]).clamp(-1.0, 1.0)
                        } else {
                            0.0
                        }
                    }
                    None => 0.0,
                },
            };
            c0[axis] = (avail[axis] * frac + constraint.offset[axis])
                .clamp(-avail[axis], avail[axis]);
        }

        let half_span = Vec2::splat(constraint.margin / 2.0) + s_half;
        let region_half = region.size / 2.0;
        let (yaw_lo, yaw_hi) = constraint.rotation;

        for attempt in 0..constraint.attempts {
            let mut center = Vec2::ZERO;
            for axis in 0..2 {
                let lo = c0[axis] - inner_half[axis];
                let hi = c0[axis] + inner_half[axis];
                center[axis] = if hi > lo { rng.gen_range(lo..hi) } else { lo };
            }
            let spin = if yaw_hi > yaw_lo {
                rng.gen_range(yaw_lo..yaw_hi)
            } else {
                yaw_lo
            };

            // Containment, in region frame: the margin-inflated footprint
            // must stay inside the region rectangle. Point objects always
            // fit, which keeps collapsed regions usable.
            if constraint.size.is_some() {
                let contained = footprint_corners(center, half_span, spin)
                    .iter()
                    .all(|c| c.x.abs() <= region_half.x && c.y.abs() <= region_half.y);
                if !contained {
                    trace!(region = %region.name, attempt, "candidate out of bounds");
                    continue;
                }
            }

            let world_center = region.offset.truncate() + rotate_xy(center, region.yaw);
            let yaw = region.yaw + spin;
            let footprint = footprint_corners(world_center, s_half, yaw);
            if constraint.overlap == OverlapPolicy::Avoid
                && placed.iter().any(|other| rects_overlap(&footprint, other))
            {
                trace!(region = %region.name, attempt, "candidate overlaps placed footprint");
                continue;
            }

            return Ok(SampledPlacement {
                pos: world_center.extend(region.offset.z),
                yaw,
                footprint,
                region: region.name.clone(),
            });
        }
        Err(SamplingError::RetriesExhausted {
            region: region.name.clone(),
            attempts: constraint.attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureKind;
    use crate::geom::Pose;
    use glam::vec3;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    fn counter() -> Fixture {
        let mut counter =
            Fixture::from_kind("counter", FixtureKind::Counter, vec3(2.0, 0.6, 0.9), None);
        counter.set_pose(Pose::new(Vec3::ZERO, 0.0));
        counter
    }

    fn top_region(fixture: &Fixture) -> ResetRegion {
        fixture
            .reset_regions(&ResetRegionQuery::default())
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn footprints_stay_inside_the_region() {
        let counter = counter();
        let region = top_region(&counter);
        let sampler = PlacementSampler::new(PlacementConstraint {
            attempts: 64,
            ..PlacementConstraint::for_footprint(Vec2::new(0.4, 0.3))
        });
        let mut rng = Pcg64Mcg::seed_from_u64(9);

        for _ in 0..50 {
            let hit = sampler.sample_in_region(&region, &[], &mut rng).unwrap();
            // Region is axis aligned at the origin: bounds are plain.
            for corner in hit.footprint {
                assert!(corner.x.abs() <= 1.0 + 1e-6);
                assert!(corner.y.abs() <= 0.3 + 1e-6);
            }
            assert_eq!(hit.pos.z, region.offset.z);
        }
    }

    #[test]
    fn oversized_footprint_reports_no_region() {
        let counter = counter();
        let sampler = PlacementSampler::new(PlacementConstraint::for_footprint(Vec2::new(
            2.0, 2.0,
        )));
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let err = sampler
            .sample(&counter, &ResetRegionQuery::default(), &[], &mut rng)
            .unwrap_err();
        assert!(matches!(err, SamplingError::NoRegion { .. }));
    }

    #[test]
    fn margin_collapse_still_places_points() {
        let counter = counter();
        let region = top_region(&counter);
        // Margin swallows the whole region: only the center line is left.
        let sampler = PlacementSampler::new(PlacementConstraint {
            margin: 5.0,
            ..Default::default()
        });
        let mut rng = Pcg64Mcg::seed_from_u64(2);
        let hit = sampler.sample_in_region(&region, &[], &mut rng).unwrap();
        assert!((hit.pos.truncate() - region.offset.truncate()).length() < 1e-6);
    }

    #[test]
    fn blocked_region_exhausts_attempts() {
        let counter = counter();
        let region = top_region(&counter);
        let wall_to_wall = region.footprint();
        let sampler =
            PlacementSampler::new(PlacementConstraint::for_footprint(Vec2::new(0.3, 0.2)));
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        let err = sampler
            .sample_in_region(&region, &[wall_to_wall], &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            SamplingError::RetriesExhausted {
                region: "top".into(),
                attempts: DEFAULT_ATTEMPTS,
            }
        );
    }

    #[test]
    fn overlap_allow_ignores_placed_footprints() {
        let counter = counter();
        let region = top_region(&counter);
        let wall_to_wall = region.footprint();
        let sampler = PlacementSampler::new(PlacementConstraint {
            overlap: OverlapPolicy::Allow,
            ..PlacementConstraint::for_footprint(Vec2::new(0.3, 0.2))
        });
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        assert!(sampler
            .sample_in_region(&region, &[wall_to_wall], &mut rng)
            .is_ok());
    }

    #[test]
    fn edge_anchor_presses_the_window_left() {
        let counter = counter();
        let region = top_region(&counter);
        let sampler = PlacementSampler::new(PlacementConstraint {
            attempts: 64,
            ..PlacementConstraint::for_footprint(Vec2::new(0.5, 0.3))
                .with_anchor(Anchor::Fraction(-1.0), Anchor::Fraction(0.0))
                .with_rotation(0.0, 0.0)
        });
        let mut rng = Pcg64Mcg::seed_from_u64(4);

        // Window spans the leftmost footprint-width strip of the free span.
        for _ in 0..20 {
            let hit = sampler.sample_in_region(&region, &[], &mut rng).unwrap();
            assert!(hit.pos.x < -0.45);
        }
    }

    #[test]
    fn reference_anchor_follows_the_point() {
        let counter = counter();
        let region = top_region(&counter);
        let sampler = PlacementSampler::new(PlacementConstraint {
            attempts: 64,
            ..PlacementConstraint::for_footprint(Vec2::new(0.4, 0.3))
                .with_anchor(Anchor::MatchReference, Anchor::Fraction(0.0))
                .with_rotation(0.0, 0.0)
                .with_reference(vec3(0.8, 0.0, 0.9))
        });
        let mut rng = Pcg64Mcg::seed_from_u64(5);

        for _ in 0..20 {
            let hit = sampler.sample_in_region(&region, &[], &mut rng).unwrap();
            assert!(hit.pos.x > 0.3);
        }
    }

    #[test]
    fn fixed_rotation_is_passed_through() {
        let counter = counter();
        let region = top_region(&counter);
        let sampler = PlacementSampler::new(
            PlacementConstraint::for_footprint(Vec2::new(0.2, 0.2)).with_rotation(0.3, 0.3),
        );
        let mut rng = Pcg64Mcg::seed_from_u64(6);
        let hit = sampler.sample_in_region(&region, &[], &mut rng).unwrap();
        assert!((hit.yaw - (region.yaw + 0.3)).abs() < 1e-6);
    }

    #[test]
    fn same_seed_same_draws() {
        let counter = counter();
        let sampler =
            PlacementSampler::new(PlacementConstraint::for_footprint(Vec2::new(0.3, 0.2)));
        let query = ResetRegionQuery::default();

        let mut a = Pcg64Mcg::seed_from_u64(7);
        let mut b = Pcg64Mcg::seed_from_u64(7);
        let first = sampler.sample(&counter, &query, &[], &mut a).unwrap();
        let second = sampler.sample(&counter, &query, &[], &mut b).unwrap();
        assert_eq!(first, second);
    }
}
