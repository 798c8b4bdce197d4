//! The scene composer: declarative layout in, resolved fixture registry out.
//!
//! Composition is a pipeline over the flattened spec list: validate, expand
//! stacks into synthetic specs, then resolve each spec in order (sizes first,
//! then pose), and finally apply group transforms exactly once. References
//! always point backwards; a spec that needs a later fixture is a fatal
//! [`LayoutError`], never a retry.

use crate::engine::GeometryDescription;
use crate::error::{LayoutError, SamplingError};
use crate::fixture::{Fixture, FixtureKind, LocationHint, ResetRegionQuery};
use crate::geom::{Pose, UprightBox, boxes_intersect, rects_overlap, rotate_xy, rotate_z};
use crate::layout::{
    FixtureSpec, LayoutConfig, Placement, SizeDim, StackSpec, StyleConfig,
};
use crate::region::{Region, ResetRegion};
use glam::{Vec2, Vec3};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Nearest-fixture resolution keeps every candidate within this distance of
/// the best one and draws among them.
const NEAR_SLACK: f32 = 0.10;

/// Split counter-top pieces narrower than this are dropped.
const MIN_SPLIT_WIDTH: f32 = 0.20;

/// Half-thickness of the slab used to detect fixtures sitting on a counter.
const OCCUPANT_SLAB: f32 = 0.05;

/// Standoff between a base pose and the fixture it faces.
const BASE_STANDOFF: f32 = 0.30;

/// Composer behavior toggles. Passed in at construction; there are no
/// process-wide flags.
#[derive(Clone, Debug)]
pub struct ComposerConfig {
    /// Kinds that ignore group transforms (room shell geometry).
    pub group_exempt: Vec<FixtureKind>,

    /// Log every fixture's derived regions after composition.
    pub log_regions: bool,

    /// Loader-provided geometry, overriding the built-in archetypes.
    pub archetypes: BTreeMap<FixtureKind, GeometryDescription>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            group_exempt: vec![FixtureKind::Wall, FixtureKind::Floor],
            log_regions: false,
            archetypes: BTreeMap::new(),
        }
    }
}

/// Turns a [`LayoutConfig`] plus [`StyleConfig`] into a [`Scene`].
#[derive(Clone, Debug, Default)]
pub struct SceneComposer {
    config: ComposerConfig,
}

impl SceneComposer {
    pub fn new(config: ComposerConfig) -> Self {
        Self { config }
    }

    /// Resolves the layout into world poses.
    ///
    /// Deterministic for a given layout, style and rng state: the only
    /// randomness is the style's size draws, taken in spec order.
    pub fn build<R: Rng>(
        &self,
        layout: &LayoutConfig,
        style: &StyleConfig,
        rng: &mut R,
    ) -> Result<Scene, LayoutError> {
        // 1. Flatten groups: suffix member names, rewrite in-group refs.
        let mut specs = flatten_groups(layout);
        validate(&specs)?;

        // 2. Stacks become synthetic specs before normal resolution.
        specs = expand_stacks(specs)?;
        let known: BTreeSet<String> = specs.iter().map(|(s, _)| s.name.clone()).collect();

        // 3. One ordered pass: size, instantiate, place.
        let mut scene = Scene::default();
        for (spec, group_idx) in &specs {
            let size = self.resolve_size(spec, style, &scene, rng)?;
            let mut fixture = self.instantiate(spec, size, style);
            self.place(spec, &mut fixture, &scene, &known)?;
            trace!(fixture = %fixture.name, pos = ?fixture.pose.pos, "placed");
            if let Some(container) = &spec.interior_of
                && let Some(host) = scene.fixture_mut(container)
            {
                host.interior.push(spec.name.clone());
            }
            scene.insert(fixture, *group_idx)?;
        }

        // 4. Group transforms, exactly once per fixture, after resolution.
        for (idx, group) in layout.groups.iter().enumerate() {
            if group.z_rot == 0.0 && group.pos == Vec2::ZERO {
                continue;
            }
            for fixture in scene.fixtures_in_group_mut(idx) {
                if self.config.group_exempt.contains(&fixture.kind) {
                    continue;
                }
                let rel = fixture.pose.pos.truncate() - group.origin;
                let turned = group.origin + rotate_xy(rel, group.z_rot) + group.pos;
                fixture.pose.pos = turned.extend(fixture.pose.pos.z);
                fixture.pose.yaw += group.z_rot;
            }
            debug!(group = %group.name, z_rot = group.z_rot, "applied group transform");
        }

        if self.config.log_regions {
            for fixture in scene.iter() {
                debug!(
                    fixture = %fixture.name,
                    regions = fixture.regions.len(),
                    "derived regions"
                );
            }
        }
        debug!(fixtures = scene.len(), "scene composed");
        Ok(scene)
    }

    fn instantiate(&self, spec: &FixtureSpec, size: Vec3, style: &StyleConfig) -> Fixture {
        let swing = style.door_swing_for(spec.kind);
        match self.config.archetypes.get(&spec.kind) {
            Some(geometry) => {
                Fixture::from_geometry(spec.name.clone(), spec.kind, geometry, size, swing)
            }
            None => Fixture::from_kind(spec.name.clone(), spec.kind, size, swing),
        }
    }

    /// Resolves the spec's full extents: literal components win, then size
    /// references, then the style, then the kind default.
    fn resolve_size<R: Rng>(
        &self,
        spec: &FixtureSpec,
        style: &StyleConfig,
        scene: &Scene,
        rng: &mut R,
    ) -> Result<Vec3, LayoutError> {
        let needs_style = spec.size.iter().any(|d| d.is_none());
        let styled = if needs_style {
            style.size_for(spec.kind, rng)
        } else {
            None
        };
        let fallback = styled.unwrap_or_else(|| spec.kind.default_size());
        let mut out = Vec3::ZERO;
        for axis in 0..3 {
            out[axis] = match &spec.size[axis] {
                Some(SizeDim::Fixed(v)) => *v,
                Some(SizeDim::SameAs(target)) => scene
                    .fixture(target)
                    .and_then(|f| f.size)
                    .map(|s| s[axis])
                    .ok_or_else(|| LayoutError::SizeUnresolvable {
                        fixture: spec.name.clone(),
                        target: target.clone(),
                        axis,
                    })?,
                None => fallback[axis],
            };
        }
        Ok(out)
    }

    fn place(
        &self,
        spec: &FixtureSpec,
        fixture: &mut Fixture,
        scene: &Scene,
        known: &BTreeSet<String>,
    ) -> Result<(), LayoutError> {
        let resolved = |target: &str| -> Result<&Fixture, LayoutError> {
            scene.fixture(target).ok_or_else(|| {
                if known.contains(target) {
                    LayoutError::UnresolvedReference {
                        fixture: spec.name.clone(),
                        target: target.to_string(),
                    }
                } else {
                    LayoutError::DanglingReference {
                        fixture: spec.name.clone(),
                        target: target.to_string(),
                    }
                }
            })
        };

        match &spec.placement {
            Some(Placement::Absolute { pos, yaw }) => {
                fixture.set_pose(Pose::new(*pos, *yaw));
            }
            Some(Placement::Relative {
                align_to,
                side,
                alignment,
                gap,
            }) => {
                let anchor = resolved(align_to)?;
                let anchor_size = anchor.size.ok_or_else(|| LayoutError::SizeUnresolvable {
                    fixture: spec.name.clone(),
                    target: align_to.clone(),
                    axis: side.axis(),
                })?;
                let own_half = fixture.size.unwrap_or(Vec3::ZERO) / 2.0;
                let anchor_half = anchor_size / 2.0;

                // Offsets run between authored frames (bottom-face centers):
                // a planar side keeps both fixtures at their floor height, so
                // the z terms below convert the centroid arithmetic.
                let mut offset = Vec3::ZERO;
                let axis = side.axis();
                offset[axis] = side.sign() * (anchor_half[axis] + own_half[axis] + gap);
                if axis == 2 {
                    offset.z += anchor_half.z - own_half.z;
                }
                if let Some(align_axis) = alignment.axis() {
                    offset[align_axis] =
                        alignment.sign() * (anchor_half[align_axis] - own_half[align_axis]);
                    if align_axis == 2 {
                        offset.z += anchor_half.z - own_half.z;
                    }
                }

                fixture.pose.yaw = anchor.pose.yaw;
                fixture.pose.pos = anchor.pose.pos + rotate_z(offset, anchor.pose.yaw);
            }
            Some(Placement::Stacked { stack_on, pos_xy }) => {
                let base = resolved(stack_on)?;
                let base_size = base.size.ok_or_else(|| LayoutError::SizeUnresolvable {
                    fixture: spec.name.clone(),
                    target: stack_on.clone(),
                    axis: 2,
                })?;
                let own_half_z = fixture.size.map(|s| s.z / 2.0).unwrap_or(0.0);
                let top_z = base.origin().z + base_size.z / 2.0;
                let planar = pos_xy.unwrap_or(Vec2::ZERO);
                let xy = base.origin().truncate() + rotate_xy(planar, base.pose.yaw);
                fixture.pose.yaw = base.pose.yaw;
                fixture.set_origin(xy.extend(top_z + own_half_z));
            }
            None => {
                // Validation guarantees a container; inherit its frame.
                let container = resolved(
                    spec.interior_of
                        .as_deref()
                        .unwrap_or_default(),
                )?;
                fixture.pose.yaw = container.pose.yaw;
                fixture.set_origin(container.origin());
            }
        }
        Ok(())
    }
}

/// Suffixes member names with their group and rewrites in-group references
/// to match, so one fragment can appear several times in a layout.
fn flatten_groups(layout: &LayoutConfig) -> Vec<(FixtureSpec, usize)> {
    let mut out = Vec::new();
    for (group_idx, group) in layout.groups.iter().enumerate() {
        let members: BTreeSet<&str> = group.fixtures.iter().map(|s| s.name.as_str()).collect();
        let rename = |name: &str| -> String {
            if group.name.is_empty() || !members.contains(name) {
                name.to_string()
            } else {
                format!("{name}_{}", group.name)
            }
        };
        for spec in &group.fixtures {
            if !spec.enabled {
                continue;
            }
            let mut spec = spec.clone();
            spec.name = rename(&spec.name);
            if let Some(placement) = &mut spec.placement {
                match placement {
                    Placement::Relative { align_to, .. } => *align_to = rename(align_to),
                    Placement::Stacked { stack_on, .. } => *stack_on = rename(stack_on),
                    Placement::Absolute { .. } => {}
                }
            }
            if let Some(container) = &mut spec.interior_of {
                *container = rename(container);
            }
            for dim in &mut spec.size {
                if let Some(SizeDim::SameAs(target)) = dim {
                    *target = rename(target);
                }
            }
            out.push((spec, group_idx));
        }
    }
    out
}

fn validate(specs: &[(FixtureSpec, usize)]) -> Result<(), LayoutError> {
    let mut names = BTreeSet::new();
    for (spec, _) in specs {
        if !names.insert(spec.name.as_str()) {
            return Err(LayoutError::DuplicateName(spec.name.clone()));
        }
    }

    for (spec, _) in specs {
        if spec.placement.is_none() && spec.interior_of.is_none() {
            return Err(LayoutError::MissingPlacement {
                fixture: spec.name.clone(),
            });
        }
        if let Some(Placement::Relative {
            side, alignment, ..
        }) = &spec.placement
            && !alignment.compatible_with(*side)
        {
            return Err(LayoutError::IncompatibleAlignment {
                fixture: spec.name.clone(),
                side: side.as_str().to_string(),
                alignment: alignment.as_str().to_string(),
            });
        }
        match (spec.kind, &spec.stack) {
            (FixtureKind::Stack, Some(stack)) => validate_stack(&spec.name, stack)?,
            (FixtureKind::Stack, None) => {
                return Err(LayoutError::InvalidStack {
                    fixture: spec.name.clone(),
                    reason: "missing level table".into(),
                });
            }
            (_, Some(_)) => {
                return Err(LayoutError::InvalidStack {
                    fixture: spec.name.clone(),
                    reason: "level table on a non-stack fixture".into(),
                });
            }
            (_, None) => {}
        }

        // Every reference must at least exist; ordering is checked during
        // resolution.
        let mut targets: Vec<&String> = Vec::new();
        match &spec.placement {
            Some(Placement::Relative { align_to, .. }) => targets.push(align_to),
            Some(Placement::Stacked { stack_on, .. }) => targets.push(stack_on),
            _ => {}
        }
        if let Some(container) = &spec.interior_of {
            targets.push(container);
        }
        for dim in &spec.size {
            if let Some(SizeDim::SameAs(target)) = dim {
                targets.push(target);
            }
        }
        for target in targets {
            if !names.contains(target.as_str()) {
                return Err(LayoutError::DanglingReference {
                    fixture: spec.name.clone(),
                    target: target.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_stack(name: &str, stack: &StackSpec) -> Result<(), LayoutError> {
    let fail = |reason: &str| LayoutError::InvalidStack {
        fixture: name.to_string(),
        reason: reason.to_string(),
    };
    if stack.levels.is_empty() {
        return Err(fail("no levels"));
    }
    if stack.levels.len() != stack.percentages.len() {
        return Err(fail("levels and percentages differ in length"));
    }
    if stack.percentages.iter().any(|p| *p <= 0.0) {
        return Err(fail("percentages must be positive"));
    }
    let sum: f32 = stack.percentages.iter().sum();
    if (sum - 1.0).abs() > 1e-3 {
        return Err(fail("percentages must sum to 1"));
    }
    if stack.levels.iter().any(|l| l.is_empty() || l.len() > 2) {
        return Err(fail("each level holds one or two fixtures"));
    }
    if stack.base_height <= 0.0 {
        return Err(fail("base height must be positive"));
    }
    Ok(())
}

/// Replaces every stack spec with its synthetic base and level specs, and
/// rewrites references to the stack to point at its base.
fn expand_stacks(
    specs: Vec<(FixtureSpec, usize)>,
) -> Result<Vec<(FixtureSpec, usize)>, LayoutError> {
    let mut renames: BTreeMap<String, String> = BTreeMap::new();
    let mut out = Vec::new();

    for (spec, group_idx) in specs {
        if spec.kind != FixtureKind::Stack {
            out.push((spec, group_idx));
            continue;
        }
        // Guaranteed by validate().
        let Some(stack) = spec.stack.clone() else {
            continue;
        };
        let size = literal_stack_size(&spec)?;
        if stack.base_height >= size.z {
            return Err(LayoutError::InvalidStack {
                fixture: spec.name.clone(),
                reason: "base height exceeds stack height".into(),
            });
        }

        let base_name = format!("{}_base", spec.name);
        renames.insert(spec.name.clone(), base_name.clone());
        let mut base = FixtureSpec::new(&base_name, FixtureKind::Box)
            .with_size(Vec3::new(size.x, size.y, stack.base_height));
        base.placement = spec.placement.clone();
        base.interior_of = spec.interior_of.clone();
        out.push((base, group_idx));

        // Levels chain upwards; each level stacks on a representative piece
        // of the one below and compensates for that piece's lateral offset.
        let mut prev = base_name;
        let mut prev_off = 0.0f32;
        let body_height = size.z - stack.base_height;
        for (i, (level, pct)) in stack.levels.iter().zip(&stack.percentages).enumerate() {
            let level_height = body_height * pct;
            if level.len() == 1 {
                let name = format!("{}_l{i}", spec.name);
                let mut piece = FixtureSpec::new(&name, level[0])
                    .with_size(Vec3::new(size.x, size.y, level_height));
                piece.placement = Some(Placement::Stacked {
                    stack_on: prev.clone(),
                    pos_xy: Some(Vec2::new(-prev_off, 0.0)),
                });
                out.push((piece, group_idx));
                prev = name;
                prev_off = 0.0;
            } else {
                let half_w = size.x / 2.0;
                let mut first = None;
                for (j, kind) in level.iter().enumerate() {
                    let name = format!(
                        "{}_l{i}_{}",
                        spec.name,
                        if j == 0 { "left" } else { "right" }
                    );
                    let lateral = if j == 0 { -half_w / 2.0 } else { half_w / 2.0 };
                    let mut piece = FixtureSpec::new(&name, *kind)
                        .with_size(Vec3::new(half_w, size.y, level_height));
                    piece.placement = Some(Placement::Stacked {
                        stack_on: prev.clone(),
                        pos_xy: Some(Vec2::new(lateral - prev_off, 0.0)),
                    });
                    out.push((piece, group_idx));
                    if first.is_none() {
                        first = Some(name);
                    }
                }
                prev = first.unwrap_or(prev);
                prev_off = -half_w / 2.0;
            }
        }
    }

    if !renames.is_empty() {
        for (spec, _) in &mut out {
            if let Some(placement) = &mut spec.placement {
                match placement {
                    Placement::Relative { align_to, .. } => {
                        if let Some(new) = renames.get(align_to) {
                            *align_to = new.clone();
                        }
                    }
                    Placement::Stacked { stack_on, .. } => {
                        if let Some(new) = renames.get(stack_on) {
                            *stack_on = new.clone();
                        }
                    }
                    Placement::Absolute { .. } => {}
                }
            }
            if let Some(container) = &mut spec.interior_of
                && let Some(new) = renames.get(container)
            {
                *container = new.clone();
            }
            for dim in &mut spec.size {
                if let Some(SizeDim::SameAs(target)) = dim
                    && let Some(new) = renames.get(target)
                {
                    *target = new.clone();
                }
            }
        }
    }
    Ok(out)
}

/// Stack extents must be literal: level heights are computed before any
/// fixture exists to borrow a size from.
fn literal_stack_size(spec: &FixtureSpec) -> Result<Vec3, LayoutError> {
    let default = spec.kind.default_size();
    let mut out = Vec3::ZERO;
    for axis in 0..3 {
        out[axis] = match &spec.size[axis] {
            Some(SizeDim::Fixed(v)) => *v,
            Some(SizeDim::SameAs(_)) => {
                return Err(LayoutError::InvalidStack {
                    fixture: spec.name.clone(),
                    reason: "stack size must be numeric".into(),
                });
            }
            None => default[axis],
        };
    }
    Ok(out)
}

/// A fixture search, by name fragment and/or kind, optionally biased toward
/// a reference point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FixtureQuery {
    /// Substring the fixture name must contain.
    pub name_contains: Option<String>,

    pub kind: Option<FixtureKind>,

    /// Prefer the fixture containing this world point; fall back to the
    /// nearest, drawing among near-ties.
    pub near: Option<Vec3>,

    /// Require at least one reset region offering this footprint.
    pub min_region: Option<Vec2>,
}

impl FixtureQuery {
    pub fn kind(kind: FixtureKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn named(fragment: impl Into<String>) -> Self {
        Self {
            name_contains: Some(fragment.into()),
            ..Default::default()
        }
    }

    pub fn near(mut self, point: Vec3) -> Self {
        self.near = Some(point);
        self
    }

    pub fn with_min_region(mut self, min: Vec2) -> Self {
        self.min_region = Some(min);
        self
    }
}

/// The composed fixture registry.
///
/// Iteration order is the resolution order, which keeps every random draw
/// over fixtures reproducible.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Scene {
    fixtures: Vec<Fixture>,
    groups: Vec<usize>,
    index: BTreeMap<String, usize>,
    refs: BTreeMap<String, String>,
}

impl Scene {
    fn insert(&mut self, fixture: Fixture, group: usize) -> Result<(), LayoutError> {
        if self.index.contains_key(&fixture.name) {
            return Err(LayoutError::DuplicateName(fixture.name.clone()));
        }
        self.index.insert(fixture.name.clone(), self.fixtures.len());
        self.fixtures.push(fixture);
        self.groups.push(group);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fixture> {
        self.fixtures.iter()
    }

    pub fn fixture(&self, name: &str) -> Option<&Fixture> {
        self.index.get(name).map(|i| &self.fixtures[*i])
    }

    pub fn fixture_mut(&mut self, name: &str) -> Option<&mut Fixture> {
        self.index.get(name).map(|i| &mut self.fixtures[*i])
    }

    fn fixtures_in_group_mut(&mut self, group: usize) -> impl Iterator<Item = &mut Fixture> {
        self.fixtures
            .iter_mut()
            .zip(&self.groups)
            .filter(move |(_, g)| **g == group)
            .map(|(f, _)| f)
    }

    /// Finds a fixture matching `query`.
    ///
    /// With a reference point, fixtures containing it (planar test) win;
    /// otherwise the nearest candidates within a slack band are drawn from
    /// uniformly. Without a reference the draw spans all candidates.
    pub fn find_fixture<R: Rng>(&self, query: &FixtureQuery, rng: &mut R) -> Option<&Fixture> {
        let mut candidates: Vec<&Fixture> = self
            .fixtures
            .iter()
            .filter(|f| match &query.name_contains {
                Some(fragment) => f.name.contains(fragment.as_str()),
                None => true,
            })
            .filter(|f| match query.kind {
                Some(kind) => f.kind == kind,
                None => true,
            })
            .filter(|f| match query.min_region {
                Some(min) => !f
                    .reset_regions(&ResetRegionQuery::default().with_min_size(min))
                    .is_empty(),
                None => true,
            })
            .collect();

        if let Some(point) = query.near {
            let containing: Vec<&Fixture> = candidates
                .iter()
                .copied()
                .filter(|f| f.contains_point(point, true))
                .collect();
            if !containing.is_empty() {
                return containing.choose(rng).copied();
            }
            let distance = |f: &Fixture| -> f32 {
                match f.exterior_box() {
                    Some(bbox) => bbox
                        .corners()
                        .iter()
                        .map(|c| c.distance(point))
                        .fold(f32::INFINITY, f32::min),
                    None => f.pose.pos.distance(point),
                }
            };
            let best = candidates
                .iter()
                .map(|f| distance(f))
                .fold(f32::INFINITY, f32::min);
            candidates.retain(|f| distance(f) <= best + NEAR_SLACK);
        }
        candidates.choose(rng).copied()
    }

    /// Finds a fixture once and pins the answer under `key`: later calls with
    /// the same key return the same fixture, which keeps episode metadata
    /// stable across queries.
    pub fn register_fixture_ref<R: Rng>(
        &mut self,
        key: &str,
        query: &FixtureQuery,
        rng: &mut R,
    ) -> Option<String> {
        if let Some(name) = self.refs.get(key) {
            return Some(name.clone());
        }
        let name = self.find_fixture(query, rng)?.name.clone();
        self.refs.insert(key.to_string(), name.clone());
        Some(name)
    }

    /// Moves a fixture, carrying its interior fixtures along rigidly.
    pub fn set_fixture_pose(&mut self, name: &str, pose: Pose) -> Result<(), LayoutError> {
        let Some(&root) = self.index.get(name) else {
            return Err(LayoutError::NoSuchFixture(name.to_string()));
        };
        let mut work = vec![(root, pose)];
        while let Some((idx, new_pose)) = work.pop() {
            let old_pose = self.fixtures[idx].pose;
            for child in self.fixtures[idx].interior.clone() {
                if let Some(&child_idx) = self.index.get(child.as_str()) {
                    let rel = old_pose.rel_pose(&self.fixtures[child_idx].pose);
                    work.push((child_idx, new_pose.compose(&rel)));
                }
            }
            self.fixtures[idx].set_pose(new_pose);
        }
        Ok(())
    }

    /// Reset regions of `fixture`, with counter tops split around whatever
    /// stands on them.
    pub fn reset_regions(&self, fixture: &Fixture, query: &ResetRegionQuery) -> Vec<ResetRegion> {
        let mut candidates = fixture.candidate_regions(query);
        if fixture.kind == FixtureKind::Counter {
            candidates = self.split_around_occupants(fixture, candidates);
        }
        fixture.select_regions(candidates, query)
    }

    /// Draws one eligible reset region, obstruction-aware.
    pub fn sample_reset_region<R: Rng>(
        &self,
        fixture: &Fixture,
        query: &ResetRegionQuery,
        rng: &mut R,
    ) -> Result<ResetRegion, SamplingError> {
        let regions = self.reset_regions(fixture, query);
        let pick = match query.hint {
            LocationHint::Nearest => regions.first(),
            _ => regions.choose(rng),
        };
        pick.cloned().ok_or_else(|| SamplingError::NoRegion {
            fixture: fixture.name.clone(),
            width: query.min_size.x,
            depth: query.min_size.y,
        })
    }

    /// Splits top regions along X wherever another fixture stands on the
    /// counter. Pieces narrower than the minimum split width are dropped;
    /// untouched regions pass through whole.
    fn split_around_occupants(&self, counter: &Fixture, regions: Vec<Region>) -> Vec<Region> {
        let Some(size) = counter.size else {
            return regions;
        };
        let top_z = counter.origin().z + size.z / 2.0;
        let slab = UprightBox {
            center: counter.origin().truncate().extend(top_z),
            half: (size.truncate() / 2.0).extend(OCCUPANT_SLAB),
            yaw: counter.pose.yaw,
        };
        let occupants: Vec<&Fixture> = self
            .fixtures
            .iter()
            .filter(|f| f.name != counter.name)
            .filter(|f| {
                f.exterior_box()
                    .is_some_and(|bbox| boxes_intersect(&bbox, &slab))
            })
            .collect();
        if occupants.is_empty() {
            return regions;
        }

        let mut out = Vec::new();
        for region in regions {
            let y_lo = region.center.y - region.half_extents.y;
            let y_hi = region.center.y + region.half_extents.y;
            let mut intervals = vec![(
                region.center.x - region.half_extents.x,
                region.center.x + region.half_extents.x,
            )];
            for occ in &occupants {
                let Some(bbox) = occ.exterior_box() else {
                    continue;
                };
                // Occupant extent in the counter's frame.
                let mut x_lo = f32::INFINITY;
                let mut x_hi = f32::NEG_INFINITY;
                let mut occ_y_lo = f32::INFINITY;
                let mut occ_y_hi = f32::NEG_INFINITY;
                for corner in bbox.footprint() {
                    let local = counter.pose.inverse_transform_point(corner.extend(top_z));
                    x_lo = x_lo.min(local.x);
                    x_hi = x_hi.max(local.x);
                    occ_y_lo = occ_y_lo.min(local.y);
                    occ_y_hi = occ_y_hi.max(local.y);
                }
                if occ_y_hi < y_lo || occ_y_lo > y_hi {
                    continue;
                }
                let mut next = Vec::new();
                for (lo, hi) in intervals {
                    if x_lo > lo {
                        next.push((lo, x_lo.min(hi)));
                    }
                    if x_hi < hi {
                        next.push((x_hi.max(lo), hi));
                    }
                }
                intervals = next;
            }

            let whole = intervals.len() == 1
                && (intervals[0].1 - intervals[0].0 - region.width()).abs() < 1e-6;
            if whole {
                out.push(region);
                continue;
            }
            for (i, (lo, hi)) in intervals.iter().enumerate() {
                if hi - lo < MIN_SPLIT_WIDTH {
                    continue;
                }
                let mut piece = region.clone();
                piece.name = format!("{}_{i}", region.name);
                piece.center.x = (lo + hi) / 2.0;
                piece.half_extents.x = (hi - lo) / 2.0;
                out.push(piece);
            }
        }
        out
    }

    /// World pose for an agent standing in front of `name`, facing it.
    ///
    /// A fixture contained in another (a basin in a counter) anchors to its
    /// container's front instead. `offset` shifts the anchor in the host's
    /// frame; the pose sits on the floor.
    pub fn base_pose_facing(&self, name: &str, offset: Option<Vec2>) -> Option<Pose> {
        let fixture = self.fixture(name)?;
        let host = self
            .fixtures
            .iter()
            .find(|f| f.interior.iter().any(|n| n == name))
            .unwrap_or(fixture);
        let depth = host.depth()?;
        let offset = offset.unwrap_or(Vec2::ZERO);
        let local = Vec3::new(offset.x, -(depth / 2.0 + BASE_STANDOFF) + offset.y, 0.0);
        let anchor = host.origin() + rotate_z(local, host.pose.yaw);
        Some(Pose::new(anchor.truncate().extend(0.0), host.pose.yaw))
    }

    /// True when two placed footprints overlap anywhere in the scene's plane.
    pub fn footprints_overlap(a: &[Vec2; 4], b: &[Vec2; 4]) -> bool {
        rects_overlap(a, b)
    }
}
