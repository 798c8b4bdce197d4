// tests/placement.rs
use glam::{Vec2, Vec3, vec3};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use scullery::{
    Anchor, Fixture, FixtureGroup, FixtureKind, FixtureSpec, LayoutConfig, OverlapPolicy,
    Placement, PlacementConstraint, PlacementSampler, ResetRegionQuery, SamplingError, Scene,
    SceneComposer, StyleConfig,
};

fn counter(width: f32) -> Fixture {
    Fixture::from_kind(
        "counter",
        FixtureKind::Counter,
        vec3(width, 0.7, 0.9),
        None,
    )
}

#[test]
fn test_counter_surface_hosts_and_rejects() {
    let counter = counter(1.0);
    let mut rng = Pcg64Mcg::seed_from_u64(17);

    // The only reset region is the top plate, at the counter's full height.
    let region = counter
        .sample_reset_region(&ResetRegionQuery::default(), &mut rng)
        .unwrap();
    assert_eq!(region.name, "top");
    assert!((region.offset.z - 0.9).abs() < 1e-6);

    // Demanding more area than the slab has yields the sizing error, not a
    // retry loop.
    let err = counter
        .sample_reset_region(
            &ResetRegionQuery::default().with_min_size(Vec2::splat(2.0)),
            &mut rng,
        )
        .unwrap_err();
    assert_eq!(
        err,
        SamplingError::NoRegion {
            fixture: "counter".into(),
            width: 2.0,
            depth: 2.0,
        }
    );
}

#[test]
fn test_sequential_placement_avoids_earlier_objects() {
    let counter = counter(2.0);
    let query = ResetRegionQuery::default();
    let mut rng = Pcg64Mcg::seed_from_u64(23);

    // Four objects, one anchored into each corner of the slab, every draw
    // fed the footprints already placed.
    let corners = [(-1.0, -1.0), (-1.0, 1.0), (1.0, -1.0), (1.0, 1.0)];
    let mut placed: Vec<[Vec2; 4]> = Vec::new();
    for (fx, fy) in corners {
        let sampler = PlacementSampler::new(PlacementConstraint {
            attempts: 256,
            ..PlacementConstraint::for_footprint(Vec2::new(0.3, 0.25))
                .with_anchor(Anchor::Fraction(fx), Anchor::Fraction(fy))
        });
        let hit = sampler
            .sample(&counter, &query, &placed, &mut rng)
            .unwrap();
        // Inside the slab: the counter is axis aligned at the origin.
        for corner in hit.footprint {
            assert!(corner.x.abs() <= 1.0 + 1e-6);
            assert!(corner.y.abs() <= 0.35 + 1e-6);
        }
        assert!((hit.pos.z - 0.9).abs() < 1e-6, "objects rest on the surface");
        placed.push(hit.footprint);
    }

    for i in 0..placed.len() {
        for j in (i + 1)..placed.len() {
            assert!(
                !Scene::footprints_overlap(&placed[i], &placed[j]),
                "placements {i} and {j} intersect"
            );
        }
    }
}

#[test]
fn test_saturated_surface_exhausts_retries() {
    let counter = counter(1.0);
    // One footprint already covers the whole slab.
    let blocked = [counter
        .reset_regions(&ResetRegionQuery::default())
        .remove(0)
        .footprint()];
    let sampler =
        PlacementSampler::new(PlacementConstraint::for_footprint(Vec2::new(0.2, 0.2)));
    let mut rng = Pcg64Mcg::seed_from_u64(29);

    let err = sampler
        .sample(&counter, &ResetRegionQuery::default(), &blocked, &mut rng)
        .unwrap_err();
    assert_eq!(
        err,
        SamplingError::RetriesExhausted {
            region: "top".into(),
            attempts: 5,
        }
    );

    // The same draw with overlap allowed goes straight through.
    let permissive = PlacementSampler::new(PlacementConstraint {
        overlap: OverlapPolicy::Allow,
        ..PlacementConstraint::for_footprint(Vec2::new(0.2, 0.2))
    });
    let mut rng = Pcg64Mcg::seed_from_u64(29);
    assert!(permissive
        .sample(&counter, &ResetRegionQuery::default(), &blocked, &mut rng)
        .is_ok());
}

#[test]
fn test_shelf_levels_address_individually() {
    let shelf = Fixture::from_kind(
        "shelf",
        FixtureKind::OpenCabinet,
        vec3(0.9, 0.35, 1.2),
        None,
    );
    assert_eq!(shelf.rack_levels(), 3);

    let mut query = ResetRegionQuery::default();
    query.shelf_level = Some(1);
    let regions = shelf.reset_regions(&query);
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].name, "level1");
    // Middle shelf floor: level centers at (i + 0.5) / 3 of the height,
    // minus half the slot thickness: 0.5 * 1.2 - 0.14 * 1.2.
    assert!((regions[0].offset.z - 0.432).abs() < 1e-5);
    assert!(regions[0].height.is_some(), "a shelf has a ceiling");
}

#[test]
fn test_anchored_draws_track_a_moved_region() {
    // Sampling through a fixture with a live pose: region frames follow.
    let mut counter = counter(2.0);
    counter.set_pose(scullery::Pose::new(vec3(4.0, -1.0, 0.0), 0.0));

    let sampler = PlacementSampler::new(
        PlacementConstraint {
            attempts: 64,
            ..PlacementConstraint::for_footprint(Vec2::new(0.4, 0.3))
        }
        .with_anchor(Anchor::Fraction(1.0), Anchor::Fraction(0.0))
        .with_rotation(0.0, 0.0),
    );
    let mut rng = Pcg64Mcg::seed_from_u64(31);

    for _ in 0..16 {
        let hit = sampler
            .sample(&counter, &ResetRegionQuery::default(), &[], &mut rng)
            .unwrap();
        // Window pressed against the +x edge of the relocated slab.
        assert!(hit.pos.x > 4.3);
        assert!(hit.pos.x < 5.0);
        assert!((hit.pos.z - 0.9).abs() < 1e-6);
    }
}

#[test]
fn test_scene_split_keeps_draws_off_the_occupant() {
    // A counter with a crate standing mid-slab: scene-level regions split
    // around it and sampling in the pieces never touches the crate.
    let mut holder = FixtureSpec::new("crate", FixtureKind::Box)
        .with_size(vec3(0.4, 0.4, 0.3));
    holder.placement = Some(Placement::Stacked {
        stack_on: "counter".into(),
        pos_xy: Some(Vec2::ZERO),
    });
    let layout = LayoutConfig {
        groups: vec![FixtureGroup::anonymous(vec![
            FixtureSpec::new("counter", FixtureKind::Counter)
                .with_size(vec3(2.4, 0.7, 0.9))
                .with_placement(Placement::Absolute {
                    pos: Vec3::ZERO,
                    yaw: 0.0,
                }),
            holder,
        ])],
    };
    let mut rng = Pcg64Mcg::seed_from_u64(37);
    let scene = SceneComposer::default()
        .build(&layout, &StyleConfig::default(), &mut rng)
        .unwrap();

    let counter = scene.fixture("counter").unwrap();
    let regions = scene.reset_regions(counter, &ResetRegionQuery::default());
    assert_eq!(regions.len(), 2, "the crate bisects the slab");

    let crate_footprint = scene
        .fixture("crate")
        .unwrap()
        .exterior_box()
        .unwrap()
        .footprint();
    let sampler = PlacementSampler::new(PlacementConstraint {
        attempts: 64,
        ..PlacementConstraint::for_footprint(Vec2::new(0.3, 0.3))
    });
    for region in &regions {
        for _ in 0..8 {
            let hit = sampler.sample_in_region(region, &[], &mut rng).unwrap();
            assert!(
                !Scene::footprints_overlap(&hit.footprint, &crate_footprint),
                "draw in {} landed on the crate",
                region.name
            );
        }
    }
}

#[test]
fn test_accessories_offer_no_surface() {
    let trinket = Fixture::from_kind(
        "trinket",
        FixtureKind::Accessory,
        vec3(0.2, 0.2, 0.2),
        None,
    );
    assert!(!trinket.has_regions());

    let mut rng = Pcg64Mcg::seed_from_u64(41);
    let err = trinket
        .sample_reset_region(&ResetRegionQuery::default(), &mut rng)
        .unwrap_err();
    assert!(matches!(err, SamplingError::NoRegion { .. }));
}
