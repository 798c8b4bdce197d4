// tests/compose_scene.rs
use glam::{Vec2, Vec3, vec3};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use scullery::{
    Alignment, FixtureGroup, FixtureKind, FixtureQuery, FixtureSpec, JointIo, LayoutConfig,
    Placement, Pose, ResetRegionQuery, SceneComposer, Side, StackSpec, StyleConfig,
};
use std::collections::BTreeMap;
use std::f32::consts::FRAC_PI_2;

/// Records every joint write; all joints exist.
#[derive(Default)]
struct Articulation {
    joints: BTreeMap<String, f32>,
}

impl JointIo for Articulation {
    fn joint_value(&self, joint: &str) -> Option<f32> {
        self.joints.get(joint).copied()
    }

    fn set_joint_value(&mut self, joint: &str, value: f32) -> bool {
        self.joints.insert(joint.to_string(), value);
        true
    }
}

/// A kitchenette: a counter run with a basin, a fridge, a pantry stack and a
/// hanging cabinet, plus a rotated island.
fn kitchenette() -> LayoutConfig {
    let counter = FixtureSpec::new("counter", FixtureKind::Counter)
        .with_size(vec3(1.8, 0.65, 0.92))
        .with_placement(Placement::Absolute {
            pos: Vec3::ZERO,
            yaw: 0.0,
        });

    let mut basin =
        FixtureSpec::new("basin", FixtureKind::Sink).with_size(vec3(0.6, 0.5, 0.28));
    basin.interior_of = Some("counter".into());

    let fridge = FixtureSpec::new("fridge", FixtureKind::Fridge)
        .with_size(vec3(0.9, 0.7, 1.8))
        .with_placement(Placement::Relative {
            align_to: "counter".into(),
            side: Side::Right,
            alignment: Alignment::Back,
            gap: 0.02,
        });

    let mut pantry = FixtureSpec::new("pantry", FixtureKind::Stack)
        .with_size(vec3(0.9, 0.65, 2.2))
        .with_placement(Placement::Relative {
            align_to: "counter".into(),
            side: Side::Left,
            alignment: Alignment::Back,
            gap: 0.0,
        });
    pantry.stack = Some(StackSpec {
        levels: vec![
            vec![FixtureKind::Drawer],
            vec![FixtureKind::SingleCabinet, FixtureKind::SingleCabinet],
        ],
        percentages: vec![0.3, 0.7],
        base_height: 0.1,
    });

    let upper = FixtureSpec::new("upper", FixtureKind::HingeCabinet)
        .with_size(vec3(0.9, 0.35, 0.6))
        .with_placement(Placement::Relative {
            align_to: "counter".into(),
            side: Side::Top,
            alignment: Alignment::Back,
            gap: 0.5,
        });

    let island = FixtureGroup {
        name: "island".into(),
        origin: Vec2::ZERO,
        pos: Vec2::new(0.0, 2.0),
        z_rot: FRAC_PI_2,
        fixtures: vec![
            FixtureSpec::new("block", FixtureKind::Counter)
                .with_size(vec3(1.2, 0.7, 0.9))
                .with_placement(Placement::Absolute {
                    pos: vec3(0.5, 0.0, 0.0),
                    yaw: 0.0,
                }),
        ],
    };

    LayoutConfig {
        groups: vec![
            FixtureGroup::anonymous(vec![counter, basin, fridge, pantry, upper]),
            island,
        ],
    }
}

fn build() -> scullery::Scene {
    let mut rng = Pcg64Mcg::seed_from_u64(42);
    SceneComposer::default()
        .build(&kitchenette(), &StyleConfig::default(), &mut rng)
        .unwrap()
}

#[test]
fn test_run_resolves_flush_and_grounded() {
    let scene = build();

    // The stack replaced itself with base + drawer + two cabinet halves:
    // 5 authored specs - 1 stack + 4 synthetic + 1 island = 9 fixtures.
    assert_eq!(scene.len(), 9, "stack expansion changes the census");

    let fridge = scene.fixture("fridge").unwrap();
    // Counter spans x -0.9..0.9; the fridge starts 0.02 past the right face.
    // Center offset: 0.9 + 0.45 + 0.02 = 1.37.
    assert!((fridge.pose.pos.x - 1.37).abs() < 1e-6);
    // Back faces coincide: counter back at y = 0.325, fridge is deeper, so
    // its center pulls forward to 0.325 - 0.35.
    assert!((fridge.pose.pos.y + 0.025).abs() < 1e-6);
    // A taller neighbor still stands on the floor.
    assert_eq!(fridge.pose.pos.z, 0.0);

    let base = scene.fixture("pantry_base").unwrap();
    assert!((base.pose.pos.x + 1.35).abs() < 1e-6);
    assert_eq!(base.pose.pos.z, 0.0);
}

#[test]
fn test_wall_cabinet_hangs_above_the_counter() {
    let scene = build();
    let upper = scene.fixture("upper").unwrap();

    // Side::Top with gap 0.5: bottom face at counter top (0.92) + 0.5.
    assert!((upper.pose.pos.z - 1.42).abs() < 1e-6);
    // Back-aligned: 0.325 - 0.175.
    assert!((upper.pose.pos.y - 0.15).abs() < 1e-6);
    assert!((upper.pose.pos.x - 0.0).abs() < 1e-6);
}

#[test]
fn test_stack_levels_partition_the_height() {
    let scene = build();

    // Base slab 0.1, body 2.1 split 30/70: drawer 0.63, cabinets 1.47.
    let drawer = scene.fixture("pantry_l0").unwrap();
    assert_eq!(drawer.kind, FixtureKind::Drawer);
    assert!((drawer.size.unwrap() - vec3(0.9, 0.65, 0.63)).length() < 1e-5);
    assert!((drawer.pose.pos.z - 0.1).abs() < 1e-6, "drawer sits on the base");

    let left = scene.fixture("pantry_l1_left").unwrap();
    let right = scene.fixture("pantry_l1_right").unwrap();
    assert!((left.size.unwrap() - vec3(0.45, 0.65, 1.47)).length() < 1e-5);
    assert!((left.pose.pos.z - 0.73).abs() < 1e-6, "cabinets sit on the drawer");
    // Halves flank the stack centerline at +-width/4.
    assert!((left.pose.pos.x - (-1.35 - 0.225)).abs() < 1e-6);
    assert!((right.pose.pos.x - (-1.35 + 0.225)).abs() < 1e-6);
    // Top of the stack lands at the declared 2.2.
    assert!((left.pose.pos.z + 1.47 - 2.2).abs() < 1e-6);
}

#[test]
fn test_island_group_is_rotated_and_shifted() {
    let scene = build();
    let block = scene.fixture("block_island").unwrap();

    // Authored at (0.5, 0), rotated a quarter turn about the group origin
    // onto (0, 0.5), then shifted by (0, 2).
    assert!(block.pose.pos.x.abs() < 1e-6);
    assert!((block.pose.pos.y - 2.5).abs() < 1e-6);
    assert!((block.pose.yaw - FRAC_PI_2).abs() < 1e-6);
}

#[test]
fn test_basin_rides_counter_repose() {
    let mut scene = build();
    assert_eq!(
        scene.fixture("counter").unwrap().interior,
        vec!["basin".to_string()]
    );

    scene
        .set_fixture_pose("counter", Pose::new(vec3(3.0, 1.0, 0.0), FRAC_PI_2))
        .unwrap();

    // The basin was centered in the counter, so it lands on the counter's
    // new origin with the same relative height.
    let basin = scene.fixture("basin").unwrap();
    assert!((basin.pose.pos.truncate() - Vec2::new(3.0, 1.0)).length() < 1e-6);
    assert!((basin.pose.yaw - FRAC_PI_2).abs() < 1e-6);
    assert!((basin.pose.pos.z - 0.32).abs() < 1e-6);
}

#[test]
fn test_counter_top_region_sits_at_surface_height() {
    let scene = build();
    let counter = scene.fixture("counter").unwrap();

    let regions = scene.reset_regions(counter, &ResetRegionQuery::default());
    assert_eq!(regions.len(), 1);
    let top = &regions[0];
    assert_eq!(top.name, "top");
    assert!((top.offset.z - 0.92).abs() < 1e-6, "support plane at counter top");
    assert!((top.size - Vec2::new(1.8, 0.65)).length() < 1e-6);
    assert_eq!(top.height, None, "nothing overhead on an open surface");

    // A 2 m x 2 m demand cannot fit.
    let none = scene.reset_regions(
        counter,
        &ResetRegionQuery::default().with_min_size(Vec2::splat(2.0)),
    );
    assert!(none.is_empty());
}

#[test]
fn test_basin_region_is_bounded_overhead() {
    let scene = build();
    let basin = scene.fixture("basin").unwrap();
    let regions = basin.reset_regions(&ResetRegionQuery::default());
    assert_eq!(regions.len(), 1);
    // Cylinder body: height 0.5 of the unit archetype scaled by 0.28.
    assert_eq!(regions[0].height, Some(0.14));
}

#[test]
fn test_door_cycle_round_trips_both_hinges() {
    let scene = build();
    let upper = scene.fixture("upper").unwrap();
    let mut io = Articulation::default();
    let mut rng = Pcg64Mcg::seed_from_u64(13);

    // A hinge cabinet carries one leaf per side, with mirrored native
    // ranges. Closed writes drive both to raw 0.
    assert_eq!(upper.close_door(&mut io, &mut rng), 2);
    assert_eq!(io.joint_value("upper_door_left_hinge"), Some(0.0));
    assert_eq!(io.joint_value("upper_door_right_hinge"), Some(0.0));
    assert_eq!(upper.is_closed(&io, 0.005), Some(true));
    assert_eq!(upper.is_open(&io, 0.90), Some(false));

    assert_eq!(upper.open_door(&mut io, &mut rng), 2);
    // The left leaf swings negative, the right positive.
    assert!(io.joint_value("upper_door_left_hinge").unwrap() < -1.3);
    assert!(io.joint_value("upper_door_right_hinge").unwrap() > 1.3);
    assert_eq!(upper.is_open(&io, 0.90), Some(true));
    assert_eq!(upper.is_closed(&io, 0.005), Some(false));

    assert_eq!(upper.close_door(&mut io, &mut rng), 2);
    assert_eq!(upper.is_closed(&io, 0.005), Some(true));
}

#[test]
fn test_drawer_opens_partially() {
    let scene = build();
    let drawer = scene.fixture("pantry_l0").unwrap();
    let mut io = Articulation::default();
    let mut rng = Pcg64Mcg::seed_from_u64(21);

    assert_eq!(drawer.open_door(&mut io, &mut rng), 1);
    let raw = io.joint_value("pantry_l0_slide").unwrap();
    // Slide travel is 0.55 * depth = 0.3575, authored negative; a partial
    // open stops well short of it.
    assert!(raw < 0.0);
    assert!(raw > -0.55 * 0.65 * 0.5);
    // Partially open is neither open nor closed.
    assert_eq!(drawer.is_open(&io, 0.90), Some(false));
    assert_eq!(drawer.is_closed(&io, 0.005), Some(false));
}

#[test]
fn test_find_fixture_by_kind_and_proximity() {
    let scene = build();
    let mut rng = Pcg64Mcg::seed_from_u64(5);

    // Exactly one fridge exists; the draw cannot miss.
    let fridge = scene
        .find_fixture(&FixtureQuery::kind(FixtureKind::Fridge), &mut rng)
        .unwrap();
    assert_eq!(fridge.name, "fridge");

    // A point over the island picks the island block, not the run counter.
    let near = scene
        .find_fixture(
            &FixtureQuery::kind(FixtureKind::Counter).near(vec3(0.0, 2.5, 0.5)),
            &mut rng,
        )
        .unwrap();
    assert_eq!(near.name, "block_island");
}

#[test]
fn test_base_pose_faces_the_basin_host() {
    let scene = build();

    // The basin lives inside the counter, so the standing pose anchors to
    // the counter's front face, not the basin's own.
    let pose = scene.base_pose_facing("basin", None).unwrap();
    assert!((pose.pos.y - (-0.325 - 0.30)).abs() < 1e-6);
    assert_eq!(pose.pos.z, 0.0);
    assert_eq!(pose.yaw, 0.0);
}

#[test]
fn test_same_seed_builds_identical_scenes() {
    let layout = kitchenette();
    let style = StyleConfig::default();

    let mut rng_a = Pcg64Mcg::seed_from_u64(7);
    let mut rng_b = Pcg64Mcg::seed_from_u64(7);
    let a = SceneComposer::default()
        .build(&layout, &style, &mut rng_a)
        .unwrap();
    let b = SceneComposer::default()
        .build(&layout, &style, &mut rng_b)
        .unwrap();

    let a = serde_json::to_string(&a).unwrap();
    let b = serde_json::to_string(&b).unwrap();
    assert_eq!(a, b, "composition must be bit-stable under a fixed seed");
}

#[test]
fn test_layout_parses_from_json() {
    let layout: LayoutConfig = serde_json::from_str(
        r#"{
            "groups": [{
                "fixtures": [
                    {
                        "name": "counter",
                        "kind": "counter",
                        "size": [1.5, 0.6, 0.9],
                        "placement": { "mode": "absolute" }
                    },
                    {
                        "name": "stove",
                        "kind": "stove",
                        "placement": {
                            "mode": "relative",
                            "align_to": "counter",
                            "side": "right"
                        }
                    }
                ]
            }]
        }"#,
    )
    .unwrap();

    let mut rng = Pcg64Mcg::seed_from_u64(1);
    let scene = SceneComposer::default()
        .build(&layout, &StyleConfig::default(), &mut rng)
        .unwrap();

    let stove = scene.fixture("stove").unwrap();
    assert_eq!(stove.kind, FixtureKind::Stove);
    // Default stove width 0.76 against the 1.5 counter: 0.75 + 0.38.
    assert!((stove.pose.pos.x - 1.13).abs() < 1e-6);
    assert_eq!(stove.pose.pos.z, 0.0);
}

#[test]
fn test_styled_sizes_feed_unsized_specs() {
    use scullery::KindStyle;

    let layout = LayoutConfig {
        groups: vec![FixtureGroup::anonymous(vec![
            FixtureSpec::new("counter", FixtureKind::Counter).with_placement(
                Placement::Absolute {
                    pos: Vec3::ZERO,
                    yaw: 0.0,
                },
            ),
        ])],
    };
    let mut style = StyleConfig::default();
    style.kinds.insert(
        FixtureKind::Counter,
        KindStyle {
            size: Some(vec3(2.4, 0.7, 0.95)),
            size_choices: Vec::new(),
            door_swing: None,
        },
    );

    let mut rng = Pcg64Mcg::seed_from_u64(3);
    let scene = SceneComposer::default()
        .build(&layout, &style, &mut rng)
        .unwrap();
    assert_eq!(
        scene.fixture("counter").unwrap().size,
        Some(vec3(2.4, 0.7, 0.95))
    );
}
