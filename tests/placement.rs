//! Randomized agent placement: collision-freedom, partitioning, routes.

mod common;

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f64::consts::{PI, TAU};
use urban_sim::{
    Layout, ObjectKind, StateError, StateOptions, StaticRecord, WorldState,
};

#[test]
fn cars_spawn_collision_free_and_partitioned() {
    let mut layout = common::crossroad_layout();
    let options = StateOptions {
        controlled_cars: 2,
        background_cars: 4,
        background_peds: 3,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(99);
    let state = WorldState::from_layout(&mut layout, &options, &mut rng).unwrap();

    let cars = state.objects_of_kind(ObjectKind::Car);
    assert_eq!(cars.len(), 6);
    assert_eq!(state.controlled_cars().len(), 2);
    assert_eq!(state.background_cars().len(), 4);
    assert!(state
        .controlled_cars()
        .iter()
        .all(|id| !state.background_cars().contains(id)));
    for id in state.controlled_cars() {
        assert!(state.dynamic(*id).unwrap().is_controlled());
    }

    for (id, obj) in state.iter_dynamics() {
        assert!(!state.is_in_collision(id), "{:?} spawned overlapping", obj.kind());
    }

    // Pairwise spacing between car centres respects the placement minimum.
    for (i, a) in cars.iter().enumerate() {
        for b in &cars[i + 1..] {
            let dist = state
                .object(*a)
                .unwrap()
                .shape()
                .dist_to(state.object(*b).unwrap().shape());
            assert!(dist > 10.0, "cars {dist} units apart");
        }
    }

    // Every car lies within the scene, faces roughly along its lane, and
    // has somewhere to go.
    let (width, height) = state.dimensions();
    let scene_x = urban_sim::Interval::new(0.0, width);
    let scene_y = urban_sim::Interval::new(0.0, height);
    for id in cars {
        let car = state.dynamic(*id).unwrap();
        assert!(scene_x.contains(car.pose().x));
        assert!(scene_y.contains(car.pose().y));
        let angle = car.pose().angle.rem_euclid(TAU);
        let off_axis = [0.0, PI, TAU]
            .iter()
            .map(|a| (angle - a).abs())
            .fold(f64::INFINITY, f64::min);
        assert!(off_axis < 0.11, "car heading {angle} is off the road axis");
        assert!(!car.route().is_empty());
    }
}

#[test]
fn pedestrians_spawn_on_walkable_geometry() {
    let mut layout = common::crossroad_layout();
    let options = StateOptions {
        background_peds: 4,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(5);
    let state = WorldState::from_layout(&mut layout, &options, &mut rng).unwrap();

    let peds = state.objects_of_kind(ObjectKind::Pedestrian);
    assert_eq!(peds.len(), 4);
    for id in peds {
        let ped = state.dynamic(*id).unwrap();
        let pose = ped.pose();
        let on_walkable = state.iter_statics().any(|(_, obj)| {
            obj.kind().uses_ped_graph()
                && obj
                    .shape()
                    .contains_point(urban_sim::math::Point2d::new(pose.x, pose.y))
        });
        assert!(on_walkable, "pedestrian at ({}, {}) off the footpaths", pose.x, pose.y);
        assert_eq!(ped.route().len(), 1);
        assert!(!state.is_in_collision(*id));
    }
}

#[test]
fn saturated_lane_exhausts_placement() {
    // A lane whose spawn region collapses to a sliver that fits one car.
    let mut layout = Layout {
        name: "tight".into(),
        dimension_x: 200.0,
        dimension_y: 200.0,
        static_objects: vec![StaticRecord::new(
            ObjectKind::Lane,
            100.0,
            100.0,
            0.0,
            120.0,
            100.0,
        )],
        dynamic_objects: vec![],
        waypoints: None,
        ped_waypoints: None,
    };
    let options = StateOptions {
        background_cars: 2,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(1);
    let err = WorldState::from_layout(&mut layout, &options, &mut rng)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        StateError::PlacementExhausted {
            kind: ObjectKind::Car,
            ..
        }
    ));
}

#[test]
fn agents_need_matching_geometry() {
    // Cars need lanes and pedestrians need walkable geometry.
    let mut layout = common::crossroad_layout();
    layout.static_objects.retain(|r| r.kind != ObjectKind::Lane);
    let options = StateOptions {
        background_cars: 1,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(1);
    let err = WorldState::from_layout(&mut layout, &options, &mut rng)
        .err()
        .unwrap();
    assert!(matches!(err, StateError::LayoutInconsistency(_)));

    let mut layout = common::mini_layout();
    let options = StateOptions {
        background_peds: 1,
        ..Default::default()
    };
    let err = WorldState::from_layout(&mut layout, &options, &mut rng)
        .err()
        .unwrap();
    assert!(matches!(err, StateError::LayoutInconsistency(_)));
}

#[test]
fn seeded_placement_is_reproducible() {
    let options = StateOptions {
        controlled_cars: 1,
        background_cars: 2,
        background_peds: 2,
        ..Default::default()
    };
    let poses = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        let state =
            WorldState::from_layout(&mut common::crossroad_layout(), &options, &mut rng).unwrap();
        state
            .iter_dynamics()
            .map(|(_, obj)| (obj.pose().x, obj.pose().y, obj.pose().angle))
            .collect::<Vec<_>>()
    };
    assert_eq!(poses(31), poses(31));
    assert_ne!(poses(31), poses(32));
}
