//! The layout cache: a state built from a cached layout must carry the
//! same waypoint graphs as the state whose construction produced it.

mod common;

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet};
use urban_sim::{LayoutCache, StateOptions, WaypointGraph, WorldState};

type GraphSnapshot = BTreeMap<usize, ((f64, f64), f64, BTreeSet<usize>)>;

fn snapshot(graph: &WaypointGraph) -> GraphSnapshot {
    graph
        .iter()
        .map(|wp| {
            let succs = wp
                .successors()
                .iter()
                .map(|succ| graph.get(*succ).index())
                .collect();
            (wp.index(), ((wp.pos().x, wp.pos().y), wp.angle(), succs))
        })
        .collect()
}

#[test]
fn cached_layout_rebuilds_the_same_graphs() {
    let dir = tempfile::tempdir().unwrap();
    let cache = LayoutCache::new(dir.path());
    let options = StateOptions::default();
    let mut rng = StdRng::seed_from_u64(42);

    let mut layout = common::crossroad_layout();
    let generated = WorldState::from_layout(&mut layout, &options, &mut rng).unwrap();
    assert!(layout.has_waypoints());
    let stored_at = cache.store(&layout).unwrap();
    assert!(stored_at.starts_with(dir.path()));

    let mut cached = cache.lookup("crossroad").unwrap().unwrap();
    let resolved = WorldState::from_layout(&mut cached, &options, &mut rng).unwrap();

    assert_eq!(snapshot(generated.waypoints()), snapshot(resolved.waypoints()));
    assert_eq!(
        snapshot(generated.ped_waypoints()),
        snapshot(resolved.ped_waypoints())
    );
}

#[test]
fn cached_records_carry_waypoint_references() {
    let mut layout = common::mini_layout();
    let mut rng = StdRng::seed_from_u64(42);
    WorldState::from_layout(&mut layout, &StateOptions::default(), &mut rng).unwrap();

    for record in &layout.static_objects {
        assert!(record.waypoints.is_some());
        if record.kind == urban_sim::ObjectKind::Lane {
            assert!(record.start_wp.is_some());
            assert!(record.end_wp.is_some());
        }
    }
}

#[test]
fn lookup_misses_unknown_layouts() {
    let dir = tempfile::tempdir().unwrap();
    let cache = LayoutCache::new(dir.path());
    assert!(cache.lookup("never-stored").unwrap().is_none());
}
