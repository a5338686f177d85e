//! Waypoint graph construction.
//!
//! Derives the vehicle and pedestrian graphs from static geometry: seeds
//! from lane and crosswalk/sidewalk boundary waypoints, connects them
//! through intersections, and smooths long edges into bounded-curvature
//! chains. Also resolves precomputed graphs supplied by a layout or cache.

use crate::error::{Result, StateError};
use crate::layout::WaypointRecord;
use crate::math::{
    heading_vector, vector_heading, wrap_angle, CubicBezier2d, ParametricCurve2d, Point2d,
};
use crate::object::{StaticObject, StaticVariant};
use crate::state::WorldObject;
use crate::waypoint::{WaypointGraph, WaypointId};
use crate::{ObjectId, ObjectSet};
use cgmath::prelude::*;
use itertools::iproduct;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_4, PI};

/// Smoothing resolution for the vehicle graph: an edge of length `d` is
/// split into roughly `d^2 / resolution` hops.
pub(crate) const VEHICLE_SMOOTHING: f64 = 2000.0;
/// Smoothing resolution for the pedestrian graph.
pub(crate) const PED_SMOOTHING: f64 = 1500.0;
/// Lateral extent of vehicle graph edge shapes.
pub(crate) const VEHICLE_EDGE_BUFFER: f64 = 20.0;
/// Lateral extent of pedestrian graph edge shapes.
pub(crate) const PED_EDGE_BUFFER: f64 = 5.0;
/// Half-width of the rejection cone around the reversed heading: an
/// in-waypoint does not connect to an out-waypoint whose heading is within
/// this cone of a U-turn.
pub(crate) const U_TURN_CONE: f64 = FRAC_PI_4;

/// Connects every in-waypoint of each intersection to its compatible
/// out-waypoints, and records the in/out partition on the intersection.
///
/// A waypoint overlapping the intersection is an in-waypoint when its
/// forward-projected point lies inside the intersection shape. For the
/// vehicle graph (`enforce_lane_end`), every in-waypoint must be its
/// owning lane's end waypoint, which then transfers to the intersection;
/// anything else is a broken layout.
pub(crate) fn connect_graph(
    graph: &mut WaypointGraph,
    objects: &mut ObjectSet,
    intersections: &[ObjectId],
    enforce_lane_end: bool,
    cone: f64,
) -> Result<()> {
    for &junction in intersections {
        let shape = match &objects[junction] {
            WorldObject::Static(obj) => obj.shape().clone(),
            WorldObject::Dynamic(_) => continue,
        };

        let mut ins: Vec<WaypointId> = vec![];
        let mut outs: Vec<WaypointId> = vec![];
        for wp_id in graph.iter_ids() {
            if !shape.intersects(&graph.shape_at(wp_id)) {
                continue;
            }
            let wp = graph.get(wp_id);
            let probe = wp.pos() + heading_vector(wp.angle());
            if shape.contains_point(probe) {
                if enforce_lane_end {
                    ensure_lane_end(objects, graph, wp_id)?;
                }
                ins.push(wp_id);
            } else {
                outs.push(wp_id);
            }
        }

        if enforce_lane_end {
            for &wp_id in &ins {
                graph.set_owner(wp_id, junction);
            }
        }

        for (&in_id, &out_id) in iproduct!(&ins, &outs) {
            let dangle = wrap_angle(graph.get(in_id).angle() - graph.get(out_id).angle());
            if dangle < PI - cone || dangle > PI + cone {
                graph.push_successor(in_id, out_id);
            }
        }

        if let WorldObject::Static(obj) = &mut objects[junction] {
            match obj.variant_mut() {
                StaticVariant::Street { ins: i, outs: o }
                | StaticVariant::PedCrossing { ins: i, outs: o } => {
                    *i = ins;
                    *o = outs;
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Checks that a street in-waypoint is traceable to its owning lane's end
/// waypoint.
fn ensure_lane_end(objects: &ObjectSet, graph: &WaypointGraph, wp_id: WaypointId) -> Result<()> {
    let wp = graph.get(wp_id);
    let lane = wp
        .owner()
        .and_then(|id| objects.get(id))
        .and_then(WorldObject::as_static)
        .map(StaticObject::variant);
    match lane {
        Some(StaticVariant::Lane { end, .. }) if *end == wp_id => Ok(()),
        _ => Err(StateError::LayoutInconsistency(format!(
            "street in-waypoint at ({:.1}, {:.1}) is not a lane's end waypoint",
            wp.pos().x,
            wp.pos().y
        ))),
    }
}

/// Expands every long edge into a chain of interpolated waypoints so an
/// agent following the chain traces a bounded-curvature path.
///
/// Intermediate waypoints inherit the original waypoint's owner. Chains
/// are never re-smoothed; only the waypoints present when this is called
/// are expanded.
pub(crate) fn smooth_graph(graph: &mut WaypointGraph, resolution: f64) {
    let seeded = graph.len();
    for slot in 0..seeded {
        let id = WaypointId(slot);
        let succs: SmallVec<[WaypointId; 4]> =
            graph.get(id).successors().iter().copied().collect();
        if succs.is_empty() {
            continue;
        }
        let mut chained = SmallVec::new();
        for succ in succs {
            chained.push(smooth_edge(graph, id, succ, resolution));
        }
        graph.set_successors(id, chained);
    }
}

/// Replaces the edge `from -> to` with an interpolated chain and returns
/// its first waypoint (or `to` when the edge is short enough already).
fn smooth_edge(
    graph: &mut WaypointGraph,
    from: WaypointId,
    to: WaypointId,
    resolution: f64,
) -> WaypointId {
    let (p0, a0, owner) = {
        let wp = graph.get(from);
        (wp.pos(), wp.angle(), wp.owner())
    };
    let (p1, a1) = {
        let wp = graph.get(to);
        (wp.pos(), wp.angle())
    };

    let dist = (p1 - p0).magnitude();
    let hops = (dist * dist / resolution) as usize;
    if hops < 2 {
        return to;
    }

    let curve = CubicBezier2d::from_tangents(p0, heading_vector(a0), p1, heading_vector(a1));
    let mut head = None;
    let mut prev: Option<WaypointId> = None;
    for i in 1..hops {
        let t = i as f64 / hops as f64;
        let pos = curve.sample(t);
        let angle = vector_heading(curve.sample_dt(t));
        let mid = graph.add(pos, angle, owner);
        match prev {
            Some(p) => graph.push_successor(p, mid),
            None => head = Some(mid),
        }
        prev = Some(mid);
    }
    // hops >= 2, so at least one intermediate waypoint exists.
    graph.push_successor(prev.unwrap(), to);
    head.unwrap()
}

/// Builds a graph from precomputed waypoint records, resolving successor
/// indices into arena references.
pub(crate) fn resolve_graph(records: &[WaypointRecord], waypoint_width: f64) -> Result<WaypointGraph> {
    let mut graph = WaypointGraph::new(waypoint_width);
    let mut slots = HashMap::with_capacity(records.len());
    for record in records {
        let id = graph.add(Point2d::new(record.x, record.y), record.angle, None);
        graph.assign_index(id, record.index);
        if slots.insert(record.index, id).is_some() {
            return Err(StateError::LayoutInconsistency(format!(
                "duplicate waypoint index {}",
                record.index
            )));
        }
    }
    for record in records {
        let from = slots[&record.index];
        for &succ in &record.nxt {
            if succ == record.index {
                return Err(StateError::LayoutInconsistency(format!(
                    "waypoint {} lists itself as a successor",
                    record.index
                )));
            }
            let to = *slots
                .get(&succ)
                .ok_or(StateError::UnresolvedReference { index: succ })?;
            graph.push_successor(from, to);
        }
    }
    Ok(graph)
}

/// Serializes a finalized graph into index-based records.
pub(crate) fn export_graph(graph: &WaypointGraph) -> Vec<WaypointRecord> {
    graph
        .iter()
        .map(|wp| WaypointRecord {
            index: wp.index(),
            x: wp.pos().x,
            y: wp.pos().y,
            angle: wp.angle(),
            nxt: wp
                .successors()
                .iter()
                .map(|s| graph.get(*s).index())
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn smoothing_preserves_connectivity() {
        let mut graph = WaypointGraph::new(5.0);
        let a = graph.add(Point2d::new(0.0, 0.0), 0.0, None);
        let b = graph.add(Point2d::new(400.0, 0.0), 0.0, None);
        graph.push_successor(a, b);
        smooth_graph(&mut graph, 2000.0);

        // The single long edge becomes a chain that still ends at `b`.
        assert!(graph.len() > 2);
        let mut cur = graph.get(a).successors()[0];
        let mut hops = 1;
        while cur != b {
            let succs = graph.get(cur).successors();
            assert_eq!(succs.len(), 1);
            cur = succs[0];
            hops += 1;
        }
        assert_eq!(hops, 400 * 400 / 2000);

        // No waypoint is its own successor, and every hop is short.
        for id in graph.iter_ids() {
            let wp = graph.get(id);
            for &succ in wp.successors() {
                assert_ne!(succ, id);
                let step = (graph.get(succ).pos() - wp.pos()).magnitude();
                assert!(step < 11.0, "hop of {step} exceeds smoothing bound");
            }
        }
    }

    #[test]
    fn smoothing_keeps_short_edges() {
        let mut graph = WaypointGraph::new(5.0);
        let a = graph.add(Point2d::new(0.0, 0.0), 0.0, None);
        let b = graph.add(Point2d::new(30.0, 0.0), 0.0, None);
        graph.push_successor(a, b);
        smooth_graph(&mut graph, 2000.0);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get(a).successors(), &[b]);
    }

    #[test]
    fn smoothed_chain_follows_headings() {
        use std::f64::consts::FRAC_PI_2;
        let mut graph = WaypointGraph::new(5.0);
        // A right-angle turn: east-bound into north-bound (negative y).
        let a = graph.add(Point2d::new(0.0, 0.0), 0.0, None);
        let b = graph.add(Point2d::new(200.0, -200.0), FRAC_PI_2, None);
        graph.push_successor(a, b);
        smooth_graph(&mut graph, 2000.0);

        let first = graph.get(a).successors()[0];
        assert_ne!(first, b);
        // The first interpolated waypoint heads roughly east.
        assert_approx_eq!(graph.get(first).angle(), 0.0, 0.3);
    }

    #[test]
    fn resolve_rejects_dangling_index() {
        let records = vec![WaypointRecord {
            index: 0,
            x: 0.0,
            y: 0.0,
            angle: 0.0,
            nxt: vec![7],
        }];
        let err = resolve_graph(&records, 5.0).unwrap_err();
        assert!(matches!(err, StateError::UnresolvedReference { index: 7 }));
    }

    #[test]
    fn resolve_rejects_self_loop() {
        let records = vec![WaypointRecord {
            index: 3,
            x: 0.0,
            y: 0.0,
            angle: 0.0,
            nxt: vec![3],
        }];
        let err = resolve_graph(&records, 5.0).unwrap_err();
        assert!(matches!(err, StateError::LayoutInconsistency(_)));
    }
}
