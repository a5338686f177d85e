use crate::math::Point2d;
use crate::shape::Shape;
use crate::ObjectId;
use smallvec::SmallVec;
use std::collections::HashMap;

/// The length of the thin rectangle used to test agent overlap with a waypoint.
const WAYPOINT_LENGTH: f64 = 2.0;

/// A slot in one [WaypointGraph]'s arena.
///
/// Distinct from the *global index* of a waypoint, which is assigned
/// sequentially across the vehicle and pedestrian graphs once construction
/// is complete, and which is what the on-disk formats store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct WaypointId(pub(crate) usize);

/// A node in a navigation graph.
#[derive(Clone, Debug)]
pub struct Waypoint {
    /// The global index, assigned by [WaypointGraph::finalize].
    index: usize,
    /// The position of the waypoint.
    pos: Point2d,
    /// The heading an agent should have when passing through.
    angle: f64,
    /// The successor waypoints, in insertion order.
    nxt: SmallVec<[WaypointId; 4]>,
    /// The object this waypoint belongs to. Lookup only; the owner's
    /// lifetime is managed by the world state.
    owner: Option<ObjectId>,
    /// Edge shapes towards each successor, built by [WaypointGraph::create_edges].
    edges: Vec<WaypointEdge>,
}

/// An oriented rectangle spanning a waypoint and one of its successors,
/// inflated by the graph's edge buffer. Consumed by planners and debug
/// overlays.
#[derive(Clone, Debug)]
pub struct WaypointEdge {
    pub out: WaypointId,
    pub shape: Shape,
}

impl Waypoint {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pos(&self) -> Point2d {
        self.pos
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// The successor waypoints. Empty for a terminal waypoint.
    pub fn successors(&self) -> &[WaypointId] {
        &self.nxt
    }

    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    pub fn edges(&self) -> &[WaypointEdge] {
        &self.edges
    }
}

/// An arena of waypoints forming one navigation graph.
///
/// The world state owns two of these: one for vehicles and one for
/// pedestrians. They are structurally identical but never connected to
/// each other.
#[derive(Debug)]
pub struct WaypointGraph {
    waypoints: Vec<Waypoint>,
    /// Maps global indices back to arena slots, built at finalization.
    index_map: HashMap<usize, WaypointId>,
    /// The lateral extent of each waypoint's overlap shape.
    waypoint_width: f64,
}

impl WaypointGraph {
    pub(crate) fn new(waypoint_width: f64) -> Self {
        Self {
            waypoints: Vec::new(),
            index_map: HashMap::new(),
            waypoint_width,
        }
    }

    /// Adds a waypoint and returns its arena slot.
    pub(crate) fn add(&mut self, pos: Point2d, angle: f64, owner: Option<ObjectId>) -> WaypointId {
        let id = WaypointId(self.waypoints.len());
        self.waypoints.push(Waypoint {
            index: usize::MAX,
            pos,
            angle,
            nxt: SmallVec::new(),
            owner,
            edges: Vec::new(),
        });
        id
    }

    /// Appends a successor to a waypoint. Self-loops are forbidden.
    pub(crate) fn push_successor(&mut self, from: WaypointId, to: WaypointId) {
        debug_assert_ne!(from, to, "waypoint cannot be its own successor");
        self.waypoints[from.0].nxt.push(to);
    }

    pub(crate) fn set_successors(&mut self, id: WaypointId, nxt: SmallVec<[WaypointId; 4]>) {
        debug_assert!(!nxt.contains(&id), "waypoint cannot be its own successor");
        self.waypoints[id.0].nxt = nxt;
    }

    pub(crate) fn set_owner(&mut self, id: WaypointId, owner: ObjectId) {
        self.waypoints[id.0].owner = Some(owner);
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, id: WaypointId) -> &Waypoint {
        &self.waypoints[id.0]
    }

    /// Looks up a waypoint slot by its global index.
    pub fn by_index(&self, index: usize) -> Option<WaypointId> {
        self.index_map.get(&index).copied()
    }

    /// Iterates over the arena slots in insertion order.
    pub fn iter_ids(&self) -> impl Iterator<Item = WaypointId> {
        (0..self.waypoints.len()).map(WaypointId)
    }

    /// Iterates over the waypoints in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    /// The thin oriented rectangle used to test agent overlap with a waypoint.
    pub fn shape_at(&self, id: WaypointId) -> Shape {
        let wp = self.get(id);
        Shape::new(
            wp.pos.x,
            wp.pos.y,
            wp.angle,
            WAYPOINT_LENGTH,
            self.waypoint_width,
        )
    }

    /// Assigns sequential global indices starting at `start` and returns the
    /// next unused index. Also builds the index lookup map.
    pub(crate) fn finalize(&mut self, start: usize) -> usize {
        self.index_map.clear();
        for (slot, wp) in self.waypoints.iter_mut().enumerate() {
            wp.index = start + slot;
            self.index_map.insert(wp.index, WaypointId(slot));
        }
        start + self.waypoints.len()
    }

    /// Records an already-assigned global index, for graphs resolved from
    /// precomputed records.
    pub(crate) fn assign_index(&mut self, id: WaypointId, index: usize) {
        self.waypoints[id.0].index = index;
        self.index_map.insert(index, id);
    }

    /// Builds the edge shapes between each waypoint and its successors.
    ///
    /// `buffer` is the lateral extent of each edge shape; the vehicle graph
    /// uses a wider buffer than the pedestrian graph.
    pub(crate) fn create_edges(&mut self, buffer: f64) {
        use crate::math::vector_heading;
        use cgmath::prelude::*;

        for slot in 0..self.waypoints.len() {
            let wp = &self.waypoints[slot];
            let edges = wp
                .nxt
                .iter()
                .map(|out| {
                    let delta = self.waypoints[out.0].pos - wp.pos;
                    let mid = wp.pos + 0.5 * delta;
                    WaypointEdge {
                        out: *out,
                        shape: Shape::new(
                            mid.x,
                            mid.y,
                            vector_heading(delta),
                            delta.magnitude(),
                            buffer,
                        ),
                    }
                })
                .collect();
            self.waypoints[slot].edges = edges;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn indices_are_sequential_across_graphs() {
        let mut vehicle = WaypointGraph::new(5.0);
        let mut ped = WaypointGraph::new(5.0);
        let a = vehicle.add(Point2d::new(0.0, 0.0), 0.0, None);
        let b = vehicle.add(Point2d::new(10.0, 0.0), 0.0, None);
        vehicle.push_successor(a, b);
        let c = ped.add(Point2d::new(0.0, 5.0), 0.0, None);

        let next = vehicle.finalize(0);
        let end = ped.finalize(next);
        assert_eq!(vehicle.get(a).index(), 0);
        assert_eq!(vehicle.get(b).index(), 1);
        assert_eq!(ped.get(c).index(), 2);
        assert_eq!(end, 3);
        assert_eq!(vehicle.by_index(1), Some(b));
        assert_eq!(ped.by_index(2), Some(c));
        assert_eq!(ped.by_index(0), None);
    }

    #[test]
    fn edges_span_successors() {
        let mut graph = WaypointGraph::new(5.0);
        let a = graph.add(Point2d::new(0.0, 0.0), 0.0, None);
        let b = graph.add(Point2d::new(20.0, 0.0), 0.0, None);
        graph.push_successor(a, b);
        graph.create_edges(4.0);

        let edges = graph.get(a).edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].out, b);
        assert!(edges[0].shape.contains_point(Point2d::new(10.0, 0.0)));
        assert!(!edges[0].shape.contains_point(Point2d::new(10.0, 3.0)));
    }
}
