use crate::error::{Result, StateError};
use crate::graph;
use crate::layout::{DynamicRecord, Layout};
use crate::object::{DynamicObject, ObjectKind, StaticObject, StaticVariant};
use crate::shape::Shape;
use crate::util::Interval;
use crate::waypoint::{WaypointGraph, WaypointId};
use crate::{ObjectId, ObjectSet};
use log::{debug, info};
use rand::Rng;
use slotmap::SlotMap;
use std::collections::HashMap;

/// The retry bound for randomized placement. A saturated layout fails
/// with [StateError::PlacementExhausted] rather than spinning forever.
const MAX_PLACEMENT_ATTEMPTS: usize = 1000;

/// The margin inside a lane's bounding box within which cars are spawned.
const LANE_MARGIN: f64 = 50.0;

/// Uniform heading jitter applied to spawned cars, in radians.
const HEADING_JITTER: f64 = 0.1;

/// The minimum centre distance between two spawned cars.
const MIN_CAR_SPACING: f64 = 10.0;

/// Construction-time options for building a [WorldState].
#[derive(Clone, Copy, Debug)]
pub struct StateOptions {
    /// Number of cars accepting external control.
    pub controlled_cars: usize,
    /// Number of cars driven by the background planner.
    pub background_cars: usize,
    /// Number of background pedestrians.
    pub background_peds: usize,
    /// Lateral extent of waypoint overlap shapes. Increasing this makes
    /// waypoints span their lanes.
    pub waypoint_width: f64,
    /// Whether traffic light records in the layout are instantiated.
    pub use_traffic_lights: bool,
    /// Whether crosswalk light records in the layout are instantiated.
    pub use_ped_lights: bool,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            controlled_cars: 0,
            background_cars: 0,
            background_peds: 0,
            waypoint_width: 5.0,
            use_traffic_lights: true,
            use_ped_lights: true,
        }
    }
}

/// A static or dynamic object stored in the world state's object map.
pub enum WorldObject {
    Static(StaticObject),
    Dynamic(DynamicObject),
}

impl WorldObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Static(obj) => obj.kind(),
            Self::Dynamic(obj) => obj.kind(),
        }
    }

    pub fn shape(&self) -> &Shape {
        match self {
            Self::Static(obj) => obj.shape(),
            Self::Dynamic(obj) => obj.shape(),
        }
    }

    pub fn as_static(&self) -> Option<&StaticObject> {
        match self {
            Self::Static(obj) => Some(obj),
            Self::Dynamic(_) => None,
        }
    }

    pub fn as_dynamic(&self) -> Option<&DynamicObject> {
        match self {
            Self::Static(_) => None,
            Self::Dynamic(obj) => Some(obj),
        }
    }

    pub fn as_dynamic_mut(&mut self) -> Option<&mut DynamicObject> {
        match self {
            Self::Static(_) => None,
            Self::Dynamic(obj) => Some(obj),
        }
    }
}

/// The world state of one simulation episode.
///
/// Owns every static and dynamic object, the vehicle and pedestrian
/// waypoint graphs, and the type-partitioned index used by collision
/// queries. Single-threaded: an external stepper must serialize all
/// mutations.
pub struct WorldState {
    layout_name: String,
    dimensions: (f64, f64),
    /// The full object map. The static and dynamic id lists below
    /// partition its keys.
    objects: ObjectSet,
    /// Type-partitioned index into the object map, so collision queries
    /// scan only the buckets an object can collide with.
    type_map: HashMap<ObjectKind, Vec<ObjectId>>,
    statics: Vec<ObjectId>,
    dynamics: Vec<ObjectId>,
    /// The drivable waypoint graph.
    waypoints: WaypointGraph,
    /// The walkable waypoint graph; structurally identical but never
    /// connected to the vehicle graph.
    ped_waypoints: WaypointGraph,
    /// Disjoint partition of the cars into externally controlled and
    /// background-planned, in acceptance order.
    controlled_cars: Vec<ObjectId>,
    background_cars: Vec<ObjectId>,
}

impl WorldState {
    /// Builds a world state from a layout, generating waypoint graphs from
    /// the static geometry when the layout does not carry precomputed ones.
    /// In that case the derived graphs are written back into `layout` so the
    /// caller can cache it.
    ///
    /// Dynamic agents are placed by collision-free rejection sampling; the
    /// first `controlled_cars` accepted cars form the controlled partition.
    pub fn from_layout(
        layout: &mut Layout,
        options: &StateOptions,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        let mut state = Self::build_static(layout, options)?;
        info!("Generating dynamic objects");
        state.place_cars(
            options.controlled_cars + options.background_cars,
            options.controlled_cars,
            rng,
        )?;
        state.place_pedestrians(options.background_peds, rng)?;
        state.add_signals(&layout.dynamic_objects, options);
        info!("State creation complete");
        Ok(state)
    }

    /// Builds a world state from a layout and a previously saved episode.
    ///
    /// Fails with [StateError::IncompatibleRestore] before doing any work
    /// when the episode was recorded on a different layout. Routes are
    /// re-derived from each restored pose by the same waypoint-overlap walk
    /// used during random placement.
    pub fn restore(
        layout: &mut Layout,
        options: &StateOptions,
        episode: &crate::EpisodeRecord,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        if episode.layout_name != layout.name {
            return Err(StateError::IncompatibleRestore {
                expected: layout.name.clone(),
                found: episode.layout_name.clone(),
            });
        }
        let mut state = Self::build_static(layout, options)?;
        info!("Restoring dynamic objects");
        state.restore_agents(&episode.dynamic_objects, rng);
        state.add_signals(&episode.dynamic_objects, options);
        Ok(state)
    }

    /// Builds the static side of the state: objects, graphs, edges.
    fn build_static(layout: &mut Layout, options: &StateOptions) -> Result<Self> {
        info!("Loading layout: {}", layout.name);
        for record in &layout.static_objects {
            if !record.kind.is_static() {
                return Err(StateError::LayoutInconsistency(format!(
                    "{:?} listed among the static objects",
                    record.kind
                )));
            }
        }

        let mut objects: ObjectSet = SlotMap::with_key();
        let mut type_map: HashMap<ObjectKind, Vec<ObjectId>> = HashMap::new();
        let mut statics: Vec<ObjectId> = vec![];

        let (mut waypoints, mut ped_waypoints) = if layout.has_waypoints() {
            Self::resolve_statics(layout, options, &mut objects, &mut type_map, &mut statics)?
        } else {
            Self::generate_statics(layout, options, &mut objects, &mut type_map, &mut statics)?
        };

        waypoints.create_edges(graph::VEHICLE_EDGE_BUFFER);
        ped_waypoints.create_edges(graph::PED_EDGE_BUFFER);

        Ok(Self {
            layout_name: layout.name.clone(),
            dimensions: (layout.dimension_x, layout.dimension_y),
            objects,
            type_map,
            statics,
            dynamics: vec![],
            waypoints,
            ped_waypoints,
            controlled_cars: vec![],
            background_cars: vec![],
        })
    }

    /// The precomputed-graph path: resolve waypoint records and static
    /// object waypoint references into live arena slots.
    fn resolve_statics(
        layout: &Layout,
        options: &StateOptions,
        objects: &mut ObjectSet,
        type_map: &mut HashMap<ObjectKind, Vec<ObjectId>>,
        statics: &mut Vec<ObjectId>,
    ) -> Result<(WaypointGraph, WaypointGraph)> {
        info!("Precomputed trajectory map found");
        let records = layout.waypoints.as_deref().unwrap_or_default();
        let ped_records = layout.ped_waypoints.as_deref().unwrap_or_default();
        let mut waypoints = graph::resolve_graph(records, options.waypoint_width)?;
        let mut ped_waypoints = graph::resolve_graph(ped_records, options.waypoint_width)?;

        for record in &layout.static_objects {
            let obj = StaticObject::resolve(record, &waypoints, &ped_waypoints)?;
            let kind = obj.kind();
            let owned = obj.waypoints().to_vec();
            let id = objects.insert(WorldObject::Static(obj));
            let graph = if kind.uses_ped_graph() {
                &mut ped_waypoints
            } else {
                &mut waypoints
            };
            for wp in owned {
                graph.set_owner(wp, id);
            }
            type_map.entry(kind).or_default().push(id);
            statics.push(id);
        }
        Ok((waypoints, ped_waypoints))
    }

    /// The generation path: seed boundary waypoints, connect them through
    /// intersections, smooth, index, and write the result back into the
    /// layout so it can be cached.
    fn generate_statics(
        layout: &mut Layout,
        options: &StateOptions,
        objects: &mut ObjectSet,
        type_map: &mut HashMap<ObjectKind, Vec<ObjectId>>,
        statics: &mut Vec<ObjectId>,
    ) -> Result<(WaypointGraph, WaypointGraph)> {
        info!("Generating trajectory map");
        let mut waypoints = WaypointGraph::new(options.waypoint_width);
        let mut ped_waypoints = WaypointGraph::new(options.waypoint_width);
        let mut streets = vec![];
        let mut crossings = vec![];

        for record in &layout.static_objects {
            let kind = record.kind;
            let id = objects.insert_with_key(|id| {
                WorldObject::Static(StaticObject::seed(
                    record,
                    id,
                    &mut waypoints,
                    &mut ped_waypoints,
                ))
            });
            match kind {
                ObjectKind::Street => streets.push(id),
                ObjectKind::PedCrossing => crossings.push(id),
                _ => {}
            }
            type_map.entry(kind).or_default().push(id);
            statics.push(id);
        }

        graph::connect_graph(&mut waypoints, objects, &streets, true, graph::U_TURN_CONE)?;
        graph::smooth_graph(&mut waypoints, graph::VEHICLE_SMOOTHING);
        graph::connect_graph(
            &mut ped_waypoints,
            objects,
            &crossings,
            false,
            graph::U_TURN_CONE,
        )?;
        graph::smooth_graph(&mut ped_waypoints, graph::PED_SMOOTHING);

        let next = waypoints.finalize(0);
        ped_waypoints.finalize(next);
        debug!(
            "Trajectory map: {} vehicle waypoints, {} pedestrian waypoints",
            waypoints.len(),
            ped_waypoints.len()
        );

        // Register every waypoint with its owner's waypoint list.
        for graph in [&waypoints, &ped_waypoints] {
            for wp in graph.iter_ids() {
                if let Some(owner) = graph.get(wp).owner() {
                    if let Some(WorldObject::Static(obj)) = objects.get_mut(owner) {
                        obj.register_waypoint(wp);
                    }
                }
            }
        }

        // Write the derived graph back into the layout for caching.
        layout.waypoints = Some(graph::export_graph(&waypoints));
        layout.ped_waypoints = Some(graph::export_graph(&ped_waypoints));
        for (record, &id) in layout.static_objects.iter_mut().zip(statics.iter()) {
            let obj = match &objects[id] {
                WorldObject::Static(obj) => obj,
                WorldObject::Dynamic(_) => continue,
            };
            let graph = if obj.kind().uses_ped_graph() {
                &ped_waypoints
            } else {
                &waypoints
            };
            let index_of = |wp: &WaypointId| graph.get(*wp).index();
            match obj.variant() {
                StaticVariant::Lane { start, end } => {
                    record.start_wp = Some(index_of(start));
                    record.end_wp = Some(index_of(end));
                }
                StaticVariant::CrossWalk { starts, ends }
                | StaticVariant::Sidewalk { starts, ends } => {
                    record.start_wps = Some(starts.iter().map(index_of).collect());
                    record.end_wps = Some(ends.iter().map(index_of).collect());
                }
                _ => {}
            }
            record.waypoints = Some(obj.waypoints().iter().map(index_of).collect());
        }

        Ok((waypoints, ped_waypoints))
    }

    /// Places `count` cars by rejection sampling over the lanes. The first
    /// `controlled` accepted cars go into the controlled partition.
    fn place_cars(&mut self, count: usize, controlled: usize, rng: &mut impl Rng) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let lanes = self
            .type_map
            .get(&ObjectKind::Lane)
            .cloned()
            .unwrap_or_default();
        if lanes.is_empty() {
            return Err(StateError::LayoutInconsistency(
                "cannot place cars on a layout without lanes".into(),
            ));
        }

        for i in 0..count {
            let mut accepted = false;
            for _ in 0..MAX_PLACEMENT_ATTEMPTS {
                let lane = self.objects[lanes[rng.gen_range(0..lanes.len())]].shape();
                let (xb, yb) = lane.bounds();
                let x = sample_with_margin(rng, xb, LANE_MARGIN);
                let y = sample_with_margin(rng, yb, LANE_MARGIN);
                let angle = lane.angle() + rng.gen_range(-HEADING_JITTER..HEADING_JITTER);
                let mut car = DynamicObject::car(x, y, angle, i < controlled);

                let spacing = self
                    .type_map
                    .get(&ObjectKind::Car)
                    .into_iter()
                    .flatten()
                    .map(|id| self.objects[*id].shape().dist_to(car.shape()))
                    .fold(f64::INFINITY, f64::min);
                if spacing <= MIN_CAR_SPACING
                    || self.shape_in_collision(car.shape(), car.collideables(), None)
                {
                    continue;
                }

                let route = self.derive_route(car.shape(), false, true, rng);
                car.set_route(route);
                let is_controlled = car.is_controlled();
                let id = self.insert_dynamic(car);
                if is_controlled {
                    self.controlled_cars.push(id);
                } else {
                    self.background_cars.push(id);
                }
                accepted = true;
                break;
            }
            if !accepted {
                return Err(StateError::PlacementExhausted {
                    kind: ObjectKind::Car,
                    attempts: MAX_PLACEMENT_ATTEMPTS,
                });
            }
        }
        Ok(())
    }

    /// Places pedestrians anchored at random pedestrian-graph waypoints.
    fn place_pedestrians(&mut self, count: usize, rng: &mut impl Rng) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if self.ped_waypoints.is_empty() {
            return Err(StateError::LayoutInconsistency(
                "cannot place pedestrians on a layout without walkable geometry".into(),
            ));
        }

        for _ in 0..count {
            let mut accepted = false;
            for _ in 0..MAX_PLACEMENT_ATTEMPTS {
                let anchor = WaypointId(rng.gen_range(0..self.ped_waypoints.len()));
                let wp = self.ped_waypoints.get(anchor);
                let mut ped = DynamicObject::pedestrian(wp.pos().x, wp.pos().y, wp.angle());

                // Walk forward until the pedestrian no longer stands on its
                // target waypoint.
                let mut cur = anchor;
                while ped.shape().intersects(&self.ped_waypoints.shape_at(cur)) {
                    match pick_successor(&self.ped_waypoints, cur, rng) {
                        Some(next) => cur = next,
                        None => break,
                    }
                }
                ped.set_route(vec![cur]);

                if self.shape_in_collision(ped.shape(), ped.collideables(), None) {
                    continue;
                }
                self.insert_dynamic(ped);
                accepted = true;
                break;
            }
            if !accepted {
                return Err(StateError::PlacementExhausted {
                    kind: ObjectKind::Pedestrian,
                    attempts: MAX_PLACEMENT_ATTEMPTS,
                });
            }
        }
        Ok(())
    }

    /// Rebuilds cars and pedestrians from episode records.
    fn restore_agents(&mut self, records: &[DynamicRecord], rng: &mut impl Rng) {
        for record in records {
            match record.kind {
                ObjectKind::Car => {
                    let mut car = DynamicObject::car(
                        record.x,
                        record.y,
                        record.angle_rad(),
                        record.controlled.unwrap_or(false),
                    );
                    let route = self.derive_route(car.shape(), false, true, rng);
                    car.set_route(route);
                    let is_controlled = car.is_controlled();
                    let id = self.insert_dynamic(car);
                    if is_controlled {
                        self.controlled_cars.push(id);
                    } else {
                        self.background_cars.push(id);
                    }
                }
                ObjectKind::Pedestrian => {
                    let mut ped =
                        DynamicObject::pedestrian(record.x, record.y, record.angle_rad());
                    let route = self.derive_route(ped.shape(), true, false, rng);
                    ped.set_route(route);
                    self.insert_dynamic(ped);
                }
                _ => {}
            }
        }
    }

    /// Instantiates traffic and crosswalk lights from layout or episode
    /// records, honouring the corresponding options flags.
    fn add_signals(&mut self, records: &[DynamicRecord], options: &StateOptions) {
        use crate::object::LightColor;
        for record in records {
            let (x, y, angle) = (record.x, record.y, record.angle_rad());
            let color = record.init_color.unwrap_or(LightColor::Red);
            match record.kind {
                ObjectKind::TrafficLight if options.use_traffic_lights => {
                    self.insert_dynamic(DynamicObject::traffic_light(x, y, angle, color));
                }
                ObjectKind::CrosswalkLight if options.use_ped_lights => {
                    self.insert_dynamic(DynamicObject::crosswalk_light(x, y, angle, color));
                }
                _ => {}
            }
        }
    }

    /// Walks forward from the first waypoint the shape overlaps until the
    /// shape no longer overlaps, choosing a random successor at each hop.
    /// Cars take one extra hop so their first target lies ahead of them.
    /// Returns an empty route when the shape overlaps no waypoint.
    fn derive_route(
        &self,
        shape: &Shape,
        ped: bool,
        extra_hop: bool,
        rng: &mut impl Rng,
    ) -> Vec<WaypointId> {
        let graph = if ped { &self.ped_waypoints } else { &self.waypoints };
        for wp_id in graph.iter_ids() {
            if !shape.intersects(&graph.shape_at(wp_id)) {
                continue;
            }
            let mut cur = wp_id;
            while shape.intersects(&graph.shape_at(cur)) {
                match pick_successor(graph, cur, rng) {
                    Some(next) => cur = next,
                    None => return vec![cur],
                }
            }
            if extra_hop {
                if let Some(next) = pick_successor(graph, cur, rng) {
                    cur = next;
                }
            }
            return vec![cur];
        }
        vec![]
    }

    fn insert_dynamic(&mut self, obj: DynamicObject) -> ObjectId {
        let kind = obj.kind();
        let id = self.objects.insert(WorldObject::Dynamic(obj));
        self.type_map.entry(kind).or_default().push(id);
        self.dynamics.push(id);
        id
    }

    /// Returns true if the shape overlaps any object of one of the given
    /// kinds, scanning only those type buckets.
    fn shape_in_collision(
        &self,
        shape: &Shape,
        kinds: &[ObjectKind],
        exclude: Option<ObjectId>,
    ) -> bool {
        kinds.iter().any(|kind| {
            self.type_map
                .get(kind)
                .into_iter()
                .flatten()
                .any(|id| Some(*id) != exclude && self.objects[*id].shape().intersects(shape))
        })
    }

    /// Reports geometric overlap between two objects' shapes.
    pub fn collides(&self, a: ObjectId, b: ObjectId) -> bool {
        self.objects[a].shape().intersects(self.objects[b].shape())
    }

    /// Returns true if the object overlaps any object of a kind in its
    /// collideables set. Pure query; never mutates state.
    pub fn is_in_collision(&self, id: ObjectId) -> bool {
        let obj = match self.objects[id].as_dynamic() {
            Some(obj) => obj,
            None => return false,
        };
        self.shape_in_collision(obj.shape(), obj.collideables(), Some(id))
    }

    /// The minimum centre-to-centre distance from the object to any object
    /// of a kind in its collideables set, or infinity when there is none.
    pub fn min_distance_to_collision(&self, id: ObjectId) -> f64 {
        let obj = match self.objects[id].as_dynamic() {
            Some(obj) => obj,
            None => return f64::INFINITY,
        };
        obj.collideables()
            .iter()
            .flat_map(|kind| self.type_map.get(kind).into_iter().flatten())
            .filter(|other| **other != id)
            .map(|other| self.objects[*other].shape().dist_to(obj.shape()))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn layout_name(&self) -> &str {
        &self.layout_name
    }

    /// The (width, height) of the scene.
    pub fn dimensions(&self) -> (f64, f64) {
        self.dimensions
    }

    pub fn object(&self, id: ObjectId) -> Option<&WorldObject> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut WorldObject> {
        self.objects.get_mut(id)
    }

    /// Gets a dynamic object for stepper access to pose, velocity and route.
    pub fn dynamic(&self, id: ObjectId) -> Option<&DynamicObject> {
        self.objects.get(id).and_then(WorldObject::as_dynamic)
    }

    pub fn dynamic_mut(&mut self, id: ObjectId) -> Option<&mut DynamicObject> {
        self.objects.get_mut(id).and_then(WorldObject::as_dynamic_mut)
    }

    /// Iterates over all objects.
    pub fn iter_objects(&self) -> impl Iterator<Item = (ObjectId, &WorldObject)> {
        self.objects.iter()
    }

    /// Iterates over the static objects in layout order.
    pub fn iter_statics(&self) -> impl Iterator<Item = (ObjectId, &StaticObject)> {
        self.statics.iter().filter_map(|id| {
            self.objects[*id].as_static().map(|obj| (*id, obj))
        })
    }

    /// Iterates over the dynamic objects in creation order.
    pub fn iter_dynamics(&self) -> impl Iterator<Item = (ObjectId, &DynamicObject)> {
        self.dynamics.iter().filter_map(|id| {
            self.objects[*id].as_dynamic().map(|obj| (*id, obj))
        })
    }

    /// The ids of all objects of the given kind.
    pub fn objects_of_kind(&self, kind: ObjectKind) -> &[ObjectId] {
        self.type_map.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The drivable waypoint graph.
    pub fn waypoints(&self) -> &WaypointGraph {
        &self.waypoints
    }

    /// The walkable waypoint graph.
    pub fn ped_waypoints(&self) -> &WaypointGraph {
        &self.ped_waypoints
    }

    /// The externally controlled cars, in acceptance order.
    pub fn controlled_cars(&self) -> &[ObjectId] {
        &self.controlled_cars
    }

    /// The background-planned cars, in acceptance order.
    pub fn background_cars(&self) -> &[ObjectId] {
        &self.background_cars
    }

    /// Updates the visualization tier of every static object.
    pub fn set_vis_tier(&mut self, tier: u8) {
        for id in &self.statics {
            if let WorldObject::Static(obj) = &mut self.objects[*id] {
                obj.set_vis_tier(tier);
            }
        }
    }
}

/// Samples uniformly within an interval shrunk by `margin` on both sides,
/// falling back to the midpoint when the interval is too small.
fn sample_with_margin(rng: &mut impl Rng, interval: Interval<f64>, margin: f64) -> f64 {
    let (lo, hi) = (interval.min + margin, interval.max - margin);
    if hi <= lo {
        interval.midpoint()
    } else {
        rng.gen_range(lo..hi)
    }
}

/// Picks a uniformly random successor, or None at a terminal waypoint.
fn pick_successor(
    graph: &WaypointGraph,
    id: WaypointId,
    rng: &mut impl Rng,
) -> Option<WaypointId> {
    let succs = graph.get(id).successors();
    if succs.is_empty() {
        None
    } else {
        Some(succs[rng.gen_range(0..succs.len())])
    }
}
