use crate::error::{Result, StateError};
use crate::layout::StaticRecord;
use crate::shape::Shape;
use crate::waypoint::{WaypointGraph, WaypointId};
use crate::ObjectId;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// An RGB color.
pub type Color = [u8; 3];

/// Vehicle footprint, in world units.
pub(crate) const CAR_DIMS: (f64, f64) = (60.0, 30.0);
/// Pedestrian footprint.
pub(crate) const PED_DIMS: (f64, f64) = (20.0, 20.0);
const TRAFFIC_LIGHT_DIMS: (f64, f64) = (15.0, 45.0);
const CROSSWALK_LIGHT_DIMS: (f64, f64) = (10.0, 10.0);

const TERRAIN_COLOR: Color = [0, 100, 0];
const LANE_COLOR: Color = [50, 50, 58];
const STREET_COLOR: Color = [35, 35, 42];
const SIDEWALK_COLOR: Color = [150, 150, 150];
const CROSSWALK_COLOR: Color = [120, 150, 20];
const PED_CROSSING_COLOR: Color = [150, 110, 20];
const CAR_COLOR: Color = [30, 120, 200];
/// Controlled cars are tinted so a renderer can pick them out.
pub(crate) const CONTROLLED_CAR_COLOR: Color = [11, 4, 244];
const PED_COLOR: Color = [255, 150, 0];

/// The closed set of object types in a world state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ObjectKind {
    Terrain,
    Lane,
    Street,
    CrossWalk,
    Sidewalk,
    PedCrossing,
    Car,
    Pedestrian,
    TrafficLight,
    CrosswalkLight,
}

impl ObjectKind {
    /// Whether waypoints of this kind of object live in the pedestrian graph.
    pub fn uses_ped_graph(&self) -> bool {
        matches!(self, Self::CrossWalk | Self::Sidewalk | Self::PedCrossing)
    }

    pub fn is_static(&self) -> bool {
        matches!(
            self,
            Self::Terrain
                | Self::Lane
                | Self::Street
                | Self::CrossWalk
                | Self::Sidewalk
                | Self::PedCrossing
        )
    }
}

/// The color of a traffic or crosswalk light.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightColor {
    Red,
    Yellow,
    Green,
}

impl LightColor {
    fn as_rgb(&self) -> Color {
        match self {
            Self::Red => [255, 0, 0],
            Self::Yellow => [255, 255, 0],
            Self::Green => [0, 255, 0],
        }
    }
}

/// A position and heading in world space.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

/// An immutable piece of road geometry.
///
/// Created once at layout load; only the visualization tier may change
/// afterwards.
pub struct StaticObject {
    shape: Shape,
    color: Color,
    vis_tier: u8,
    /// All waypoints registered to this object, as arena slots in the
    /// graph selected by [ObjectKind::uses_ped_graph].
    waypoints: Vec<WaypointId>,
    variant: StaticVariant,
}

/// The role-specific data of a static object.
pub enum StaticVariant {
    Terrain,
    Lane {
        start: WaypointId,
        end: WaypointId,
    },
    /// An intersection for vehicles. The in/out partition is computed by
    /// graph construction, never configured.
    Street {
        ins: Vec<WaypointId>,
        outs: Vec<WaypointId>,
    },
    CrossWalk {
        starts: Vec<WaypointId>,
        ends: Vec<WaypointId>,
    },
    Sidewalk {
        starts: Vec<WaypointId>,
        ends: Vec<WaypointId>,
    },
    /// An intersection for pedestrians, connecting crosswalks and sidewalks.
    PedCrossing {
        ins: Vec<WaypointId>,
        outs: Vec<WaypointId>,
    },
}

impl StaticObject {
    /// Creates a static object from a layout record, seeding its boundary
    /// waypoints into the appropriate graph. The record's kind must be a
    /// static one; construction validates this before seeding.
    pub(crate) fn seed(
        record: &StaticRecord,
        id: ObjectId,
        vehicle_graph: &mut WaypointGraph,
        ped_graph: &mut WaypointGraph,
    ) -> Self {
        let shape = record.shape();
        let variant = match record.kind {
            ObjectKind::Terrain => StaticVariant::Terrain,
            ObjectKind::Street => StaticVariant::Street {
                ins: vec![],
                outs: vec![],
            },
            ObjectKind::PedCrossing => StaticVariant::PedCrossing {
                ins: vec![],
                outs: vec![],
            },
            ObjectKind::Lane => {
                let start = vehicle_graph.add(shape.rear_center(), shape.angle(), Some(id));
                let end = vehicle_graph.add(shape.front_center(), shape.angle(), Some(id));
                vehicle_graph.push_successor(start, end);
                StaticVariant::Lane { start, end }
            }
            ObjectKind::CrossWalk | ObjectKind::Sidewalk => {
                let (starts, ends) = Self::seed_paired(&shape, id, ped_graph);
                if record.kind == ObjectKind::CrossWalk {
                    StaticVariant::CrossWalk { starts, ends }
                } else {
                    StaticVariant::Sidewalk { starts, ends }
                }
            }
            _ => unreachable!("static kinds are validated before seeding"),
        };
        Self {
            shape,
            color: Self::color_for(record.kind),
            vis_tier: 0,
            waypoints: vec![],
            variant,
        }
    }

    /// Seeds the two walkable directions of a crosswalk or sidewalk: a
    /// start/end pair along the shape's heading, and another pair in the
    /// reverse direction.
    fn seed_paired(
        shape: &Shape,
        id: ObjectId,
        graph: &mut WaypointGraph,
    ) -> (Vec<WaypointId>, Vec<WaypointId>) {
        let (rear, front) = (shape.rear_center(), shape.front_center());
        let angle = shape.angle();
        let starts = vec![
            graph.add(rear, angle, Some(id)),
            graph.add(front, angle + PI, Some(id)),
        ];
        let ends = vec![
            graph.add(front, angle, Some(id)),
            graph.add(rear, angle + PI, Some(id)),
        ];
        graph.push_successor(starts[0], ends[0]);
        graph.push_successor(starts[1], ends[1]);
        (starts, ends)
    }

    /// Creates a static object from a layout record whose waypoint
    /// references are global indices into an already-resolved graph.
    pub(crate) fn resolve(
        record: &StaticRecord,
        vehicle_graph: &WaypointGraph,
        ped_graph: &WaypointGraph,
    ) -> Result<Self> {
        let graph = if record.kind.uses_ped_graph() {
            ped_graph
        } else {
            vehicle_graph
        };
        let one = |index: usize| {
            graph
                .by_index(index)
                .ok_or(StateError::UnresolvedReference { index })
        };
        let many = |indices: &Option<Vec<usize>>, field: &str| -> Result<Vec<WaypointId>> {
            indices
                .as_ref()
                .ok_or_else(|| {
                    StateError::LayoutInconsistency(format!(
                        "{:?} record is missing its `{field}` list",
                        record.kind
                    ))
                })?
                .iter()
                .map(|index| one(*index))
                .collect()
        };

        let variant = match record.kind {
            ObjectKind::Terrain => StaticVariant::Terrain,
            ObjectKind::Street => StaticVariant::Street {
                ins: vec![],
                outs: vec![],
            },
            ObjectKind::PedCrossing => StaticVariant::PedCrossing {
                ins: vec![],
                outs: vec![],
            },
            ObjectKind::Lane => StaticVariant::Lane {
                start: one(record.start_wp.ok_or_else(|| {
                    StateError::LayoutInconsistency("Lane record is missing `start_wp`".into())
                })?)?,
                end: one(record.end_wp.ok_or_else(|| {
                    StateError::LayoutInconsistency("Lane record is missing `end_wp`".into())
                })?)?,
            },
            ObjectKind::CrossWalk => StaticVariant::CrossWalk {
                starts: many(&record.start_wps, "start_wps")?,
                ends: many(&record.end_wps, "end_wps")?,
            },
            ObjectKind::Sidewalk => StaticVariant::Sidewalk {
                starts: many(&record.start_wps, "start_wps")?,
                ends: many(&record.end_wps, "end_wps")?,
            },
            kind => {
                return Err(StateError::LayoutInconsistency(format!(
                    "{kind:?} is not a static object type"
                )))
            }
        };
        let waypoints = record
            .waypoints
            .as_ref()
            .map(|indices| indices.iter().map(|index| one(*index)).collect())
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            shape: record.shape(),
            color: Self::color_for(record.kind),
            vis_tier: 0,
            waypoints,
            variant,
        })
    }

    pub fn kind(&self) -> ObjectKind {
        match &self.variant {
            StaticVariant::Terrain => ObjectKind::Terrain,
            StaticVariant::Lane { .. } => ObjectKind::Lane,
            StaticVariant::Street { .. } => ObjectKind::Street,
            StaticVariant::CrossWalk { .. } => ObjectKind::CrossWalk,
            StaticVariant::Sidewalk { .. } => ObjectKind::Sidewalk,
            StaticVariant::PedCrossing { .. } => ObjectKind::PedCrossing,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn vis_tier(&self) -> u8 {
        self.vis_tier
    }

    pub(crate) fn set_vis_tier(&mut self, tier: u8) {
        self.vis_tier = tier;
    }

    pub fn variant(&self) -> &StaticVariant {
        &self.variant
    }

    pub(crate) fn variant_mut(&mut self) -> &mut StaticVariant {
        &mut self.variant
    }

    /// All waypoints registered to this object.
    pub fn waypoints(&self) -> &[WaypointId] {
        &self.waypoints
    }

    pub(crate) fn register_waypoint(&mut self, id: WaypointId) {
        self.waypoints.push(id);
    }

    fn color_for(kind: ObjectKind) -> Color {
        match kind {
            ObjectKind::Terrain => TERRAIN_COLOR,
            ObjectKind::Lane => LANE_COLOR,
            ObjectKind::Street => STREET_COLOR,
            ObjectKind::Sidewalk => SIDEWALK_COLOR,
            ObjectKind::CrossWalk => CROSSWALK_COLOR,
            _ => PED_CROSSING_COLOR,
        }
    }
}

/// A mutable agent: a vehicle, pedestrian, or signal.
///
/// Created during state construction and mutated every simulation step by
/// an external stepper through the pose, velocity and route accessors.
pub struct DynamicObject {
    shape: Shape,
    vel: f64,
    /// The assigned route, as slots in the graph matching the agent kind.
    /// Consumed from the front as the agent advances.
    route: Vec<WaypointId>,
    variant: DynamicVariant,
}

/// The role-specific data of a dynamic object.
pub enum DynamicVariant {
    Car {
        /// Whether the car accepts external control. Background cars are
        /// driven by the background planner.
        controlled: bool,
        /// Where a planner should drive this car, if anywhere.
        destination: Option<Pose>,
    },
    Pedestrian,
    TrafficLight { color: LightColor },
    CrosswalkLight { color: LightColor },
}

impl DynamicObject {
    pub(crate) fn car(x: f64, y: f64, angle: f64, controlled: bool) -> Self {
        Self {
            shape: Shape::new(x, y, angle, CAR_DIMS.0, CAR_DIMS.1),
            vel: 0.0,
            route: vec![],
            variant: DynamicVariant::Car {
                controlled,
                destination: None,
            },
        }
    }

    pub(crate) fn pedestrian(x: f64, y: f64, angle: f64) -> Self {
        Self {
            shape: Shape::new(x, y, angle, PED_DIMS.0, PED_DIMS.1),
            vel: 0.0,
            route: vec![],
            variant: DynamicVariant::Pedestrian,
        }
    }

    pub(crate) fn traffic_light(x: f64, y: f64, angle: f64, color: LightColor) -> Self {
        Self {
            shape: Shape::new(x, y, angle, TRAFFIC_LIGHT_DIMS.0, TRAFFIC_LIGHT_DIMS.1),
            vel: 0.0,
            route: vec![],
            variant: DynamicVariant::TrafficLight { color },
        }
    }

    pub(crate) fn crosswalk_light(x: f64, y: f64, angle: f64, color: LightColor) -> Self {
        Self {
            shape: Shape::new(x, y, angle, CROSSWALK_LIGHT_DIMS.0, CROSSWALK_LIGHT_DIMS.1),
            vel: 0.0,
            route: vec![],
            variant: DynamicVariant::CrosswalkLight { color },
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match &self.variant {
            DynamicVariant::Car { .. } => ObjectKind::Car,
            DynamicVariant::Pedestrian => ObjectKind::Pedestrian,
            DynamicVariant::TrafficLight { .. } => ObjectKind::TrafficLight,
            DynamicVariant::CrosswalkLight { .. } => ObjectKind::CrosswalkLight,
        }
    }

    /// The object types this object's collision queries must check.
    pub fn collideables(&self) -> &'static [ObjectKind] {
        match &self.variant {
            DynamicVariant::Car { .. } => &[
                ObjectKind::Terrain,
                ObjectKind::Sidewalk,
                ObjectKind::Car,
                ObjectKind::Pedestrian,
            ],
            DynamicVariant::Pedestrian => {
                &[ObjectKind::Terrain, ObjectKind::Car, ObjectKind::Pedestrian]
            }
            _ => &[],
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn pose(&self) -> Pose {
        Pose {
            x: self.shape.x(),
            y: self.shape.y(),
            angle: self.shape.angle(),
        }
    }

    pub fn set_pose(&mut self, x: f64, y: f64, angle: f64) {
        self.shape.set_pose(x, y, angle);
    }

    pub fn vel(&self) -> f64 {
        self.vel
    }

    pub fn set_vel(&mut self, vel: f64) {
        self.vel = vel;
    }

    /// The assigned route. Empty when the agent has nowhere to go.
    pub fn route(&self) -> &[WaypointId] {
        &self.route
    }

    pub fn set_route(&mut self, route: Vec<WaypointId>) {
        self.route = route;
    }

    pub fn variant(&self) -> &DynamicVariant {
        &self.variant
    }

    /// Whether this is a controlled car.
    pub fn is_controlled(&self) -> bool {
        matches!(self.variant, DynamicVariant::Car { controlled: true, .. })
    }

    /// The planner destination, for cars.
    pub fn destination(&self) -> Option<Pose> {
        match &self.variant {
            DynamicVariant::Car { destination, .. } => *destination,
            _ => None,
        }
    }

    /// Sets the planner destination. Has no effect on non-cars.
    pub fn set_destination(&mut self, dest: Option<Pose>) {
        if let DynamicVariant::Car { destination, .. } = &mut self.variant {
            *destination = dest;
        }
    }

    pub fn color(&self) -> Color {
        match &self.variant {
            DynamicVariant::Car { controlled: true, .. } => CONTROLLED_CAR_COLOR,
            DynamicVariant::Car { .. } => CAR_COLOR,
            DynamicVariant::Pedestrian => PED_COLOR,
            DynamicVariant::TrafficLight { color } | DynamicVariant::CrosswalkLight { color } => {
                color.as_rgb()
            }
        }
    }

    /// The current light color, for signals.
    pub fn light_color(&self) -> Option<LightColor> {
        match &self.variant {
            DynamicVariant::TrafficLight { color } | DynamicVariant::CrosswalkLight { color } => {
                Some(*color)
            }
            _ => None,
        }
    }

    /// Advances a signal to a new color. Has no effect on cars and pedestrians.
    pub fn set_light_color(&mut self, new: LightColor) {
        match &mut self.variant {
            DynamicVariant::TrafficLight { color } | DynamicVariant::CrosswalkLight { color } => {
                *color = new
            }
            _ => {}
        }
    }
}
