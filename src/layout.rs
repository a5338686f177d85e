//! The structured layout description from which a world state is built,
//! and the records shared by the layout cache and episode store.
//!
//! Everything here is plain JSON so that layouts, caches and episode
//! files stay human-inspectable.

use crate::error::{Result, StateError};
use crate::object::{LightColor, ObjectKind};
use crate::shape::Shape;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A static scene description: global dimensions, static geometry, signal
/// placements, and optionally a precomputed waypoint graph.
#[derive(Clone, Serialize, Deserialize)]
pub struct Layout {
    /// The layout identifier. Episode records are only restorable onto a
    /// layout with the same name.
    pub name: String,
    pub dimension_x: f64,
    pub dimension_y: f64,
    pub static_objects: Vec<StaticRecord>,
    /// Signal placements (traffic and crosswalk lights).
    #[serde(default)]
    pub dynamic_objects: Vec<DynamicRecord>,
    /// The vehicle waypoint graph, if precomputed. When absent, graph
    /// construction derives it from the static geometry and writes it back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waypoints: Option<Vec<WaypointRecord>>,
    /// The pedestrian waypoint graph, if precomputed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ped_waypoints: Option<Vec<WaypointRecord>>,
}

impl Layout {
    /// Reads a layout from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| StateError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| StateError::format(path, e))
    }

    /// Whether the layout carries a precomputed waypoint graph.
    pub fn has_waypoints(&self) -> bool {
        self.waypoints.is_some() && self.ped_waypoints.is_some()
    }
}

/// One static object in a layout: a type tag, geometry parameters, and,
/// once a graph has been computed, the object's waypoint index lists.
#[derive(Clone, Serialize, Deserialize)]
pub struct StaticRecord {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub angle: f64,
    pub xdim: f64,
    pub ydim: f64,
    /// Lane only: the global indices of the start and end waypoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_wp: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_wp: Option<usize>,
    /// CrossWalk/Sidewalk only: paired start/end waypoint lists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_wps: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_wps: Option<Vec<usize>>,
    /// All waypoints owned by this object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waypoints: Option<Vec<usize>>,
}

impl StaticRecord {
    /// A bare geometry record with no waypoint references.
    pub fn new(kind: ObjectKind, x: f64, y: f64, angle: f64, xdim: f64, ydim: f64) -> Self {
        Self {
            kind,
            x,
            y,
            angle,
            xdim,
            ydim,
            start_wp: None,
            end_wp: None,
            start_wps: None,
            end_wps: None,
            waypoints: None,
        }
    }

    pub(crate) fn shape(&self) -> Shape {
        Shape::new(self.x, self.y, self.angle, self.xdim, self.ydim)
    }
}

/// One dynamic object in a layout or episode record.
///
/// Signals store their heading in degrees with an initial color; cars and
/// pedestrians store a radian heading, and cars a controlled flag.
#[derive(Clone, Serialize, Deserialize)]
pub struct DynamicRecord {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_color: Option<LightColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controlled: Option<bool>,
}

impl DynamicRecord {
    pub(crate) fn angle_rad(&self) -> f64 {
        self.angle
            .or_else(|| self.angle_deg.map(f64::to_radians))
            .unwrap_or(0.0)
    }
}

/// One waypoint of a precomputed graph: a global index, pose, and
/// successor indices.
#[derive(Clone, Serialize, Deserialize)]
pub struct WaypointRecord {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    #[serde(default)]
    pub nxt: Vec<usize>,
}
