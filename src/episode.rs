//! The episode state store: persists dynamic-object poses and control
//! flags so an episode can be reproduced or resumed on the same layout.

use crate::error::{Result, StateError};
use crate::layout::DynamicRecord;
use crate::object::{DynamicVariant, LightColor, ObjectKind};
use crate::state::WorldState;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A snapshot of every dynamic object in a world state.
///
/// Restorable only onto the layout named by `layout_name`; see
/// [WorldState::restore].
#[derive(Clone, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub layout_name: String,
    pub dynamic_objects: Vec<DynamicRecord>,
}

impl EpisodeRecord {
    /// Captures the dynamic objects of a world state.
    pub fn capture(state: &WorldState) -> Self {
        let dynamic_objects = state
            .iter_dynamics()
            .map(|(_, obj)| {
                let pose = obj.pose();
                let mut record = DynamicRecord {
                    kind: obj.kind(),
                    x: pose.x,
                    y: pose.y,
                    angle: None,
                    angle_deg: None,
                    init_color: None,
                    controlled: None,
                };
                match obj.variant() {
                    DynamicVariant::Car { controlled, .. } => {
                        record.angle = Some(pose.angle);
                        record.controlled = Some(*controlled);
                    }
                    DynamicVariant::Pedestrian => {
                        record.angle = Some(pose.angle);
                    }
                    DynamicVariant::TrafficLight { color }
                    | DynamicVariant::CrosswalkLight { color } => {
                        record.angle_deg = Some(pose.angle.to_degrees());
                        // An amber signal restores as red, never green.
                        record.init_color = Some(match color {
                            LightColor::Green => LightColor::Green,
                            _ => LightColor::Red,
                        });
                    }
                }
                record
            })
            .collect();
        Self {
            layout_name: state.layout_name().to_string(),
            dynamic_objects,
        }
    }

    /// Reads an episode record from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| StateError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| StateError::format(path, e))
    }

    /// Writes the episode record to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Saving state to {}", path.display());
        let file = File::create(path).map_err(|e| StateError::io(path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| StateError::format(path, e))
    }

    /// The number of stored cars, for quick sanity checks.
    pub fn car_count(&self) -> usize {
        self.dynamic_objects
            .iter()
            .filter(|record| record.kind == ObjectKind::Car)
            .count()
    }
}

impl WorldState {
    /// Captures and writes this state's dynamic objects to a JSON file.
    pub fn save_episode(&self, path: impl AsRef<Path>) -> Result<()> {
        EpisodeRecord::capture(self).save(path)
    }
}
