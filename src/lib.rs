//! A 2D urban traffic world-state engine.
//!
//! The engine loads a [Layout] describing static road geometry, derives a
//! drivable and a walkable waypoint graph from it (or resolves a precomputed
//! one), populates the scene with dynamic agents, and answers collision
//! queries. Derived graphs can be cached with [LayoutCache] and per-episode
//! dynamic state persisted with [EpisodeRecord].
//!
//! Simulation stepping, path search and rendering are caller concerns; the
//! engine exposes poses, routes and geometry for them to consume.

pub use cache::LayoutCache;
pub use episode::EpisodeRecord;
pub use error::{Result, StateError};
pub use layout::{DynamicRecord, Layout, StaticRecord, WaypointRecord};
pub use object::{
    Color, DynamicObject, DynamicVariant, LightColor, ObjectKind, Pose, StaticObject,
    StaticVariant,
};
pub use shape::Shape;
pub use slotmap::{Key, KeyData};
pub use state::{StateOptions, WorldObject, WorldState};
pub use util::Interval;
pub use waypoint::{Waypoint, WaypointEdge, WaypointGraph, WaypointId};

use slotmap::{new_key_type, SlotMap};

mod cache;
mod episode;
mod error;
mod graph;
mod layout;
pub mod math;
mod object;
mod shape;
mod state;
mod util;
mod waypoint;

new_key_type! {
    /// Unique ID of a static or dynamic object within a [WorldState].
    pub struct ObjectId;
}

type ObjectSet = SlotMap<ObjectId, state::WorldObject>;
