//! Synthetic layouts shared by the integration tests.

use std::f64::consts::PI;
use urban_sim::{Layout, ObjectKind, StaticRecord};

/// Two lanes joined by one street: the smallest layout with a non-trivial
/// vehicle graph.
pub fn mini_layout() -> Layout {
    Layout {
        name: "mini".into(),
        dimension_x: 1000.0,
        dimension_y: 400.0,
        static_objects: vec![
            StaticRecord::new(ObjectKind::Lane, 200.0, 100.0, 0.0, 400.0, 100.0),
            StaticRecord::new(ObjectKind::Lane, 800.0, 100.0, 0.0, 400.0, 100.0),
            StaticRecord::new(ObjectKind::Street, 500.0, 100.0, 0.0, 200.0, 200.0),
        ],
        dynamic_objects: vec![],
        waypoints: None,
        ped_waypoints: None,
    }
}

/// A two-way road through a street, plus a sidewalk pair joined by a
/// pedestrian crossing and a terrain block clear of the roads.
///
/// Eastbound traffic runs along y = 100, westbound along y = 200, and the
/// walkable geometry along y = 400.
pub fn crossroad_layout() -> Layout {
    Layout {
        name: "crossroad".into(),
        dimension_x: 1000.0,
        dimension_y: 700.0,
        static_objects: vec![
            // Vehicle geometry.
            StaticRecord::new(ObjectKind::Lane, 200.0, 100.0, 0.0, 400.0, 100.0),
            StaticRecord::new(ObjectKind::Lane, 800.0, 100.0, 0.0, 400.0, 100.0),
            StaticRecord::new(ObjectKind::Lane, 800.0, 200.0, PI, 400.0, 100.0),
            StaticRecord::new(ObjectKind::Lane, 200.0, 200.0, PI, 400.0, 100.0),
            StaticRecord::new(ObjectKind::Street, 500.0, 150.0, 0.0, 200.0, 300.0),
            // Walkable geometry.
            StaticRecord::new(ObjectKind::Sidewalk, 200.0, 400.0, 0.0, 400.0, 50.0),
            StaticRecord::new(ObjectKind::Sidewalk, 800.0, 400.0, 0.0, 400.0, 50.0),
            StaticRecord::new(ObjectKind::PedCrossing, 500.0, 400.0, 0.0, 200.0, 100.0),
            StaticRecord::new(ObjectKind::Terrain, 500.0, 600.0, 0.0, 1000.0, 200.0),
        ],
        dynamic_objects: vec![],
        waypoints: None,
        ped_waypoints: None,
    }
}
