//! Tagged trigger-zone variant

use std::collections::HashMap;

use argos_types::{Vec3, ZoneGeometry};

use crate::error::ArgosResult;
use crate::geometry::TriggerBox;

/// A trigger zone of any supported shape.
///
/// Boxes are the only variant today; spheres or cylinders would slot in as
/// further arms without touching the scan or scene code, which only go
/// through this type.
#[derive(Debug, Clone)]
pub enum TriggerZone {
    Box(TriggerBox),
}

impl TriggerZone {
    /// Build a zone from serialized geometry.
    pub fn from_geometry(geometry: ZoneGeometry) -> ArgosResult<Self> {
        Ok(TriggerZone::Box(TriggerBox::new(geometry)?))
    }

    pub fn id(&self) -> &str {
        match self {
            TriggerZone::Box(b) => b.id(),
        }
    }

    pub fn geometry(&self) -> &ZoneGeometry {
        match self {
            TriggerZone::Box(b) => b.geometry(),
        }
    }

    /// Whether a 3D point (camera space, mm) falls inside the zone.
    pub fn contains_point(&self, point: Vec3) -> bool {
        match self {
            TriggerZone::Box(b) => b.contains_point(point),
        }
    }

    pub fn clear_points(&mut self) {
        match self {
            TriggerZone::Box(b) => b.clear_points(),
        }
    }

    pub fn add_points(&mut self, points: u32) {
        match self {
            TriggerZone::Box(b) => b.add_points(points),
        }
    }

    pub fn add_person_points(&mut self, person_id: u32, points: u32) {
        match self {
            TriggerZone::Box(b) => b.add_person_points(person_id, points),
        }
    }

    pub fn set_tally(&mut self, points_inside: u32, points_per_person: HashMap<u32, u32>) {
        match self {
            TriggerZone::Box(b) => b.set_tally(points_inside, points_per_person),
        }
    }

    pub fn points_inside(&self) -> u32 {
        match self {
            TriggerZone::Box(b) => b.points_inside(),
        }
    }

    pub fn points_per_person(&self) -> &HashMap<u32, u32> {
        match self {
            TriggerZone::Box(b) => b.points_per_person(),
        }
    }

    pub fn last_update(&self) -> u64 {
        match self {
            TriggerZone::Box(b) => b.last_update(),
        }
    }

    pub fn set_last_update(&mut self, sequence: u64) {
        match self {
            TriggerZone::Box(b) => b.set_last_update(sequence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_forwards_containment() {
        let zone = TriggerZone::from_geometry(ZoneGeometry::axis_aligned(
            "triggerzone0",
            Vec3::new(0.0, 0.0, 1500.0),
            Vec3::new(1000.0, 1000.0, 1000.0),
        ))
        .unwrap();
        assert_eq!(zone.id(), "triggerzone0");
        assert!(zone.contains_point(Vec3::new(0.0, 0.0, 1500.0)));
        assert!(!zone.contains_point(Vec3::new(0.0, 0.0, 100.0)));
    }
}
