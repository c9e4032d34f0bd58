//! Serializable person state as seen by the controller

use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Snapshot of one tracked person.
///
/// This is the view of a person that crosses the wire: the sensor-local id
/// (meaningful only within one sensor's messages), kinematics, the decimated
/// contour polygon and the sequence number of the update that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonSnapshot {
    /// Sensor-local id
    pub local_id: u32,
    /// Frames this person has been seen
    pub age: u32,
    /// Mean 3D position of the sampled silhouette points
    pub centroid: Vec3,
    /// Velocity (units per millisecond)
    pub velocity: Vec3,
    /// Acceleration (units per millisecond squared)
    pub acceleration: Vec3,
    /// Center of the 2D bounding box
    pub center: Vec3,
    /// Contour polygon, insertion order significant, implicitly closed
    pub contour: Vec<Vec3>,
    /// Sequence number of the last update applied to this snapshot
    pub last_update: u64,
}

impl PersonSnapshot {
    /// Create an empty snapshot for the given sensor-local id.
    pub fn new(local_id: u32, age: u32) -> Self {
        Self {
            local_id,
            age,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_new() {
        let p = PersonSnapshot::new(7, 3);
        assert_eq!(p.local_id, 7);
        assert_eq!(p.age, 3);
        assert_eq!(p.centroid, Vec3::ZERO);
        assert!(p.contour.is_empty());
        assert_eq!(p.last_update, 0);
    }
}
