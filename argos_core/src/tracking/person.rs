//! Tracked person state

use argos_types::{PersonSnapshot, Vec3};

/// A person currently tracked by one sensor node.
///
/// All spatial fields are in sensor-local units: centroid in pixel/depth
/// space (x, y, depth mm), center and contour likewise.
#[derive(Debug, Clone)]
pub struct Person {
    id: u32,
    /// Frames this person has been matched for
    age: u32,
    /// Wall-clock ms at first detection
    started_ms: u64,
    /// Wall-clock ms at last match
    last_ms: u64,
    pub centroid: Vec3,
    /// Cumulative planar (x, y) travel since first detection
    pub distance: f32,
    /// Centroid delta per millisecond
    pub velocity: Vec3,
    /// Velocity delta per millisecond
    pub acceleration: Vec3,
    /// Bounding-rectangle center
    pub center: Vec3,
    pub contour: Vec<Vec3>,
    color: [u8; 3],
}

impl Person {
    pub fn new(id: u32, now_ms: u64, centroid: Vec3, center: Vec3, contour: Vec<Vec3>) -> Self {
        Self {
            id,
            age: 0,
            started_ms: now_ms,
            last_ms: now_ms,
            centroid,
            distance: 0.0,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            center,
            contour,
            color: color_for_id(id),
        }
    }

    /// Fold a matched detection into this person, deriving velocity and
    /// acceleration from the elapsed time.
    pub fn advance(&mut self, now_ms: u64, centroid: Vec3, center: Vec3, contour: Vec<Vec3>) {
        let dt = now_ms.saturating_sub(self.last_ms) as f32;
        if dt > 0.0 {
            let velocity = (centroid - self.centroid) / dt;
            self.acceleration = (velocity - self.velocity) / dt;
            self.velocity = velocity;
        }
        let step = centroid - self.centroid;
        self.distance += Vec3::new(step.x, step.y, 0.0).length();
        self.centroid = centroid;
        self.center = center;
        self.contour = contour;
        self.age += 1;
        self.last_ms = now_ms;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn started_ms(&self) -> u64 {
        self.started_ms
    }

    pub fn last_ms(&self) -> u64 {
        self.last_ms
    }

    /// Stable display color derived from the id.
    pub fn color(&self) -> [u8; 3] {
        self.color
    }

    /// Serializable snapshot for the event stream.
    pub fn snapshot(&self) -> PersonSnapshot {
        PersonSnapshot {
            local_id: self.id,
            age: self.age,
            centroid: self.centroid,
            velocity: self.velocity,
            acceleration: self.acceleration,
            center: self.center,
            contour: self.contour.clone(),
            last_update: 0,
        }
    }
}

/// Deterministic bright-ish RGB from an id, so the same person renders the
/// same color on every node.
pub fn color_for_id(id: u32) -> [u8; 3] {
    let h = id.wrapping_mul(2654435761);
    [
        128 + (h >> 8) as u8 / 2,
        128 + (h >> 16) as u8 / 2,
        128 + (h >> 24) as u8 / 2,
    ]
}
