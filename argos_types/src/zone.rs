//! Serializable trigger-zone geometry

use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Geometry parameters of an oriented-box trigger zone.
///
/// This is the operator-editable description that travels through the
/// settings channel; the derived corner points and face normals live in the
/// runtime zone type and are recomputed from this on every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneGeometry {
    /// Zone id, unique within a scene ("triggerzone0", "triggerzone1", ...)
    pub id: String,
    /// Center of the box (mm)
    pub center: Vec3,
    /// Euler rotation applied x, then y, then z (radians)
    pub rotation: Vec3,
    /// Extents: width, height, depth (mm)
    pub size: Vec3,
}

impl ZoneGeometry {
    /// Axis-aligned box at `center` with the given extents.
    pub fn axis_aligned(id: impl Into<String>, center: Vec3, size: Vec3) -> Self {
        Self {
            id: id.into(),
            center,
            rotation: Vec3::ZERO,
            size,
        }
    }

    /// Box volume (width * height * depth).
    pub fn volume(&self) -> f32 {
        self.size.x * self.size.y * self.size.z
    }

    /// Numeric suffix of the zone id, used for stable ordering.
    pub fn id_index(&self) -> Option<u32> {
        self.id.trim_start_matches(|c: char| !c.is_ascii_digit()).parse().ok()
    }
}
