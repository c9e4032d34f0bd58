//! Oriented-box trigger zones and point containment
//!
//! A trigger zone is a 3D volume whose occupancy by tracked persons is
//! reported upstream. The only concrete shape is the oriented box; the
//! [`TriggerZone`] variant keeps the door open for future shapes without
//! virtual dispatch on every containment test.

mod trigger_box;
mod zone;

pub use trigger_box::TriggerBox;
pub use zone::TriggerZone;

use argos_types::Vec3;

/// Rotate `v` by Euler angles (radians), applied about x, then y, then z.
pub(crate) fn rotate_euler(v: Vec3, rotation: Vec3) -> Vec3 {
    let (sx, cx) = rotation.x.sin_cos();
    let (sy, cy) = rotation.y.sin_cos();
    let (sz, cz) = rotation.z.sin_cos();

    // About x
    let v = Vec3::new(v.x, v.y * cx - v.z * sx, v.y * sx + v.z * cx);
    // About y
    let v = Vec3::new(v.x * cy + v.z * sy, v.y, -v.x * sy + v.z * cy);
    // About z
    Vec3::new(v.x * cz - v.y * sz, v.x * sz + v.y * cz, v.z)
}
