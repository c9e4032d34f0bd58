//! Pinhole camera intrinsics for depth unprojection

use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Pinhole intrinsics of a depth camera.
///
/// Defaults match the Kinect v2 depth sensor (512x424).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intrinsics {
    /// Principal point x (pixels)
    pub cx: f32,
    /// Principal point y (pixels)
    pub cy: f32,
    /// Focal length x (pixels)
    pub fx: f32,
    /// Focal length y (pixels)
    pub fy: f32,
}

impl Default for Intrinsics {
    fn default() -> Self {
        Self {
            cx: 254.878,
            cy: 205.395,
            fx: 365.456,
            fy: 365.456,
        }
    }
}

impl Intrinsics {
    /// Unproject a depth pixel to a 3D point in camera space.
    ///
    /// `x`/`y` are grid coordinates, `depth` is the real-world depth in
    /// millimeters; the result is in millimeters.
    pub fn unproject(&self, x: u32, y: u32, depth: f32) -> Vec3 {
        Vec3 {
            x: (x as f32 - self.cx) * depth / self.fx,
            y: (y as f32 - self.cy) * depth / self.fy,
            z: depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unproject_principal_point() {
        let intr = Intrinsics::default();
        // A pixel on the principal point unprojects straight down the z axis.
        let p = intr.unproject(intr.cx.round() as u32, intr.cy.round() as u32, 2000.0);
        assert!(p.x.abs() < 2000.0 / intr.fx);
        assert!(p.y.abs() < 2000.0 / intr.fy);
        assert_eq!(p.z, 2000.0);
    }

    #[test]
    fn test_unproject_scales_with_depth() {
        let intr = Intrinsics::default();
        let near = intr.unproject(400, 300, 1000.0);
        let far = intr.unproject(400, 300, 2000.0);
        assert!((far.x - near.x * 2.0).abs() < 1e-3);
        assert!((far.y - near.y * 2.0).abs() < 1e-3);
    }
}
