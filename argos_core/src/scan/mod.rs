//! Parallel occupancy scan of silhouette masks
//!
//! For one silhouette mask and the active set of trigger zones, compute the
//! silhouette's centroid and how many sample points of it fall into each
//! zone. The bounding rectangle is split into horizontal bands, one per
//! worker; every band accumulates into band-local tallies only and a single
//! merge step on the calling thread folds them together. Worker threads
//! never touch shared zone state — zone counters are updated by the frame
//! loop after the merge.
//!
//! Sampling happens on a fixed lattice anchored at the rectangle origin, so
//! splitting the same rectangle into 1 or N bands visits exactly the same
//! pixels and produces identical tallies.

use std::collections::HashMap;

use argos_types::{Intrinsics, Vec3};
use log::debug;

use crate::geometry::TriggerZone;

/// Every k-th pixel is sampled in both axes.
pub const SAMPLE_STRIDE: u32 = 2;

/// Tally contribution of one sampled foreground pixel inside a zone,
/// compensating for the sampling stride (stride 2 in x and y covers 4
/// pixels per sample).
pub const POINTS_PER_SAMPLE: u32 = 4;

/// Binary silhouette mask over the fixed sensor grid; nonzero = foreground.
#[derive(Debug, Clone, Copy)]
pub struct SilhouetteMask<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
}

impl<'a> SilhouetteMask<'a> {
    #[inline]
    fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.pixels[(y * self.width + x) as usize] != 0
    }
}

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl ScanRect {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// Center of the rectangle (z left at 0).
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            self.x0 as f32 + (self.x1 - self.x0) as f32 / 2.0,
            self.y0 as f32 + (self.y1 - self.y0) as f32 / 2.0,
            0.0,
        )
    }
}

/// Result of scanning one silhouette.
#[derive(Debug, Clone)]
pub struct ScanOutput {
    /// Mean of all sampled foreground pixels as (x, y, depth)
    pub centroid: Vec3,
    /// Number of sampled foreground pixels
    pub samples: u32,
    /// Occupied sample points per zone id
    pub zone_points: HashMap<String, u32>,
}

/// Band-local accumulator. Lives entirely on one worker.
#[derive(Debug, Default)]
struct BandTally {
    sum: Vec3,
    samples: u32,
    zone_points: HashMap<String, u32>,
}

/// Scan one silhouette with a worker per available core.
pub fn scan_silhouette(
    mask: &SilhouetteMask<'_>,
    depth: &[u16],
    rect: ScanRect,
    zones: &[TriggerZone],
    intrinsics: &Intrinsics,
) -> Option<ScanOutput> {
    scan_silhouette_banded(mask, depth, rect, zones, intrinsics, num_cpus::get().max(1))
}

/// Scan one silhouette with an explicit band count.
///
/// Returns `None` for a silhouette with no sampled foreground pixel — a
/// no-op for the frame, not an error.
pub fn scan_silhouette_banded(
    mask: &SilhouetteMask<'_>,
    depth: &[u16],
    rect: ScanRect,
    zones: &[TriggerZone],
    intrinsics: &Intrinsics,
    bands: usize,
) -> Option<ScanOutput> {
    let bands = bands.clamp(1, rect.height().max(1) as usize);

    let tallies: Vec<BandTally> = if bands == 1 {
        vec![scan_band(mask, depth, rect, rect, zones, intrinsics)]
    } else {
        let step = rect.height() / bands as u32;
        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(bands);
            for band in 0..bands as u32 {
                let y0 = rect.y0 + band * step;
                // The last band picks up the remainder rows.
                let y1 = if band == bands as u32 - 1 {
                    rect.y1
                } else {
                    y0 + step
                };
                let band_rect = ScanRect::new(rect.x0, y0, rect.x1, y1);
                handles.push(
                    scope.spawn(move || scan_band(mask, depth, rect, band_rect, zones, intrinsics)),
                );
            }
            handles.into_iter().map(|h| h.join().expect("scan band panicked")).collect()
        })
    };

    // Merge: the only place tallies are combined, on the calling thread.
    let mut sum = Vec3::ZERO;
    let mut samples = 0u32;
    let mut zone_points: HashMap<String, u32> = HashMap::new();
    for tally in tallies {
        sum += tally.sum;
        samples += tally.samples;
        for (zone_id, points) in tally.zone_points {
            *zone_points.entry(zone_id).or_insert(0) += points;
        }
    }

    if samples == 0 {
        debug!("silhouette at {rect:?} produced no samples, skipping");
        return None;
    }

    Some(ScanOutput {
        centroid: sum / samples as f32,
        samples,
        zone_points,
    })
}

/// Scan the rows of one band. Sample rows/columns are anchored at the full
/// rectangle's origin so band boundaries do not shift the lattice.
fn scan_band(
    mask: &SilhouetteMask<'_>,
    depth: &[u16],
    full: ScanRect,
    band: ScanRect,
    zones: &[TriggerZone],
    intrinsics: &Intrinsics,
) -> BandTally {
    let mut tally = BandTally::default();

    let mut y = next_on_lattice(band.y0, full.y0);
    while y < band.y1.min(mask.height) {
        let mut x = full.x0;
        while x < band.x1.min(mask.width) {
            if mask.is_foreground(x, y) {
                let offset = (y * mask.width + x) as usize;
                let depth_mm = depth[offset] as f32;

                tally.sum += Vec3::new(x as f32, y as f32, depth_mm);
                tally.samples += 1;

                if !zones.is_empty() {
                    let point = intrinsics.unproject(x, y, depth_mm);
                    for zone in zones {
                        if zone.contains_point(point) {
                            *tally.zone_points.entry(zone.id().to_string()).or_insert(0) +=
                                POINTS_PER_SAMPLE;
                        }
                    }
                }
            }
            x += SAMPLE_STRIDE;
        }
        y += SAMPLE_STRIDE;
    }

    tally
}

/// First row >= `from` on the sampling lattice anchored at `origin`.
fn next_on_lattice(from: u32, origin: u32) -> u32 {
    let rem = (from - origin) % SAMPLE_STRIDE;
    if rem == 0 {
        from
    } else {
        from + (SAMPLE_STRIDE - rem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_types::ZoneGeometry;

    fn full_mask(width: u32, height: u32) -> Vec<u8> {
        vec![255u8; (width * height) as usize]
    }

    #[test]
    fn test_empty_mask_is_noop() {
        let pixels = vec![0u8; 64 * 64];
        let mask = SilhouetteMask {
            width: 64,
            height: 64,
            pixels: &pixels,
        };
        let depth = vec![1000u16; 64 * 64];
        let out = scan_silhouette_banded(
            &mask,
            &depth,
            ScanRect::new(0, 0, 64, 64),
            &[],
            &Intrinsics::default(),
            4,
        );
        assert!(out.is_none());
    }

    #[test]
    fn test_centroid_of_uniform_block() {
        let pixels = full_mask(8, 8);
        let mask = SilhouetteMask {
            width: 8,
            height: 8,
            pixels: &pixels,
        };
        let depth = vec![1500u16; 64];
        let out = scan_silhouette_banded(
            &mask,
            &depth,
            ScanRect::new(0, 0, 8, 8),
            &[],
            &Intrinsics::default(),
            1,
        )
        .unwrap();
        // Samples at 0,2,4,6 in both axes: mean coordinate 3.
        assert_eq!(out.samples, 16);
        assert_eq!(out.centroid, Vec3::new(3.0, 3.0, 1500.0));
    }

    #[test]
    fn test_band_count_does_not_change_tallies() {
        let width = 64u32;
        let height = 57u32; // odd height to exercise the remainder band
        let mut pixels = vec![0u8; (width * height) as usize];
        // A blob covering roughly a quarter of the grid.
        for y in 10..45 {
            for x in 12..40 {
                pixels[(y * width + x) as usize] = 255;
            }
        }
        let mask = SilhouetteMask {
            width,
            height,
            pixels: &pixels,
        };
        let mut depth = vec![0u16; (width * height) as usize];
        for (i, d) in depth.iter_mut().enumerate() {
            *d = 1000 + (i % 700) as u16;
        }
        let intr = Intrinsics::default();
        // Zone sized so that only part of the blob's unprojected points land inside.
        let zone = TriggerZone::from_geometry(ZoneGeometry::axis_aligned(
            "triggerzone0",
            Vec3::new(-600.0, -500.0, 1300.0),
            Vec3::new(800.0, 800.0, 500.0),
        ))
        .unwrap();
        let zones = vec![zone];
        let rect = ScanRect::new(10, 9, 42, 46);

        let single = scan_silhouette_banded(&mask, &depth, rect, &zones, &intr, 1).unwrap();
        for bands in [2, 3, 4, 8] {
            let banded =
                scan_silhouette_banded(&mask, &depth, rect, &zones, &intr, bands).unwrap();
            assert_eq!(banded.samples, single.samples, "bands = {bands}");
            assert_eq!(banded.zone_points, single.zone_points, "bands = {bands}");
        }
        assert!(
            !single.zone_points.is_empty(),
            "test zone should catch part of the blob"
        );
    }

    #[test]
    fn test_zone_attribution() {
        // Everything at depth 2000 right of the principal point: all samples
        // unproject into a large box centered ahead of the camera.
        let width = 32u32;
        let height = 32u32;
        let pixels = full_mask(width, height);
        let mask = SilhouetteMask {
            width,
            height,
            pixels: &pixels,
        };
        let depth = vec![2000u16; (width * height) as usize];
        let intr = Intrinsics::default();
        let zone = TriggerZone::from_geometry(ZoneGeometry::axis_aligned(
            "triggerzone0",
            Vec3::new(0.0, 0.0, 2000.0),
            Vec3::new(6000.0, 6000.0, 500.0),
        ))
        .unwrap();
        let out = scan_silhouette_banded(
            &mask,
            &depth,
            ScanRect::new(0, 0, width, height),
            &[zone],
            &intr,
            2,
        )
        .unwrap();
        assert_eq!(out.samples, 256);
        assert_eq!(out.zone_points["triggerzone0"], 256 * POINTS_PER_SAMPLE);
    }
}
