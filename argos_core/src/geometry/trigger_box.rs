//! Oriented box: corner points, face normals, containment

use std::collections::HashMap;

use argos_types::{Vec3, ZoneGeometry};

use crate::error::{ArgosError, ArgosResult};
use crate::geometry::rotate_euler;

/// Corner sign pattern of an axis-aligned box, one entry per corner.
///
/// The ordering is load-bearing: the face normal and containment tables
/// below index into it.
const CORNER_SIGNS: [[f32; 3]; 8] = [
    [1.0, 1.0, 1.0],
    [1.0, 1.0, -1.0],
    [1.0, -1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [1.0, -1.0, -1.0],
];

/// Face normal construction: normals[i] = (edges[a] - edges[b]) x (edges[c] - edges[b]).
const NORMAL_EDGES: [[usize; 3]; 6] = [
    [5, 3, 2],
    [1, 2, 0],
    [6, 3, 5],
    [1, 6, 4],
    [7, 4, 5],
    [3, 6, 1],
];

/// Containment test: for face i, signed distance is measured from
/// edges[FACE_ORIGINS[i]] along normals[i].
const FACE_ORIGINS: [usize; 6] = [2, 1, 3, 6, 7, 1];

const DEGENERATE_EPSILON: f32 = 1e-6;

/// An oriented-box trigger zone with its derived geometry and the running
/// per-frame occupancy tally.
///
/// The 8 corner points and 6 outward face normals are recomputed on every
/// mutation of center/rotation/size; accessors never observe stale values.
#[derive(Debug, Clone)]
pub struct TriggerBox {
    geometry: ZoneGeometry,
    volume: f32,
    edges: [Vec3; 8],
    normals: [Vec3; 6],
    /// Total occupied sample points this frame
    points_inside: u32,
    /// Sample points per sensor-local person id this frame
    points_per_person: HashMap<u32, u32>,
    /// Sequence number of the last applied update (controller side)
    last_update: u64,
}

impl TriggerBox {
    /// Build a box from its geometry parameters.
    ///
    /// Fails with [`ArgosError::Geometry`] if the box is degenerate (any
    /// extent collapses a face to a line).
    pub fn new(geometry: ZoneGeometry) -> ArgosResult<Self> {
        let mut boxed = Self {
            volume: geometry.volume(),
            geometry,
            edges: [Vec3::ZERO; 8],
            normals: [Vec3::ZERO; 6],
            points_inside: 0,
            points_per_person: HashMap::new(),
            last_update: 0,
        };
        boxed.recompute()?;
        Ok(boxed)
    }

    fn recompute(&mut self) -> ArgosResult<()> {
        self.compute_edges();
        self.compute_face_normals()
    }

    /// The 8 corners: an axis-aligned box of the configured size, rotated,
    /// then translated to the center.
    fn compute_edges(&mut self) {
        let half = self.geometry.size / 2.0;
        for (edge, signs) in self.edges.iter_mut().zip(CORNER_SIGNS.iter()) {
            let corner = Vec3::new(half.x * signs[0], half.y * signs[1], half.z * signs[2]);
            *edge = rotate_euler(corner, self.geometry.rotation) + self.geometry.center;
        }
    }

    /// One outward unit normal per face, derived from cross products of
    /// corner differences.
    fn compute_face_normals(&mut self) -> ArgosResult<()> {
        for (normal, [a, b, c]) in self.normals.iter_mut().zip(NORMAL_EDGES.iter()) {
            let cross = (self.edges[*a] - self.edges[*b]).cross(&(self.edges[*c] - self.edges[*b]));
            *normal = cross.normalized().ok_or_else(|| {
                ArgosError::geometry(format!(
                    "colinear edges on box '{}', size {:?}",
                    self.geometry.id, self.geometry.size
                ))
            })?;
        }
        Ok(())
    }

    /// Whether `point` lies inside the box.
    ///
    /// The point must sit behind all six face planes; the first positive
    /// signed distance rejects it.
    pub fn contains_point(&self, point: Vec3) -> bool {
        for (face, normal) in self.normals.iter().enumerate() {
            let origin = self.edges[FACE_ORIGINS[face]];
            if normal.dot(&(point - origin)) > DEGENERATE_EPSILON {
                return false;
            }
        }
        true
    }

    /*-------------- Mutators (all recompute derived geometry) --------------*/

    pub fn set_center(&mut self, center: Vec3) -> ArgosResult<()> {
        self.geometry.center = center;
        self.recompute()
    }

    pub fn set_rotation(&mut self, rotation: Vec3) -> ArgosResult<()> {
        self.geometry.rotation = rotation;
        self.recompute()
    }

    pub fn set_size(&mut self, size: Vec3) -> ArgosResult<()> {
        self.geometry.size = size;
        self.volume = self.geometry.volume();
        self.recompute()
    }

    /*-------------- Occupancy tally --------------*/

    /// Clear the per-frame tally. Called at the start of every scan.
    pub fn clear_points(&mut self) {
        self.points_inside = 0;
        self.points_per_person.clear();
    }

    /// Add occupied sample points to the zone total (merge step only).
    pub fn add_points(&mut self, points: u32) {
        self.points_inside += points;
    }

    /// Attribute occupied sample points to a person.
    pub fn add_person_points(&mut self, person_id: u32, points: u32) {
        *self.points_per_person.entry(person_id).or_insert(0) += points;
    }

    /// Replace the tally wholesale (controller side, from a zone update).
    pub fn set_tally(&mut self, points_inside: u32, points_per_person: HashMap<u32, u32>) {
        self.points_inside = points_inside;
        self.points_per_person = points_per_person;
    }

    /*-------------- Accessors --------------*/

    pub fn id(&self) -> &str {
        &self.geometry.id
    }

    pub fn geometry(&self) -> &ZoneGeometry {
        &self.geometry
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn edges(&self) -> &[Vec3; 8] {
        &self.edges
    }

    pub fn normals(&self) -> &[Vec3; 6] {
        &self.normals
    }

    pub fn points_inside(&self) -> u32 {
        self.points_inside
    }

    pub fn points_per_person(&self) -> &HashMap<u32, u32> {
        &self.points_per_person
    }

    pub fn last_update(&self) -> u64 {
        self.last_update
    }

    pub fn set_last_update(&mut self, sequence: u64) {
        self.last_update = sequence;
    }
}
