//! One scene: persons, zones and the local-to-global identity map

use std::collections::HashMap;

use argos_types::{PersonSnapshot, Vec3, ZoneGeometry};
use log::{debug, warn};

use crate::error::ArgosResult;
use crate::geometry::TriggerZone;

/// A contiguous physical space observed by one or more sensors.
///
/// Person ids arriving from sensors are sensor-local and recycled; the
/// scene assigns every (sensor, local id) pair a global id that is unique
/// for the scene's lifetime. Updates carry sequence numbers and anything
/// older than the last applied state is dropped, so out-of-order delivery
/// converges on the newest state.
#[derive(Debug)]
pub struct Scene {
    id: u32,
    sensors: Vec<String>,
    /// Global person id -> latest accepted snapshot
    persons: HashMap<u32, PersonSnapshot>,
    zones: HashMap<String, TriggerZone>,
    /// (sensor name, sensor-local id) -> global id
    mapping: HashMap<(String, u32), u32>,
    next_person_id: u32,
    next_zone_index: u32,
}

impl Scene {
    pub(crate) fn new(id: u32, sensor: String) -> Self {
        Self {
            id,
            sensors: vec![sensor],
            persons: HashMap::new(),
            zones: HashMap::new(),
            mapping: HashMap::new(),
            next_person_id: 0,
            next_zone_index: 0,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn sensors(&self) -> &[String] {
        &self.sensors
    }

    pub fn has_sensor(&self, sensor: &str) -> bool {
        self.sensors.iter().any(|s| s == sensor)
    }

    pub fn persons(&self) -> &HashMap<u32, PersonSnapshot> {
        &self.persons
    }

    pub fn global_id(&self, sensor: &str, local_id: u32) -> Option<u32> {
        self.mapping.get(&(sensor.to_string(), local_id)).copied()
    }

    /*-------------- Person lifecycle --------------*/

    /// Record a person entering, assigning a fresh global id.
    ///
    /// An enter for an already-mapped local id is treated as an update of
    /// the existing person rather than a duplicate.
    pub fn person_entered(&mut self, sensor: &str, snapshot: PersonSnapshot, seq: u64) -> u32 {
        let key = (sensor.to_string(), snapshot.local_id);
        if let Some(&global) = self.mapping.get(&key) {
            debug!(
                "duplicate enter for {sensor}/{} (global {global}), updating in place",
                snapshot.local_id
            );
            self.apply_person(global, snapshot, seq);
            return global;
        }
        let global = self.next_person_id;
        self.next_person_id += 1;
        self.mapping.insert(key, global);
        self.apply_person(global, snapshot, seq);
        global
    }

    /// Record a person update. An unmapped local id is treated as an enter,
    /// which covers a lost enter message.
    pub fn person_moved(&mut self, sensor: &str, snapshot: PersonSnapshot, seq: u64) -> u32 {
        let key = (sensor.to_string(), snapshot.local_id);
        match self.mapping.get(&key) {
            Some(&global) => {
                self.apply_person(global, snapshot, seq);
                global
            }
            None => {
                warn!(
                    "update for unknown person {sensor}/{}, treating as enter",
                    snapshot.local_id
                );
                self.person_entered(sensor, snapshot, seq)
            }
        }
    }

    /// Record a person leaving. Unknown ids are a no-op; a leave may race a
    /// later re-enter and arrive twice.
    pub fn person_left(&mut self, sensor: &str, local_id: u32) -> Option<u32> {
        let key = (sensor.to_string(), local_id);
        match self.mapping.remove(&key) {
            Some(global) => {
                self.persons.remove(&global);
                Some(global)
            }
            None => {
                debug!("leave for unknown person {sensor}/{local_id}, ignoring");
                None
            }
        }
    }

    /// Apply a snapshot unless a newer one has already been applied.
    fn apply_person(&mut self, global: u32, mut snapshot: PersonSnapshot, seq: u64) {
        if let Some(existing) = self.persons.get(&global) {
            if seq < existing.last_update {
                debug!(
                    "stale update for global person {global} (seq {seq} < {})",
                    existing.last_update
                );
                return;
            }
        }
        snapshot.last_update = seq;
        self.persons.insert(global, snapshot);
    }

    /*-------------- Zones --------------*/

    /// Create a zone with the next free "triggerzone{n}" id.
    pub fn add_zone(&mut self, center: Vec3, rotation: Vec3, size: Vec3) -> ArgosResult<String> {
        let id = format!("triggerzone{}", self.next_zone_index);
        self.next_zone_index += 1;
        let zone = TriggerZone::from_geometry(ZoneGeometry {
            id: id.clone(),
            center,
            rotation,
            size,
        })?;
        self.zones.insert(id.clone(), zone);
        Ok(id)
    }

    pub fn delete_zone(&mut self, zone_id: &str) -> bool {
        self.zones.remove(zone_id).is_some()
    }

    pub fn zone(&self, zone_id: &str) -> Option<&TriggerZone> {
        self.zones.get(zone_id)
    }

    pub fn zone_mut(&mut self, zone_id: &str) -> Option<&mut TriggerZone> {
        self.zones.get_mut(zone_id)
    }

    /// Zones in display order: numeric id suffix ascending, then name.
    pub fn zones_sorted(&self) -> Vec<&TriggerZone> {
        let mut zones: Vec<&TriggerZone> = self.zones.values().collect();
        zones.sort_by(|a, b| {
            let (ka, kb) = (a.geometry().id_index(), b.geometry().id_index());
            ka.cmp(&kb).then_with(|| a.id().cmp(b.id()))
        });
        zones
    }

    /// Geometry of every zone, in display order, for pushing to sensors.
    pub fn zone_geometries(&self) -> Vec<ZoneGeometry> {
        self.zones_sorted()
            .into_iter()
            .map(|z| z.geometry().clone())
            .collect()
    }

    /// Apply a zone occupancy report from a sensor.
    ///
    /// Per-person points arrive with sensor-local ids and are translated to
    /// global ids; unmappable ids are dropped. Reports older than the last
    /// applied one are ignored. Returns whether the stored tally changed.
    pub fn zone_update(
        &mut self,
        sensor: &str,
        zone_id: &str,
        points_inside: u32,
        per_person: &[(u32, u32)],
        fseq: u64,
    ) -> bool {
        let mut translated: HashMap<u32, u32> = HashMap::new();
        for &(local_id, points) in per_person {
            match self.mapping.get(&(sensor.to_string(), local_id)) {
                Some(&global) => {
                    *translated.entry(global).or_insert(0) += points;
                }
                None => {
                    debug!("zone {zone_id}: dropping points for unmapped person {sensor}/{local_id}")
                }
            }
        }

        let Some(zone) = self.zones.get_mut(zone_id) else {
            warn!("update for unknown zone {zone_id} from {sensor}, ignoring");
            return false;
        };
        if fseq < zone.last_update() {
            debug!(
                "stale zone update for {zone_id} (fseq {fseq} < {})",
                zone.last_update()
            );
            return false;
        }

        let changed =
            zone.points_inside() != points_inside || *zone.points_per_person() != translated;
        zone.set_tally(points_inside, translated);
        zone.set_last_update(fseq);
        changed
    }

    /*-------------- Sensor membership (registry internals) --------------*/

    pub(crate) fn attach_sensor(&mut self, sensor: String) {
        if !self.has_sensor(&sensor) {
            self.sensors.push(sensor);
        }
    }

    /// Detach a sensor, dropping its live persons and mappings.
    pub(crate) fn detach_sensor(&mut self, sensor: &str) {
        self.sensors.retain(|s| s != sensor);
        let stale: Vec<((String, u32), u32)> = self
            .mapping
            .iter()
            .filter(|((s, _), _)| s == sensor)
            .map(|(k, &g)| (k.clone(), g))
            .collect();
        for (key, global) in stale {
            self.mapping.remove(&key);
            self.persons.remove(&global);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(local_id: u32) -> PersonSnapshot {
        PersonSnapshot::new(local_id, 0)
    }

    #[test]
    fn test_global_ids_survive_local_recycling() {
        let mut scene = Scene::new(0, "door".into());
        let g0 = scene.person_entered("door", snapshot(0), 1);
        scene.person_left("door", 0);
        // The sensor recycles local id 0; the scene must not.
        let g1 = scene.person_entered("door", snapshot(0), 3);
        assert_ne!(g0, g1);
    }

    #[test]
    fn test_stale_person_update_dropped() {
        let mut scene = Scene::new(0, "door".into());
        let global = scene.person_entered("door", snapshot(0), 5);
        let mut newer = snapshot(0);
        newer.centroid = Vec3::new(9.0, 0.0, 0.0);
        scene.person_moved("door", newer, 7);
        let mut older = snapshot(0);
        older.centroid = Vec3::new(1.0, 0.0, 0.0);
        scene.person_moved("door", older, 6);
        assert_eq!(scene.persons()[&global].centroid.x, 9.0);
        // Equal sequence numbers are accepted.
        let mut equal = snapshot(0);
        equal.centroid = Vec3::new(4.0, 0.0, 0.0);
        scene.person_moved("door", equal, 7);
        assert_eq!(scene.persons()[&global].centroid.x, 4.0);
    }

    #[test]
    fn test_move_without_enter_is_defensive_enter() {
        let mut scene = Scene::new(0, "door".into());
        let global = scene.person_moved("door", snapshot(4), 2);
        assert!(scene.persons().contains_key(&global));
        assert_eq!(scene.global_id("door", 4), Some(global));
    }

    #[test]
    fn test_double_leave_is_noop() {
        let mut scene = Scene::new(0, "door".into());
        scene.person_entered("door", snapshot(0), 1);
        assert!(scene.person_left("door", 0).is_some());
        assert!(scene.person_left("door", 0).is_none());
    }

    #[test]
    fn test_zone_ids_are_monotonic() {
        let mut scene = Scene::new(0, "door".into());
        let size = Vec3::new(100.0, 100.0, 100.0);
        let a = scene.add_zone(Vec3::ZERO, Vec3::ZERO, size).unwrap();
        let b = scene.add_zone(Vec3::ZERO, Vec3::ZERO, size).unwrap();
        assert_eq!(a, "triggerzone0");
        assert_eq!(b, "triggerzone1");
        assert!(scene.delete_zone(&a));
        // Deleted indexes are never reused.
        let c = scene.add_zone(Vec3::ZERO, Vec3::ZERO, size).unwrap();
        assert_eq!(c, "triggerzone2");
    }

    #[test]
    fn test_zone_update_translates_and_gates() {
        let mut scene = Scene::new(0, "door".into());
        let size = Vec3::new(100.0, 100.0, 100.0);
        let zone_id = scene.add_zone(Vec3::ZERO, Vec3::ZERO, size).unwrap();
        let global = scene.person_entered("door", snapshot(0), 1);

        // Local id 0 maps to the global id; local id 9 is unmapped and dropped.
        let changed = scene.zone_update("door", &zone_id, 20, &[(0, 12), (9, 8)], 10);
        assert!(changed);
        let zone = scene.zone(&zone_id).unwrap();
        assert_eq!(zone.points_inside(), 20);
        assert_eq!(zone.points_per_person().len(), 1);
        assert_eq!(zone.points_per_person()[&global], 12);

        // Stale report leaves the tally untouched.
        assert!(!scene.zone_update("door", &zone_id, 99, &[], 9));
        assert_eq!(scene.zone(&zone_id).unwrap().points_inside(), 20);

        // Same tally again: accepted but unchanged.
        assert!(!scene.zone_update("door", &zone_id, 20, &[(0, 12)], 11));
    }

    #[test]
    fn test_zones_sorted_by_numeric_suffix() {
        let mut scene = Scene::new(0, "door".into());
        let size = Vec3::new(100.0, 100.0, 100.0);
        for _ in 0..11 {
            scene.add_zone(Vec3::ZERO, Vec3::ZERO, size).unwrap();
        }
        let ids: Vec<&str> = scene.zones_sorted().iter().map(|z| z.id()).collect();
        // Lexicographic order would put triggerzone10 before triggerzone2.
        assert_eq!(ids[2], "triggerzone2");
        assert_eq!(ids[10], "triggerzone10");
    }
}
