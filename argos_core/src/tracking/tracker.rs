//! Greedy nearest-neighbour identity matching

use std::collections::HashMap;

use argos_types::Vec3;
use log::{debug, info};

use crate::error::{ArgosError, ArgosResult};
use crate::geometry::TriggerZone;
use crate::tracking::Person;

/// Default match radius in centroid units. A detection farther than this
/// from every tracked person starts a new identity.
pub const DEFAULT_ID_RADIUS: f32 = 1000.0;

/// One segmented silhouette, reduced to the inputs the tracker needs.
#[derive(Debug, Clone)]
pub struct Detection {
    pub centroid: Vec3,
    pub center: Vec3,
    pub contour: Vec<Vec3>,
    /// Occupied sample points per zone id, from the occupancy scan
    pub zone_points: HashMap<String, u32>,
}

/// Lifecycle event produced by one tracker update, carrying the person id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    Entered(u32),
    Moved(u32),
    Left(u32),
}

/// Frame-to-frame person identity.
///
/// Each update matches the new detections against the tracked persons by
/// repeatedly taking the globally closest (person, detection) pair until
/// the closest remaining pair is farther apart than the id radius. Matched
/// persons move, unmatched persons leave, unmatched detections enter.
#[derive(Debug)]
pub struct PersonTracker {
    persons: Vec<Person>,
    next_id: u32,
    id_radius: f32,
}

impl Default for PersonTracker {
    fn default() -> Self {
        Self::new(DEFAULT_ID_RADIUS)
    }
}

impl PersonTracker {
    pub fn new(id_radius: f32) -> Self {
        Self {
            persons: Vec::new(),
            next_id: 0,
            id_radius,
        }
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn person(&self, id: u32) -> Option<&Person> {
        self.persons.iter().find(|p| p.id() == id)
    }

    /// Reset the local id counter. Only legal while nobody is tracked,
    /// otherwise recycled ids would collide with live ones.
    pub fn reset_ids(&mut self) -> ArgosResult<()> {
        if !self.persons.is_empty() {
            return Err(ArgosError::InvalidInput(format!(
                "cannot reset ids while {} persons are tracked",
                self.persons.len()
            )));
        }
        self.next_id = 0;
        Ok(())
    }

    /// Match one frame's detections, update zone person tallies, and return
    /// the lifecycle events in move / leave / enter order.
    pub fn update(
        &mut self,
        detections: Vec<Detection>,
        zones: &mut [TriggerZone],
        now_ms: u64,
    ) -> Vec<TrackEvent> {
        let mut events = Vec::new();
        let mut detections: Vec<Option<Detection>> = detections.into_iter().map(Some).collect();

        let rows = self.persons.len();
        let cols = detections.len();
        let mut distances = vec![f32::INFINITY; rows * cols];
        for (r, person) in self.persons.iter().enumerate() {
            for (c, detection) in detections.iter().enumerate() {
                if let Some(d) = detection {
                    distances[r * cols + c] = person.centroid.distance(&d.centroid);
                }
            }
        }

        let mut person_matched = vec![false; rows];
        let mut detection_matched = vec![false; cols];

        // Repeatedly bind the globally closest unmatched pair.
        loop {
            let mut best = f32::INFINITY;
            let mut best_pair = None;
            for r in 0..rows {
                if person_matched[r] {
                    continue;
                }
                for c in 0..cols {
                    if detection_matched[c] {
                        continue;
                    }
                    let d = distances[r * cols + c];
                    if d < best {
                        best = d;
                        best_pair = Some((r, c));
                    }
                }
            }
            let Some((r, c)) = best_pair else { break };
            if best.ceil() > self.id_radius {
                break;
            }
            person_matched[r] = true;
            detection_matched[c] = true;

            let detection = detections[c].take().unwrap_or_else(|| unreachable!());
            let person = &mut self.persons[r];
            person.advance(now_ms, detection.centroid, detection.center, detection.contour);
            attribute_points(zones, person.id(), &detection.zone_points);
            events.push(TrackEvent::Moved(person.id()));
        }

        // Unmatched persons have left; walk backwards so indices stay valid.
        for r in (0..rows).rev() {
            if !person_matched[r] {
                let person = self.persons.remove(r);
                info!("person {} left after {} frames", person.id(), person.age());
                events.push(TrackEvent::Left(person.id()));
            }
        }

        // Unmatched detections are new persons.
        for detection in detections.into_iter().flatten() {
            let id = self.next_id;
            self.next_id += 1;
            info!("person {id} entered at {:?}", detection.centroid);
            attribute_points(zones, id, &detection.zone_points);
            self.persons.push(Person::new(
                id,
                now_ms,
                detection.centroid,
                detection.center,
                detection.contour,
            ));
            events.push(TrackEvent::Entered(id));
        }

        if self.persons.is_empty() && self.next_id != 0 {
            debug!("tracker empty, resetting id counter");
            self.next_id = 0;
        }

        events
    }
}

fn attribute_points(zones: &mut [TriggerZone], person_id: u32, points: &HashMap<String, u32>) {
    for (zone_id, points) in points {
        if let Some(zone) = zones.iter_mut().find(|z| z.id() == zone_id) {
            zone.add_person_points(person_id, *points);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_types::ZoneGeometry;

    fn detection(x: f32, y: f32, z: f32) -> Detection {
        Detection {
            centroid: Vec3::new(x, y, z),
            center: Vec3::new(x, y, 0.0),
            contour: vec![],
            zone_points: HashMap::new(),
        }
    }

    #[test]
    fn test_enter_move_leave() {
        let mut tracker = PersonTracker::default();
        let mut zones = vec![];

        let events = tracker.update(vec![detection(0.0, 0.0, 0.0)], &mut zones, 1000);
        assert_eq!(events, vec![TrackEvent::Entered(0)]);

        let events = tracker.update(vec![detection(10.0, 0.0, 0.0)], &mut zones, 1033);
        assert_eq!(events, vec![TrackEvent::Moved(0)]);
        assert_eq!(tracker.person(0).unwrap().age(), 1);

        let events = tracker.update(vec![], &mut zones, 1066);
        assert_eq!(events, vec![TrackEvent::Left(0)]);
        assert!(tracker.persons().is_empty());
    }

    #[test]
    fn test_greedy_match_prefers_global_minimum() {
        let mut tracker = PersonTracker::default();
        let mut zones = vec![];
        tracker.update(
            vec![detection(0.0, 0.0, 0.0), detection(1000.0, 0.0, 0.0)],
            &mut zones,
            1000,
        );

        // One detection close to person 0, one far beyond the radius: the
        // close pair binds, person 1 leaves, the far detection enters fresh.
        let events = tracker.update(
            vec![detection(50.0, 0.0, 0.0), detection(5000.0, 0.0, 0.0)],
            &mut zones,
            1033,
        );
        assert_eq!(
            events,
            vec![
                TrackEvent::Moved(0),
                TrackEvent::Left(1),
                TrackEvent::Entered(2),
            ]
        );
        assert_eq!(tracker.person(0).unwrap().centroid.x, 50.0);
        assert_eq!(tracker.person(2).unwrap().centroid.x, 5000.0);
    }

    #[test]
    fn test_crossing_persons_keep_nearest_identity() {
        let mut tracker = PersonTracker::default();
        let mut zones = vec![];
        tracker.update(
            vec![detection(0.0, 0.0, 0.0), detection(600.0, 0.0, 0.0)],
            &mut zones,
            1000,
        );
        // Both move right by 100; each binds to its nearer predecessor.
        let events = tracker.update(
            vec![detection(100.0, 0.0, 0.0), detection(700.0, 0.0, 0.0)],
            &mut zones,
            1033,
        );
        assert_eq!(events, vec![TrackEvent::Moved(0), TrackEvent::Moved(1)]);
        assert_eq!(tracker.person(0).unwrap().centroid.x, 100.0);
        assert_eq!(tracker.person(1).unwrap().centroid.x, 700.0);
    }

    #[test]
    fn test_id_counter_resets_when_empty() {
        let mut tracker = PersonTracker::default();
        let mut zones = vec![];
        tracker.update(vec![detection(0.0, 0.0, 0.0)], &mut zones, 1000);
        tracker.update(vec![], &mut zones, 1033);
        let events = tracker.update(vec![detection(0.0, 0.0, 0.0)], &mut zones, 1066);
        assert_eq!(events, vec![TrackEvent::Entered(0)]);
    }

    #[test]
    fn test_reset_ids_requires_empty_tracker() {
        let mut tracker = PersonTracker::default();
        let mut zones = vec![];
        tracker.update(vec![detection(0.0, 0.0, 0.0)], &mut zones, 1000);
        assert!(tracker.reset_ids().is_err());
        tracker.update(vec![], &mut zones, 1033);
        assert!(tracker.reset_ids().is_ok());
    }

    #[test]
    fn test_zone_points_attributed_to_matched_person() {
        let mut tracker = PersonTracker::default();
        let mut zones = vec![TriggerZone::from_geometry(ZoneGeometry::axis_aligned(
            "triggerzone0",
            Vec3::new(0.0, 0.0, 1500.0),
            Vec3::new(1000.0, 1000.0, 1000.0),
        ))
        .unwrap()];

        let mut d = detection(0.0, 0.0, 0.0);
        d.zone_points.insert("triggerzone0".into(), 12);
        tracker.update(vec![d], &mut zones, 1000);
        assert_eq!(zones[0].points_per_person()[&0], 12);

        zones[0].clear_points();
        let mut d = detection(5.0, 0.0, 0.0);
        d.zone_points.insert("triggerzone0".into(), 8);
        tracker.update(vec![d], &mut zones, 1033);
        assert_eq!(zones[0].points_per_person()[&0], 8);
    }
}
