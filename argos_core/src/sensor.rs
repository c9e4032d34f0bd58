//! Sensor node: from segmented frames to event messages
//!
//! The sensor node sits between the capture/segmentation pipeline (an
//! external collaborator feeding it [`FrameInput`]s) and the network. Per
//! frame it scans every silhouette against the active zones, advances the
//! tracker, and emits the event messages the controller needs to mirror
//! the result: person lifecycle first, then one update per zone, all
//! stamped with the frame sequence number.

use argos_types::Vec3;
use log::{info, warn};

use crate::config::NodeConfig;
use crate::error::ArgosResult;
use crate::geometry::TriggerZone;
use crate::net::client::EventClient;
use crate::net::events::{person_left_message, person_message, zone_update_message};
use crate::net::protocol::EventMessage;
use crate::net::settings::Settings;
use crate::scan::{scan_silhouette, ScanRect, SilhouetteMask};
use crate::tracking::{Detection, PersonTracker, TrackEvent};

/// One segmented silhouette within a frame.
#[derive(Debug, Clone)]
pub struct SilhouetteInput {
    /// Contour polygon in grid coordinates
    pub contour: Vec<Vec3>,
    /// Bounding rectangle in the frame's mask
    pub bounds: ScanRect,
}

/// One segmented depth frame, as produced by the capture pipeline.
#[derive(Debug, Clone)]
pub struct FrameInput {
    pub width: u32,
    pub height: u32,
    /// Raw depth in millimeters, row-major
    pub depth: Vec<u16>,
    /// Foreground mask over the full grid; nonzero = person candidate
    pub mask: Vec<u8>,
    pub silhouettes: Vec<SilhouetteInput>,
}

/// Source of segmented frames, implemented by the capture pipeline.
pub trait FrameSource {
    /// The next frame, `Ok(None)` when the source is exhausted.
    fn next_frame(&mut self) -> ArgosResult<Option<FrameInput>>;
}

/// The per-sensor tracking pipeline.
pub struct SensorNode {
    config: NodeConfig,
    settings: Settings,
    tracker: PersonTracker,
    zones: Vec<TriggerZone>,
    frame_counter: u64,
}

impl SensorNode {
    pub fn new(config: NodeConfig) -> Self {
        let tracker = PersonTracker::new(config.id_radius);
        Self {
            config,
            settings: Settings::default(),
            tracker,
            zones: Vec::new(),
            frame_counter: 0,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn zones(&self) -> &[TriggerZone] {
        &self.zones
    }

    pub fn tracker(&self) -> &PersonTracker {
        &self.tracker
    }

    /// Adopt a settings document pushed by the controller. Zones are
    /// rebuilt from scratch; a degenerate zone is skipped, not fatal.
    pub fn apply_settings(&mut self, settings: Settings) {
        let mut zones = Vec::with_capacity(settings.zones.len());
        for geometry in &settings.zones {
            match TriggerZone::from_geometry(geometry.clone()) {
                Ok(zone) => zones.push(zone),
                Err(e) => warn!("skipping zone '{}': {e}", geometry.id),
            }
        }
        zones.sort_by_key(|z| z.geometry().id_index());
        info!(
            "settings applied: tracking={}, {} zones",
            settings.tracking,
            zones.len()
        );
        self.zones = zones;
        self.settings = settings;
    }

    /// Process one frame and return the event messages to send, in order:
    /// person moves, leaves, enters, then one update per zone.
    pub fn process_frame(&mut self, frame: &FrameInput, now_ms: u64) -> Vec<EventMessage> {
        if !self.settings.tracking {
            return Vec::new();
        }
        let fseq = self.frame_counter;
        self.frame_counter += 1;

        for zone in &mut self.zones {
            zone.clear_points();
        }

        let mask = SilhouetteMask {
            width: frame.width,
            height: frame.height,
            pixels: &frame.mask,
        };
        let mut detections = Vec::new();
        for silhouette in &frame.silhouettes {
            if (silhouette.contour.len() as u32) < self.settings.min_silhouette_size {
                continue;
            }
            let Some(scan) = scan_silhouette(
                &mask,
                &frame.depth,
                silhouette.bounds,
                &self.zones,
                &self.config.intrinsics,
            ) else {
                continue;
            };
            for (zone_id, points) in &scan.zone_points {
                if let Some(zone) = self.zones.iter_mut().find(|z| z.id() == zone_id.as_str()) {
                    zone.add_points(*points);
                }
            }
            detections.push(Detection {
                centroid: scan.centroid,
                center: silhouette.bounds.center(),
                contour: silhouette.contour.clone(),
                zone_points: scan.zone_points,
            });
        }

        let events = self.tracker.update(detections, &mut self.zones, now_ms);

        let mut messages = Vec::with_capacity(events.len() + self.zones.len());
        for event in events {
            match event {
                TrackEvent::Moved(id) => {
                    if let Some(person) = self.tracker.person(id) {
                        messages.push(person_message(
                            false,
                            &person.snapshot(),
                            frame.width,
                            frame.height,
                            fseq,
                        ));
                    }
                }
                TrackEvent::Left(id) => messages.push(person_left_message(id)),
                TrackEvent::Entered(id) => {
                    if let Some(person) = self.tracker.person(id) {
                        messages.push(person_message(
                            true,
                            &person.snapshot(),
                            frame.width,
                            frame.height,
                            fseq,
                        ));
                    }
                }
            }
        }

        // Every zone reports every frame, occupied or not; the controller
        // gates on fseq.
        for zone in &self.zones {
            let mut per_person: Vec<(u32, u32)> = zone
                .points_per_person()
                .iter()
                .map(|(&id, &points)| (id, points))
                .collect();
            per_person.sort_by_key(|&(id, _)| id);
            messages.push(zone_update_message(
                zone.id(),
                zone.points_inside(),
                &per_person,
                fseq,
            ));
        }

        messages
    }

    /// Pull one frame from the source, process it, and send the resulting
    /// messages over the event stream. Returns `Ok(false)` when the source
    /// is exhausted.
    pub fn pump(
        &mut self,
        source: &mut dyn FrameSource,
        client: &mut EventClient,
        now_ms: u64,
    ) -> ArgosResult<bool> {
        let Some(frame) = source.next_frame()? else {
            return Ok(false);
        };
        for msg in self.process_frame(&frame, now_ms) {
            client.send(&msg)?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::events::{parse_event, EventUpdate, ADDR_PERSON_ENTERED};
    use argos_types::ZoneGeometry;

    fn frame_with_blob(width: u32, height: u32, depth_mm: u16) -> FrameInput {
        let mut mask = vec![0u8; (width * height) as usize];
        for y in 4..20 {
            for x in 4..20 {
                mask[(y * width + x) as usize] = 255;
            }
        }
        let contour = (0..60)
            .map(|i| Vec3::new(4.0 + (i % 16) as f32, 4.0 + (i / 16) as f32, 0.0))
            .collect();
        FrameInput {
            width,
            height,
            depth: vec![depth_mm; (width * height) as usize],
            mask,
            silhouettes: vec![SilhouetteInput {
                contour,
                bounds: ScanRect::new(4, 4, 20, 20),
            }],
        }
    }

    fn test_node() -> SensorNode {
        let mut node = SensorNode::new(NodeConfig::default());
        let mut settings = Settings::default();
        settings.min_silhouette_size = 10;
        settings.zones = vec![ZoneGeometry::axis_aligned(
            "triggerzone0",
            Vec3::new(0.0, 0.0, 2000.0),
            Vec3::new(8000.0, 8000.0, 1000.0),
        )];
        node.apply_settings(settings);
        node
    }

    #[test]
    fn test_first_frame_enters_and_reports_zones() {
        let mut node = test_node();
        let frame = frame_with_blob(64, 64, 2000);
        let messages = node.process_frame(&frame, 1000);
        // One enter plus one zone update.
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].address, ADDR_PERSON_ENTERED);
        let EventUpdate::Zone {
            zone_id,
            points_inside,
            per_person,
            fseq,
        } = parse_event(&messages[1]).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(zone_id, "triggerzone0");
        assert_eq!(fseq, 0);
        assert!(points_inside > 0);
        assert_eq!(per_person, vec![(0, points_inside)]);
    }

    #[test]
    fn test_fseq_increments_per_frame() {
        let mut node = test_node();
        let frame = frame_with_blob(64, 64, 2000);
        node.process_frame(&frame, 1000);
        let messages = node.process_frame(&frame, 1033);
        let EventUpdate::Person { entered, fseq, .. } = parse_event(&messages[0]).unwrap() else {
            panic!("wrong variant");
        };
        assert!(!entered);
        assert_eq!(fseq, 1);
    }

    #[test]
    fn test_small_silhouettes_ignored() {
        let mut node = test_node();
        let mut frame = frame_with_blob(64, 64, 2000);
        frame.silhouettes[0].contour.truncate(4);
        let messages = node.process_frame(&frame, 1000);
        // No person events, just the empty zone report.
        assert_eq!(messages.len(), 1);
        let EventUpdate::Zone { points_inside, .. } = parse_event(&messages[0]).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(points_inside, 0);
    }

    #[test]
    fn test_tracking_off_is_silent() {
        let mut node = test_node();
        let mut settings = node.settings().clone();
        settings.tracking = false;
        node.apply_settings(settings);
        let frame = frame_with_blob(64, 64, 2000);
        assert!(node.process_frame(&frame, 1000).is_empty());
    }

    #[test]
    fn test_person_leaving_emits_left() {
        let mut node = test_node();
        let frame = frame_with_blob(64, 64, 2000);
        node.process_frame(&frame, 1000);
        let mut empty = frame.clone();
        empty.silhouettes.clear();
        let messages = node.process_frame(&empty, 1033);
        assert_eq!(
            parse_event(&messages[0]).unwrap(),
            EventUpdate::PersonLeft { local_id: 0 }
        );
    }

    #[test]
    fn test_pump_drains_source_over_loopback() {
        struct CannedFrames(Vec<FrameInput>);
        impl FrameSource for CannedFrames {
            fn next_frame(&mut self) -> ArgosResult<Option<FrameInput>> {
                Ok(self.0.pop())
            }
        }

        let receiver = std::net::UdpSocket::bind(("127.0.0.1", 0)).unwrap();
        let mut client = EventClient::connect(receiver.local_addr().unwrap()).unwrap();
        let mut node = test_node();
        let mut source = CannedFrames(vec![frame_with_blob(64, 64, 2000)]);

        assert!(node.pump(&mut source, &mut client, 1000).unwrap());
        assert!(!node.pump(&mut source, &mut client, 1033).unwrap());

        let mut buf = [0u8; 65536];
        let (size, _) = receiver.recv_from(&mut buf).unwrap();
        let msg = EventMessage::decode(&buf[..size]).unwrap();
        assert_eq!(msg.address, ADDR_PERSON_ENTERED);
    }

    #[test]
    fn test_degenerate_zone_skipped() {
        let mut node = SensorNode::new(NodeConfig::default());
        let mut settings = Settings::default();
        settings.zones = vec![
            ZoneGeometry::axis_aligned("triggerzone0", Vec3::ZERO, Vec3::ZERO),
            ZoneGeometry::axis_aligned(
                "triggerzone1",
                Vec3::ZERO,
                Vec3::new(100.0, 100.0, 100.0),
            ),
        ];
        node.apply_settings(settings);
        assert_eq!(node.zones().len(), 1);
        assert_eq!(node.zones()[0].id(), "triggerzone1");
    }
}
