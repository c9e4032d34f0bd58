//! Controller node: sensor bindings and update dispatch
//!
//! The controller identifies sensors by the source IP of their traffic.
//! Discovery establishes the IP-to-name binding; every event-stream update
//! is routed through it into the owning scene. Updates from an address
//! that never completed discovery are dropped.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use log::{info, warn};

use crate::net::discovery::SensorBinding;
use crate::net::events::EventUpdate;
use crate::net::receiver::EventReceiver;
use crate::scene::SceneRegistry;

pub struct ControllerNode {
    registry: SceneRegistry,
    bindings: HashMap<IpAddr, String>,
}

impl Default for ControllerNode {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerNode {
    pub fn new() -> Self {
        Self {
            registry: SceneRegistry::new(),
            bindings: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SceneRegistry {
        &mut self.registry
    }

    pub fn sensor_name(&self, addr: IpAddr) -> Option<&str> {
        self.bindings.get(&addr).map(String::as_str)
    }

    /// Record a sensor that completed discovery. A re-announcing sensor
    /// (restart, address change) just refreshes its binding.
    pub fn bind_sensor(&mut self, binding: &SensorBinding) {
        let ip = binding.addr.ip();
        match self.bindings.insert(ip, binding.name.clone()) {
            Some(old) if old != binding.name => {
                info!("address {ip} rebound from '{old}' to '{}'", binding.name)
            }
            _ => {}
        }
        self.registry.register_sensor(&binding.name);
    }

    /// Route one event-stream update into the owning scene.
    pub fn handle_update(&mut self, src: SocketAddr, update: EventUpdate) {
        let Some(sensor) = self.bindings.get(&src.ip()).cloned() else {
            warn!("dropping update from unbound address {src}");
            return;
        };
        let Some(scene) = self.registry.scene_for_sensor_mut(&sensor) else {
            warn!("sensor '{sensor}' has no scene, dropping update");
            return;
        };
        match update {
            EventUpdate::Person {
                entered,
                person,
                fseq,
            } => {
                if entered {
                    scene.person_entered(&sensor, person, fseq);
                } else {
                    scene.person_moved(&sensor, person, fseq);
                }
            }
            EventUpdate::PersonLeft { local_id } => {
                scene.person_left(&sensor, local_id);
            }
            EventUpdate::Zone {
                zone_id,
                points_inside,
                per_person,
                fseq,
            } => {
                scene.zone_update(&sensor, &zone_id, points_inside, &per_person, fseq);
            }
        }
    }

    /// Drain every update currently queued on the receiver. Returns how
    /// many were handled.
    pub fn poll(&mut self, receiver: &EventReceiver) -> usize {
        let mut handled = 0;
        while let Ok((src, update)) = receiver.updates().try_recv() {
            self.handle_update(src, update);
            handled += 1;
        }
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_types::PersonSnapshot;

    fn binding(name: &str, addr: &str) -> SensorBinding {
        SensorBinding {
            name: name.to_string(),
            addr: addr.parse().unwrap(),
        }
    }

    fn person_update(local_id: u32, entered: bool, fseq: u64) -> EventUpdate {
        EventUpdate::Person {
            entered,
            person: PersonSnapshot::new(local_id, 0),
            fseq,
        }
    }

    #[test]
    fn test_updates_route_by_source_ip() {
        let mut controller = ControllerNode::new();
        controller.bind_sensor(&binding("door", "10.0.0.5:40000"));

        // Same host, different source port: still the same sensor.
        let src: SocketAddr = "10.0.0.5:41234".parse().unwrap();
        controller.handle_update(src, person_update(0, true, 1));
        let scene = controller.registry().scene_for_sensor("door").unwrap();
        assert_eq!(scene.persons().len(), 1);
    }

    #[test]
    fn test_unbound_address_dropped() {
        let mut controller = ControllerNode::new();
        controller.bind_sensor(&binding("door", "10.0.0.5:40000"));
        let stranger: SocketAddr = "10.0.0.99:40000".parse().unwrap();
        controller.handle_update(stranger, person_update(0, true, 1));
        let scene = controller.registry().scene_for_sensor("door").unwrap();
        assert!(scene.persons().is_empty());
    }

    #[test]
    fn test_rebind_keeps_scene() {
        let mut controller = ControllerNode::new();
        controller.bind_sensor(&binding("door", "10.0.0.5:40000"));
        let scene_id = controller.registry().scene_for_sensor("door").unwrap().id();
        // Sensor restarts with a new address.
        controller.bind_sensor(&binding("door", "10.0.0.7:40000"));
        assert_eq!(
            controller.registry().scene_for_sensor("door").unwrap().id(),
            scene_id
        );
        let src: SocketAddr = "10.0.0.7:5000".parse().unwrap();
        controller.handle_update(src, person_update(2, true, 1));
        let scene = controller.registry().scene_for_sensor("door").unwrap();
        assert_eq!(scene.persons().len(), 1);
    }
}
