//! Registry of scenes and the sensors assigned to them

use log::info;

use crate::error::{ArgosError, ArgosResult};
use crate::scene::Scene;

/// All scenes known to a controller.
///
/// Every sensor starts in a scene of its own; the operator merges sensors
/// that watch the same physical space. A sensor belongs to exactly one
/// scene at a time.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    scenes: Vec<Scene>,
    next_scene_id: u32,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn scene(&self, scene_id: u32) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id() == scene_id)
    }

    pub fn scene_for_sensor(&self, sensor: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.has_sensor(sensor))
    }

    pub fn scene_for_sensor_mut(&mut self, sensor: &str) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| s.has_sensor(sensor))
    }

    /// Register a sensor, giving it a scene of its own. Re-registering a
    /// known sensor (a node that restarted) keeps its current scene.
    pub fn register_sensor(&mut self, sensor: &str) -> u32 {
        if let Some(scene) = self.scene_for_sensor(sensor) {
            return scene.id();
        }
        let id = self.next_scene_id;
        self.next_scene_id += 1;
        info!("sensor '{sensor}' registered into new scene {id}");
        self.scenes.push(Scene::new(id, sensor.to_string()));
        id
    }

    /// Move `moved` into the scene of `kept`, so both sensors feed one
    /// scene. The moved sensor's live persons are dropped; its next frame
    /// repopulates them under the target scene's global ids. An emptied
    /// scene is removed.
    pub fn merge_sensors(&mut self, kept: &str, moved: &str) -> ArgosResult<u32> {
        if kept == moved {
            return Err(ArgosError::InvalidInput(format!(
                "cannot merge sensor '{kept}' with itself"
            )));
        }
        let target = self
            .scene_for_sensor(kept)
            .map(Scene::id)
            .ok_or_else(|| ArgosError::NotFound(format!("sensor '{kept}'")))?;
        let source_scene = self
            .scene_for_sensor_mut(moved)
            .ok_or_else(|| ArgosError::NotFound(format!("sensor '{moved}'")))?;
        source_scene.detach_sensor(moved);
        self.scenes.retain(|s| !s.sensors().is_empty());

        let scene = self
            .scenes
            .iter_mut()
            .find(|s| s.id() == target)
            .ok_or_else(|| ArgosError::NotFound(format!("scene {target}")))?;
        scene.attach_sensor(moved.to_string());
        info!("sensor '{moved}' merged into scene {target} alongside '{kept}'");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_types::PersonSnapshot;

    #[test]
    fn test_each_sensor_gets_own_scene() {
        let mut registry = SceneRegistry::new();
        let a = registry.register_sensor("door");
        let b = registry.register_sensor("stage");
        assert_ne!(a, b);
        assert_eq!(registry.register_sensor("door"), a);
        assert_eq!(registry.scenes().len(), 2);
    }

    #[test]
    fn test_merge_moves_sensor_and_drops_its_persons() {
        let mut registry = SceneRegistry::new();
        registry.register_sensor("door");
        registry.register_sensor("stage");
        registry
            .scene_for_sensor_mut("stage")
            .unwrap()
            .person_entered("stage", PersonSnapshot::new(0, 0), 1);

        let target = registry.merge_sensors("door", "stage").unwrap();
        assert_eq!(registry.scenes().len(), 1);
        let scene = registry.scene(target).unwrap();
        assert!(scene.has_sensor("door"));
        assert!(scene.has_sensor("stage"));
        // The moved sensor's live persons did not follow it.
        assert!(scene.persons().is_empty());
        assert_eq!(scene.global_id("stage", 0), None);
    }

    #[test]
    fn test_merge_unknown_sensor_fails() {
        let mut registry = SceneRegistry::new();
        registry.register_sensor("door");
        assert!(registry.merge_sensors("door", "ghost").is_err());
        assert!(registry.merge_sensors("ghost", "door").is_err());
        assert!(registry.merge_sensors("door", "door").is_err());
    }

    #[test]
    fn test_merged_sensors_share_global_id_space() {
        let mut registry = SceneRegistry::new();
        registry.register_sensor("door");
        registry.register_sensor("stage");
        registry.merge_sensors("door", "stage").unwrap();

        let scene = registry.scene_for_sensor_mut("door").unwrap();
        let g0 = scene.person_entered("door", PersonSnapshot::new(0, 0), 1);
        let g1 = scene.person_entered("stage", PersonSnapshot::new(0, 0), 1);
        // Same local id on different sensors, distinct global persons.
        assert_ne!(g0, g1);
        assert_eq!(scene.persons().len(), 2);
    }
}
