//! Node configuration
//!
//! The only configuration a sensor node reads locally: its name, the depth
//! grid it produces, and how to find the controller. Everything behavioral
//! (tracking toggles, zones, thresholds) comes from the controller over
//! the settings channel and is deliberately absent here.

use std::path::Path;

use argos_types::Intrinsics;
use serde::{Deserialize, Serialize};

use crate::error::{ArgosError, ArgosResult};
use crate::net::discovery::DEFAULT_BROADCAST_PORT;
use crate::tracking::DEFAULT_ID_RADIUS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Sensor name announced during discovery; must be unique per controller
    pub name: String,
    /// UDP port the controller's discovery server listens on
    pub broadcast_port: u16,
    /// Depth grid width (pixels)
    pub width: u32,
    /// Depth grid height (pixels)
    pub height: u32,
    /// Match radius for frame-to-frame identity
    pub id_radius: f32,
    pub intrinsics: Intrinsics,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "sensor".to_string(),
            broadcast_port: DEFAULT_BROADCAST_PORT,
            width: 512,
            height: 424,
            id_radius: DEFAULT_ID_RADIUS,
            intrinsics: Intrinsics::default(),
        }
    }
}

impl NodeConfig {
    pub fn from_yaml(yaml: &str) -> ArgosResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| ArgosError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ArgosResult<Self> {
        let yaml = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ArgosError::Config(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_yaml(&yaml)
    }

    fn validate(&self) -> ArgosResult<()> {
        if self.name.is_empty() {
            return Err(ArgosError::Config("sensor name must not be empty".into()));
        }
        if self.name.contains('/') {
            return Err(ArgosError::Config(format!(
                "sensor name '{}' must not contain '/'",
                self.name
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ArgosError::Config(format!(
                "grid {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.id_radius <= 0.0 {
            return Err(ArgosError::Config(format!(
                "id_radius {} must be positive",
                self.id_radius
            )));
        }
        Ok(())
    }
}
