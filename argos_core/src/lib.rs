//! # ARGOS Core
//!
//! Core runtime for the ARGOS presence tracking system: one or more depth
//! sensor nodes detect moving people, attribute their presence to
//! operator-defined 3D trigger zones, and keep a central controller's view
//! of people and zones convergent over an unreliable, sensor-initiated
//! network link.
//!
//! The crate is organized leaf-first:
//!
//! - **geometry**: oriented trigger boxes and point containment
//! - **scan**: parallel occupancy scan of silhouette masks
//! - **tracking**: frame-to-frame person identity and lifecycle
//! - **scene**: cross-sensor identity mapping and the scene registry
//! - **net**: discovery, settings channel, event stream, frame stream
//! - **sensor** / **controller**: the two node assemblies
//!
//! Capture, segmentation, rendering and persistence are external
//! collaborators; this crate starts at the silhouette mask and ends at the
//! scene registry.

pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod net;
pub mod scan;
pub mod scene;
pub mod sensor;
pub mod tracking;

pub use config::NodeConfig;
pub use controller::ControllerNode;
pub use error::{ArgosError, ArgosResult};
pub use geometry::{TriggerBox, TriggerZone};
pub use scene::{Scene, SceneRegistry};
pub use sensor::{FrameInput, FrameSource, SensorNode, SilhouetteInput};
pub use tracking::{Person, PersonTracker, TrackEvent};
