//! Frame-to-frame person identity and lifecycle
//!
//! The sensor node never sees "persons" in its input, only silhouettes.
//! This module carries identity across frames: a greedy nearest-neighbour
//! match binds each frame's detections to the persons tracked so far, and
//! everything left over enters or leaves.

mod person;
mod tracker;

pub use person::{color_for_id, Person};
pub use tracker::{Detection, PersonTracker, TrackEvent, DEFAULT_ID_RADIUS};
