//! Cross-sensor identity and the controller's world model
//!
//! Sensors report persons under small recycled local ids. The scene layer
//! owns the translation to stable global ids, the merged view of persons
//! and zones per physical space, and the staleness gating that keeps that
//! view convergent when the event stream reorders or drops messages.

mod registry;
#[allow(clippy::module_inception)]
mod scene;

pub use registry::SceneRegistry;
pub use scene::Scene;
