//! # ARGOS Types
//!
//! Shared data types for the ARGOS presence tracking system.
//!
//! These are the types that cross crate and process boundaries: the 3D
//! vector used throughout the geometry and tracking code, the camera
//! intrinsics used for depth unprojection, and the serializable snapshots
//! of persons and trigger zones that travel over the settings and event
//! channels.

pub mod intrinsics;
pub mod person;
pub mod vec3;
pub mod zone;

pub use intrinsics::Intrinsics;
pub use person::PersonSnapshot;
pub use vec3::Vec3;
pub use zone::ZoneGeometry;
