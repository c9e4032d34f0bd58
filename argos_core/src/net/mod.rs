//! Network layer: discovery, settings channel, event stream, frame stream
//!
//! All connections are sensor-initiated; the controller only ever listens.
//! Discovery hands a sensor every endpoint it needs, the TCP settings
//! channel pushes configuration down, and the UDP event stream carries
//! tracking results up. Loss and reordering on the event stream are
//! expected and absorbed by sequence gating in the scene layer.

pub mod client;
pub mod discovery;
pub mod events;
pub mod protocol;
pub mod receiver;
pub mod settings;
pub mod stream;

pub use client::EventClient;
pub use discovery::{
    discover, discover_at, ControllerEndpoints, DiscoveryServer, FrameDatagram, SensorBinding,
    DEFAULT_BROADCAST_PORT,
};
pub use events::{parse_event, EventUpdate};
pub use protocol::{Arg, EventMessage};
pub use receiver::EventReceiver;
pub use settings::{Settings, SettingsPublisher, SettingsReceiver, StreamMode, MAX_IO_FAILURES};
pub use stream::{decode_frame, encode_frame, FrameKind};
