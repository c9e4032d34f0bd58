//! Settings channel
//!
//! The controller owns all configuration; sensors hold none of it across
//! restarts. After discovery a sensor opens a TCP connection to the
//! controller's settings port and receives the full [`Settings`] document
//! whenever anything changes. Each document is a 4-byte little-endian
//! length prefix followed by a bincode payload.
//!
//! The sensor side counts consecutive I/O failures; once they cross
//! [`MAX_IO_FAILURES`] the connection is declared lost and the caller is
//! expected to go back to discovery.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use argos_types::ZoneGeometry;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ArgosError, ArgosResult};

/// Consecutive I/O failures before the settings link counts as lost.
pub const MAX_IO_FAILURES: u32 = 5;

/// Upper bound on one settings document; anything larger is corruption.
const MAX_SETTINGS_BYTES: u32 = 16 * 1024 * 1024;

const POLL_TIMEOUT: Duration = Duration::from_millis(200);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Which debug frame stream a sensor should send, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StreamMode {
    #[default]
    None,
    Mask,
    PointCloud,
}

/// The full sensor configuration, pushed controller-to-sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Person tracking on/off
    pub tracking: bool,
    /// One-shot background recalibration request
    pub run_calibration: bool,
    /// Segmentation threshold, sensor-specific units
    pub threshold: u8,
    /// Silhouettes with fewer contour points are ignored
    pub min_silhouette_size: u32,
    pub stream_mode: StreamMode,
    pub zones: Vec<ZoneGeometry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tracking: true,
            run_calibration: false,
            threshold: 100,
            min_silhouette_size: 50,
            stream_mode: StreamMode::None,
            zones: Vec::new(),
        }
    }
}

/// Write one length-prefixed settings document.
pub fn write_settings<W: Write>(writer: &mut W, settings: &Settings) -> ArgosResult<()> {
    let payload = bincode::serialize(settings)
        .map_err(|e| ArgosError::Serialization(format!("settings encode: {e}")))?;
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one length-prefixed settings document.
pub fn read_settings<R: Read>(reader: &mut R) -> ArgosResult<Settings> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes);
    if len > MAX_SETTINGS_BYTES {
        return Err(ArgosError::parse(format!(
            "settings document of {len} bytes exceeds limit"
        )));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    bincode::deserialize(&payload)
        .map_err(|e| ArgosError::Serialization(format!("settings decode: {e}")))
}

/*-------------- Sensor side --------------*/

/// The sensor's end of the settings channel.
///
/// Reads are buffered across polls: a document whose bytes straddle a
/// poll-timeout boundary keeps its partial prefix/payload in `pending`
/// and completes on a later poll, so slow writers never desync the
/// length-prefixed framing.
pub struct SettingsReceiver {
    stream: TcpStream,
    failures: u32,
    pending: Vec<u8>,
}

impl SettingsReceiver {
    pub fn connect(addr: SocketAddr) -> ArgosResult<Self> {
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
        stream.set_read_timeout(Some(POLL_TIMEOUT))?;
        info!("settings channel connected to {addr}");
        Ok(Self {
            stream,
            failures: 0,
            pending: Vec::new(),
        })
    }

    /// Try to read one settings document.
    ///
    /// Returns `Ok(None)` when no complete document is in hand yet; bytes
    /// received so far stay buffered for the next poll. Hard I/O errors
    /// and EOF accumulate; after [`MAX_IO_FAILURES`] in a row this returns
    /// [`ArgosError::ConnectionLost`] and the receiver is dead. A corrupt
    /// frame (oversized length, undecodable payload) is connection loss
    /// immediately, since the stream position can no longer be trusted.
    pub fn poll(&mut self) -> ArgosResult<Option<Settings>> {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(settings) = self.extract_frame()? {
                self.failures = 0;
                return Ok(Some(settings));
            }
            match self.stream.read(&mut chunk) {
                Ok(0) => return self.count_failure("peer closed the settings channel"),
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    return Ok(None);
                }
                Err(e) => return self.count_failure(&format!("settings read failed: {e}")),
            }
        }
    }

    /// Decode one document out of the pending buffer, if complete.
    fn extract_frame(&mut self) -> ArgosResult<Option<Settings>> {
        if self.pending.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_le_bytes([
            self.pending[0],
            self.pending[1],
            self.pending[2],
            self.pending[3],
        ]);
        if len > MAX_SETTINGS_BYTES {
            return Err(ArgosError::ConnectionLost(format!(
                "settings framing corrupt: {len}-byte document announced"
            )));
        }
        let total = 4 + len as usize;
        if self.pending.len() < total {
            return Ok(None);
        }
        let frame: Vec<u8> = self.pending.drain(..total).collect();
        let settings = bincode::deserialize(&frame[4..]).map_err(|e| {
            ArgosError::ConnectionLost(format!("settings framing corrupt: {e}"))
        })?;
        Ok(Some(settings))
    }

    fn count_failure(&mut self, what: &str) -> ArgosResult<Option<Settings>> {
        self.failures += 1;
        warn!("{what} ({}/{MAX_IO_FAILURES})", self.failures);
        if self.failures >= MAX_IO_FAILURES {
            Err(ArgosError::ConnectionLost(
                "settings channel gave up".to_string(),
            ))
        } else {
            Ok(None)
        }
    }
}

/*-------------- Controller side --------------*/

/// The controller's end: accepts sensor connections and pushes the full
/// settings document to every connected sensor on change.
///
/// The publisher holds the current document and serializes it to every
/// sensor the moment it connects; a sensor joining long after the zones
/// were configured starts from the same state as everyone else.
pub struct SettingsPublisher {
    listener: TcpListener,
    clients: Vec<(SocketAddr, TcpStream)>,
    current: Settings,
}

impl SettingsPublisher {
    pub fn bind(port: u16) -> ArgosResult<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            clients: Vec::new(),
            current: Settings::default(),
        })
    }

    pub fn current(&self) -> &Settings {
        &self.current
    }

    pub fn local_port(&self) -> ArgosResult<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Accept any pending connections, sending each one the current
    /// settings document. Returns how many were added.
    pub fn accept_pending(&mut self) -> usize {
        let mut added = 0;
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    if let Err(e) = write_settings(&mut stream, &self.current) {
                        warn!("dropping settings client {addr} at connect: {e}");
                        continue;
                    }
                    info!("sensor settings connection from {addr}");
                    self.clients.push((addr, stream));
                    added += 1;
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("settings accept failed: {e}");
                    break;
                }
            }
        }
        added
    }

    /// Adopt a settings document and push it to every connected sensor,
    /// dropping dead connections. Returns how many sensors were reached.
    pub fn push(&mut self, settings: &Settings) -> usize {
        self.current = settings.clone();
        let mut alive = Vec::with_capacity(self.clients.len());
        let mut reached = 0;
        for (addr, mut stream) in self.clients.drain(..) {
            match write_settings(&mut stream, settings) {
                Ok(()) => {
                    reached += 1;
                    alive.push((addr, stream));
                }
                Err(e) => {
                    debug!("dropping settings client {addr}: {e}");
                }
            }
        }
        self.clients = alive;
        reached
    }
}
