//! Controller discovery over UDP broadcast
//!
//! Sensors find the controller by broadcasting
//! `DISCOVER_SERVER_REQUEST/<sensor name>` on the well-known broadcast
//! port. The controller answers from that port with
//! `DISCOVER_SERVER_RESPONSE/<event port>`, and the reply itself pins down
//! the rest of the contract: the source address of the response is the
//! controller, its source port doubles as the TCP settings port, and the
//! decimal suffix names the UDP port the sensor should stream events to.
//!
//! The controller's discovery socket moonlights as the debug frame-stream
//! sink: datagrams on the broadcast port that do not carry the request
//! prefix are treated as frame datagrams.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{debug, error, info, warn};

use crate::error::{ArgosError, ArgosResult};
use crate::net::stream::{decode_frame, FrameKind};

pub const DISCOVERY_REQUEST_PREFIX: &str = "DISCOVER_SERVER_REQUEST/";
pub const DISCOVERY_RESPONSE_PREFIX: &str = "DISCOVER_SERVER_RESPONSE/";
pub const DEFAULT_BROADCAST_PORT: u16 = 8888;

/// Pause between unanswered discovery broadcasts.
pub const DISCOVERY_RETRY: Duration = Duration::from_secs(5);

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);
const POLL_TIMEOUT: Duration = Duration::from_millis(200);
const MAX_DATAGRAM: usize = 65536;

/// Everything a sensor learns from one discovery response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerEndpoints {
    pub controller: IpAddr,
    /// TCP port for the settings channel (the response's source port)
    pub settings_port: u16,
    /// UDP port for the event stream
    pub event_port: u16,
}

/// A sensor that announced itself via discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorBinding {
    pub name: String,
    /// Source address of the request; its IP keys later event traffic
    pub addr: SocketAddr,
}

/// A frame datagram received on the discovery socket.
#[derive(Debug, Clone)]
pub struct FrameDatagram {
    pub src: SocketAddr,
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

/*-------------- Sensor side --------------*/

/// Broadcast for a controller until one answers or `cancel` is raised.
pub fn discover(
    name: &str,
    broadcast_port: u16,
    cancel: &AtomicBool,
) -> ArgosResult<ControllerEndpoints> {
    let target = SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), broadcast_port);
    while !cancel.load(Ordering::Relaxed) {
        match discover_at(name, target, 1) {
            Ok(endpoints) => return Ok(endpoints),
            Err(e) => info!("no controller yet ({e}), retrying in {DISCOVERY_RETRY:?}"),
        }
        // Sleep in poll-sized slices so cancellation takes effect promptly.
        let mut slept = Duration::ZERO;
        while slept < DISCOVERY_RETRY && !cancel.load(Ordering::Relaxed) {
            std::thread::sleep(POLL_TIMEOUT);
            slept += POLL_TIMEOUT;
        }
    }
    Err(ArgosError::Timeout(format!(
        "discovery of a controller for '{name}' cancelled"
    )))
}

/// Send discovery requests to an explicit target and wait for a response.
///
/// Split out from [`discover`] so tests can target loopback instead of the
/// broadcast address.
pub fn discover_at(
    name: &str,
    target: SocketAddr,
    attempts: u32,
) -> ArgosResult<ControllerEndpoints> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    socket.set_broadcast(true)?;
    socket.set_read_timeout(Some(RESPONSE_TIMEOUT))?;

    let request = format!("{DISCOVERY_REQUEST_PREFIX}{name}");
    let mut buf = vec![0u8; MAX_DATAGRAM];

    for attempt in 0..attempts {
        socket.send_to(request.as_bytes(), target)?;
        match socket.recv_from(&mut buf) {
            Ok((size, src)) => {
                let endpoints = parse_response(&buf[..size], src)?;
                info!(
                    "controller at {} (settings {}, events {})",
                    endpoints.controller, endpoints.settings_port, endpoints.event_port
                );
                return Ok(endpoints);
            }
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                debug!("discovery attempt {} timed out", attempt + 1);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(ArgosError::Timeout(format!(
        "no discovery response from {target} after {attempts} attempts"
    )))
}

fn parse_response(buf: &[u8], src: SocketAddr) -> ArgosResult<ControllerEndpoints> {
    let text = std::str::from_utf8(buf)
        .map_err(|e| ArgosError::parse(format!("discovery response not UTF-8: {e}")))?;
    let suffix = text.strip_prefix(DISCOVERY_RESPONSE_PREFIX).ok_or_else(|| {
        ArgosError::parse(format!("unexpected discovery response '{text}' from {src}"))
    })?;
    let event_port: u16 = suffix
        .parse()
        .map_err(|e| ArgosError::parse(format!("bad event port '{suffix}': {e}")))?;
    Ok(ControllerEndpoints {
        controller: src.ip(),
        settings_port: src.port(),
        event_port,
    })
}

/*-------------- Controller side --------------*/

/// Background responder on the broadcast port.
///
/// Answers discovery requests with the event port (broadcast port + 1),
/// reports each requesting sensor on the bindings channel, and forwards
/// frame datagrams arriving on the same socket.
pub struct DiscoveryServer {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    port: u16,
}

impl DiscoveryServer {
    pub fn start(
        port: u16,
        bindings: Sender<SensorBinding>,
        frames: Sender<FrameDatagram>,
    ) -> ArgosResult<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        socket.set_read_timeout(Some(POLL_TIMEOUT))?;
        let running = Arc::new(AtomicBool::new(true));

        let flag = Arc::clone(&running);
        let event_port = port + 1;
        let handle = std::thread::spawn(move || {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            while flag.load(Ordering::Relaxed) {
                match socket.recv_from(&mut buf) {
                    Ok((size, src)) => {
                        handle_datagram(&socket, &buf[..size], src, event_port, &bindings, &frames)
                    }
                    Err(ref e)
                        if e.kind() == std::io::ErrorKind::WouldBlock
                            || e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) => {
                        error!("discovery recv error: {e}");
                        std::thread::sleep(Duration::from_millis(10));
                    }
                }
            }
        });

        info!("discovery server on port {port}, announcing event port {event_port}");
        Ok(Self {
            running,
            handle: Some(handle),
            port,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DiscoveryServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_datagram(
    socket: &UdpSocket,
    buf: &[u8],
    src: SocketAddr,
    event_port: u16,
    bindings: &Sender<SensorBinding>,
    frames: &Sender<FrameDatagram>,
) {
    if let Some(name) = buf
        .strip_prefix(DISCOVERY_REQUEST_PREFIX.as_bytes())
        .and_then(|n| std::str::from_utf8(n).ok())
    {
        let response = format!("{DISCOVERY_RESPONSE_PREFIX}{event_port}");
        if let Err(e) = socket.send_to(response.as_bytes(), src) {
            warn!("failed to answer discovery from {src}: {e}");
            return;
        }
        debug!("discovery request from '{name}' at {src}");
        let _ = bindings.send(SensorBinding {
            name: name.to_string(),
            addr: src,
        });
        return;
    }

    match decode_frame(buf) {
        Ok((kind, payload)) => {
            let _ = frames.send(FrameDatagram {
                src,
                kind,
                payload: payload.to_vec(),
            });
        }
        Err(e) => warn!("unrecognized datagram from {src}: {e}"),
    }
}
