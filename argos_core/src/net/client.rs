//! Event-stream sender (sensor side)

use std::net::{SocketAddr, UdpSocket};

use log::{info, warn};

use crate::error::{ArgosError, ArgosResult};
use crate::net::protocol::EventMessage;
use crate::net::settings::MAX_IO_FAILURES;

/// UDP sender for the event stream, one per controller connection.
///
/// An explicit handle, created after discovery and dropped on connection
/// loss; nothing is sent before discovery has named a target. Send
/// failures accumulate like the settings channel's: after
/// [`MAX_IO_FAILURES`] in a row the client reports
/// [`ArgosError::ConnectionLost`] and the caller goes back to discovery.
pub struct EventClient {
    socket: UdpSocket,
    target: SocketAddr,
    buf: Vec<u8>,
    failures: u32,
}

impl EventClient {
    pub fn connect(target: SocketAddr) -> ArgosResult<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        info!("event stream to {target}");
        Ok(Self {
            socket,
            target,
            buf: Vec::with_capacity(1500),
            failures: 0,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn send(&mut self, msg: &EventMessage) -> ArgosResult<()> {
        msg.encode(&mut self.buf);
        match self.socket.send_to(&self.buf, self.target) {
            Ok(_) => {
                self.failures = 0;
                Ok(())
            }
            Err(e) => {
                self.failures += 1;
                warn!(
                    "event send to {} failed ({}/{MAX_IO_FAILURES}): {e}",
                    self.target, self.failures
                );
                if self.failures >= MAX_IO_FAILURES {
                    Err(ArgosError::ConnectionLost(format!(
                        "event stream to {} gave up",
                        self.target
                    )))
                } else {
                    Err(e.into())
                }
            }
        }
    }
}
