//! Event-stream receiver (controller side)

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use log::{error, info, warn};

use crate::error::ArgosResult;
use crate::net::events::{parse_event, EventUpdate};
use crate::net::protocol::EventMessage;

const POLL_TIMEOUT: Duration = Duration::from_millis(200);
const MAX_DATAGRAM: usize = 65536;

/// Background receiver for the event stream.
///
/// Decodes and parses every datagram off the socket thread and hands
/// `(source, update)` pairs over a channel; malformed datagrams are logged
/// and dropped. The source address is what ties an update back to a
/// sensor binding.
pub struct EventReceiver {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    updates: Receiver<(SocketAddr, EventUpdate)>,
    port: u16,
}

impl EventReceiver {
    pub fn bind(port: u16) -> ArgosResult<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        socket.set_read_timeout(Some(POLL_TIMEOUT))?;
        let port = socket.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = unbounded();

        let flag = Arc::clone(&running);
        let handle = std::thread::spawn(move || {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            while flag.load(Ordering::Relaxed) {
                match socket.recv_from(&mut buf) {
                    Ok((size, src)) => {
                        let update = EventMessage::decode(&buf[..size])
                            .and_then(|msg| parse_event(&msg));
                        match update {
                            Ok(update) => {
                                if tx.send((src, update)).is_err() {
                                    // Receiver dropped; nobody is listening.
                                    break;
                                }
                            }
                            Err(e) => warn!("bad event datagram from {src}: {e}"),
                        }
                    }
                    Err(ref e)
                        if e.kind() == std::io::ErrorKind::WouldBlock
                            || e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) => {
                        error!("event recv error: {e}");
                        std::thread::sleep(Duration::from_millis(10));
                    }
                }
            }
        });

        info!("event receiver on port {port}");
        Ok(Self {
            running,
            handle: Some(handle),
            updates: rx,
            port,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Channel of parsed updates with their source addresses.
    pub fn updates(&self) -> &Receiver<(SocketAddr, EventUpdate)> {
        &self.updates
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EventReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::client::EventClient;
    use crate::net::events::person_left_message;

    #[test]
    fn test_receives_parsed_updates() {
        let mut receiver = EventReceiver::bind(0).unwrap();
        let target: SocketAddr = format!("127.0.0.1:{}", receiver.port()).parse().unwrap();
        let mut client = EventClient::connect(target).unwrap();

        client.send(&person_left_message(6)).unwrap();
        let (_, update) = receiver
            .updates()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert_eq!(update, EventUpdate::PersonLeft { local_id: 6 });
        receiver.stop();
    }

    #[test]
    fn test_garbage_is_dropped_not_fatal() {
        let mut receiver = EventReceiver::bind(0).unwrap();
        let target = format!("127.0.0.1:{}", receiver.port());
        let socket = UdpSocket::bind(("127.0.0.1", 0)).unwrap();
        socket.send_to(b"not a message", &target).unwrap();

        // The receiver survives and keeps parsing what follows.
        let mut client = EventClient::connect(target.parse().unwrap()).unwrap();
        client.send(&person_left_message(1)).unwrap();
        let (_, update) = receiver
            .updates()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert_eq!(update, EventUpdate::PersonLeft { local_id: 1 });
        receiver.stop();
    }
}
