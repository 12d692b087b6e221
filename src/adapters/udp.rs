//! UDP telemetry transport.
//!
//! One connected socket shared by every sampling thread.  The socket
//! sits behind a mutex so concurrent sends go out one whole datagram at
//! a time.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Mutex, PoisonError};

use log::info;

use crate::app::ports::DatagramSink;
use crate::error::CommsError;

pub struct UdpTelemetrySink {
    socket: Mutex<UdpSocket>,
    peer: SocketAddr,
}

impl UdpTelemetrySink {
    /// Bind an ephemeral local port and connect it to `address:port`.
    pub fn connect(address: &str, port: u16) -> Result<Self, CommsError> {
        let peer = (address, port)
            .to_socket_addrs()
            .map_err(|e| CommsError::BindFailed(format!("{address}:{port}: {e}")))?
            .next()
            .ok_or_else(|| CommsError::BindFailed(format!("{address}:{port}: no address")))?;

        let local: SocketAddr = if peer.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).map_err(|e| CommsError::BindFailed(e.to_string()))?;
        socket
            .connect(peer)
            .map_err(|e| CommsError::BindFailed(format!("connect {peer}: {e}")))?;

        info!("Telemetry -> udp://{peer}");
        Ok(Self {
            socket: Mutex::new(socket),
            peer,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl DatagramSink for UdpTelemetrySink {
    fn send(&self, frame: &[u8]) -> Result<(), CommsError> {
        let socket = self.socket.lock().unwrap_or_else(PoisonError::into_inner);
        let sent = socket
            .send(frame)
            .map_err(|e| CommsError::SendFailed(e.to_string()))?;
        if sent != frame.len() {
            return Err(CommsError::ShortWrite {
                sent,
                expected: frame.len(),
            });
        }
        Ok(())
    }
}
