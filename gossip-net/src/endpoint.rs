//! UDP datagram endpoint: bind, best-effort send, timed receive.
//!
//! Built on `tokio::net::UdpSocket` for bind/send_to/recv_from, with
//! `recv_from` bounded by `tokio::time::timeout` rather than blocking
//! forever, so the gossip loop can interleave ticks with inbound handling
//! on one task.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::config::GossipConfig;
use crate::error::Error;

pub struct Endpoint {
    socket: UdpSocket,
    recv_buf: Vec<u8>,
    recv_timeout: std::time::Duration,
}

impl Endpoint {
    /// Bind a UDP socket at `bind_addr` (e.g. `0.0.0.0:25688`).
    pub async fn open(bind_addr: &str, cfg: &GossipConfig) -> Result<Self, Error> {
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| Error::BindFailed { addr: bind_addr.to_owned(), source })?;
        Ok(Self {
            socket,
            recv_buf: vec![0u8; cfg.recv_buf_len],
            recv_timeout: cfg.recv_timeout,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Best-effort send. Failures are returned to the caller to log and
    /// drop, never retried within the same tick.
    pub async fn send(&self, bytes: &[u8], to: SocketAddr) -> Result<usize, Error> {
        self.socket
            .send_to(bytes, to)
            .await
            .map_err(|source| Error::SendFailed { addr: to, source })
    }

    /// Wait up to the configured timeout for one datagram. Returns `None`
    /// on timeout, matching spec.md §4.5 step 1's "drain up to one packet,
    /// non-blocking recv with timeout".
    pub async fn recv(&mut self) -> std::io::Result<Option<(Vec<u8>, SocketAddr)>> {
        match timeout(self.recv_timeout, self.socket.recv_from(&mut self.recv_buf)).await {
            Ok(Ok((len, from))) => Ok(Some((self.recv_buf[..len].to_vec(), from))),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Ok(None),
        }
    }
}
