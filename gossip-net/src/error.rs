use std::net::SocketAddr;

use thiserror::Error;

/// Errors raised by the datagram endpoint and the gossip loop built on it.
///
/// `BindFailed` is the only fatal variant — everything else is steady-state
/// and absorbed by the loop (see `GossipLoop::tick`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to bind udp socket on {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("send to {addr} failed: {source}")]
    SendFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed address `{0}`")]
    BadSeed(String),

    #[error(transparent)]
    Core(#[from] gossip_core::Error),
}
