//! Datagram transport and anti-entropy protocol engine built on top of
//! `gossip-core`'s data model. Owns the UDP socket and the single-task
//! gossip loop; holds no persisted state.

pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod gossip_loop;
pub mod seeds;

pub use config::GossipConfig;
pub use endpoint::Endpoint;
pub use error::Error;
pub use gossip_loop::GossipLoop;
pub use seeds::SeedList;
