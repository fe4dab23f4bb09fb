//! Membership data model: versioned per-peer records, the in-memory table
//! that indexes them, and the wire shapes the anti-entropy protocol
//! exchanges. Owns no sockets and runs no loop — see `gossip-net` for the
//! protocol engine and gossip loop built on top of this crate.

pub mod digest;
pub mod error;
pub mod record;
pub mod table;
pub mod time;
pub mod wire;

pub use digest::derive_pub_id;
pub use error::Error;
pub use record::{MinimalDigest, NodeRecord, Payload};
pub use table::{FullOutcome, MembershipTable, MinimalOutcome};
pub use time::now_secs;
pub use wire::{GnodeEntry, Packet, Phase};
