//! In-memory index of node records plus the "active" (dialable, live)
//! subset. Grounded on `wichain-core/src/trust.rs`'s `TrustManager`
//! (`HashMap<String, Peer>` keyed table, `upsert_peer`, `retain`-based
//! staleness) and on the original `struct gossip` (hash table of
//! `gossip_node`s plus a parallel `active_gnodes` list that only ever holds
//! *references* into the same nodes).
//!
//! The active subset here is a `HashSet<String>` of `pub_id`s rather than
//! an intrusive linked list — removing a `pub_id` from it never touches
//! the owning `HashMap`, preserving the "active subset is a non-owning
//! view" invariant from spec.md §9 without unsafe intrusive pointers.

use std::collections::{HashMap, HashSet};

use rand::seq::IteratorRandom;

use crate::error::Error;
use crate::record::{MinimalDigest, NodeRecord};

/// Result of folding an inbound `MinimalDigest` into the table (spec.md
/// §4.3's ACK1 decision table, factored out so the protocol engine can
/// decide what to place in the reply).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinimalOutcome {
    /// Unknown locally, or `D.version > local.version`: ask for the full record.
    RequestFull,
    /// Equal version, incoming alive_time adopted.
    Adopted,
    /// Equal version, local alive_time was fresher: offer a correction.
    Corrected { version: i64, alive_time: i64 },
    /// `D.version < local.version`: local record should be sent in full.
    LocalWins,
    /// The digest named the table's own self-record; never acted on.
    SelfIgnored,
}

/// Result of folding an inbound `FullRecord` into the table (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FullOutcome {
    Inserted,
    Overwritten,
    AliveTimeAdopted,
    /// Equal version, incoming alive_time was not fresher: no change.
    NoChange,
    /// `R.version < local.version`: local record should be sent back.
    LocalWins,
    SelfIgnored,
}

pub struct MembershipTable {
    records: HashMap<String, NodeRecord>,
    active: HashSet<String>,
    self_id: String,
}

impl MembershipTable {
    /// Create a table seeded with the local self-record. The self-record
    /// is always present and is never evicted or placed in the active
    /// subset (a node never gossips to itself).
    pub fn new(self_record: NodeRecord) -> Self {
        let self_id = self_record.pub_id.clone();
        let mut records = HashMap::new();
        records.insert(self_id.clone(), self_record);
        Self {
            records,
            active: HashSet::new(),
            self_id,
        }
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    pub fn self_record(&self) -> &NodeRecord {
        self.records.get(&self.self_id).expect("self-record always present")
    }

    pub fn self_record_mut(&mut self) -> &mut NodeRecord {
        self.records
            .get_mut(&self.self_id)
            .expect("self-record always present")
    }

    pub fn find(&self, pub_id: &str) -> Option<&NodeRecord> {
        self.records.get(pub_id)
    }

    /// Insert a brand-new record. Fails with `Duplicate` if `pub_id` is
    /// already present.
    pub fn insert(&mut self, record: NodeRecord) -> Result<(), Error> {
        if self.records.contains_key(&record.pub_id) {
            return Err(Error::Duplicate(record.pub_id));
        }
        let pub_id = record.pub_id.clone();
        let full = record.full_node;
        self.records.insert(pub_id.clone(), record);
        if full {
            self.promote(&pub_id);
        }
        Ok(())
    }

    fn promote(&mut self, pub_id: &str) {
        if pub_id != self.self_id {
            self.active.insert(pub_id.to_owned());
        }
    }

    /// Remove a record from the active subset without deleting it.
    pub fn mark_stale(&mut self, pub_id: &str) {
        self.active.remove(pub_id);
    }

    /// Uniform-random choice from the active subset.
    pub fn random_active(&self) -> Result<&NodeRecord, Error> {
        let pub_id = self
            .active
            .iter()
            .choose(&mut rand::thread_rng())
            .ok_or(Error::Empty)?;
        Ok(self.records.get(pub_id).expect("active ids always resolve"))
    }

    /// Check `pub_id`'s liveness against `stale_horizon_secs` of `now`.
    /// Used by the gossip loop right after `random_active` picks a
    /// candidate (spec.md §7: `Stale` — "selected peer exceeded
    /// STALE_HORIZON; caller marks it stale and falls back to seeds").
    pub fn check_liveness(&self, pub_id: &str, now: i64, stale_horizon_secs: i64) -> Result<(), Error> {
        let record = self.records.get(pub_id).expect("pub_id must be present in table");
        if now - record.alive_time > stale_horizon_secs {
            Err(Error::Stale(pub_id.to_owned()))
        } else {
            Ok(())
        }
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate all records (order unspecified, stable for one traversal).
    pub fn snapshot(&self) -> impl Iterator<Item = &NodeRecord> {
        self.records.values()
    }

    /// Fold an inbound `MinimalDigest` into local state (spec.md §4.3 ACK1
    /// table). Never inserts — a digest alone carries no address or
    /// payload to create a record from.
    pub fn merge_minimal(&mut self, digest: &MinimalDigest) -> MinimalOutcome {
        if digest.pubid == self.self_id {
            return MinimalOutcome::SelfIgnored;
        }

        let Some(local) = self.records.get_mut(&digest.pubid) else {
            return MinimalOutcome::RequestFull;
        };

        if digest.version > local.version {
            MinimalOutcome::RequestFull
        } else if digest.version == local.version {
            if digest.alive_time >= local.alive_time {
                local.alive_time = digest.alive_time;
                MinimalOutcome::Adopted
            } else {
                MinimalOutcome::Corrected {
                    version: local.version,
                    alive_time: local.alive_time,
                }
            }
        } else {
            MinimalOutcome::LocalWins
        }
    }

    /// Fold an inbound `FullRecord` into local state (spec.md §4.4).
    pub fn merge_full(&mut self, incoming: &NodeRecord) -> FullOutcome {
        if incoming.pub_id == self.self_id {
            return FullOutcome::SelfIgnored;
        }

        match self.records.get_mut(&incoming.pub_id) {
            None => {
                let full = incoming.full_node;
                self.records.insert(incoming.pub_id.clone(), incoming.clone());
                if full {
                    self.promote(&incoming.pub_id);
                }
                FullOutcome::Inserted
            }
            Some(local) => {
                if incoming.version > local.version {
                    *local = incoming.clone();
                    let full = local.full_node;
                    let pub_id = incoming.pub_id.clone();
                    if full {
                        self.promote(&pub_id);
                    } else {
                        self.active.remove(&pub_id);
                    }
                    FullOutcome::Overwritten
                } else if incoming.version == local.version {
                    if incoming.alive_time > local.alive_time {
                        local.alive_time = incoming.alive_time;
                        FullOutcome::AliveTimeAdopted
                    } else {
                        FullOutcome::NoChange
                    }
                } else {
                    FullOutcome::LocalWins
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full(key: &str, ip: &str, port: u16) -> NodeRecord {
        let mut r = NodeRecord::new(key);
        r.set_full(ip, port);
        r
    }

    #[test]
    fn self_record_always_present_and_never_active() {
        let table = MembershipTable::new(NodeRecord::new("self"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.active_len(), 0);
        assert!(table.find(table.self_id()).is_some());
    }

    #[test]
    fn insert_promotes_full_nodes_to_active() {
        let mut table = MembershipTable::new(NodeRecord::new("self"));
        table.insert(full("peer", "127.0.0.1", 1000)).unwrap();
        assert_eq!(table.active_len(), 1);
        table.insert(NodeRecord::new("peer2")).unwrap(); // non-reachable
        assert_eq!(table.active_len(), 1);
    }

    #[test]
    fn insert_duplicate_fails() {
        let mut table = MembershipTable::new(NodeRecord::new("self"));
        table.insert(full("peer", "127.0.0.1", 1000)).unwrap();
        let err = table.insert(full("peer", "127.0.0.1", 1000)).unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));
    }

    #[test]
    fn mark_stale_keeps_record_but_drops_from_active() {
        let mut table = MembershipTable::new(NodeRecord::new("self"));
        let peer = full("peer", "127.0.0.1", 1000);
        let pub_id = peer.pub_id.clone();
        table.insert(peer).unwrap();
        table.mark_stale(&pub_id);
        assert_eq!(table.active_len(), 0);
        assert!(table.find(&pub_id).is_some(), "record must survive mark_stale");
    }

    #[test]
    fn random_active_errors_when_empty() {
        let table = MembershipTable::new(NodeRecord::new("self"));
        assert!(matches!(table.random_active(), Err(Error::Empty)));
    }

    #[test]
    fn check_liveness_ok_within_horizon() {
        let mut table = MembershipTable::new(NodeRecord::new("self"));
        let peer = full("peer", "127.0.0.1", 1000);
        let pub_id = peer.pub_id.clone();
        let alive_time = peer.alive_time;
        table.insert(peer).unwrap();
        assert!(table.check_liveness(&pub_id, alive_time + 599, 600).is_ok());
    }

    #[test]
    fn check_liveness_errs_stale_past_horizon() {
        // scenario S6
        let mut table = MembershipTable::new(NodeRecord::new("self"));
        let mut peer = full("peer", "127.0.0.1", 1000);
        peer.alive_time = 0;
        let pub_id = peer.pub_id.clone();
        table.insert(peer).unwrap();
        let err = table.check_liveness(&pub_id, 601, 600).unwrap_err();
        assert!(matches!(err, Error::Stale(id) if id == pub_id));
    }

    #[test]
    fn merge_minimal_requests_full_for_unknown_peer() {
        let mut table = MembershipTable::new(NodeRecord::new("self"));
        let digest = MinimalDigest { pubid: "unknown".into(), version: 1, alive_time: 1 };
        assert_eq!(table.merge_minimal(&digest), MinimalOutcome::RequestFull);
    }

    #[test]
    fn merge_minimal_adopts_fresher_alive_time() {
        // scenario S4
        let mut table = MembershipTable::new(NodeRecord::new("self"));
        let mut peer = NodeRecord::new("x");
        peer.version = 5;
        peer.alive_time = 100;
        let pub_id = peer.pub_id.clone();
        table.insert(peer).unwrap();

        let digest = MinimalDigest { pubid: pub_id.clone(), version: 5, alive_time: 120 };
        assert_eq!(table.merge_minimal(&digest), MinimalOutcome::Adopted);
        assert_eq!(table.find(&pub_id).unwrap().alive_time, 120);
    }

    #[test]
    fn merge_minimal_offers_correction_when_local_is_fresher() {
        // scenario S5
        let mut table = MembershipTable::new(NodeRecord::new("self"));
        let mut peer = NodeRecord::new("x");
        peer.version = 5;
        peer.alive_time = 120;
        let pub_id = peer.pub_id.clone();
        table.insert(peer).unwrap();

        let digest = MinimalDigest { pubid: pub_id.clone(), version: 5, alive_time: 100 };
        assert_eq!(
            table.merge_minimal(&digest),
            MinimalOutcome::Corrected { version: 5, alive_time: 120 }
        );
    }

    #[test]
    fn merge_full_overwrites_on_higher_version() {
        // scenario S3
        let mut table = MembershipTable::new(NodeRecord::new("self"));
        let mut peer = NodeRecord::new("x");
        peer.version = 3;
        peer.alive_time = 100;
        let pub_id = peer.pub_id.clone();
        table.insert(peer).unwrap();

        let mut incoming = NodeRecord::new("x");
        incoming.version = 5;
        incoming.alive_time = 80;
        incoming.payload = json!({"k": 1});

        assert_eq!(table.merge_full(&incoming), FullOutcome::Overwritten);
        let local = table.find(&pub_id).unwrap();
        assert_eq!(local.version, 5);
        assert_eq!(local.alive_time, 80);
        assert_eq!(local.payload, json!({"k": 1}));
    }

    #[test]
    fn merge_full_overwrite_drops_peer_from_active_when_no_longer_full() {
        let mut table = MembershipTable::new(NodeRecord::new("self"));
        let peer = full("peer", "127.0.0.1", 1000);
        let pub_id = peer.pub_id.clone();
        let mut incoming = peer.clone();
        table.insert(peer).unwrap();
        assert_eq!(table.active_len(), 1);

        incoming.version += 1;
        incoming.unset_full();

        assert_eq!(table.merge_full(&incoming), FullOutcome::Overwritten);
        assert_eq!(table.active_len(), 0, "peer must leave the active subset once full_node goes false");
        assert!(table.find(&pub_id).is_some(), "the record itself must survive");
    }

    #[test]
    fn merge_full_never_touches_self() {
        let mut table = MembershipTable::new(NodeRecord::new("self"));
        let self_id = table.self_id().to_owned();
        let mut forged = table.self_record().clone();
        forged.version += 100;
        assert_eq!(table.merge_full(&forged), FullOutcome::SelfIgnored);
        assert_eq!(table.find(&self_id).unwrap().version, 0);
    }

    #[test]
    fn merge_full_lower_version_loses() {
        let mut table = MembershipTable::new(NodeRecord::new("self"));
        let mut peer = NodeRecord::new("x");
        peer.version = 5;
        table.insert(peer).unwrap();

        let mut stale_incoming = NodeRecord::new("x");
        stale_incoming.version = 2;
        assert_eq!(table.merge_full(&stale_incoming), FullOutcome::LocalWins);
    }
}
