//! Anti-entropy engine: build SYNC packets and fold ACK1/ACK2 replies.
//!
//! Pure functions over `MembershipTable` — no socket, no timing. Grounded on
//! the merge primitives in `gossip_core::table` (`merge_minimal`/`merge_full`
//! already encode the per-entry decision tables; this module only decides
//! what each outcome means for the *reply* packet).

use std::collections::HashSet;

use rand::Rng;

use gossip_core::record::NodeRecord;
use gossip_core::wire::{self, GnodeEntry};
use gossip_core::{FullOutcome, MembershipTable, MinimalDigest, MinimalOutcome, Packet, Phase};

/// Build a SYNC packet: the sender's own digest (always first), the named
/// target's digest (second, when targeting a known peer — omitted for seed
/// fallback), then up to `sync_count` digests of other records chosen by
/// uniform sampling without replacement.
pub fn build_sync(table: &MembershipTable, target: Option<&str>, sync_count: usize) -> Packet {
    let mut gnodes = vec![wire::digest_value(&MinimalDigest::from(table.self_record()))];

    let mut excluded: HashSet<&str> = HashSet::new();
    excluded.insert(table.self_id());

    if let Some(target_id) = target {
        if let Some(record) = table.find(target_id) {
            gnodes.push(wire::digest_value(&MinimalDigest::from(record)));
            excluded.insert(target_id);
        }
    }

    let candidates: Vec<&NodeRecord> = table
        .snapshot()
        .filter(|r| !excluded.contains(r.pub_id.as_str()))
        .collect();

    for record in sample_uniform(&candidates, sync_count) {
        gnodes.push(wire::digest_value(&MinimalDigest::from(record)));
    }

    Packet::new(Phase::Sync, gnodes)
}

/// Knuth selection sampling ("Algorithm S"): scan candidates once, include
/// each iff `random_uniform_int(nr_left) < remaining_needed`, decrementing
/// `nr_left` every iteration and `remaining_needed` only on inclusion.
/// Produces a uniformly random subset of size `min(candidates.len(), k)`.
fn sample_uniform<'a>(candidates: &[&'a NodeRecord], k: usize) -> Vec<&'a NodeRecord> {
    let mut rng = rand::thread_rng();
    let mut nr_left = candidates.len();
    let mut need = k.min(nr_left);
    let mut picked = Vec::with_capacity(need);

    for candidate in candidates {
        if need == 0 {
            break;
        }
        if rng.gen_range(0..nr_left) < need {
            picked.push(*candidate);
            need -= 1;
        }
        nr_left -= 1;
    }
    picked
}

/// Fold an inbound SYNC into ACK1 (spec.md §4.3's ACK1 decision table). The
/// responder appends its own FullRecord when no entry in the SYNC named its
/// own `pub_id` — the initiator omits the target digest on seed fallback,
/// so a first-contact responder would otherwise stay unknown to it.
pub fn handle_sync(table: &mut MembershipTable, pkt: &Packet) -> Packet {
    let mut out = Vec::new();
    let mut named_self = false;

    for entry in &pkt.gnodes {
        let Ok(digest) = serde_json::from_value::<MinimalDigest>(entry.clone()) else {
            continue;
        };
        if digest.pubid == table.self_id() {
            named_self = true;
        }
        match table.merge_minimal(&digest) {
            MinimalOutcome::RequestFull => out.push(wire::pull_request_value(&digest.pubid)),
            MinimalOutcome::Adopted | MinimalOutcome::SelfIgnored => {}
            MinimalOutcome::Corrected { version, alive_time } => {
                out.push(wire::alive_time_correction_value(&digest.pubid, version, alive_time))
            }
            MinimalOutcome::LocalWins => {
                if let Some(local) = table.find(&digest.pubid) {
                    out.push(local.to_wire());
                }
            }
        }
    }

    if !named_self {
        out.push(table.self_record().to_wire());
    }

    Packet::new(Phase::Ack1, out)
}

/// Fold an inbound ACK1 into ACK2 (spec.md §4.3). A bare pull request names
/// a record the responder wants in full; since the initiator is the one who
/// originated the corresponding SYNC digest, it already holds that record
/// locally and attaches it here — this crate's reading of "it has no full
/// record to offer yet" as applying only to genuinely unknown/stale-digest
/// cases, not the common request-acknowledgment path (see DESIGN.md).
pub fn handle_ack1(table: &mut MembershipTable, pkt: &Packet) -> Packet {
    let mut out = Vec::new();

    for entry in &pkt.gnodes {
        let Ok(classified) = wire::classify(entry) else {
            continue;
        };
        match classified {
            GnodeEntry::PullRequest { pubid } => {
                if let Some(local) = table.find(&pubid) {
                    out.push(local.to_wire());
                }
            }
            GnodeEntry::Digest(correction) => match table.merge_minimal(&correction) {
                MinimalOutcome::LocalWins | MinimalOutcome::Corrected { .. } => {
                    if let Some(local) = table.find(&correction.pubid) {
                        out.push(local.to_wire());
                    }
                }
                MinimalOutcome::Adopted | MinimalOutcome::SelfIgnored | MinimalOutcome::RequestFull => {}
            },
            GnodeEntry::Full(record) => {
                if let FullOutcome::LocalWins = table.merge_full(&record) {
                    if let Some(local) = table.find(&record.pub_id) {
                        out.push(local.to_wire());
                    }
                }
            }
        }
    }

    Packet::new(Phase::Ack2, out)
}

/// Fold an inbound ACK2, the exchange's terminal step. Only FullRecord
/// entries are expected; anything else is ignored rather than rejected,
/// since a well-behaved peer never places other shapes here.
pub fn handle_ack2(table: &mut MembershipTable, pkt: &Packet) {
    for entry in &pkt.gnodes {
        if let Ok(GnodeEntry::Full(record)) = wire::classify(entry) {
            let _ = table.merge_full(&record);
        }
    }
}
