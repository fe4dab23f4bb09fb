//! Packet envelope and per-node entry shapes for the three-phase exchange.
//!
//! A packet is `{phase, gnodes}`; each `gnodes` entry is one of three
//! duck-typed shapes (spec.md §4.3, §6.5):
//!
//! - short pull request: `{pubid}`
//! - `MinimalDigest` / alive-time correction: `{pubid, version, alive_time}`
//!   (same wire shape, different meaning depending on which phase carries it)
//! - `FullRecord`: the complete `NodeRecord::to_wire()` output
//!
//! These overlap in a plain field check (a `FullRecord` is the only shape
//! carrying `pubkey`/`data`), mirroring how `json_helper.h`'s
//! `JSON_GET_STRING`/`JSON_GET_INT64` probe fields by name rather than by a
//! tagged variant.

use serde_json::{json, Value};

use crate::error::Error;
use crate::record::{MinimalDigest, NodeRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Sync = 0,
    Ack1 = 1,
    Ack2 = 2,
}

impl TryFrom<i64> for Phase {
    type Error = Error;

    fn try_from(v: i64) -> Result<Self, Error> {
        match v {
            0 => Ok(Phase::Sync),
            1 => Ok(Phase::Ack1),
            2 => Ok(Phase::Ack2),
            other => Err(Error::Malformed(format!("unknown phase {other}"))),
        }
    }
}

/// Top-level wire envelope.
#[derive(Debug, Clone)]
pub struct Packet {
    pub phase: Phase,
    pub gnodes: Vec<Value>,
}

impl Packet {
    pub fn new(phase: Phase, gnodes: Vec<Value>) -> Self {
        Self { phase, gnodes }
    }

    pub fn to_wire(&self) -> Value {
        json!({
            "phase": self.phase as i64,
            "gnodes": self.gnodes,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.to_wire()).expect("Value always serializes")
    }

    /// Parse a packet from raw bytes. Packets that fail to parse, or lack
    /// `phase`/`gnodes`, are rejected with `Malformed` so the caller can
    /// log-and-drop per spec.md §4.3.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, Error> {
        let v: Value = serde_json::from_slice(buf)
            .map_err(|e| Error::Malformed(format!("invalid json: {e}")))?;
        Self::from_wire(&v)
    }

    pub fn from_wire(v: &Value) -> Result<Self, Error> {
        let phase_num = v
            .get("phase")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Malformed("missing `phase`".into()))?;
        let phase = Phase::try_from(phase_num)?;

        let gnodes = v
            .get("gnodes")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::Malformed("missing `gnodes`".into()))?
            .clone();

        Ok(Self { phase, gnodes })
    }
}

/// One entry of a packet's `gnodes` array, classified by which fields it
/// carries.
pub enum GnodeEntry {
    /// `{pubid}` — "please send the full record".
    PullRequest { pubid: String },
    /// `{pubid, version, alive_time}` — a SYNC digest or an ACK1
    /// alive-time correction; the two are disambiguated by context
    /// (which phase/position this entry appeared in), not by shape.
    Digest(MinimalDigest),
    /// Complete record.
    Full(Box<NodeRecord>),
}

pub fn classify(v: &Value) -> Result<GnodeEntry, Error> {
    if v.get("pubkey").is_some() && v.get("data").is_some() {
        return Ok(GnodeEntry::Full(Box::new(NodeRecord::from_wire(v)?)));
    }
    if v.get("version").is_some() && v.get("alive_time").is_some() {
        let digest: MinimalDigest = serde_json::from_value(v.clone())
            .map_err(|e| Error::Malformed(format!("invalid digest: {e}")))?;
        return Ok(GnodeEntry::Digest(digest));
    }
    let pubid = v
        .get("pubid")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Malformed("gnode entry missing `pubid`".into()))?
        .to_owned();
    Ok(GnodeEntry::PullRequest { pubid })
}

pub fn digest_value(d: &MinimalDigest) -> Value {
    serde_json::to_value(d).expect("MinimalDigest always serializes")
}

pub fn pull_request_value(pubid: &str) -> Value {
    json!({ "pubid": pubid })
}

pub fn alive_time_correction_value(pubid: &str, version: i64, alive_time: i64) -> Value {
    json!({ "pubid": pubid, "version": version, "alive_time": alive_time })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NodeRecord;

    #[test]
    fn classifies_full_record() {
        let mut r = NodeRecord::new("a");
        r.set_full("1.2.3.4", 1000);
        match classify(&r.to_wire()).unwrap() {
            GnodeEntry::Full(got) => assert_eq!(got.pub_id, r.pub_id),
            _ => panic!("expected Full"),
        }
    }

    #[test]
    fn classifies_digest() {
        let d = MinimalDigest { pubid: "X".into(), version: 1, alive_time: 2 };
        match classify(&digest_value(&d)).unwrap() {
            GnodeEntry::Digest(got) => assert_eq!(got, d),
            _ => panic!("expected Digest"),
        }
    }

    #[test]
    fn classifies_pull_request() {
        match classify(&pull_request_value("X")).unwrap() {
            GnodeEntry::PullRequest { pubid } => assert_eq!(pubid, "X"),
            _ => panic!("expected PullRequest"),
        }
    }

    #[test]
    fn packet_roundtrip() {
        let d = MinimalDigest { pubid: "X".into(), version: 1, alive_time: 2 };
        let pkt = Packet::new(Phase::Sync, vec![digest_value(&d)]);
        let bytes = pkt.to_bytes();
        let back = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(back.phase, Phase::Sync);
        assert_eq!(back.gnodes.len(), 1);
    }

    #[test]
    fn unknown_phase_is_malformed() {
        let v = json!({"phase": 7, "gnodes": []});
        assert!(Packet::from_wire(&v).is_err());
    }

    #[test]
    fn missing_gnodes_is_malformed() {
        let v = json!({"phase": 0});
        assert!(Packet::from_wire(&v).is_err());
    }
}
