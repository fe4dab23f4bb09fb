//! Per-peer membership state: identity, liveness, address, opaque payload.
//!
//! Mirrors `struct gossip_node`'s field layout: the same
//! scalar fields, the same `data` catch-all for application payload, and
//! the same two compact wire shapes (`MinimalDigest` for SYNC bodies,
//! `FullRecord` for anything the peer must learn in full).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::digest::derive_pub_id;
use crate::error::Error;
use crate::time::now_secs;

/// Opaque application payload. Treated as an arbitrary JSON tree — never
/// interpreted by the membership layer itself.
pub type Payload = Value;

/// A single peer's versioned membership state.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub pub_key: String,
    pub pub_id: String,
    pub full_node: bool,
    pub public_ip: String,
    pub public_port: u16,
    pub version: i64,
    pub alive_time: i64,
    pub update_time: i64,
    pub payload: Payload,
}

impl NodeRecord {
    /// Create a fresh, non-reachable record for `pub_key`.
    pub fn new(pub_key: impl Into<String>) -> Self {
        let pub_key = pub_key.into();
        let pub_id = derive_pub_id(&pub_key);
        let t = now_secs();
        Self {
            pub_key,
            pub_id,
            full_node: false,
            public_ip: String::new(),
            public_port: 0,
            version: 0,
            alive_time: t,
            update_time: t,
            payload: json!({}),
        }
    }

    /// Mark this record reachable at `(ip, port)`. No-op when the address
    /// is unchanged (idempotent per spec).
    pub fn set_full(&mut self, ip: impl Into<String>, port: u16) {
        let ip = ip.into();
        if self.full_node && self.public_ip == ip && self.public_port == port {
            return;
        }
        self.full_node = true;
        self.public_ip = ip;
        self.public_port = port;
        self.bump();
    }

    /// Clear the reachable flag and address.
    pub fn unset_full(&mut self) {
        if !self.full_node {
            return;
        }
        self.full_node = false;
        self.public_ip.clear();
        self.public_port = 0;
        self.bump();
    }

    /// Replace the opaque payload. No-op when unchanged.
    pub fn set_payload(&mut self, payload: Payload) {
        if self.payload == payload {
            return;
        }
        self.payload = payload;
        self.bump();
    }

    /// Refresh this node's own liveness timestamp. Called once per tick by
    /// the gossip loop on the self-record.
    pub fn touch_alive(&mut self) {
        self.alive_time = now_secs();
    }

    fn bump(&mut self) {
        self.version += 1;
        self.update_time = now_secs();
    }

    /// A reachable record has a non-empty address; conversely a record with
    /// `full_node = false` must never be dialed.
    pub fn is_dialable(&self) -> bool {
        self.full_node && !self.public_ip.is_empty() && self.public_port != 0
    }

    /// Produce this record's wire form: all scalar attributes plus the
    /// nested payload, under the field names in spec.md §6.5.
    pub fn to_wire(&self) -> Value {
        json!({
            "full_node": if self.full_node { 1 } else { 0 },
            "public_ipaddr": self.public_ip,
            "public_port": self.public_port,
            "pubkey": self.pub_key,
            "pubid": self.pub_id,
            "version": self.version,
            "alive_time": self.alive_time,
            "update_time": self.update_time,
            "data": self.payload,
        })
    }

    /// Parse and validate a wire object into a fresh record.
    pub fn from_wire(obj: &Value) -> Result<Self, Error> {
        let pub_key = field_str(obj, "pubkey")?;
        let pub_id = field_str(obj, "pubid")?;
        let full_node = field_int(obj, "full_node")? != 0;
        let public_ip = field_str(obj, "public_ipaddr")?;
        let public_port = field_int(obj, "public_port")? as u16;
        let version = field_i64(obj, "version")?;
        let alive_time = field_i64(obj, "alive_time")?;
        let update_time = field_i64(obj, "update_time")?;
        let payload = obj.get("data").cloned().unwrap_or_else(|| json!({}));

        Ok(Self {
            pub_key,
            pub_id,
            full_node,
            public_ip,
            public_port,
            version,
            alive_time,
            update_time,
            payload,
        })
    }

    /// Overwrite scalar attributes and payload from a wire object in place.
    /// `pub_key`/`pub_id` are left untouched — they identify the record,
    /// not its content.
    pub fn update_from_wire(&mut self, obj: &Value) -> Result<(), Error> {
        self.full_node = field_int(obj, "full_node")? != 0;
        self.public_ip = field_str(obj, "public_ipaddr")?;
        self.public_port = field_int(obj, "public_port")? as u16;
        self.version = field_i64(obj, "version")?;
        self.alive_time = field_i64(obj, "alive_time")?;
        self.update_time = field_i64(obj, "update_time")?;
        self.payload = obj.get("data").cloned().unwrap_or_else(|| json!({}));
        Ok(())
    }
}

fn field_str(obj: &Value, name: &str) -> Result<String, Error> {
    obj.get(name)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| Error::Malformed(format!("missing/non-string field `{name}`")))
}

fn field_i64(obj: &Value, name: &str) -> Result<i64, Error> {
    obj.get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::Malformed(format!("missing/non-integer field `{name}`")))
}

fn field_int(obj: &Value, name: &str) -> Result<i64, Error> {
    field_i64(obj, name)
}

/// Compact digest of a record, used in SYNC request bodies:
/// `(pub_id, version, alive_time)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinimalDigest {
    pub pubid: String,
    pub version: i64,
    pub alive_time: i64,
}

impl From<&NodeRecord> for MinimalDigest {
    fn from(r: &NodeRecord) -> Self {
        Self {
            pubid: r.pub_id.clone(),
            version: r.version,
            alive_time: r.alive_time,
        }
    }
}
