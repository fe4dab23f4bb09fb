//! Deterministic peer-id derivation.
//!
//! `pub_id` must be stable for the life of a record and reproducible by any
//! peer that only knows `pub_key`. Hashes
//! `pub_key` together with its NUL terminator (`strlen(pubkey) + 1` bytes
//! passed to `do_sha1`); we match that exactly so ids derived here agree
//! with a peer running the C implementation.

use sha1::{Digest, Sha1};

/// SHA-1 of `pub_key || 0x00`, rendered as 40 uppercase hex characters.
pub fn derive_pub_id(pub_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(pub_key.as_bytes());
    hasher.update([0u8]);
    let digest = hasher.finalize();

    let mut out = String::with_capacity(40);
    for byte in digest {
        out.push_str(&format!("{byte:02X}"));
    }
    out
}
