//! Wall-clock helper shared by the data model and the gossip loop.
//!
//! All liveness bookkeeping (`alive_time`, `update_time`, `last_sync`) is
//! seconds-since-epoch, matching `time(NULL)` semantics.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
