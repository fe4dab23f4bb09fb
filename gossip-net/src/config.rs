//! Tunable gossip parameters, defaults carried from the reference
//! `gsp_udp_info` constants; no persisted configuration exists (there is
//! nothing to load from disk), so this is a plain constructor-supplied
//! builder rather than a config-file layer.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 25688;
pub const STALL_SECS: u64 = 10;
pub const STALE_HORIZON_SECS: i64 = 600;
pub const SYNC_COUNT: usize = 6;
pub const RECV_BUF_LEN: usize = 64 * 1024;
pub const RECV_TIMEOUT_MS: u64 = 100;

/// Tunables for one `GossipLoop`. Construct with `GossipConfig::default()`
/// and override individual fields, instead of reaching for a global
/// config object.
#[derive(Debug, Clone)]
pub struct GossipConfig {
    pub stall: Duration,
    pub stale_horizon_secs: i64,
    pub sync_count: usize,
    pub recv_buf_len: usize,
    pub recv_timeout: Duration,
}

impl GossipConfig {
    pub fn tick_interval(&self) -> Duration {
        self.stall / 2
    }
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            stall: Duration::from_secs(STALL_SECS),
            stale_horizon_secs: STALE_HORIZON_SECS,
            sync_count: SYNC_COUNT,
            recv_buf_len: RECV_BUF_LEN,
            recv_timeout: Duration::from_millis(RECV_TIMEOUT_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_interval_is_half_stall() {
        let cfg = GossipConfig::default();
        assert_eq!(cfg.tick_interval(), Duration::from_secs(5));
    }
}
