//! The periodic gossip loop: spec.md §4.5's single-task driver. One task
//! owns both the inbound receive path and the outbound tick so the
//! membership table never needs a lock — unlike the teacher's
//! `wichain_network::NetworkNode`, which spawns a receiver task and a
//! broadcast task side by side behind `Arc<Mutex<HashMap>>`. Here a single
//! `tick()` drains at most one inbound datagram, then (if due) refreshes
//! self-liveness and sends a SYNC, so no two control paths ever touch the
//! table at once.

use std::net::SocketAddr;

use gossip_core::record::NodeRecord;
use gossip_core::time::now_secs;
use gossip_core::{MembershipTable, Packet, Phase};
use tracing::{debug, warn};

use crate::config::GossipConfig;
use crate::endpoint::Endpoint;
use crate::engine::{build_sync, handle_ack1, handle_ack2, handle_sync};
use crate::seeds::SeedList;

pub struct GossipLoop {
    endpoint: Endpoint,
    table: MembershipTable,
    seeds: SeedList,
    cfg: GossipConfig,
    last_sync: i64,
}

impl GossipLoop {
    pub fn new(endpoint: Endpoint, table: MembershipTable, seeds: SeedList, cfg: GossipConfig) -> Self {
        Self { endpoint, table, seeds, cfg, last_sync: 0 }
    }

    pub fn table(&self) -> &MembershipTable {
        &self.table
    }

    /// Run ticks until `stop` returns true. Checked once per tick; the
    /// in-flight `recv` inside each tick is bounded by the configured
    /// timeout, so shutdown latency is at most one timeout interval.
    pub async fn run(&mut self, mut stop: impl FnMut() -> bool) {
        loop {
            self.tick().await;
            if stop() {
                break;
            }
        }
    }

    pub async fn tick(&mut self) {
        self.drain_one_inbound().await;

        let now = now_secs();
        if now - self.last_sync < self.cfg.tick_interval().as_secs() as i64 {
            return;
        }

        self.table.self_record_mut().touch_alive();

        let mut also_seed = self.table.active_len() == 0;

        if self.table.active_len() > 0 {
            match self.table.random_active() {
                Ok(peer) => {
                    let peer_id = peer.pub_id.clone();
                    match self.table.check_liveness(&peer_id, now, self.cfg.stale_horizon_secs) {
                        Err(gossip_core::Error::Stale(stale_id)) => {
                            debug!(peer = %stale_id, "peer exceeded stale horizon, evicting from active subset");
                            self.table.mark_stale(&stale_id);
                            also_seed = true;
                        }
                        Err(_) => also_seed = true,
                        Ok(()) => match peer_addr(peer) {
                            Some(addr) => {
                                if self.seeds.contains(&addr) {
                                    also_seed = true;
                                }
                                let sync = build_sync(&self.table, Some(&peer_id), self.cfg.sync_count);
                                if let Err(e) = self.endpoint.send(&sync.to_bytes(), addr).await {
                                    warn!(peer = %peer_id, error = %e, "sync send failed");
                                }
                            }
                            None => also_seed = true,
                        },
                    }
                }
                Err(_) => also_seed = true,
            }
        }

        if also_seed {
            if let Some(addr) = self.seeds.random() {
                let sync = build_sync(&self.table, None, self.cfg.sync_count);
                if let Err(e) = self.endpoint.send(&sync.to_bytes(), addr).await {
                    warn!(%addr, error = %e, "seed sync send failed");
                }
            }
        }

        self.last_sync = now;
    }

    async fn drain_one_inbound(&mut self) {
        match self.endpoint.recv().await {
            Ok(Some((bytes, from))) => self.dispatch(&bytes, from).await,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "datagram recv error"),
        }
    }

    async fn dispatch(&mut self, bytes: &[u8], from: SocketAddr) {
        let pkt = match Packet::from_bytes(bytes) {
            Ok(p) => p,
            Err(e) => {
                warn!(%from, error = %e, "dropping malformed packet");
                return;
            }
        };

        match pkt.phase {
            Phase::Sync => {
                let ack1 = handle_sync(&mut self.table, &pkt);
                if let Err(e) = self.endpoint.send(&ack1.to_bytes(), from).await {
                    warn!(%from, error = %e, "ack1 send failed");
                }
            }
            Phase::Ack1 => {
                let ack2 = handle_ack1(&mut self.table, &pkt);
                if let Err(e) = self.endpoint.send(&ack2.to_bytes(), from).await {
                    warn!(%from, error = %e, "ack2 send failed");
                }
            }
            Phase::Ack2 => {
                handle_ack2(&mut self.table, &pkt);
            }
        }
    }
}

fn peer_addr(record: &NodeRecord) -> Option<SocketAddr> {
    if !record.is_dialable() {
        return None;
    }
    format!("{}:{}", record.public_ip, record.public_port).parse().ok()
}
