//! Binary entry point: parses the bind address and optional seed, builds a
//! local node, and drives the gossip loop until SIGINT/SIGQUIT.
//!
//! Mirrors `examples/original_source/src/client/demo.c`'s argument shape
//! (`<ip-or-"->:<port> [<seed>]`) and signal handling, translated onto
//! `tokio::signal` instead of a raw `signal()`/global flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rand::Rng;

use gossip_core::{MembershipTable, NodeRecord};
use gossip_net::{Endpoint, GossipConfig, GossipLoop, SeedList};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        bail!("usage: gossip-cli <bind-ip-or-\"-\">:<port> [<seed-host:port>]");
    }

    let (ip_part, port) = parse_bind_arg(&args[0])?;

    let pub_key = format!("gnode-{}", rand::thread_rng().gen_range(0..100));
    let mut self_record = NodeRecord::new(pub_key);
    if ip_part != "-" {
        self_record.set_full(ip_part, port);
    }

    let mut seeds = SeedList::new();
    if let Some(seed) = args.get(1) {
        seeds.add_str(seed).with_context(|| format!("invalid seed `{seed}`"))?;
    }

    let cfg = GossipConfig::default();
    let bind_addr = format!("0.0.0.0:{port}");
    let endpoint = Endpoint::open(&bind_addr, &cfg)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    let table = MembershipTable::new(self_record);
    let mut gossip_loop = GossipLoop::new(endpoint, table, seeds, cfg);

    let stop = Arc::new(AtomicBool::new(false));
    spawn_signal_watcher(Arc::clone(&stop));

    gossip_loop.run(|| stop.load(Ordering::Relaxed)).await;

    tracing::info!("shut down cleanly");
    Ok(())
}

/// Split `<ip-or-"->:<port>` into its two halves.
fn parse_bind_arg(arg: &str) -> Result<(String, u16)> {
    let (ip, port) = arg
        .rsplit_once(':')
        .with_context(|| format!("expected `<ip-or-\"-\">:<port>`, got `{arg}`"))?;
    let port: u16 = port
        .parse()
        .with_context(|| format!("invalid port `{port}` in `{arg}`"))?;
    Ok((ip.to_owned(), port))
}

/// Flip `stop` on SIGINT or (on unix) SIGQUIT.
fn spawn_signal_watcher(stop: Arc<AtomicBool>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut quit = match signal(SignalKind::quit()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGQUIT handler");
                    loop_on_ctrl_c(stop).await;
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = quit.recv() => {}
            }
            stop.store(true, Ordering::Relaxed);
        }
        #[cfg(not(unix))]
        {
            loop_on_ctrl_c(stop).await;
        }
    });
}

async fn loop_on_ctrl_c(stop: Arc<AtomicBool>) {
    let _ = tokio::signal::ctrl_c().await;
    stop.store(true, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bind_arg_accepts_reachable_form() {
        let (ip, port) = parse_bind_arg("127.0.0.1:25688").unwrap();
        assert_eq!(ip, "127.0.0.1");
        assert_eq!(port, 25688);
    }

    #[test]
    fn parse_bind_arg_accepts_non_reachable_form() {
        let (ip, port) = parse_bind_arg("-:25689").unwrap();
        assert_eq!(ip, "-");
        assert_eq!(port, 25689);
    }

    #[test]
    fn parse_bind_arg_rejects_missing_port() {
        assert!(parse_bind_arg("127.0.0.1").is_err());
    }
}
