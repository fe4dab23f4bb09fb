//! Static bootstrap addresses, used only when the active subset yields no
//! gossip target.

use std::net::SocketAddr;

use rand::seq::SliceRandom;

use crate::error::Error;

#[derive(Debug, Clone, Default)]
pub struct SeedList {
    seeds: Vec<SocketAddr>,
}

impl SeedList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, seed: SocketAddr) {
        self.seeds.push(seed);
    }

    /// Parse one `host:port` entry and add it.
    pub fn add_str(&mut self, entry: &str) -> Result<(), Error> {
        let addr: SocketAddr = entry
            .trim()
            .parse()
            .map_err(|_| Error::BadSeed(entry.to_owned()))?;
        self.seeds.push(addr);
        Ok(())
    }

    /// Parse a comma-separated list, e.g. `"127.0.0.1:25688,127.0.0.1:25699"`.
    pub fn add_list(&mut self, csv: &str) -> Result<(), Error> {
        for entry in csv.split(',') {
            let entry = entry.trim();
            if !entry.is_empty() {
                self.add_str(entry)?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.seeds.contains(addr)
    }

    pub fn random(&self) -> Option<SocketAddr> {
        self.seeds.choose(&mut rand::thread_rng()).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SocketAddr> {
        self.seeds.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_list_parses_two_entries() {
        // scenario S2
        let mut seeds = SeedList::new();
        seeds.add_list("127.0.0.1:25688,127.0.0.1:25699").unwrap();
        assert_eq!(seeds.len(), 2);
        assert!(seeds.contains(&"127.0.0.1:25688".parse().unwrap()));
        assert!(seeds.contains(&"127.0.0.1:25699".parse().unwrap()));
    }

    #[test]
    fn add_list_rejects_malformed_entry() {
        let mut seeds = SeedList::new();
        assert!(seeds.add_list("not-an-address").is_err());
    }

    #[test]
    fn random_is_none_when_empty() {
        let seeds = SeedList::new();
        assert!(seeds.random().is_none());
    }
}
