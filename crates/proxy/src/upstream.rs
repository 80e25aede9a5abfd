use jsgate_common::{UpstreamConfig, MAX_UPSTREAM_WEIGHT};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Picks upstream servers by weighted round-robin.
pub struct UpstreamSelector {
    pub name: String,
    addrs: Vec<String>,
    /// One slot per unit of weight, each holding an index into `addrs`.
    slots: Vec<usize>,
    counter: AtomicUsize,
}

impl UpstreamSelector {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        let addrs: Vec<String> = config.servers.iter().map(|s| s.addr.clone()).collect();

        let mut slots: Vec<usize> = config
            .servers
            .iter()
            .enumerate()
            .flat_map(|(i, s)| {
                std::iter::repeat(i).take(s.weight.min(MAX_UPSTREAM_WEIGHT) as usize)
            })
            .collect();
        // All weights zero: fall back to equal weight.
        if slots.is_empty() {
            slots = (0..addrs.len()).collect();
        }

        Self {
            name: config.name.clone(),
            addrs,
            slots,
            counter: AtomicUsize::new(0),
        }
    }

    /// Select the next upstream server address.
    pub fn select(&self) -> Option<&str> {
        if self.slots.is_empty() {
            return None;
        }
        let idx = self.counter.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        Some(&self.addrs[self.slots[idx]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsgate_common::UpstreamServer;

    fn upstream(weights: &[u32]) -> UpstreamConfig {
        UpstreamConfig {
            name: "backend".into(),
            servers: weights
                .iter()
                .enumerate()
                .map(|(i, w)| UpstreamServer {
                    addr: format!("127.0.0.1:{}", 3000 + i),
                    weight: *w,
                })
                .collect(),
        }
    }

    #[test]
    fn test_weighted_round_robin() {
        let selector = UpstreamSelector::from_config(&upstream(&[2, 1]));
        let picks: Vec<_> = (0..6).map(|_| selector.select().unwrap().to_string()).collect();
        assert_eq!(picks.iter().filter(|a| *a == "127.0.0.1:3000").count(), 4);
        assert_eq!(picks.iter().filter(|a| *a == "127.0.0.1:3001").count(), 2);
    }

    #[test]
    fn test_zero_weights_fall_back_to_equal() {
        let selector = UpstreamSelector::from_config(&upstream(&[0, 0]));
        assert_eq!(selector.select(), Some("127.0.0.1:3000"));
        assert_eq!(selector.select(), Some("127.0.0.1:3001"));
    }

    #[test]
    fn test_weight_clamped() {
        let selector = UpstreamSelector::from_config(&upstream(&[u32::MAX, 1]));
        assert_eq!(selector.slots.len(), MAX_UPSTREAM_WEIGHT as usize + 1);
    }

    #[test]
    fn test_no_servers() {
        let selector = UpstreamSelector::from_config(&upstream(&[]));
        assert_eq!(selector.select(), None);
    }
}
