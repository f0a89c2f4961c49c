use serde::{Deserialize, Serialize};

/// Drops a share of outgoing datagrams, for exercising the reliable channel
/// on a loopback link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PacketLossSimulation {
    pub enabled: bool,
    /// 0.0 to 100.0.
    pub loss_percent: f32,
}

impl PacketLossSimulation {
    pub fn with_loss(loss_percent: f32) -> Self {
        Self {
            enabled: true,
            loss_percent,
        }
    }

    pub fn should_drop(&self) -> bool {
        if !self.enabled || self.loss_percent <= 0.0 {
            return false;
        }
        rand_percent() * 100.0 < self.loss_percent
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_dropped: u64,
    pub resends: u64,
    pub rtt_ms: f32,
    pub rtt_variance: f32,
}

/// Uniform in `[0, 1]`.
pub fn rand_percent() -> f32 {
    rand_u64() as f32 / u64::MAX as f32
}

pub fn rand_u64() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(COUNTER.fetch_add(1, Ordering::Relaxed));
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_never_drops() {
        let sim = PacketLossSimulation {
            enabled: false,
            loss_percent: 100.0,
        };
        assert!((0..100).all(|_| !sim.should_drop()));
    }

    #[test]
    fn test_full_loss_drops_nearly_everything() {
        let sim = PacketLossSimulation::with_loss(100.0);
        let dropped = (0..100).filter(|_| sim.should_drop()).count();
        assert!(dropped >= 95);
    }

    #[test]
    fn test_rand_percent_in_unit_range() {
        for _ in 0..1000 {
            let value = rand_percent();
            assert!((0.0..=1.0).contains(&value));
        }
    }
}
