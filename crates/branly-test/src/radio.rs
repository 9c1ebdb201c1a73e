//! Simulated uplink radio
//!
//! Models the link between a node and the gateway modem:
//! - Random loss
//! - Burst loss
//! - Duplicate delivery (a retransmission the modem hears twice)
//! - Full outages

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use branly_node::Transport;

/// Radio link configuration
#[derive(Clone, Debug)]
pub struct RadioConfig {
    /// Per-attempt loss rate (0.0 - 1.0)
    pub loss_rate: f64,
    /// Probability that a lost attempt starts a burst
    pub burst_loss_prob: f64,
    /// Burst length range, in attempts
    pub burst_length: (u32, u32),
    /// Probability that a delivered packet reaches the modem twice
    pub duplicate_prob: f64,
    pub seed: u64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        RadioConfig {
            loss_rate: 0.05,
            burst_loss_prob: 0.1,
            burst_length: (2, 4),
            duplicate_prob: 0.01,
            seed: 0xB7A1,
        }
    }
}

impl RadioConfig {
    /// Every attempt gets through exactly once
    pub fn perfect() -> Self {
        RadioConfig {
            loss_rate: 0.0,
            burst_loss_prob: 0.0,
            burst_length: (0, 0),
            duplicate_prob: 0.0,
            ..Default::default()
        }
    }

    /// Independent loss at `rate`, no bursts or duplicates
    pub fn lossy(rate: f64) -> Self {
        RadioConfig {
            loss_rate: rate,
            ..Self::perfect()
        }
    }

    /// Long bursts and frequent duplicates
    pub fn hostile() -> Self {
        RadioConfig {
            loss_rate: 0.3,
            burst_loss_prob: 0.3,
            burst_length: (3, 10),
            duplicate_prob: 0.1,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Radio statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RadioStats {
    /// Packets handed to the radio
    pub packets: u64,
    /// Individual transmission attempts
    pub attempts: u64,
    pub attempts_lost: u64,
    /// Packets acknowledged
    pub delivered: u64,
    pub duplicated: u64,
    pub sleeps: u64,
}

impl RadioStats {
    pub fn attempt_loss_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.attempts_lost as f64 / self.attempts as f64
        }
    }
}

/// Seeded lossy radio implementing [`Transport`]
///
/// Delivered packets queue up on the modem side until drained.
pub struct SimulatedRadio {
    config: RadioConfig,
    rng: StdRng,
    link_up: bool,
    burst_remaining: u32,
    received: Vec<Vec<u8>>,
    registers: Vec<(u8, u8)>,
    stats: RadioStats,
}

impl SimulatedRadio {
    pub fn new(config: RadioConfig) -> Self {
        SimulatedRadio {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            link_up: true,
            burst_remaining: 0,
            received: Vec::new(),
            registers: vec![(0x01, 0x04), (0x07, 0xD9), (0x08, 0x00), (0x09, 0x00)],
            stats: RadioStats::default(),
        }
    }

    pub fn perfect() -> Self {
        Self::new(RadioConfig::perfect())
    }

    /// Take down or restore the gateway side
    pub fn set_link_up(&mut self, up: bool) {
        self.link_up = up;
    }

    #[inline]
    pub fn is_link_up(&self) -> bool {
        self.link_up
    }

    /// Packets received by the modem since the last drain
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.received)
    }

    /// Packets received and not yet drained
    pub fn received(&self) -> &[Vec<u8>] {
        &self.received
    }

    pub fn stats(&self) -> &RadioStats {
        &self.stats
    }

    fn attempt_lost(&mut self) -> bool {
        if !self.link_up {
            return true;
        }

        if self.burst_remaining > 0 {
            self.burst_remaining -= 1;
            return true;
        }

        if self.rng.gen::<f64>() < self.config.loss_rate {
            if self.rng.gen::<f64>() < self.config.burst_loss_prob {
                let (min, max) = self.config.burst_length;
                self.burst_remaining = self.rng.gen_range(min..=max.max(min));
            }
            return true;
        }
        false
    }
}

impl Transport for SimulatedRadio {
    fn transmit_with_retry(&mut self, attempts: u8, data: &[u8]) -> bool {
        self.stats.packets += 1;

        for attempt in 0..attempts {
            self.stats.attempts += 1;
            if self.attempt_lost() {
                self.stats.attempts_lost += 1;
                trace!(attempt, len = data.len(), "attempt lost");
                continue;
            }

            self.received.push(data.to_vec());
            if self.rng.gen::<f64>() < self.config.duplicate_prob {
                self.received.push(data.to_vec());
                self.stats.duplicated += 1;
            }
            self.stats.delivered += 1;
            return true;
        }
        false
    }

    fn sleep(&mut self) {
        self.stats.sleeps += 1;
    }

    fn dump_registers(&mut self) -> Vec<(u8, u8)> {
        self.registers.clone()
    }
}
