// src/pipeline/pacing.rs

//! Anti-hammer pacing between outbound requests.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::CrawlerConfig;

/// Draws whole-second pauses uniformly from `[min, max)`.
#[derive(Debug)]
pub struct Pacer {
    rng: StdRng,
    min_secs: u64,
    max_secs: u64,
    enabled: bool,
}

impl Pacer {
    pub fn new(min_secs: u64, max_secs: u64, rng: StdRng) -> Self {
        Self {
            rng,
            min_secs,
            max_secs,
            enabled: true,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            config.min_delay_secs,
            config.max_delay_secs,
            StdRng::from_os_rng(),
        )
    }

    /// Reproducible pacer for tests.
    pub fn seeded(min_secs: u64, max_secs: u64, seed: u64) -> Self {
        Self::new(min_secs, max_secs, StdRng::seed_from_u64(seed))
    }

    /// Never sleeps.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::seeded(0, 0, 0)
        }
    }

    /// Next pause. An empty range yields `min`.
    pub fn next_delay(&mut self) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }
        let secs = if self.max_secs <= self.min_secs {
            self.min_secs
        } else {
            self.rng.random_range(self.min_secs..self.max_secs)
        };
        Duration::from_secs(secs)
    }

    /// Sleep for the next pause.
    pub async fn pause(&mut self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        log::debug!("Sleeping {:?} before the next request", delay);
        tokio::time::sleep(delay).await;
    }
}
