//! Politeness delays between requests to the catalog site.

use std::future::Future;
use std::time::Duration;

use tilecat_core::AppConfig;

/// Controls how long the resolver waits between remote calls.
pub trait Pacer: Sync {
    /// Awaited after every existence probe that comes back negative.
    fn between_probes(&self) -> impl Future<Output = ()> + Send;

    /// Awaited after each product has been resolved (or given up on).
    fn between_products(&self) -> impl Future<Output = ()> + Send;
}

/// Sleeps a fixed duration at each pacing point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    pub probe: Duration,
    pub product: Duration,
}

impl FixedDelay {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            probe: Duration::from_millis(config.scraper_probe_delay_ms),
            product: Duration::from_millis(config.scraper_product_delay_ms),
        }
    }
}

impl Pacer for FixedDelay {
    async fn between_probes(&self) {
        if !self.probe.is_zero() {
            tokio::time::sleep(self.probe).await;
        }
    }

    async fn between_products(&self) {
        if !self.product.is_zero() {
            tokio::time::sleep(self.product).await;
        }
    }
}

/// No waiting at all. For tests and local fixtures.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    async fn between_probes(&self) {}

    async fn between_products(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_sleeps_configured_durations() {
        let pacer = FixedDelay {
            probe: Duration::from_millis(150),
            product: Duration::from_millis(500),
        };
        let start = tokio::time::Instant::now();
        pacer.between_probes().await;
        assert!(start.elapsed() >= Duration::from_millis(150));
        pacer.between_products().await;
        assert!(start.elapsed() >= Duration::from_millis(650));
    }

    #[tokio::test]
    async fn no_delay_returns_immediately() {
        let start = std::time::Instant::now();
        NoDelay.between_probes().await;
        NoDelay.between_products().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
