//! Randomized politeness delay between fan-out items.

use crate::config::ScraperConfig;
use rand::Rng;
use std::time::Duration;

/// A uniformly random pause in `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolitenessDelay {
    min: Duration,
    max: Duration,
}

impl PolitenessDelay {
    /// Creates a delay. Bounds given in the wrong order are swapped.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// No delay at all.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// The configured `min_delay`/`max_delay` bounds.
    #[must_use]
    pub fn from_config(config: &ScraperConfig) -> Self {
        let (min, max) = config.delay_bounds();
        Self::new(min, max)
    }

    /// Lower bound.
    #[must_use]
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws one pause length.
    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    /// Sleeps for one sampled pause.
    pub async fn wait(&self) {
        let pause = self.sample();
        if pause.is_zero() {
            return;
        }
        tracing::trace!(pause = ?pause, "Politeness delay");
        tokio::time::sleep(pause).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_within_bounds() {
        let delay = PolitenessDelay::new(Duration::from_millis(10), Duration::from_millis(20));
        for _ in 0..100 {
            let pause = delay.sample();
            assert!(pause >= Duration::from_millis(10));
            assert!(pause <= Duration::from_millis(20));
        }
    }

    #[test]
    fn test_swapped_bounds() {
        let delay = PolitenessDelay::new(Duration::from_secs(2), Duration::from_secs(1));
        assert_eq!(delay.min(), Duration::from_secs(1));
        assert_eq!(delay.max(), Duration::from_secs(2));
    }

    #[test]
    fn test_from_config() {
        let config = ScraperConfig::default().with_delay(0.25, 0.5);
        let delay = PolitenessDelay::from_config(&config);
        assert_eq!(delay.min(), Duration::from_millis(250));
        assert_eq!(delay.max(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_wait_sleeps() {
        let delay = PolitenessDelay::new(Duration::from_millis(20), Duration::from_millis(20));
        let start = tokio::time::Instant::now();
        delay.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_none_returns_immediately() {
        PolitenessDelay::none().wait().await;
        assert!(PolitenessDelay::none().sample().is_zero());
    }
}
