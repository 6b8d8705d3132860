use flashplane_shared::config::ReconcilerConfig;
use std::time::Duration;

/// Doubling delay between watch attempts, capped at a ceiling.
///
/// The k-th consecutive failure waits `min(floor * 2^(k-1), ceiling)`.
#[derive(Debug, Clone)]
pub struct ReconcileBackoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl ReconcileBackoff {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            floor,
            ceiling,
            current: floor,
        }
    }

    /// Delay to wait now; the following call waits twice as long
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.ceiling);
        self.current = self.current.saturating_mul(2).min(self.ceiling);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}

impl From<&ReconcilerConfig> for ReconcileBackoff {
    fn from(config: &ReconcilerConfig) -> Self {
        Self::new(
            Duration::from_secs(config.backoff_floor_secs),
            Duration::from_secs(config.backoff_ceiling_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 2)]
    #[case(2, 4)]
    #[case(3, 8)]
    #[case(4, 16)]
    #[case(5, 32)]
    #[case(6, 60)]
    #[case(10, 60)]
    fn test_kth_failure_delay(#[case] k: u32, #[case] expected_secs: u64) {
        let mut backoff = ReconcileBackoff::new(Duration::from_secs(2), Duration::from_secs(60));
        let mut delay = Duration::ZERO;
        for _ in 0..k {
            delay = backoff.next_delay();
        }
        assert_eq!(delay, Duration::from_secs(expected_secs));
    }

    #[test]
    fn test_reset_returns_to_floor() {
        let mut backoff = ReconcileBackoff::from(&ReconcilerConfig::default());
        backoff.next_delay();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
    }

    #[test]
    fn test_floor_above_ceiling_is_capped() {
        let mut backoff = ReconcileBackoff::new(Duration::from_secs(90), Duration::from_secs(60));
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));
    }
}
