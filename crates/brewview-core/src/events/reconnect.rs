use std::time::Duration;

/// Default interval between connect attempts, in seconds.
pub const DEFAULT_RECONNECT_SECS: u64 = 5;

/// When the event socket is re-issued `connect(current token)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Every tick, whatever the connection state.
    Fixed(Duration),
    /// Double the wait after each tick that finds the socket down, up to `max`.
    /// A live socket resets the wait to `base`.
    Backoff { base: Duration, max: Duration },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed(Duration::from_secs(DEFAULT_RECONNECT_SECS))
    }
}

impl ReconnectPolicy {
    /// Delay before the next attempt, given how many ticks in a row found the
    /// socket down.
    pub fn next_delay(&self, consecutive_failures: u32) -> Duration {
        match *self {
            ReconnectPolicy::Fixed(interval) => interval,
            ReconnectPolicy::Backoff { base, max } => {
                let factor = 1u32 << consecutive_failures.min(16);
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_ignores_failures() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.next_delay(0), Duration::from_secs(5));
        assert_eq!(policy.next_delay(10), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = ReconnectPolicy::Backoff {
            base: Duration::from_secs(2),
            max: Duration::from_secs(60),
        };
        assert_eq!(policy.next_delay(0), Duration::from_secs(2));
        assert_eq!(policy.next_delay(1), Duration::from_secs(4));
        assert_eq!(policy.next_delay(3), Duration::from_secs(16));
        assert_eq!(policy.next_delay(5), Duration::from_secs(60));
        assert_eq!(policy.next_delay(40), Duration::from_secs(60));
    }
}
