use std::time::Duration;

use serde::Serialize;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    /// Text for the status banner.
    pub fn banner(self) -> &'static str {
        match self {
            ConnectionState::Connected    => "Live Connected",
            ConnectionState::Disconnected => "Disconnected",
        }
    }
}

/// How long to wait before reconnecting after the n-th consecutive close.
///
/// The default is a fixed delay retried forever.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub delay:        Duration,
    /// Multiplier applied per extra consecutive failure; 1.0 keeps the delay fixed.
    pub backoff:      f64,
    pub max_delay:    Duration,
    /// Consecutive reconnects allowed before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay:        DEFAULT_RECONNECT_DELAY,
            backoff:      1.0,
            max_delay:    Duration::from_secs(30),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay, ..Self::default() }
    }

    /// Delay before reconnect number `attempt` (1-based), or `None` once exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || self.max_attempts.is_some_and(|max| attempt > max) {
            return None;
        }
        if self.backoff <= 1.0 {
            return Some(self.delay);
        }
        let factor = self.backoff.powi(attempt.saturating_sub(1).min(i32::MAX as u32) as i32);
        let scaled = self.delay.as_secs_f64() * factor;
        // a fixed delay above the ceiling is still honoured as-is
        let ceiling = self.max_delay.max(self.delay).as_secs_f64();
        Some(Duration::from_secs_f64(scaled.min(ceiling)))
    }
}

/// Disconnected ⇄ Connected, with one timed transition out of Disconnected per close.
#[derive(Clone, Debug, Default)]
pub struct Reconnector {
    policy:   RetryPolicy,
    state:    ConnectionState,
    failures: u32,
    opens:    u64,
    closes:   u64,
}

impl Reconnector {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive closes since the last successful open.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn opens(&self) -> u64 {
        self.opens
    }

    pub fn closes(&self) -> u64 {
        self.closes
    }

    pub fn opened(&mut self) {
        self.state = ConnectionState::Connected;
        self.failures = 0;
        self.opens += 1;
    }

    /// Record a close (or failed connect) and return the single reconnect to schedule.
    pub fn closed(&mut self) -> Option<Duration> {
        self.state = ConnectionState::Disconnected;
        self.closes += 1;
        self.failures = self.failures.saturating_add(1);
        self.policy.delay_for(self.failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_retries_forever_at_three_seconds() {
        let policy = RetryPolicy::default();
        for attempt in [1, 2, 10, 10_000, u32::MAX] {
            assert_eq!(policy.delay_for(attempt), Some(Duration::from_secs(3)));
        }
    }

    #[test]
    fn attempt_cap() {
        let policy = RetryPolicy {
            max_attempts: Some(2),
            ..RetryPolicy::default()
        };
        assert!(policy.delay_for(2).is_some());
        assert_eq!(policy.delay_for(3), None);
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy {
            delay: Duration::from_secs(1),
            backoff: 2.0,
            max_delay: Duration::from_secs(5),
            max_attempts: None,
        };
        assert_eq!(policy.delay_for(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_secs(4)));
        assert_eq!(policy.delay_for(4), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay_for(400), Some(Duration::from_secs(5)));
    }

    #[test]
    fn one_reconnect_per_close() {
        let mut rc = Reconnector::default();
        assert_eq!(rc.state(), ConnectionState::Disconnected);

        assert_eq!(rc.closed(), Some(DEFAULT_RECONNECT_DELAY));
        assert_eq!(rc.closed(), Some(DEFAULT_RECONNECT_DELAY));
        assert_eq!(rc.closes(), 2);
        assert_eq!(rc.failures(), 2);

        rc.opened();
        assert_eq!(rc.state(), ConnectionState::Connected);
        assert_eq!(rc.failures(), 0);

        rc.closed();
        assert_eq!(rc.state(), ConnectionState::Disconnected);
        assert_eq!(rc.failures(), 1);
    }

    #[test]
    fn open_resets_the_cap() {
        let mut rc = Reconnector::new(RetryPolicy {
            max_attempts: Some(1),
            ..RetryPolicy::fixed(Duration::from_millis(10))
        });
        assert!(rc.closed().is_some());
        assert!(rc.closed().is_none());
        rc.opened();
        assert!(rc.closed().is_some());
    }
}
