//! Reconnect delay policy.

use std::time::Duration;

/// Delay before the first reconnect attempt, and between attempts with the
/// fixed policy.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How long the supervisor waits before dialing again after a close or a
/// failed dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Same delay before every attempt.
    Fixed(Duration),
    /// `initial`, then doubling up to `max`. Back to `initial` after a
    /// successful open.
    Exponential { initial: Duration, max: Duration },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_RECONNECT_DELAY)
    }
}

/// Per-session attempt counter over a [`ReconnectPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    /// 0 = unlimited.
    max_attempts: usize,
    attempt: usize,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy, max_attempts: usize) -> Self {
        Self {
            policy,
            max_attempts,
            attempt: 0,
        }
    }

    /// Delay before the next attempt, or `None` once `max_attempts`
    /// consecutive attempts have been used up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.max_attempts > 0 && self.attempt >= self.max_attempts {
            return None;
        }
        let delay = match self.policy {
            ReconnectPolicy::Fixed(delay) => delay,
            ReconnectPolicy::Exponential { initial, max } => {
                let factor = 1u32.checked_shl(self.attempt as u32).unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(max)
            }
        };
        self.attempt += 1;
        Some(delay)
    }

    /// Forget previous failures; called once a connection opens.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> usize {
        self.attempt
    }
}
