//! Configuration for the sync orchestrator.

use std::time::Duration;

/// Configuration for conflict-resolving saves.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Retry configuration for cascading conflicts.
    pub retry: RetryConfig,
}

impl EngineConfig {
    /// Creates a configuration with default retry behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Pause inserted before each retried save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Retry the resolved record at once.
    #[default]
    Immediate,
    /// Wait `first` before round 1, doubling every round up to `cap`.
    Exponential {
        /// Pause before the first retried save.
        first: Duration,
        /// Longest pause between retried saves.
        cap: Duration,
    },
}

/// Bounds the resolve-and-retry loop of a single record.
///
/// Each round plans a resolution for the latest conflict and saves the
/// resolved record again. A record that still conflicts after
/// `max_attempts` rounds fails with that conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Resolution rounds allowed per record. Zero surfaces the first conflict.
    pub max_attempts: u32,
    /// Pause before each retried save.
    pub backoff: Backoff,
}

impl RetryConfig {
    /// Rounds allowed unless configured otherwise.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Allows `max_attempts` rounds with no pause between them.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Immediate,
        }
    }

    /// Surfaces the first conflict without resolving it.
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Sets the pause between rounds.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Pause before the retried save of `round` (1-indexed).
    pub fn delay_before_round(&self, round: u32) -> Duration {
        match self.backoff {
            Backoff::Immediate => Duration::ZERO,
            Backoff::Exponential { .. } if round == 0 => Duration::ZERO,
            Backoff::Exponential { first, cap } => first
                .saturating_mul(2u32.saturating_pow(round - 1))
                .min(cap),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}
