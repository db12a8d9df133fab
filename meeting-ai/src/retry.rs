//! Exponential backoff schedule and per-call retry state.

use std::time::Duration;

/// Retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// First wait; each later wait doubles it.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(60);

/// Ordered wait durations between attempts.
///
/// With the defaults this is 1, 2, 4, 8 and 16 minutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    waits: Vec<Duration>,
}

impl BackoffSchedule {
    /// Build a doubling schedule of `retries` waits starting at `base_delay`.
    pub fn exponential(base_delay: Duration, retries: u32) -> Self {
        let waits = (0..retries)
            .map(|n| base_delay.saturating_mul(2_u32.saturating_pow(n)))
            .collect();
        Self { waits }
    }

    /// Build a schedule from explicit waits.
    pub fn from_waits(waits: Vec<Duration>) -> Self {
        Self { waits }
    }

    /// Wait to apply after failed attempt `attempt` (1-based).
    ///
    /// Attempts past the end of the schedule reuse its last entry.
    pub fn wait_for(&self, attempt: u32) -> Duration {
        let index = attempt.saturating_sub(1) as usize;
        self.waits
            .get(index)
            .or_else(|| self.waits.last())
            .copied()
            .unwrap_or_default()
    }

    pub fn waits(&self) -> &[Duration] {
        &self.waits
    }

    /// Total worst-case time spent waiting.
    pub fn total_wait(&self) -> Duration {
        self.waits.iter().sum()
    }

    pub fn retries(&self) -> u32 {
        self.waits.len() as u32
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::exponential(DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES)
    }
}

/// Attempt bookkeeping for one generation call.
///
/// Created per call and discarded after success or exhaustion.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
    schedule: BackoffSchedule,
}

impl RetryState {
    /// Start at attempt 1 with one attempt per schedule entry plus the initial one.
    pub fn new(schedule: BackoffSchedule) -> Self {
        Self {
            attempt: 1,
            max_attempts: schedule.retries() + 1,
            schedule,
        }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn has_attempts_left(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Wait before the next attempt after the current one failed.
    pub fn next_wait(&self) -> Duration {
        self.schedule.wait_for(self.attempt)
    }

    pub fn advance(&mut self) {
        self.attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_default_schedule_is_one_to_sixteen_minutes() {
        let schedule = BackoffSchedule::default();
        assert_eq!(
            schedule.waits(),
            [MINUTE, 2 * MINUTE, 4 * MINUTE, 8 * MINUTE, 16 * MINUTE]
        );
        assert_eq!(schedule.total_wait(), 31 * MINUTE);
    }

    #[test]
    fn test_wait_for_uses_last_entry_past_the_end() {
        let schedule = BackoffSchedule::default();
        assert_eq!(schedule.wait_for(1), MINUTE);
        assert_eq!(schedule.wait_for(5), 16 * MINUTE);
        assert_eq!(schedule.wait_for(9), 16 * MINUTE);
    }

    #[test]
    fn test_empty_schedule_waits_nothing() {
        let schedule = BackoffSchedule::from_waits(Vec::new());
        assert_eq!(schedule.wait_for(1), Duration::ZERO);
        assert_eq!(RetryState::new(schedule).max_attempts(), 1);
    }

    #[test]
    fn test_retry_state_allows_six_attempts() {
        let mut state = RetryState::new(BackoffSchedule::default());
        assert_eq!(state.attempt(), 1);
        assert_eq!(state.max_attempts(), 6);

        let mut waits = Vec::new();
        while state.has_attempts_left() {
            waits.push(state.next_wait());
            state.advance();
        }
        assert_eq!(state.attempt(), 6);
        assert_eq!(waits.len(), 5);
        assert_eq!(waits[2], 4 * MINUTE);
    }
}
