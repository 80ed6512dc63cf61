//! Retained rate limiting for network fetches.

use crate::config::{MAX_NETWORK_ATTEMPTS, SECS_YR_2000};
use crate::error::Error;

/// Last-success bookkeeping for one kind of fetch. All times are Unix
/// seconds; `0` means "never".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RateGate {
    last_success: u64,
    last_attempt: u64,
    failures: u8,
}

impl RateGate {
    pub const fn new() -> Self {
        Self {
            last_success: 0,
            last_attempt: 0,
            failures: 0,
        }
    }

    /// `Err(RateLimited)` if the last success is younger than `interval`,
    /// or if [`MAX_NETWORK_ATTEMPTS`] consecutive failures happened within
    /// the last `interval`. A clock that went backwards opens the gate.
    pub fn check(&self, now: u64, interval: u64) -> Result<(), Error> {
        let within = |since: u64| since != 0 && now >= since && now - since < interval;

        if within(self.last_success) {
            return Err(Error::RateLimited);
        }
        if self.failures >= MAX_NETWORK_ATTEMPTS && within(self.last_attempt) {
            return Err(Error::RateLimited);
        }
        Ok(())
    }

    pub fn succeeded(&mut self, now: u64) {
        self.last_success = now;
        self.last_attempt = now;
        self.failures = 0;
    }

    pub fn failed(&mut self, now: u64) {
        self.last_attempt = now;
        self.failures = self.failures.saturating_add(1);
    }

    pub fn last_success(&self) -> Option<u64> {
        (self.last_success != 0).then_some(self.last_success)
    }

    pub fn failures(&self) -> u8 {
        self.failures
    }

    /// True until a success stamped with a post-2000 time is recorded.
    pub fn needs_first_sync(&self) -> bool {
        self.last_success < SECS_YR_2000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_800_000_000;

    #[test]
    fn fresh_gate_is_open() {
        let gate = RateGate::new();
        assert_eq!(gate.check(T0, 300), Ok(()));
        assert!(gate.needs_first_sync());
        assert_eq!(gate.last_success(), None);
    }

    #[test]
    fn success_closes_gate_for_one_interval() {
        let mut gate = RateGate::new();
        gate.succeeded(T0);
        assert_eq!(gate.check(T0 + 299, 300), Err(Error::RateLimited));
        assert_eq!(gate.check(T0 + 300, 300), Ok(()));
        assert!(!gate.needs_first_sync());
    }

    #[test]
    fn repeated_failures_back_off() {
        let mut gate = RateGate::new();
        for i in 0..MAX_NETWORK_ATTEMPTS as u64 - 1 {
            gate.failed(T0 + i);
            assert_eq!(gate.check(T0 + i + 1, 300), Ok(()));
        }
        gate.failed(T0 + 10);
        assert_eq!(gate.failures(), MAX_NETWORK_ATTEMPTS);
        assert_eq!(gate.check(T0 + 11, 300), Err(Error::RateLimited));
        assert_eq!(gate.check(T0 + 310, 300), Ok(()));

        gate.succeeded(T0 + 400);
        assert_eq!(gate.failures(), 0);
    }

    #[test]
    fn clock_going_backwards_reopens() {
        let mut gate = RateGate::new();
        gate.succeeded(T0);
        assert_eq!(gate.check(5, 300), Ok(()));
    }
}
