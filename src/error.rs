//! Unified error type for inkwatch.
//!
//! We avoid `alloc` - every variant is a plain tag so the type stays
//! `Copy` and fits in the shared last-error slot that screens read to
//! show sync status.

use core::cell::Cell;
use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Top-level error type used across the firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Collaborator outcomes
    /// The operation ran too recently (or failed too often); the
    /// last-known value is still valid.
    RateLimited,

    /// The shared radio link could not be brought up.
    RadioFailed,

    /// The remote request was made but failed or returned garbage.
    RequestFailed,

    /// The subsystem is busy with a previous request.
    NotReady,

    /// Operation timed out.
    Timeout,

    // Runtime
    /// Every task registry slot is in use.
    RegistryFull,

    /// A bus transaction with a peripheral (RTC, panel) failed.
    Hardware,
}

impl Error {
    /// `RateLimited` is a skip, not a failure.
    pub fn is_failure(self) -> bool {
        !matches!(self, Error::RateLimited)
    }

    /// Short upper-case tag for status lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Error::RateLimited => "RATE_LIMITED",
            Error::RadioFailed => "RADIO_FAILED",
            Error::RequestFailed => "REQUEST_FAILED",
            Error::NotReady => "NOT_READY",
            Error::Timeout => "TIMEOUT",
            Error::RegistryFull => "REGISTRY_FULL",
            Error::Hardware => "HARDWARE",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last outcome of a collaborator operation. Empty means OK.
pub struct ErrorSlot {
    last: Mutex<CriticalSectionRawMutex, Cell<Option<Error>>>,
}

impl ErrorSlot {
    pub const fn new() -> Self {
        Self {
            last: Mutex::new(Cell::new(None)),
        }
    }

    /// Store the outcome of an operation, clearing the slot on success.
    pub fn record<T>(&self, result: &Result<T, Error>) {
        let value = result.as_ref().err().copied();
        self.last.lock(|last| last.set(value));
    }

    pub fn set(&self, error: Option<Error>) {
        self.last.lock(|last| last.set(error));
    }

    pub fn last(&self) -> Option<Error> {
        self.last.lock(|last| last.get())
    }

    /// Status tag for display: `"OK"` when the slot is empty.
    pub fn status(&self) -> &'static str {
        self.last().map_or("OK", Error::as_str)
    }
}

impl Default for ErrorSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_not_a_failure() {
        assert!(!Error::RateLimited.is_failure());
        assert!(Error::RadioFailed.is_failure());
        assert!(Error::Timeout.is_failure());
    }

    #[test]
    fn slot_tracks_last_outcome() {
        let slot = ErrorSlot::new();
        assert_eq!(slot.status(), "OK");

        slot.record::<()>(&Err(Error::Timeout));
        assert_eq!(slot.last(), Some(Error::Timeout));
        assert_eq!(slot.status(), "TIMEOUT");

        slot.record(&Ok(5u32));
        assert_eq!(slot.last(), None);
    }

    #[test]
    fn display_matches_tag() {
        let mut s: heapless::String<16> = heapless::String::new();
        core::fmt::write(&mut s, format_args!("{}", Error::NotReady)).unwrap();
        assert_eq!(s.as_str(), "NOT_READY");
    }
}
