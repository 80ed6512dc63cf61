//! Wake causes and wake-source configuration.
//!
//! The watch spends nearly all of its life in deep sleep. Before going
//! down it arms:
//!
//! - at most **one** periodic source: either the update timer or the RTC
//!   alarm pin (the alarm wins when both are enabled), and
//! - the button pins, always, so the user can wake the watch whatever the
//!   configuration says.

use crate::config::{DEFAULT_UPDATE_INTERVAL_MS, MAX_UPDATE_INTERVAL_MS};
use crate::event::{Button, ButtonMask};

/// Why execution resumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeCause {
    /// Power-on, reset, or anything the board cannot attribute.
    ColdBoot,
    /// The periodic update timer fired.
    Timer,
    /// The RTC alarm pin was asserted.
    RtcAlarm,
    /// A button pin woke the watch.
    Button(Button),
}

/// The periodic wake mechanism to arm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Periodic {
    Off,
    Timer { interval_ms: u32 },
    RtcAlarm,
}

/// Retained wake-source configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeConfig {
    update_interval_ms: u32,
    rtc_alarm: bool,
    buttons: ButtonMask,
}

impl WakeConfig {
    pub const fn new() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            rtc_alarm: false,
            buttons: ButtonMask::ALL,
        }
    }

    /// Set the periodic timer interval. `0` disables it; anything above
    /// [`MAX_UPDATE_INTERVAL_MS`] is clamped to it.
    pub fn set_update_interval(&mut self, interval_ms: u32) {
        if interval_ms > MAX_UPDATE_INTERVAL_MS {
            warn!(
                "Wake: interval {} ms clamped to {} ms",
                interval_ms, MAX_UPDATE_INTERVAL_MS
            );
        }
        self.update_interval_ms = interval_ms.min(MAX_UPDATE_INTERVAL_MS);
    }

    pub fn update_interval_ms(&self) -> u32 {
        self.update_interval_ms
    }

    /// Use the RTC alarm pin instead of the timer.
    pub fn set_rtc_alarm(&mut self, enabled: bool) {
        self.rtc_alarm = enabled;
    }

    pub fn rtc_alarm(&self) -> bool {
        self.rtc_alarm
    }

    /// Buttons allowed to wake the watch. An empty mask means all of them.
    pub fn set_button_mask(&mut self, mask: ButtonMask) {
        self.buttons = if mask.is_empty() { ButtonMask::ALL } else { mask };
    }

    pub fn button_mask(&self) -> ButtonMask {
        self.buttons
    }

    pub fn periodic(&self) -> Periodic {
        if self.rtc_alarm {
            Periodic::RtcAlarm
        } else if self.update_interval_ms > 0 {
            Periodic::Timer {
                interval_ms: self.update_interval_ms,
            }
        } else {
            Periodic::Off
        }
    }

    /// The set of wake sources to arm before sleeping.
    pub fn plan(&self) -> SleepPlan {
        SleepPlan {
            periodic: self.periodic(),
            buttons: if self.buttons.is_empty() {
                ButtonMask::ALL
            } else {
                self.buttons
            },
        }
    }
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Wake sources armed for one sleep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SleepPlan {
    pub periodic: Periodic,
    pub buttons: ButtonMask,
}

impl SleepPlan {
    /// Whether the board must arm the RTC interrupt pin.
    pub fn uses_rtc_pin(&self) -> bool {
        matches!(self.periodic, Periodic::RtcAlarm)
    }
}
