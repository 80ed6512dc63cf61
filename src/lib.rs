//! Firmware core for an e-paper smartwatch.
//!
//! Everything here is hardware-independent and runs on the host under
//! `cargo test`. The nRF52840 binary (`src/main.rs`, feature `embedded`)
//! supplies the [`power::Board`], [`clock::Rtc`], [`radio::RadioLink`] and
//! [`screen::ScreenTable`] implementations and drives one
//! [`power::Coordinator`] cycle per wake.
//!
//! Module map:
//!
//! - [`event`], [`queue`], [`input`]: the event model, the bounded queue
//!   and the button debouncer that feeds it
//! - [`task`]: the running-task registry and launchable background tasks
//! - [`dispatch`]: single-consumer event routing to screens
//! - [`power`], [`power_logic`], [`wake`], [`retained`]: the wake/sleep
//!   cycle and the state that survives it
//! - [`clock`], [`radio`], [`net`]: time keeping, the shared radio and the
//!   rate-limited network collaborators
//!
//! Logging goes through `defmt` on target and the `log` facade on the host.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod input;
pub mod net;
pub mod power;
pub mod power_logic;
pub mod queue;
pub mod radio;
pub mod retained;
pub mod screen;
pub mod system;
pub mod task;
pub mod wake;

// Hardware-free pieces of the firmware's BLE layer, shared with the binary.
#[path = "ble/payload.rs"]
mod ble_payload_impl;

pub mod ble {
    pub mod payload {
        pub use crate::ble_payload_impl::*;
    }
}

#[cfg(test)]
mod testing;

pub use error::Error;
pub use event::{Button, ButtonMask, Event, EventId, EventKind, Location, TimeValue};
pub use power::{Board, Coordinator, CycleReport, PowerState};
pub use system::System;
pub use wake::{Periodic, SleepPlan, WakeCause};
