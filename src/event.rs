//! Event records.
//!
//! An [`Event`] is a small value created at detection time (in an
//! interrupt handler, a button task or a background task), moved into the
//! queue, handled once by the dispatcher and dropped. The payload is a
//! tagged enum, so a location can only be read from a location update and
//! a time value only from a time sync.

use core::fmt::Write;

use embassy_time::Instant;
use heapless::String;

use crate::config;

/// The four watch buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    Menu,
    Back,
    Up,
    Down,
}

impl Button {
    pub const ALL: [Button; 4] = [Button::Menu, Button::Back, Button::Up, Button::Down];

    /// Position of the button in [`Button::ALL`] and in [`ButtonMask`].
    pub const fn index(self) -> usize {
        match self {
            Button::Menu => 0,
            Button::Back => 1,
            Button::Up => 2,
            Button::Down => 3,
        }
    }

    pub const fn from_index(index: usize) -> Option<Button> {
        match index {
            0 => Some(Button::Menu),
            1 => Some(Button::Back),
            2 => Some(Button::Up),
            3 => Some(Button::Down),
            _ => None,
        }
    }
}

/// A set of buttons, one bit per [`Button::index`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonMask(u8);

impl ButtonMask {
    pub const NONE: ButtonMask = ButtonMask(0);
    pub const ALL: ButtonMask = ButtonMask(0b1111);

    pub const fn from_bits(bits: u8) -> Self {
        ButtonMask(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn with(self, button: Button) -> Self {
        ButtonMask(self.0 | (1 << button.index()))
    }

    pub const fn contains(self, button: Button) -> bool {
        self.0 & (1 << button.index()) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Lowest-indexed button in the set.
    pub fn first(self) -> Option<Button> {
        Button::ALL.into_iter().find(|b| self.contains(*b))
    }
}

/// Seconds and microseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeValue {
    pub secs: u64,
    pub micros: u32,
}

impl TimeValue {
    pub const fn from_secs(secs: u64) -> Self {
        Self { secs, micros: 0 }
    }

    /// Saturates at `u64::MAX`.
    pub const fn as_micros(&self) -> u64 {
        self.secs
            .saturating_mul(1_000_000)
            .saturating_add(self.micros as u64)
    }

    pub const fn from_micros(micros: u64) -> Self {
        Self {
            secs: micros / 1_000_000,
            micros: (micros % 1_000_000) as u32,
        }
    }
}

/// A geographic fix plus the zone rules that apply there.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Location {
    pub lat: f32,
    pub lon: f32,
    /// POSIX TZ string, e.g. `AEST-10AEDT,M10.1.0,M4.1.0/3`.
    pub timezone: String<48>,
    pub city: String<30>,
}

impl Location {
    /// Build a location, truncating names that do not fit.
    pub fn new(lat: f32, lon: f32, timezone: &str, city: &str) -> Self {
        Self {
            lat,
            lon,
            timezone: truncated(timezone),
            city: truncated(city),
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new(
            config::DEFAULT_LATITUDE,
            config::DEFAULT_LONGITUDE,
            config::DEFAULT_TIMEZONE,
            config::DEFAULT_CITY,
        )
    }
}

/// Copy as much of `s` as fits, stopping on a char boundary.
pub(crate) fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.write_char(c).is_err() {
            break;
        }
    }
    out
}

/// What happened, with the data that belongs to it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    None,
    /// A debounced press; `bounces` counts the edges suppressed since the
    /// previous accepted press of the same button.
    ButtonDown { button: Button, bounces: u32 },
    AlarmTimer,
    LocationUpdate(Location),
    TimeSync(TimeValue),
    UpdateScreen,
}

/// Flat event identifiers, for logs and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventId {
    None,
    MenuDown,
    BackDown,
    UpDown,
    DownDown,
    AlarmTimer,
    LocationUpdate,
    TimeSync,
    UpdateScreen,
}

/// A timestamped event.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Event {
    /// Monotonic time of detection (µs since boot).
    pub micros: u64,
    pub kind: EventKind,
}

impl Event {
    /// Stamp `kind` with the current monotonic time.
    pub fn now(kind: EventKind) -> Self {
        Self::at(Instant::now(), kind)
    }

    pub fn at(instant: Instant, kind: EventKind) -> Self {
        Self {
            micros: instant.as_micros(),
            kind,
        }
    }

    pub fn button(button: Button, bounces: u32) -> Self {
        Self::now(EventKind::ButtonDown { button, bounces })
    }

    pub fn id(&self) -> EventId {
        match &self.kind {
            EventKind::None => EventId::None,
            EventKind::ButtonDown { button, .. } => match button {
                Button::Menu => EventId::MenuDown,
                Button::Back => EventId::BackDown,
                Button::Up => EventId::UpDown,
                Button::Down => EventId::DownDown,
            },
            EventKind::AlarmTimer => EventId::AlarmTimer,
            EventKind::LocationUpdate(_) => EventId::LocationUpdate,
            EventKind::TimeSync(_) => EventId::TimeSync,
            EventKind::UpdateScreen => EventId::UpdateScreen,
        }
    }
}
