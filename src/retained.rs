//! State that survives deep sleep.
//!
//! Ordinary RAM is lost on every sleep. The few values that must carry
//! over (wake configuration, last location fix, rate-limit gates, cached
//! weather, which screen is active and a handful of screen-local slots)
//! are gathered in [`Retained`]. While awake they live in a
//! [`RetainedCell`]; the board copies them out of, and back into, its
//! retention region as a [`RetainedImage`] stamped with a magic number
//! and layout version.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::event::Location;
use crate::net::{RateGate, Weather};
use crate::screen::ScreenId;
use crate::wake::WakeConfig;

/// "INKW"
pub const RETAINED_MAGIC: u32 = 0x494E_4B57;

/// Bump whenever the layout of [`Retained`] changes.
pub const RETAINED_VERSION: u16 = 1;

/// Screen-local `i16` slots (carousel index, menu cursor, ...).
pub const SCREEN_SLOTS: usize = 4;

#[derive(Clone, Debug, PartialEq)]
pub struct Retained {
    pub wake: WakeConfig,
    pub location: Location,
    pub time_sync: RateGate,
    pub location_gate: RateGate,
    pub weather_gate: RateGate,
    pub weather: Weather,
    pub active_screen: ScreenId,
    pub screen_slots: [i16; SCREEN_SLOTS],
    /// Wakes since the image was last reset.
    pub wake_count: u32,
}

impl Default for Retained {
    fn default() -> Self {
        Self {
            wake: WakeConfig::new(),
            location: Location::default(),
            time_sync: RateGate::new(),
            location_gate: RateGate::new(),
            weather_gate: RateGate::new(),
            weather: Weather::default(),
            active_screen: ScreenId::HOME,
            screen_slots: [0; SCREEN_SLOTS],
            wake_count: 0,
        }
    }
}

/// On-chip layout of the retention region.
#[repr(C)]
pub struct RetainedImage {
    pub magic: u32,
    pub version: u16,
    pub state: Retained,
}

impl RetainedImage {
    pub fn seal(state: &Retained) -> Self {
        Self {
            magic: RETAINED_MAGIC,
            version: RETAINED_VERSION,
            state: state.clone(),
        }
    }

    /// Whether a header read from the retention region belongs to an
    /// image this firmware wrote.
    pub fn header_matches(magic: u32, version: u16) -> bool {
        magic == RETAINED_MAGIC && version == RETAINED_VERSION
    }

    pub fn restore(&self) -> Option<Retained> {
        Self::header_matches(self.magic, self.version).then(|| self.state.clone())
    }
}

/// Awake-time home of the retained state.
pub struct RetainedCell {
    state: Mutex<CriticalSectionRawMutex, RefCell<Retained>>,
}

impl RetainedCell {
    pub fn new(state: Retained) -> Self {
        Self {
            state: Mutex::new(RefCell::new(state)),
        }
    }

    /// Run `f` with exclusive access. `f` must not call back into the
    /// cell.
    pub fn with<T>(&self, f: impl FnOnce(&mut Retained) -> T) -> T {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn snapshot(&self) -> Retained {
        self.with(|state| state.clone())
    }

    pub fn replace(&self, state: Retained) {
        self.with(|current| *current = state);
    }
}

impl Default for RetainedCell {
    fn default() -> Self {
        Self::new(Retained::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_image_restores() {
        let mut state = Retained::default();
        state.screen_slots[0] = 3;
        state.wake.set_update_interval(0);

        let image = RetainedImage::seal(&state);
        assert_eq!(image.restore(), Some(state));
    }

    #[test]
    fn foreign_header_is_rejected() {
        let mut image = RetainedImage::seal(&Retained::default());
        image.magic = 0xDEAD_BEEF;
        assert_eq!(image.restore(), None);

        let mut image = RetainedImage::seal(&Retained::default());
        image.version = RETAINED_VERSION + 1;
        assert_eq!(image.restore(), None);
    }

    #[test]
    fn cell_mutation_is_visible_in_snapshot() {
        let cell = RetainedCell::default();
        cell.with(|r| r.active_screen = ScreenId(2));
        assert_eq!(cell.snapshot().active_screen, ScreenId(2));

        cell.replace(Retained::default());
        assert_eq!(cell.snapshot().active_screen, ScreenId::HOME);
    }
}
