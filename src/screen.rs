//! Screen abstraction.
//!
//! The core never draws. It knows a screen only as something that can
//! [`show`](Screen::show) itself and react to the four buttons, and it
//! finds the active one by id in a [`ScreenTable`] provided by the UI.
//! Button handlers return a [`Nav`] instead of switching screens
//! themselves, so the active-screen id is only ever written by the
//! dispatcher.

/// Identifies a screen in the UI's table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScreenId(pub u8);

impl ScreenId {
    /// The screen shown after a cold boot.
    pub const HOME: ScreenId = ScreenId(0);
}

/// Panel refresh flavour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Refresh {
    /// Clears ghosting; slow and flashes the panel.
    Full,
    Partial,
}

/// What the dispatcher should do after a button handler ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Nav {
    /// Nothing visible changed.
    Stay,
    /// Repaint the current screen.
    Redraw,
    /// Make another screen active and show it.
    Open(ScreenId),
}

pub trait Screen {
    fn show(&mut self, refresh: Refresh);

    fn menu(&mut self) -> Nav {
        Nav::Stay
    }

    fn back(&mut self) -> Nav {
        Nav::Stay
    }

    fn up(&mut self) -> Nav {
        Nav::Stay
    }

    fn down(&mut self) -> Nav {
        Nav::Stay
    }
}

/// The UI's screens, looked up by id at dispatch time.
pub trait ScreenTable {
    fn screen(&mut self, id: ScreenId) -> Option<&mut dyn Screen>;
}
