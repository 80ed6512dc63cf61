//! The watch's screens.
//!
//! | id | screen          | MENU            | BACK           | UP / DOWN   |
//! |----|-----------------|-----------------|----------------|-------------|
//! | 0  | watch face      | open settings   | -              | -           |
//! | 1  | settings menu   | activate item   | open face      | move cursor |
//! | 2  | Bluetooth       | -               | stop, settings | -           |
//!
//! The settings cursor is kept in retained screen slot 0 so the menu
//! reopens where it was left after a sleep.

use defmt::warn;
use inkwatch::config::BLE_DEVICE_NAME;
use inkwatch::screen::{Nav, Refresh, Screen, ScreenId, ScreenTable};

use super::display;
use crate::ble::config_server::{self, BleContext};
use crate::Sys;

pub const WATCH_FACE: ScreenId = ScreenId::HOME;
pub const SETTINGS: ScreenId = ScreenId(1);
pub const BLUETOOTH: ScreenId = ScreenId(2);

const CURSOR_SLOT: usize = 0;

#[derive(Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Bluetooth,
    RefreshMinute,
    RefreshOff,
}

const MENU: [(MenuItem, &str); 3] = [
    (MenuItem::Bluetooth, "Bluetooth"),
    (MenuItem::RefreshMinute, "Refresh 1 min"),
    (MenuItem::RefreshOff, "Refresh off"),
];

pub struct WatchFace {
    sys: &'static Sys,
}

impl Screen for WatchFace {
    fn show(&mut self, refresh: Refresh) {
        let (timezone, weather) = self
            .sys
            .retained
            .with(|r| (r.location.timezone.clone(), r.weather.clone()));
        let local = self.sys.clock.local_now(timezone.as_str());
        let status = self.sys.errors.status();
        display::with(|panel| display::draw_watch_face(panel, refresh, &local, &weather, status));
    }

    fn menu(&mut self) -> Nav {
        Nav::Open(SETTINGS)
    }
}

pub struct SettingsMenu {
    ctx: BleContext,
}

impl SettingsMenu {
    fn cursor(&self) -> usize {
        (self.ctx.sys.screen_slot(CURSOR_SLOT).max(0) as usize).min(MENU.len() - 1)
    }

    fn move_cursor(&mut self, forward: bool) -> Nav {
        let len = MENU.len();
        let cursor = self.cursor();
        let next = if forward {
            (cursor + 1) % len
        } else {
            (cursor + len - 1) % len
        };
        self.ctx.sys.set_screen_slot(CURSOR_SLOT, next as i16);
        Nav::Redraw
    }
}

impl Screen for SettingsMenu {
    fn show(&mut self, _refresh: Refresh) {
        let labels = MENU.map(|(_, label)| label);
        let cursor = self.cursor();
        display::with(|panel| display::draw_menu(panel, "Settings", &labels, cursor));
    }

    fn menu(&mut self) -> Nav {
        match MENU[self.cursor()].0 {
            MenuItem::Bluetooth => {
                if let Err(e) = config_server::start(&self.ctx) {
                    warn!("UI: config server not started: {}", e);
                    self.ctx.sys.errors.set(Some(e));
                }
                Nav::Open(BLUETOOTH)
            }
            MenuItem::RefreshMinute => {
                self.ctx.sys.set_update_interval(60_000);
                Nav::Open(WATCH_FACE)
            }
            MenuItem::RefreshOff => {
                self.ctx.sys.set_update_interval(0);
                Nav::Open(WATCH_FACE)
            }
        }
    }

    fn back(&mut self) -> Nav {
        Nav::Open(WATCH_FACE)
    }

    fn up(&mut self) -> Nav {
        self.move_cursor(false)
    }

    fn down(&mut self) -> Nav {
        self.move_cursor(true)
    }
}

/// Entered with the server already launched; shows whether it is
/// still running.
pub struct BluetoothScreen;

impl Screen for BluetoothScreen {
    fn show(&mut self, _refresh: Refresh) {
        let running = config_server::is_running();
        display::with(|panel| display::draw_bluetooth(panel, running, BLE_DEVICE_NAME));
    }

    fn back(&mut self) -> Nav {
        config_server::stop();
        Nav::Open(SETTINGS)
    }
}

pub struct Screens {
    face: WatchFace,
    settings: SettingsMenu,
    bluetooth: BluetoothScreen,
}

impl Screens {
    pub fn new(ctx: BleContext) -> Self {
        Self {
            face: WatchFace { sys: ctx.sys },
            settings: SettingsMenu { ctx },
            bluetooth: BluetoothScreen,
        }
    }
}

impl ScreenTable for Screens {
    fn screen(&mut self, id: ScreenId) -> Option<&mut dyn Screen> {
        match id {
            WATCH_FACE => Some(&mut self.face),
            SETTINGS => Some(&mut self.settings),
            BLUETOOTH => Some(&mut self.bluetooth),
            _ => None,
        }
    }
}
