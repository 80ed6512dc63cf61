//! SSD1306 panel wrapper.
//!
//! The dev board carries a 128×64 SSD1306 in place of the e-paper
//! module. One panel instance lives in [`PANEL`]; screens and the board
//! reach it through [`with`].

use core::cell::RefCell;
use core::fmt::Write;

use embassy_nrf::peripherals::TWISPI1;
use embassy_nrf::twim::Twim;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use heapless::String;
use inkwatch::clock::DateTime;
use inkwatch::net::Weather;
use inkwatch::screen::Refresh;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

/// Type alias for the concrete display driver.
pub type Display<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

pub type Panel = Display<Twim<'static, TWISPI1>>;

static PANEL: Mutex<CriticalSectionRawMutex, RefCell<Option<Panel>>> =
    Mutex::new(RefCell::new(None));

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Initialise the SSD1306 display and clear the screen.
pub fn init<I2C>(i2c: I2C) -> Display<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    let interface = I2CDisplayInterface::new(i2c);
    let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    let _ = display.init();
    display.clear_buffer();
    let _ = display.flush();
    display
}

pub fn install(panel: Panel) {
    PANEL.lock(|p| *p.borrow_mut() = Some(panel));
}

/// Run `f` on the panel, if one was installed.
pub fn with<R>(f: impl FnOnce(&mut Panel) -> R) -> Option<R> {
    PANEL.lock(|p| p.borrow_mut().as_mut().map(f))
}

fn style(font: &'static MonoFont<'static>) -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(font)
        .text_color(BinaryColor::On)
        .build()
}

fn text(display: &mut Panel, s: &str, x: i32, y: i32) {
    let _ = Text::new(s, Point::new(x, y), style(&FONT_6X10)).draw(display);
}

/// Start a frame. A full refresh also blanks the glass first.
fn begin(display: &mut Panel, refresh: Refresh) {
    display.clear_buffer();
    if refresh == Refresh::Full {
        let _ = display.flush();
    }
}

pub fn clear(display: &mut Panel) {
    display.clear_buffer();
    let _ = display.flush();
}

/// Panel off until the next wake re-initialises it.
pub fn sleep(display: &mut Panel) {
    let _ = display.set_display_on(false);
}

pub fn draw_watch_face(
    display: &mut Panel,
    refresh: Refresh,
    local: &DateTime,
    weather: &Weather,
    status: &str,
) {
    begin(display, refresh);

    let mut clock: String<8> = String::new();
    let _ = write!(clock, "{:02}:{:02}", local.hour, local.minute);
    let _ = Text::new(clock.as_str(), Point::new(14, 24), style(&FONT_10X20)).draw(display);

    let mut date: String<20> = String::new();
    let weekday = WEEKDAYS[local.weekday() as usize % 7];
    let _ = write!(date, "{} {:02}/{:02}", weekday, local.day, local.month);
    text(display, date.as_str(), 0, 40);

    let mut wx: String<40> = String::new();
    let _ = write!(wx, "{}C {}", weather.temperature_c, weather.city.as_str());
    text(display, wx.as_str(), 0, 52);

    if status != "OK" {
        text(display, status, 0, 63);
    }

    let _ = display.flush();
}

/// Render a list with a `>` marker on the selected row.
pub fn draw_menu(display: &mut Panel, title: &str, items: &[&str], selected: usize) {
    begin(display, Refresh::Partial);

    text(display, title, 0, 10);
    for (row, item) in items.iter().take(4).enumerate() {
        let marker = if row == selected { ">" } else { " " };
        let mut line: String<24> = String::new();
        let _ = write!(line, "{} {}", marker, item);
        let y = 24 + (row as i32 * 10);
        text(display, line.as_str(), 0, y);
    }

    let _ = display.flush();
}

pub fn draw_bluetooth(display: &mut Panel, advertising: bool, name: &str) {
    begin(display, Refresh::Partial);

    text(display, "Bluetooth", 0, 10);
    if advertising {
        text(display, "Advertising as", 0, 24);
        text(display, name, 0, 36);
    } else {
        text(display, "Stopped", 0, 24);
    }
    text(display, "BACK: stop", 0, 60);

    let _ = display.flush();
}
