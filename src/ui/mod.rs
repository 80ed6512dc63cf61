//! User interface subsystem - panel + physical buttons.
//!
//! ## Components
//!
//! - **Display**: SSD1306 128×64 OLED via I²C (stands in for the e-paper
//!   panel on the dev board)
//! - **Buttons**: 4 tactile switches (MENU, BACK, UP, DOWN) feeding the
//!   shared debouncer
//! - **Screens**: watch face, settings menu, Bluetooth

pub mod buttons;
pub mod display;
pub mod screens;
