//! nRF52840 board hooks: wake cause, retention RAM, GPIO-sense wake
//! arming and System OFF.
//!
//! Everything here runs with the SoftDevice enabled, so POWER registers
//! are reached through `sd_power_*` calls. GPIO is not SoftDevice
//! protected and is programmed directly through the PAC.

use core::mem::MaybeUninit;
use core::ptr::{addr_of, addr_of_mut};

use defmt::{info, warn};
use embassy_nrf::pac;
use embassy_nrf::pac::gpio::vals::{Dir, Input, Pull, Sense};
use inkwatch::config::{BUTTON_PINS, RTC_INT_PIN};
use inkwatch::power_logic::button_from_wake_mask;
use inkwatch::retained::{Retained, RetainedImage, RETAINED_MAGIC, RETAINED_VERSION};
use inkwatch::wake::{Periodic, SleepPlan, WakeCause};
use inkwatch::{Board, Button, ButtonMask, Error};
use nrf_softdevice::raw;

use crate::ui::display;

/// RESETREAS.OFF: reset caused by a GPIO DETECT wake from System OFF.
const RESETREAS_OFF: u32 = 1 << 16;

/// RAM[n].POWER SnRETENTION bits: RAM0-7 have two sections each.
const RAM_RETAIN_SMALL: u32 = 0b11 << 16;

/// RAM8 has six 32 KiB sections and holds the application RAM
/// (0x2002_0000 onwards, see memory.x).
const RAM8_RETAIN_ALL: u32 = 0b11_1111 << 16;

/// Survives System OFF: left untouched by the runtime's RAM init.
#[link_section = ".uninit.RETAINED"]
static mut RETAINED: MaybeUninit<RetainedImage> = MaybeUninit::uninit();

pub struct NrfBoard {
    reset_reason: u32,
    latched: u32,
}

impl NrfBoard {
    /// Snapshot and clear the reset reason and GPIO latch. Call once,
    /// right after the SoftDevice is enabled.
    pub fn capture() -> Self {
        let mut reset_reason = 0u32;
        unsafe {
            raw::sd_power_reset_reason_get(&mut reset_reason);
            raw::sd_power_reset_reason_clr(reset_reason);
        }

        let latched = pac::P0.latch().read().0;
        pac::P0.latch().write_value(pac::gpio::regs::Latch(latched));

        info!(
            "Board: RESETREAS={:#010x} LATCH={:#010x}",
            reset_reason, latched
        );
        Self {
            reset_reason,
            latched,
        }
    }

    pub fn is_cold(&self) -> bool {
        self.reset_reason & RESETREAS_OFF == 0
    }

    fn latched_buttons(&self) -> ButtonMask {
        Button::ALL
            .iter()
            .zip(BUTTON_PINS)
            .filter(|(_, pin)| self.latched & (1 << pin) != 0)
            .fold(ButtonMask::NONE, |mask, (button, _)| mask.with(*button))
    }

    fn read_image(&self) -> Option<Retained> {
        // Check the header before trusting anything else in the region.
        let image = unsafe { (*addr_of!(RETAINED)).as_ptr() };
        let (magic, version) = unsafe {
            (
                core::ptr::read_volatile(addr_of!((*image).magic)),
                core::ptr::read_volatile(addr_of!((*image).version)),
            )
        };
        if !RetainedImage::header_matches(magic, version) {
            if magic != 0 {
                warn!(
                    "Board: retained header {:#x}/{} != {:#x}/{}",
                    magic, version, RETAINED_MAGIC, RETAINED_VERSION
                );
            }
            return None;
        }
        unsafe { (*image).restore() }
    }
}

impl Board for NrfBoard {
    fn wake_cause(&mut self) -> WakeCause {
        if self.is_cold() {
            return WakeCause::ColdBoot;
        }
        if let Some(button) = button_from_wake_mask(self.latched_buttons()) {
            return WakeCause::Button(button);
        }
        if self.latched & (1 << RTC_INT_PIN) != 0 {
            // Only one periodic source was armed; the image says which.
            let alarm = self
                .read_image()
                .is_some_and(|r| r.wake.periodic() == Periodic::RtcAlarm);
            return if alarm {
                WakeCause::RtcAlarm
            } else {
                WakeCause::Timer
            };
        }
        warn!("Board: System OFF wake without a latched pin");
        WakeCause::ColdBoot
    }

    fn load_retained(&mut self) -> Option<Retained> {
        self.read_image()
    }

    fn store_retained(&mut self, state: &Retained) {
        let image = RetainedImage::seal(state);
        unsafe {
            core::ptr::write_volatile((*addr_of_mut!(RETAINED)).as_mut_ptr(), image);
        }
    }

    async fn cold_boot(&mut self) -> Result<(), Error> {
        if display::with(|panel| display::clear(panel)).is_none() {
            warn!("Board: no panel attached");
        }
        Ok(())
    }

    fn arm(&mut self, plan: &SleepPlan) -> Result<(), Error> {
        for (button, pin) in Button::ALL.iter().zip(BUTTON_PINS) {
            let sense = if plan.buttons.contains(*button) {
                Sense::LOW
            } else {
                Sense::DISABLED
            };
            configure_wake_pin(pin, sense);
        }

        // Timer and alarm both come in through the RTC's INT pin.
        let rtc_sense = if plan.periodic == Periodic::Off {
            Sense::DISABLED
        } else {
            Sense::LOW
        };
        configure_wake_pin(RTC_INT_PIN, rtc_sense);

        // Detect through LATCH so the next wake can tell the pins apart.
        pac::P0
            .detectmode()
            .write(|w| w.set_detectmode(pac::gpio::vals::Detectmode::LDETECT));
        pac::P0.latch().write_value(pac::gpio::regs::Latch(u32::MAX));

        for block in 0..=8u8 {
            let mask = if block == 8 {
                RAM8_RETAIN_ALL
            } else {
                RAM_RETAIN_SMALL
            };
            let err = unsafe { raw::sd_power_ram_power_set(block, mask) };
            if err != raw::NRF_SUCCESS {
                warn!("Board: RAM{} retention failed ({})", block, err);
                return Err(Error::Hardware);
            }
        }
        Ok(())
    }

    fn hibernate_display(&mut self) {
        display::with(|panel| display::sleep(panel));
    }

    fn deep_sleep(&mut self) -> ! {
        info!("Board: System OFF");
        unsafe {
            raw::sd_power_system_off();
        }
        // Only reached under a debugger, where System OFF is emulated.
        loop {
            cortex_m::asm::wfe();
        }
    }
}

fn configure_wake_pin(pin: u8, sense: Sense) {
    pac::P0.pin_cnf(pin as usize).write(|w| {
        w.set_dir(Dir::INPUT);
        w.set_input(Input::CONNECT);
        w.set_pull(Pull::PULLUP);
        w.set_sense(sense);
    });
}
