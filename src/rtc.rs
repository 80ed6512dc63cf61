//! PCF8563 real-time clock over async I²C.
//!
//! The chip keeps calendar time through deep sleep and drives the INT
//! pin that wakes the nRF52840 from System OFF. Both periodic wake
//! sources map onto it:
//!
//! - `Periodic::Timer`: the countdown timer, 1 Hz source for intervals
//!   up to 255 s, 1/60 Hz above that
//! - `Periodic::RtcAlarm`: the minute alarm, set to the next minute
//!
//! INT runs in level mode, so it stays asserted until the flag is
//! cleared. Every [`Rtc::configure_wakeup`] rewrites CTRL2 with TF and AF
//! zero, which releases the pin before the GPIO sense is armed.

use defmt::{debug, warn};
use embedded_hal_async::i2c::I2c;
use inkwatch::clock::{DateTime, Rtc};
use inkwatch::config::RTC_I2C_ADDR;
use inkwatch::wake::Periodic;
use inkwatch::Error;

const REG_CTRL1: u8 = 0x00;
const REG_CTRL2: u8 = 0x01;
const REG_SECONDS: u8 = 0x02;
const REG_MINUTE_ALARM: u8 = 0x09;
const REG_TIMER_CTRL: u8 = 0x0E;
const REG_TIMER: u8 = 0x0F;

const CTRL2_TIE: u8 = 1 << 0;
const CTRL2_AIE: u8 = 1 << 1;

/// Alarm register "disabled" bit.
const ALARM_AE: u8 = 1 << 7;
/// Seconds register "voltage low" bit: time integrity not guaranteed.
const SECONDS_VL: u8 = 1 << 7;
/// Month register century bit.
const MONTH_CENTURY: u8 = 1 << 7;

const TIMER_ENABLE: u8 = 1 << 7;
const TIMER_SRC_1HZ: u8 = 0b10;
const TIMER_SRC_1_60HZ: u8 = 0b11;

pub struct Pcf8563<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Pcf8563<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Power-on setup: clock running, interrupts and alarms off.
    pub async fn start(&mut self) -> Result<(), Error> {
        self.write_regs(REG_CTRL1, &[0x00, 0x00]).await?;
        self.disable_alarm().await?;
        self.write_regs(REG_TIMER_CTRL, &[TIMER_SRC_1_60HZ]).await
    }

    async fn disable_alarm(&mut self) -> Result<(), Error> {
        self.write_regs(REG_MINUTE_ALARM, &[ALARM_AE; 4]).await
    }

    async fn write_regs(&mut self, reg: u8, values: &[u8]) -> Result<(), Error> {
        let mut buf = [0u8; 8];
        let len = values.len() + 1;
        buf[0] = reg;
        buf[1..len].copy_from_slice(values);
        self.i2c
            .write(RTC_I2C_ADDR, &buf[..len])
            .await
            .map_err(|_| Error::Hardware)
    }
}

impl<I2C: I2c> Rtc for Pcf8563<I2C> {
    async fn read(&mut self) -> Result<DateTime, Error> {
        let mut buf = [0u8; 7];
        self.i2c
            .write_read(RTC_I2C_ADDR, &[REG_SECONDS], &mut buf)
            .await
            .map_err(|_| Error::Hardware)?;

        if buf[0] & SECONDS_VL != 0 {
            warn!("RTC: voltage-low flag set, time may be wrong");
        }
        let century = if buf[5] & MONTH_CENTURY != 0 { 1900 } else { 2000 };
        Ok(DateTime {
            year: century + bcd_decode(buf[6]) as u16,
            month: bcd_decode(buf[5] & 0x1F),
            day: bcd_decode(buf[3] & 0x3F),
            hour: bcd_decode(buf[2] & 0x3F),
            minute: bcd_decode(buf[1] & 0x7F),
            second: bcd_decode(buf[0] & 0x7F),
        })
    }

    async fn write(&mut self, time: &DateTime) -> Result<(), Error> {
        let century = if time.year < 2000 { MONTH_CENTURY } else { 0 };
        self.write_regs(
            REG_SECONDS,
            &[
                bcd_encode(time.second),
                bcd_encode(time.minute),
                bcd_encode(time.hour),
                bcd_encode(time.day),
                time.weekday(),
                bcd_encode(time.month) | century,
                bcd_encode((time.year % 100) as u8),
            ],
        )
        .await
    }

    async fn configure_wakeup(&mut self, periodic: Periodic) -> Result<(), Error> {
        match periodic {
            Periodic::Off => {
                self.write_regs(REG_TIMER_CTRL, &[TIMER_SRC_1_60HZ]).await?;
                self.disable_alarm().await?;
                self.write_regs(REG_CTRL2, &[0]).await
            }
            Periodic::Timer { interval_ms } => {
                let (source, count) = timer_setting(interval_ms);
                debug!("RTC: countdown {} ticks (source {})", count, source);
                self.disable_alarm().await?;
                self.write_regs(REG_TIMER_CTRL, &[source]).await?;
                self.write_regs(REG_TIMER, &[count]).await?;
                self.write_regs(REG_TIMER_CTRL, &[TIMER_ENABLE | source])
                    .await?;
                self.write_regs(REG_CTRL2, &[CTRL2_TIE]).await
            }
            Periodic::RtcAlarm => {
                let now = self.read().await?;
                let next = bcd_encode((now.minute + 1) % 60);
                self.write_regs(REG_TIMER_CTRL, &[TIMER_SRC_1_60HZ]).await?;
                self.write_regs(REG_MINUTE_ALARM, &[next, ALARM_AE, ALARM_AE, ALARM_AE])
                    .await?;
                self.write_regs(REG_CTRL2, &[CTRL2_AIE]).await
            }
        }
    }
}

/// Countdown source and count for an interval, rounded to what the
/// 8-bit counter can express.
fn timer_setting(interval_ms: u32) -> (u8, u8) {
    let secs = interval_ms.div_ceil(1000).max(1);
    if secs <= 255 {
        (TIMER_SRC_1HZ, secs as u8)
    } else {
        let minutes = (secs + 30) / 60;
        if minutes > 255 {
            warn!("RTC: {} min countdown capped at 255", minutes);
        }
        (TIMER_SRC_1_60HZ, minutes.min(255) as u8)
    }
}

fn bcd_decode(v: u8) -> u8 {
    (v & 0x0F) + ((v >> 4) * 10)
}

fn bcd_encode(v: u8) -> u8 {
    ((v / 10) << 4) | (v % 10)
}
