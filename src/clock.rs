//! Wall-clock time backed by the external RTC.
//!
//! The RTC keeps counting through deep sleep; on every wake the wall
//! clock is re-anchored from it, and between reads it advances with the
//! monotonic `embassy_time` tick. A time sync writes the RTC and moves the
//! anchor. The anchor is swapped in a single critical section, so a
//! screen reading [`Clock::now`] never sees a half-updated value.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Instant;

use crate::config::SECS_YR_2000;
use crate::error::Error;
use crate::event::TimeValue;
use crate::wake::Periodic;

/// The battery-backed calendar chip.
#[allow(async_fn_in_trait)]
pub trait Rtc {
    async fn read(&mut self) -> Result<DateTime, Error>;
    async fn write(&mut self, time: &DateTime) -> Result<(), Error>;
    /// Program the chip's periodic interrupt for the coming sleep.
    async fn configure_wakeup(&mut self, periodic: Periodic) -> Result<(), Error>;
}

/// Broken-down UTC time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub year: u16,
    /// 1-12
    pub month: u8,
    /// 1-31
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    pub fn from_unix(secs: u64) -> Self {
        let days = (secs / 86_400) as i64;
        let rem = secs % 86_400;
        let (year, month, day) = civil_from_days(days);
        Self {
            year: year as u16,
            month,
            day,
            hour: (rem / 3600) as u8,
            minute: (rem / 60 % 60) as u8,
            second: (rem % 60) as u8,
        }
    }

    pub fn to_unix(&self) -> u64 {
        let days = days_from_civil(self.year as i64, self.month, self.day);
        let secs = days * 86_400
            + self.hour as i64 * 3600
            + self.minute as i64 * 60
            + self.second as i64;
        secs.max(0) as u64
    }

    /// Day of the week, 0 = Sunday.
    pub fn weekday(&self) -> u8 {
        let days = days_from_civil(self.year as i64, self.month, self.day);
        (days + 4).rem_euclid(7) as u8
    }

    /// Whether every field is in range for a 2000-2099 calendar chip.
    pub fn is_valid(&self) -> bool {
        (2000..=2099).contains(&self.year)
            && (1..=12).contains(&self.month)
            && self.day >= 1
            && self.day <= days_in_month(self.year, self.month)
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
    }

    /// Clamp out-of-range fields so a garbled RTC still yields a usable
    /// time.
    pub fn fixed(&self) -> Self {
        let year = self.year.clamp(2000, 2099);
        let month = if (1..=12).contains(&self.month) { self.month } else { 1 };
        let day = if self.day >= 1 && self.day <= days_in_month(year, month) {
            self.day
        } else {
            1
        };
        Self {
            year,
            month,
            day,
            hour: if self.hour < 24 { self.hour } else { 0 },
            minute: if self.minute < 60 { self.minute } else { 0 },
            second: if self.second < 60 { self.second } else { 0 },
        }
    }
}

fn is_leap(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap(year) => 29,
        2 => 28,
        _ => 0,
    }
}

// Howard Hinnant's proleptic Gregorian day-count algorithms.
fn days_from_civil(year: i64, month: u8, day: u8) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let mp = (month as i64 + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

/// Standard-time UTC offset (seconds east of Greenwich) of a POSIX TZ
/// string such as `AEST-10AEDT,M10.1.0,M4.1.0/3` or `<+0530>-5:30`.
/// Daylight-saving rules are not evaluated.
pub fn utc_offset_secs(tz: &str) -> Option<i32> {
    let rest = if let Some(quoted) = tz.strip_prefix('<') {
        &quoted[quoted.find('>')? + 1..]
    } else {
        let name_len = tz.bytes().take_while(u8::is_ascii_alphabetic).count();
        if name_len < 3 {
            return None;
        }
        &tz[name_len..]
    };

    let (sign, rest) = match rest.as_bytes().first()? {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => (1, rest),
    };

    // hh[:mm[:ss]], hours up to 24 as POSIX allows.
    const FIELDS: [(i32, i32); 3] = [(3600, 24), (60, 59), (1, 59)];

    let mut total = 0i32;
    for (part, (scale, max)) in rest.split(':').zip(FIELDS) {
        let digits = part.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            break;
        }
        if digits > 2 {
            return None;
        }
        let value: i32 = part[..digits].parse().ok()?;
        if value > max {
            return None;
        }
        total += value * scale;
        if digits < part.len() {
            break;
        }
    }

    if rest.bytes().next().is_some_and(|b| b.is_ascii_digit()) {
        // POSIX offsets are west-positive.
        Some(-sign * total)
    } else {
        None
    }
}

#[derive(Clone, Copy)]
struct Anchor {
    base: TimeValue,
    at_us: u64,
}

/// The RTC plus the running wall clock derived from it.
pub struct Clock<R> {
    rtc: Mutex<CriticalSectionRawMutex, R>,
    anchor: BlockingMutex<CriticalSectionRawMutex, Cell<Anchor>>,
}

impl<R: Rtc> Clock<R> {
    pub const fn new(rtc: R) -> Self {
        Self {
            rtc: Mutex::new(rtc),
            anchor: BlockingMutex::new(Cell::new(Anchor {
                base: TimeValue { secs: 0, micros: 0 },
                at_us: 0,
            })),
        }
    }

    /// Current UTC time.
    pub fn now(&self) -> TimeValue {
        let anchor = self.anchor.lock(|a| a.get());
        let elapsed = Instant::now().as_micros().saturating_sub(anchor.at_us);
        TimeValue::from_micros(anchor.base.as_micros().saturating_add(elapsed))
    }

    /// Current time in the standard time of `tz`.
    pub fn local_now(&self, tz: &str) -> DateTime {
        let offset = utc_offset_secs(tz).unwrap_or(0) as i64;
        let secs = (self.now().secs as i64 + offset).max(0) as u64;
        DateTime::from_unix(secs)
    }

    /// Whether the clock holds a plausible (post-2000) time.
    pub fn is_set(&self) -> bool {
        self.now().secs >= SECS_YR_2000
    }

    /// Re-anchor the wall clock from the RTC, repairing garbage fields.
    pub async fn load_from_rtc(&self) -> Result<TimeValue, Error> {
        let mut rtc = self.rtc.lock().await;
        let read = rtc.read().await?;
        let time = if read.is_valid() {
            read
        } else {
            let repaired = read.fixed();
            warn!("Clock: RTC held an invalid time, repairing");
            rtc.write(&repaired).await?;
            repaired
        };

        let value = TimeValue::from_secs(time.to_unix());
        self.set_wall(value);
        Ok(value)
    }

    /// Set RTC and wall clock together.
    ///
    /// The wall clock is updated even when the RTC write fails, so this
    /// wake still shows the right time; the error is returned for the
    /// caller to record.
    pub async fn set(&self, value: TimeValue) -> Result<(), Error> {
        let mut rtc = self.rtc.lock().await;
        let written = rtc.write(&DateTime::from_unix(value.secs)).await;
        self.set_wall(value);
        info!("Clock: set to {}", value.secs);
        written
    }

    /// Program the RTC's periodic interrupt.
    pub async fn configure_wakeup(&self, periodic: Periodic) -> Result<(), Error> {
        self.rtc.lock().await.configure_wakeup(periodic).await
    }

    /// Run `f` with exclusive access to the RTC driver.
    pub async fn with_rtc<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        let mut rtc = self.rtc.lock().await;
        f(&mut rtc)
    }

    fn set_wall(&self, value: TimeValue) {
        let at_us = Instant::now().as_micros();
        self.anchor.lock(|a| a.set(Anchor { base: value, at_us }));
    }
}
