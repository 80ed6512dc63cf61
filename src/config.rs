//! Application-wide constants and compile-time configuration.
//!
//! Timing parameters, queue and registry capacities, rate-limit
//! intervals, factory defaults and reference-board pin assignments live
//! here so they can be tuned in one place. Runtime-tunable values (the
//! wake interval, the armed button mask) are kept in the retained
//! [`WakeConfig`](crate::wake::WakeConfig) instead.

// Input

/// Minimum spacing between two accepted presses of the same button (ms).
pub const DEBOUNCE_WINDOW_MS: u64 = 150;

// Event delivery

/// Slots in the event queue. Events posted while it is full are dropped.
pub const EVENT_QUEUE_CAPACITY: usize = 10;

/// How long one `receive` waits before the dispatcher re-checks the
/// task registry (ms).
pub const DRAIN_RECEIVE_TIMEOUT_MS: u64 = 50;

// Background work

/// Maximum number of simultaneously registered background activities.
pub const TASK_REGISTRY_CAPACITY: usize = 8;

/// Maximum number of on-wake callbacks.
pub const ON_WAKE_CAPACITY: usize = 8;

// Wake sources

/// Factory-default periodic wake interval (ms). 0 disables the timer.
pub const DEFAULT_UPDATE_INTERVAL_MS: u32 = 60_000;

/// Longest periodic wake interval (ms): 255 ticks of the RTC countdown
/// at 1/60 Hz. Longer settings are clamped.
pub const MAX_UPDATE_INTERVAL_MS: u32 = 255 * 60 * 1000;

// Network collaborators

/// Minimum spacing between location fetches (seconds).
pub const LOCATION_UPDATE_INTERVAL_SECS: u64 = 5 * 60;

/// Minimum spacing between weather fetches (seconds).
pub const WEATHER_UPDATE_INTERVAL_SECS: u64 = 30 * 60;

/// Minimum spacing between time syncs (seconds).
pub const TIME_SYNC_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Upper bound on one time-sync exchange (seconds).
pub const TIME_SYNC_TIMEOUT_SECS: u64 = 15;

/// Upper bound on one HTTP-style fetch (seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 10;

/// Consecutive failures tolerated before a gate backs off for a full
/// interval.
pub const MAX_NETWORK_ATTEMPTS: u8 = 3;

/// 2000-01-01T00:00:00Z as a Unix timestamp. Anything earlier means the
/// clock (or a gate) was never set.
pub const SECS_YR_2000: u64 = 946_684_800;

/// 2100-01-01T00:00:00Z. The RTC calendar ends just before it.
pub const SECS_YR_2100: u64 = 4_102_444_800;

// Factory location (Melbourne)

pub const DEFAULT_LATITUDE: f32 = -37.8136;
pub const DEFAULT_LONGITUDE: f32 = 144.9631;
pub const DEFAULT_CITY: &str = "Melbourne";
/// POSIX TZ string for the default location.
pub const DEFAULT_TIMEZONE: &str = "AEST-10AEDT,M10.1.0,M4.1.0/3";

/// Temperature shown before the first successful weather fetch (°C).
pub const DEFAULT_TEMPERATURE_C: i16 = 22;
/// OpenWeatherMap-style condition code ("clear sky").
pub const DEFAULT_WEATHER_CODE: u16 = 800;

// GPIO pin assignments (reference board)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`. All buttons are active-low with internal pull-ups.
//
//   Button MENU    → P0.11
//   Button BACK    → P0.12
//   Button UP      → P0.24
//   Button DOWN    → P0.25
//   RTC INT        → P0.02  (open-drain, active-low)
//   RTC I²C SDA    → P0.26
//   RTC I²C SCL    → P0.27
//   Panel I²C SDA  → P0.30
//   Panel I²C SCL  → P0.31

/// Port-0 pin numbers, in `Button` order (Menu, Back, Up, Down).
pub const BUTTON_PINS: [u8; 4] = [11, 12, 24, 25];

/// Port-0 pin wired to the RTC interrupt output.
pub const RTC_INT_PIN: u8 = 2;

/// Seven-bit I²C address of the PCF8563 RTC.
pub const RTC_I2C_ADDR: u8 = 0x51;

// BLE configuration server

/// Name advertised while the configuration server runs.
pub const BLE_DEVICE_NAME: &str = "inkwatch";

/// Give up advertising after this long without a central (seconds).
pub const BLE_ADVERTISE_TIMEOUT_SECS: u64 = 120;
