//! Network-backed background work: time sync, location and weather.
//!
//! Each operation follows the same shape:
//!
//! 1. consult its retained [`RateGate`] (too early → `RateLimited`, which
//!    is not a failure),
//! 2. take a radio lease (`RadioFailed` if the link will not come up),
//! 3. fetch from its source under a timeout,
//! 4. return the lease, publish the result, update the gate and the
//!    shared error slot.
//!
//! The sources themselves (SNTP, HTTP/JSON) are collaborators behind the
//! [`TimeSource`], [`LocationSource`] and [`WeatherSource`] traits. These
//! functions are meant to run as the body of a
//! [`BackgroundTask`](crate::task::BackgroundTask), which is what turns a
//! second concurrent request into `NotReady`.

mod gate;

pub use gate::RateGate;

use embassy_time::{with_timeout, Duration};
use heapless::String;

use crate::clock::Rtc;
use crate::config::{
    DEFAULT_CITY, DEFAULT_TEMPERATURE_C, DEFAULT_WEATHER_CODE, FETCH_TIMEOUT_SECS,
    LOCATION_UPDATE_INTERVAL_SECS, TIME_SYNC_INTERVAL_SECS, TIME_SYNC_TIMEOUT_SECS,
    WEATHER_UPDATE_INTERVAL_SECS,
};
use crate::error::Error;
use crate::event::{truncated, EventKind, Location, TimeValue};
use crate::radio::{RadioLink, RadioShare};
use crate::retained::Retained;
use crate::system::System;

/// Last known conditions.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Weather {
    pub temperature_c: i16,
    /// OpenWeatherMap-style condition code.
    pub condition: u16,
    pub city: String<30>,
}

impl Weather {
    pub fn new(temperature_c: i16, condition: u16, city: &str) -> Self {
        Self {
            temperature_c,
            condition,
            city: truncated(city),
        }
    }
}

impl Default for Weather {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPERATURE_C, DEFAULT_WEATHER_CODE, DEFAULT_CITY)
    }
}

#[allow(async_fn_in_trait)]
pub trait TimeSource {
    async fn fetch_time(&mut self) -> Result<TimeValue, Error>;
}

#[allow(async_fn_in_trait)]
pub trait LocationSource {
    async fn fetch_location(&mut self) -> Result<Location, Error>;
}

#[allow(async_fn_in_trait)]
pub trait WeatherSource {
    async fn fetch_weather(&mut self, at: &Location) -> Result<Weather, Error>;
}

/// Fetch the time and post a `TimeSync` event. The dispatcher applies it.
pub async fn sync_time<R, L, S>(
    sys: &System<R>,
    radio: &RadioShare<L>,
    source: &mut S,
) -> Result<TimeValue, Error>
where
    R: Rtc,
    L: RadioLink,
    S: TimeSource,
{
    let now = sys.clock.now().secs;
    let result = async {
        sys.retained
            .with(|r| r.time_sync.check(now, TIME_SYNC_INTERVAL_SECS))?;
        let lease = radio.acquire().await?;
        let fetched = with_timeout(
            Duration::from_secs(TIME_SYNC_TIMEOUT_SECS),
            source.fetch_time(),
        )
        .await;
        lease.release().await;

        let time = fetched.map_err(|_| Error::Timeout).and_then(|r| r)?;
        sys.post(EventKind::TimeSync(time));
        Ok::<_, Error>(time)
    }
    .await;

    let stamp = result.as_ref().map_or(now, |t| t.secs);
    finish(sys, "time sync", stamp, &result, |r| &mut r.time_sync);
    result
}

/// Fetch the current location and post a `LocationUpdate` event.
pub async fn fetch_location<R, L, S>(
    sys: &System<R>,
    radio: &RadioShare<L>,
    source: &mut S,
) -> Result<Location, Error>
where
    R: Rtc,
    L: RadioLink,
    S: LocationSource,
{
    let now = sys.clock.now().secs;
    let result = async {
        sys.retained
            .with(|r| r.location_gate.check(now, LOCATION_UPDATE_INTERVAL_SECS))?;
        let lease = radio.acquire().await?;
        let fetched = with_timeout(
            Duration::from_secs(FETCH_TIMEOUT_SECS),
            source.fetch_location(),
        )
        .await;
        lease.release().await;

        let location = fetched.map_err(|_| Error::Timeout).and_then(|r| r)?;
        sys.post(EventKind::LocationUpdate(location.clone()));
        Ok::<_, Error>(location)
    }
    .await;

    finish(sys, "location", now, &result, |r| &mut r.location_gate);
    result
}

/// Fetch the weather for the current location. Always yields a value:
/// on any error (including `RateLimited`) the cached conditions come
/// back, and the error is left in the error slot.
pub async fn fetch_weather<R, L, S>(
    sys: &System<R>,
    radio: &RadioShare<L>,
    source: &mut S,
) -> Weather
where
    R: Rtc,
    L: RadioLink,
    S: WeatherSource,
{
    let now = sys.clock.now().secs;
    let result = async {
        sys.retained
            .with(|r| r.weather_gate.check(now, WEATHER_UPDATE_INTERVAL_SECS))?;
        let at = sys.location();
        let lease = radio.acquire().await?;
        let fetched = with_timeout(
            Duration::from_secs(FETCH_TIMEOUT_SECS),
            source.fetch_weather(&at),
        )
        .await;
        lease.release().await;

        let weather = fetched.map_err(|_| Error::Timeout).and_then(|r| r)?;
        sys.retained.with(|r| r.weather = weather.clone());
        Ok::<_, Error>(weather)
    }
    .await;

    finish(sys, "weather", now, &result, |r| &mut r.weather_gate);
    match result {
        Ok(weather) => weather,
        Err(_) => sys.retained.with(|r| r.weather.clone()),
    }
}

fn finish<R, T>(
    sys: &System<R>,
    what: &'static str,
    now: u64,
    result: &Result<T, Error>,
    gate: impl FnOnce(&mut Retained) -> &mut RateGate,
) where
    R: Rtc,
{
    match result {
        Ok(_) => {
            info!("Net: {} ok", what);
            sys.retained.with(|r| gate(r).succeeded(now));
        }
        Err(Error::RateLimited) => debug!("Net: {} rate limited", what),
        Err(e) => {
            warn!("Net: {} failed: {:?}", what, e);
            sys.retained.with(|r| gate(r).failed(now));
        }
    }
    sys.errors.record(result);
}

#[cfg(test)]
mod tests;
