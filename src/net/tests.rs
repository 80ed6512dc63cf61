//! Network collaborator tests.

use super::*;
use crate::event::EventId;
use crate::task::BackgroundTask;
use crate::testing::{FakeLink, FakeRtc};
use embassy_futures::block_on;

const T0: u64 = 1_800_000_000;

struct FixedTime(Result<TimeValue, Error>);

impl TimeSource for FixedTime {
    async fn fetch_time(&mut self) -> Result<TimeValue, Error> {
        self.0
    }
}

struct FixedLocation(Result<Location, Error>);

impl LocationSource for FixedLocation {
    async fn fetch_location(&mut self) -> Result<Location, Error> {
        self.0.clone()
    }
}

struct FixedWeather {
    result: Result<Weather, Error>,
    asked_for: Option<Location>,
}

impl WeatherSource for FixedWeather {
    async fn fetch_weather(&mut self, at: &Location) -> Result<Weather, Error> {
        self.asked_for = Some(at.clone());
        self.result.clone()
    }
}

fn system_at(secs: u64) -> System<FakeRtc> {
    let sys = System::new(FakeRtc::at(secs));
    block_on(sys.clock.load_from_rtc()).unwrap();
    sys
}

// ════════════════════════════════════════════════════════════════════════
// Time sync
// ════════════════════════════════════════════════════════════════════════

#[test]
fn time_sync_posts_event_and_returns_radio() {
    let sys = system_at(T0);
    let (link, stats) = FakeLink::new();
    let radio = RadioShare::new(link);
    let mut source = FixedTime(Ok(TimeValue::from_secs(T0 + 42)));

    let got = block_on(sync_time(&sys, &radio, &mut source)).unwrap();
    assert_eq!(got.secs, T0 + 42);

    let event = sys.queue.try_receive().unwrap();
    assert_eq!(event.kind, EventKind::TimeSync(TimeValue::from_secs(T0 + 42)));
    assert_eq!(sys.errors.last(), None);
    assert_eq!((stats.connects(), stats.disconnects()), (1, 1));
    assert_eq!(
        sys.retained.with(|r| r.time_sync.last_success()),
        Some(T0 + 42)
    );
}

#[test]
fn time_sync_radio_failure_is_recorded() {
    let sys = system_at(T0);
    let (mut link, stats) = FakeLink::new();
    link.fail = true;
    let radio = RadioShare::new(link);
    let mut source = FixedTime(Ok(TimeValue::from_secs(T0)));

    let got = block_on(sync_time(&sys, &radio, &mut source));
    assert_eq!(got, Err(Error::RadioFailed));
    assert_eq!(sys.errors.last(), Some(Error::RadioFailed));
    assert!(sys.queue.is_empty());
    assert_eq!(stats.disconnects(), 0);
    assert_eq!(sys.retained.with(|r| r.time_sync.failures()), 1);
}

#[test]
fn time_sync_source_error_still_releases_radio() {
    let sys = system_at(T0);
    let (link, stats) = FakeLink::new();
    let radio = RadioShare::new(link);
    let mut source = FixedTime(Err(Error::RequestFailed));

    let got = block_on(sync_time(&sys, &radio, &mut source));
    assert_eq!(got, Err(Error::RequestFailed));
    assert_eq!((stats.connects(), stats.disconnects()), (1, 1));
    assert!(!block_on(radio.is_connected()));
}

#[test]
fn second_sync_within_interval_is_rate_limited() {
    let sys = system_at(T0);
    let (link, stats) = FakeLink::new();
    let radio = RadioShare::new(link);
    let mut source = FixedTime(Ok(TimeValue::from_secs(T0)));

    block_on(sync_time(&sys, &radio, &mut source)).unwrap();
    let again = block_on(sync_time(&sys, &radio, &mut source));

    assert_eq!(again, Err(Error::RateLimited));
    assert_eq!(sys.errors.status(), "RATE_LIMITED");
    assert!(!Error::RateLimited.is_failure());
    assert_eq!(stats.connects(), 1);
    assert_eq!(sys.retained.with(|r| r.time_sync.failures()), 0);
}

#[test]
fn concurrent_sync_launch_is_not_ready() {
    let sys = system_at(T0);
    let task = BackgroundTask::new("timeSync");

    let running = task.begin(&sys.tasks).unwrap();
    assert!(matches!(task.begin(&sys.tasks), Err(Error::NotReady)));
    drop(running);
}

// ════════════════════════════════════════════════════════════════════════
// Location
// ════════════════════════════════════════════════════════════════════════

#[test]
fn location_fetch_posts_update() {
    let sys = system_at(T0);
    let (link, _) = FakeLink::new();
    let radio = RadioShare::new(link);
    let paris = Location::new(48.8566, 2.3522, "CET-1CEST,M3.5.0,M10.5.0/3", "Paris");
    let mut source = FixedLocation(Ok(paris.clone()));

    let got = block_on(fetch_location(&sys, &radio, &mut source)).unwrap();
    assert_eq!(got, paris);

    let event = sys.queue.try_receive().unwrap();
    assert_eq!(event.id(), EventId::LocationUpdate);
    assert_eq!(event.kind, EventKind::LocationUpdate(paris));

    // Applying the update is the dispatcher's job.
    assert_eq!(sys.location(), Location::default());

    let again = block_on(fetch_location(&sys, &radio, &mut source));
    assert_eq!(again, Err(Error::RateLimited));
}

// ════════════════════════════════════════════════════════════════════════
// Weather
// ════════════════════════════════════════════════════════════════════════

#[test]
fn weather_success_updates_cache() {
    let sys = system_at(T0);
    let (link, _) = FakeLink::new();
    let radio = RadioShare::new(link);
    let fresh = Weather::new(9, 500, "Melbourne");
    let mut source = FixedWeather {
        result: Ok(fresh.clone()),
        asked_for: None,
    };

    let got = block_on(fetch_weather(&sys, &radio, &mut source));
    assert_eq!(got, fresh);
    assert_eq!(sys.retained.with(|r| r.weather.clone()), fresh);
    assert_eq!(source.asked_for, Some(Location::default()));
}

#[test]
fn weather_failure_falls_back_to_cache() {
    let sys = system_at(T0);
    let (link, _) = FakeLink::new();
    let radio = RadioShare::new(link);
    let mut source = FixedWeather {
        result: Err(Error::RequestFailed),
        asked_for: None,
    };

    let got = block_on(fetch_weather(&sys, &radio, &mut source));
    assert_eq!(got, Weather::default());
    assert_eq!(sys.errors.last(), Some(Error::RequestFailed));
    assert_eq!(sys.retained.with(|r| r.weather_gate.failures()), 1);
}

#[test]
fn weather_rate_limit_returns_cache_without_radio() {
    let sys = system_at(T0);
    let (link, stats) = FakeLink::new();
    let radio = RadioShare::new(link);
    sys.retained.with(|r| {
        r.weather_gate.succeeded(T0);
        r.weather = Weather::new(30, 800, "Alice Springs");
    });
    let mut source = FixedWeather {
        result: Ok(Weather::new(-5, 600, "nowhere")),
        asked_for: None,
    };

    let got = block_on(fetch_weather(&sys, &radio, &mut source));
    assert_eq!(got.temperature_c, 30);
    assert_eq!(stats.connects(), 0);
    assert!(source.asked_for.is_none());
}
