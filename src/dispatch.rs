//! Event dispatcher.
//!
//! The single consumer of the event queue. Events are handled one at a
//! time, in arrival order, each to completion, with a `"dispatch"` entry
//! held in the task registry so the power coordinator never sees an idle
//! system while a handler is mid-flight.
//!
//! Routing:
//!
//! | event                         | effect                                   |
//! |-------------------------------|------------------------------------------|
//! | `ButtonDown`                  | active screen's menu/back/up/down, then  |
//! |                               | the returned [`Nav`] is applied          |
//! | `AlarmTimer`, `UpdateScreen`  | partial repaint of the active screen     |
//! | `LocationUpdate`              | replace the retained location            |
//! | `TimeSync`                    | set RTC and wall clock                   |
//! | `None`                        | logged and dropped                       |

use embassy_time::Duration;

use crate::clock::Rtc;
use crate::config::DRAIN_RECEIVE_TIMEOUT_MS;
use crate::event::{Button, Event, EventKind};
use crate::screen::{Nav, Refresh, ScreenId, ScreenTable};
use crate::system::System;

pub struct Dispatcher<'a, R, T> {
    sys: &'a System<R>,
    screens: T,
    receive_timeout: Duration,
}

impl<'a, R: Rtc, T: ScreenTable> Dispatcher<'a, R, T> {
    pub fn new(sys: &'a System<R>, screens: T) -> Self {
        Self {
            sys,
            screens,
            receive_timeout: Duration::from_millis(DRAIN_RECEIVE_TIMEOUT_MS),
        }
    }

    /// How long each `receive` in [`handle_all`](Self::handle_all) waits.
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn system(&self) -> &'a System<R> {
        self.sys
    }

    pub fn screens(&self) -> &T {
        &self.screens
    }

    pub fn screens_mut(&mut self) -> &mut T {
        &mut self.screens
    }

    /// Handle events until one `receive` times out. Returns how many were
    /// handled.
    pub async fn handle_all(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.sys.queue.receive(self.receive_timeout).await {
            self.dispatch(event).await;
            handled += 1;
        }
        handled
    }

    /// Handle one event to completion.
    pub async fn dispatch(&mut self, event: Event) {
        let _busy = match self.sys.tasks.register("dispatch") {
            Ok(registration) => Some(registration),
            Err(e) => {
                warn!("Dispatch: cannot register marker: {:?}", e);
                None
            }
        };

        debug!("Dispatch: {:?} @ {} us", event.id(), event.micros);
        match event.kind {
            EventKind::ButtonDown { button, .. } => self.press(button),
            EventKind::AlarmTimer | EventKind::UpdateScreen => self.repaint(Refresh::Partial),
            EventKind::LocationUpdate(location) => {
                info!("Dispatch: location now {}", location.city.as_str());
                self.sys.retained.with(|r| r.location = location);
            }
            EventKind::TimeSync(time) => {
                if let Err(e) = self.sys.clock.set(time).await {
                    error!("Dispatch: RTC write failed: {:?}", e);
                    self.sys.errors.set(Some(e));
                }
            }
            EventKind::None => warn!("Dispatch: dropping event without a kind"),
        }
    }

    /// Show the active screen.
    pub fn repaint(&mut self, refresh: Refresh) {
        let id = self.sys.active_screen();
        match self.screens.screen(id) {
            Some(screen) => screen.show(refresh),
            None => warn!("Dispatch: no screen {}", id.0),
        }
    }

    /// Make `id` the active screen and show it.
    pub fn open(&mut self, id: ScreenId) {
        self.sys.retained.with(|r| r.active_screen = id);
        self.repaint(Refresh::Partial);
    }

    fn press(&mut self, button: Button) {
        let id = self.sys.active_screen();
        let Some(screen) = self.screens.screen(id) else {
            warn!("Dispatch: no screen {} for {:?}", id.0, button);
            return;
        };

        let nav = match button {
            Button::Menu => screen.menu(),
            Button::Back => screen.back(),
            Button::Up => screen.up(),
            Button::Down => screen.down(),
        };

        match nav {
            Nav::Stay => {}
            Nav::Redraw => self.repaint(Refresh::Partial),
            Nav::Open(next) => {
                debug!("Dispatch: screen {} -> {}", id.0, next.0);
                self.open(next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Location, TimeValue};
    use crate::testing::{Call, FakeRtc, RecordingTable};
    use embassy_futures::block_on;
    use embassy_time::Instant;

    fn ev(kind: EventKind) -> Event {
        Event::at(Instant::from_micros(0), kind)
    }

    fn press(button: Button) -> Event {
        ev(EventKind::ButtonDown { button, bounces: 0 })
    }

    #[test]
    fn buttons_route_to_active_screen_and_navigate() {
        let sys = System::new(FakeRtc::at(0));
        let mut d = Dispatcher::new(&sys, RecordingTable::new());

        block_on(d.dispatch(press(Button::Up)));
        block_on(d.dispatch(press(Button::Menu)));
        assert_eq!(sys.active_screen(), ScreenId(1));
        block_on(d.dispatch(press(Button::Down)));
        block_on(d.dispatch(press(Button::Back)));
        assert_eq!(sys.active_screen(), ScreenId(0));

        assert_eq!(
            d.screens().calls(),
            [
                Call::Up(ScreenId(0)),
                Call::Show(ScreenId(0), Refresh::Partial),
                Call::Menu(ScreenId(0)),
                Call::Show(ScreenId(1), Refresh::Partial),
                Call::Down(ScreenId(1)),
                Call::Back(ScreenId(1)),
                Call::Show(ScreenId(0), Refresh::Partial),
            ]
        );
    }

    #[test]
    fn timer_events_repaint_partially() {
        let sys = System::new(FakeRtc::at(0));
        let mut d = Dispatcher::new(&sys, RecordingTable::new());

        block_on(d.dispatch(ev(EventKind::AlarmTimer)));
        block_on(d.dispatch(ev(EventKind::UpdateScreen)));
        assert_eq!(
            d.screens().calls(),
            [
                Call::Show(ScreenId(0), Refresh::Partial),
                Call::Show(ScreenId(0), Refresh::Partial),
            ]
        );
    }

    #[test]
    fn location_update_replaces_retained_fix() {
        let sys = System::new(FakeRtc::at(0));
        let mut d = Dispatcher::new(&sys, RecordingTable::new());
        let tokyo = Location::new(35.6762, 139.6503, "JST-9", "Tokyo");

        block_on(d.dispatch(ev(EventKind::LocationUpdate(tokyo.clone()))));
        assert_eq!(sys.location(), tokyo);
        assert!(d.screens().calls().is_empty());
    }

    #[test]
    fn time_sync_sets_clock() {
        let sys = System::new(FakeRtc::at(0));
        let mut d = Dispatcher::new(&sys, RecordingTable::new());

        block_on(d.dispatch(ev(EventKind::TimeSync(TimeValue::from_secs(1_800_000_000)))));
        assert!(sys.clock.now().secs >= 1_800_000_000);
        assert_eq!(sys.errors.last(), None);
    }

    #[test]
    fn failed_rtc_write_is_recorded() {
        let mut rtc = FakeRtc::at(0);
        rtc.fail_writes = true;
        let sys = System::new(rtc);
        let mut d = Dispatcher::new(&sys, RecordingTable::new());

        block_on(d.dispatch(ev(EventKind::TimeSync(TimeValue::from_secs(1_800_000_000)))));
        assert_eq!(sys.errors.last(), Some(crate::error::Error::Hardware));
        // The wall clock still moved.
        assert!(sys.clock.now().secs >= 1_800_000_000);
    }

    #[test]
    fn none_event_is_dropped() {
        let sys = System::new(FakeRtc::at(0));
        let mut d = Dispatcher::new(&sys, RecordingTable::new());
        block_on(d.dispatch(ev(EventKind::None)));
        assert!(d.screens().calls().is_empty());
        assert!(!sys.tasks.running());
    }

    #[test]
    fn unknown_active_screen_is_ignored() {
        let sys = System::new(FakeRtc::at(0));
        sys.retained.with(|r| r.active_screen = ScreenId(9));
        let mut d = Dispatcher::new(&sys, RecordingTable::new());
        block_on(d.dispatch(press(Button::Menu)));
        assert!(d.screens().calls().is_empty());
    }

    #[test]
    fn handle_all_drains_in_order() {
        let sys = System::new(FakeRtc::at(0));
        let mut d = Dispatcher::new(&sys, RecordingTable::new())
            .with_receive_timeout(Duration::from_millis(5));

        sys.queue.send(press(Button::Menu));
        sys.queue.send(ev(EventKind::UpdateScreen));
        sys.queue.send(press(Button::Back));

        assert_eq!(block_on(d.handle_all()), 3);
        assert!(sys.queue.is_empty());
        assert_eq!(sys.active_screen(), ScreenId(0));
        assert_eq!(
            d.screens().calls(),
            [
                Call::Menu(ScreenId(0)),
                Call::Show(ScreenId(1), Refresh::Partial),
                Call::Show(ScreenId(1), Refresh::Partial),
                Call::Back(ScreenId(1)),
                Call::Show(ScreenId(0), Refresh::Partial),
            ]
        );
    }

    #[test]
    fn marker_is_registered_only_while_dispatching() {
        struct Probe<'s> {
            sys: &'s System<FakeRtc>,
            seen_busy: bool,
        }
        impl crate::screen::Screen for Probe<'_> {
            fn show(&mut self, _: Refresh) {
                self.seen_busy = self.sys.tasks.contains("dispatch");
            }
        }
        impl ScreenTable for Probe<'_> {
            fn screen(&mut self, _: ScreenId) -> Option<&mut dyn crate::screen::Screen> {
                Some(self)
            }
        }

        let sys = System::new(FakeRtc::at(0));
        let mut d = Dispatcher::new(
            &sys,
            Probe {
                sys: &sys,
                seen_busy: false,
            },
        );
        block_on(d.dispatch(ev(EventKind::UpdateScreen)));
        assert!(d.screens().seen_busy);
        assert!(!sys.tasks.running());
    }
}
