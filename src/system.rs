//! Shared runtime state.
//!
//! One [`System`] exists per boot. The firmware places it in a
//! `StaticCell`; tests build one per case. Everything in it is safe to
//! touch from any task or interrupt priority.

use crate::clock::{Clock, Rtc};
use crate::error::ErrorSlot;
use crate::event::{ButtonMask, Event, EventKind, Location};
use crate::queue::EventQueue;
use crate::retained::{Retained, RetainedCell};
use crate::screen::ScreenId;
use crate::task::TaskRegistry;

pub struct System<R> {
    pub queue: EventQueue,
    pub tasks: TaskRegistry,
    pub errors: ErrorSlot,
    pub retained: RetainedCell,
    pub clock: Clock<R>,
}

impl<R: Rtc> System<R> {
    pub fn new(rtc: R) -> Self {
        Self {
            queue: EventQueue::new(),
            tasks: TaskRegistry::new(),
            errors: ErrorSlot::new(),
            retained: RetainedCell::new(Retained::default()),
            clock: Clock::new(rtc),
        }
    }

    /// Post an event stamped with the current time.
    pub fn post(&self, kind: EventKind) {
        self.queue.send(Event::now(kind));
    }

    /// Periodic wake interval for the coming sleeps; `0` disables it.
    pub fn set_update_interval(&self, interval_ms: u32) {
        info!("Wake: update interval {} ms", interval_ms);
        self.retained
            .with(|r| r.wake.set_update_interval(interval_ms));
    }

    pub fn set_rtc_alarm(&self, enabled: bool) {
        self.retained.with(|r| r.wake.set_rtc_alarm(enabled));
    }

    pub fn set_button_mask(&self, mask: ButtonMask) {
        self.retained.with(|r| r.wake.set_button_mask(mask));
    }

    pub fn active_screen(&self) -> ScreenId {
        self.retained.with(|r| r.active_screen)
    }

    pub fn location(&self) -> Location {
        self.retained.with(|r| r.location.clone())
    }

    /// Read a screen-local retained slot.
    pub fn screen_slot(&self, index: usize) -> i16 {
        self.retained
            .with(|r| r.screen_slots.get(index).copied().unwrap_or(0))
    }

    pub fn set_screen_slot(&self, index: usize, value: i16) {
        self.retained.with(|r| {
            if let Some(slot) = r.screen_slots.get_mut(index) {
                *slot = value;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Button;
    use crate::testing::FakeRtc;
    use crate::wake::Periodic;

    fn system() -> System<FakeRtc> {
        System::new(FakeRtc::at(1_700_000_000))
    }

    #[test]
    fn wake_setters_reach_the_retained_plan() {
        let sys = system();
        sys.set_update_interval(0);
        let plan = sys.retained.with(|r| r.wake.plan());
        assert_eq!(plan.periodic, Periodic::Off);
        assert_eq!(plan.buttons, ButtonMask::ALL);

        sys.set_rtc_alarm(true);
        sys.set_button_mask(ButtonMask::NONE.with(Button::Menu));
        let plan = sys.retained.with(|r| r.wake.plan());
        assert_eq!(plan.periodic, Periodic::RtcAlarm);
        assert!(plan.buttons.contains(Button::Menu));
        assert!(!plan.buttons.contains(Button::Back));
    }

    #[test]
    fn screen_slots_ignore_out_of_range_indices() {
        let sys = system();
        sys.set_screen_slot(1, -3);
        sys.set_screen_slot(99, 7);
        assert_eq!(sys.screen_slot(1), -3);
        assert_eq!(sys.screen_slot(99), 0);
        assert_eq!(sys.active_screen(), ScreenId::HOME);
    }

    #[test]
    fn post_stamps_and_queues() {
        let sys = system();
        sys.post(EventKind::UpdateScreen);
        assert_eq!(sys.queue.len(), 1);
        let event = sys.queue.try_receive();
        assert!(matches!(event.map(|e| e.kind), Some(EventKind::UpdateScreen)));
    }
}
