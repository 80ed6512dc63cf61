//! Pure decisions of the wake/sleep cycle, kept free of hardware so they
//! can be tested on the host.

use crate::event::{Button, ButtonMask, EventKind};
use crate::retained::Retained;
use crate::wake::WakeCause;

/// The event that starts the work of a wake, if any. A cold boot has
/// none: it renders the home screen with a full refresh instead.
pub fn initial_event(cause: WakeCause) -> Option<EventKind> {
    match cause {
        WakeCause::ColdBoot => None,
        WakeCause::Timer | WakeCause::RtcAlarm => Some(EventKind::AlarmTimer),
        WakeCause::Button(button) => Some(EventKind::ButtonDown { button, bounces: 0 }),
    }
}

/// Map the latched wake-pin status to a button. When several pins are
/// latched the lowest-indexed button wins.
pub fn button_from_wake_mask(latched: ButtonMask) -> Option<Button> {
    latched.first()
}

/// State to run this wake with: the restored image after a sleep,
/// factory defaults on a cold boot or when there is no valid image.
///
/// RAM can survive a pin or soft reset, so a cold boot ignores whatever
/// image is still there.
pub fn restore_or_default(cause: WakeCause, image: Option<Retained>) -> (Retained, bool) {
    match image {
        Some(state) if cause != WakeCause::ColdBoot => (state, true),
        _ => (Retained::default(), false),
    }
}

/// The drain loop may stop only when the last pass left the queue empty
/// and nothing registered. An event sent from an interrupt after the
/// pass timed out keeps the loop going.
pub fn drain_finished(tasks_running: bool, queue_empty: bool) -> bool {
    !tasks_running && queue_empty
}
