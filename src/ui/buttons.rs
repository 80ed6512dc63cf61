//! GPIO button input.
//!
//! Four buttons, active-low with internal pull-ups. Each has its own
//! task that waits for a falling edge and hands it to the shared
//! [`Debouncer`], which decides whether it becomes a `ButtonDown` event.

use defmt::trace;
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use inkwatch::input::Debouncer;
use inkwatch::queue::EventQueue;
use inkwatch::Button;

/// Shared by all four button tasks; state is per button.
pub static DEBOUNCER: Debouncer = Debouncer::new();

#[embassy_executor::task(pool_size = 4)]
pub async fn button_task(pin: AnyPin, button: Button, queue: &'static EventQueue) -> ! {
    let mut input = Input::new(pin, Pull::Up);

    loop {
        input.wait_for_falling_edge().await;
        if !DEBOUNCER.on_edge(button, queue) {
            trace!("Button: {} bounce", button);
        }
    }
}
