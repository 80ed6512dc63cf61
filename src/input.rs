//! Debounced button input.
//!
//! Mechanical switches bounce: one press produces a train of edges a few
//! milliseconds apart. [`Debouncer::on_edge`] is called for every raw
//! falling edge (from the GPIO task or straight from an interrupt
//! handler) and only lets an edge through when the button has been quiet
//! for at least [`DEBOUNCE_WINDOW_MS`].
//!
//! - Every edge, accepted or not, moves the button's "last edge" stamp,
//!   so a bounce train keeps extending its own window and produces
//!   exactly one event however long it lasts.
//! - Suppressed edges are counted per button; the count rides along in
//!   the next accepted `ButtonDown` and then restarts.
//! - The first edge after boot is always accepted.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Instant;

use crate::config::DEBOUNCE_WINDOW_MS;
use crate::event::{Button, Event, EventKind};
use crate::queue::EventQueue;

#[derive(Clone, Copy)]
struct EdgeState {
    last_edge_us: Option<u64>,
    bounces: u32,
}

impl EdgeState {
    const fn new() -> Self {
        Self {
            last_edge_us: None,
            bounces: 0,
        }
    }
}

pub struct Debouncer {
    window_us: u64,
    edges: [Mutex<CriticalSectionRawMutex, Cell<EdgeState>>; 4],
    discarded: AtomicU32,
}

impl Debouncer {
    pub const fn new() -> Self {
        Self::with_window_ms(DEBOUNCE_WINDOW_MS)
    }

    pub const fn with_window_ms(window_ms: u64) -> Self {
        Self {
            window_us: window_ms * 1000,
            edges: [
                Mutex::new(Cell::new(EdgeState::new())),
                Mutex::new(Cell::new(EdgeState::new())),
                Mutex::new(Cell::new(EdgeState::new())),
                Mutex::new(Cell::new(EdgeState::new())),
            ],
            discarded: AtomicU32::new(0),
        }
    }

    /// Feed a raw edge observed now.
    pub fn on_edge(&self, button: Button, queue: &EventQueue) -> bool {
        self.on_edge_at(button, Instant::now(), queue)
    }

    /// Feed a raw edge observed at `now`. Returns `true` if it was
    /// accepted and a `ButtonDown` event was posted.
    pub fn on_edge_at(&self, button: Button, now: Instant, queue: &EventQueue) -> bool {
        let now_us = now.as_micros();

        let accepted = self.edges[button.index()].lock(|cell| {
            let mut state = cell.get();
            let quiet = match state.last_edge_us {
                Some(last) => now_us.saturating_sub(last) >= self.window_us,
                None => true,
            };
            state.last_edge_us = Some(now_us);

            let outcome = if quiet {
                let bounces = state.bounces;
                state.bounces = 0;
                Some(bounces)
            } else {
                state.bounces = state.bounces.saturating_add(1);
                None
            };
            cell.set(state);
            outcome
        });

        match accepted {
            Some(bounces) => {
                debug!("Input: {:?} pressed ({} bounces)", button, bounces);
                queue.send(Event::at(now, EventKind::ButtonDown { button, bounces }));
                true
            }
            None => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Edges suppressed since boot, all buttons.
    pub fn discarded(&self) -> u32 {
        self.discarded.load(Ordering::Relaxed)
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventId;

    fn ms(v: u64) -> Instant {
        Instant::from_millis(v)
    }

    #[test]
    fn bounce_train_yields_one_event() {
        let q = EventQueue::new();
        let d = Debouncer::new();

        // 9 edges, each less than the window after the previous one, even
        // though the train as a whole spans far more than the window.
        let mut t = 1_000;
        let mut accepted = 0;
        for gap in [0, 5, 20, 149, 100, 3, 140, 60, 1] {
            t += gap;
            if d.on_edge_at(Button::Menu, ms(t), &q) {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(q.len(), 1);
        assert_eq!(d.discarded(), 8);
        assert_eq!(q.try_receive().unwrap().id(), EventId::MenuDown);
    }

    #[test]
    fn first_edge_is_always_accepted() {
        let q = EventQueue::new();
        let d = Debouncer::new();
        assert!(d.on_edge_at(Button::Down, ms(0), &q));
    }

    #[test]
    fn quiet_gap_accepts_and_reports_bounces() {
        let q = EventQueue::new();
        let d = Debouncer::new();

        assert!(d.on_edge_at(Button::Up, ms(10), &q));
        assert!(!d.on_edge_at(Button::Up, ms(12), &q));
        assert!(!d.on_edge_at(Button::Up, ms(15), &q));
        assert!(d.on_edge_at(Button::Up, ms(15 + DEBOUNCE_WINDOW_MS), &q));

        let first = q.try_receive().unwrap();
        let second = q.try_receive().unwrap();
        assert_eq!(
            first.kind,
            EventKind::ButtonDown {
                button: Button::Up,
                bounces: 0
            }
        );
        assert_eq!(
            second.kind,
            EventKind::ButtonDown {
                button: Button::Up,
                bounces: 2
            }
        );
    }

    #[test]
    fn buttons_debounce_independently() {
        let q = EventQueue::new();
        let d = Debouncer::new();

        assert!(d.on_edge_at(Button::Menu, ms(100), &q));
        assert!(d.on_edge_at(Button::Back, ms(101), &q));
        assert!(!d.on_edge_at(Button::Menu, ms(102), &q));
        assert_eq!(q.len(), 2);
        assert_eq!(d.discarded(), 1);
    }

    #[test]
    fn accepted_event_carries_edge_time() {
        let q = EventQueue::new();
        let d = Debouncer::with_window_ms(10);
        d.on_edge_at(Button::Back, ms(42), &q);
        assert_eq!(q.try_receive().unwrap().micros, 42_000);
    }
}
