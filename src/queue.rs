//! Bounded event queue.
//!
//! Many producers (GPIO tasks, background tasks, interrupt handlers) post
//! through [`EventQueue::send`], which never blocks: when all slots are
//! taken the event is dropped and counted. The single consumer, the
//! dispatcher, waits in [`EventQueue::receive`] with a timeout; the
//! channel's waker resumes it as soon as something arrives.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{with_timeout, Duration};

use crate::config::EVENT_QUEUE_CAPACITY;
use crate::event::Event;

pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_CAPACITY>,
    dropped: AtomicU32,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Post an event. Safe from any context; drops the event if full.
    pub fn send(&self, event: Event) {
        let id = event.id();
        if self.channel.try_send(event).is_err() {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!("Queue: full, dropped {:?} ({} total)", id, total);
        } else {
            trace!("Queue: posted {:?}", id);
        }
    }

    /// Wait up to `timeout` for the next event.
    pub async fn receive(&self, timeout: Duration) -> Option<Event> {
        with_timeout(timeout, self.channel.receive()).await.ok()
    }

    pub fn try_receive(&self) -> Option<Event> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Events lost to overflow since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
