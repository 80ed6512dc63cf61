//! Reference-counted access to the shared radio link.
//!
//! Several background tasks may need the radio at once (a time sync and
//! a location fetch started on the same wake). The first
//! [`RadioShare::acquire`] brings the link up, later ones only bump the
//! user count, and the [`RadioLease::release`] that drops the count to
//! zero takes the link down again. The count and the link live under one
//! async mutex, so concurrent acquirers wait for the single connect
//! instead of racing it.
//!
//! A lease dropped without `release` (its task was killed mid-fetch)
//! cannot run the async disconnect from `Drop`; it is recorded as
//! abandoned, folded into the count on the next lock, and
//! [`RadioShare::settle`] takes an idle link down.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;

use crate::error::Error;

/// The radio session itself (Wi-Fi station, BLE link, ...).
#[allow(async_fn_in_trait)]
pub trait RadioLink {
    /// Bring the link up. Called only when no lease is outstanding.
    async fn connect(&mut self) -> Result<(), Error>;

    /// Take the link down. Called only when the last lease is gone.
    async fn disconnect(&mut self);
}

struct Inner<L> {
    link: L,
    users: u32,
    connected: bool,
}

pub struct RadioShare<L> {
    inner: Mutex<CriticalSectionRawMutex, Inner<L>>,
    abandoned: BlockingMutex<CriticalSectionRawMutex, Cell<u32>>,
}

impl<L: RadioLink> RadioShare<L> {
    pub const fn new(link: L) -> Self {
        Self {
            inner: Mutex::new(Inner {
                link,
                users: 0,
                connected: false,
            }),
            abandoned: BlockingMutex::new(Cell::new(0)),
        }
    }

    /// Take a lease, connecting first if nobody holds one.
    ///
    /// A failed connect leaves the count untouched and returns
    /// [`Error::RadioFailed`].
    pub async fn acquire(&self) -> Result<RadioLease<'_, L>, Error> {
        let mut inner = self.inner.lock().await;
        self.reclaim(&mut inner);

        if !inner.connected {
            if let Err(e) = inner.link.connect().await {
                warn!("Radio: connect failed: {:?}", e);
                return Err(Error::RadioFailed);
            }
            inner.connected = true;
            info!("Radio: connected");
        }

        inner.users += 1;
        debug!("Radio: lease taken ({} users)", inner.users);
        Ok(RadioLease {
            share: self,
            released: false,
        })
    }

    /// Disconnect if the link is up but nobody holds a lease.
    pub async fn settle(&self) {
        let mut inner = self.inner.lock().await;
        self.reclaim(&mut inner);
        if inner.users == 0 && inner.connected {
            Self::disconnect(&mut inner).await;
        }
    }

    /// Outstanding leases.
    pub async fn users(&self) -> u32 {
        let mut inner = self.inner.lock().await;
        self.reclaim(&mut inner);
        inner.users
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.connected
    }

    async fn release_one(&self, released: &mut bool) {
        let mut inner = self.inner.lock().await;
        self.reclaim(&mut inner);
        inner.users = inner.users.saturating_sub(1);
        *released = true;
        debug!("Radio: lease returned ({} users)", inner.users);

        if inner.users == 0 && inner.connected {
            Self::disconnect(&mut inner).await;
        }
    }

    async fn disconnect(inner: &mut Inner<L>) {
        inner.link.disconnect().await;
        inner.connected = false;
        info!("Radio: disconnected");
    }

    fn reclaim(&self, inner: &mut Inner<L>) {
        let lost = self.abandoned.lock(|a| a.replace(0));
        if lost > 0 {
            warn!("Radio: {} lease(s) abandoned", lost);
            inner.users = inner.users.saturating_sub(lost);
        }
    }
}

/// A counted hold on the radio link. Return it with
/// [`release`](RadioLease::release).
pub struct RadioLease<'a, L: RadioLink> {
    share: &'a RadioShare<L>,
    released: bool,
}

impl<L: RadioLink> RadioLease<'_, L> {
    pub async fn release(mut self) {
        let share = self.share;
        share.release_one(&mut self.released).await;
    }
}

impl<L: RadioLink> Drop for RadioLease<'_, L> {
    fn drop(&mut self) {
        if !self.released {
            self.share.abandoned.lock(|a| a.set(a.get() + 1));
        }
    }
}
