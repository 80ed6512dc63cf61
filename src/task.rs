//! Background task registry.
//!
//! The watch may only deep-sleep once nothing is in flight. Every
//! asynchronous activity (a time sync, a location fetch, the BLE
//! configuration server, the dispatcher while it handles an event) holds
//! an entry in the [`TaskRegistry`] for as long as it runs, and the power
//! coordinator keeps draining events until the registry is empty.
//!
//! Registration is RAII: [`Registration`] removes its entry on drop, and a
//! [`BackgroundTask`] registers in [`BackgroundTask::begin`], i.e. before
//! its body is ever scheduled, so there is no window in which a freshly
//! started task is invisible to the coordinator.

use core::cell::{Cell, RefCell};
use core::future::Future;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use heapless::Vec;

use crate::config::TASK_REGISTRY_CAPACITY;
use crate::error::Error;

/// Identifies one registry entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(u32);

struct Entry {
    id: TaskId,
    name: &'static str,
}

struct Slots {
    entries: Vec<Entry, TASK_REGISTRY_CAPACITY>,
    next_id: u32,
}

/// Set of currently running background activities.
pub struct TaskRegistry {
    slots: Mutex<CriticalSectionRawMutex, RefCell<Slots>>,
}

impl TaskRegistry {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new(Slots {
                entries: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Add an entry. Fails with [`Error::RegistryFull`] when every slot is
    /// taken; the caller must then not start its work.
    pub fn add(&self, name: &'static str) -> Result<TaskId, Error> {
        let added = self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            let id = TaskId(slots.next_id);
            if slots.entries.push(Entry { id, name }).is_err() {
                return None;
            }
            slots.next_id = slots.next_id.wrapping_add(1);
            Some((id, slots.entries.len()))
        });

        match added {
            Some((id, count)) => {
                debug!("Tasks: + {} ({} running)", name, count);
                Ok(id)
            }
            None => {
                warn!("Tasks: registry full, refusing {}", name);
                Err(Error::RegistryFull)
            }
        }
    }

    /// Remove an entry. Returns `false` if it was not registered.
    pub fn remove(&self, id: TaskId) -> bool {
        let removed = self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            let pos = slots.entries.iter().position(|e| e.id == id)?;
            let entry = slots.entries.swap_remove(pos);
            Some((entry.name, slots.entries.len()))
        });

        match removed {
            Some((name, count)) => {
                debug!("Tasks: - {} ({} running)", name, count);
                true
            }
            None => false,
        }
    }

    /// `true` while at least one activity is registered.
    pub fn running(&self) -> bool {
        self.slots.lock(|slots| !slots.borrow().entries.is_empty())
    }

    pub fn len(&self) -> usize {
        self.slots.lock(|slots| slots.borrow().entries.len())
    }

    pub fn is_empty(&self) -> bool {
        !self.running()
    }

    /// Whether an entry with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.slots
            .lock(|slots| slots.borrow().entries.iter().any(|e| e.name == name))
    }

    /// Add an entry that is removed when the returned guard drops.
    pub fn register(&self, name: &'static str) -> Result<Registration<'_>, Error> {
        let id = self.add(name)?;
        Ok(Registration { registry: self, id })
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped registry entry.
pub struct Registration<'a> {
    registry: &'a TaskRegistry,
    id: TaskId,
}

impl Registration<'_> {
    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

/// How a launched body ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskExit {
    Completed,
    Killed,
}

/// A named, restartable background activity. Meant to live in a
/// `static`; at most one instance of its body runs at a time.
pub struct BackgroundTask {
    name: &'static str,
    active: Mutex<CriticalSectionRawMutex, Cell<bool>>,
    kill: Signal<CriticalSectionRawMutex, ()>,
}

impl BackgroundTask {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            active: Mutex::new(Cell::new(false)),
            kill: Signal::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_active(&self) -> bool {
        self.active.lock(|a| a.get())
    }

    /// Register the task and hand back the [`Launch`] that runs it.
    ///
    /// Fails with [`Error::NotReady`] if a previous launch is still alive
    /// and with [`Error::RegistryFull`] if there is no slot left. Dropping
    /// the launch without running it undoes the registration.
    pub fn begin<'a>(&'a self, registry: &'a TaskRegistry) -> Result<Launch<'a>, Error> {
        if self.active.lock(|a| a.replace(true)) {
            debug!("Tasks: {} already running", self.name);
            return Err(Error::NotReady);
        }

        match registry.register(self.name) {
            Ok(registration) => {
                self.kill.reset();
                Ok(Launch {
                    task: self,
                    registration: Some(registration),
                })
            }
            Err(e) => {
                self.active.lock(|a| a.set(false));
                Err(e)
            }
        }
    }

    /// Ask a running body to stop. The body is dropped at its next await
    /// point; its registration goes with it.
    pub fn kill(&self) {
        if self.is_active() {
            info!("Tasks: killing {}", self.name);
            self.kill.signal(());
        }
    }
}

/// A registered, not yet finished run of a [`BackgroundTask`].
pub struct Launch<'a> {
    task: &'a BackgroundTask,
    registration: Option<Registration<'a>>,
}

impl<'a> Launch<'a> {
    pub fn name(&self) -> &'static str {
        self.task.name
    }

    /// Drive `body` until it finishes or the task is killed. The
    /// registration is released on return, or when this future is
    /// dropped.
    pub async fn run<F>(self, body: F) -> TaskExit
    where
        F: Future<Output = ()>,
    {
        match select(body, self.task.kill.wait()).await {
            Either::First(()) => TaskExit::Completed,
            Either::Second(()) => {
                info!("Tasks: {} killed", self.task.name);
                TaskExit::Killed
            }
        }
    }
}

impl Drop for Launch<'_> {
    fn drop(&mut self) {
        // Leave the registry first so a new `begin` never finds the old
        // entry still there.
        drop(self.registration.take());
        self.task.active.lock(|a| a.set(false));
    }
}
